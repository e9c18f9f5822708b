//! Maker - 自适应离线学习会话引擎
//!
//! 入口：初始化日志、创建会话运行时与终端呈现层，并运行主循环。

use std::path::PathBuf;

use anyhow::Context;
use maker::{core::create_session, observability, ui::run_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 可选：第一个参数为额外的配置文件
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    // 创建会话：返回命令发送端、视图接收端、任务播报接收端
    let (cmd_tx, view_rx, announce_rx) = create_session(config_path)
        .await
        .context("Failed to create session")?;

    run_app(view_rx, announce_rx, cmd_tx)
        .await
        .context("App run failed")?;

    Ok(())
}
