//! 终端应用主循环
//!
//! 逐行读取标准输入，经 EventHandler 转为 Command 发送给编排器；
//! 视图变化时用 draw 重绘，任务播报只记录日志。

use std::io;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, watch};

use crate::core::{Command, SessionView};
use crate::engine::TaskAnnouncement;
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::{draw, HELP};

/// 运行终端呈现层，直到用户退出、标准输入关闭或运行时停止
pub async fn run_app(
    mut view_rx: watch::Receiver<SessionView>,
    mut announce_rx: broadcast::Receiver<TaskAnnouncement>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    let handler = EventHandler::new(cmd_tx.clone());
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();
    let mut announcements_open = true;

    let initial = view_rx.borrow_and_update().clone();
    draw(&mut stdout, &initial)?;
    println!("{HELP}");

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    let _ = cmd_tx.send(Command::Quit);
                    break;
                };
                let view = view_rx.borrow().clone();
                match handler.handle_line(&line, &view)? {
                    AppEvent::Command(Command::Quit) => break,
                    AppEvent::Hint(hint) => println!("{hint}"),
                    AppEvent::Help => println!("{HELP}"),
                    AppEvent::Command(_) | AppEvent::Ignored => {}
                }
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    tracing::warn!("Session runtime stopped");
                    break;
                }
                let view = view_rx.borrow_and_update().clone();
                draw(&mut stdout, &view)?;
            }
            announcement = announce_rx.recv(), if announcements_open => match announcement {
                Ok(a) => tracing::debug!(
                    unit = %a.ticket.unit_key,
                    task_type = %a.task_type,
                    tier = a.unlock_tier,
                    "Task announced"
                ),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "Announcement receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Announcement channel closed");
                    announcements_open = false;
                }
            },
        }
    }
    Ok(())
}
