//! Maker - 自适应离线学习会话引擎
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、状态投影、会话监管、构建器、主控循环
//! - **curriculum**: 课程数据模型与课程来源（本地文件 / HTTP + 离线缓存）
//! - **engine**: 任务解析、选项构建、作答校验、进度推进、会话门面
//! - **progress**: 会话状态、键值存储后端（内存 / JSON 文件 / SQLite）与迁移
//! - **observability**: 日志初始化
//! - **ui**: 逐行终端呈现层

pub mod config;
pub mod core;
pub mod curriculum;
pub mod engine;
pub mod observability;
pub mod progress;
pub mod ui;

pub use engine::{SessionConfig, SessionEngine};
