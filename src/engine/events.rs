//! 任务播报：每次解析出任务后通知呈现层 / AR 等外部监听者
//!
//! 监听者通过 TaskObserver 显式注册到引擎；任何监听者出错只记日志，不影响解析流程。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::curriculum::{Mode, TaskType};
use crate::engine::task::{ActiveTask, TaskTicket};

/// 播报内容（可序列化为 JSON 供外部协作方消费）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskAnnouncement {
    pub mode: Mode,
    pub module_id: String,
    pub unit_id: String,
    pub task_type: TaskType,
    pub focus_word: String,
    pub unlock_tier: u8,
    /// 朗读 / 识别所用语言（BCP 47）
    pub lang: String,
    pub ticket: TaskTicket,
}

impl TaskAnnouncement {
    pub fn for_task(task: &ActiveTask, mode: Mode, unlock_tier: u8, lang: &str) -> Self {
        Self {
            mode,
            module_id: task.module_id.clone(),
            unit_id: task.unit_id.clone(),
            task_type: task.task_type.clone(),
            focus_word: task.focus_word.clone(),
            unlock_tier,
            lang: lang.to_string(),
            ticket: task.ticket.clone(),
        }
    }
}

/// 任务监听者
pub trait TaskObserver: Send + Sync {
    fn on_task(&self, announcement: &TaskAnnouncement) -> anyhow::Result<()>;

    /// 监听者名称（用于日志）
    fn name(&self) -> &str {
        "observer"
    }
}

/// 依次通知所有监听者，失败只记日志
pub fn emit(observers: &[Arc<dyn TaskObserver>], announcement: &TaskAnnouncement) {
    for observer in observers {
        if let Err(e) = observer.on_task(announcement) {
            tracing::warn!(
                observer = observer.name(),
                unit = %announcement.ticket.unit_key,
                error = %e,
                "Task announcement failed"
            );
        }
    }
}

/// 把播报转发到 broadcast 通道（运行时使用）
pub struct BroadcastObserver {
    tx: broadcast::Sender<TaskAnnouncement>,
}

impl BroadcastObserver {
    pub fn new(tx: broadcast::Sender<TaskAnnouncement>) -> Self {
        Self { tx }
    }
}

impl TaskObserver for BroadcastObserver {
    fn on_task(&self, announcement: &TaskAnnouncement) -> anyhow::Result<()> {
        // 没有订阅者时 send 返回 Err，此时无人需要播报
        let _ = self.tx.send(announcement.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "broadcast"
    }
}
