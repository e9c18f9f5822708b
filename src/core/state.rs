//! 状态投影：SessionView
//!
//! 呈现层只持有轻量的 SessionView（阶段、当前任务、反馈、等级、可用性）；
//! 完整状态由 SessionEngine 维护，运行时在每次处理完事件后投影一次。

use serde::Serialize;

use crate::curriculum::Mode;
use crate::engine::{ActiveTask, SessionEngine, SessionPhase};

/// 呈现层看到的阶段
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseView {
    #[default]
    PreStart,
    Awaiting,
    /// 成功展示或回退停顿中
    Pending,
    Complete,
}

/// 运行时附加在投影上的瞬时信息（不持久化）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewNotes {
    pub feedback: Option<String>,
    pub diagnostic: Option<String>,
    pub notice: Option<String>,
    pub content_loading: bool,
}

impl ViewNotes {
    pub fn clear(&mut self) {
        self.feedback = None;
        self.diagnostic = None;
        self.notice = None;
    }
}

/// 呈现层看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionView {
    pub phase: PhaseView,
    pub mode: Mode,
    pub active_task: Option<ActiveTask>,
    pub feedback: Option<String>,
    pub diagnostic: Option<String>,
    pub notice: Option<String>,
    pub terminal_message: Option<String>,
    pub unlock_tier: u8,
    pub content_loaded: bool,
    pub content_loading: bool,
    pub start_requested: bool,
    pub voice_available: bool,
}

impl SessionView {
    /// 将引擎状态与瞬时信息合并，得到可渲染的视图
    pub fn project(engine: &SessionEngine, notes: &ViewNotes) -> Self {
        let (phase, start_requested, terminal_message) = match engine.phase() {
            SessionPhase::PreStart { start_requested } => (PhaseView::PreStart, *start_requested, None),
            SessionPhase::Awaiting(_) => (PhaseView::Awaiting, false, None),
            SessionPhase::Pending { .. } => (PhaseView::Pending, false, None),
            SessionPhase::Complete(message) => (PhaseView::Complete, false, Some(message.clone())),
        };
        Self {
            phase,
            mode: engine.state().mode,
            active_task: engine.active_task().cloned(),
            feedback: notes.feedback.clone(),
            diagnostic: notes.diagnostic.clone(),
            notice: notes.notice.clone(),
            terminal_message,
            unlock_tier: engine.unlock_tier(),
            content_loaded: engine.has_curriculum(),
            content_loading: notes.content_loading,
            start_requested,
            voice_available: engine.voice_available(),
        }
    }
}
