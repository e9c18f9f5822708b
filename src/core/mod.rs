//! 核心编排层：错误与恢复、状态投影、会话监管、构建器、主控循环

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod session_supervisor;
pub mod state;

pub use builder::{create_session_builder, SessionBuilder};
pub use error::{ContentError, RecoveryAction, SessionError, StoreError, VoiceError};
pub use orchestrator::{create_session, spawn_session, Command};
pub use recovery::RecoveryEngine;
pub use session_supervisor::SessionSupervisor;
pub use state::{PhaseView, SessionView, ViewNotes};
