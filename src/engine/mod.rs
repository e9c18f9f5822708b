//! 会话引擎：任务解析、选项构建、作答校验、进度推进与任务播报

pub mod events;
pub mod options;
pub mod progression;
pub mod resolver;
pub mod session;
pub mod task;
pub mod validator;

pub use events::{emit, BroadcastObserver, TaskAnnouncement, TaskObserver};
pub use options::{build_options, candidate_for, MAX_DECOYS};
pub use progression::{compute_tier, Outcome, ProgressionController, DEFAULT_FAILURE_THRESHOLD};
pub use resolver::{effective_layer, resolve_active_task, Resolution, ResolveOutcome, TERMINAL_MESSAGE};
pub use session::{SessionConfig, SessionEngine, SessionPhase, SubmitOutcome, TranscriptAction};
pub use task::{ActiveTask, Response, TaskOption, TaskTicket, Verdict};
pub use validator::validate;
