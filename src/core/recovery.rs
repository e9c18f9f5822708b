//! 错误恢复引擎
//!
//! 根据 SessionError 类型返回 RecoveryAction，供运行时决定是等待重试、退回点选、继续内存态还是使用默认值。

use crate::core::{RecoveryAction, SessionError};

/// 语义化降级：将错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// 根据错误类型返回建议的降级动作，同时记录日志
    pub fn handle(&self, err: &SessionError) -> RecoveryAction {
        let action = match err {
            SessionError::Content(_) | SessionError::ContentNotLoaded => RecoveryAction::AwaitRetry,
            SessionError::Voice(_) => RecoveryAction::FallbackToTap,
            SessionError::Store(_) => RecoveryAction::ContinueInMemory,
            SessionError::MalformedUnit(_) => RecoveryAction::UseDefaults,
        };
        tracing::warn!(error = %err, action = ?action, "Degrading session");
        action
    }
}
