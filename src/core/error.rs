//! 会话错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 SessionError 决定 AwaitRetry / FallbackToTap / ContinueInMemory / UseDefaults。
//! 核心中不存在致命错误：每一类失败都降级为更窄但仍可用的状态。

use thiserror::Error;

/// 课程内容不可用或形状不合法（整份拒绝，不做部分接受）
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Curriculum unavailable: {0}")]
    Unavailable(String),

    #[error("Curriculum document has no `modules` array")]
    MissingModules,

    #[error("Malformed curriculum: {0}")]
    Malformed(String),
}

/// 键值存储读写失败
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// 语音采集失败（能力缺失、权限被拒、无语音超时）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Voice capture unavailable")]
    Unavailable,

    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("No speech detected")]
    NoSpeech,

    #[error("Voice capture failed: {0}")]
    Other(String),
}

/// 会话层错误汇总
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    /// 单元或任务层字段缺失（由解析器补默认值，不中断学习流程）
    #[error("Malformed unit data: {0}")]
    MalformedUnit(String),

    #[error("Curriculum not loaded yet")]
    ContentNotLoaded,
}

/// 恢复引擎根据错误类型给出的降级动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 停留在开始前状态，等待用户再次点击开始 / 重新加载
    AwaitRetry,
    /// 语音不可用：退回点选 / 键入作答
    FallbackToTap,
    /// 持久化失败：继续使用内存中的状态，写入尽力而为
    ContinueInMemory,
    /// 数据缺字段：使用默认值继续
    UseDefaults,
}
