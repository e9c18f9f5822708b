//! 活动任务与作答值
//!
//! ActiveTask 是解析器产出的「已补齐默认值」的任务视图，其余组件不再自行补默认值。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::curriculum::{Mode, TaskType};

/// 任务票据：呈现任务时签发，作答 / 语音结果 / 延迟回调回来时比对，不一致即视为过期
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskTicket {
    pub generation: u64,
    pub unit_key: String,
}

impl fmt::Display for TaskTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.generation, self.unit_key)
    }
}

/// 匹配类任务的一个选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOption {
    pub id: String,
    pub label: String,
}

/// 完整的活动任务
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveTask {
    pub ticket: TaskTicket,
    pub module_id: String,
    pub unit_id: String,
    /// 实际取用任务层的模式（可能是回退后的模式）
    pub layer_mode: Option<Mode>,
    pub focus_word: String,
    pub concept_glyph: String,
    pub prompt: String,
    pub task_type: TaskType,
    pub target_id: String,
    pub expected: bool,
    /// 仅 motor 任务非空
    pub options: Vec<TaskOption>,
}

impl ActiveTask {
    pub fn unit_key(&self) -> &str {
        &self.ticket.unit_key
    }
}

/// 呈现层 / 语音层送回的作答值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Bool(bool),
    Text(String),
}

impl From<bool> for Response {
    fn from(b: bool) -> Self {
        Response::Bool(b)
    }
}

impl From<&str> for Response {
    fn from(s: &str) -> Self {
        Response::Text(s.to_string())
    }
}

impl From<String> for Response {
    fn from(s: String) -> Self {
        Response::Text(s)
    }
}

/// 校验结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub accepted: bool,
    pub feedback: Option<String>,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            feedback: None,
        }
    }

    pub fn reject(feedback: impl Into<String>) -> Self {
        Self {
            accepted: false,
            feedback: Some(feedback.into()),
        }
    }
}
