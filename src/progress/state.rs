//! 会话状态（持久化单元）
//!
//! 整个设备只有一份：首次运行时以全零/空默认值创建，此后从存储加载；只由进度控制器修改。
//! JSON 形状沿用 camelCase，便于与旧版本存储值互通。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::curriculum::Mode;

/// 解锁等级上限
pub const MAX_TIER: u8 = 3;

/// `"<moduleId>:<unitId>"` 形式的进度键
pub fn unit_key(module_id: &str, unit_id: &str) -> String {
    format!("{module_id}:{unit_id}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unlocks {
    pub tier: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub current_module_index: usize,
    pub current_unit_index: usize,
    /// 进度键 -> 是否完成；一旦为 true 不会被正常学习过程撤销
    pub completed: BTreeMap<String, bool>,
    /// 进度键 -> 连续失败次数；回退或成功后归零（不删除）
    pub attempts: BTreeMap<String, u32>,
    pub unlocks: Unlocks,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub mode: Mode,
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl SessionState {
    pub fn is_completed(&self, key: &str) -> bool {
        self.progress.completed.get(key).copied().unwrap_or(false)
    }

    pub fn failures(&self, key: &str) -> u32 {
        self.progress.attempts.get(key).copied().unwrap_or(0)
    }

    pub fn tier(&self) -> u8 {
        self.progress.unlocks.tier
    }
}
