//! 进度控制器
//!
//! 每次作答结果都会修改状态并立即持久化：
//! - 接受：标记完成、单元索引 +1、连续失败归零、重算解锁等级
//! - 拒绝：连续失败 +1；达到阈值时归零并回退一个单元（不会越过模块第一个单元）
//!
//! 解锁等级是全局成就，只升不降。

use crate::curriculum::{Curriculum, Module};
use crate::engine::task::ActiveTask;
use crate::progress::{unit_key, ProgressStore, SessionState, MAX_TIER};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// 一次作答结果对状态的影响
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 单元完成，进入下一个单元
    Advanced {
        completed_key: String,
        tier_raised: Option<u8>,
    },
    /// 停留在当前单元重试
    Retry { failures: u32 },
    /// 连续失败达到阈值，回退
    Regressed {
        diagnostic: String,
        unit_index: usize,
    },
}

/// 按完成比例计算等级：全部完成 3，≥67% 2，≥34% 1，否则 0
pub fn compute_tier(done: usize, total: usize) -> u8 {
    let total = total.max(1);
    let threshold = |ratio: f64| (total as f64 * ratio).ceil() as usize;
    if done >= total {
        MAX_TIER
    } else if done >= threshold(0.67) {
        2
    } else if done >= threshold(0.34) {
        1
    } else {
        0
    }
}

/// 当前模块中已完成的单元数
pub fn completed_in_module(state: &SessionState, module: &Module) -> usize {
    module
        .units
        .iter()
        .filter(|u| state.is_completed(&unit_key(&module.mod_id, &u.unit_id)))
        .count()
}

pub fn regression_diagnostic(focus_word: &str) -> String {
    format!("Slow down: «{focus_word}» needs another look.")
}

pub struct ProgressionController {
    store: ProgressStore,
    failure_threshold: u32,
}

impl ProgressionController {
    pub fn new(store: ProgressStore, failure_threshold: u32) -> Self {
        Self {
            store,
            failure_threshold: failure_threshold.max(1),
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// 作答被接受
    pub fn on_accept(
        &self,
        state: &mut SessionState,
        curriculum: &Curriculum,
        task: &ActiveTask,
    ) -> Outcome {
        let key = task.unit_key().to_string();
        state.progress.completed.insert(key.clone(), true);
        if let Some(failures) = state.progress.attempts.get_mut(&key) {
            *failures = 0;
        }
        state.progress.current_unit_index += 1;
        self.store.save(state);

        let tier_raised = self.recompute_unlocks(state, curriculum);
        tracing::info!(unit = %key, tier = state.tier(), "Unit completed");
        Outcome::Advanced {
            completed_key: key,
            tier_raised,
        }
    }

    /// 作答被拒绝
    pub fn on_reject(&self, state: &mut SessionState, task: &ActiveTask) -> Outcome {
        let key = task.unit_key().to_string();
        let failures = state.failures(&key) + 1;

        if failures < self.failure_threshold {
            state.progress.attempts.insert(key.clone(), failures);
            self.store.save(state);
            tracing::debug!(unit = %key, failures, "Response rejected");
            return Outcome::Retry { failures };
        }

        state.progress.attempts.insert(key.clone(), 0);
        let p = &mut state.progress;
        p.current_unit_index = p.current_unit_index.saturating_sub(1);
        let unit_index = p.current_unit_index;
        self.store.save(state);
        tracing::info!(unit = %key, unit_index, "Failure threshold reached, regressing");
        Outcome::Regressed {
            diagnostic: regression_diagnostic(&task.focus_word),
            unit_index,
        }
    }

    /// 按当前模块重算等级；只有严格升高时才写入，返回新等级
    pub fn recompute_unlocks(&self, state: &mut SessionState, curriculum: &Curriculum) -> Option<u8> {
        let module = curriculum.module(state.progress.current_module_index)?;
        let done = completed_in_module(state, module);
        let tier = compute_tier(done, module.units.len());
        if tier <= state.tier() {
            return None;
        }
        state.progress.unlocks.tier = tier;
        self.store.save(state);
        tracing::info!(module = %module.mod_id, done, tier, "Unlock tier raised");
        Some(tier)
    }
}
