//! 选项构建（仅 motor 任务）
//!
//! 以当前模块所有单元为候选池，按 id 去重（保留首个），拆出正确项（池中没有则合成），
//! 随机抽取至多 2 个干扰项，再随机打乱顺序。随机源由调用方注入，测试可固定种子。

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::curriculum::{slugify, Mode, Unit};
use crate::engine::resolver::{DEFAULT_FOCUS_WORD, DEFAULT_TARGET};
use crate::engine::task::TaskOption;

/// 每道题最多展示的干扰项数
pub const MAX_DECOYS: usize = 2;

/// 单元在候选池中的条目：id 优先取 discover 层目标，其次 transfer 层，否则焦点词 slug
pub fn candidate_for(unit: &Unit) -> TaskOption {
    let id = [Mode::Discover, Mode::Transfer]
        .into_iter()
        .find_map(|m| {
            unit.mode_layer
                .get(m)
                .and_then(|layer| layer.target_id.as_deref())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let slug = unit.focus_word().map(slugify).unwrap_or_default();
            if slug.is_empty() {
                DEFAULT_TARGET.to_string()
            } else {
                slug
            }
        });
    TaskOption {
        id,
        label: unit.focus_word().unwrap_or(DEFAULT_FOCUS_WORD).to_string(),
    }
}

/// 构建选项：恰好一个 id 等于 correct_id，无重复 id
///
/// 当前单元自身的候选条目不作为干扰项（其 slug 可能与 correct_id 不同）；
/// 其他单元即便焦点词相同，只要 id 不同仍可作为干扰项。
pub fn build_options<R: Rng + ?Sized>(
    units: &[Unit],
    unit_id: &str,
    correct_id: &str,
    correct_label: &str,
    rng: &mut R,
) -> Vec<TaskOption> {
    let mut seen = HashSet::new();
    let pool: Vec<TaskOption> = units
        .iter()
        .map(candidate_for)
        .filter(|c| seen.insert(c.id.clone()))
        .collect();
    let own_id = units
        .iter()
        .find(|u| u.unit_id == unit_id)
        .map(|u| candidate_for(u).id);

    let correct = pool
        .iter()
        .find(|c| c.id == correct_id)
        .cloned()
        .unwrap_or_else(|| TaskOption {
            id: correct_id.to_string(),
            label: correct_label.to_string(),
        });

    let decoys: Vec<&TaskOption> = pool
        .iter()
        .filter(|c| c.id != correct.id && Some(&c.id) != own_id.as_ref())
        .collect();

    let mut options: Vec<TaskOption> = Vec::with_capacity(MAX_DECOYS + 1);
    options.push(correct);
    options.extend(decoys.choose_multiple(rng, MAX_DECOYS).map(|c| (*c).clone()));
    options.shuffle(rng);
    options
}
