//! 任务解析器
//!
//! 给定课程与会话状态，确定当前单元与要呈现的任务层：
//! 1. 模块索引越界 → 课程完成
//! 2. 单元索引越界 → 有下一模块则进入其第一个单元（需持久化），否则课程完成
//! 3. 任务层按 当前模式 → transfer → discover → maintain → 合成默认层 回退
//! 4. 所有缺省字段在这里统一补齐

use crate::curriculum::{slugify, Curriculum, Mode, Module, TaskLayer, TaskType, Unit};
use crate::engine::task::{ActiveTask, TaskTicket};
use crate::progress::{unit_key, SessionState};

pub const TERMINAL_MESSAGE: &str = "curriculum complete";
pub const DEFAULT_FOCUS_WORD: &str = "—";
pub const DEFAULT_CONCEPT_GLYPH: &str = "█";
pub const DEFAULT_PROMPT: &str = "tap to continue";
pub const DEFAULT_TARGET: &str = "target";

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Task(ActiveTask),
    Terminal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOutcome {
    pub resolution: Resolution,
    /// 是否因跨模块推进修改了状态（调用方负责持久化）
    pub state_changed: bool,
    /// 单元数据缺失而补了默认值时的说明
    pub malformed: Option<String>,
}

/// 按回退顺序查找有效任务层，返回实际使用的模式
pub fn effective_layer(unit: &Unit, mode: Mode) -> Option<(Mode, &TaskLayer)> {
    std::iter::once(mode)
        .chain(Mode::FALLBACK)
        .find_map(|m| unit.mode_layer.get(m).map(|layer| (m, layer)))
}

/// 解析当前活动任务；motor 选项由引擎另行构建
pub fn resolve_active_task(
    curriculum: &Curriculum,
    state: &mut SessionState,
    generation: u64,
) -> ResolveOutcome {
    let mut state_changed = false;
    loop {
        let module_index = state.progress.current_module_index;
        let Some(module) = curriculum.module(module_index) else {
            return terminal(state_changed);
        };

        let unit_index = state.progress.current_unit_index;
        let Some(unit) = module.units.get(unit_index) else {
            if module_index + 1 < curriculum.modules.len() {
                state.progress.current_module_index = module_index + 1;
                state.progress.current_unit_index = 0;
                state_changed = true;
                tracing::info!(
                    from = %module.mod_id,
                    to = module_index + 1,
                    "Module finished, advancing"
                );
                continue;
            }
            return terminal(state_changed);
        };

        let (task, malformed) = build_task(module, unit, state.mode, generation);
        return ResolveOutcome {
            resolution: Resolution::Task(task),
            state_changed,
            malformed,
        };
    }
}

fn terminal(state_changed: bool) -> ResolveOutcome {
    ResolveOutcome {
        resolution: Resolution::Terminal(TERMINAL_MESSAGE.to_string()),
        state_changed,
        malformed: None,
    }
}

fn build_task(
    module: &Module,
    unit: &Unit,
    mode: Mode,
    generation: u64,
) -> (ActiveTask, Option<String>) {
    let raw_focus = unit.focus_word();
    let mut missing = Vec::new();
    if raw_focus.is_none() {
        missing.push("focus_word");
    }
    let focus_word = raw_focus.unwrap_or(DEFAULT_FOCUS_WORD).to_string();
    let concept_glyph = unit
        .universal_core
        .concept_image
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or(DEFAULT_CONCEPT_GLYPH)
        .to_string();

    let (layer_mode, prompt, task_type, target_id, expected) = match effective_layer(unit, mode) {
        Some((layer_mode, layer)) => {
            let target = layer
                .target_id
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| {
                    raw_focus
                        .map(str::to_lowercase)
                        .unwrap_or_else(|| DEFAULT_TARGET.to_string())
                });
            (
                Some(layer_mode),
                layer.prompt.clone().unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
                layer.task_type.clone().unwrap_or_default(),
                target,
                layer.expected.unwrap_or(true),
            )
        }
        None => {
            tracing::debug!(module = %module.mod_id, unit = %unit.unit_id, "Unit has no task layers, synthesizing default");
            missing.push("mode_layer");
            let slug = raw_focus.map(slugify).unwrap_or_default();
            let target = if slug.is_empty() {
                DEFAULT_TARGET.to_string()
            } else {
                slug
            };
            (None, DEFAULT_PROMPT.to_string(), TaskType::Cognitive, target, true)
        }
    };

    let task = ActiveTask {
        ticket: TaskTicket {
            generation,
            unit_key: unit_key(&module.mod_id, &unit.unit_id),
        },
        module_id: module.mod_id.clone(),
        unit_id: unit.unit_id.clone(),
        layer_mode,
        focus_word,
        concept_glyph,
        prompt,
        task_type,
        target_id,
        expected,
        options: Vec::new(),
    };
    let malformed = (!missing.is_empty())
        .then(|| format!("{} missing {}", task.ticket.unit_key, missing.join(", ")));
    (task, malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(prompt: &str) -> serde_json::Value {
        json!({ "prompt": prompt, "task_type": "cognitive" })
    }

    fn curriculum_with_layers(layers: serde_json::Value) -> Curriculum {
        Curriculum::from_value(json!({
            "modules": [{ "mod_id": "m1", "units": [{
                "unit_id": "u1",
                "universal_core": { "focus_word": "Roter Apfel" },
                "mode_layer": layers
            }]}]
        }))
        .unwrap()
    }

    fn resolve_task(curriculum: &Curriculum, mode: Mode) -> ActiveTask {
        let mut state = SessionState {
            mode,
            ..SessionState::default()
        };
        match resolve_active_task(curriculum, &mut state, 1).resolution {
            Resolution::Task(task) => task,
            other => panic!("expected task, got {other:?}"),
        }
    }

    #[test]
    fn test_current_mode_layer_wins() {
        let c = curriculum_with_layers(json!({
            "discover": layer("d"), "transfer": layer("t"), "maintain": layer("m")
        }));
        assert_eq!(resolve_task(&c, Mode::Maintain).prompt, "m");
    }

    #[test]
    fn test_fallback_prefers_transfer() {
        let c = curriculum_with_layers(json!({
            "discover": layer("d"), "transfer": layer("t"), "maintain": layer("m")
        }));
        let c_without_maintain = curriculum_with_layers(json!({
            "discover": layer("d"), "transfer": layer("t")
        }));
        assert_eq!(resolve_task(&c, Mode::Transfer).prompt, "t");
        let task = resolve_task(&c_without_maintain, Mode::Maintain);
        assert_eq!(task.prompt, "t");
        assert_eq!(task.layer_mode, Some(Mode::Transfer));
    }

    #[test]
    fn test_fallback_then_discover_then_maintain() {
        let c = curriculum_with_layers(json!({ "discover": layer("d"), "maintain": layer("m") }));
        assert_eq!(resolve_task(&c, Mode::Transfer).prompt, "d");

        let c = curriculum_with_layers(json!({ "maintain": layer("m") }));
        assert_eq!(resolve_task(&c, Mode::Discover).prompt, "m");
    }

    #[test]
    fn test_synthesized_default_layer() {
        let c = curriculum_with_layers(json!({}));
        let task = resolve_task(&c, Mode::Discover);
        assert_eq!(task.prompt, DEFAULT_PROMPT);
        assert_eq!(task.task_type, TaskType::Cognitive);
        assert_eq!(task.target_id, "roter-apfel");
        assert!(task.expected);
        assert_eq!(task.layer_mode, None);
    }

    #[test]
    fn test_defaults_for_missing_core_fields() {
        let c = Curriculum::from_value(json!({
            "modules": [{ "mod_id": "m1", "units": [{ "unit_id": "u1",
                "mode_layer": { "discover": { "task_type": "motor" } } }] }]
        }))
        .unwrap();
        let task = resolve_task(&c, Mode::Discover);
        assert_eq!(task.focus_word, DEFAULT_FOCUS_WORD);
        assert_eq!(task.concept_glyph, DEFAULT_CONCEPT_GLYPH);
        assert_eq!(task.target_id, DEFAULT_TARGET);
        assert_eq!(task.prompt, DEFAULT_PROMPT);
        assert!(task.expected);
        assert_eq!(task.ticket.unit_key, "m1:u1");
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let c = Curriculum::from_value(json!({
            "modules": [{ "mod_id": "m1", "units": [{ "unit_id": "u1" }] }]
        }))
        .unwrap();
        let outcome = resolve_active_task(&c, &mut SessionState::default(), 1);
        assert_eq!(outcome.malformed.as_deref(), Some("m1:u1 missing focus_word, mode_layer"));

        let c = curriculum_with_layers(json!({ "discover": layer("d") }));
        assert_eq!(resolve_active_task(&c, &mut SessionState::default(), 1).malformed, None);
    }

    #[test]
    fn test_target_defaults_to_lowercased_focus_word() {
        let c = curriculum_with_layers(json!({ "discover": { "task_type": "motor" } }));
        assert_eq!(resolve_task(&c, Mode::Discover).target_id, "roter apfel");
    }

    #[test]
    fn test_unit_overflow_advances_module() {
        let c = Curriculum::from_value(json!({ "modules": [
            { "mod_id": "m1", "units": [{ "unit_id": "a" }] },
            { "mod_id": "m2", "units": [] },
            { "mod_id": "m3", "units": [{ "unit_id": "b" }] }
        ]}))
        .unwrap();
        let mut state = SessionState::default();
        state.progress.current_unit_index = 1;

        let outcome = resolve_active_task(&c, &mut state, 3);
        assert!(outcome.state_changed);
        assert_eq!(state.progress.current_module_index, 2);
        assert_eq!(state.progress.current_unit_index, 0);
        match outcome.resolution {
            Resolution::Task(task) => assert_eq!(task.unit_key(), "m3:b"),
            other => panic!("expected task, got {other:?}"),
        }
    }

    #[test]
    fn test_last_module_exhausted_is_terminal() {
        let c = curriculum_with_layers(json!({}));
        let mut state = SessionState::default();
        state.progress.current_unit_index = 1;
        let outcome = resolve_active_task(&c, &mut state, 1);
        assert_eq!(outcome.resolution, Resolution::Terminal(TERMINAL_MESSAGE.to_string()));
        assert!(!outcome.state_changed);
        assert_eq!(state.progress.current_unit_index, 1);
    }

    #[test]
    fn test_module_index_out_of_range_is_terminal() {
        let c = curriculum_with_layers(json!({}));
        let mut state = SessionState::default();
        state.progress.current_module_index = 5;
        assert!(matches!(
            resolve_active_task(&c, &mut state, 1).resolution,
            Resolution::Terminal(_)
        ));
    }

    #[test]
    fn test_empty_curriculum_is_terminal() {
        let c = Curriculum::default();
        let mut state = SessionState::default();
        assert!(matches!(
            resolve_active_task(&c, &mut state, 1).resolution,
            Resolution::Terminal(_)
        ));
    }
}
