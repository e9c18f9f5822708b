//! 课程数据模型：Module / Unit / 模式层 / 任务层
//!
//! 课程在一次会话内只加载一次且不可变。文档先做最小形状检查（必须有 `modules` 数组），
//! 任何结构错误都会让整份文档被拒绝；单元内缺失的字段则保持缺省，交由解析器统一补默认值。

pub mod source;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::ContentError;

pub use source::{create_curriculum_source, CurriculumSource, FileCurriculumSource};
#[cfg(feature = "http")]
pub use source::HttpCurriculumSource;

/// 教学模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Discover,
    Transfer,
    Maintain,
}

impl Mode {
    /// 当前模式缺少任务层时的回退顺序
    pub const FALLBACK: [Mode; 3] = [Mode::Transfer, Mode::Discover, Mode::Maintain];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Discover => "discover",
            Mode::Transfer => "transfer",
            Mode::Maintain => "maintain",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discover" => Ok(Mode::Discover),
            "transfer" => Ok(Mode::Transfer),
            "maintain" => Ok(Mode::Maintain),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// 任务类型；未知字符串原样保留，校验时一律拒绝
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    /// 点选匹配
    Motor,
    /// 说出焦点词
    Vocal,
    /// 是 / 否判断
    #[default]
    Cognitive,
    /// 现实中展示物体后确认
    MotorAr,
    Unknown(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Motor => "motor",
            TaskType::Vocal => "vocal",
            TaskType::Cognitive => "cognitive",
            TaskType::MotorAr => "motor_ar",
            TaskType::Unknown(raw) => raw.as_str(),
        }
    }
}

impl From<String> for TaskType {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "motor" => TaskType::Motor,
            "vocal" => TaskType::Vocal,
            "cognitive" => TaskType::Cognitive,
            "motor_ar" => TaskType::MotorAr,
            _ => TaskType::Unknown(raw),
        }
    }
}

impl From<TaskType> for String {
    fn from(t: TaskType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 某一模式下的任务层（所有字段可缺省）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskLayer {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, alias = "type")]
    pub task_type: Option<TaskType>,
    #[serde(default, alias = "target")]
    pub target_id: Option<String>,
    #[serde(default, alias = "answer")]
    pub expected: Option<bool>,
}

/// 模式 -> 任务层
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeLayer {
    #[serde(default)]
    pub discover: Option<TaskLayer>,
    #[serde(default)]
    pub transfer: Option<TaskLayer>,
    #[serde(default)]
    pub maintain: Option<TaskLayer>,
}

impl ModeLayer {
    pub fn get(&self, mode: Mode) -> Option<&TaskLayer> {
        match mode {
            Mode::Discover => self.discover.as_ref(),
            Mode::Transfer => self.transfer.as_ref(),
            Mode::Maintain => self.maintain.as_ref(),
        }
    }
}

/// 与模式无关的核心内容：焦点词与概念图形
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversalCore {
    #[serde(default)]
    pub focus_word: Option<String>,
    #[serde(default)]
    pub concept_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    #[serde(default)]
    pub unit_id: String,
    #[serde(default)]
    pub universal_core: UniversalCore,
    #[serde(default)]
    pub mode_layer: ModeLayer,
}

impl Unit {
    /// 去空白后的焦点词；为空视为缺失
    pub fn focus_word(&self) -> Option<&str> {
        self.universal_core
            .focus_word
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub mod_id: String,
    #[serde(default)]
    pub units: Vec<Unit>,
}

/// 完整课程
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub modules: Vec<Module>,
}

impl Curriculum {
    /// 从 JSON 文本解析；形状不合法时整份拒绝
    pub fn from_json_str(raw: &str) -> Result<Self, ContentError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| ContentError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ContentError> {
        match value.get("modules") {
            Some(serde_json::Value::Array(_)) => {}
            _ => return Err(ContentError::MissingModules),
        }
        let mut curriculum: Curriculum =
            serde_json::from_value(value).map_err(|e| ContentError::Malformed(e.to_string()))?;
        curriculum.normalize();
        Ok(curriculum)
    }

    /// 缺失的 mod_id / unit_id 用位置编号补齐，保证每个单元都有稳定的进度键
    fn normalize(&mut self) {
        for (mi, module) in self.modules.iter_mut().enumerate() {
            if module.mod_id.trim().is_empty() {
                module.mod_id = format!("m{mi}");
            }
            for (ui, unit) in module.units.iter_mut().enumerate() {
                if unit.unit_id.trim().is_empty() {
                    unit.unit_id = format!("u{ui}");
                }
            }
        }
    }

    pub fn module(&self, index: usize) -> Option<&Module> {
        self.modules.get(index)
    }

    pub fn unit_count(&self) -> usize {
        self.modules.iter().map(|m| m.units.len()).sum()
    }
}

/// 生成 slug：小写，字母数字保留，其余连续字符折叠为 `-`，首尾去掉 `-`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
