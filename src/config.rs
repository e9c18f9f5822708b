//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MAKER__*` 覆盖（双下划线表示嵌套，如 `MAKER__STORE__BACKEND=sqlite`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::curriculum::Mode;
use crate::progress::DEFAULT_STATE_KEY;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub curriculum: CurriculumSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub voice: VoiceSection,
}

/// [app] 段：应用名、数据目录、随机种子
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 进度文件等的根目录
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// 固定选项顺序（演示 / 排查用）；未设置时使用系统熵
    pub shuffle_seed: Option<u64>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            data_dir: default_data_dir(),
            shuffle_seed: None,
        }
    }
}

/// [curriculum] 段：本地课程文件，或远程地址 + 离线缓存
#[derive(Debug, Clone, Deserialize)]
pub struct CurriculumSection {
    #[serde(default = "default_curriculum_path")]
    pub path: PathBuf,
    /// 设置后优先走网络，失败时读取 cache_path
    pub url: Option<String>,
    pub cache_path: Option<PathBuf>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_curriculum_path() -> PathBuf {
    PathBuf::from("content/curriculum.json")
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for CurriculumSection {
    fn default() -> Self {
        Self {
            path: default_curriculum_path(),
            url: None,
            cache_path: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// [session] 段：初始模式、失败阈值、两种延时
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    #[serde(default)]
    pub initial_mode: Mode,
    /// 连续失败多少次触发回退
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_success_delay_ms")]
    pub success_delay_ms: u64,
    #[serde(default = "default_regression_delay_ms")]
    pub regression_delay_ms: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_success_delay_ms() -> u64 {
    900
}

fn default_regression_delay_ms() -> u64 {
    2400
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            initial_mode: Mode::default(),
            failure_threshold: default_failure_threshold(),
            success_delay_ms: default_success_delay_ms(),
            regression_delay_ms: default_regression_delay_ms(),
        }
    }
}

/// [store] 段：进度存储后端（json / sqlite / memory）
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// 未设置时按后端放在 data/ 下
    pub path: Option<PathBuf>,
    #[serde(default = "default_state_key")]
    pub state_key: String,
}

fn default_store_backend() -> String {
    "json".to_string()
}

fn default_state_key() -> String {
    DEFAULT_STATE_KEY.to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
            state_key: default_state_key(),
        }
    }
}

impl StoreSection {
    pub fn sqlite_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("progress.db"))
    }

    pub fn json_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("progress.json"))
    }
}

/// [voice] 段：语音识别语言与开始 / 停止口令
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceSection {
    #[serde(default = "default_voice_enabled")]
    pub enabled: bool,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_start_keyword")]
    pub start_keyword: String,
    #[serde(default = "default_stop_keyword")]
    pub stop_keyword: String,
}

fn default_voice_enabled() -> bool {
    true
}

fn default_lang() -> String {
    "de-DE".to_string()
}

fn default_start_keyword() -> String {
    "start".to_string()
}

fn default_stop_keyword() -> String {
    "stop".to_string()
}

impl Default for VoiceSection {
    fn default() -> Self {
        Self {
            enabled: default_voice_enabled(),
            lang: default_lang(),
            start_keyword: default_start_keyword(),
            stop_keyword: default_stop_keyword(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MAKER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MAKER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("Config file {} not found, ignoring", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MAKER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 加载失败时退回默认配置并记录警告
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    })
}
