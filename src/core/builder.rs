//! 会话构建器：统一的引擎初始化逻辑
//!
//! 终端驱动与集成测试共用同一套装配：进度存储、随机源、课程来源、监听者。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{AppConfig, StoreSection};
use crate::curriculum::{create_curriculum_source, CurriculumSource};
use crate::engine::{SessionConfig, SessionEngine, TaskObserver};
use crate::progress::{create_kv_store, ProgressStore};

/// 会话构建器：统一配置和初始化 SessionEngine 的各个组件
pub struct SessionBuilder {
    config: AppConfig,
    store: Option<ProgressStore>,
    seed: Option<u64>,
    observers: Vec<Arc<dyn TaskObserver>>,
}

impl SessionBuilder {
    pub fn new(config: AppConfig) -> Self {
        let seed = config.app.shuffle_seed;
        Self {
            config,
            store: None,
            seed,
            observers: Vec::new(),
        }
    }

    /// 使用外部提供的进度存储（测试常用内存存储）
    pub fn with_store(mut self, store: ProgressStore) -> Self {
        self.store = Some(store);
        self
    }

    /// 固定随机种子
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// 未显式设置路径时，进度文件放在 [app].data_dir 下
    pub fn store_section(&self) -> StoreSection {
        let mut section = self.config.store.clone();
        if section.path.is_none() {
            let file = match section.backend.to_lowercase().as_str() {
                "sqlite" => "progress.db",
                _ => "progress.json",
            };
            section.path = Some(self.config.app.data_dir.join(file));
        }
        section
    }

    /// 构建进度存储（后端打不开时由工厂退回内存）
    pub fn build_store(&self) -> ProgressStore {
        if let Some(store) = &self.store {
            return store.clone();
        }
        let section = self.store_section();
        ProgressStore::new(create_kv_store(&section), section.state_key.clone())
    }

    pub fn build_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn build_source(&self) -> Arc<dyn CurriculumSource> {
        create_curriculum_source(&self.config.curriculum)
    }

    /// 构建引擎并注册监听者
    pub fn build(&self) -> SessionEngine {
        let mut engine = SessionEngine::new(
            SessionConfig::from_app_config(&self.config),
            self.build_store(),
            self.build_rng(),
        );
        for observer in &self.observers {
            engine.subscribe(observer.clone());
        }
        engine
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.app.data_dir
    }
}

/// 便捷函数：从默认路径创建 SessionBuilder
pub fn create_session_builder(config_path: Option<PathBuf>) -> SessionBuilder {
    SessionBuilder::new(crate::config::load_config_or_default(config_path))
}
