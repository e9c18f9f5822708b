//! 课程内容来源
//!
//! 文件来源直接读取本地 JSON；HTTP 来源网络优先，成功后写入本地缓存，离线时回落到最后一份可用缓存。
//! 只有通过形状检查的文档才会被缓存。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CurriculumSection;
use crate::core::ContentError;
use crate::curriculum::Curriculum;

/// 课程来源 trait：一次性异步拉取
#[async_trait]
pub trait CurriculumSource: Send + Sync {
    async fn fetch(&self) -> Result<Curriculum, ContentError>;

    /// 来源描述（用于日志）
    fn describe(&self) -> String;
}

/// 本地文件来源
#[derive(Debug, Clone)]
pub struct FileCurriculumSource {
    path: PathBuf,
}

impl FileCurriculumSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CurriculumSource for FileCurriculumSource {
    async fn fetch(&self) -> Result<Curriculum, ContentError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ContentError::Unavailable(format!("{}: {e}", self.path.display())))?;
        Curriculum::from_json_str(&raw)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// HTTP 来源：网络优先，失败时读本地缓存
#[cfg(feature = "http")]
pub struct HttpCurriculumSource {
    url: String,
    cache_path: Option<PathBuf>,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpCurriculumSource {
    pub fn new(url: impl Into<String>, cache_path: Option<PathBuf>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs.max(1)))
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            cache_path,
            client,
        }
    }

    async fn fetch_network(&self) -> Result<(Curriculum, String), ContentError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ContentError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ContentError::Unavailable(format!("HTTP {}", resp.status())));
        }
        let raw = resp
            .text()
            .await
            .map_err(|e| ContentError::Unavailable(e.to_string()))?;
        let curriculum = Curriculum::from_json_str(&raw)?;
        Ok((curriculum, raw))
    }

    async fn read_cache(&self) -> Option<Curriculum> {
        let path = self.cache_path.as_ref()?;
        let raw = tokio::fs::read_to_string(path).await.ok()?;
        match Curriculum::from_json_str(&raw) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cached curriculum is unusable");
                None
            }
        }
    }

    async fn write_cache(&self, raw: &str) {
        let Some(path) = self.cache_path.as_ref() else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(e) = tokio::fs::write(path, raw).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to cache curriculum");
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl CurriculumSource for HttpCurriculumSource {
    async fn fetch(&self) -> Result<Curriculum, ContentError> {
        match self.fetch_network().await {
            Ok((curriculum, raw)) => {
                self.write_cache(&raw).await;
                Ok(curriculum)
            }
            Err(network_err) => {
                tracing::info!(url = %self.url, error = %network_err, "Network fetch failed, trying cache");
                self.read_cache().await.ok_or(network_err)
            }
        }
    }

    fn describe(&self) -> String {
        format!("http:{}", self.url)
    }
}

/// 根据配置创建课程来源：配置了 url（且启用 http feature）则走网络优先，否则读本地文件
pub fn create_curriculum_source(cfg: &CurriculumSection) -> Arc<dyn CurriculumSource> {
    #[cfg(feature = "http")]
    if let Some(url) = cfg.url.as_ref().filter(|u| !u.trim().is_empty()) {
        tracing::info!("Using HTTP curriculum source: {}", url);
        return Arc::new(HttpCurriculumSource::new(
            url.clone(),
            cfg.cache_path.clone(),
            cfg.fetch_timeout_secs,
        ));
    }

    #[cfg(not(feature = "http"))]
    if cfg.url.is_some() {
        tracing::warn!("Curriculum url configured but http feature not enabled, using file source");
    }

    tracing::info!("Using file curriculum source: {}", cfg.path.display());
    Arc::new(FileCurriculumSource::new(&cfg.path))
}
