//! 键值存储后端
//!
//! 核心只在一个固定键上读写一个序列化值。三种实现：内存、单文件 JSON、SQLite。
//! 工厂按配置选择后端，打开失败时退回内存存储。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use rusqlite::{Connection, OptionalExtension};

use crate::config::StoreSection;
use crate::core::{RecoveryEngine, SessionError, StoreError};

/// 键值存储 trait（同步；每次变更后立即持久化）
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// 后端名称（用于日志）
    fn backend(&self) -> &'static str;
}

/// 内存存储：测试与降级使用
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(_: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// 单文件 JSON 存储：整个文件是一个 `{key: value}` 对象
#[derive(Debug)]
pub struct JsonFileKvStore {
    path: PathBuf,
    /// 串行化读-改-写
    guard: Mutex<()>,
}

impl JsonFileKvStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Io(e.to_string()))?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// 读-改-写前的读取：文件损坏时以空表重写，I/O 失败则原样返回，避免覆盖其他键
    fn read_for_update(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match self.read_all() {
            Err(StoreError::Serialization(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Corrupt store file, rewriting");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let data = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        // 先写临时文件再改名，避免半截文件
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, data).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl KvStore for JsonFileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _lock = self.guard.lock().map_err(poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _lock = self.guard.lock().map_err(poisoned)?;
        let mut entries = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _lock = self.guard.lock().map_err(poisoned)?;
        let mut entries = self.read_for_update()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "json"
    }
}

const CREATE_KV_TABLE: &str = "CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// SQLite 存储：表 kv(key, value, updated_at)
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteKvStore {
    /// 打开或创建数据库文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        conn.execute_batch(CREATE_KV_TABLE)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;
        tracing::info!(path = %path.display(), "kv database opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        conn.execute_batch(CREATE_KV_TABLE)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().map_err(poisoned)?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(poisoned)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// 创建键值存储
///
/// backend 为 sqlite / json 时打开对应文件；打开失败或 backend 未知时使用内存存储
pub fn create_kv_store(cfg: &StoreSection) -> Arc<dyn KvStore> {
    let opened: Result<Arc<dyn KvStore>, StoreError> = match cfg.backend.to_lowercase().as_str() {
        "sqlite" => SqliteKvStore::open(cfg.sqlite_path()).map(|s| Arc::new(s) as Arc<dyn KvStore>),
        "json" => Ok(Arc::new(JsonFileKvStore::new(cfg.json_path()))),
        "memory" => Ok(Arc::new(MemoryKvStore::new())),
        other => Err(StoreError::Unavailable(format!("unknown store backend: {other}"))),
    };

    match opened {
        Ok(store) => {
            tracing::info!("Using {} progress store", store.backend());
            store
        }
        Err(e) => {
            RecoveryEngine::new().handle(&SessionError::Store(e));
            Arc::new(MemoryKvStore::new())
        }
    }
}
