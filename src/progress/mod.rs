//! 进度持久化：会话状态、键值存储后端、存储适配器（含结构迁移）

pub mod kv;
pub mod state;
pub mod store;

pub use kv::{create_kv_store, JsonFileKvStore, KvStore, MemoryKvStore, SqliteKvStore};
pub use state::{unit_key, Progress, SessionState, Unlocks, MAX_TIER};
pub use store::{migrate, ProgressStore, DEFAULT_STATE_KEY};
