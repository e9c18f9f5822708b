//! 进度存储适配器
//!
//! 在固定的版本化键上读写 SessionState。读写都是「软失败」：
//! 读失败等同于首次运行，写失败只记日志，不打断学习者。

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::progress::state::{SessionState, MAX_TIER};
use crate::progress::KvStore;

/// 默认存储键（结构变化时提升版本号）
pub const DEFAULT_STATE_KEY: &str = "maker.session.v1";

/// 进度存储适配器：序列化 / 反序列化 / 迁移
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KvStore>,
    key: String,
}

impl ProgressStore {
    pub fn new(kv: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self { kv, key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 读取并迁移；键不存在、内容损坏或存储不可用时返回 None
    pub fn load(&self) -> Option<SessionState> {
        let raw = match self.kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Progress load failed, treating as first run");
                return None;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) if value.is_object() => Some(migrate(&value)),
            Ok(_) => {
                tracing::warn!(key = %self.key, "Stored progress is not an object, ignoring");
                None
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Stored progress is malformed, ignoring");
                None
            }
        }
    }

    /// 写入当前状态；返回是否成功（失败只记日志）
    pub fn save(&self, state: &SessionState) -> bool {
        let mut stamped = state.clone();
        stamped.updated_at = Some(chrono::Utc::now().to_rfc3339());
        let raw = match serde_json::to_string(&stamped) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Progress serialization failed");
                return false;
            }
        };
        match self.kv.set(&self.key, &raw) {
            Ok(()) => {
                tracing::debug!(key = %self.key, backend = self.kv.backend(), "Progress saved");
                true
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Progress save failed, continuing in memory");
                false
            }
        }
    }

    /// 显式重置：删除存储值
    pub fn clear(&self) -> bool {
        match self.kv.remove(&self.key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Progress clear failed");
                false
            }
        }
    }
}

/// 非负整数字段（兼容 `2.0` 这类浮点写法）
fn non_negative(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.trunc() as u64)
    })
}

fn index_field(obj: &Map<String, Value>, name: &str) -> Option<usize> {
    non_negative(obj.get(name)).map(|n| usize::try_from(n).unwrap_or(usize::MAX))
}

/// 将任意旧版本 / 残缺的存储值补齐为当前结构
///
/// 已有字段保持不变，缺失的子字段取默认值；对当前结构的值是幂等的。
/// 旧版顶层 `currentUnit` 会迁入 `progress.currentUnitIndex`。
pub fn migrate(raw: &Value) -> SessionState {
    let mut state = SessionState::default();
    let Some(obj) = raw.as_object() else {
        return state;
    };

    if let Some(mode) = obj
        .get("mode")
        .and_then(Value::as_str)
        .and_then(|m| m.parse().ok())
    {
        state.mode = mode;
    }
    state.updated_at = obj
        .get("updatedAt")
        .and_then(Value::as_str)
        .map(str::to_string);

    let progress = obj.get("progress").and_then(Value::as_object);
    let p = &mut state.progress;

    if let Some(progress) = progress {
        p.current_module_index = index_field(progress, "currentModuleIndex").unwrap_or(0);
        p.current_unit_index = index_field(progress, "currentUnitIndex").unwrap_or(0);

        if let Some(completed) = progress.get("completed").and_then(Value::as_object) {
            p.completed = completed
                .iter()
                .filter_map(|(k, v)| v.as_bool().map(|done| (k.clone(), done)))
                .collect();
        }
        if let Some(attempts) = progress.get("attempts").and_then(Value::as_object) {
            p.attempts = attempts
                .iter()
                .filter_map(|(k, v)| {
                    non_negative(Some(v)).map(|n| (k.clone(), u32::try_from(n).unwrap_or(u32::MAX)))
                })
                .collect();
        }
        let tier = progress
            .get("unlocks")
            .and_then(Value::as_object)
            .and_then(|u| non_negative(u.get("tier")))
            .unwrap_or(0);
        p.unlocks.tier = tier.min(u64::from(MAX_TIER)) as u8;
    }

    let has_unit_index = progress.is_some_and(|p| p.contains_key("currentUnitIndex"));
    if !has_unit_index {
        if let Some(legacy) = index_field(obj, "currentUnit") {
            p.current_unit_index = legacy;
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StoreError;
    use crate::curriculum::Mode;
    use crate::progress::MemoryKvStore;
    use serde_json::json;

    struct BrokenKv;

    impl KvStore for BrokenKv {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("private browsing".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io("quota exceeded".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Io("quota exceeded".to_string()))
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn memory_store() -> (Arc<MemoryKvStore>, ProgressStore) {
        let kv = Arc::new(MemoryKvStore::new());
        let store = ProgressStore::new(kv.clone(), DEFAULT_STATE_KEY);
        (kv, store)
    }

    #[test]
    fn test_load_missing_key_is_first_run() {
        let (_, store) = memory_store();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_malformed_is_first_run() {
        let (kv, store) = memory_store();
        kv.set(DEFAULT_STATE_KEY, "{not json").unwrap();
        assert!(store.load().is_none());
        kv.set(DEFAULT_STATE_KEY, "42").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_store_failures_are_soft() {
        let store = ProgressStore::new(Arc::new(BrokenKv), DEFAULT_STATE_KEY);
        assert!(store.load().is_none());
        assert!(!store.save(&SessionState::default()));
        assert!(!store.clear());
    }

    #[test]
    fn test_save_then_load_round_trips_and_stamps() {
        let (_, store) = memory_store();
        let mut state = SessionState::default();
        state.mode = Mode::Maintain;
        state.progress.current_unit_index = 4;
        state.progress.completed.insert("m1:u1".to_string(), true);
        state.progress.attempts.insert("m1:u2".to_string(), 2);
        state.progress.unlocks.tier = 1;

        assert!(store.save(&state));
        let loaded = store.load().unwrap();
        assert!(loaded.updated_at.is_some());
        assert_eq!(loaded.progress, state.progress);
        assert_eq!(loaded.mode, Mode::Maintain);
    }

    #[test]
    fn test_clear_removes_value() {
        let (_, store) = memory_store();
        store.save(&SessionState::default());
        assert!(store.clear());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_migrate_empty_object_yields_defaults() {
        assert_eq!(migrate(&json!({})), SessionState::default());
    }

    #[test]
    fn test_migrate_fills_missing_sub_fields() {
        let raw = json!({
            "mode": "transfer",
            "progress": { "currentModuleIndex": 1, "completed": { "m2:a": true } }
        });
        let state = migrate(&raw);
        assert_eq!(state.mode, Mode::Transfer);
        assert_eq!(state.progress.current_module_index, 1);
        assert_eq!(state.progress.current_unit_index, 0);
        assert!(state.is_completed("m2:a"));
        assert!(state.progress.attempts.is_empty());
        assert_eq!(state.tier(), 0);
    }

    #[test]
    fn test_migrate_legacy_current_unit() {
        let state = migrate(&json!({ "currentUnit": 3 }));
        assert_eq!(state.progress.current_unit_index, 3);

        // 新结构已有索引时不被旧字段覆盖
        let state = migrate(&json!({ "currentUnit": 3, "progress": { "currentUnitIndex": 1 } }));
        assert_eq!(state.progress.current_unit_index, 1);
    }

    #[test]
    fn test_migrate_sanitizes_bad_values() {
        let raw = json!({
            "mode": "explore",
            "progress": {
                "currentModuleIndex": -2,
                "currentUnitIndex": 2.0,
                "completed": { "a": true, "b": "yes" },
                "attempts": { "a": 1, "b": "x", "c": 0 },
                "unlocks": { "tier": 9 }
            }
        });
        let state = migrate(&raw);
        assert_eq!(state.mode, Mode::Discover);
        assert_eq!(state.progress.current_module_index, 0);
        assert_eq!(state.progress.current_unit_index, 2);
        assert_eq!(state.progress.completed.len(), 1);
        assert_eq!(state.progress.attempts.get("a"), Some(&1));
        assert_eq!(state.progress.attempts.get("c"), Some(&0));
        assert!(!state.progress.attempts.contains_key("b"));
        assert_eq!(state.tier(), MAX_TIER);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let samples = [
            json!({}),
            json!(null),
            json!({ "currentUnit": 5 }),
            json!({ "mode": "maintain", "progress": { "attempts": { "m:u": 2 } } }),
            serde_json::to_value(SessionState {
                mode: Mode::Transfer,
                updated_at: Some("2026-01-01T00:00:00Z".to_string()),
                ..SessionState::default()
            })
            .unwrap(),
        ];
        for raw in samples {
            let once = migrate(&raw);
            let twice = migrate(&serde_json::to_value(&once).unwrap());
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_migrate_current_state_unchanged() {
        let mut state = SessionState::default();
        state.progress.current_module_index = 2;
        state.progress.completed.insert("m:u".to_string(), true);
        state.progress.unlocks.tier = 2;
        assert_eq!(migrate(&serde_json::to_value(&state).unwrap()), state);
    }
}
