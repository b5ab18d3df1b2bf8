//! Per-user persistence of directory handles, including the legacy unscoped record.

use std::rc::Rc;

use persistence_host::{DirectoryHandle, KeyValueStore, SharedDirectoryHandle, StoredValue};

use crate::{config::StorageConfig, error::StorageError};

const TARGET: &str = "quiz_storage::handle_store";

/// Checks that a handle exposes the minimal capability surface.
///
/// # Errors
///
/// Returns [`StorageError::HandleInvalid`] naming the missing capabilities.
pub fn validate_handle(handle: &SharedDirectoryHandle) -> Result<(), StorageError> {
    let capabilities = handle.capabilities();
    if capabilities.is_usable() {
        return Ok(());
    }
    Err(StorageError::HandleInvalid {
        reason: format!("missing {}", capabilities.missing().join(", ")),
    })
}

#[derive(Clone)]
/// Handle records keyed by `handle_key_prefix + username`.
pub struct HandleStore {
    kv: Rc<dyn KeyValueStore>,
    config: Rc<StorageConfig>,
}

impl HandleStore {
    /// Creates a store over `kv`.
    pub fn new(kv: Rc<dyn KeyValueStore>, config: Rc<StorageConfig>) -> Self {
        Self { kv, config }
    }

    /// Persists `handle` for `username`.
    ///
    /// A handle failing the capability check is not written; the rejection is logged.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::HandleInvalid`] for a rejected handle and
    /// [`StorageError::LocalStore`] when the store write fails.
    pub async fn store_handle(
        &self,
        username: &str,
        handle: SharedDirectoryHandle,
    ) -> Result<(), StorageError> {
        if let Err(err) = validate_handle(&handle) {
            tracing::warn!(target: TARGET, user = username, error = %err, "refusing to store handle");
            return Err(err);
        }
        let key = self.config.user_handle_key(username);
        self.kv
            .put(&key, StoredValue::Handle(handle))
            .await
            .map_err(|message| {
                tracing::warn!(target: TARGET, user = username, error = %message, "handle store write failed");
                StorageError::local("put", message)
            })
    }

    /// Loads the usable handle stored for `username`.
    ///
    /// Missing records, corrupt records, unusable handles, and store failures all yield `None`;
    /// everything but a missing record is logged as a warning.
    pub async fn load_handle(&self, username: &str) -> Option<SharedDirectoryHandle> {
        let key = self.config.user_handle_key(username);
        self.read_usable(&key, username).await
    }

    /// Removes the handle stored for `username`. Clearing a missing record succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the store delete fails.
    pub async fn clear_handle(&self, username: &str) -> Result<(), StorageError> {
        let key = self.config.user_handle_key(username);
        self.kv
            .delete(&key)
            .await
            .map_err(|message| StorageError::local("delete", message))
    }

    /// Removes the legacy unscoped record so it cannot be migrated forward again.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the store delete fails.
    pub async fn clear_legacy_handle(&self) -> Result<(), StorageError> {
        self.kv
            .delete(&self.config.legacy_handle_key)
            .await
            .map_err(|message| StorageError::local("delete", message))
    }

    /// Copies the legacy unscoped record to `username` if the user has no record yet.
    ///
    /// The legacy record is kept so a concurrent reader of the old key is never left empty.
    /// Returns `true` only when a copy was written; repeated calls are no-ops.
    pub async fn migrate_legacy_handle(&self, username: &str) -> bool {
        let user_key = self.config.user_handle_key(username);
        match self.kv.get(&user_key).await {
            Ok(Some(_)) => return false,
            Ok(None) => {}
            Err(message) => {
                tracing::warn!(target: TARGET, user = username, error = %message, "handle store unavailable; skipping legacy migration");
                return false;
            }
        }

        let legacy_key = self.config.legacy_handle_key.as_str();
        let Some(handle) = self.read_usable(legacy_key, username).await else {
            return false;
        };

        match self.kv.put(&user_key, StoredValue::Handle(handle)).await {
            Ok(()) => {
                tracing::info!(target: TARGET, user = username, "migrated legacy directory handle");
                true
            }
            Err(message) => {
                tracing::warn!(target: TARGET, user = username, error = %message, "legacy handle migration write failed");
                false
            }
        }
    }

    async fn read_usable(&self, key: &str, username: &str) -> Option<SharedDirectoryHandle> {
        let record = match self.kv.get(key).await {
            Ok(record) => record?,
            Err(message) => {
                tracing::warn!(target: TARGET, user = username, key, error = %message, "handle store read failed");
                return None;
            }
        };
        let StoredValue::Handle(handle) = record else {
            tracing::warn!(target: TARGET, user = username, key, "handle record is corrupt");
            return None;
        };
        match validate_handle(&handle) {
            Ok(()) => Some(handle),
            Err(err) => {
                tracing::warn!(target: TARGET, user = username, key, error = %err, "ignoring stored handle");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use persistence_host::{
        HandleCapabilities, KeyValueStoreFuture, MemoryDirectoryHandle, MemoryKeyValueStore,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn store_over(kv: &MemoryKeyValueStore) -> HandleStore {
        HandleStore::new(Rc::new(kv.clone()), Rc::new(StorageConfig::default()))
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get<'a>(
            &'a self,
            _key: &'a str,
        ) -> KeyValueStoreFuture<'a, Result<Option<StoredValue>, String>> {
            Box::pin(async { Err("database blocked".to_string()) })
        }

        fn put<'a>(
            &'a self,
            _key: &'a str,
            _value: StoredValue,
        ) -> KeyValueStoreFuture<'a, Result<(), String>> {
            Box::pin(async { Err("database blocked".to_string()) })
        }

        fn delete<'a>(&'a self, _key: &'a str) -> KeyValueStoreFuture<'a, Result<(), String>> {
            Box::pin(async { Err("database blocked".to_string()) })
        }

        fn keys<'a>(&'a self) -> KeyValueStoreFuture<'a, Result<Vec<String>, String>> {
            Box::pin(async { Err("database blocked".to_string()) })
        }
    }

    #[test]
    fn store_load_and_clear_are_scoped_per_user() {
        let kv = MemoryKeyValueStore::default();
        let store = store_over(&kv);

        block_on(store.store_handle("ada", MemoryDirectoryHandle::new("ada-dir").shared()))
            .expect("store");
        assert_eq!(
            block_on(store.load_handle("ada")).expect("ada handle").name(),
            "ada-dir"
        );
        assert!(block_on(store.load_handle("bob")).is_none());
        assert!(kv.peek("directoryHandle_ada").is_some());

        block_on(store.clear_handle("ada")).expect("clear");
        block_on(store.clear_handle("ada")).expect("clear is idempotent");
        assert!(block_on(store.load_handle("ada")).is_none());
    }

    #[test]
    fn malformed_handles_are_rejected_without_writing() {
        let kv = MemoryKeyValueStore::default();
        let store = store_over(&kv);
        let dir = MemoryDirectoryHandle::new("stale");
        dir.set_capabilities(HandleCapabilities::NONE);

        let err = block_on(store.store_handle("ada", dir.shared())).expect_err("rejected");
        assert!(matches!(err, StorageError::HandleInvalid { .. }));
        assert_eq!(kv.put_calls(), 0);
    }

    #[test]
    fn validation_names_only_the_missing_capabilities() {
        let dir = MemoryDirectoryHandle::new("quiz");
        validate_handle(&dir.shared()).expect("full handle is usable");

        dir.set_capabilities(HandleCapabilities {
            can_enumerate_entries: false,
            ..HandleCapabilities::FULL
        });
        assert_eq!(
            validate_handle(&dir.shared()),
            Err(StorageError::HandleInvalid {
                reason: "missing entries".to_string(),
            })
        );
    }

    #[test]
    fn corrupt_or_unusable_records_load_as_none() {
        let kv = MemoryKeyValueStore::default();
        kv.seed("directoryHandle_ada", StoredValue::Json(json!({"kind": "directory"})));
        let dir = MemoryDirectoryHandle::new("stale");
        dir.set_capabilities(HandleCapabilities {
            can_open_entries: false,
            ..HandleCapabilities::FULL
        });
        kv.seed("directoryHandle_bob", StoredValue::Handle(dir.shared()));
        let store = store_over(&kv);

        assert!(block_on(store.load_handle("ada")).is_none());
        assert!(block_on(store.load_handle("bob")).is_none());
    }

    #[test]
    fn unavailable_store_degrades_instead_of_failing() {
        let store = HandleStore::new(Rc::new(BrokenStore), Rc::new(StorageConfig::default()));

        assert!(block_on(store.load_handle("ada")).is_none());
        assert!(!block_on(store.migrate_legacy_handle("ada")));
        let err = block_on(store.store_handle("ada", MemoryDirectoryHandle::new("d").shared()))
            .expect_err("write fails");
        assert!(err.is_fatal());
    }

    #[test]
    fn legacy_handle_is_copied_forward_once_and_kept() {
        let kv = MemoryKeyValueStore::default();
        kv.seed(
            "directoryHandle",
            StoredValue::Handle(MemoryDirectoryHandle::new("legacy").shared()),
        );
        let store = store_over(&kv);

        assert!(block_on(store.migrate_legacy_handle("ada")));
        let after_first = block_on(kv.keys()).expect("keys");
        let puts_after_first = kv.put_calls();

        assert!(!block_on(store.migrate_legacy_handle("ada")));
        assert_eq!(block_on(kv.keys()).expect("keys"), after_first);
        assert_eq!(kv.put_calls(), puts_after_first);
        assert_eq!(
            after_first,
            vec!["directoryHandle".to_string(), "directoryHandle_ada".to_string()]
        );
        assert_eq!(
            block_on(store.load_handle("ada")).expect("migrated").name(),
            "legacy"
        );
    }

    #[test]
    fn legacy_migration_never_overwrites_a_user_record() {
        let kv = MemoryKeyValueStore::default();
        kv.seed(
            "directoryHandle",
            StoredValue::Handle(MemoryDirectoryHandle::new("legacy").shared()),
        );
        kv.seed(
            "directoryHandle_ada",
            StoredValue::Handle(MemoryDirectoryHandle::new("mine").shared()),
        );
        let store = store_over(&kv);

        assert!(!block_on(store.migrate_legacy_handle("ada")));
        assert_eq!(block_on(store.load_handle("ada")).expect("handle").name(), "mine");
    }

    #[test]
    fn cleared_legacy_record_is_not_migrated_again() {
        let kv = MemoryKeyValueStore::default();
        kv.seed(
            "directoryHandle",
            StoredValue::Handle(MemoryDirectoryHandle::new("legacy").shared()),
        );
        let store = store_over(&kv);

        assert!(block_on(store.migrate_legacy_handle("ada")));
        block_on(store.clear_handle("ada")).expect("clear user record");
        block_on(store.clear_legacy_handle()).expect("clear legacy record");

        assert!(!block_on(store.migrate_legacy_handle("ada")));
        assert!(block_on(kv.keys()).expect("keys").is_empty());
    }

    #[test]
    fn missing_legacy_record_is_a_no_op() {
        let kv = MemoryKeyValueStore::default();
        let store = store_over(&kv);
        assert!(!block_on(store.migrate_legacy_handle("ada")));
        assert_eq!(kv.put_calls(), 0);
    }
}
