//! IndexedDB-backed key-value store.
//!
//! Records are `{ key, kind, value, updatedAt }` objects keyed by `key`. `kind` is `"json"` for
//! plain documents and `"handle"` for structured-cloned directory handles.

use std::rc::Rc;

use persistence_host::{KeyValueStore, KeyValueStoreFuture, StoredValue};

use crate::{
    bridge::{self, RawRecord},
    fs::directory_handle::WebDirectoryHandle,
};

/// Default IndexedDB database name.
pub const DB_NAME: &str = "quiz_storage";
/// Default object store inside [`DB_NAME`].
pub const KV_STORE: &str = "kv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Browser key-value store backed by one IndexedDB object store.
pub struct IndexedDbKeyValueStore {
    db_name: &'static str,
    store_name: &'static str,
}

impl Default for IndexedDbKeyValueStore {
    fn default() -> Self {
        Self::new(DB_NAME, KV_STORE)
    }
}

impl IndexedDbKeyValueStore {
    /// Addresses `store_name` inside database `db_name`.
    pub const fn new(db_name: &'static str, store_name: &'static str) -> Self {
        Self {
            db_name,
            store_name,
        }
    }

    /// Database name.
    pub const fn db_name(&self) -> &'static str {
        self.db_name
    }

    /// Object store name.
    pub const fn store_name(&self) -> &'static str {
        self.store_name
    }
}

impl KeyValueStore for IndexedDbKeyValueStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StoredValue>, String>> {
        Box::pin(async move {
            let record = bridge::kv_get(self.db_name, self.store_name, key).await?;
            Ok(record.map(|record| match record {
                RawRecord::Json(value) => StoredValue::Json(value),
                RawRecord::Handle(raw) => {
                    StoredValue::Handle(Rc::new(WebDirectoryHandle::from_raw(raw)))
                }
            }))
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: StoredValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            match value {
                StoredValue::Json(value) => {
                    bridge::kv_put_json(self.db_name, self.store_name, key, &value).await
                }
                StoredValue::Handle(handle) => {
                    let web = handle
                        .as_any()
                        .downcast_ref::<WebDirectoryHandle>()
                        .ok_or_else(|| {
                            "only browser directory handles can be persisted in IndexedDB"
                                .to_string()
                        })?;
                    bridge::kv_put_handle(self.db_name, self.store_name, key, web.raw()).await
                }
            }
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async move { bridge::kv_delete(self.db_name, self.store_name, key).await })
    }

    fn keys<'a>(&'a self) -> KeyValueStoreFuture<'a, Result<Vec<String>, String>> {
        Box::pin(async move { bridge::kv_keys(self.db_name, self.store_name).await })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use futures::executor::block_on;
    use persistence_host::MemoryDirectoryHandle;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn default_store_addresses_quiz_database() {
        let store = IndexedDbKeyValueStore::default();
        assert_eq!(store.db_name(), "quiz_storage");
        assert_eq!(store.store_name(), "kv");
    }

    #[test]
    fn native_build_reports_indexed_db_unavailable() {
        let store = IndexedDbKeyValueStore::default();
        let err = block_on(store.get("resource:questions")).expect_err("no IndexedDB");
        assert!(err.contains("wasm32"));
        let err = block_on(store.put("resource:questions", StoredValue::Json(json!({}))))
            .expect_err("no IndexedDB");
        assert!(err.contains("wasm32"));
        assert!(block_on(store.keys()).is_err());
        assert!(block_on(store.delete("resource:questions")).is_err());
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let store = IndexedDbKeyValueStore::default();
        let handle = MemoryDirectoryHandle::new("quiz").shared();
        let err = block_on(store.put("directoryHandle_ada", StoredValue::Handle(handle)))
            .expect_err("memory handle");
        assert_eq!(
            err,
            "only browser directory handles can be persisted in IndexedDB"
        );
    }
}
