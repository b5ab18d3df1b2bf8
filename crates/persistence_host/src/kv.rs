//! Durable key-value store contract and reference adapters.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    future::Future,
    pin::Pin,
    rc::Rc,
};

use serde_json::Value;

use crate::handle::SharedDirectoryHandle;

/// Object-safe boxed future used by [`KeyValueStore`] async methods.
pub type KeyValueStoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Debug, Clone)]
/// A value held by the durable store.
///
/// Browser stores structured-clone directory handles next to plain JSON records, so both kinds
/// share one keyspace and callers keep them apart with key prefixes.
pub enum StoredValue {
    /// Plain JSON document.
    Json(Value),
    /// Opaque directory handle.
    Handle(SharedDirectoryHandle),
}

impl StoredValue {
    /// Returns the JSON document when this value is one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Handle(_) => None,
        }
    }

    /// Returns the directory handle when this value is one.
    pub fn as_handle(&self) -> Option<&SharedDirectoryHandle> {
        match self {
            Self::Handle(handle) => Some(handle),
            Self::Json(_) => None,
        }
    }

    /// Short label for diagnostics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Handle(_) => "handle",
        }
    }
}

/// Durable key-value store (IndexedDB in browsers).
pub trait KeyValueStore {
    /// Loads the value stored under `key`.
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StoredValue>, String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put<'a>(
        &'a self,
        key: &'a str,
        value: StoredValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>>;

    /// Removes `key`. Removing a missing key succeeds.
    fn delete<'a>(&'a self, key: &'a str) -> KeyValueStoreFuture<'a, Result<(), String>>;

    /// Lists every key currently present, sorted.
    fn keys<'a>(&'a self) -> KeyValueStoreFuture<'a, Result<Vec<String>, String>>;
}

#[derive(Debug, Clone, Default)]
/// In-memory key-value store. Clones share contents and the write counter.
pub struct MemoryKeyValueStore {
    inner: Rc<RefCell<BTreeMap<String, StoredValue>>>,
    puts: Rc<Cell<usize>>,
}

impl MemoryKeyValueStore {
    /// Returns the number of successful `put` calls.
    pub fn put_calls(&self) -> usize {
        self.puts.get()
    }

    /// Returns a clone of the value under `key` without going through the async API.
    pub fn peek(&self, key: &str) -> Option<StoredValue> {
        self.inner.borrow().get(key).cloned()
    }

    /// Seeds a value without counting it as a write.
    pub fn seed(&self, key: impl Into<String>, value: StoredValue) {
        self.inner.borrow_mut().insert(key.into(), value);
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StoredValue>, String>> {
        Box::pin(async move { Ok(self.inner.borrow().get(key).cloned()) })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: StoredValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().insert(key.to_string(), value);
            self.puts.set(self.puts.get() + 1);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().remove(key);
            Ok(())
        })
    }

    fn keys<'a>(&'a self) -> KeyValueStoreFuture<'a, Result<Vec<String>, String>> {
        Box::pin(async move { Ok(self.inner.borrow().keys().cloned().collect()) })
    }
}
