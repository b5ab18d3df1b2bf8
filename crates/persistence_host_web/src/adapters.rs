use persistence_host::{
    ExternalStorageHost, ExternalStorageHostFuture, KeyValueStore, KeyValueStoreFuture,
    MemoryKeyValueStore, SharedDirectoryHandle, StoredValue, UnsupportedExternalStorageHost,
    UserActivation,
};

use crate::{IndexedDbKeyValueStore, WebExternalStorageHost};

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Compile-time selected host strategy for `persistence_host_web` adapters.
pub enum HostStrategy {
    /// IndexedDB plus the File System Access API.
    Browser,
    /// Session-scoped memory store and no directory picker, for native shells and headless runs.
    DesktopStub,
}

/// Returns the compile-time selected host strategy for the active build.
pub const fn selected_host_strategy() -> HostStrategy {
    #[cfg(feature = "desktop-host-stub")]
    {
        HostStrategy::DesktopStub
    }

    #[cfg(not(feature = "desktop-host-stub"))]
    {
        HostStrategy::Browser
    }
}

/// Returns the selected host strategy as a stable string token.
pub fn host_strategy_name() -> &'static str {
    match selected_host_strategy() {
        HostStrategy::Browser => "browser",
        HostStrategy::DesktopStub => "desktop-stub",
    }
}

/// Adapter enum that erases the concrete durable store behind [`KeyValueStore`].
#[derive(Debug, Clone)]
pub enum KeyValueStoreAdapter {
    /// IndexedDB-backed store.
    Browser(IndexedDbKeyValueStore),
    /// In-memory store that lives as long as the adapter.
    DesktopStub(MemoryKeyValueStore),
}

impl KeyValueStore for KeyValueStoreAdapter {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StoredValue>, String>> {
        match self {
            Self::Browser(store) => store.get(key),
            Self::DesktopStub(store) => store.get(key),
        }
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: StoredValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(store) => store.put(key, value),
            Self::DesktopStub(store) => store.put(key, value),
        }
    }

    fn delete<'a>(&'a self, key: &'a str) -> KeyValueStoreFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(store) => store.delete(key),
            Self::DesktopStub(store) => store.delete(key),
        }
    }

    fn keys<'a>(&'a self) -> KeyValueStoreFuture<'a, Result<Vec<String>, String>> {
        match self {
            Self::Browser(store) => store.keys(),
            Self::DesktopStub(store) => store.keys(),
        }
    }
}

/// Adapter enum that erases the concrete picker host behind [`ExternalStorageHost`].
#[derive(Debug, Clone, Copy)]
pub enum ExternalStorageHostAdapter {
    /// `showDirectoryPicker`-backed host.
    Browser(WebExternalStorageHost),
    /// Host without a directory primitive.
    DesktopStub(UnsupportedExternalStorageHost),
}

impl ExternalStorageHost for ExternalStorageHostAdapter {
    fn is_external_storage_supported(&self) -> bool {
        match self {
            Self::Browser(host) => host.is_external_storage_supported(),
            Self::DesktopStub(host) => host.is_external_storage_supported(),
        }
    }

    fn pick_directory<'a>(
        &'a self,
        activation: &'a UserActivation,
    ) -> ExternalStorageHostFuture<'a, Result<Option<SharedDirectoryHandle>, String>> {
        match self {
            Self::Browser(host) => host.pick_directory(activation),
            Self::DesktopStub(host) => host.pick_directory(activation),
        }
    }
}

/// Builds the durable key-value adapter for the compile-time selected host strategy.
pub fn key_value_store() -> KeyValueStoreAdapter {
    match selected_host_strategy() {
        HostStrategy::Browser => KeyValueStoreAdapter::Browser(IndexedDbKeyValueStore::default()),
        HostStrategy::DesktopStub => {
            KeyValueStoreAdapter::DesktopStub(MemoryKeyValueStore::default())
        }
    }
}

/// Builds the directory-picker adapter for the compile-time selected host strategy.
pub fn external_storage_host() -> ExternalStorageHostAdapter {
    match selected_host_strategy() {
        HostStrategy::Browser => ExternalStorageHostAdapter::Browser(WebExternalStorageHost),
        HostStrategy::DesktopStub => {
            ExternalStorageHostAdapter::DesktopStub(UnsupportedExternalStorageHost)
        }
    }
}
