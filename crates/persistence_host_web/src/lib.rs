//! Browser (`wasm32`) implementations of [`persistence_host`] contracts.
//!
//! - [`IndexedDbKeyValueStore`]: durable key-value records, including structured-cloned
//!   directory handles.
//! - [`WebDirectoryHandle`]: a File System Access directory.
//! - [`WebExternalStorageHost`]: capability detection and the directory picker.
//!
//! JS glue lives under `bridge::interop`. On other targets every bridge call degrades to a
//! documented fallback so dependents still build and test natively.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

/// Compile-time host-strategy selection and adapter factories.
pub mod adapters;
mod bridge;
pub mod fs;
pub mod host;
pub mod storage;

pub use adapters::{
    external_storage_host, host_strategy_name, key_value_store, selected_host_strategy,
    ExternalStorageHostAdapter, HostStrategy, KeyValueStoreAdapter,
};
pub use fs::directory_handle::WebDirectoryHandle;
pub use host::WebExternalStorageHost;
pub use storage::indexed_db::{IndexedDbKeyValueStore, DB_NAME, KV_STORE};
