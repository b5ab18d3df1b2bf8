//! Typed host-boundary contracts for the quiz persistence layer.
//!
//! This crate is the API-first boundary between the persistence engine and whatever host it runs
//! on. It exposes the durable key-value contract, the directory-handle capability, permission and
//! user-activation types, and in-memory reference adapters. Concrete browser adapters live in
//! `persistence_host_web`; the engine itself lives in `quiz_storage`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod handle;
pub mod host;
pub mod kv;
pub mod permission;
pub mod time;

pub use handle::{
    DirectoryHandle, DirectoryHandleFuture, HandleCapabilities, MemoryDirectoryHandle,
    SharedDirectoryHandle,
};
pub use host::{
    ExternalStorageHost, ExternalStorageHostFuture, MemoryExternalStorageHost,
    UnsupportedExternalStorageHost,
};
pub use kv::{KeyValueStore, KeyValueStoreFuture, MemoryKeyValueStore, StoredValue};
pub use permission::{PermissionMode, PermissionState, UserActivation};
pub use time::{next_monotonic_timestamp_ms, unix_time_ms_now};
