//! Browser bridge for the `persistence_host_web` adapters.
//!
//! Key-value calls address one IndexedDB object store; directory calls wrap a File System Access
//! handle. Both route through `interop`, which compiles to JS glue on `wasm32` and to error
//! fallbacks elsewhere.

mod interop;

use persistence_host::{HandleCapabilities, PermissionMode, PermissionState};
use serde_json::Value;

pub use interop::{RawDirectoryHandle, RawRecord};

pub async fn kv_get(db: &str, store: &str, key: &str) -> Result<Option<RawRecord>, String> {
    interop::kv_get(db, store, key).await
}

pub async fn kv_put_json(db: &str, store: &str, key: &str, value: &Value) -> Result<(), String> {
    interop::kv_put_json(db, store, key, value).await
}

pub async fn kv_put_handle(
    db: &str,
    store: &str,
    key: &str,
    handle: &RawDirectoryHandle,
) -> Result<(), String> {
    interop::kv_put_handle(db, store, key, handle).await
}

pub async fn kv_delete(db: &str, store: &str, key: &str) -> Result<(), String> {
    interop::kv_delete(db, store, key).await
}

pub async fn kv_keys(db: &str, store: &str) -> Result<Vec<String>, String> {
    interop::kv_keys(db, store).await
}

pub fn directory_picker_supported() -> bool {
    interop::directory_picker_supported()
}

pub async fn pick_directory() -> Result<Option<RawDirectoryHandle>, String> {
    interop::pick_directory().await
}

pub fn handle_name(handle: &RawDirectoryHandle) -> String {
    interop::handle_name(handle)
}

pub fn handle_capabilities(handle: &RawDirectoryHandle) -> HandleCapabilities {
    interop::handle_capabilities(handle)
}

pub async fn query_permission(
    handle: &RawDirectoryHandle,
    mode: PermissionMode,
) -> Result<PermissionState, String> {
    interop::query_permission(handle, mode).await
}

pub async fn request_permission(
    handle: &RawDirectoryHandle,
    mode: PermissionMode,
) -> Result<PermissionState, String> {
    interop::request_permission(handle, mode).await
}

pub async fn list_entries(handle: &RawDirectoryHandle) -> Result<Vec<String>, String> {
    interop::list_entries(handle).await
}

pub async fn read_text_file(
    handle: &RawDirectoryHandle,
    file_name: &str,
) -> Result<Option<String>, String> {
    interop::read_text_file(handle, file_name).await
}

pub async fn write_text_file(
    handle: &RawDirectoryHandle,
    file_name: &str,
    text: &str,
) -> Result<(), String> {
    interop::write_text_file(handle, file_name, text).await
}
