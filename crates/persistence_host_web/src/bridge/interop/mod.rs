//! Target routing for the browser bridge.
//!
//! Calls go to the `wasm` implementation in browsers and to `non_wasm` fallbacks elsewhere, behind
//! one platform-neutral API.

use persistence_host::{HandleCapabilities, PermissionMode, PermissionState};
use serde_json::Value;

#[cfg(not(target_arch = "wasm32"))]
mod non_wasm;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(not(target_arch = "wasm32"))]
use non_wasm as imp;
#[cfg(target_arch = "wasm32")]
use wasm as imp;

pub use imp::RawDirectoryHandle;

/// A decoded key-value record.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub enum RawRecord {
    Json(Value),
    Handle(RawDirectoryHandle),
}

pub async fn kv_get(db: &str, store: &str, key: &str) -> Result<Option<RawRecord>, String> {
    imp::kv_get(db, store, key).await
}

pub async fn kv_put_json(db: &str, store: &str, key: &str, value: &Value) -> Result<(), String> {
    imp::kv_put_json(db, store, key, value).await
}

pub async fn kv_put_handle(
    db: &str,
    store: &str,
    key: &str,
    handle: &RawDirectoryHandle,
) -> Result<(), String> {
    imp::kv_put_handle(db, store, key, handle).await
}

pub async fn kv_delete(db: &str, store: &str, key: &str) -> Result<(), String> {
    imp::kv_delete(db, store, key).await
}

pub async fn kv_keys(db: &str, store: &str) -> Result<Vec<String>, String> {
    imp::kv_keys(db, store).await
}

pub fn directory_picker_supported() -> bool {
    imp::directory_picker_supported()
}

pub async fn pick_directory() -> Result<Option<RawDirectoryHandle>, String> {
    imp::pick_directory().await
}

pub fn handle_name(handle: &RawDirectoryHandle) -> String {
    imp::handle_name(handle)
}

pub fn handle_capabilities(handle: &RawDirectoryHandle) -> HandleCapabilities {
    imp::handle_capabilities(handle)
}

pub async fn query_permission(
    handle: &RawDirectoryHandle,
    mode: PermissionMode,
) -> Result<PermissionState, String> {
    imp::query_permission(handle, mode).await
}

pub async fn request_permission(
    handle: &RawDirectoryHandle,
    mode: PermissionMode,
) -> Result<PermissionState, String> {
    imp::request_permission(handle, mode).await
}

pub async fn list_entries(handle: &RawDirectoryHandle) -> Result<Vec<String>, String> {
    imp::list_entries(handle).await
}

pub async fn read_text_file(
    handle: &RawDirectoryHandle,
    file_name: &str,
) -> Result<Option<String>, String> {
    imp::read_text_file(handle, file_name).await
}

pub async fn write_text_file(
    handle: &RawDirectoryHandle,
    file_name: &str,
    text: &str,
) -> Result<(), String> {
    imp::write_text_file(handle, file_name, text).await
}
