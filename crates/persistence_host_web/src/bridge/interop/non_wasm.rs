use persistence_host::{HandleCapabilities, PermissionMode, PermissionState};
use serde_json::Value;

use super::RawRecord;

/// Native directory reference. No value exists outside `wasm32`.
#[derive(Debug, Clone)]
pub enum RawDirectoryHandle {}

fn indexed_db_unavailable() -> String {
    "IndexedDB is only available when compiled for wasm32".to_string()
}

fn file_system_access_unavailable() -> String {
    "File System Access API is only available when compiled for wasm32".to_string()
}

pub async fn kv_get(_db: &str, _store: &str, _key: &str) -> Result<Option<RawRecord>, String> {
    Err(indexed_db_unavailable())
}

pub async fn kv_put_json(
    _db: &str,
    _store: &str,
    _key: &str,
    _value: &Value,
) -> Result<(), String> {
    Err(indexed_db_unavailable())
}

pub async fn kv_put_handle(
    _db: &str,
    _store: &str,
    _key: &str,
    handle: &RawDirectoryHandle,
) -> Result<(), String> {
    match *handle {}
}

pub async fn kv_delete(_db: &str, _store: &str, _key: &str) -> Result<(), String> {
    Err(indexed_db_unavailable())
}

pub async fn kv_keys(_db: &str, _store: &str) -> Result<Vec<String>, String> {
    Err(indexed_db_unavailable())
}

pub fn directory_picker_supported() -> bool {
    false
}

pub async fn pick_directory() -> Result<Option<RawDirectoryHandle>, String> {
    Err(file_system_access_unavailable())
}

pub fn handle_name(handle: &RawDirectoryHandle) -> String {
    match *handle {}
}

pub fn handle_capabilities(handle: &RawDirectoryHandle) -> HandleCapabilities {
    match *handle {}
}

pub async fn query_permission(
    handle: &RawDirectoryHandle,
    _mode: PermissionMode,
) -> Result<PermissionState, String> {
    match *handle {}
}

pub async fn request_permission(
    handle: &RawDirectoryHandle,
    _mode: PermissionMode,
) -> Result<PermissionState, String> {
    match *handle {}
}

pub async fn list_entries(handle: &RawDirectoryHandle) -> Result<Vec<String>, String> {
    match *handle {}
}

pub async fn read_text_file(
    handle: &RawDirectoryHandle,
    _file_name: &str,
) -> Result<Option<String>, String> {
    match *handle {}
}

pub async fn write_text_file(
    handle: &RawDirectoryHandle,
    _file_name: &str,
    _text: &str,
) -> Result<(), String> {
    match *handle {}
}
