use js_sys::{Promise, Reflect};
use persistence_host::{HandleCapabilities, PermissionMode, PermissionState};
use serde::Serialize;
use serde_json::Value;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::RawRecord;

/// A structured-cloneable `FileSystemDirectoryHandle`.
#[derive(Debug, Clone)]
pub struct RawDirectoryHandle(JsValue);

#[wasm_bindgen(inline_js = r#"
const DB_VERSION = 1;

function fail(message) {
  throw new Error(message);
}

function errorName(err) {
  return err && typeof err === 'object' ? err.name : undefined;
}

function requestToPromise(req) {
  return new Promise((resolve, reject) => {
    req.onsuccess = () => resolve(req.result);
    req.onerror = () => reject(req.error || new Error('IndexedDB request failed'));
  });
}

function txDone(tx) {
  return new Promise((resolve, reject) => {
    tx.oncomplete = () => resolve();
    tx.onabort = () => reject(tx.error || new Error('IndexedDB transaction aborted'));
    tx.onerror = () => reject(tx.error || new Error('IndexedDB transaction error'));
  });
}

async function openDb(dbName, storeName) {
  if (typeof indexedDB === 'undefined') {
    fail('IndexedDB is unavailable in this browser context');
  }
  return await new Promise((resolve, reject) => {
    const req = indexedDB.open(dbName, DB_VERSION);
    req.onupgradeneeded = () => {
      const db = req.result;
      if (!db.objectStoreNames.contains(storeName)) {
        db.createObjectStore(storeName, { keyPath: 'key' });
      }
    };
    req.onsuccess = () => resolve(req.result);
    req.onerror = () => reject(req.error || new Error('Failed to open IndexedDB'));
  });
}

async function withStore(dbName, storeName, mode, fn) {
  const db = await openDb(dbName, storeName);
  try {
    const tx = db.transaction(storeName, mode);
    const result = await fn(tx.objectStore(storeName));
    await txDone(tx);
    return result;
  } finally {
    db.close();
  }
}

async function kvGet(dbName, storeName, key) {
  return await withStore(dbName, storeName, 'readonly', async (store) => {
    return (await requestToPromise(store.get(key))) ?? null;
  });
}

async function kvPut(dbName, storeName, key, kind, value) {
  return await withStore(dbName, storeName, 'readwrite', async (store) => {
    await requestToPromise(store.put({ key, kind, value, updatedAt: Date.now() }));
    return null;
  });
}

async function kvDelete(dbName, storeName, key) {
  return await withStore(dbName, storeName, 'readwrite', async (store) => {
    await requestToPromise(store.delete(key));
    return null;
  });
}

async function kvKeys(dbName, storeName) {
  const keys = await withStore(dbName, storeName, 'readonly', async (store) => {
    return await requestToPromise(store.getAllKeys());
  });
  return (keys || []).map(String).sort();
}

async function pickDirectory() {
  if (typeof window === 'undefined' || typeof window.showDirectoryPicker !== 'function') {
    fail('File System Access API is not supported in this browser');
  }
  try {
    return await window.showDirectoryPicker({ mode: 'readwrite' });
  } catch (err) {
    if (errorName(err) === 'AbortError') return null;
    throw err;
  }
}

function handleCapabilities(handle) {
  return {
    can_query_permission: typeof handle?.queryPermission === 'function',
    can_request_permission: typeof handle?.requestPermission === 'function',
    can_open_entries: typeof handle?.getFileHandle === 'function',
    can_enumerate_entries: typeof handle?.entries === 'function',
  };
}

async function listEntries(handle) {
  const names = [];
  for await (const [name] of handle.entries()) {
    names.push(name);
  }
  return names.sort();
}

async function readTextFile(handle, name) {
  let fileHandle;
  try {
    fileHandle = await handle.getFileHandle(name, { create: false });
  } catch (err) {
    if (errorName(err) === 'NotFoundError') return null;
    throw err;
  }
  const file = await fileHandle.getFile();
  return await file.text();
}

async function writeTextFile(handle, name, text) {
  const fileHandle = await handle.getFileHandle(name, { create: true });
  const writable = await fileHandle.createWritable();
  try {
    await writable.write(text);
  } catch (err) {
    await writable.abort();
    throw err;
  }
  await writable.close();
  return null;
}

export async function jsKvGet(dbName, storeName, key) { return await kvGet(dbName, storeName, key); }
export async function jsKvPut(dbName, storeName, key, kind, value) { return await kvPut(dbName, storeName, key, kind, value); }
export async function jsKvDelete(dbName, storeName, key) { return await kvDelete(dbName, storeName, key); }
export async function jsKvKeys(dbName, storeName) { return await kvKeys(dbName, storeName); }

export async function jsPickDirectory() { return await pickDirectory(); }
export function jsHandleName(handle) { return String(handle?.name ?? ''); }
export function jsHandleCapabilities(handle) { return handleCapabilities(handle); }
export async function jsQueryPermission(handle, mode) { return String(await handle.queryPermission({ mode })); }
export async function jsRequestPermission(handle, mode) { return String(await handle.requestPermission({ mode })); }
export async function jsListEntries(handle) { return await listEntries(handle); }
export async function jsReadTextFile(handle, name) { return await readTextFile(handle, name); }
export async function jsWriteTextFile(handle, name, text) { return await writeTextFile(handle, name, text); }
"#)]
extern "C" {
    #[wasm_bindgen(js_name = jsKvGet)]
    fn js_kv_get(db: &str, store: &str, key: &str) -> Promise;
    #[wasm_bindgen(js_name = jsKvPut)]
    fn js_kv_put(db: &str, store: &str, key: &str, kind: &str, value: &JsValue) -> Promise;
    #[wasm_bindgen(js_name = jsKvDelete)]
    fn js_kv_delete(db: &str, store: &str, key: &str) -> Promise;
    #[wasm_bindgen(js_name = jsKvKeys)]
    fn js_kv_keys(db: &str, store: &str) -> Promise;

    #[wasm_bindgen(js_name = jsPickDirectory)]
    fn js_pick_directory() -> Promise;
    #[wasm_bindgen(js_name = jsHandleName)]
    fn js_handle_name(handle: &JsValue) -> String;
    #[wasm_bindgen(js_name = jsHandleCapabilities)]
    fn js_handle_capabilities(handle: &JsValue) -> JsValue;
    #[wasm_bindgen(js_name = jsQueryPermission)]
    fn js_query_permission(handle: &JsValue, mode: &str) -> Promise;
    #[wasm_bindgen(js_name = jsRequestPermission)]
    fn js_request_permission(handle: &JsValue, mode: &str) -> Promise;
    #[wasm_bindgen(js_name = jsListEntries)]
    fn js_list_entries(handle: &JsValue) -> Promise;
    #[wasm_bindgen(js_name = jsReadTextFile)]
    fn js_read_text_file(handle: &JsValue, name: &str) -> Promise;
    #[wasm_bindgen(js_name = jsWriteTextFile)]
    fn js_write_text_file(handle: &JsValue, name: &str, text: &str) -> Promise;
}

async fn await_promise(promise: Promise) -> Result<JsValue, String> {
    JsFuture::from(promise).await.map_err(js_error_to_string)
}

fn js_error_to_string(err: JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    let field = |name: &str| {
        Reflect::get(&err, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.as_string())
    };
    match (field("name"), field("message")) {
        (Some(name), Some(message)) => format!("{name}: {message}"),
        (None, Some(message)) => message,
        _ => format!("{err:?}"),
    }
}

fn is_absent(value: &JsValue) -> bool {
    value.is_null() || value.is_undefined()
}

fn record_field(record: &JsValue, field: &str) -> Result<JsValue, String> {
    Reflect::get(record, &JsValue::from_str(field)).map_err(js_error_to_string)
}

pub async fn kv_get(db: &str, store: &str, key: &str) -> Result<Option<RawRecord>, String> {
    let record = await_promise(js_kv_get(db, store, key)).await?;
    if is_absent(&record) {
        return Ok(None);
    }
    let kind = record_field(&record, "kind")?.as_string().unwrap_or_default();
    let value = record_field(&record, "value")?;
    match kind.as_str() {
        "json" => from_value::<Value>(value)
            .map(|value| Some(RawRecord::Json(value)))
            .map_err(|e| e.to_string()),
        "handle" => Ok(Some(RawRecord::Handle(RawDirectoryHandle(value)))),
        other => Err(format!("record `{key}` has unknown kind `{other}`")),
    }
}

pub async fn kv_put_json(db: &str, store: &str, key: &str, value: &Value) -> Result<(), String> {
    let value = value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| e.to_string())?;
    let _ = await_promise(js_kv_put(db, store, key, "json", &value)).await?;
    Ok(())
}

pub async fn kv_put_handle(
    db: &str,
    store: &str,
    key: &str,
    handle: &RawDirectoryHandle,
) -> Result<(), String> {
    let _ = await_promise(js_kv_put(db, store, key, "handle", &handle.0)).await?;
    Ok(())
}

pub async fn kv_delete(db: &str, store: &str, key: &str) -> Result<(), String> {
    let _ = await_promise(js_kv_delete(db, store, key)).await?;
    Ok(())
}

pub async fn kv_keys(db: &str, store: &str) -> Result<Vec<String>, String> {
    let keys = await_promise(js_kv_keys(db, store)).await?;
    from_value(keys).map_err(|e| e.to_string())
}

pub fn directory_picker_supported() -> bool {
    web_sys::window()
        .and_then(|window| Reflect::get(&window, &JsValue::from_str("showDirectoryPicker")).ok())
        .is_some_and(|picker| picker.is_function())
}

pub async fn pick_directory() -> Result<Option<RawDirectoryHandle>, String> {
    let handle = await_promise(js_pick_directory()).await?;
    if is_absent(&handle) {
        Ok(None)
    } else {
        Ok(Some(RawDirectoryHandle(handle)))
    }
}

pub fn handle_name(handle: &RawDirectoryHandle) -> String {
    js_handle_name(&handle.0)
}

pub fn handle_capabilities(handle: &RawDirectoryHandle) -> HandleCapabilities {
    from_value(js_handle_capabilities(&handle.0)).unwrap_or(HandleCapabilities::NONE)
}

pub async fn query_permission(
    handle: &RawDirectoryHandle,
    mode: PermissionMode,
) -> Result<PermissionState, String> {
    let state = await_promise(js_query_permission(&handle.0, mode.as_str())).await?;
    Ok(PermissionState::from_host_token(
        &state.as_string().unwrap_or_default(),
    ))
}

pub async fn request_permission(
    handle: &RawDirectoryHandle,
    mode: PermissionMode,
) -> Result<PermissionState, String> {
    let state = await_promise(js_request_permission(&handle.0, mode.as_str())).await?;
    Ok(PermissionState::from_host_token(
        &state.as_string().unwrap_or_default(),
    ))
}

pub async fn list_entries(handle: &RawDirectoryHandle) -> Result<Vec<String>, String> {
    let names = await_promise(js_list_entries(&handle.0)).await?;
    from_value(names).map_err(|e| e.to_string())
}

pub async fn read_text_file(
    handle: &RawDirectoryHandle,
    file_name: &str,
) -> Result<Option<String>, String> {
    let text = await_promise(js_read_text_file(&handle.0, file_name)).await?;
    if is_absent(&text) {
        return Ok(None);
    }
    text.as_string()
        .map(Some)
        .ok_or_else(|| format!("`{file_name}` did not read as text"))
}

pub async fn write_text_file(
    handle: &RawDirectoryHandle,
    file_name: &str,
    text: &str,
) -> Result<(), String> {
    let _ = await_promise(js_write_text_file(&handle.0, file_name, text)).await?;
    Ok(())
}
