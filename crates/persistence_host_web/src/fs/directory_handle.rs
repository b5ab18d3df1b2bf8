//! Browser `FileSystemDirectoryHandle` behind the [`DirectoryHandle`] contract.

use std::any::Any;

use persistence_host::{
    DirectoryHandle, DirectoryHandleFuture, HandleCapabilities, PermissionMode, PermissionState,
    UserActivation,
};

use crate::bridge::{self, RawDirectoryHandle};

#[derive(Debug, Clone)]
/// Directory granted through `showDirectoryPicker` or restored from IndexedDB.
pub struct WebDirectoryHandle {
    raw: RawDirectoryHandle,
    name: String,
}

impl WebDirectoryHandle {
    pub(crate) fn from_raw(raw: RawDirectoryHandle) -> Self {
        let name = bridge::handle_name(&raw);
        Self { raw, name }
    }

    pub(crate) fn raw(&self) -> &RawDirectoryHandle {
        &self.raw
    }
}

impl DirectoryHandle for WebDirectoryHandle {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn capabilities(&self) -> HandleCapabilities {
        bridge::handle_capabilities(&self.raw)
    }

    fn query_permission<'a>(
        &'a self,
        mode: PermissionMode,
    ) -> DirectoryHandleFuture<'a, Result<PermissionState, String>> {
        Box::pin(async move { bridge::query_permission(&self.raw, mode).await })
    }

    fn request_permission<'a>(
        &'a self,
        mode: PermissionMode,
        _activation: &'a UserActivation,
    ) -> DirectoryHandleFuture<'a, Result<PermissionState, String>> {
        Box::pin(async move { bridge::request_permission(&self.raw, mode).await })
    }

    fn list_entries<'a>(&'a self) -> DirectoryHandleFuture<'a, Result<Vec<String>, String>> {
        Box::pin(async move { bridge::list_entries(&self.raw).await })
    }

    fn read_text_file<'a>(
        &'a self,
        file_name: &'a str,
    ) -> DirectoryHandleFuture<'a, Result<Option<String>, String>> {
        Box::pin(async move { bridge::read_text_file(&self.raw, file_name).await })
    }

    fn write_text_file<'a>(
        &'a self,
        file_name: &'a str,
        text: &'a str,
    ) -> DirectoryHandleFuture<'a, Result<(), String>> {
        Box::pin(async move { bridge::write_text_file(&self.raw, file_name, text).await })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
