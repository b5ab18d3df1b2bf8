//! Browser directory picker behind [`ExternalStorageHost`].

use std::rc::Rc;

use persistence_host::{
    ExternalStorageHost, ExternalStorageHostFuture, SharedDirectoryHandle, UserActivation,
};

use crate::{bridge, fs::directory_handle::WebDirectoryHandle};

#[derive(Debug, Clone, Copy, Default)]
/// External-storage host backed by `window.showDirectoryPicker`.
pub struct WebExternalStorageHost;

impl ExternalStorageHost for WebExternalStorageHost {
    fn is_external_storage_supported(&self) -> bool {
        bridge::directory_picker_supported()
    }

    fn pick_directory<'a>(
        &'a self,
        _activation: &'a UserActivation,
    ) -> ExternalStorageHostFuture<'a, Result<Option<SharedDirectoryHandle>, String>> {
        Box::pin(async move {
            let picked = bridge::pick_directory().await?;
            Ok(picked.map(|raw| {
                let handle: SharedDirectoryHandle = Rc::new(WebDirectoryHandle::from_raw(raw));
                handle
            }))
        })
    }
}
