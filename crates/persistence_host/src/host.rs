//! External-storage host capability contract (detection and directory picker).

use std::{
    cell::{Cell, RefCell},
    future::Future,
    pin::Pin,
    rc::Rc,
};

use crate::{handle::SharedDirectoryHandle, permission::UserActivation};

/// Object-safe boxed future used by [`ExternalStorageHost`] async methods.
pub type ExternalStorageHostFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Host service exposing the user-grantable directory primitive.
pub trait ExternalStorageHost {
    /// Returns whether the host can hand out durable directory handles.
    ///
    /// Pure and synchronous; callers short-circuit to local-only mode when this is `false`.
    fn is_external_storage_supported(&self) -> bool;

    /// Shows the directory picker. Resolves to `None` when the user dismisses it.
    fn pick_directory<'a>(
        &'a self,
        activation: &'a UserActivation,
    ) -> ExternalStorageHostFuture<'a, Result<Option<SharedDirectoryHandle>, String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Host without any directory-grant primitive.
pub struct UnsupportedExternalStorageHost;

impl ExternalStorageHost for UnsupportedExternalStorageHost {
    fn is_external_storage_supported(&self) -> bool {
        false
    }

    fn pick_directory<'a>(
        &'a self,
        _activation: &'a UserActivation,
    ) -> ExternalStorageHostFuture<'a, Result<Option<SharedDirectoryHandle>, String>> {
        Box::pin(async { Err("directory picker is not supported on this host".to_string()) })
    }
}

#[derive(Debug, Clone, Default)]
/// Scripted host whose picker returns a preconfigured handle (or a dismissal).
pub struct MemoryExternalStorageHost {
    next_pick: Rc<RefCell<Option<SharedDirectoryHandle>>>,
    pick_calls: Rc<Cell<usize>>,
}

impl MemoryExternalStorageHost {
    /// Creates a supporting host whose picker is dismissed until a handle is queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the handle returned by the next picker call.
    pub fn queue_pick(&self, handle: SharedDirectoryHandle) {
        *self.next_pick.borrow_mut() = Some(handle);
    }

    /// Number of picker invocations observed.
    pub fn pick_calls(&self) -> usize {
        self.pick_calls.get()
    }
}

impl ExternalStorageHost for MemoryExternalStorageHost {
    fn is_external_storage_supported(&self) -> bool {
        true
    }

    fn pick_directory<'a>(
        &'a self,
        _activation: &'a UserActivation,
    ) -> ExternalStorageHostFuture<'a, Result<Option<SharedDirectoryHandle>, String>> {
        Box::pin(async move {
            self.pick_calls.set(self.pick_calls.get() + 1);
            Ok(self.next_pick.borrow_mut().take())
        })
    }
}
