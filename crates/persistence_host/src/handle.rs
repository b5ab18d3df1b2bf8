//! Directory-handle capability contract and the in-memory reference handle.

use std::{
    any::Any,
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
};

use serde::{Deserialize, Serialize};

use crate::permission::{PermissionMode, PermissionState, UserActivation};

/// Object-safe boxed future used by [`DirectoryHandle`] async methods.
pub type DirectoryHandleFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Shared reference to a user-granted directory.
///
/// Handles are owned by nobody in particular: the handle store keeps one by reference and the
/// session context caches the same reference for the lifetime of the page.
pub type SharedDirectoryHandle = Rc<dyn DirectoryHandle>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Minimal capability surface a stored handle must expose to be usable.
pub struct HandleCapabilities {
    /// The handle can report its current permission state.
    pub can_query_permission: bool,
    /// The handle can prompt for a permission upgrade.
    pub can_request_permission: bool,
    /// The handle can open or create named files.
    pub can_open_entries: bool,
    /// The handle can enumerate its entries.
    pub can_enumerate_entries: bool,
}

impl HandleCapabilities {
    /// Capability set of a fully functional handle.
    pub const FULL: Self = Self {
        can_query_permission: true,
        can_request_permission: true,
        can_open_entries: true,
        can_enumerate_entries: true,
    };

    /// Capability set of a deserialized or otherwise inert object.
    pub const NONE: Self = Self {
        can_query_permission: false,
        can_request_permission: false,
        can_open_entries: false,
        can_enumerate_entries: false,
    };

    /// Returns `true` when every required capability is present.
    pub fn is_usable(self) -> bool {
        self.missing().is_empty()
    }

    /// Lists the names of missing capabilities for diagnostics.
    pub fn missing(self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.can_query_permission {
            missing.push("queryPermission");
        }
        if !self.can_request_permission {
            missing.push("requestPermission");
        }
        if !self.can_open_entries {
            missing.push("getFileHandle");
        }
        if !self.can_enumerate_entries {
            missing.push("entries");
        }
        missing
    }
}

/// Opaque, revocable reference to a host filesystem directory.
pub trait DirectoryHandle: fmt::Debug {
    /// Returns the directory's display name.
    fn name(&self) -> String;

    /// Probes which capabilities the underlying object exposes.
    fn capabilities(&self) -> HandleCapabilities;

    /// Queries the current permission state without prompting.
    fn query_permission<'a>(
        &'a self,
        mode: PermissionMode,
    ) -> DirectoryHandleFuture<'a, Result<PermissionState, String>>;

    /// Requests a permission upgrade, which may show a host prompt.
    fn request_permission<'a>(
        &'a self,
        mode: PermissionMode,
        activation: &'a UserActivation,
    ) -> DirectoryHandleFuture<'a, Result<PermissionState, String>>;

    /// Lists the names of the directory's direct entries.
    fn list_entries<'a>(&'a self) -> DirectoryHandleFuture<'a, Result<Vec<String>, String>>;

    /// Reads a named file as UTF-8 text, returning `None` when the file does not exist.
    fn read_text_file<'a>(
        &'a self,
        file_name: &'a str,
    ) -> DirectoryHandleFuture<'a, Result<Option<String>, String>>;

    /// Creates or overwrites a named file with UTF-8 text.
    ///
    /// A failed write leaves the previous content in place and releases the file.
    fn write_text_file<'a>(
        &'a self,
        file_name: &'a str,
        text: &'a str,
    ) -> DirectoryHandleFuture<'a, Result<(), String>>;

    /// Exposes the concrete handle so host adapters can recover their native object.
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug)]
struct MemoryDirectoryState {
    name: String,
    capabilities: Cell<HandleCapabilities>,
    permission: Cell<PermissionState>,
    request_answer: Cell<PermissionState>,
    files: RefCell<BTreeMap<String, String>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    query_calls: Cell<usize>,
    request_calls: Cell<usize>,
    read_calls: Cell<usize>,
    write_calls: Cell<usize>,
}

#[derive(Debug, Clone)]
/// In-memory directory handle with scripted permission answers and call counters.
///
/// Clones share state, so a test can keep one clone for inspection while another is stored.
pub struct MemoryDirectoryHandle {
    inner: Rc<MemoryDirectoryState>,
}

impl MemoryDirectoryHandle {
    /// Creates a granted, empty directory named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(MemoryDirectoryState {
                name: name.into(),
                capabilities: Cell::new(HandleCapabilities::FULL),
                permission: Cell::new(PermissionState::Granted),
                request_answer: Cell::new(PermissionState::Granted),
                files: RefCell::new(BTreeMap::new()),
                fail_reads: Cell::new(false),
                fail_writes: Cell::new(false),
                query_calls: Cell::new(0),
                request_calls: Cell::new(0),
                read_calls: Cell::new(0),
                write_calls: Cell::new(0),
            }),
        }
    }

    /// Returns this handle with an initial permission state.
    pub fn with_permission(self, permission: PermissionState) -> Self {
        self.set_permission(permission);
        self
    }

    /// Returns this handle as a shared trait object.
    pub fn shared(&self) -> SharedDirectoryHandle {
        Rc::new(self.clone())
    }

    /// Sets the state answered by [`DirectoryHandle::query_permission`].
    pub fn set_permission(&self, permission: PermissionState) {
        self.inner.permission.set(permission);
    }

    /// Sets the answer the simulated prompt gives to [`DirectoryHandle::request_permission`].
    pub fn set_request_answer(&self, answer: PermissionState) {
        self.inner.request_answer.set(answer);
    }

    /// Overrides the capability probe result.
    pub fn set_capabilities(&self, capabilities: HandleCapabilities) {
        self.inner.capabilities.set(capabilities);
    }

    /// Makes every subsequent read fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.set(fail);
    }

    /// Makes every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.set(fail);
    }

    /// Places a file in the directory without counting it as a write.
    pub fn insert_file(&self, file_name: impl Into<String>, text: impl Into<String>) {
        self.inner
            .files
            .borrow_mut()
            .insert(file_name.into(), text.into());
    }

    /// Returns the content of a file, if present.
    pub fn file(&self, file_name: &str) -> Option<String> {
        self.inner.files.borrow().get(file_name).cloned()
    }

    /// Number of permission queries observed.
    pub fn query_permission_calls(&self) -> usize {
        self.inner.query_calls.get()
    }

    /// Number of permission requests observed.
    pub fn request_permission_calls(&self) -> usize {
        self.inner.request_calls.get()
    }

    /// Number of file reads attempted, failed ones included.
    pub fn read_calls(&self) -> usize {
        self.inner.read_calls.get()
    }

    /// Number of successful file writes observed.
    pub fn write_calls(&self) -> usize {
        self.inner.write_calls.get()
    }

    fn ensure_granted(&self) -> Result<(), String> {
        if self.inner.permission.get().is_granted() {
            Ok(())
        } else {
            Err(format!(
                "permission {} for directory `{}`",
                self.inner.permission.get().as_str(),
                self.inner.name
            ))
        }
    }
}

impl DirectoryHandle for MemoryDirectoryHandle {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn capabilities(&self) -> HandleCapabilities {
        self.inner.capabilities.get()
    }

    fn query_permission<'a>(
        &'a self,
        _mode: PermissionMode,
    ) -> DirectoryHandleFuture<'a, Result<PermissionState, String>> {
        Box::pin(async move {
            if !self.inner.capabilities.get().can_query_permission {
                return Err("queryPermission is not available on this handle".to_string());
            }
            self.inner.query_calls.set(self.inner.query_calls.get() + 1);
            Ok(self.inner.permission.get())
        })
    }

    fn request_permission<'a>(
        &'a self,
        _mode: PermissionMode,
        _activation: &'a UserActivation,
    ) -> DirectoryHandleFuture<'a, Result<PermissionState, String>> {
        Box::pin(async move {
            if !self.inner.capabilities.get().can_request_permission {
                return Err("requestPermission is not available on this handle".to_string());
            }
            self.inner
                .request_calls
                .set(self.inner.request_calls.get() + 1);
            if self.inner.permission.get().is_granted() {
                return Ok(PermissionState::Granted);
            }
            let answer = self.inner.request_answer.get();
            self.inner.permission.set(answer);
            Ok(answer)
        })
    }

    fn list_entries<'a>(&'a self) -> DirectoryHandleFuture<'a, Result<Vec<String>, String>> {
        Box::pin(async move {
            if !self.inner.capabilities.get().can_enumerate_entries {
                return Err("entries is not available on this handle".to_string());
            }
            self.ensure_granted()?;
            Ok(self.inner.files.borrow().keys().cloned().collect())
        })
    }

    fn read_text_file<'a>(
        &'a self,
        file_name: &'a str,
    ) -> DirectoryHandleFuture<'a, Result<Option<String>, String>> {
        Box::pin(async move {
            self.inner.read_calls.set(self.inner.read_calls.get() + 1);
            self.ensure_granted()?;
            if self.inner.fail_reads.get() {
                return Err(format!("read `{file_name}` failed: device unavailable"));
            }
            Ok(self.inner.files.borrow().get(file_name).cloned())
        })
    }

    fn write_text_file<'a>(
        &'a self,
        file_name: &'a str,
        text: &'a str,
    ) -> DirectoryHandleFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.ensure_granted()?;
            if self.inner.fail_writes.get() {
                return Err(format!("write `{file_name}` failed: device unavailable"));
            }
            self.inner
                .files
                .borrow_mut()
                .insert(file_name.to_string(), text.to_string());
            self.inner.write_calls.set(self.inner.write_calls.get() + 1);
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn capabilities_report_missing_surface() {
        assert!(HandleCapabilities::FULL.is_usable());
        assert!(!HandleCapabilities::NONE.is_usable());
        let partial = HandleCapabilities {
            can_request_permission: false,
            ..HandleCapabilities::FULL
        };
        assert_eq!(partial.missing(), vec!["requestPermission"]);
    }

    #[test]
    fn memory_handle_round_trips_files_when_granted() {
        let dir = MemoryDirectoryHandle::new("quiz-data");
        let handle: SharedDirectoryHandle = dir.shared();

        block_on(handle.write_text_file("categories.json", "{}")).expect("write");
        assert_eq!(
            block_on(handle.read_text_file("categories.json")).expect("read"),
            Some("{}".to_string())
        );
        assert_eq!(
            block_on(handle.read_text_file("missing.json")).expect("read"),
            None
        );
        assert_eq!(
            block_on(handle.list_entries()).expect("list"),
            vec!["categories.json".to_string()]
        );
        assert_eq!(dir.write_calls(), 1);
    }

    #[test]
    fn memory_handle_rejects_io_without_grant() {
        let dir = MemoryDirectoryHandle::new("quiz-data").with_permission(PermissionState::Prompt);
        let err = block_on(dir.write_text_file("a.json", "1")).expect_err("write should fail");
        assert!(err.contains("prompt"));
        assert_eq!(dir.write_calls(), 0);
    }

    #[test]
    fn failed_write_keeps_previous_content() {
        let dir = MemoryDirectoryHandle::new("quiz-data");
        block_on(dir.write_text_file("a.json", "old")).expect("first write");

        dir.set_fail_writes(true);
        block_on(dir.write_text_file("a.json", "new")).expect_err("write should fail");
        assert_eq!(dir.file("a.json").as_deref(), Some("old"));

        dir.set_fail_writes(false);
        block_on(dir.write_text_file("a.json", "new")).expect("file is writable again");
        assert_eq!(dir.file("a.json").as_deref(), Some("new"));
        assert_eq!(dir.write_calls(), 2);
    }

    #[test]
    fn memory_handle_request_uses_scripted_answer_and_counts_calls() {
        let dir = MemoryDirectoryHandle::new("quiz-data").with_permission(PermissionState::Prompt);
        dir.set_request_answer(PermissionState::Denied);
        let gesture = UserActivation::from_user_gesture();

        let answer = block_on(dir.request_permission(PermissionMode::Readwrite, &gesture))
            .expect("request");
        assert_eq!(answer, PermissionState::Denied);
        assert_eq!(
            block_on(dir.query_permission(PermissionMode::Readwrite)).expect("query"),
            PermissionState::Denied
        );
        assert_eq!(dir.request_permission_calls(), 1);
        assert_eq!(dir.query_permission_calls(), 1);
    }
}
