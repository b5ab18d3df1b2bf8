//! Session-scoped storage state shared by every engine component.
//!
//! One [`StorageContext`] exists per page session. The bootstrapper owns the transitions, the
//! permission negotiator records permission answers, and data access plus the status publisher
//! only read it. The directory handle is swapped as a whole reference, so readers never observe a
//! half-updated handle.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use persistence_host::{PermissionState, SharedDirectoryHandle};

use crate::{
    bootstrap::BootPhase,
    status::{derive_status, StatusInputs, StorageStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identifier returned by [`StorageContext::subscribe`].
pub struct SubscriptionId(u64);

type StatusListener = Rc<dyn Fn(StorageStatus)>;

struct ContextState {
    external_supported: Cell<bool>,
    username: RefCell<Option<String>>,
    handle: RefCell<Option<SharedDirectoryHandle>>,
    handle_stored: Cell<bool>,
    permission: Cell<Option<PermissionState>>,
    phase: Cell<BootPhase>,
    listeners: RefCell<Vec<(SubscriptionId, StatusListener)>>,
    next_subscription: Cell<u64>,
}

#[derive(Clone)]
/// Injectable session state. Clones share the same state.
pub struct StorageContext {
    inner: Rc<ContextState>,
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("external_supported", &self.inner.external_supported.get())
            .field("username", &self.inner.username.borrow())
            .field("has_handle", &self.inner.handle.borrow().is_some())
            .field("handle_stored", &self.inner.handle_stored.get())
            .field("permission", &self.inner.permission.get())
            .field("phase", &self.inner.phase.get())
            .finish()
    }
}

impl Default for StorageContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageContext {
    /// Creates an empty context in [`BootPhase::Init`].
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ContextState {
                external_supported: Cell::new(false),
                username: RefCell::new(None),
                handle: RefCell::new(None),
                handle_stored: Cell::new(false),
                permission: Cell::new(None),
                phase: Cell::new(BootPhase::Init),
                listeners: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
            }),
        }
    }

    /// Current bootstrap phase.
    pub fn phase(&self) -> BootPhase {
        self.inner.phase.get()
    }

    /// User the session was bootstrapped for.
    pub fn username(&self) -> Option<String> {
        self.inner.username.borrow().clone()
    }

    /// Whether the host supports external directories, as detected at bootstrap.
    pub fn external_supported(&self) -> bool {
        self.inner.external_supported.get()
    }

    /// Session directory handle, granted or not.
    pub fn current_handle(&self) -> Option<SharedDirectoryHandle> {
        self.inner.handle.borrow().clone()
    }

    /// Session directory handle, only while its last permission check was granted.
    pub fn granted_handle(&self) -> Option<SharedDirectoryHandle> {
        if self.inner.permission.get() == Some(PermissionState::Granted) {
            self.current_handle()
        } else {
            None
        }
    }

    /// Last permission answer recorded this session.
    pub fn permission(&self) -> Option<PermissionState> {
        self.inner.permission.get()
    }

    /// Whether a handle record exists for the session user.
    pub fn handle_stored(&self) -> bool {
        self.inner.handle_stored.get()
    }

    /// Inputs of the status read model.
    pub fn status_inputs(&self) -> StatusInputs {
        StatusInputs {
            external_supported: self.external_supported(),
            handle_stored: self.handle_stored(),
            session_handle: self.inner.handle.borrow().is_some(),
            permission: self.permission(),
        }
    }

    /// Status derived from the current state.
    pub fn status(&self) -> StorageStatus {
        derive_status(self.status_inputs())
    }

    /// Registers a listener called with the fresh status after every change event.
    pub fn subscribe(&self, listener: impl Fn(StorageStatus) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` when it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn set_phase(&self, phase: BootPhase) {
        let previous = self.inner.phase.replace(phase);
        if previous != phase {
            tracing::debug!(
                target: "quiz_storage::context",
                from = ?previous,
                to = ?phase,
                "boot phase changed"
            );
        }
    }

    pub(crate) fn begin_session(&self, username: &str, external_supported: bool) {
        *self.inner.username.borrow_mut() = Some(username.to_string());
        self.inner.external_supported.set(external_supported);
    }

    /// Installs or drops the session handle. Fires a change event.
    pub(crate) fn replace_handle(&self, handle: Option<SharedDirectoryHandle>, stored: bool) {
        *self.inner.handle.borrow_mut() = handle;
        self.inner.handle_stored.set(stored);
        self.inner.permission.set(None);
        self.notify();
    }

    /// Records a permission answer. Fires a change event when the answer differs.
    pub(crate) fn record_permission(&self, permission: PermissionState) {
        let previous = self.inner.permission.replace(Some(permission));
        if previous != Some(permission) {
            self.notify();
        }
    }

    fn notify(&self) {
        let status = self.status();
        let listeners: Vec<StatusListener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use persistence_host::{DirectoryHandle, MemoryDirectoryHandle};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn granted_handle_requires_recorded_grant() {
        let ctx = StorageContext::new();
        ctx.begin_session("ada", true);
        ctx.replace_handle(Some(MemoryDirectoryHandle::new("quiz").shared()), true);

        assert!(ctx.current_handle().is_some());
        assert!(ctx.granted_handle().is_none());
        ctx.record_permission(PermissionState::Granted);
        assert!(ctx.granted_handle().is_some());
        ctx.record_permission(PermissionState::Denied);
        assert!(ctx.granted_handle().is_none());
    }

    #[test]
    fn replacing_the_handle_resets_permission() {
        let ctx = StorageContext::new();
        ctx.begin_session("ada", true);
        ctx.replace_handle(Some(MemoryDirectoryHandle::new("a").shared()), true);
        ctx.record_permission(PermissionState::Granted);
        ctx.replace_handle(Some(MemoryDirectoryHandle::new("b").shared()), true);

        assert_eq!(ctx.permission(), None);
        assert_eq!(ctx.current_handle().expect("handle").name(), "b");
    }

    #[test]
    fn listeners_see_each_change_until_unsubscribed() {
        let ctx = StorageContext::new();
        ctx.begin_session("ada", true);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = ctx.subscribe(move |status| sink.borrow_mut().push(status));

        ctx.replace_handle(Some(MemoryDirectoryHandle::new("quiz").shared()), true);
        ctx.record_permission(PermissionState::Granted);
        assert!(ctx.unsubscribe(id));
        assert!(!ctx.unsubscribe(id));
        ctx.replace_handle(None, false);

        assert_eq!(
            *seen.borrow(),
            vec![StorageStatus::StoredNotLoaded, StorageStatus::Available]
        );
    }

    #[test]
    fn repeated_permission_answers_notify_once() {
        let ctx = StorageContext::new();
        ctx.begin_session("ada", true);
        ctx.replace_handle(Some(MemoryDirectoryHandle::new("quiz").shared()), true);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctx.subscribe(move |status| sink.borrow_mut().push(status));

        ctx.record_permission(PermissionState::Granted);
        ctx.record_permission(PermissionState::Granted);
        ctx.record_permission(PermissionState::Granted);
        ctx.record_permission(PermissionState::Denied);
        ctx.record_permission(PermissionState::Denied);

        assert_eq!(
            *seen.borrow(),
            vec![StorageStatus::Available, StorageStatus::StoredNotLoaded]
        );
    }
}
