//! Dual-backend persistence for quiz data: a durable local store that always works and an
//! optional user-granted directory mirrored alongside it.
//!
//! [`QuizStorage`] is the facade used by the rest of the application. Resources are named JSON
//! documents (`categories`, `questions`, ...) saved with a `lastModified` stamp so the two backends
//! can be reconciled with a last-write-wins rule.
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use quiz_storage::{QuizStorage, StorageConfig, StorageServices, StorageStatus};
//! use serde_json::json;
//!
//! let storage = QuizStorage::new(StorageServices::in_memory(), StorageConfig::default())
//!     .expect("default config is valid");
//! block_on(storage.bootstrap(Some("ada")));
//!
//! block_on(storage.save("categories", json!(["math"]))).expect("local save");
//! let categories = block_on(storage.load("categories", json!([]))).expect("local load");
//! assert_eq!(categories, json!(["math"]));
//! assert_eq!(storage.get_storage_status(), StorageStatus::Unavailable);
//! ```

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

mod bootstrap;
mod capability;
mod config;
mod context;
mod data_access;
mod error;
mod handle_store;
mod permission;
mod resource;
mod status;
mod sync;

use std::rc::Rc;

use persistence_host::{
    ExternalStorageHost, KeyValueStore, MemoryExternalStorageHost, MemoryKeyValueStore,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use bootstrap::{BootOutcome, BootPhase, ReadyMode, SessionBootstrapper};
pub use capability::is_external_storage_supported;
pub use config::{
    StorageConfig, DEFAULT_FILE_EXTENSION, DEFAULT_HANDLE_KEY_PREFIX, DEFAULT_LEGACY_HANDLE_KEY,
    DEFAULT_RESOURCE_KEY_PREFIX,
};
pub use context::{StorageContext, SubscriptionId};
pub use data_access::DualBackendStore;
pub use error::{ConfigError, StorageError};
pub use handle_store::{validate_handle, HandleStore};
pub use permission::PermissionNegotiator;
pub use resource::{ResourceDocument, DATA_FIELD, LAST_MODIFIED_FIELD};
pub use status::{derive_status, StatusInputs, StatusPublisher, StorageStatus};
pub use sync::{SyncEngine, SyncReport};

pub use persistence_host::{
    DirectoryHandle, HandleCapabilities, PermissionMode, PermissionState, SharedDirectoryHandle,
    StoredValue, UserActivation,
};

#[derive(Clone)]
/// Host services the engine runs on.
pub struct StorageServices {
    /// Durable local store.
    pub kv: Rc<dyn KeyValueStore>,
    /// Directory picker and capability probe.
    pub host: Rc<dyn ExternalStorageHost>,
}

impl StorageServices {
    /// Services selected at compile time: browser adapters, or stubs with `desktop-host-stub`.
    pub fn for_selected_host() -> Self {
        Self {
            kv: Rc::new(persistence_host_web::key_value_store()),
            host: Rc::new(persistence_host_web::external_storage_host()),
        }
    }

    /// Fresh in-memory services with a supporting host whose picker is always dismissed.
    pub fn in_memory() -> Self {
        Self {
            kv: Rc::new(MemoryKeyValueStore::default()),
            host: Rc::new(MemoryExternalStorageHost::new()),
        }
    }
}

#[derive(Clone)]
/// Application-facing persistence facade.
///
/// `load`/`save` never wait for [`QuizStorage::bootstrap`]; before it reaches external mode they
/// simply behave local-only.
pub struct QuizStorage {
    ctx: StorageContext,
    store: DualBackendStore,
    sync: SyncEngine,
    bootstrapper: SessionBootstrapper,
    status: StatusPublisher,
}

impl QuizStorage {
    /// Wires the engine over `services`.
    ///
    /// # Errors
    ///
    /// Returns the first [`StorageConfig::validate`] failure.
    pub fn new(services: StorageServices, config: StorageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = Rc::new(config);
        let ctx = StorageContext::new();

        let store = DualBackendStore::new(ctx.clone(), Rc::clone(&services.kv), Rc::clone(&config));
        let sync = SyncEngine::new(store.clone(), config.tracked_resources.clone());
        let handles = HandleStore::new(services.kv, Rc::clone(&config));
        let bootstrapper = SessionBootstrapper::new(
            ctx.clone(),
            services.host,
            handles,
            sync.clone(),
            config.sync_on_ready,
        );
        let status = StatusPublisher::new(ctx.clone());

        Ok(Self {
            ctx,
            store,
            sync,
            bootstrapper,
            status,
        })
    }

    /// Runs the startup sequence for the logged-in user. Never prompts.
    pub async fn bootstrap(&self, username: Option<&str>) -> BootOutcome {
        self.bootstrapper.run(username).await
    }

    /// Loads a resource payload, or `default` when it was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the local store fails.
    pub async fn load(&self, resource: &str, default: Value) -> Result<Value, StorageError> {
        self.store.load(resource, default).await
    }

    /// Saves a resource payload locally and mirrors it when a directory is granted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the local write fails.
    pub async fn save(&self, resource: &str, data: Value) -> Result<(), StorageError> {
        self.store.save(resource, data).await
    }

    /// Typed [`QuizStorage::load`]; `None` when the resource was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] or [`StorageError::Serialization`].
    pub async fn load_typed<T: DeserializeOwned>(
        &self,
        resource: &str,
    ) -> Result<Option<T>, StorageError> {
        self.store.load_typed(resource).await
    }

    /// Typed [`QuizStorage::save`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] or [`StorageError::Serialization`].
    pub async fn save_typed<T: Serialize>(
        &self,
        resource: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        self.store.save_typed(resource, value).await
    }

    /// Current indicator status. Display only.
    pub fn get_storage_status(&self) -> StorageStatus {
        self.status.current()
    }

    /// Registers a status listener.
    pub fn subscribe_status(&self, listener: impl Fn(StorageStatus) + 'static) -> SubscriptionId {
        self.status.subscribe(listener)
    }

    /// Removes a status listener.
    pub fn unsubscribe_status(&self, id: SubscriptionId) -> bool {
        self.status.unsubscribe(id)
    }

    /// Lets the user pick a directory. Call from a click/tap handler.
    ///
    /// # Errors
    ///
    /// See [`SessionBootstrapper::request_directory_selection`].
    pub async fn request_directory_selection(
        &self,
        activation: &UserActivation,
    ) -> Result<bool, StorageError> {
        self.bootstrapper
            .request_directory_selection(activation)
            .await
    }

    /// Re-requests access to the stored directory. Call from a click/tap handler.
    pub async fn retry_permission(&self, activation: &UserActivation) -> PermissionState {
        self.bootstrapper.retry_permission(activation).await
    }

    /// Forgets the directory for the current user.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the handle record cannot be removed.
    pub async fn disconnect_directory(&self) -> Result<(), StorageError> {
        self.bootstrapper.disconnect_directory().await
    }

    /// Reconciles local and external copies now.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the local store fails.
    pub async fn sync(&self) -> Result<SyncReport, StorageError> {
        self.sync.reconcile().await
    }

    /// Session state shared by the engine components.
    pub fn context(&self) -> &StorageContext {
        &self.ctx
    }
}
