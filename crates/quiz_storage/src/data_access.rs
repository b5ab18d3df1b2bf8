//! Dual-backend resource access: local store always, external directory when granted.
//!
//! The local store is authoritative for the success of a call. External reads and writes are
//! best effort: their failures are logged and never surface to the caller.

use std::rc::Rc;

use persistence_host::{
    next_monotonic_timestamp_ms, DirectoryHandle, KeyValueStore, PermissionState,
    SharedDirectoryHandle, StoredValue,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    bootstrap::BootPhase, config::StorageConfig, context::StorageContext, error::StorageError,
    permission::PermissionNegotiator, resource::ResourceDocument,
};

const TARGET: &str = "quiz_storage::data_access";

#[derive(Clone)]
/// `load`/`save` over the local store with an opportunistic external mirror.
pub struct DualBackendStore {
    ctx: StorageContext,
    kv: Rc<dyn KeyValueStore>,
    config: Rc<StorageConfig>,
    negotiator: PermissionNegotiator,
}

impl DualBackendStore {
    /// Creates a store reading session state from `ctx`.
    pub fn new(ctx: StorageContext, kv: Rc<dyn KeyValueStore>, config: Rc<StorageConfig>) -> Self {
        let negotiator = PermissionNegotiator::new(ctx.clone());
        Self {
            ctx,
            kv,
            config,
            negotiator,
        }
    }

    /// Loads a resource payload, or `default` when neither backend has it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the local store fails.
    pub async fn load(&self, resource: &str, default: Value) -> Result<Value, StorageError> {
        Ok(self.load_data(resource).await?.unwrap_or(default))
    }

    /// Loads a resource payload: external copy first when granted, then the local copy.
    ///
    /// The external copy wins only when it is at least as new as the local one, so a save whose
    /// mirror write failed still reads back its own payload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the local read fails.
    pub async fn load_data(&self, resource: &str) -> Result<Option<Value>, StorageError> {
        let mut external = None;
        if let Some(handle) = self.external_handle().await {
            match self.read_external(&handle, resource).await {
                Ok(Some(document)) => external = Some(document),
                Ok(None) => {
                    tracing::debug!(target: TARGET, resource, "no external copy; reading local");
                }
                Err(err) => {
                    tracing::warn!(target: TARGET, resource, error = %err, "external read failed; reading local");
                }
            }
        }

        let local = self.read_local(resource).await?;
        let local_stamp = local.as_ref().map_or(0, |document| document.last_modified);
        match external {
            Some(document) if document.last_modified >= local_stamp => Ok(Some(document.data)),
            Some(document) => {
                tracing::debug!(
                    target: TARGET,
                    resource,
                    external = document.last_modified,
                    local = local_stamp,
                    "external copy is stale; using local"
                );
                Ok(local.map(|document| document.data))
            }
            None => Ok(local.map(|document| document.data)),
        }
    }

    /// Loads and deserializes a resource payload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] on local failure and
    /// [`StorageError::Serialization`] when the payload does not match `T`.
    pub async fn load_typed<T: DeserializeOwned>(
        &self,
        resource: &str,
    ) -> Result<Option<T>, StorageError> {
        let Some(data) = self.load_data(resource).await? else {
            return Ok(None);
        };
        serde_json::from_value(data)
            .map(Some)
            .map_err(|e| StorageError::Serialization {
                resource: resource.to_string(),
                message: e.to_string(),
            })
    }

    /// Stamps and saves a resource payload locally, then mirrors it externally when granted.
    ///
    /// The stamp never goes backwards relative to the previous local write of the resource.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the local write fails. External failures are
    /// logged only.
    pub async fn save(&self, resource: &str, data: Value) -> Result<(), StorageError> {
        let previous = self
            .read_local(resource)
            .await?
            .map_or(0, |document| document.last_modified);
        let document = ResourceDocument::new(data, next_monotonic_timestamp_ms().max(previous));
        self.write_local(resource, &document).await?;

        if let Some(handle) = self.external_handle().await {
            if let Err(err) = self.write_external(&handle, resource, &document).await {
                tracing::warn!(target: TARGET, resource, error = %err, "external mirror write failed; local copy kept");
            }
        }
        Ok(())
    }

    /// Serializes and saves a typed payload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] or [`StorageError::LocalStore`].
    pub async fn save_typed<T: Serialize>(
        &self,
        resource: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let data = serde_json::to_value(value).map_err(|e| StorageError::Serialization {
            resource: resource.to_string(),
            message: e.to_string(),
        })?;
        self.save(resource, data).await
    }

    /// Names of resources present in the local store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when key enumeration fails.
    pub async fn local_resource_names(&self) -> Result<Vec<String>, StorageError> {
        let keys = self
            .kv
            .keys()
            .await
            .map_err(|message| StorageError::local("keys", message))?;
        Ok(keys
            .iter()
            .filter_map(|key| self.config.resource_from_key(key))
            .map(str::to_string)
            .collect())
    }

    /// Returns the session handle after confirming its grant is still live.
    pub(crate) async fn external_handle(&self) -> Option<SharedDirectoryHandle> {
        self.ctx.granted_handle()?;
        match self.negotiator.resolve_session_permission().await {
            Some(PermissionState::Granted) => self.ctx.current_handle(),
            Some(state) => {
                tracing::warn!(target: TARGET, permission = state.as_str(), "directory access revoked; using local store only");
                self.ctx.set_phase(BootPhase::AwaitingUserGrant);
                None
            }
            None => None,
        }
    }

    pub(crate) async fn read_local(
        &self,
        resource: &str,
    ) -> Result<Option<ResourceDocument>, StorageError> {
        let key = self.config.resource_key(resource);
        let record = self
            .kv
            .get(&key)
            .await
            .map_err(|message| StorageError::local("get", message))?;
        match record {
            None => Ok(None),
            Some(StoredValue::Json(value)) => Ok(Some(ResourceDocument::from_value(value))),
            Some(other) => {
                tracing::warn!(target: TARGET, resource, kind = other.kind(), "unexpected record in resource namespace");
                Ok(None)
            }
        }
    }

    pub(crate) async fn write_local(
        &self,
        resource: &str,
        document: &ResourceDocument,
    ) -> Result<(), StorageError> {
        let key = self.config.resource_key(resource);
        self.kv
            .put(&key, StoredValue::Json(document.to_value()))
            .await
            .map_err(|message| StorageError::local("put", message))
    }

    pub(crate) async fn read_external(
        &self,
        handle: &SharedDirectoryHandle,
        resource: &str,
    ) -> Result<Option<ResourceDocument>, StorageError> {
        let file_name = self.config.resource_file_name(resource);
        let Some(text) = handle
            .read_text_file(&file_name)
            .await
            .map_err(|message| StorageError::external("read", resource, message))?
        else {
            return Ok(None);
        };
        ResourceDocument::from_json_text(&text)
            .map(Some)
            .map_err(|message| StorageError::external("parse", resource, message))
    }

    pub(crate) async fn write_external(
        &self,
        handle: &SharedDirectoryHandle,
        resource: &str,
        document: &ResourceDocument,
    ) -> Result<(), StorageError> {
        let file_name = self.config.resource_file_name(resource);
        let text = document
            .to_json_text()
            .map_err(|message| StorageError::external("render", resource, message))?;
        handle
            .write_text_file(&file_name, &text)
            .await
            .map_err(|message| StorageError::external("write", resource, message))
    }

    pub(crate) async fn external_resource_names(
        &self,
        handle: &SharedDirectoryHandle,
    ) -> Result<Vec<String>, StorageError> {
        let entries = handle
            .list_entries()
            .await
            .map_err(|message| StorageError::external("list", handle.name(), message))?;
        Ok(entries
            .iter()
            .filter_map(|entry| self.config.resource_from_file_name(entry))
            .map(str::to_string)
            .collect())
    }
}
