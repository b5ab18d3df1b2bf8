//! Session bootstrap state machine and the user-gesture handlers that move it forward.
//!
//! ```text
//! Init -> DetectingCapability -> RestoringHandle -> CheckingPermission -> Ready(External)
//!                |                      |                    \-> AwaitingUserGrant
//!                \-> Ready(LocalOnly)   \-> Ready(LocalOnly)
//! ```
//!
//! The automatic path only ever *queries* permission. Prompting happens in
//! [`SessionBootstrapper::request_directory_selection`] and
//! [`SessionBootstrapper::retry_permission`], which require a [`UserActivation`].

use std::rc::Rc;

use persistence_host::{ExternalStorageHost, PermissionState, UserActivation};
use serde::Serialize;

use crate::{
    capability::is_external_storage_supported,
    context::StorageContext,
    error::StorageError,
    handle_store::{validate_handle, HandleStore},
    permission::PermissionNegotiator,
    sync::SyncEngine,
};

const TARGET: &str = "quiz_storage::bootstrap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
/// Backend set in use once bootstrap settles.
pub enum ReadyMode {
    /// Local store plus the granted directory.
    External,
    /// Local store only.
    LocalOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "phase", content = "mode")]
/// Bootstrap progress for the current session.
pub enum BootPhase {
    /// No bootstrap has run for a known user.
    Init,
    /// Probing the host for the directory primitive.
    DetectingCapability,
    /// Migrating and loading the user's handle record.
    RestoringHandle,
    /// Querying permission on the restored handle.
    CheckingPermission,
    /// Settled.
    Ready(ReadyMode),
    /// A handle is stored but needs a user gesture to be granted again.
    AwaitingUserGrant,
}

impl BootPhase {
    /// Returns `true` once the session mirrors to the external directory.
    pub const fn is_external(self) -> bool {
        matches!(self, Self::Ready(ReadyMode::External))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of [`SessionBootstrapper::run`].
pub struct BootOutcome {
    /// Phase the session settled in.
    pub phase: BootPhase,
    /// Supported host and no stored record: the UI may offer (never force) directory selection.
    pub offer_directory_selection: bool,
    /// A legacy unscoped record was copied to the user during this run.
    pub migrated_legacy_handle: bool,
}

impl BootOutcome {
    fn settled(phase: BootPhase) -> Self {
        Self {
            phase,
            offer_directory_selection: false,
            migrated_legacy_handle: false,
        }
    }
}

#[derive(Clone)]
/// Drives [`BootPhase`] transitions on a [`StorageContext`].
pub struct SessionBootstrapper {
    ctx: StorageContext,
    host: Rc<dyn ExternalStorageHost>,
    handles: HandleStore,
    negotiator: PermissionNegotiator,
    sync: SyncEngine,
    sync_on_ready: bool,
}

impl SessionBootstrapper {
    /// Creates a bootstrapper. `sync_on_ready` reconciles whenever the session reaches
    /// [`ReadyMode::External`].
    pub fn new(
        ctx: StorageContext,
        host: Rc<dyn ExternalStorageHost>,
        handles: HandleStore,
        sync: SyncEngine,
        sync_on_ready: bool,
    ) -> Self {
        let negotiator = PermissionNegotiator::new(ctx.clone());
        Self {
            ctx,
            host,
            handles,
            negotiator,
            sync,
            sync_on_ready,
        }
    }

    /// Runs the automatic startup sequence for `username`.
    ///
    /// Without a logged-in user nothing happens and the phase stays where it was. Never prompts
    /// and never fails: every problem settles in local-only mode.
    pub async fn run(&self, username: Option<&str>) -> BootOutcome {
        let Some(username) = username.map(str::trim).filter(|name| !name.is_empty()) else {
            tracing::debug!(target: TARGET, "no logged-in user; bootstrap skipped");
            return BootOutcome::settled(self.ctx.phase());
        };

        self.ctx.set_phase(BootPhase::DetectingCapability);
        let supported = is_external_storage_supported(self.host.as_ref());
        self.ctx.begin_session(username, supported);
        self.ctx.replace_handle(None, false);
        if !supported {
            tracing::info!(target: TARGET, user = username, "external storage unsupported; local-only mode");
            return BootOutcome::settled(self.settle_local_only());
        }

        self.ctx.set_phase(BootPhase::RestoringHandle);
        let migrated_legacy_handle = self.handles.migrate_legacy_handle(username).await;
        let Some(handle) = self.handles.load_handle(username).await else {
            tracing::debug!(target: TARGET, user = username, "no directory handle stored");
            return BootOutcome {
                phase: self.settle_local_only(),
                offer_directory_selection: true,
                migrated_legacy_handle,
            };
        };
        self.ctx.replace_handle(Some(handle), true);

        self.ctx.set_phase(BootPhase::CheckingPermission);
        let phase = match self.negotiator.resolve_session_permission().await {
            Some(PermissionState::Granted) => self.settle_external().await,
            _ => {
                self.ctx.set_phase(BootPhase::AwaitingUserGrant);
                BootPhase::AwaitingUserGrant
            }
        };
        BootOutcome {
            phase,
            offer_directory_selection: false,
            migrated_legacy_handle,
        }
    }

    /// Shows the directory picker and adopts the chosen directory.
    ///
    /// Returns `Ok(false)` when the user dismisses the picker. The handle is stored only after
    /// read/write access is granted.
    ///
    /// # Errors
    ///
    /// - [`StorageError::CapabilityUnsupported`] without a directory primitive or logged-in user.
    /// - [`StorageError::ExternalIo`] when the picker itself fails.
    /// - [`StorageError::HandleInvalid`] when the chosen handle fails the capability check.
    /// - [`StorageError::PermissionDenied`] when access is refused.
    /// - [`StorageError::LocalStore`] when the handle record cannot be written.
    pub async fn request_directory_selection(
        &self,
        activation: &UserActivation,
    ) -> Result<bool, StorageError> {
        let Some(username) = self.ctx.username() else {
            return Err(StorageError::CapabilityUnsupported);
        };
        if !self.ctx.external_supported() {
            return Err(StorageError::CapabilityUnsupported);
        }

        let picked = self
            .host
            .pick_directory(activation)
            .await
            .map_err(|message| StorageError::external("pick", "directory", message))?;
        let Some(handle) = picked else {
            tracing::debug!(target: TARGET, user = %username, "directory picker dismissed");
            return Ok(false);
        };
        validate_handle(&handle)?;

        let state = self.negotiator.request_permission(&handle, activation).await;
        if !state.is_granted() {
            tracing::info!(target: TARGET, user = %username, "directory access refused");
            return Err(StorageError::PermissionDenied);
        }

        self.handles.store_handle(&username, handle.clone()).await?;
        self.ctx.replace_handle(Some(handle), true);
        self.ctx.record_permission(PermissionState::Granted);
        tracing::info!(target: TARGET, user = %username, "directory selected");
        self.settle_external().await;
        Ok(true)
    }

    /// Asks again for access to the stored handle.
    ///
    /// Returns the recorded answer; [`PermissionState::Denied`] when there is no session handle.
    pub async fn retry_permission(&self, activation: &UserActivation) -> PermissionState {
        let Some(state) = self.negotiator.grant_session_permission(activation).await else {
            tracing::debug!(target: TARGET, "no session handle to grant");
            return PermissionState::Denied;
        };
        if state.is_granted() {
            self.settle_external().await;
        } else {
            self.ctx.set_phase(BootPhase::AwaitingUserGrant);
        }
        state
    }

    /// Forgets the directory for the session user, including the legacy unscoped record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when a record cannot be deleted; the session handle
    /// is kept in that case.
    pub async fn disconnect_directory(&self) -> Result<(), StorageError> {
        if let Some(username) = self.ctx.username() {
            self.handles.clear_handle(&username).await?;
            self.handles.clear_legacy_handle().await?;
            tracing::info!(target: TARGET, user = %username, "directory disconnected");
        }
        self.ctx.replace_handle(None, false);
        if self.ctx.phase() != BootPhase::Init {
            self.settle_local_only();
        }
        Ok(())
    }

    fn settle_local_only(&self) -> BootPhase {
        let phase = BootPhase::Ready(ReadyMode::LocalOnly);
        self.ctx.set_phase(phase);
        phase
    }

    async fn settle_external(&self) -> BootPhase {
        let phase = BootPhase::Ready(ReadyMode::External);
        self.ctx.set_phase(phase);
        if self.sync_on_ready {
            if let Err(err) = self.sync.reconcile().await {
                tracing::warn!(target: TARGET, error = %err, "reconciliation after reaching external mode failed");
            }
        }
        phase
    }
}
