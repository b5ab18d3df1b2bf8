//! Tri-state storage indicator derived from the session context.
//!
//! The status is a display hint only. Nothing correctness-critical branches on it; data access
//! re-checks permission itself before every external operation.

use persistence_host::PermissionState;
use serde::{Deserialize, Serialize};

use crate::context::{StorageContext, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// External-storage indicator shown to the user.
pub enum StorageStatus {
    /// A granted directory is mirroring saves.
    Available,
    /// A directory is remembered but not usable until the user re-grants access.
    StoredNotLoaded,
    /// Local-only mode.
    Unavailable,
}

impl StorageStatus {
    /// Stable token for UI bindings.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::StoredNotLoaded => "stored-not-loaded",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Facts the status is computed from.
pub struct StatusInputs {
    /// Host supports external directories.
    pub external_supported: bool,
    /// A handle record exists for the user.
    pub handle_stored: bool,
    /// A handle is loaded into the session.
    pub session_handle: bool,
    /// Last permission answer this session.
    pub permission: Option<PermissionState>,
}

/// Maps status inputs to the indicator.
pub fn derive_status(inputs: StatusInputs) -> StorageStatus {
    if !inputs.external_supported {
        return StorageStatus::Unavailable;
    }
    if inputs.session_handle && inputs.permission == Some(PermissionState::Granted) {
        return StorageStatus::Available;
    }
    if inputs.handle_stored || inputs.session_handle {
        StorageStatus::StoredNotLoaded
    } else {
        StorageStatus::Unavailable
    }
}

#[derive(Debug, Clone)]
/// Read model over a [`StorageContext`].
pub struct StatusPublisher {
    ctx: StorageContext,
}

impl StatusPublisher {
    /// Creates a publisher reading `ctx`.
    pub fn new(ctx: StorageContext) -> Self {
        Self { ctx }
    }

    /// Recomputes the status now.
    pub fn current(&self) -> StorageStatus {
        self.ctx.status()
    }

    /// Calls `listener` after handle-stored, handle-cleared, and permission-resolved events.
    pub fn subscribe(&self, listener: impl Fn(StorageStatus) + 'static) -> SubscriptionId {
        self.ctx.subscribe(listener)
    }

    /// Stops notifying a listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.ctx.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn inputs(
        external_supported: bool,
        handle_stored: bool,
        session_handle: bool,
        permission: Option<PermissionState>,
    ) -> StatusInputs {
        StatusInputs {
            external_supported,
            handle_stored,
            session_handle,
            permission,
        }
    }

    #[test]
    fn status_mapping_matches_indicator_table() {
        let cases = [
            (inputs(false, true, true, Some(PermissionState::Granted)), StorageStatus::Unavailable),
            (inputs(true, false, false, None), StorageStatus::Unavailable),
            (inputs(true, true, true, Some(PermissionState::Granted)), StorageStatus::Available),
            (inputs(true, true, true, Some(PermissionState::Denied)), StorageStatus::StoredNotLoaded),
            (inputs(true, true, true, Some(PermissionState::Prompt)), StorageStatus::StoredNotLoaded),
            (inputs(true, true, false, None), StorageStatus::StoredNotLoaded),
            (inputs(true, true, true, None), StorageStatus::StoredNotLoaded),
        ];

        for (input, expected) in cases {
            assert_eq!(derive_status(input), expected, "inputs={input:?}");
        }
    }

    #[test]
    fn labels_match_serde_tokens() {
        for status in [
            StorageStatus::Available,
            StorageStatus::StoredNotLoaded,
            StorageStatus::Unavailable,
        ] {
            assert_eq!(
                serde_json::to_string(&status).expect("serialize"),
                format!("\"{}\"", status.label())
            );
        }
    }

    #[test]
    fn publisher_reads_a_fresh_context_as_unavailable() {
        let publisher = StatusPublisher::new(StorageContext::new());
        assert_eq!(publisher.current(), StorageStatus::Unavailable);
    }
}
