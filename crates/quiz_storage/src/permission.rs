//! Permission negotiation for directory handles.
//!
//! Background code may only *query* permission. Requests can show a host prompt and hosts
//! reject prompts outside a user gesture, so every requesting method takes a
//! [`UserActivation`].

use persistence_host::{
    DirectoryHandle, PermissionMode, PermissionState, SharedDirectoryHandle, UserActivation,
};

use crate::context::StorageContext;

const TARGET: &str = "quiz_storage::permission";

#[derive(Debug, Clone)]
/// Queries and upgrades directory permissions, recording session answers in the context.
pub struct PermissionNegotiator {
    ctx: StorageContext,
    mode: PermissionMode,
}

impl PermissionNegotiator {
    /// Creates a negotiator asking for read/write access.
    pub fn new(ctx: StorageContext) -> Self {
        Self {
            ctx,
            mode: PermissionMode::Readwrite,
        }
    }

    /// Queries `handle` without prompting.
    ///
    /// A failing query is reported as [`PermissionState::Prompt`], which keeps the retry
    /// affordance available instead of treating a transient failure as a denial.
    pub async fn check_permission(&self, handle: &SharedDirectoryHandle) -> PermissionState {
        match handle.query_permission(self.mode).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(target: TARGET, directory = %handle.name(), error = %err, "permission query failed");
                PermissionState::Prompt
            }
        }
    }

    /// Requests access on `handle`. Resolves to `Granted` or `Denied` only.
    pub async fn request_permission(
        &self,
        handle: &SharedDirectoryHandle,
        activation: &UserActivation,
    ) -> PermissionState {
        match handle.request_permission(self.mode, activation).await {
            Ok(PermissionState::Granted) => PermissionState::Granted,
            Ok(other) => {
                tracing::debug!(target: TARGET, directory = %handle.name(), answer = other.as_str(), "permission request not granted");
                PermissionState::Denied
            }
            Err(err) => {
                tracing::warn!(target: TARGET, directory = %handle.name(), error = %err, "permission request failed");
                PermissionState::Denied
            }
        }
    }

    /// Queries the session handle and records the answer.
    ///
    /// Returns `None` when the session has no handle.
    pub async fn resolve_session_permission(&self) -> Option<PermissionState> {
        let handle = self.ctx.current_handle()?;
        let state = self.check_permission(&handle).await;
        if self.ctx.permission() != Some(state) {
            tracing::debug!(target: TARGET, permission = state.as_str(), "session permission resolved");
        }
        self.ctx.record_permission(state);
        Some(state)
    }

    /// Requests access on the session handle and records the answer.
    ///
    /// Returns `None` when the session has no handle.
    pub async fn grant_session_permission(
        &self,
        activation: &UserActivation,
    ) -> Option<PermissionState> {
        let handle = self.ctx.current_handle()?;
        let state = self.request_permission(&handle, activation).await;
        self.ctx.record_permission(state);
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use persistence_host::{HandleCapabilities, MemoryDirectoryHandle};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn check_reports_state_without_prompting() {
        let negotiator = PermissionNegotiator::new(StorageContext::new());
        let dir = MemoryDirectoryHandle::new("quiz").with_permission(PermissionState::Prompt);

        assert_eq!(
            block_on(negotiator.check_permission(&dir.shared())),
            PermissionState::Prompt
        );
        assert_eq!(dir.request_permission_calls(), 0);
        assert_eq!(dir.query_permission_calls(), 1);
    }

    #[test]
    fn failing_query_reads_as_prompt() {
        let negotiator = PermissionNegotiator::new(StorageContext::new());
        let dir = MemoryDirectoryHandle::new("quiz");
        dir.set_capabilities(HandleCapabilities {
            can_query_permission: false,
            ..HandleCapabilities::FULL
        });

        assert_eq!(
            block_on(negotiator.check_permission(&dir.shared())),
            PermissionState::Prompt
        );
    }

    #[test]
    fn dismissed_or_failed_requests_read_as_denied() {
        let negotiator = PermissionNegotiator::new(StorageContext::new());
        let gesture = UserActivation::from_user_gesture();

        let dismissed = MemoryDirectoryHandle::new("quiz").with_permission(PermissionState::Prompt);
        dismissed.set_request_answer(PermissionState::Prompt);
        assert_eq!(
            block_on(negotiator.request_permission(&dismissed.shared(), &gesture)),
            PermissionState::Denied
        );

        let broken = MemoryDirectoryHandle::new("quiz").with_permission(PermissionState::Prompt);
        broken.set_capabilities(HandleCapabilities {
            can_request_permission: false,
            ..HandleCapabilities::FULL
        });
        assert_eq!(
            block_on(negotiator.request_permission(&broken.shared(), &gesture)),
            PermissionState::Denied
        );

        let accepted = MemoryDirectoryHandle::new("quiz").with_permission(PermissionState::Prompt);
        assert_eq!(
            block_on(negotiator.request_permission(&accepted.shared(), &gesture)),
            PermissionState::Granted
        );
    }

    #[test]
    fn session_answers_are_recorded_in_context() {
        let ctx = StorageContext::new();
        let negotiator = PermissionNegotiator::new(ctx.clone());
        assert_eq!(block_on(negotiator.resolve_session_permission()), None);

        let dir = MemoryDirectoryHandle::new("quiz").with_permission(PermissionState::Denied);
        ctx.begin_session("ada", true);
        ctx.replace_handle(Some(dir.shared()), true);
        assert_eq!(
            block_on(negotiator.resolve_session_permission()),
            Some(PermissionState::Denied)
        );
        assert_eq!(ctx.permission(), Some(PermissionState::Denied));

        let gesture = UserActivation::from_user_gesture();
        assert_eq!(
            block_on(negotiator.grant_session_permission(&gesture)),
            Some(PermissionState::Granted)
        );
        assert!(ctx.granted_handle().is_some());
    }
}
