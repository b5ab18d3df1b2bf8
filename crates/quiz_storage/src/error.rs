//! Error taxonomy for the persistence engine.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Failures observed by the persistence engine.
///
/// Only [`StorageError::LocalStore`] and [`StorageError::Serialization`] ever reach callers of
/// `load`/`save`; every other kind is absorbed, logged, and reflected through the status
/// publisher.
pub enum StorageError {
    /// The host lacks the directory-grant primitive.
    #[error("external directory storage is not supported on this host")]
    CapabilityUnsupported,
    /// No directory handle is stored for the user.
    #[error("no directory handle stored for this user")]
    HandleNotFound,
    /// A stored object failed the minimal capability check.
    #[error("stored directory handle is unusable: {reason}")]
    HandleInvalid {
        /// What the capability probe found missing or corrupt.
        reason: String,
    },
    /// The user declined or revoked directory access.
    #[error("directory permission was not granted")]
    PermissionDenied,
    /// Reading or writing the external directory failed.
    #[error("external storage {operation} for `{resource}` failed: {message}")]
    ExternalIo {
        /// Operation that failed (`read`, `write`, `list`).
        operation: &'static str,
        /// Resource or file involved.
        resource: String,
        /// Host error message.
        message: String,
    },
    /// The durable local store failed to open or transact.
    #[error("local store {operation} failed: {message}")]
    LocalStore {
        /// Operation that failed (`get`, `put`, `delete`, `keys`).
        operation: &'static str,
        /// Host error message.
        message: String,
    },
    /// A typed payload could not be converted to or from JSON.
    #[error("resource `{resource}` (de)serialization failed: {message}")]
    Serialization {
        /// Resource involved.
        resource: String,
        /// serde error message.
        message: String,
    },
}

impl StorageError {
    /// Returns `true` for the kinds that must propagate to callers.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::LocalStore { .. } | Self::Serialization { .. })
    }

    pub(crate) fn local(operation: &'static str, message: impl Into<String>) -> Self {
        Self::LocalStore {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn external(
        operation: &'static str,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ExternalIo {
            operation,
            resource: resource.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Invalid [`crate::StorageConfig`] values.
pub enum ConfigError {
    /// A required string setting is empty.
    #[error("config field `{field}` must not be empty")]
    Empty {
        /// Offending field.
        field: &'static str,
    },
    /// The handle and resource key namespaces overlap.
    #[error("key namespaces overlap: `{first}` and `{second}`")]
    OverlappingNamespaces {
        /// First prefix or key.
        first: String,
        /// Second prefix or key.
        second: String,
    },
    /// The config document could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_and_serialization_failures_are_fatal() {
        assert!(StorageError::local("put", "quota exceeded").is_fatal());
        assert!(StorageError::Serialization {
            resource: "groups".to_string(),
            message: "bad".to_string(),
        }
        .is_fatal());
        assert!(!StorageError::external("write", "groups", "unmounted").is_fatal());
        assert!(!StorageError::PermissionDenied.is_fatal());
        assert!(!StorageError::CapabilityUnsupported.is_fatal());
        assert!(!StorageError::HandleNotFound.is_fatal());
    }

    #[test]
    fn error_messages_name_the_failing_operation() {
        let err = StorageError::external("read", "questions", "NotFoundError");
        assert_eq!(
            err.to_string(),
            "external storage read for `questions` failed: NotFoundError"
        );
        assert_eq!(
            StorageError::local("get", "db closed").to_string(),
            "local store get failed: db closed"
        );
    }
}
