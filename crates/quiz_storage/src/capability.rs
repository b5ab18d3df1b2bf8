//! Capability detection for the external directory backend.

use persistence_host::ExternalStorageHost;

/// Returns whether the host exposes a user-grantable directory primitive.
///
/// Pure and synchronous. When this is `false` every other component stays in local-only mode.
pub fn is_external_storage_supported<H: ExternalStorageHost + ?Sized>(host: &H) -> bool {
    host.is_external_storage_supported()
}
