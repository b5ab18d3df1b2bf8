//! Permission states, access modes, and the user-activation token.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Access grant reported by a directory handle for the current check.
///
/// Grants can be revoked by the browser or the user at any time, so a value of this type is only
/// meaningful for the check that produced it.
pub enum PermissionState {
    /// Access is granted.
    Granted,
    /// The host will prompt the user before granting access.
    Prompt,
    /// Access is denied.
    Denied,
}

impl PermissionState {
    /// Returns `true` when reads and writes are allowed.
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Maps a host permission token (`"granted"`, `"prompt"`, `"denied"`) to a state.
    ///
    /// Unknown tokens map to [`PermissionState::Prompt`] so callers keep offering a retry.
    pub fn from_host_token(token: &str) -> Self {
        match token {
            "granted" => Self::Granted,
            "denied" => Self::Denied,
            _ => Self::Prompt,
        }
    }

    /// Returns the stable kebab-case token for this state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Prompt => "prompt",
            Self::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
/// Access mode queried or requested on a directory handle.
pub enum PermissionMode {
    /// Read-only access.
    Read,
    /// Read/write access.
    #[default]
    Readwrite,
}

impl PermissionMode {
    /// Returns the host token for this mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Readwrite => "readwrite",
        }
    }
}

#[derive(Debug)]
/// Proof that the current call stack originates from a user gesture (click, tap, key press).
///
/// Hosts reject permission prompts and directory pickers that are not triggered by a gesture, so
/// every prompting API takes `&UserActivation`. Startup and background code never holds one.
pub struct UserActivation {
    _private: (),
}

impl UserActivation {
    /// Creates the token inside a user-gesture event handler.
    ///
    /// Only call this from code that runs as the direct result of a user interaction.
    pub fn from_user_gesture() -> Self {
        Self { _private: () }
    }
}
