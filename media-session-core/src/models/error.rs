use thiserror::Error;

/// Errors that can occur while acquiring or driving capture devices.
///
/// Failures are contained per role: a value of this type is stored in the
/// role's availability flag and never ends the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not found")]
    DeviceNotFound,

    #[error("device not available")]
    DeviceUnavailable,

    #[error("device is in use by another process")]
    HardwareBusy,

    #[error("unknown error: {0}")]
    Unknown(String),

    #[error("session closed")]
    SessionClosed,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl CaptureError {
    /// Whether an explicit device switch can bring the role back.
    ///
    /// `PermissionDenied` stays fatal for the role until the user re-grants.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::PermissionDenied)
    }

    /// Whether the failure is a short-lived lock that a bounded retry may clear.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::HardwareBusy)
    }
}
