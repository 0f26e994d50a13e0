use crate::models::device::MediaKind;
use crate::models::error::CaptureError;
use crate::models::state::CallSnapshot;

/// Event delegate for call session notifications.
///
/// Methods may be called from the runtime's worker tasks (grace timer,
/// acquisitions). Implementations should marshal to the UI thread if needed.
pub trait SessionDelegate: Send + Sync {
    /// Called whenever the observable call state changes.
    fn on_state_changed(&self, snapshot: &CallSnapshot);

    /// Called when a role degrades. The call keeps running.
    fn on_device_error(&self, kind: MediaKind, error: &CaptureError);

    /// Called once when the call ends; triggers navigation and back-end teardown.
    fn on_call_ended(&self);
}
