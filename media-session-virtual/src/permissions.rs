//! Per-kind capture permission state.
//!
//! An unanswered prompt is granted the first time it is asked, unless the
//! kind has been explicitly denied. Denial is sticky until `grant()`.

use media_session_core::models::device::MediaKind;
use media_session_core::models::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Prompt,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Permissions {
    video: PermissionState,
    audio: PermissionState,
}

impl Permissions {
    pub(crate) fn state(&self, kind: MediaKind) -> PermissionState {
        match kind {
            MediaKind::Video => self.video,
            MediaKind::Audio => self.audio,
        }
    }

    pub(crate) fn set(&mut self, kind: MediaKind, state: PermissionState) {
        match kind {
            MediaKind::Video => self.video = state,
            MediaKind::Audio => self.audio = state,
        }
    }

    /// Answer a prompt for `kind`.
    pub(crate) fn request(&mut self, kind: MediaKind) -> Result<(), CaptureError> {
        match self.state(kind) {
            PermissionState::Denied => Err(CaptureError::PermissionDenied),
            PermissionState::Granted => Ok(()),
            PermissionState::Prompt => {
                self.set(kind, PermissionState::Granted);
                Ok(())
            }
        }
    }

    pub(crate) fn is_granted(&self, kind: MediaKind) -> bool {
        self.state(kind) == PermissionState::Granted
    }
}
