use serde::Serialize;

use super::device::MediaKind;
use super::error::CaptureError;

/// Call lifecycle.
///
/// State transitions:
/// ```text
/// connecting ──(grace period)──→ active
///      │                           │
///      └──────────→ ended ←────────┘   (ended is terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Connecting,
    Active,
    Ended,
}

impl CallState {
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    /// Whether the call has passed its grace period (drives the hang-up button).
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// Per-role health.
///
/// Set to `Unavailable` once an acquisition fails; stays there until a
/// later acquisition for the same role succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Healthy,
    Unavailable(CaptureError),
}

impl Availability {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn reason(&self) -> Option<&CaptureError> {
        match self {
            Self::Healthy => None,
            Self::Unavailable(reason) => Some(reason),
        }
    }
}

/// Non-blocking notice naming the degraded role(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DegradedBanner {
    Camera,
    Microphone,
    CameraAndMicrophone,
}

impl DegradedBanner {
    pub fn from_availability(video: &Availability, audio: &Availability) -> Option<Self> {
        match (video.is_healthy(), audio.is_healthy()) {
            (true, true) => None,
            (false, true) => Some(Self::Camera),
            (true, false) => Some(Self::Microphone),
            (false, false) => Some(Self::CameraAndMicrophone),
        }
    }

    pub fn affects(&self, kind: MediaKind) -> bool {
        match self {
            Self::Camera => kind == MediaKind::Video,
            Self::Microphone => kind == MediaKind::Audio,
            Self::CameraAndMicrophone => true,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Camera => "Camera is unavailable",
            Self::Microphone => "Microphone is unavailable",
            Self::CameraAndMicrophone => "Camera and microphone are unavailable",
        }
    }
}

/// Observable call state handed to the surrounding UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSnapshot {
    pub call_state: CallState,
    pub video_available: bool,
    pub audio_available: bool,
    pub muted: bool,
    pub mute_control_enabled: bool,
    pub level: f32,
    pub banner: Option<DegradedBanner>,
    pub video_device_id: Option<String>,
    pub audio_device_id: Option<String>,
}
