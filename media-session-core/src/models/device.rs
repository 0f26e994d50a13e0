use serde::{Deserialize, Serialize};

/// Capture role: each role owns its hardware state independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Video, MediaKind::Audio];

    /// Generic name used when the platform withholds a device label.
    pub fn fallback_name(self) -> &'static str {
        match self {
            Self::Audio => "Microphone",
            Self::Video => "Camera",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// A capture device as reported by one enumeration.
///
/// Only valid for the lifetime of that enumeration: hardware can disappear
/// between calls, so dialogs enumerate afresh every time they open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDevice {
    pub id: String,
    pub kind: MediaKind,
    pub label: String,
}

impl CaptureDevice {
    pub fn new(id: impl Into<String>, kind: MediaKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }

    /// Label to show in a picker: the platform label, or `"Camera abcde..."`
    /// built from the id when labels are hidden before permission is granted.
    pub fn display_label(&self) -> String {
        if !self.label.trim().is_empty() {
            return self.label.clone();
        }
        let prefix: String = self.id.chars().take(5).collect();
        format!("{} {}...", self.kind.fallback_name(), prefix)
    }
}

/// Constraints for opening a single-role stream.
///
/// A combined audio+video request is never expressed: each role is opened
/// with its own constraints so one failing device cannot block the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub kind: MediaKind,
    /// Exact device id, or `None` for the platform default.
    pub device_id: Option<String>,
}

impl StreamConstraints {
    pub fn new(kind: MediaKind, device_id: Option<&str>) -> Self {
        Self {
            kind,
            device_id: device_id.map(str::to_owned),
        }
    }
}

/// Chosen device id per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSelection {
    pub video: Option<String>,
    pub audio: Option<String>,
}

impl DeviceSelection {
    pub fn get(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Video => self.video.as_deref(),
            MediaKind::Audio => self.audio.as_deref(),
        }
    }

    pub fn set(&mut self, kind: MediaKind, device_id: Option<String>) {
        match kind {
            MediaKind::Video => self.video = device_id,
            MediaKind::Audio => self.audio = device_id,
        }
    }
}

/// Result of opening the device picker: fresh device lists and the
/// initial choice for each role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceChoices {
    pub video_devices: Vec<CaptureDevice>,
    pub audio_devices: Vec<CaptureDevice>,
    pub selected: DeviceSelection,
}

impl DeviceChoices {
    pub fn devices(&self, kind: MediaKind) -> &[CaptureDevice] {
        match kind {
            MediaKind::Video => &self.video_devices,
            MediaKind::Audio => &self.audio_devices,
        }
    }
}
