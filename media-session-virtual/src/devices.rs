//! Synthetic device catalog.
//!
//! Stands in for the OS device list: cameras produce a moving test pattern,
//! microphones a sine tone. Labels are only revealed once the matching
//! permission has been granted, the way browsers hide them.

use media_session_core::models::device::{CaptureDevice, MediaKind};

/// One plugged-in virtual device.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDevice {
    pub id: String,
    pub kind: MediaKind,
    pub label: String,
    /// Tone frequency for microphones, in Hz.
    pub tone_hz: f32,
    /// Peak amplitude for microphones, in [0, 1].
    pub amplitude: f32,
}

impl VirtualDevice {
    pub fn camera(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Video,
            label: label.into(),
            tone_hz: 0.0,
            amplitude: 0.0,
        }
    }

    pub fn microphone(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Audio,
            label: label.into(),
            tone_hz: 440.0,
            amplitude: 0.5,
        }
    }

    pub fn with_tone(mut self, tone_hz: f32, amplitude: f32) -> Self {
        self.tone_hz = tone_hz;
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// What enumeration reports for this device.
    pub fn describe(&self, label_visible: bool) -> CaptureDevice {
        let label = if label_visible { self.label.as_str() } else { "" };
        CaptureDevice::new(self.id.as_str(), self.kind, label)
    }
}

/// Two cameras and two microphones.
pub fn default_devices() -> Vec<VirtualDevice> {
    vec![
        VirtualDevice::camera("cam-a", "Integrated Camera"),
        VirtualDevice::camera("cam-b", "USB Camera"),
        VirtualDevice::microphone("mic-a", "Built-in Microphone").with_tone(440.0, 0.3),
        VirtualDevice::microphone("mic-b", "USB Headset").with_tone(880.0, 0.6),
    ]
}

/// Ordered set of plugged-in devices.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceCatalog {
    devices: Vec<VirtualDevice>,
}

impl DeviceCatalog {
    pub(crate) fn new(devices: Vec<VirtualDevice>) -> Self {
        Self { devices }
    }

    pub(crate) fn find(&self, id: &str) -> Option<&VirtualDevice> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// The system default for `kind`: first one plugged in.
    pub(crate) fn default_for(&self, kind: MediaKind) -> Option<&VirtualDevice> {
        self.devices.iter().find(|d| d.kind == kind)
    }

    /// Plug a device in, replacing any device with the same id.
    pub(crate) fn plug(&mut self, device: VirtualDevice) {
        self.devices.retain(|d| d.id != device.id);
        self.devices.push(device);
    }

    pub(crate) fn unplug(&mut self, id: &str) -> Option<VirtualDevice> {
        let index = self.devices.iter().position(|d| d.id == id)?;
        Some(self.devices.remove(index))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &VirtualDevice> {
        self.devices.iter()
    }
}
