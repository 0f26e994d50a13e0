use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::device::MediaKind;
use super::error::CaptureError;

/// Bounded automatic retry for `HardwareBusy` acquisitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Extra attempts after the first one (0 disables retrying).
    pub max_retries: u32,

    /// Delay between attempts in milliseconds.
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 250,
        }
    }
}

/// Configuration for a call session and its device settings sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfiguration {
    /// Delay before Connecting becomes Active (default: 5000 ms).
    pub grace_period_ms: u64,

    /// Level meter sampling frequency (default: 60 Hz).
    pub meter_rate_hz: f64,

    /// Analyser window size (default: 256). Power of two in 32..=32768.
    pub fft_size: usize,

    /// Spectral smoothing between analyser frames, in [0, 1) (default: 0.8).
    pub smoothing_time_constant: f32,

    /// Magnitude mapped to level byte 0 (default: -100 dB).
    pub min_decibels: f32,

    /// Magnitude mapped to level byte 255 (default: -30 dB).
    pub max_decibels: f32,

    pub busy_retry: RetryPolicy,

    /// Initial camera, or None for the platform default.
    pub video_device_id: Option<String>,

    /// Initial microphone, or None for the platform default.
    pub audio_device_id: Option<String>,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.meter_rate_hz > 0.0 && self.meter_rate_hz <= 240.0) {
            return Err(format!("meter rate out of range: {}", self.meter_rate_hz));
        }
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(format!("unsupported fft size: {}", self.fft_size));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(format!(
                "smoothing time constant out of range: {}",
                self.smoothing_time_constant
            ));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(format!(
                "min decibels ({}) must be below max decibels ({})",
                self.min_decibels, self.max_decibels
            ));
        }
        Ok(())
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to parse configuration: {}", e))
        })?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn meter_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.meter_rate_hz)
    }

    pub fn initial_device(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Video => self.video_device_id.as_deref(),
            MediaKind::Audio => self.audio_device_id.as_deref(),
        }
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            grace_period_ms: 5000,
            meter_rate_hz: 60.0,
            fft_size: 256,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            busy_retry: RetryPolicy::default(),
            video_device_id: None,
            audio_device_id: None,
        }
    }
}
