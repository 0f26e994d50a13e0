//! Headless stand-ins for the UI's video element and level meter.

use std::sync::Arc;

use parking_lot::Mutex;

use media_session_core::processing::level_color::{level_color, Rgb};
use media_session_core::traits::capture_platform::{MediaTrack, VideoFrame};
use media_session_core::traits::surface::{LevelSink, VideoSurface};

use crate::events::{EventLog, PlatformEvent};

/// Video surface that renders on demand instead of on vsync.
///
/// Attach and detach are written to the platform event log so tests can
/// check ordering against track open/stop events.
pub struct HeadlessSurface {
    name: String,
    events: EventLog,
    track: Mutex<Option<Arc<dyn MediaTrack>>>,
    last_frame: Mutex<Option<(String, VideoFrame)>>,
}

impl HeadlessSurface {
    pub fn new(name: impl Into<String>, events: EventLog) -> Self {
        Self {
            name: name.into(),
            events,
            track: Mutex::new(None),
            last_frame: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device of the attached track, if any.
    pub fn attached_device(&self) -> Option<String> {
        self.track.lock().as_ref().map(|t| t.device_id().to_string())
    }

    /// Pull one frame from the attached track.
    ///
    /// Returns `None` when nothing is attached or the track has ended.
    pub fn render(&self) -> Option<VideoFrame> {
        let track = self.track.lock().clone()?;
        let frame = track.frame()?;
        *self.last_frame.lock() = Some((track.device_id().to_string(), frame.clone()));
        Some(frame)
    }

    /// Device and frame of the most recent render.
    pub fn last_frame(&self) -> Option<(String, VideoFrame)> {
        self.last_frame.lock().clone()
    }
}

impl VideoSurface for HeadlessSurface {
    fn attach(&self, track: Arc<dyn MediaTrack>) {
        self.events.record(PlatformEvent::Attached {
            surface: self.name.clone(),
            device_id: track.device_id().to_string(),
        });
        *self.track.lock() = Some(track);
    }

    fn detach(&self) {
        if self.track.lock().take().is_some() {
            self.events.record(PlatformEvent::Detached {
                surface: self.name.clone(),
            });
        }
    }
}

#[derive(Debug, Default)]
struct MeterReadout {
    level: f32,
    peak: f32,
    draws: u64,
}

/// Level sink that keeps the last drawn value and renders a text bar.
#[derive(Debug, Default)]
pub struct MeterDisplay {
    readout: Mutex<MeterReadout>,
}

impl MeterDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> f32 {
        self.readout.lock().level
    }

    /// Highest level drawn since construction.
    pub fn peak(&self) -> f32 {
        self.readout.lock().peak
    }

    pub fn draws(&self) -> u64 {
        self.readout.lock().draws
    }

    pub fn color(&self) -> Rgb {
        level_color(self.level())
    }

    /// `width` cells, filled in proportion to the level.
    pub fn bar(&self, width: usize) -> String {
        let filled = ((self.level() * width as f32).round() as usize).min(width);
        format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
    }
}

impl LevelSink for MeterDisplay {
    fn draw(&self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        let mut readout = self.readout.lock();
        readout.level = level;
        readout.peak = readout.peak.max(level);
        readout.draws += 1;
    }
}
