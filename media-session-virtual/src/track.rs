use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use media_session_core::models::device::MediaKind;
use media_session_core::traits::capture_platform::{MediaTrack, VideoFrame};

use crate::devices::VirtualDevice;
use crate::events::{EventLog, PlatformEvent};
use crate::pattern::PatternGenerator;
use crate::tone::ToneGenerator;

enum Source {
    Tone(ToneGenerator),
    Pattern(PatternGenerator),
}

/// A live track on a virtual device.
///
/// Microphones read a sine tone (silence while disabled); cameras yield a
/// test pattern (black while disabled). Nothing is produced once the track
/// has stopped or its device was unplugged.
pub struct VirtualTrack {
    id: String,
    kind: MediaKind,
    device_id: String,
    label: String,
    enabled: AtomicBool,
    live: AtomicBool,
    source: Mutex<Source>,
    events: EventLog,
}

impl VirtualTrack {
    pub(crate) fn open(id: String, device: &VirtualDevice, events: EventLog) -> Self {
        let source = match device.kind {
            MediaKind::Audio => Source::Tone(ToneGenerator::new(device.tone_hz, device.amplitude)),
            MediaKind::Video => Source::Pattern(PatternGenerator::new(&device.id)),
        };
        events.record(PlatformEvent::Opened {
            track_id: id.clone(),
            device_id: device.id.clone(),
            kind: device.kind,
        });
        Self {
            id,
            kind: device.kind,
            device_id: device.id.clone(),
            label: device.label.clone(),
            enabled: AtomicBool::new(true),
            live: AtomicBool::new(true),
            source: Mutex::new(source),
            events,
        }
    }

    /// The device disappeared underneath the track.
    pub(crate) fn end(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            log::info!("Track {} ended: {} unplugged", self.id, self.device_id);
            self.events.record(PlatformEvent::Ended {
                track_id: self.id.clone(),
                device_id: self.device_id.clone(),
            });
        }
    }
}

impl MediaTrack for VirtualTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            log::debug!("Track {} on {} stopped", self.id, self.device_id);
            self.events.record(PlatformEvent::Stopped {
                track_id: self.id.clone(),
                device_id: self.device_id.clone(),
            });
        }
    }

    fn read_samples(&self, out: &mut [f32]) -> usize {
        if !self.is_live() {
            return 0;
        }
        let mut source = self.source.lock();
        let Source::Tone(tone) = &mut *source else {
            return 0;
        };
        if self.is_enabled() {
            tone.fill(out);
        } else {
            out.fill(0.0);
        }
        out.len()
    }

    fn frame(&self) -> Option<VideoFrame> {
        if !self.is_live() {
            return None;
        }
        match &mut *self.source.lock() {
            Source::Pattern(pattern) => Some(pattern.next_frame(self.is_enabled())),
            Source::Tone(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mic() -> (EventLog, VirtualTrack) {
        let events = EventLog::new();
        let device =
            VirtualDevice::microphone("mic-a", "Built-in Microphone").with_tone(440.0, 0.5);
        let track = VirtualTrack::open("track-1".into(), &device, events.clone());
        (events, track)
    }

    #[test]
    fn disabled_mic_reads_silence() {
        let (_, track) = mic();
        let mut out = vec![1.0f32; 128];

        track.set_enabled(false);
        assert_eq!(track.read_samples(&mut out), 128);
        assert!(out.iter().all(|s| *s == 0.0));

        track.set_enabled(true);
        track.read_samples(&mut out);
        assert!(out.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn stop_is_idempotent_and_logged_once() {
        let (events, track) = mic();
        track.stop();
        track.stop();
        track.end();

        assert!(!track.is_live());
        assert_eq!(events.count(|e| matches!(e, PlatformEvent::Stopped { .. })), 1);
        assert_eq!(events.count(|e| matches!(e, PlatformEvent::Ended { .. })), 0);
        assert_eq!(track.read_samples(&mut [0.0; 16]), 0);
    }

    #[test]
    fn camera_frames_stop_with_track() {
        let events = EventLog::new();
        let camera = VirtualDevice::camera("cam-a", "Cam");
        let track = VirtualTrack::open("track-2".into(), &camera, events.clone());

        assert_eq!(track.frame().map(|f| f.sequence), Some(0));
        assert_eq!(track.read_samples(&mut [0.0; 16]), 0);
        track.end();
        assert!(track.frame().is_none());
        assert_eq!(events.count(|e| matches!(e, PlatformEvent::Ended { .. })), 1);
    }
}
