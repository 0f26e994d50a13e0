use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::models::device::MediaKind;
use crate::traits::capture_platform::MediaTrack;

/// Owned capture resource for one role.
///
/// States: open → stopped (terminal). Exactly one controller owns a handle;
/// it is never cloned or shared. Dropping an open handle stops its tracks, so
/// every exit path releases the hardware even without an explicit `stop()`.
pub struct CaptureHandle {
    id: Uuid,
    kind: MediaKind,
    device_id: String,
    tracks: Vec<Arc<dyn MediaTrack>>,
    stopped: AtomicBool,
}

impl CaptureHandle {
    /// Wrap tracks opened for `kind`. Device id is taken from the first track.
    pub fn new(kind: MediaKind, tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        let device_id = tracks
            .first()
            .map(|t| t.device_id().to_string())
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            kind,
            device_id,
            tracks,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// The device the platform actually opened.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn is_open(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// Open and at least one track still delivering.
    pub fn is_healthy(&self) -> bool {
        self.is_open() && self.tracks.iter().any(|t| t.is_live())
    }

    /// First track of the handle's role.
    pub fn primary_track(&self) -> Option<&Arc<dyn MediaTrack>> {
        self.tracks.iter().find(|t| t.kind() == self.kind)
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn set_enabled(&self, enabled: bool) {
        if !self.is_open() {
            return;
        }
        for track in &self.tracks {
            track.set_enabled(enabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.is_open() && self.tracks.iter().any(|t| t.is_live() && t.is_enabled())
    }

    /// Stop all tracks. Safe to call any number of times.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        for track in &self.tracks {
            track.stop();
        }
        log::debug!("Stopped {} handle {} ({})", self.kind, self.id, self.device_id);
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("device_id", &self.device_id)
            .field("tracks", &self.tracks.len())
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Minimal track for unit tests: a constant-amplitude signal.
    pub(crate) struct StubTrack {
        pub kind: MediaKind,
        pub device: String,
        pub enabled: AtomicBool,
        pub live: AtomicBool,
        pub stop_calls: AtomicUsize,
        pub reads: AtomicUsize,
        pub amplitude: f32,
    }

    impl StubTrack {
        pub(crate) fn new(kind: MediaKind, device: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                device: device.to_string(),
                enabled: AtomicBool::new(true),
                live: AtomicBool::new(true),
                stop_calls: AtomicUsize::new(0),
                reads: AtomicUsize::new(0),
                amplitude: 0.5,
            })
        }
    }

    impl MediaTrack for StubTrack {
        fn id(&self) -> &str {
            &self.device
        }

        fn kind(&self) -> MediaKind {
            self.kind
        }

        fn device_id(&self) -> &str {
            &self.device
        }

        fn label(&self) -> &str {
            "stub"
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
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.live.store(false, Ordering::SeqCst);
        }

        fn read_samples(&self, out: &mut [f32]) -> usize {
            assert!(self.is_live(), "read from a stopped track");
            self.reads.fetch_add(1, Ordering::SeqCst);
            for (i, sample) in out.iter_mut().enumerate() {
                *sample = self.amplitude * (i as f32 * 0.37).sin();
            }
            out.len()
        }
    }

    #[test]
    fn stop_is_idempotent() {
        let track = StubTrack::new(MediaKind::Video, "cam-a");
        let handle =
            CaptureHandle::new(MediaKind::Video, vec![track.clone() as Arc<dyn MediaTrack>]);

        handle.stop();
        handle.stop();

        assert!(!handle.is_open());
        assert_eq!(track.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_stops_open_handle() {
        let track = StubTrack::new(MediaKind::Audio, "mic-a");
        {
            let _handle =
                CaptureHandle::new(MediaKind::Audio, vec![track.clone() as Arc<dyn MediaTrack>]);
        }
        assert!(!track.is_live());
        assert_eq!(track.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn device_id_comes_from_track() {
        let handle = CaptureHandle::new(
            MediaKind::Video,
            vec![StubTrack::new(MediaKind::Video, "cam-b") as Arc<dyn MediaTrack>],
        );
        assert_eq!(handle.device_id(), "cam-b");
        assert!(handle.primary_track().is_some());
        assert!(handle.is_healthy());
    }

    #[test]
    fn enabled_flag_ignored_after_stop() {
        let track = StubTrack::new(MediaKind::Audio, "mic-a");
        let handle =
            CaptureHandle::new(MediaKind::Audio, vec![track.clone() as Arc<dyn MediaTrack>]);

        handle.set_enabled(false);
        assert!(!handle.is_enabled());

        handle.stop();
        handle.set_enabled(true);
        assert!(!track.is_enabled());
        assert!(!handle.is_enabled());
    }

    #[test]
    fn ended_track_is_neither_healthy_nor_enabled() {
        let track = StubTrack::new(MediaKind::Audio, "mic-a");
        let handle =
            CaptureHandle::new(MediaKind::Audio, vec![track.clone() as Arc<dyn MediaTrack>]);
        handle.set_enabled(true);

        track.live.store(false, Ordering::SeqCst);

        assert!(handle.is_open());
        assert!(!handle.is_healthy());
        assert!(!handle.is_enabled());
    }
}
