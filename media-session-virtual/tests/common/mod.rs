#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use media_session_core::{
    CallSession, CallSnapshot, CaptureError, MediaKind, SessionConfiguration, SessionDelegate,
    SessionSurfaces,
};
use media_session_virtual::{HeadlessSurface, MeterDisplay, VirtualPlatform};

pub const GRACE: Duration = Duration::from_millis(5000);

/// Delegate that remembers every notification.
#[derive(Default)]
pub struct RecordingDelegate {
    pub snapshots: Mutex<Vec<CallSnapshot>>,
    pub errors: Mutex<Vec<(MediaKind, CaptureError)>>,
    pub ended: Mutex<u32>,
}

impl RecordingDelegate {
    pub fn errors_for(&self, kind: MediaKind) -> Vec<CaptureError> {
        self.errors
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn ended_count(&self) -> u32 {
        *self.ended.lock()
    }
}

impl SessionDelegate for RecordingDelegate {
    fn on_state_changed(&self, snapshot: &CallSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }

    fn on_device_error(&self, kind: MediaKind, error: &CaptureError) {
        self.errors.lock().push((kind, error.clone()));
    }

    fn on_call_ended(&self) {
        *self.ended.lock() += 1;
    }
}

pub struct Harness {
    pub platform: VirtualPlatform,
    pub session: Arc<CallSession>,
    pub local: Arc<HeadlessSurface>,
    pub meter: Arc<MeterDisplay>,
    pub delegate: Arc<RecordingDelegate>,
}

impl Harness {
    pub fn new(platform: VirtualPlatform) -> Self {
        Self::with_config(platform, SessionConfiguration::default())
    }

    pub fn with_config(platform: VirtualPlatform, config: SessionConfiguration) -> Self {
        let local = platform.surface("local");
        let meter = Arc::new(MeterDisplay::new());
        let delegate = Arc::new(RecordingDelegate::default());
        let session = CallSession::new(
            Arc::new(platform.clone()),
            config,
            SessionSurfaces {
                video: Some(local.clone()),
                level: Some(meter.clone()),
            },
            Some(delegate.clone()),
        )
        .expect("valid configuration");

        Self {
            platform,
            session,
            local,
            meter,
            delegate,
        }
    }

    /// Connect and let the grace period run out.
    pub async fn connect_active(&self) {
        self.session.connect().await;
        tokio::time::sleep(GRACE + Duration::from_millis(10)).await;
    }
}
