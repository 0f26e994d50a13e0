use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use media_session_core::models::device::{CaptureDevice, MediaKind, StreamConstraints};
use media_session_core::models::error::CaptureError;
use media_session_core::traits::capture_platform::{CapturePlatform, MediaTrack};

use crate::devices::{default_devices, DeviceCatalog, VirtualDevice};
use crate::events::{EventLog, PlatformEvent};
use crate::permissions::{PermissionState, Permissions};
use crate::surfaces::HeadlessSurface;
use crate::track::VirtualTrack;

struct PlatformState {
    catalog: DeviceCatalog,
    permissions: Permissions,
    exclusive: bool,
    open_delay: Duration,
    device_failures: HashMap<String, CaptureError>,
    kind_failures: HashMap<MediaKind, CaptureError>,
    busy: HashMap<String, u32>,
    live: Vec<Arc<VirtualTrack>>,
    next_track: u64,
    open_calls: u64,
}

/// In-process capture platform with synthetic devices.
///
/// Behaves like a browser media stack for the purposes of the session core:
/// permission prompts, hidden labels before consent, exact device ids, open
/// latency and failure injection. In exclusive mode a device with a live
/// track refuses a second open with `HardwareBusy`, like most webcams.
///
/// Cloning shares the same devices, tracks and event log.
#[derive(Clone)]
pub struct VirtualPlatform {
    state: Arc<Mutex<PlatformState>>,
    events: EventLog,
}

impl VirtualPlatform {
    /// Platform with the default two cameras and two microphones.
    pub fn new() -> Self {
        Self::with_devices(default_devices())
    }

    pub fn with_devices(devices: Vec<VirtualDevice>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlatformState {
                catalog: DeviceCatalog::new(devices),
                permissions: Permissions::default(),
                exclusive: false,
                open_delay: Duration::ZERO,
                device_failures: HashMap::new(),
                kind_failures: HashMap::new(),
                busy: HashMap::new(),
                live: Vec::new(),
                next_track: 0,
                open_calls: 0,
            })),
            events: EventLog::new(),
        }
    }

    /// Refuse a second open of a device that already has a live track.
    pub fn set_exclusive(&self, exclusive: bool) {
        self.state.lock().exclusive = exclusive;
    }

    /// Latency applied to every `open_stream` before it resolves.
    pub fn set_open_delay(&self, delay: Duration) {
        self.state.lock().open_delay = delay;
    }

    pub fn permission(&self, kind: MediaKind) -> PermissionState {
        self.state.lock().permissions.state(kind)
    }

    pub fn deny_permission(&self, kind: MediaKind) {
        self.state.lock().permissions.set(kind, PermissionState::Denied);
    }

    pub fn grant_permission(&self, kind: MediaKind) {
        self.state.lock().permissions.set(kind, PermissionState::Granted);
    }

    /// Every open of `device_id` fails with `error` until cleared.
    pub fn fail_device(&self, device_id: &str, error: CaptureError) {
        self.state.lock().device_failures.insert(device_id.to_string(), error);
    }

    /// Every open of `kind` fails with `error` until cleared.
    pub fn fail_kind(&self, kind: MediaKind, error: CaptureError) {
        self.state.lock().kind_failures.insert(kind, error);
    }

    /// The next `attempts` opens of `device_id` report `HardwareBusy`.
    pub fn busy_for(&self, device_id: &str, attempts: u32) {
        self.state.lock().busy.insert(device_id.to_string(), attempts);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.device_failures.clear();
        state.kind_failures.clear();
        state.busy.clear();
    }

    pub fn plug(&self, device: VirtualDevice) {
        log::info!("Virtual device plugged: {} ({})", device.id, device.label);
        self.state.lock().catalog.plug(device);
    }

    /// Remove a device. Its live tracks end as if the cable was pulled.
    pub fn unplug(&self, device_id: &str) {
        let mut state = self.state.lock();
        if state.catalog.unplug(device_id).is_none() {
            return;
        }
        log::info!("Virtual device unplugged: {}", device_id);
        for track in state.live.iter().filter(|t| t.device_id() == device_id) {
            track.end();
        }
        state.live.retain(|t| t.is_live());
    }

    pub fn events(&self) -> EventLog {
        self.events.clone()
    }

    /// A headless video surface writing into this platform's event log.
    pub fn surface(&self, name: &str) -> Arc<HeadlessSurface> {
        Arc::new(HeadlessSurface::new(name, self.events.clone()))
    }

    /// Number of live tracks, optionally of one kind.
    pub fn live_track_count(&self, kind: Option<MediaKind>) -> usize {
        self.state
            .lock()
            .live
            .iter()
            .filter(|t| t.is_live() && kind.map_or(true, |k| t.kind() == k))
            .count()
    }

    /// Device ids with a live track, in open order.
    pub fn live_devices(&self) -> Vec<String> {
        self.state
            .lock()
            .live
            .iter()
            .filter(|t| t.is_live())
            .map(|t| t.device_id().to_string())
            .collect()
    }

    /// Total `open_stream` calls, including failed ones.
    pub fn open_calls(&self) -> u64 {
        self.state.lock().open_calls
    }

    fn try_open(&self, constraints: &StreamConstraints) -> Result<Arc<VirtualTrack>, CaptureError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let granted = state.permissions.request(constraints.kind);
        self.events.record(PlatformEvent::PermissionRequested {
            kind: constraints.kind,
            granted: granted.is_ok(),
        });
        granted?;

        if let Some(error) = state.kind_failures.get(&constraints.kind) {
            return Err(error.clone());
        }

        let device = match constraints.device_id.as_deref() {
            Some(id) => state.catalog.find(id).filter(|d| d.kind == constraints.kind),
            None => state.catalog.default_for(constraints.kind),
        }
        .ok_or(CaptureError::DeviceNotFound)?
        .clone();

        if let Some(error) = state.device_failures.get(&device.id) {
            return Err(error.clone());
        }
        if let Some(remaining) = state.busy.get_mut(&device.id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CaptureError::HardwareBusy);
            }
        }

        state.live.retain(|t| t.is_live());
        if state.exclusive && state.live.iter().any(|t| t.device_id() == device.id) {
            return Err(CaptureError::HardwareBusy);
        }

        state.next_track += 1;
        let track = Arc::new(VirtualTrack::open(
            format!("{}-track-{}", device.id, state.next_track),
            &device,
            self.events.clone(),
        ));
        state.live.push(Arc::clone(&track));
        Ok(track)
    }
}

impl Default for VirtualPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapturePlatform for VirtualPlatform {
    async fn request_permission(&self, kinds: &[MediaKind]) -> Result<(), CaptureError> {
        let mut denied = false;
        {
            let mut state = self.state.lock();
            for &kind in kinds {
                let granted = state.permissions.request(kind).is_ok();
                denied |= !granted;
                self.events.record(PlatformEvent::PermissionRequested { kind, granted });
            }
        }
        if denied {
            Err(CaptureError::PermissionDenied)
        } else {
            Ok(())
        }
    }

    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, CaptureError> {
        let state = self.state.lock();
        Ok(state
            .catalog
            .iter()
            .map(|d| d.describe(state.permissions.is_granted(d.kind)))
            .collect())
    }

    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, CaptureError> {
        let delay = {
            let mut state = self.state.lock();
            state.open_calls += 1;
            state.open_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.try_open(constraints) {
            Ok(track) => {
                log::debug!("Opened {} on {}", track.id(), track.device_id());
                Ok(vec![track as Arc<dyn MediaTrack>])
            }
            Err(error) => {
                log::debug!(
                    "Open {} {:?} failed: {}",
                    constraints.kind,
                    constraints.device_id,
                    error
                );
                self.events.record(PlatformEvent::OpenFailed {
                    device_id: constraints.device_id.clone(),
                    kind: constraints.kind,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(kind: MediaKind, device: Option<&str>) -> StreamConstraints {
        StreamConstraints::new(kind, device)
    }

    #[tokio::test]
    async fn labels_appear_after_permission() {
        let platform = VirtualPlatform::new();
        let before = platform.enumerate_devices().await.unwrap();
        assert!(before.iter().all(|d| d.label.is_empty()));

        platform.request_permission(&MediaKind::ALL).await.unwrap();
        let after = platform.enumerate_devices().await.unwrap();
        assert!(after.iter().all(|d| !d.label.is_empty()));
    }

    #[tokio::test]
    async fn denied_permission_blocks_open_of_that_kind_only() {
        let platform = VirtualPlatform::new();
        platform.deny_permission(MediaKind::Audio);

        assert_eq!(
            platform.request_permission(&MediaKind::ALL).await.err(),
            Some(CaptureError::PermissionDenied)
        );
        assert_eq!(
            platform.open_stream(&constraints(MediaKind::Audio, None)).await.err(),
            Some(CaptureError::PermissionDenied)
        );
        assert!(platform.open_stream(&constraints(MediaKind::Video, None)).await.is_ok());
    }

    #[tokio::test]
    async fn exact_device_ids_and_kind_mismatch() {
        let platform = VirtualPlatform::new();
        let tracks = platform
            .open_stream(&constraints(MediaKind::Video, Some("cam-b")))
            .await
            .unwrap();
        assert_eq!(tracks[0].device_id(), "cam-b");

        assert_eq!(
            platform
                .open_stream(&constraints(MediaKind::Video, Some("mic-a")))
                .await
                .err(),
            Some(CaptureError::DeviceNotFound)
        );
        assert_eq!(
            platform
                .open_stream(&constraints(MediaKind::Video, Some("cam-z")))
                .await
                .err(),
            Some(CaptureError::DeviceNotFound)
        );
    }

    #[tokio::test]
    async fn exclusive_mode_reports_busy_until_stopped() {
        let platform = VirtualPlatform::new();
        platform.set_exclusive(true);

        let first = platform
            .open_stream(&constraints(MediaKind::Video, Some("cam-a")))
            .await
            .unwrap();
        assert_eq!(
            platform
                .open_stream(&constraints(MediaKind::Video, Some("cam-a")))
                .await
                .err(),
            Some(CaptureError::HardwareBusy)
        );

        first[0].stop();
        assert!(platform
            .open_stream(&constraints(MediaKind::Video, Some("cam-a")))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn busy_for_counts_down() {
        let platform = VirtualPlatform::new();
        platform.busy_for("mic-a", 2);
        let mic = constraints(MediaKind::Audio, Some("mic-a"));

        assert_eq!(platform.open_stream(&mic).await.err(), Some(CaptureError::HardwareBusy));
        assert_eq!(platform.open_stream(&mic).await.err(), Some(CaptureError::HardwareBusy));
        assert!(platform.open_stream(&mic).await.is_ok());
        assert_eq!(platform.open_calls(), 3);
    }

    #[tokio::test]
    async fn unplug_ends_live_tracks() {
        let platform = VirtualPlatform::new();
        let tracks = platform
            .open_stream(&constraints(MediaKind::Video, Some("cam-a")))
            .await
            .unwrap();
        assert_eq!(platform.live_track_count(Some(MediaKind::Video)), 1);

        platform.unplug("cam-a");

        assert!(!tracks[0].is_live());
        assert_eq!(platform.live_track_count(None), 0);
        let listed = platform.enumerate_devices().await.unwrap();
        assert!(listed.iter().all(|d| d.id != "cam-a"));
    }

    #[tokio::test(start_paused = true)]
    async fn open_delay_is_applied() {
        let platform = VirtualPlatform::new();
        platform.set_open_delay(Duration::from_millis(300));

        let start = tokio::time::Instant::now();
        platform.open_stream(&constraints(MediaKind::Audio, None)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
