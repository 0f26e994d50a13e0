use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::config::{RetryPolicy, SessionConfiguration};
use crate::models::device::{CaptureDevice, DeviceChoices, DeviceSelection, MediaKind};
use crate::models::error::CaptureError;
use crate::models::state::Availability;
use crate::session::acquirer::StreamAcquirer;
use crate::session::call::SessionSurfaces;
use crate::session::level_meter::AudioLevelMeter;
use crate::session::preview::PreviewSink;
use crate::session::registry::DeviceRegistry;
use crate::session::slot::RoleSlot;
use crate::traits::capture_platform::CapturePlatform;

/// Disposable preview session backing the device picker.
///
/// Owns its own handles for both roles and never touches the live call's.
/// Nothing leaves this session except the chosen ids returned by `confirm()`.
pub struct DeviceSettingsSession {
    registry: DeviceRegistry,
    retry: RetryPolicy,
    video: RoleSlot,
    audio: RoleSlot,
    choices: Mutex<DeviceChoices>,
    closed: AtomicBool,
}

impl DeviceSettingsSession {
    /// `current` is the live call's selection, used as the initial choice.
    pub fn new(
        platform: Arc<dyn CapturePlatform>,
        config: &SessionConfiguration,
        surfaces: SessionSurfaces,
        current: DeviceSelection,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let acquirer = StreamAcquirer::new(Arc::clone(&platform));
        Ok(Self {
            registry: DeviceRegistry::new(platform),
            retry: config.busy_retry,
            video: RoleSlot::new(
                MediaKind::Video,
                acquirer.clone(),
                PreviewSink::new(surfaces.video),
                None,
            ),
            audio: RoleSlot::new(
                MediaKind::Audio,
                acquirer,
                PreviewSink::new(None),
                Some(AudioLevelMeter::new(config, surfaces.level)),
            ),
            choices: Mutex::new(DeviceChoices {
                selected: current,
                ..Default::default()
            }),
            closed: AtomicBool::new(false),
        })
    }

    /// Enumerate devices and start previews for the initial choices.
    ///
    /// A refused permission prompt is not fatal: enumeration still runs and
    /// unlabeled devices get generic names.
    pub async fn open(&self) -> Result<DeviceChoices, CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::SessionClosed);
        }

        if let Err(e) = self.registry.request_permission(&MediaKind::ALL).await {
            log::warn!("Device permission not granted: {}", e);
        }
        let devices = self.registry.list().await?;

        let initial = {
            let mut choices = self.choices.lock();
            let (video, audio): (Vec<CaptureDevice>, Vec<CaptureDevice>) =
                devices.into_iter().partition(|d| d.kind == MediaKind::Video);
            choices.video_devices = video;
            choices.audio_devices = audio;
            for kind in MediaKind::ALL {
                let chosen = initial_choice(choices.selected.get(kind), choices.devices(kind));
                choices.selected.set(kind, chosen);
            }
            choices.selected.clone()
        };

        let (video, audio) = tokio::join!(
            self.preview(MediaKind::Video, initial.video),
            self.preview(MediaKind::Audio, initial.audio),
        );
        if self.is_closed() {
            return Err(CaptureError::SessionClosed);
        }
        for (kind, result) in [(MediaKind::Video, video), (MediaKind::Audio, audio)] {
            if let Err(e) = result {
                log::warn!("{} preview unavailable: {}", kind, e);
            }
        }

        Ok(self.choices())
    }

    /// Switch the preview for `kind` to `device_id`. Local to this session.
    ///
    /// The choice is recorded even when the preview fails to open.
    pub async fn select_device(
        &self,
        kind: MediaKind,
        device_id: &str,
    ) -> Result<(), CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::SessionClosed);
        }
        self.choices.lock().selected.set(kind, Some(device_id.to_string()));
        self.preview(kind, Some(device_id.to_string())).await
    }

    /// Release every preview handle and hand back the chosen ids.
    pub fn confirm(&self) -> DeviceSelection {
        let selection = self.selected();
        self.close();
        selection
    }

    pub fn cancel(&self) {
        self.close();
    }

    /// Release every preview handle. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.video.dispose();
        self.audio.dispose();
        log::debug!("Device settings closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn choices(&self) -> DeviceChoices {
        self.choices.lock().clone()
    }

    pub fn selected(&self) -> DeviceSelection {
        self.choices.lock().selected.clone()
    }

    pub fn availability(&self, kind: MediaKind) -> Availability {
        self.slot(kind).availability()
    }

    /// Device currently shown in the preview for `kind`.
    pub fn previewed_device(&self, kind: MediaKind) -> Option<String> {
        self.slot(kind).current_device()
    }

    pub fn open_handle(&self, kind: MediaKind) -> Option<Uuid> {
        self.slot(kind).open_handle()
    }

    /// Microphone preview level in [0, 1].
    pub fn level(&self) -> f32 {
        self.audio.level()
    }

    async fn preview(
        &self,
        kind: MediaKind,
        device_id: Option<String>,
    ) -> Result<(), CaptureError> {
        let slot = self.slot(kind);
        let Some(device_id) = device_id else {
            slot.mark_unavailable(CaptureError::DeviceNotFound);
            return Err(CaptureError::DeviceNotFound);
        };

        slot.replace(Some(&device_id), &self.retry).await?;
        if slot.kind() == MediaKind::Audio {
            // The meter needs live samples; previews are never muted.
            slot.set_enabled(true);
        }
        Ok(())
    }

    fn slot(&self, kind: MediaKind) -> &RoleSlot {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }
}

impl Drop for DeviceSettingsSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// The current device if it is still attached, else the first one listed.
fn initial_choice(current: Option<&str>, devices: &[CaptureDevice]) -> Option<String> {
    current
        .filter(|id| devices.iter().any(|d| d.id == *id))
        .or_else(|| devices.first().map(|d| d.id.as_str()))
        .map(str::to_owned)
}
