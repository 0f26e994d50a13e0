use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::models::config::SessionConfiguration;
use crate::models::device::{DeviceChoices, DeviceSelection, MediaKind};
use crate::models::error::CaptureError;
use crate::models::state::{Availability, CallSnapshot, CallState, DegradedBanner};
use crate::session::acquirer::StreamAcquirer;
use crate::session::level_meter::AudioLevelMeter;
use crate::session::preview::PreviewSink;
use crate::session::settings::DeviceSettingsSession;
use crate::session::slot::RoleSlot;
use crate::traits::capture_platform::CapturePlatform;
use crate::traits::session_delegate::SessionDelegate;
use crate::traits::surface::{LevelSink, VideoSurface};

/// How often a live call checks that its devices are still delivering.
const DEVICE_WATCH_INTERVAL: Duration = Duration::from_millis(250);

/// Rendering targets supplied by the UI for one session.
///
/// Surfaces and sinks are called with no session state locked, so they may
/// read the session back (for example through `snapshot()`).
#[derive(Clone, Default)]
pub struct SessionSurfaces {
    pub video: Option<Arc<dyn VideoSurface>>,
    pub level: Option<Arc<dyn LevelSink>>,
}

struct CallInner {
    state: CallState,
    muted: bool,
    connected: bool,
}

/// Live call controller.
///
/// Owns the production handles for both roles, runs the
/// connecting → active → ended state machine, and keeps the microphone
/// track's enabled flag equal to `active && !muted && audio healthy`.
///
/// ```text
/// [Camera slot] → PreviewSink → local video surface
/// [Mic slot]    → AudioLevelMeter → level sink
///                 └→ enabled = active && !muted && healthy
/// ```
///
/// A failing role degrades on its own: it is marked unavailable, the
/// delegate is told, and the call carries on with the other role. A device
/// that disappears mid-call is picked up by the device watch and degrades
/// the same way.
pub struct CallSession {
    config: SessionConfiguration,
    platform: Arc<dyn CapturePlatform>,
    video: RoleSlot,
    audio: RoleSlot,
    call: Mutex<CallInner>,
    grace_timer: Mutex<Option<JoinHandle<()>>>,
    device_watch: Mutex<Option<JoinHandle<()>>>,
    settings: Mutex<Option<Arc<DeviceSettingsSession>>>,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl CallSession {
    pub fn new(
        platform: Arc<dyn CapturePlatform>,
        config: SessionConfiguration,
        surfaces: SessionSurfaces,
        delegate: Option<Arc<dyn SessionDelegate>>,
    ) -> Result<Arc<Self>, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let acquirer = StreamAcquirer::new(Arc::clone(&platform));
        let video = RoleSlot::new(
            MediaKind::Video,
            acquirer.clone(),
            PreviewSink::new(surfaces.video),
            None,
        );
        let audio = RoleSlot::new(
            MediaKind::Audio,
            acquirer,
            PreviewSink::new(None),
            Some(AudioLevelMeter::new(&config, surfaces.level)),
        );

        Ok(Arc::new(Self {
            config,
            platform,
            video,
            audio,
            call: Mutex::new(CallInner {
                state: CallState::Connecting,
                muted: true,
                connected: false,
            }),
            grace_timer: Mutex::new(None),
            device_watch: Mutex::new(None),
            settings: Mutex::new(None),
            delegate,
        }))
    }

    /// Enter Connecting: arm the grace timer and open both roles independently.
    ///
    /// Either role may fail; the call still becomes Active on schedule.
    /// Calling this more than once has no effect.
    pub async fn connect(self: &Arc<Self>) -> CallSnapshot {
        {
            let mut call = self.call.lock();
            if call.connected || call.state.is_terminal() {
                drop(call);
                return self.snapshot();
            }
            call.connected = true;
        }

        log::info!("Call connecting, grace period {:?}", self.config.grace_period());
        self.start_grace_timer();
        self.start_device_watch();

        let (video, audio) = tokio::join!(
            self.acquire_role(MediaKind::Video, self.config.initial_device(MediaKind::Video)),
            self.acquire_role(MediaKind::Audio, self.config.initial_device(MediaKind::Audio)),
        );
        log::debug!("Initial acquisition: video {:?}, audio {:?}", video, audio);

        self.snapshot()
    }

    /// Flip the mute flag. No-op unless the call is Active with healthy audio.
    ///
    /// Returns the mute state after the call.
    pub fn toggle_mute(&self) -> bool {
        let muted = {
            let mut call = self.call.lock();
            if !call.state.is_started() || !self.audio.availability().is_healthy() {
                log::debug!("Mute toggle ignored in {:?}", call.state);
                return call.muted;
            }
            call.muted = !call.muted;
            Self::sync_audio_locked(&call, &self.audio);
            call.muted
        };
        self.emit_state();
        muted
    }

    /// Replace the device for `kind` without interrupting the call.
    ///
    /// The old handle is released before the new one is requested. On failure
    /// the role is marked unavailable and the error returned; the call and the
    /// other role are untouched.
    pub async fn switch_device(
        &self,
        kind: MediaKind,
        device_id: &str,
    ) -> Result<(), CaptureError> {
        if self.state().is_terminal() {
            return Err(CaptureError::SessionClosed);
        }
        log::info!("Switching {} to {}", kind, device_id);
        self.acquire_role(kind, Some(device_id)).await
    }

    /// Release everything, enter Ended and fire the call-ended hook.
    ///
    /// Reachable from any state; repeated calls are no-ops.
    pub fn end_call(&self) {
        {
            let mut call = self.call.lock();
            if call.state.is_terminal() {
                return;
            }
            call.state = CallState::Ended;
        }

        self.teardown();
        log::info!("Call ended");
        self.emit_state();
        if let Some(delegate) = &self.delegate {
            delegate.on_call_ended();
        }
    }

    /// Open the device picker with a fresh preview session.
    ///
    /// A picker that is already open is closed first.
    pub async fn open_settings(
        &self,
        surfaces: SessionSurfaces,
    ) -> Result<DeviceChoices, CaptureError> {
        if self.state().is_terminal() {
            return Err(CaptureError::SessionClosed);
        }
        let session = Arc::new(DeviceSettingsSession::new(
            Arc::clone(&self.platform),
            &self.config,
            surfaces,
            self.current_selection(),
        )?);
        if let Some(previous) = self.settings.lock().replace(Arc::clone(&session)) {
            previous.close();
        }
        session.open().await
    }

    /// The open picker session, for `select_device` and preview levels.
    pub fn settings(&self) -> Option<Arc<DeviceSettingsSession>> {
        self.settings.lock().clone()
    }

    /// Close the picker and apply its choices to the live call, video first.
    ///
    /// Preview handles are released before the call reopens any device, so a
    /// camera held exclusively by the preview is free by then. Per-role
    /// failures degrade that role only and are not returned.
    pub async fn confirm_settings(&self) -> Result<DeviceSelection, CaptureError> {
        let session = self.settings.lock().take().ok_or(CaptureError::SessionClosed)?;
        let selection = session.confirm();

        for kind in MediaKind::ALL {
            if let Some(device_id) = selection.get(kind) {
                if let Err(e) = self.switch_device(kind, device_id).await {
                    log::warn!("Could not apply {} choice {}: {}", kind, device_id, e);
                }
            }
        }
        Ok(selection)
    }

    /// Close the picker. The live call is left exactly as it was.
    pub fn cancel_settings(&self) {
        if let Some(session) = self.settings.lock().take() {
            session.cancel();
        }
    }

    pub fn snapshot(&self) -> CallSnapshot {
        let (state, muted) = {
            let call = self.call.lock();
            (call.state, call.muted)
        };
        let video = self.video.availability();
        let audio = self.audio.availability();

        CallSnapshot {
            call_state: state,
            video_available: video.is_healthy(),
            audio_available: audio.is_healthy(),
            muted,
            mute_control_enabled: state.is_started() && audio.is_healthy(),
            level: self.audio.level(),
            banner: DegradedBanner::from_availability(&video, &audio),
            video_device_id: self.video.current_device(),
            audio_device_id: self.audio.current_device(),
        }
    }

    pub fn state(&self) -> CallState {
        self.call.lock().state
    }

    pub fn is_muted(&self) -> bool {
        self.call.lock().muted
    }

    pub fn availability(&self, kind: MediaKind) -> Availability {
        self.slot(kind).availability()
    }

    /// Device the live call is using for `kind`.
    pub fn current_device(&self, kind: MediaKind) -> Option<String> {
        self.slot(kind).current_device()
    }

    pub fn current_selection(&self) -> DeviceSelection {
        DeviceSelection {
            video: self.video.current_device(),
            audio: self.audio.current_device(),
        }
    }

    /// Id of the open handle for `kind`, if any.
    pub fn open_handle(&self, kind: MediaKind) -> Option<Uuid> {
        self.slot(kind).open_handle()
    }

    /// Whether the microphone track is currently transmitting.
    pub fn is_audio_enabled(&self) -> bool {
        self.audio.is_enabled()
    }

    pub fn level(&self) -> f32 {
        self.audio.level()
    }

    async fn acquire_role(
        &self,
        kind: MediaKind,
        device_id: Option<&str>,
    ) -> Result<(), CaptureError> {
        let slot = self.slot(kind);
        match slot.replace(device_id, &self.config.busy_retry).await {
            Ok(()) => {
                self.sync_audio();
                self.emit_state();
                Ok(())
            }
            Err(CaptureError::SessionClosed) => {
                log::debug!("{} acquisition abandoned, session torn down", kind);
                Err(CaptureError::SessionClosed)
            }
            Err(e) => {
                self.role_failed(kind, &e);
                Err(e)
            }
        }
    }

    fn role_failed(&self, kind: MediaKind, error: &CaptureError) {
        match error {
            CaptureError::Unknown(_) => log::error!("{} capture failed: {}", kind, error),
            e if e.is_recoverable() => log::warn!("{} capture unavailable: {}", kind, error),
            _ => log::warn!("{} capture blocked until permission is granted", kind),
        }
        if kind == MediaKind::Audio {
            let mut call = self.call.lock();
            call.muted = true;
            Self::sync_audio_locked(&call, &self.audio);
        }
        if let Some(delegate) = &self.delegate {
            delegate.on_device_error(kind, error);
        }
        self.emit_state();
    }

    fn start_grace_timer(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let grace = self.config.grace_period();
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(session) = weak.upgrade() {
                session.activate();
            }
        });
        if let Some(previous) = self.grace_timer.lock().replace(task) {
            previous.abort();
        }
    }

    fn start_device_watch(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(DEVICE_WATCH_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(session) => session.check_devices(),
                    None => break,
                }
            }
        });
        if let Some(previous) = self.device_watch.lock().replace(task) {
            previous.abort();
        }
    }

    /// Degrade every role whose bound device stopped delivering.
    fn check_devices(&self) {
        if self.state().is_terminal() {
            return;
        }
        for kind in MediaKind::ALL {
            if let Some(error) = self.slot(kind).check_health() {
                self.role_failed(kind, &error);
            }
        }
    }

    /// Grace period elapsed: Connecting → Active, unmuting if audio is healthy.
    fn activate(&self) {
        {
            let mut call = self.call.lock();
            if !call.state.is_connecting() {
                return;
            }
            call.state = CallState::Active;
            if self.audio.availability().is_healthy() {
                call.muted = false;
            }
            Self::sync_audio_locked(&call, &self.audio);
            log::info!("Call active, muted: {}", call.muted);
        }
        self.emit_state();
    }

    fn sync_audio(&self) {
        let call = self.call.lock();
        Self::sync_audio_locked(&call, &self.audio);
    }

    fn sync_audio_locked(call: &CallInner, audio: &RoleSlot) {
        let enabled =
            call.state.is_started() && !call.muted && audio.availability().is_healthy();
        audio.set_enabled(enabled);
    }

    fn teardown(&self) {
        if let Some(timer) = self.grace_timer.lock().take() {
            timer.abort();
        }
        if let Some(watch) = self.device_watch.lock().take() {
            watch.abort();
        }
        if let Some(session) = self.settings.lock().take() {
            session.close();
        }
        self.video.dispose();
        self.audio.dispose();
    }

    fn emit_state(&self) {
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(&self.snapshot());
        }
    }

    fn slot(&self, kind: MediaKind) -> &RoleSlot {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        if !self.video.is_disposed() || !self.audio.is_disposed() {
            self.teardown();
        }
    }
}
