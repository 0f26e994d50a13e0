use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::config::RetryPolicy;
use crate::models::device::MediaKind;
use crate::models::error::CaptureError;
use crate::models::state::Availability;
use crate::session::acquirer::StreamAcquirer;
use crate::session::capture_handle::CaptureHandle;
use crate::session::level_meter::AudioLevelMeter;
use crate::session::preview::PreviewSink;

/// Token identifying one acquisition attempt on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Generation(u64);

struct SlotState {
    generation: u64,
    disposed: bool,
    handle: Option<CaptureHandle>,
    availability: Availability,
    current_device: Option<String>,
}

/// One (controller, role) acquisition slot.
///
/// Holds at most one open handle. Acquire/release for the slot go through a
/// single async gate, and every attempt carries a generation: results whose
/// generation is no longer current (a newer attempt started, or the slot was
/// disposed) are stopped instead of bound.
///
/// Lock order is `binding` then `state`. The generation and the bound handle
/// only change while `binding` is held. Surfaces and sinks are only called
/// with `state` released, so they may read the slot back.
pub(crate) struct RoleSlot {
    kind: MediaKind,
    acquirer: StreamAcquirer,
    gate: tokio::sync::Mutex<()>,
    binding: Mutex<PreviewSink>,
    meter: Option<AudioLevelMeter>,
    state: Mutex<SlotState>,
}

impl RoleSlot {
    pub(crate) fn new(
        kind: MediaKind,
        acquirer: StreamAcquirer,
        preview: PreviewSink,
        meter: Option<AudioLevelMeter>,
    ) -> Self {
        Self {
            kind,
            acquirer,
            gate: tokio::sync::Mutex::new(()),
            binding: Mutex::new(preview),
            meter,
            state: Mutex::new(SlotState {
                generation: 0,
                disposed: false,
                handle: None,
                availability: Availability::Healthy,
                current_device: None,
            }),
        }
    }

    pub(crate) fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Release the current handle, acquire one for `device_id` and bind it.
    ///
    /// On failure the slot is marked unavailable and the error returned; the
    /// previous device id stays recorded as current.
    pub(crate) async fn replace(
        &self,
        device_id: Option<&str>,
        retry: &RetryPolicy,
    ) -> Result<(), CaptureError> {
        let _serial = self.gate.lock().await;
        let generation = self.begin()?;

        let result = self
            .acquirer
            .acquire_with_retry(self.kind, device_id, retry, || self.is_current(generation))
            .await;

        match result {
            Ok(handle) => self.commit(generation, handle),
            Err(e) => {
                self.fail(generation, &e);
                Err(e)
            }
        }
    }

    /// Start a new attempt: bump the generation and release what is bound.
    fn begin(&self) -> Result<Generation, CaptureError> {
        let mut preview = self.binding.lock();
        let (generation, handle) = {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(CaptureError::SessionClosed);
            }
            state.generation += 1;
            (state.generation, state.handle.take())
        };
        self.release(&mut preview, handle);
        Ok(Generation(generation))
    }

    pub(crate) fn is_current(&self, generation: Generation) -> bool {
        let state = self.state.lock();
        !state.disposed && state.generation == generation.0
    }

    /// Bind `handle` if `generation` is still current, otherwise stop it.
    fn commit(&self, generation: Generation, handle: CaptureHandle) -> Result<(), CaptureError> {
        let mut preview = self.binding.lock();
        if !self.is_current(generation) {
            log::warn!(
                "Stale {} acquisition {} resolved after teardown, stopping it",
                self.kind,
                handle.id()
            );
            self.acquirer.release(handle);
            return Err(CaptureError::SessionClosed);
        }

        if let Err(e) = preview.bind(&handle) {
            return Err(self.bind_failed(handle, e));
        }
        if let Some(meter) = &self.meter {
            if let Err(e) = meter.start(&handle) {
                preview.unbind();
                return Err(self.bind_failed(handle, e));
            }
        }

        let mut state = self.state.lock();
        state.availability = Availability::Healthy;
        state.current_device = Some(handle.device_id().to_string());
        state.handle = Some(handle);
        Ok(())
    }

    fn bind_failed(&self, handle: CaptureHandle, error: CaptureError) -> CaptureError {
        self.acquirer.release(handle);
        self.state.lock().availability = Availability::Unavailable(error.clone());
        error
    }

    fn fail(&self, generation: Generation, error: &CaptureError) {
        let mut state = self.state.lock();
        if state.disposed || state.generation != generation.0 {
            return;
        }
        state.availability = Availability::Unavailable(error.clone());
    }

    /// Mark the role unusable without attempting an acquisition.
    pub(crate) fn mark_unavailable(&self, error: CaptureError) {
        let mut preview = self.binding.lock();
        let handle = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.availability = Availability::Unavailable(error);
            state.handle.take()
        };
        self.release(&mut preview, handle);
    }

    /// Release a bound handle whose device went away and mark the role
    /// unavailable. Returns the error once per lost handle.
    pub(crate) fn check_health(&self) -> Option<CaptureError> {
        let mut preview = self.binding.lock();
        let handle = {
            let mut state = self.state.lock();
            let lost = state.handle.as_ref().is_some_and(|h| !h.is_healthy());
            if state.disposed || !lost {
                return None;
            }
            state.availability = Availability::Unavailable(CaptureError::DeviceUnavailable);
            state.handle.take()
        };
        log::warn!(
            "{} device {} went away",
            self.kind,
            handle.as_ref().map_or("?", |h| h.device_id())
        );
        self.release(&mut preview, handle);
        Some(CaptureError::DeviceUnavailable)
    }

    /// Tear the slot down for good. In-flight attempts become stale.
    pub(crate) fn dispose(&self) {
        let mut preview = self.binding.lock();
        let handle = {
            let mut state = self.state.lock();
            state.disposed = true;
            state.generation += 1;
            state.handle.take()
        };
        self.release(&mut preview, handle);
    }

    /// Meter stops first, then the preview unbinds, then the handle stops.
    fn release(&self, preview: &mut PreviewSink, handle: Option<CaptureHandle>) {
        if let Some(meter) = &self.meter {
            meter.stop();
        }
        preview.unbind();
        if let Some(handle) = handle {
            self.acquirer.release(handle);
        }
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        if let Some(handle) = &self.state.lock().handle {
            handle.set_enabled(enabled);
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.state.lock().handle.as_ref().is_some_and(|h| h.is_enabled())
    }

    /// Stored availability, or `DeviceUnavailable` when the bound handle has
    /// lost all of its tracks.
    pub(crate) fn availability(&self) -> Availability {
        let state = self.state.lock();
        match &state.handle {
            Some(handle) if !handle.is_healthy() => {
                Availability::Unavailable(CaptureError::DeviceUnavailable)
            }
            _ => state.availability.clone(),
        }
    }

    pub(crate) fn current_device(&self) -> Option<String> {
        self.state.lock().current_device.clone()
    }

    pub(crate) fn open_handle(&self) -> Option<Uuid> {
        self.state
            .lock()
            .handle
            .as_ref()
            .filter(|h| h.is_open())
            .map(|h| h.id())
    }

    pub(crate) fn level(&self) -> f32 {
        self.meter.as_ref().map_or(0.0, |m| m.level())
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}
