use std::sync::Arc;

use crate::models::config::RetryPolicy;
use crate::models::device::{MediaKind, StreamConstraints};
use crate::models::error::CaptureError;
use crate::session::capture_handle::CaptureHandle;
use crate::traits::capture_platform::CapturePlatform;

/// Opens and releases exclusive capture handles, one role per call.
///
/// Roles are never requested together: a camera failure must not keep the
/// microphone from opening, and vice versa.
#[derive(Clone)]
pub struct StreamAcquirer {
    platform: Arc<dyn CapturePlatform>,
}

impl StreamAcquirer {
    pub fn new(platform: Arc<dyn CapturePlatform>) -> Self {
        Self { platform }
    }

    /// Open a handle for `kind`, optionally pinned to an exact device.
    ///
    /// Audio handles come back disabled; the owner decides when to enable them.
    pub async fn acquire(
        &self,
        kind: MediaKind,
        device_id: Option<&str>,
    ) -> Result<CaptureHandle, CaptureError> {
        let constraints = StreamConstraints::new(kind, device_id);
        let tracks = self.platform.open_stream(&constraints).await?;

        let (matching, stray): (Vec<_>, Vec<_>) =
            tracks.into_iter().partition(|t| t.kind() == kind);
        for track in stray {
            log::warn!(
                "Platform returned a {} track for a {} request, stopping it",
                track.kind(),
                kind
            );
            track.stop();
        }
        if matching.is_empty() {
            return Err(CaptureError::DeviceUnavailable);
        }

        let handle = CaptureHandle::new(kind, matching);
        if kind == MediaKind::Audio {
            handle.set_enabled(false);
        }
        log::debug!("Acquired {} handle {} on {}", kind, handle.id(), handle.device_id());
        Ok(handle)
    }

    /// `acquire` with bounded retries while the device reports `HardwareBusy`.
    ///
    /// `still_wanted` is checked before every retry; once it returns false the
    /// attempt is abandoned with `SessionClosed`.
    pub async fn acquire_with_retry<F>(
        &self,
        kind: MediaKind,
        device_id: Option<&str>,
        policy: &RetryPolicy,
        still_wanted: F,
    ) -> Result<CaptureHandle, CaptureError>
    where
        F: Fn() -> bool,
    {
        let mut attempt = 0;
        loop {
            match self.acquire(kind, device_id).await {
                Err(e) if e.is_transient() && attempt < policy.max_retries => {
                    attempt += 1;
                    log::debug!(
                        "{} device busy, retry {}/{} in {:?}",
                        kind,
                        attempt,
                        policy.max_retries,
                        policy.backoff()
                    );
                    tokio::time::sleep(policy.backoff()).await;
                    if !still_wanted() {
                        return Err(CaptureError::SessionClosed);
                    }
                }
                result => return result,
            }
        }
    }

    /// Stop every track of `handle`. Never fails; safe on stopped handles.
    pub fn release(&self, handle: CaptureHandle) {
        handle.stop();
    }
}
