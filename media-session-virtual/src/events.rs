//! Ordered record of everything the virtual platform and its surfaces did.
//!
//! Scenario tests read this log to assert hardware ordering, e.g. that the
//! old camera stopped before the new one was attached.

use std::sync::Arc;

use parking_lot::Mutex;

use media_session_core::models::device::MediaKind;
use media_session_core::models::error::CaptureError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    PermissionRequested {
        kind: MediaKind,
        granted: bool,
    },
    Opened {
        track_id: String,
        device_id: String,
        kind: MediaKind,
    },
    OpenFailed {
        device_id: Option<String>,
        kind: MediaKind,
        error: CaptureError,
    },
    /// Track stopped by its owner.
    Stopped {
        track_id: String,
        device_id: String,
    },
    /// Track ended because its device was unplugged.
    Ended {
        track_id: String,
        device_id: String,
    },
    Attached {
        surface: String,
        device_id: String,
    },
    Detached {
        surface: String,
    },
}

/// Shared, append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<Vec<PlatformEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: PlatformEvent) {
        log::trace!("platform event: {:?}", event);
        self.inner.lock().push(event);
    }

    pub fn snapshot(&self) -> Vec<PlatformEvent> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Index of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&PlatformEvent) -> bool) -> Option<usize> {
        self.inner.lock().iter().position(pred)
    }

    /// Number of events matching `pred`.
    pub fn count(&self, pred: impl Fn(&PlatformEvent) -> bool) -> usize {
        self.inner.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Index of the `Stopped` event for the first track opened on `device_id`.
    pub fn stopped_at(&self, device_id: &str) -> Option<usize> {
        self.position(
            |e| matches!(e, PlatformEvent::Stopped { device_id: d, .. } if d == device_id),
        )
    }

    /// Index of the first `Attached` event showing `device_id`.
    pub fn attached_at(&self, device_id: &str) -> Option<usize> {
        self.position(
            |e| matches!(e, PlatformEvent::Attached { device_id: d, .. } if d == device_id),
        )
    }

    /// Index of the first `Opened` event for `device_id`.
    pub fn opened_at(&self, device_id: &str) -> Option<usize> {
        self.position(|e| matches!(e, PlatformEvent::Opened { device_id: d, .. } if d == device_id))
    }
}
