use std::sync::Arc;

use uuid::Uuid;

use crate::models::device::MediaKind;
use crate::models::error::CaptureError;
use crate::session::capture_handle::CaptureHandle;
use crate::traits::surface::VideoSurface;

/// Binds a capture handle to a rendering surface.
///
/// Video handles are attached to the surface; audio handles bind to nothing
/// here (the level meter consumes them). `unbind()` must run before the bound
/// handle is released.
pub struct PreviewSink {
    surface: Option<Arc<dyn VideoSurface>>,
    bound: Option<(Uuid, MediaKind)>,
}

impl PreviewSink {
    pub fn new(surface: Option<Arc<dyn VideoSurface>>) -> Self {
        Self { surface, bound: None }
    }

    pub fn bind(&mut self, handle: &CaptureHandle) -> Result<(), CaptureError> {
        if !handle.is_open() {
            return Err(CaptureError::DeviceUnavailable);
        }
        self.unbind();

        if handle.kind() == MediaKind::Video {
            if let (Some(surface), Some(track)) = (&self.surface, handle.primary_track()) {
                surface.attach(Arc::clone(track));
            }
        }
        self.bound = Some((handle.id(), handle.kind()));
        Ok(())
    }

    pub fn unbind(&mut self) {
        if let Some((_, kind)) = self.bound.take() {
            if kind == MediaKind::Video {
                if let Some(surface) = &self.surface {
                    surface.detach();
                }
            }
        }
    }

    /// Id of the handle currently bound, if any.
    pub fn bound_handle(&self) -> Option<Uuid> {
        self.bound.map(|(id, _)| id)
    }
}
