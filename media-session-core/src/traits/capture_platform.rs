use std::sync::Arc;

use async_trait::async_trait;

use crate::models::device::{CaptureDevice, MediaKind, StreamConstraints};
use crate::models::error::CaptureError;

/// A single decoded video frame (RGB24, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// A native media track opened by the platform.
///
/// Tracks are shared (`Arc`) between the owning `CaptureHandle` and whatever
/// surface or meter currently reads from it; only the handle ever stops them.
pub trait MediaTrack: Send + Sync {
    /// Platform-unique track id.
    fn id(&self) -> &str;

    fn kind(&self) -> MediaKind;

    /// The device the platform actually opened for this track.
    fn device_id(&self) -> &str;

    fn label(&self) -> &str;

    /// Disabled tracks stay open but deliver silence / black frames.
    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    /// False once stopped, or once the hardware went away.
    fn is_live(&self) -> bool;

    /// Stop the track and release the hardware. Idempotent.
    fn stop(&self);

    /// Fill `out` with the most recent mono samples in [-1, 1].
    ///
    /// Returns the number of samples written. Video tracks write nothing.
    fn read_samples(&self, out: &mut [f32]) -> usize {
        let _ = out;
        0
    }

    /// Latest frame of a live video track.
    fn frame(&self) -> Option<VideoFrame> {
        None
    }
}

/// Capability platform: permission negotiation, enumeration, stream opening.
///
/// Implemented by:
/// - `VirtualPlatform` (media-session-virtual)
/// - Future: native camera/microphone backends
#[async_trait]
pub trait CapturePlatform: Send + Sync {
    /// Ask the user for access to device metadata of the given kinds.
    async fn request_permission(&self, kinds: &[MediaKind]) -> Result<(), CaptureError>;

    /// List capture devices. Labels may be empty until permission is granted.
    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, CaptureError>;

    /// Open tracks for one role. Device ids in the constraints are exact.
    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, CaptureError>;
}
