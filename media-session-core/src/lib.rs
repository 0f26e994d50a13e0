//! # media-session-core
//!
//! Platform-agnostic media session core for a video-call client.
//!
//! Acquires camera and microphone capture per role, renders live previews,
//! meters microphone level, runs the call lifecycle and lets the user swap
//! devices mid-call without leaking hardware handles. Platform backends
//! implement the `CapturePlatform` trait and plug into `CallSession`.
//!
//! ## Architecture
//!
//! ```text
//! media-session-core (this crate)
//! ├── traits/       ← CapturePlatform, MediaTrack, VideoSurface, LevelSink, SessionDelegate
//! ├── models/       ← CaptureError, CallState, Availability, SessionConfiguration, devices
//! ├── processing/   ← FrequencyAnalyser, level color ramp
//! └── session/      ← CallSession, DeviceSettingsSession, StreamAcquirer, DeviceRegistry,
//!                     CaptureHandle, PreviewSink, AudioLevelMeter
//! ```
//!
//! ## Usage
//! ```ignore
//! let config = SessionConfiguration::default();
//! let session = CallSession::new(platform, config, surfaces, Some(delegate))?;
//! session.connect().await;
//! session.switch_device(MediaKind::Video, "cam-b").await?;
//! session.end_call();
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{RetryPolicy, SessionConfiguration};
pub use models::device::{
    CaptureDevice, DeviceChoices, DeviceSelection, MediaKind, StreamConstraints,
};
pub use models::error::CaptureError;
pub use models::state::{Availability, CallSnapshot, CallState, DegradedBanner};
pub use processing::level_color::{level_color, Rgb};
pub use processing::spectrum::FrequencyAnalyser;
pub use session::acquirer::StreamAcquirer;
pub use session::call::{CallSession, SessionSurfaces};
pub use session::capture_handle::CaptureHandle;
pub use session::level_meter::AudioLevelMeter;
pub use session::preview::PreviewSink;
pub use session::registry::DeviceRegistry;
pub use session::settings::DeviceSettingsSession;
pub use traits::capture_platform::{CapturePlatform, MediaTrack, VideoFrame};
pub use traits::session_delegate::SessionDelegate;
pub use traits::surface::{LevelSink, VideoSurface};
