//! # media-session-virtual
//!
//! Virtual capture backend for media-session-core.
//!
//! Provides:
//! - `VirtualPlatform`: `CapturePlatform` with synthetic cameras and microphones,
//!   permission prompts, open latency, exclusive hardware locks and failure injection
//! - `VirtualTrack`: sine-tone microphone / scrolling color-bar camera tracks
//! - `HeadlessSurface`, `MeterDisplay`: UI stand-ins that render on demand
//! - `EventLog`: ordered record of opens, stops, attaches and detaches
//!
//! ## Usage
//! ```ignore
//! use media_session_core::{CallSession, SessionConfiguration, SessionSurfaces};
//! use media_session_virtual::VirtualPlatform;
//!
//! let platform = VirtualPlatform::new();
//! let surfaces = SessionSurfaces { video: Some(platform.surface("local")), level: None };
//! let config = SessionConfiguration::default();
//! let session = CallSession::new(Arc::new(platform.clone()), config, surfaces, None)?;
//! session.connect().await;
//! ```

pub mod devices;
pub mod events;
pub mod pattern;
pub mod permissions;
pub mod platform;
pub mod surfaces;
pub mod tone;
pub mod track;

pub use devices::{default_devices, VirtualDevice};
pub use events::{EventLog, PlatformEvent};
pub use permissions::PermissionState;
pub use platform::VirtualPlatform;
pub use surfaces::{HeadlessSurface, MeterDisplay};
pub use track::VirtualTrack;
