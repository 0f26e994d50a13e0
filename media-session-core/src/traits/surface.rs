use std::sync::Arc;

use super::capture_platform::MediaTrack;

/// Assignable video sink (a `<video>`-like element).
///
/// Called with no session state locked; implementations may read the session
/// back but must not switch devices or end the call from inside a callback.
pub trait VideoSurface: Send + Sync {
    /// Start rendering from `track`, replacing any previous source.
    fn attach(&self, track: Arc<dyn MediaTrack>);

    /// Stop rendering. The surface must not read from the old track afterward.
    fn detach(&self);
}

/// Drawable surface for the audio level meter.
///
/// Called from the sampling task with no session state locked.
pub trait LevelSink: Send + Sync {
    /// Draw a normalized level in [0, 1].
    fn draw(&self, level: f32);

    /// Reset the meter when sampling stops.
    fn clear(&self) {
        self.draw(0.0);
    }
}
