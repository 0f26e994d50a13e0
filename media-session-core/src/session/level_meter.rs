use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::models::config::SessionConfiguration;
use crate::models::device::MediaKind;
use crate::models::error::CaptureError;
use crate::processing::spectrum::FrequencyAnalyser;
use crate::session::capture_handle::CaptureHandle;
use crate::traits::capture_platform::MediaTrack;
use crate::traits::surface::LevelSink;

struct MeterState {
    track: Option<Arc<dyn MediaTrack>>,
    analyser: FrequencyAnalyser,
    samples: Vec<f32>,
    level: f32,
    ticks: u64,
    /// Bumped by every start and stop; a sampling loop only draws for its own run.
    run: u64,
    task: Option<JoinHandle<()>>,
}

/// Outcome of one sampling tick.
enum Tick {
    Level(f32),
    TrackEnded,
    Stopped,
}

/// Samples an audio handle at a bounded rate and publishes a 0..1 level.
///
/// Track reads happen under the meter lock, and `stop()` takes the same lock
/// to drop the track reference, so once `stop()` returns no tick can touch
/// the handle. The sink is always called with the lock released.
pub struct AudioLevelMeter {
    state: Arc<Mutex<MeterState>>,
    sink: Option<Arc<dyn LevelSink>>,
    interval: Duration,
}

impl AudioLevelMeter {
    pub fn new(config: &SessionConfiguration, sink: Option<Arc<dyn LevelSink>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MeterState {
                track: None,
                analyser: FrequencyAnalyser::from_config(config),
                samples: vec![0.0; config.fft_size],
                level: 0.0,
                ticks: 0,
                run: 0,
                task: None,
            })),
            sink,
            interval: config.meter_interval(),
        }
    }

    /// Begin sampling `handle`'s audio track. Restarts if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, handle: &CaptureHandle) -> Result<(), CaptureError> {
        let track = match handle.primary_track() {
            Some(track) if handle.is_open() && handle.kind() == MediaKind::Audio => {
                Arc::clone(track)
            }
            _ => return Err(CaptureError::DeviceUnavailable),
        };

        self.stop();

        let mut state = self.state.lock();
        state.track = Some(track);
        state.analyser.reset();
        state.run += 1;

        let run = state.run;
        let shared = Arc::clone(&self.state);
        let sink = self.sink.clone();
        let period = self.interval;
        state.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match Self::sample_once(&shared, run) {
                    Tick::Level(level) => {
                        if let Some(sink) = &sink {
                            if shared.lock().run == run {
                                sink.draw(level);
                            }
                        }
                    }
                    Tick::TrackEnded => {
                        if let Some(sink) = &sink {
                            sink.clear();
                        }
                        break;
                    }
                    Tick::Stopped => break,
                }
            }
        }));
        Ok(())
    }

    /// Cancel the sampling loop synchronously and reset the level to zero.
    pub fn stop(&self) {
        let was_running = {
            let mut state = self.state.lock();
            state.run += 1;
            if let Some(task) = state.task.take() {
                task.abort();
            }
            state.level = 0.0;
            state.track.take().is_some()
        };
        if was_running {
            if let Some(sink) = &self.sink {
                sink.clear();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().track.is_some()
    }

    pub fn level(&self) -> f32 {
        self.state.lock().level
    }

    /// Number of sampling ticks since construction.
    pub fn ticks(&self) -> u64 {
        self.state.lock().ticks
    }

    /// Read and analyse one block for sampling run `run`.
    fn sample_once(shared: &Mutex<MeterState>, run: u64) -> Tick {
        let mut guard = shared.lock();
        let state = &mut *guard;
        if state.run != run {
            return Tick::Stopped;
        }
        let Some(track) = state.track.as_ref() else {
            return Tick::Stopped;
        };
        if !track.is_live() {
            log::debug!("Audio track {} went away, level meter idle", track.id());
            state.track = None;
            state.level = 0.0;
            return Tick::TrackEnded;
        }

        let written = track.read_samples(&mut state.samples);
        let level = state.analyser.level(&state.samples[..written]);
        state.level = level;
        state.ticks += 1;
        Tick::Level(level)
    }
}

impl Drop for AudioLevelMeter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::capture_handle::tests::StubTrack;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct RecordingSink {
        draws: Mutex<Vec<f32>>,
    }

    impl LevelSink for RecordingSink {
        fn draw(&self, level: f32) {
            self.draws.lock().push(level);
        }
    }

    fn mic_handle() -> (Arc<StubTrack>, CaptureHandle) {
        let track = StubTrack::new(MediaKind::Audio, "mic-a");
        let handle =
            CaptureHandle::new(MediaKind::Audio, vec![track.clone() as Arc<dyn MediaTrack>]);
        (track, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn samples_at_configured_rate() {
        let sink = Arc::new(RecordingSink::default());
        let meter = AudioLevelMeter::new(&SessionConfiguration::default(), Some(sink.clone()));
        let (_track, handle) = mic_handle();

        meter.start(&handle).unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let ticks = meter.ticks();
        assert!((55..=62).contains(&ticks), "ticks = {}", ticks);
        assert!(meter.level() > 0.0);
        assert!(sink.draws.lock().iter().all(|l| (0.0..=1.0).contains(l)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_reads() {
        let meter = AudioLevelMeter::new(&SessionConfiguration::default(), None);
        let (track, handle) = mic_handle();

        meter.start(&handle).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        meter.stop();
        let reads = track.reads.load(Ordering::SeqCst);

        // StubTrack panics if read after stop.
        handle.stop();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(track.reads.load(Ordering::SeqCst), reads);
        assert!(!meter.is_running());
        assert_eq!(meter.level(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn goes_idle_when_track_dies() {
        let sink = Arc::new(RecordingSink::default());
        let meter = AudioLevelMeter::new(&SessionConfiguration::default(), Some(sink.clone()));
        let (track, handle) = mic_handle();

        meter.start(&handle).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        track.live.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!meter.is_running());
        assert_eq!(sink.draws.lock().last().copied(), Some(0.0));
    }

    #[tokio::test]
    async fn refuses_stopped_or_video_handles() {
        let meter = AudioLevelMeter::new(&SessionConfiguration::default(), None);

        let (_track, handle) = mic_handle();
        handle.stop();
        assert_eq!(meter.start(&handle), Err(CaptureError::DeviceUnavailable));

        let camera = CaptureHandle::new(
            MediaKind::Video,
            vec![StubTrack::new(MediaKind::Video, "cam-a") as Arc<dyn MediaTrack>],
        );
        assert_eq!(meter.start(&camera), Err(CaptureError::DeviceUnavailable));
    }

    /// Sink that reads the meter back from inside its own callbacks.
    #[derive(Default)]
    struct ReadBackSink {
        meter: std::sync::OnceLock<Arc<AudioLevelMeter>>,
        seen: Mutex<Vec<f32>>,
    }

    impl LevelSink for ReadBackSink {
        fn draw(&self, _level: f32) {
            if let Some(meter) = self.meter.get() {
                self.seen.lock().push(meter.level());
            }
        }

        fn clear(&self) {
            if let Some(meter) = self.meter.get() {
                self.seen.lock().push(meter.level());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sink_may_read_meter_from_callbacks() {
        let sink = Arc::new(ReadBackSink::default());
        let meter = Arc::new(AudioLevelMeter::new(
            &SessionConfiguration::default(),
            Some(sink.clone()),
        ));
        let _ = sink.meter.set(Arc::clone(&meter));
        let (_track, handle) = mic_handle();

        meter.start(&handle).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        meter.stop();

        let seen = sink.seen.lock().clone();
        assert!(seen.len() > 2, "seen = {:?}", seen);
        assert!(seen[..seen.len() - 1].iter().any(|l| *l > 0.0));
        assert_eq!(seen.last().copied(), Some(0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn no_draw_lands_after_stop() {
        let sink = Arc::new(RecordingSink::default());
        let meter = AudioLevelMeter::new(&SessionConfiguration::default(), Some(sink.clone()));
        let (_track, handle) = mic_handle();

        meter.start(&handle).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        meter.stop();
        let draws = sink.draws.lock().len();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(sink.draws.lock().len(), draws);
        assert_eq!(sink.draws.lock().last().copied(), Some(0.0));
    }
}
