//! Sine-tone generator backing virtual microphones.

use std::f64::consts::TAU;

pub const SAMPLE_RATE: f64 = 48_000.0;

/// Phase-continuous mono sine source.
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    frequency: f64,
    amplitude: f32,
    phase: f64,
}

impl ToneGenerator {
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency: frequency.max(0.0) as f64,
            amplitude: amplitude.clamp(0.0, 1.0),
            phase: 0.0,
        }
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Fill `out` with the next samples. Phase carries over between calls.
    pub fn fill(&mut self, out: &mut [f32]) {
        let step = TAU * self.frequency / SAMPLE_RATE;
        for sample in out.iter_mut() {
            *sample = self.amplitude * self.phase.sin() as f32;
            self.phase = (self.phase + step) % TAU;
        }
    }
}
