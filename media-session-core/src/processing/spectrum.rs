use std::f32::consts::PI;

use crate::models::config::SessionConfiguration;

/// Frequency-domain level analyser.
///
/// Follows the browser `AnalyserNode` pipeline so levels look the same as a
/// web client's meter:
/// ```text
/// samples → Blackman window → FFT → |X|/N → smoothing → dB → byte (0..255)
/// level = mean(bytes) / 255
/// ```
/// Pure math over `&[f32]`, no platform dependencies.
#[derive(Debug, Clone)]
pub struct FrequencyAnalyser {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    re: Vec<f32>,
    im: Vec<f32>,
}

impl FrequencyAnalyser {
    /// `fft_size` must be a power of two (validated by `SessionConfiguration`).
    pub fn new(fft_size: usize, smoothing: f32, min_decibels: f32, max_decibels: f32) -> Self {
        Self {
            fft_size,
            smoothing,
            min_decibels,
            max_decibels,
            window: blackman_window(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            re: vec![0.0; fft_size],
            im: vec![0.0; fft_size],
        }
    }

    pub fn from_config(config: &SessionConfiguration) -> Self {
        Self::new(
            config.fft_size,
            config.smoothing_time_constant,
            config.min_decibels,
            config.max_decibels,
        )
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of output bins (`fft_size / 2`).
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Forget smoothing history (e.g. when the input track changes).
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Analyse the most recent `fft_size` samples and write one byte per bin.
    ///
    /// Shorter input is zero-padded at the front; longer input keeps its tail.
    pub fn byte_frequency_data(&mut self, samples: &[f32], out: &mut [u8]) {
        self.transform(samples);

        let range = self.max_decibels - self.min_decibels;
        for (byte, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            *byte = if magnitude > 0.0 {
                let db = 20.0 * magnitude.log10();
                let scaled = (255.0 / range) * (db - self.min_decibels);
                scaled.floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }

    /// Normalized level in [0, 1]: the mean of the byte spectrum over 255.
    pub fn level(&mut self, samples: &[f32]) -> f32 {
        let mut bytes = vec![0u8; self.frequency_bin_count()];
        self.byte_frequency_data(samples, &mut bytes);
        if bytes.is_empty() {
            return 0.0;
        }
        let sum: u32 = bytes.iter().map(|&b| b as u32).sum();
        (sum as f32 / bytes.len() as f32) / 255.0
    }

    fn transform(&mut self, samples: &[f32]) {
        let n = self.fft_size;
        let tail = if samples.len() > n {
            &samples[samples.len() - n..]
        } else {
            samples
        };
        let pad = n - tail.len();

        for i in 0..n {
            let sample = if i < pad { 0.0 } else { tail[i - pad] };
            self.re[i] = sample * self.window[i];
            self.im[i] = 0.0;
        }

        fft_in_place(&mut self.re, &mut self.im);

        let scale = 1.0 / n as f32;
        for k in 0..n / 2 {
            let magnitude = (self.re[k] * self.re[k] + self.im[k] * self.im[k]).sqrt() * scale;
            self.smoothed[k] =
                self.smoothing * self.smoothed[k] + (1.0 - self.smoothing) * magnitude;
        }
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            A0 - A1 * (2.0 * PI * x).cos() + A2 * (4.0 * PI * x).cos()
        })
        .collect()
}

/// Iterative radix-2 Cooley-Tukey FFT. `re.len()` must be a power of two.
fn fft_in_place(re: &mut [f32], im: &mut [f32]) {
    let n = re.len();
    if n < 2 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let angle = -2.0 * PI / len as f32;
        let (w_im, w_re) = angle.sin_cos();
        for start in (0..n).step_by(len) {
            let mut cur_re = 1.0f32;
            let mut cur_im = 0.0f32;
            for k in 0..len / 2 {
                let a = start + k;
                let b = a + len / 2;
                let t_re = re[b] * cur_re - im[b] * cur_im;
                let t_im = re[b] * cur_im + im[b] * cur_re;
                re[b] = re[a] - t_re;
                im[b] = im[a] - t_im;
                re[a] += t_re;
                im[a] += t_im;

                let next_re = cur_re * w_re - cur_im * w_im;
                cur_im = cur_re * w_im + cur_im * w_re;
                cur_re = next_re;
            }
        }
        len <<= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(frequency: f32, amplitude: f32, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / 48000.0).sin())
            .collect()
    }

    fn analyser() -> FrequencyAnalyser {
        FrequencyAnalyser::from_config(&SessionConfiguration::default())
    }

    #[test]
    fn fft_of_impulse_is_flat() {
        let mut re = vec![0.0f32; 8];
        let mut im = vec![0.0f32; 8];
        re[0] = 1.0;

        fft_in_place(&mut re, &mut im);

        for k in 0..8 {
            assert_relative_eq!(re[k], 1.0, epsilon = 1e-6);
            assert_relative_eq!(im[k], 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn fft_finds_bin_aligned_tone() {
        let n = 64;
        let mut re: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 4.0 * i as f32 / n as f32).cos())
            .collect();
        let mut im = vec![0.0f32; n];

        fft_in_place(&mut re, &mut im);

        let magnitude = |k: usize| (re[k] * re[k] + im[k] * im[k]).sqrt();
        assert_relative_eq!(magnitude(4), n as f32 / 2.0, epsilon = 1e-3);
        assert!(magnitude(10) < 1e-3);
    }

    #[test]
    fn blackman_window_shape() {
        let window = blackman_window(256);
        assert_relative_eq!(window[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(window[128], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn silence_is_zero() {
        let mut analyser = analyser();
        assert_eq!(analyser.level(&[0.0; 256]), 0.0);
        assert_eq!(analyser.level(&[]), 0.0);
    }

    #[test]
    fn louder_input_reads_higher() {
        let mut quiet = analyser();
        let mut loud = analyser();

        let quiet_level = quiet.level(&sine(1000.0, 0.01, 256));
        let loud_level = loud.level(&sine(1000.0, 0.8, 256));

        assert!(loud_level > quiet_level, "{} <= {}", loud_level, quiet_level);
        assert!(loud_level > 0.0 && loud_level <= 1.0);
    }

    #[test]
    fn level_stays_in_unit_range_for_full_scale_noise() {
        let mut analyser = analyser();
        let mut seed = 0x1234_5678u32;
        let noise: Vec<f32> = (0..256)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                (seed as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        for _ in 0..10 {
            let level = analyser.level(&noise);
            assert!((0.0..=1.0).contains(&level));
        }
    }

    #[test]
    fn smoothing_decays_gradually_and_reset_clears() {
        let mut analyser = analyser();
        let tone = sine(1000.0, 0.8, 256);
        analyser.level(&tone);
        let loud = analyser.level(&tone);

        let decaying = analyser.level(&[0.0; 256]);
        assert!(decaying > 0.0);
        assert!(decaying < loud);

        analyser.reset();
        assert_eq!(analyser.level(&[0.0; 256]), 0.0);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut analyser = analyser();
        let level = analyser.level(&sine(440.0, 0.5, 64));
        assert!(level > 0.0);
        assert_eq!(analyser.frequency_bin_count(), 128);
    }
}
