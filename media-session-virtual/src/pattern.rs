//! Scrolling color-bar generator backing virtual cameras.

use media_session_core::traits::capture_platform::VideoFrame;

pub const FRAME_WIDTH: u32 = 64;
pub const FRAME_HEIGHT: u32 = 48;

const BARS: [[u8; 3]; 8] = [
    [0xff, 0xff, 0xff],
    [0xff, 0xff, 0x00],
    [0x00, 0xff, 0xff],
    [0x00, 0xff, 0x00],
    [0xff, 0x00, 0xff],
    [0xff, 0x00, 0x00],
    [0x00, 0x00, 0xff],
    [0x00, 0x00, 0x00],
];

/// Produces RGB24 frames whose bars shift one column per frame.
///
/// Each camera gets its own starting offset so two cameras never render the
/// same first frame.
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    offset: u32,
    sequence: u64,
}

impl PatternGenerator {
    pub fn new(device_id: &str) -> Self {
        let offset = device_id
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        Self {
            offset: offset % FRAME_WIDTH,
            sequence: 0,
        }
    }

    /// Next frame. Disabled cameras render black but keep counting.
    pub fn next_frame(&mut self, enabled: bool) -> VideoFrame {
        let sequence = self.sequence;
        self.sequence += 1;

        let mut pixels = vec![0u8; (FRAME_WIDTH * FRAME_HEIGHT * 3) as usize];
        if enabled {
            let bar_width = FRAME_WIDTH / BARS.len() as u32;
            let shift = self.offset + sequence as u32;
            for (i, px) in pixels.chunks_exact_mut(3).enumerate() {
                let x = (i as u32 % FRAME_WIDTH + shift) % FRAME_WIDTH;
                px.copy_from_slice(&BARS[(x / bar_width) as usize % BARS.len()]);
            }
        }

        VideoFrame {
            sequence,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            pixels,
        }
    }
}
