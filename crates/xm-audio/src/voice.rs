//! Voice: audio generation unit for sample playback.

use xm_ir::{LoopType, SampleData, SampleRef};

/// Fractional bits of the playback position.
const FRAC_BITS: u32 = 16;
const FRAC_ONE: u64 = 1 << FRAC_BITS;

/// A single voice producing audio from a sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Voice {
    /// Which sample this voice plays.
    pub sample: Option<SampleRef>,
    /// Sample length in frames.
    pub length: u32,
    /// Current position in sample (16.16 fixed-point).
    pub position: u64,
    /// Playback increment (16.16 fixed-point).
    pub increment: u32,
    pub playing: bool,
    /// 0.0-1.0
    pub volume: f32,
    /// 0.0 (left) to 1.0 (right)
    pub panning: f32,
    pub loop_mode: LoopType,
    pub loop_start: u32,
    pub loop_end: u32,
    /// Ping-pong direction (true = forward).
    pub forward: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            sample: None,
            length: 0,
            position: 0,
            increment: 0,
            playing: false,
            volume: 0.0,
            panning: 0.5,
            loop_mode: LoopType::None,
            loop_start: 0,
            loop_end: 0,
            forward: true,
        }
    }
}

impl Voice {
    /// Start `sample` from `offset` frames. Loop settings are cleared until
    /// the next `set_loop`.
    pub fn trigger(&mut self, sample: SampleRef, length: u32, offset: u32) {
        self.sample = Some(sample);
        self.length = length;
        self.position = (offset as u64) << FRAC_BITS;
        self.playing = offset < length;
        self.loop_mode = LoopType::None;
        self.loop_start = 0;
        self.loop_end = 0;
        self.forward = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Set the playback rate for an output sample rate.
    pub fn set_frequency(&mut self, hz: u32, sample_rate: u32) {
        self.increment = if sample_rate == 0 {
            0
        } else {
            ((hz as u64 * FRAC_ONE) / sample_rate as u64).min(u32::MAX as u64) as u32
        };
    }

    pub fn set_sample_offset(&mut self, frames: u32) {
        self.position = (frames as u64) << FRAC_BITS;
        self.forward = true;
        if frames >= self.length {
            self.playing = false;
        }
    }

    /// Set loop bounds, clamped to the sample. An empty range disables the loop.
    pub fn set_loop(&mut self, mode: LoopType, start: u32, end: u32) {
        let end = end.min(self.length);
        if mode == LoopType::None || end <= start {
            self.loop_mode = LoopType::None;
            self.loop_start = 0;
            self.loop_end = 0;
        } else {
            self.loop_mode = mode;
            self.loop_start = start;
            self.loop_end = end;
        }
    }

    /// Render one frame from `data` and advance.
    ///
    /// Returns `(left, right)` in -1.0..1.0 before mixer gain.
    pub fn render(&mut self, data: &SampleData) -> (f32, f32) {
        if !self.playing {
            return (0.0, 0.0);
        }
        if (self.position >> FRAC_BITS) >= self.length as u64 {
            self.playing = false;
            return (0.0, 0.0);
        }

        let value = self.interpolate(data) as f32 / 32768.0 * self.volume;
        let pan = self.panning.clamp(0.0, 1.0);
        self.advance();
        (value * (1.0 - pan), value * pan)
    }

    fn interpolate(&self, data: &SampleData) -> i16 {
        let idx = (self.position >> FRAC_BITS) as usize;
        let frac = (self.position & (FRAC_ONE - 1)) as i64;
        let a = data.get(idx) as i64;
        let b = data.get(self.next_index(idx)) as i64;
        (a + (((b - a) * frac) >> FRAC_BITS)) as i16
    }

    /// Frame that follows `idx` along the current play direction.
    fn next_index(&self, idx: usize) -> usize {
        let next = idx + 1;
        match self.loop_mode {
            LoopType::Forward if next >= self.loop_end as usize => self.loop_start as usize,
            LoopType::PingPong if next >= self.loop_end as usize => idx,
            _ if next >= self.length as usize => idx,
            _ => next,
        }
    }

    fn advance(&mut self) {
        let inc = self.increment as u64;
        let start = (self.loop_start as u64) << FRAC_BITS;
        let end = (self.loop_end as u64) << FRAC_BITS;

        match self.loop_mode {
            LoopType::None => {
                self.position += inc;
                if (self.position >> FRAC_BITS) >= self.length as u64 {
                    self.playing = false;
                }
            }
            LoopType::Forward => {
                self.position += inc;
                if self.position >= end {
                    self.position = start + (self.position - end) % (end - start);
                }
            }
            LoopType::PingPong => {
                if self.forward {
                    self.position += inc;
                    if self.position >= end {
                        let over = (self.position - end) % (end - start);
                        self.position = (end - 1).saturating_sub(over).max(start);
                        self.forward = false;
                    }
                } else if self.position >= start + inc {
                    self.position -= inc;
                } else {
                    let under = (start + inc - self.position) % (end - start);
                    self.position = (start + under).min(end - 1);
                    self.forward = true;
                }
            }
        }
    }
}
