//! Sample data types.

use alloc::vec::Vec;

/// Sample loop mode, from the low two bits of the type byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopType {
    /// No loop
    #[default]
    None,
    /// Forward loop
    Forward,
    /// Ping-pong (bidirectional) loop
    PingPong,
}

/// PCM sample width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BitDepth {
    #[default]
    Eight,
    Sixteen,
}

impl BitDepth {
    /// Bytes per frame.
    pub fn width(self) -> usize {
        match self {
            BitDepth::Eight => 1,
            BitDepth::Sixteen => 2,
        }
    }
}

/// A sample definition.
///
/// Lengths and loop bounds count frames, not bytes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sample {
    /// Length in frames
    pub length: u32,
    /// Loop start in frames
    pub loop_start: u32,
    /// Loop length in frames
    pub loop_length: u32,
    /// Default volume (0-64)
    pub volume: u8,
    /// Signed pitch fine adjustment (-128..127, 128 steps per semitone)
    pub finetune: i8,
    /// Type flags: loop mode in bits 0-1, 16-bit data in bit 4
    pub kind: u8,
    /// Default panning (0-255, 128 = center)
    pub panning: u8,
    /// Transposition in semitones
    pub relative_note: i8,
    /// Decoded PCM
    pub data: SampleData,
}

impl Sample {
    pub const LOOP_MASK: u8 = 0x03;
    pub const FLAG_16BIT: u8 = 0x10;

    /// Build an 8-bit sample from decoded PCM.
    pub fn from_pcm8(pcm: Vec<i8>) -> Self {
        Self {
            length: pcm.len() as u32,
            volume: 64,
            panning: 128,
            data: if pcm.is_empty() {
                SampleData::Empty
            } else {
                SampleData::Pcm8(pcm)
            },
            ..Self::default()
        }
    }

    /// Build a 16-bit sample from decoded PCM.
    pub fn from_pcm16(pcm: Vec<i16>) -> Self {
        Self {
            length: pcm.len() as u32,
            volume: 64,
            panning: 128,
            kind: Self::FLAG_16BIT,
            data: if pcm.is_empty() {
                SampleData::Empty
            } else {
                SampleData::Pcm16(pcm)
            },
            ..Self::default()
        }
    }

    pub fn loop_type(&self) -> LoopType {
        match self.kind & Self::LOOP_MASK {
            1 => LoopType::Forward,
            2 => LoopType::PingPong,
            _ => LoopType::None,
        }
    }

    pub fn set_loop(&mut self, mode: LoopType, start: u32, length: u32) {
        let bits = match mode {
            LoopType::None => 0,
            LoopType::Forward => 1,
            LoopType::PingPong => 2,
        };
        self.kind = (self.kind & !Self::LOOP_MASK) | bits;
        self.loop_start = start;
        self.loop_length = length;
    }

    pub fn bit_depth(&self) -> BitDepth {
        if self.kind & Self::FLAG_16BIT != 0 {
            BitDepth::Sixteen
        } else {
            BitDepth::Eight
        }
    }

    /// Expected PCM size in bytes: `length × width`.
    pub fn byte_len(&self) -> usize {
        self.length as usize * self.bit_depth().width()
    }

    /// Loop bounds `(start, end)` clamped to the sample length.
    ///
    /// Returns `None` when the sample does not loop or the clamped loop is
    /// empty.
    pub fn loop_bounds(&self) -> Option<(u32, u32)> {
        if self.loop_type() == LoopType::None {
            return None;
        }
        let start = self.loop_start.min(self.length);
        let end = self.loop_start.saturating_add(self.loop_length).min(self.length);
        (end > start).then_some((start, end))
    }
}

/// Decoded PCM audio.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SampleData {
    /// Zero-length sample, no buffer
    #[default]
    Empty,
    Pcm8(Vec<i8>),
    Pcm16(Vec<i16>),
}

impl SampleData {
    /// Number of frames.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Empty => 0,
            SampleData::Pcm8(v) => v.len(),
            SampleData::Pcm16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the buffer in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            SampleData::Empty => 0,
            SampleData::Pcm8(v) => v.len(),
            SampleData::Pcm16(v) => v.len() * 2,
        }
    }

    /// Frame at `pos` scaled to 16 bits, 0 past the end.
    pub fn get(&self, pos: usize) -> i16 {
        match self {
            SampleData::Empty => 0,
            SampleData::Pcm8(v) => v.get(pos).copied().unwrap_or(0) as i16 * 256,
            SampleData::Pcm16(v) => v.get(pos).copied().unwrap_or(0),
        }
    }
}

/// Non-owning reference to a sample: instrument index and sample index,
/// both 0-based.
///
/// The module owns the sample; whoever holds a `SampleRef` must look it up
/// through the same module for as long as playback runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SampleRef {
    pub instrument: u8,
    pub sample: u8,
}
