//! Instrument and envelope types.

use alloc::vec::Vec;
use arrayvec::ArrayVec;

use crate::sample::Sample;

/// Control points an XM envelope can hold.
pub const MAX_ENVELOPE_POINTS: usize = 12;

/// Entries in the note → sample table (one per pitched note).
pub const NOTE_MAP_LEN: usize = 96;

/// An instrument definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Instrument {
    /// Instrument type byte (always 0 in practice)
    pub kind: u8,
    /// Sample mapping: note (0-95) -> sample index within `samples`
    pub sample_map: [u8; NOTE_MAP_LEN],
    /// Volume envelope
    pub volume_envelope: Envelope,
    /// Panning envelope
    pub panning_envelope: Envelope,
    /// Automatic vibrato applied to every sample
    pub vibrato: AutoVibrato,
    /// Volume fadeout per envelope step after key-off (0 = no fade)
    pub fadeout: u16,
    /// Samples owned by this instrument
    pub samples: Vec<Sample>,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            kind: 0,
            sample_map: [0; NOTE_MAP_LEN],
            volume_envelope: Envelope::default(),
            panning_envelope: Envelope::default(),
            vibrato: AutoVibrato::default(),
            fadeout: 0,
            samples: Vec::new(),
        }
    }
}

impl Instrument {
    /// Create an instrument that plays `sample` for every note.
    pub fn with_sample(sample: Sample) -> Self {
        let mut inst = Self::default();
        inst.samples.push(sample);
        inst
    }

    /// Sample index for a 0-based note, if the map and sample list allow it.
    pub fn sample_for_note(&self, note: u8) -> Option<u8> {
        let index = *self.sample_map.get(note as usize)?;
        ((index as usize) < self.samples.len()).then_some(index)
    }
}

/// Instrument auto-vibrato settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutoVibrato {
    pub kind: u8,
    pub sweep: u8,
    pub depth: u8,
    pub rate: u8,
}

/// Envelope flag bits as stored in the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeFlags(pub u8);

impl EnvelopeFlags {
    pub const ENABLED: u8 = 0x01;
    pub const SUSTAIN: u8 = 0x02;
    pub const LOOP: u8 = 0x04;

    pub fn enabled(self) -> bool {
        self.0 & Self::ENABLED != 0
    }

    pub fn sustain(self) -> bool {
        self.0 & Self::SUSTAIN != 0
    }

    pub fn looped(self) -> bool {
        self.0 & Self::LOOP != 0
    }
}

/// A piecewise-linear volume or panning envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Control points, frames non-decreasing
    pub points: ArrayVec<EnvelopePoint, MAX_ENVELOPE_POINTS>,
    /// Sustain point index
    pub sustain_point: u8,
    /// Loop start point index
    pub loop_start: u8,
    /// Loop end point index
    pub loop_end: u8,
    pub flags: EnvelopeFlags,
}

impl Envelope {
    /// Build an enabled envelope from `(frame, value)` pairs.
    ///
    /// Points past `MAX_ENVELOPE_POINTS` are dropped.
    pub fn from_points(points: &[(u16, u16)]) -> Self {
        let mut env = Self {
            flags: EnvelopeFlags(EnvelopeFlags::ENABLED),
            ..Self::default()
        };
        for &(frame, value) in points.iter().take(MAX_ENVELOPE_POINTS) {
            env.points.push(EnvelopePoint { frame, value });
        }
        env
    }

    pub fn enabled(&self) -> bool {
        self.flags.enabled()
    }

    pub fn has_sustain(&self) -> bool {
        self.flags.sustain()
    }

    pub fn has_loop(&self) -> bool {
        self.flags.looped()
    }
}

/// A point in an envelope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopePoint {
    /// Frame (tick) position
    pub frame: u16,
    /// Value, 0-64
    pub value: u16,
}
