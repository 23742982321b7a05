//! Pitch period and playback frequency conversion.
//!
//! XM linear periods run from 0 (highest pitch) to 7680 (lowest). Each
//! semitone is 64 period units and an octave is 768.

use alloc::vec::Vec;

/// Largest linear period; the frequency table has `MAX_PERIOD + 1` entries.
pub const MAX_PERIOD: u16 = 7680;

/// Period at which a sample plays at its base rate.
const BASE_PERIOD: f64 = 4608.0;

/// Playback rate of a sample at `BASE_PERIOD`.
const BASE_FREQUENCY: f64 = 8363.0;

const PERIODS_PER_OCTAVE: f64 = 768.0;

/// Convert a 0-based note and finetune to a linear period.
///
/// `period = 7680 - 64 × note - finetune / 2`, clamped to `0..=MAX_PERIOD`.
/// The note may be negative or past the keyboard once a sample's relative
/// note is added.
pub fn note_to_period(note: i32, finetune: i8) -> u16 {
    let period = MAX_PERIOD as i32 - note * 64 - finetune as i32 / 2;
    period.clamp(0, MAX_PERIOD as i32) as u16
}

/// Milliseconds per tick at a given BPM: `1000 / (2 × bpm / 5)`.
pub fn tick_duration_ms(bpm: u16) -> u32 {
    let ticks_per_second = (2 * bpm as u32 / 5).max(1);
    1000 / ticks_per_second
}

/// Precomputed period → frequency (Hz) lookup.
#[derive(Clone, Debug)]
pub struct LinearFrequencyTable {
    table: Vec<u32>,
}

impl LinearFrequencyTable {
    pub fn new() -> Self {
        let table = (0..=MAX_PERIOD)
            .map(|i| {
                let exp = (BASE_PERIOD - i as f64) / PERIODS_PER_OCTAVE;
                (BASE_FREQUENCY * libm::pow(2.0, exp)) as u32
            })
            .collect();
        Self { table }
    }

    /// Frequency for a period, clamping out-of-range periods to the table.
    pub fn frequency(&self, period: i32) -> u32 {
        let index = period.clamp(0, MAX_PERIOD as i32) as usize;
        self.table[index]
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for LinearFrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}
