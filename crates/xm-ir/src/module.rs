//! The top-level module type and its structural invariants.

use alloc::vec::Vec;
use arrayvec::ArrayString;
use core::fmt;

use crate::instrument::Instrument;
use crate::pattern::Pattern;
use crate::sample::{Sample, SampleRef};

/// Length of the order table on disk.
pub const MAX_ORDERS: usize = 256;

/// Most channels an XM module can declare.
pub const MAX_CHANNELS: u16 = 32;

/// Most patterns an XM module can hold.
pub const MAX_PATTERNS: u16 = 256;

/// Rows per pattern are `1..=MAX_PATTERN_ROWS`.
pub const MAX_PATTERN_ROWS: u16 = 256;

/// Most instruments an XM module can hold.
pub const MAX_INSTRUMENTS: u16 = 255;

/// A decoded XM module. Immutable once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    /// Module name
    pub name: ArrayString<20>,
    /// Format version word (0x0104 for current files)
    pub version: u16,
    /// Number of entries in `order`
    pub song_length: u16,
    /// Order position to resume at after the last entry
    pub restart_position: u16,
    /// Channels per pattern row
    pub channel_count: u16,
    pub pattern_count: u16,
    pub instrument_count: u16,
    /// Bit 0: linear frequency table
    pub flags: u16,
    /// Ticks per row at song start
    pub default_tempo: u16,
    /// Beats per minute at song start
    pub default_bpm: u16,
    /// Pattern order, `song_length` entries
    pub order: Vec<u8>,
    pub patterns: Vec<Pattern>,
    pub instruments: Vec<Instrument>,
}

impl Default for Module {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            version: 0x0104,
            song_length: 0,
            restart_position: 0,
            channel_count: 0,
            pattern_count: 0,
            instrument_count: 0,
            flags: 1,
            default_tempo: 6,
            default_bpm: 125,
            order: Vec::new(),
            patterns: Vec::new(),
            instruments: Vec::new(),
        }
    }
}

impl Module {
    /// Create an empty module with the given channel count.
    pub fn new(name: &str, channels: u16) -> Self {
        let mut module = Self {
            channel_count: channels,
            ..Self::default()
        };
        module.set_name(name);
        module
    }

    /// Set the name, truncated to the 20 bytes the format stores.
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for c in name.chars() {
            if self.name.try_push(c).is_err() {
                break;
            }
        }
    }

    /// Append a pattern and return its index.
    pub fn add_pattern(&mut self, pattern: Pattern) -> u8 {
        self.patterns.push(pattern);
        self.pattern_count = self.patterns.len() as u16;
        (self.patterns.len() - 1) as u8
    }

    /// Append an instrument and return its 1-based number.
    pub fn add_instrument(&mut self, instrument: Instrument) -> u8 {
        self.instruments.push(instrument);
        self.instrument_count = self.instruments.len() as u16;
        self.instruments.len() as u8
    }

    /// Replace the order table.
    pub fn set_order(&mut self, order: &[u8]) {
        self.order = order.to_vec();
        self.song_length = order.len() as u16;
    }

    /// Pattern played at an order position.
    pub fn pattern_at(&self, order_pos: u16) -> Option<&Pattern> {
        let index = *self.order.get(order_pos as usize)?;
        self.patterns.get(index as usize)
    }

    pub fn sample(&self, r: SampleRef) -> Option<&Sample> {
        self.instruments
            .get(r.instrument as usize)?
            .samples
            .get(r.sample as usize)
    }

    pub fn uses_linear_frequencies(&self) -> bool {
        self.flags & 1 != 0
    }

    /// Check every structural invariant the sequencer relies on.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.song_length == 0 {
            return Err(InvariantError::EmptySong);
        }
        if self.song_length as usize > MAX_ORDERS {
            return Err(InvariantError::SongTooLong(self.song_length));
        }
        if self.order.len() != self.song_length as usize {
            return Err(InvariantError::OrderLength {
                song_length: self.song_length,
                entries: self.order.len(),
            });
        }
        if self.restart_position >= self.song_length {
            return Err(InvariantError::RestartOutOfRange {
                restart: self.restart_position,
                song_length: self.song_length,
            });
        }
        if self.channel_count == 0 || self.channel_count > MAX_CHANNELS {
            return Err(InvariantError::ChannelCount(self.channel_count));
        }
        if self.pattern_count as usize != self.patterns.len() {
            return Err(InvariantError::CountMismatch {
                what: "pattern",
                declared: self.pattern_count,
                actual: self.patterns.len(),
            });
        }
        if self.instrument_count as usize != self.instruments.len() {
            return Err(InvariantError::CountMismatch {
                what: "instrument",
                declared: self.instrument_count,
                actual: self.instruments.len(),
            });
        }
        if self.patterns.len() > MAX_PATTERNS as usize {
            return Err(InvariantError::TooManyPatterns(self.patterns.len()));
        }
        if self.instruments.len() > MAX_INSTRUMENTS as usize {
            return Err(InvariantError::TooManyInstruments(self.instruments.len()));
        }
        for (position, &pattern) in self.order.iter().enumerate() {
            if pattern as usize >= self.patterns.len() {
                return Err(InvariantError::OrderOutOfRange { position, pattern });
            }
        }
        for (index, pattern) in self.patterns.iter().enumerate() {
            if pattern.rows == 0 || pattern.rows > MAX_PATTERN_ROWS {
                return Err(InvariantError::PatternRows {
                    pattern: index,
                    rows: pattern.rows,
                });
            }
            let expected = pattern.rows as usize * self.channel_count as usize;
            if pattern.notes.len() != expected {
                return Err(InvariantError::PatternSize {
                    pattern: index,
                    expected,
                    actual: pattern.notes.len(),
                });
            }
        }
        for (i, inst) in self.instruments.iter().enumerate() {
            for (s, sample) in inst.samples.iter().enumerate() {
                if sample.data.byte_len() != sample.byte_len() {
                    return Err(InvariantError::PcmLength {
                        instrument: i,
                        sample: s,
                        expected: sample.byte_len(),
                        actual: sample.data.byte_len(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A violated structural invariant of a [`Module`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantError {
    EmptySong,
    SongTooLong(u16),
    OrderLength { song_length: u16, entries: usize },
    RestartOutOfRange { restart: u16, song_length: u16 },
    ChannelCount(u16),
    CountMismatch { what: &'static str, declared: u16, actual: usize },
    TooManyPatterns(usize),
    TooManyInstruments(usize),
    PatternRows { pattern: usize, rows: u16 },
    OrderOutOfRange { position: usize, pattern: u8 },
    PatternSize { pattern: usize, expected: usize, actual: usize },
    PcmLength { instrument: usize, sample: usize, expected: usize, actual: usize },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::EmptySong => write!(f, "song length is zero"),
            InvariantError::SongTooLong(n) => {
                write!(f, "song length {} exceeds {} orders", n, MAX_ORDERS)
            }
            InvariantError::OrderLength { song_length, entries } => write!(
                f,
                "order table has {} entries for song length {}",
                entries, song_length
            ),
            InvariantError::RestartOutOfRange { restart, song_length } => write!(
                f,
                "restart position {} is outside song length {}",
                restart, song_length
            ),
            InvariantError::ChannelCount(n) => {
                write!(f, "channel count {} outside 1..={}", n, MAX_CHANNELS)
            }
            InvariantError::CountMismatch { what, declared, actual } => write!(
                f,
                "header declares {} {}s but {} are present",
                declared, what, actual
            ),
            InvariantError::TooManyPatterns(n) => {
                write!(f, "{} patterns (max {})", n, MAX_PATTERNS)
            }
            InvariantError::TooManyInstruments(n) => {
                write!(f, "{} instruments (max {})", n, MAX_INSTRUMENTS)
            }
            InvariantError::PatternRows { pattern, rows } => write!(
                f,
                "pattern {} has {} rows, expected 1..={}",
                pattern, rows, MAX_PATTERN_ROWS
            ),
            InvariantError::OrderOutOfRange { position, pattern } => write!(
                f,
                "order {} references missing pattern {}",
                position, pattern
            ),
            InvariantError::PatternSize { pattern, expected, actual } => write!(
                f,
                "pattern {} holds {} notes, expected {}",
                pattern, actual, expected
            ),
            InvariantError::PcmLength { instrument, sample, expected, actual } => write!(
                f,
                "instrument {} sample {} has {} PCM bytes, expected {}",
                instrument, sample, actual, expected
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvariantError {}
