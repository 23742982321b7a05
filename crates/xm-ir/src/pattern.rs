//! Pattern and note types for XM sequences.

use alloc::vec::Vec;

use crate::effects::{Effect, VolumeCommand};

/// Effect type byte meaning "no effect".
///
/// XM stores arpeggio as type 0, so an all-zero effect column is rewritten to
/// this sentinel at load time.
pub const NO_EFFECT: u8 = 0xFF;

/// Note byte that releases the current note.
pub const KEY_OFF_NOTE: u8 = 97;

/// Decoded view of a note byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pitch {
    /// No note
    #[default]
    None,
    /// Pitched note, 1-96 (1 = C-0)
    On(u8),
    /// Key release (note 97)
    KeyOff,
    /// Byte outside the tracker range; treated as no note
    Invalid(u8),
}

/// A single pattern cell, stored as the five raw bytes of the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Note {
    /// 0 = none, 1-96 = pitched, 97 = key-off
    pub note: u8,
    /// 0 = none, else 1-based instrument number
    pub instrument: u8,
    /// Volume column byte (0 = none)
    pub volume: u8,
    /// Effect type, or `NO_EFFECT`
    pub fx_type: u8,
    /// Effect parameter
    pub fx_param: u8,
}

impl Note {
    /// The empty note: every field zero.
    pub const fn empty() -> Self {
        Self {
            note: 0,
            instrument: 0,
            volume: 0,
            fx_type: 0,
            fx_param: 0,
        }
    }

    /// Rewrite an all-zero effect column to the `NO_EFFECT` sentinel.
    ///
    /// Type 0 with parameter 0 is an arpeggio with no offsets, which the
    /// format uses to mean "nothing here".
    pub fn disambiguate_effect(&mut self) {
        if self.fx_type == 0 && self.fx_param == 0 {
            self.fx_type = NO_EFFECT;
        }
    }

    pub fn pitch(&self) -> Pitch {
        match self.note {
            0 => Pitch::None,
            n @ 1..=96 => Pitch::On(n),
            KEY_OFF_NOTE => Pitch::KeyOff,
            n => Pitch::Invalid(n),
        }
    }

    /// True when the note byte is a pitched note (not empty, not key-off).
    pub fn is_real_note(&self) -> bool {
        matches!(self.pitch(), Pitch::On(_))
    }

    pub fn effect(&self) -> Effect {
        Effect::from_raw(self.fx_type, self.fx_param)
    }

    pub fn volume_command(&self) -> VolumeCommand {
        VolumeCommand::from_byte(self.volume)
    }
}

/// A pattern: `rows × channels` notes in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Number of rows
    pub rows: u16,
    /// Note data, indexed as `channel + row × channels`
    pub notes: Vec<Note>,
}

impl Pattern {
    /// Create a pattern filled with empty notes.
    pub fn new(rows: u16, channels: u16) -> Self {
        Self {
            rows,
            notes: alloc::vec![Note::empty(); rows as usize * channels as usize],
        }
    }

    /// Get a note, or `None` when the row or channel is out of range.
    pub fn note(&self, row: u16, channel: u16, channels: u16) -> Option<&Note> {
        if row >= self.rows || channel >= channels {
            return None;
        }
        self.notes
            .get(channel as usize + row as usize * channels as usize)
    }

    /// Get a mutable note, or `None` when out of range.
    pub fn note_mut(&mut self, row: u16, channel: u16, channels: u16) -> Option<&mut Note> {
        if row >= self.rows || channel >= channels {
            return None;
        }
        self.notes
            .get_mut(channel as usize + row as usize * channels as usize)
    }

    /// All notes of one row.
    pub fn row(&self, row: u16, channels: u16) -> &[Note] {
        let start = row as usize * channels as usize;
        self.notes
            .get(start..start + channels as usize)
            .unwrap_or(&[])
    }

    /// True when every note in the pattern is empty.
    pub fn is_empty(&self) -> bool {
        self.notes.iter().all(|n| *n == Note::empty())
    }
}
