//! Core model types for Extended Module (XM) songs.
//!
//! This crate defines the decoded, in-memory form of a module. The loader
//! in `xm-formats` produces it and the sequencer in `xm-engine` reads it.
//! Nothing here has playback behaviour.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod effects;
mod instrument;
mod module;
mod pattern;
mod sample;

pub use effects::{Effect, ExtendedEffect, VolumeCommand};
pub use instrument::{
    AutoVibrato, Envelope, EnvelopeFlags, EnvelopePoint, Instrument, MAX_ENVELOPE_POINTS,
    NOTE_MAP_LEN,
};
pub use module::{
    InvariantError, Module, MAX_CHANNELS, MAX_INSTRUMENTS, MAX_ORDERS, MAX_PATTERNS,
    MAX_PATTERN_ROWS,
};
pub use pattern::{Note, Pattern, Pitch, KEY_OFF_NOTE, NO_EFFECT};
pub use sample::{BitDepth, LoopType, Sample, SampleData, SampleRef};
