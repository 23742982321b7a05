//! Playback engine for XM modules.
//!
//! Turns a loaded [`xm_ir::Module`] into a stream of [`VoiceCommand`]s, one
//! tick at a time. The engine never touches audio buffers; a [`VoiceSink`]
//! implementation owns the voices.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod envelope_state;
mod frequency;
mod sequencer;
mod voice;

pub use channel::{ChannelContext, ChannelState, Globals, NoteControl};
pub use envelope_state::EnvelopeState;
pub use frequency::{note_to_period, tick_duration_ms, LinearFrequencyTable, MAX_PERIOD};
pub use sequencer::{PlayerOptions, PlayerState, Position, Transport};
pub use voice::{VoiceCommand, VoiceSink};
