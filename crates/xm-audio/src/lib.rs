//! Voice backend for the XM engine.
//!
//! [`Mixer`] implements [`xm_engine::VoiceSink`] and renders stereo frames
//! from the module's sample data. Offline callers feed it directly; realtime
//! playback hands commands across threads with [`command_queue`].

mod frame;
mod mixer;
mod queue;
mod traits;
mod voice;

#[cfg(feature = "cpal")]
mod cpal_backend;

#[cfg(feature = "cpal")]
pub use cpal_backend::CpalOutput;
pub use frame::Frame;
pub use mixer::Mixer;
pub use queue::{command_queue, CommandReceiver, CommandSender};
pub use traits::{AudioError, AudioOutput};
pub use voice::Voice;
