//! Audio output trait and error types.

use thiserror::Error;

use crate::mixer::Mixer;
use crate::queue::CommandReceiver;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
}

/// A realtime output that renders a [`Mixer`] on its own audio context.
pub trait AudioOutput {
    /// Rate the mixer must be created with.
    fn sample_rate(&self) -> u32;

    /// Take ownership of the mixer and start rendering. Queued commands are
    /// applied before each device buffer.
    fn start(&mut self, mixer: Mixer, commands: CommandReceiver) -> Result<(), AudioError>;

    /// Stop rendering and release the stream.
    fn stop(&mut self) -> Result<(), AudioError>;
}
