//! The contract between the sequencer and whatever plays the voices.

use alloc::vec::Vec;

use xm_ir::{BitDepth, LoopType, SampleRef};

/// A command for one voice. Each module channel drives the voice with the
/// same index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VoiceCommand {
    /// Start playing a sample from `offset` frames.
    ///
    /// `sample` names PCM owned by the module; the backend must resolve it
    /// against the same module the sequencer is playing.
    Trigger {
        sample: SampleRef,
        depth: BitDepth,
        length: u32,
        offset: u32,
    },
    Stop,
    /// Volume, 0.0-1.0
    SetVolume(f32),
    /// Panning, 0.0 (left) to 1.0 (right)
    SetPanning(f32),
    /// Playback rate in Hz
    SetFrequency(u32),
    /// Move the play position of the current sample
    SetSampleOffset(u32),
    /// Loop bounds in frames, `start..end`
    SetLoop { mode: LoopType, start: u32, end: u32 },
}

/// Receiver of voice commands.
///
/// Called from the sequencer thread; implementations that hand commands to
/// an audio callback must not block.
pub trait VoiceSink {
    fn dispatch(&mut self, voice: u8, command: VoiceCommand);
}

impl<S: VoiceSink + ?Sized> VoiceSink for &mut S {
    fn dispatch(&mut self, voice: u8, command: VoiceCommand) {
        (**self).dispatch(voice, command);
    }
}

/// Records commands in order.
impl VoiceSink for Vec<(u8, VoiceCommand)> {
    fn dispatch(&mut self, voice: u8, command: VoiceCommand) {
        self.push((voice, command));
    }
}
