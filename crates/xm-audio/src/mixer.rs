//! Software mixer: one voice per module channel, summed to stereo.

use std::sync::Arc;

use xm_engine::{VoiceCommand, VoiceSink};
use xm_ir::{Module, SampleData};

use crate::frame::Frame;
use crate::voice::Voice;

static NO_DATA: SampleData = SampleData::Empty;

/// Renders the voices driven by a sequencer.
///
/// Holds the same module the sequencer plays so that `SampleRef`s in
/// trigger commands resolve to PCM data. All storage is allocated in
/// [`Mixer::new`]; commands and rendering never allocate.
pub struct Mixer {
    module: Arc<Module>,
    voices: Vec<Voice>,
    sample_rate: u32,
    /// 1/√channels
    gain: f32,
}

impl Mixer {
    pub fn new(module: Arc<Module>, sample_rate: u32) -> Self {
        let channels = module.channel_count.max(1) as usize;
        Self {
            voices: vec![Voice::default(); channels],
            gain: 1.0 / (channels as f32).sqrt(),
            module,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Apply one command to a voice. Out-of-range voice indices are ignored.
    pub fn apply(&mut self, voice: u8, command: VoiceCommand) {
        let sample_rate = self.sample_rate;
        let Some(v) = self.voices.get_mut(voice as usize) else {
            return;
        };
        match command {
            VoiceCommand::Trigger { sample, length, offset, .. } => {
                v.trigger(sample, length, offset)
            }
            VoiceCommand::Stop => v.stop(),
            VoiceCommand::SetVolume(volume) => v.volume = volume.clamp(0.0, 1.0),
            VoiceCommand::SetPanning(pan) => v.panning = pan.clamp(0.0, 1.0),
            VoiceCommand::SetFrequency(hz) => v.set_frequency(hz, sample_rate),
            VoiceCommand::SetSampleOffset(frames) => v.set_sample_offset(frames),
            VoiceCommand::SetLoop { mode, start, end } => v.set_loop(mode, start, end),
        }
    }

    /// Render and mix one stereo frame from all voices.
    pub fn render_frame(&mut self) -> Frame {
        let mut left = 0.0f32;
        let mut right = 0.0f32;
        for voice in self.voices.iter_mut() {
            let data = voice
                .sample
                .and_then(|r| self.module.sample(r))
                .map_or(&NO_DATA, |s| &s.data);
            let (l, r) = voice.render(data);
            left += l;
            right += r;
        }
        Frame::from_f32(left * self.gain, right * self.gain)
    }

    /// Fill `out` with rendered frames.
    pub fn render(&mut self, out: &mut [Frame]) {
        for frame in out.iter_mut() {
            *frame = self.render_frame();
        }
    }
}

impl VoiceSink for Mixer {
    fn dispatch(&mut self, voice: u8, command: VoiceCommand) {
        self.apply(voice, command);
    }
}
