//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use tracing::{error, info};

use crate::mixer::Mixer;
use crate::queue::CommandReceiver;
use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output. The mixer runs inside the device callback.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl CpalOutput {
    /// Open the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The callback writes interleaved stereo
        config.channels = 2;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            "audio device opened"
        );

        Ok(Self {
            device,
            config,
            stream: None,
        })
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self, mut mixer: Mixer, mut commands: CommandReceiver) -> Result<(), AudioError> {
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    commands.drain_into(&mut mixer);
                    for chunk in data.chunks_mut(channels) {
                        let (left, right) = mixer.render_frame().to_f32();
                        for (i, sample) in chunk.iter_mut().enumerate() {
                            *sample = match i {
                                0 => left,
                                1 => right,
                                _ => 0.0,
                            };
                        }
                    }
                },
                |err| error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
