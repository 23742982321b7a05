//! Headless controller for XM playback.
//!
//! Provides one API for loading a module, playing it in real time and
//! rendering it offline, shared by the CLI and tests.

mod pacer;
mod wav;

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use xm_audio::{command_queue, AudioError, AudioOutput, Mixer};
use xm_engine::{PlayerState, Transport};

// Re-export common types so callers don't need the lower crates directly.
pub use pacer::TickPacer;
pub use wav::{frames_to_wav, write_wav, WavHeader, WAV_HEADER_SIZE};
pub use xm_audio::Frame;
pub use xm_engine::{PlayerOptions, Position};
pub use xm_formats::{LoadError, LoadOptions};
pub use xm_ir::Module;

/// Commands buffered between the pacer thread and the audio callback.
const COMMAND_QUEUE_CAPACITY: usize = 4096;

const PACER_SLEEP: Duration = Duration::from_millis(1);

/// Offline render settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub sample_rate: u32,
    /// Upper bound on output length, for songs that loop or never end
    pub max_seconds: u32,
    pub player: PlayerOptions,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            max_seconds: 300,
            player: PlayerOptions::default(),
        }
    }
}

/// Headless controller: owns a module and manages playback.
pub struct Controller {
    module: Arc<Module>,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    position: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new(module: Module) -> Self {
        Self {
            module: Arc::new(module),
            playback: None,
        }
    }

    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, LoadError> {
        Ok(Self::new(xm_formats::load_with(path, options)?))
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    // --- Real-time playback ---

    /// Play on the default audio device.
    #[cfg(feature = "cpal")]
    pub fn play(&mut self, options: PlayerOptions) -> Result<(), AudioError> {
        self.play_with(xm_audio::CpalOutput::new, options)
    }

    /// Play on an output opened by `open` on the playback thread.
    ///
    /// Returns once the output has started, or with the error that kept it
    /// from starting.
    pub fn play_with<O, F>(&mut self, open: F, options: PlayerOptions) -> Result<(), AudioError>
    where
        O: AudioOutput + 'static,
        F: FnOnce() -> Result<O, AudioError> + Send + 'static,
    {
        self.stop();

        let module = self.module.clone();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let position = Arc::new(AtomicU64::new(0));
        let finished = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();

        let shared = Shared {
            stop_signal: stop_signal.clone(),
            position: position.clone(),
            finished: finished.clone(),
        };
        let thread = std::thread::spawn(move || {
            playback_thread(module, options, open, ready_tx, shared);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.playback = Some(PlaybackHandle {
                    stop_signal,
                    position,
                    finished,
                    thread: Some(thread),
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::Playback("playback thread exited".into()))
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    /// Position of the running playback, if any.
    pub fn position(&self) -> Option<Position> {
        let pb = self.playback.as_ref()?;
        if pb.finished.load(Ordering::Relaxed) {
            return None;
        }
        let (order, row, tick) = unpack_position(pb.position.load(Ordering::Relaxed));
        Some(Position {
            order,
            pattern: self.module.order.get(order as usize).copied(),
            row,
            tick,
        })
    }

    // --- Offline rendering ---

    /// Render until the song ends or `config.max_seconds` is reached.
    ///
    /// Each tick is followed by `sample_rate × tick_duration_ms / 1000`
    /// frames, using the duration in effect after the tick.
    pub fn render_frames(&self, config: &RenderConfig) -> Vec<Frame> {
        let mut player = PlayerState::with_options(self.module.clone(), config.player);
        let mut mixer = Mixer::new(self.module.clone(), config.sample_rate);
        let max_frames = config.sample_rate as usize * config.max_seconds as usize;

        let mut frames = Vec::new();
        while !player.is_finished()
            && player.transport() == Transport::Playing
            && frames.len() < max_frames
        {
            player.advance_tick(&mut mixer);
            let per_tick = (config.sample_rate as u64 * player.current_tick_duration_ms() as u64
                / 1000)
                .max(1) as usize;
            let count = per_tick.min(max_frames - frames.len());
            frames.extend((0..count).map(|_| mixer.render_frame()));
        }
        frames
    }

    pub fn render_to_wav(&self, config: &RenderConfig) -> Vec<u8> {
        let frames = self.render_frames(config);
        wav::frames_to_wav(&frames, config.sample_rate)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State shared between the controller and its playback thread.
struct Shared {
    stop_signal: Arc<AtomicBool>,
    position: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

fn playback_thread<O, F>(
    module: Arc<Module>,
    options: PlayerOptions,
    open: F,
    ready: mpsc::Sender<Result<(), AudioError>>,
    shared: Shared,
) where
    O: AudioOutput,
    F: FnOnce() -> Result<O, AudioError>,
{
    let started = open().and_then(|mut output| {
        let mixer = Mixer::new(module.clone(), output.sample_rate());
        let (commands, receiver) = command_queue(COMMAND_QUEUE_CAPACITY);
        output.start(mixer, receiver)?;
        Ok((output, commands))
    });
    let (mut output, mut commands) = match started {
        Ok(started) => started,
        Err(e) => {
            shared.finished.store(true, Ordering::Relaxed);
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    info!(module = module.name.as_str(), "playback started");

    let mut player = PlayerState::with_options(module, options);
    let clock = Instant::now();
    let mut pacer = TickPacer::new(0);

    while !shared.stop_signal.load(Ordering::Relaxed)
        && !player.is_finished()
        && player.transport() == Transport::Playing
    {
        let now = clock.elapsed().as_millis() as u64;
        if pacer.run_due(now, &mut player, &mut commands) > 0 {
            shared
                .position
                .store(pack_position(player.position()), Ordering::Relaxed);
            let dropped = commands.take_dropped();
            if dropped > 0 {
                warn!(dropped, "voice command queue full, commands dropped");
            }
        }
        std::thread::sleep(PACER_SLEEP);
    }

    if let Err(e) = output.stop() {
        error!(%e, "failed to stop audio output");
    }
    info!(finished = player.is_finished(), "playback stopped");
    shared.finished.store(true, Ordering::Relaxed);
}

fn pack_position(p: Position) -> u64 {
    (p.order as u64) << 48 | (p.row as u64) << 32 | p.tick as u64
}

fn unpack_position(v: u64) -> (u16, u16, u32) {
    ((v >> 48) as u16, (v >> 32) as u16, v as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_packing() {
        let p = Position { order: 3, pattern: Some(7), row: 63, tick: 123_456 };
        assert_eq!(unpack_position(pack_position(p)), (3, 63, 123_456));
    }

    #[test]
    fn render_config_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.max_seconds, 300);
        assert!(!config.player.restart_at_end);
    }
}
