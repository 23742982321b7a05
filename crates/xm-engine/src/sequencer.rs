//! Transport state machine: walks the order table one tick at a time.

use alloc::sync::Arc;

use tracing::debug;
use xm_ir::{Module, Note, MAX_CHANNELS, NO_EFFECT};

use crate::channel::{ChannelContext, ChannelState, Globals};
use crate::frequency::{tick_duration_ms, LinearFrequencyTable};
use crate::voice::VoiceSink;

/// Note used for cells outside the pattern.
const EMPTY_NOTE: Note = Note {
    note: 0,
    instrument: 0,
    volume: 0,
    fx_type: NO_EFFECT,
    fx_param: 0,
};

/// Playback behaviour switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerOptions {
    /// Jump to the module's restart position instead of ending after the
    /// last order entry.
    pub restart_at_end: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Playing,
}

/// Where playback is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub order: u16,
    /// Pattern at `order`, or `None` once the song has ended
    pub pattern: Option<u8>,
    pub row: u16,
    pub tick: u32,
}

/// One playback session over a module.
pub struct PlayerState {
    module: Arc<Module>,
    channels: heapless::Vec<ChannelState, { MAX_CHANNELS as usize }>,
    frequencies: LinearFrequencyTable,
    globals: Globals,
    order: u16,
    row: u16,
    transport: Transport,
    options: PlayerOptions,
}

impl PlayerState {
    /// Start a session with default options.
    pub fn new(module: impl Into<Arc<Module>>) -> Self {
        Self::with_options(module, PlayerOptions::default())
    }

    pub fn with_options(module: impl Into<Arc<Module>>, options: PlayerOptions) -> Self {
        let module = module.into();

        let mut channels = heapless::Vec::new();
        for _ in 0..module.channel_count.min(MAX_CHANNELS) {
            if channels.push(ChannelState::new()).is_err() {
                break;
            }
        }

        let globals = Globals::new(module.default_tempo, module.default_bpm);
        debug!(
            channels = channels.len(),
            tempo = globals.tempo,
            bpm = globals.bpm,
            "player session started"
        );

        Self {
            module,
            channels,
            frequencies: LinearFrequencyTable::new(),
            globals,
            order: 0,
            row: 0,
            transport: Transport::Playing,
            options,
        }
    }

    /// Run one tick: a row update on the first tick of a row, effect
    /// updates otherwise.
    ///
    /// Does nothing once stopped or past the end of the song.
    pub fn advance_tick<S: VoiceSink>(&mut self, sink: &mut S) {
        if self.transport == Transport::Stopped || self.is_finished() {
            return;
        }

        if self.globals.row_tick() == 0 {
            self.row_update(sink);
        } else {
            self.tick_update(sink);
        }
        self.globals.tick = self.globals.tick.wrapping_add(1);
    }

    fn row_update<S: VoiceSink>(&mut self, sink: &mut S) {
        let module = &*self.module;
        let Some(pattern) = module.pattern_at(self.order) else {
            debug!(order = self.order, "order entry has no pattern, stopping");
            self.transport = Transport::Stopped;
            return;
        };

        let channel_count = module.channel_count;
        let mut ctx = ChannelContext {
            module,
            frequencies: &self.frequencies,
            globals: &mut self.globals,
        };
        for (index, channel) in self.channels.iter_mut().enumerate() {
            let note = pattern
                .note(self.row, index as u16, channel_count)
                .copied()
                .unwrap_or(EMPTY_NOTE);
            channel.row_update(index as u8, &note, &mut ctx, sink);
        }

        let rows = pattern.rows;
        match self.globals.pattern_break.take() {
            Some(row) => {
                self.jump_to_order(self.order + 1);
                let next_rows = self.module.pattern_at(self.order).map_or(0, |p| p.rows);
                self.row = if (row as u16) < next_rows { row as u16 } else { 0 };
            }
            None => {
                self.row += 1;
                if self.row >= rows {
                    self.row = 0;
                    self.jump_to_order(self.order + 1);
                }
            }
        }
    }

    fn tick_update<S: VoiceSink>(&mut self, sink: &mut S) {
        let mut ctx = ChannelContext {
            module: &self.module,
            frequencies: &self.frequencies,
            globals: &mut self.globals,
        };
        for (index, channel) in self.channels.iter_mut().enumerate() {
            channel.tick_update(index as u8, &mut ctx, sink);
        }
    }

    fn jump_to_order(&mut self, order: u16) {
        let module = &*self.module;
        self.order = if order >= module.song_length && self.options.restart_at_end {
            module.restart_position
        } else {
            order
        };

        match module.order.get(self.order as usize) {
            Some(pattern) if self.order < module.song_length => {
                debug!(order = self.order, pattern, "playing pattern");
            }
            _ => debug!(order = self.order, "end of song"),
        }
    }

    /// Wall-clock length of one tick at the current BPM.
    pub fn current_tick_duration_ms(&self) -> u32 {
        tick_duration_ms(self.globals.bpm)
    }

    /// Stop playback. Later ticks are no-ops.
    pub fn stop(&mut self) {
        if self.transport == Transport::Playing {
            debug!(order = self.order, row = self.row, "playback stopped");
        }
        self.transport = Transport::Stopped;
    }

    /// True once the order position has run past the song.
    pub fn is_finished(&self) -> bool {
        self.order >= self.module.song_length
    }

    pub fn position(&self) -> Position {
        let pattern = if self.is_finished() {
            None
        } else {
            self.module.order.get(self.order as usize).copied()
        };
        Position {
            order: self.order,
            pattern,
            row: self.row,
            tick: self.globals.tick,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn channels(&self) -> &[ChannelState] {
        &self.channels
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn options(&self) -> PlayerOptions {
        self.options
    }

    pub fn tempo(&self) -> u16 {
        self.globals.tempo
    }

    pub fn bpm(&self) -> u16 {
        self.globals.bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::VoiceCommand;
    use alloc::vec;
    use alloc::vec::Vec;
    use xm_ir::{Instrument, Pattern, Sample};

    type Log = Vec<(u8, VoiceCommand)>;

    fn song(order: &[u8], rows: u16) -> Module {
        let mut m = Module::new("seq", 2);
        m.default_tempo = 2;
        m.add_pattern(Pattern::new(rows, 2));
        m.add_pattern(Pattern::new(rows, 2));
        m.set_order(order);
        m.add_instrument(Instrument::with_sample(Sample::from_pcm8(vec![1; 16])));
        m
    }

    fn run(player: &mut PlayerState, ticks: usize) -> Log {
        let mut log = Log::new();
        for _ in 0..ticks {
            player.advance_tick(&mut log);
        }
        log
    }

    #[test]
    fn session_starts_with_module_defaults() {
        let player = PlayerState::new(song(&[0], 4));
        assert_eq!(player.channels().len(), 2);
        assert_eq!(player.tempo(), 2);
        assert_eq!(player.bpm(), 125);
        assert_eq!(player.globals().global_volume, 64);
        assert_eq!(player.transport(), Transport::Playing);
        assert_eq!(player.current_tick_duration_ms(), 20);
        assert_eq!(
            player.position(),
            Position { order: 0, pattern: Some(0), row: 0, tick: 0 }
        );
    }

    #[test]
    fn zero_tempo_is_treated_as_one() {
        let mut m = song(&[0], 4);
        m.default_tempo = 0;
        let player = PlayerState::new(m);
        assert_eq!(player.tempo(), 1);
    }

    #[test]
    fn rows_advance_every_tempo_ticks() {
        let mut player = PlayerState::new(song(&[0, 1], 3));
        run(&mut player, 1);
        assert_eq!(player.position().row, 1);
        run(&mut player, 1);
        assert_eq!(player.position().row, 1);
        run(&mut player, 4);
        assert_eq!(player.position().order, 1);
        assert_eq!(player.position().pattern, Some(1));
        assert_eq!(player.position().row, 0);
    }

    #[test]
    fn song_end_makes_ticks_no_ops() {
        let mut player = PlayerState::new(song(&[0], 2));
        run(&mut player, 4);
        assert!(player.is_finished());
        assert_eq!(player.position().pattern, None);

        let tick = player.position().tick;
        let log = run(&mut player, 10);
        assert!(log.is_empty());
        assert_eq!(player.position().tick, tick);
    }

    #[test]
    fn restart_option_wraps_to_restart_position() {
        let mut m = song(&[0, 1], 1);
        m.restart_position = 1;
        let options = PlayerOptions { restart_at_end: true };
        let mut player = PlayerState::with_options(m, options);

        run(&mut player, 4);
        assert!(!player.is_finished());
        assert_eq!(player.position().order, 1);
        run(&mut player, 20);
        assert_eq!(player.position().order, 1);
    }

    #[test]
    fn pattern_break_jumps_to_row_of_next_order() {
        let mut m = song(&[0, 1], 8);
        let cell = m.patterns[0].note_mut(1, 1, 2).unwrap();
        cell.fx_type = 0x0D;
        cell.fx_param = 5;
        let mut player = PlayerState::new(m);

        run(&mut player, 4);
        let pos = player.position();
        assert_eq!((pos.order, pos.row), (1, 5));
    }

    #[test]
    fn pattern_break_past_next_pattern_starts_at_row_zero() {
        let mut m = song(&[0, 1], 4);
        let cell = m.patterns[0].note_mut(0, 0, 2).unwrap();
        cell.fx_type = 0x0D;
        cell.fx_param = 0x40;
        let mut player = PlayerState::new(m);

        run(&mut player, 1);
        assert_eq!((player.position().order, player.position().row), (1, 0));
    }

    #[test]
    fn stop_freezes_transport() {
        let mut player = PlayerState::new(song(&[0], 8));
        run(&mut player, 3);
        player.stop();
        let before = player.position();
        let log = run(&mut player, 5);
        assert!(log.is_empty());
        assert_eq!(player.position(), before);
        assert_eq!(player.transport(), Transport::Stopped);
    }

    #[test]
    fn order_entry_without_pattern_stops() {
        let mut m = song(&[0], 4);
        m.order = vec![9];
        let mut player = PlayerState::new(m);
        let log = run(&mut player, 3);
        assert!(log.is_empty());
        assert_eq!(player.transport(), Transport::Stopped);
    }

    #[test]
    fn ticks_reach_every_channel() {
        let mut m = song(&[0], 4);
        let cell = m.patterns[0].note_mut(0, 1, 2).unwrap();
        cell.note = 49;
        cell.instrument = 1;
        let mut player = PlayerState::new(m);

        let log = run(&mut player, 1);
        assert!(log
            .iter()
            .any(|(v, c)| *v == 1 && matches!(c, VoiceCommand::Trigger { .. })));
        assert!(log.iter().all(|(v, c)| *v == 1 || !matches!(c, VoiceCommand::Trigger { .. })));
    }
}
