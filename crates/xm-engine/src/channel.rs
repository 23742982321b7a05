//! Channel state for tracker playback.
//!
//! A channel latches the effect of the current row, keeps per-effect memory
//! between rows, and collects pending outputs in a [`NoteControl`] set that
//! is flushed to the voice sink at the end of every row or tick update.

use tracing::trace;
use xm_ir::{
    Effect, ExtendedEffect, Instrument, LoopType, Module, Note, Pitch, SampleRef, VolumeCommand,
};

use crate::envelope_state::EnvelopeState;
use crate::frequency::{note_to_period, LinearFrequencyTable};
use crate::voice::{VoiceCommand, VoiceSink};

/// Quarter-wave sine used for vibrato, indexed by |phase|.
const SINE_TABLE: [u8; 32] = [
    0, 24, 49, 74, 97, 120, 141, 161, 180, 197, 212, 224, 235, 244, 250, 253, 255, 253, 250,
    244, 235, 224, 212, 197, 180, 161, 141, 120, 97, 74, 49, 24,
];

/// Fade-out level of a note that has not been released.
pub const MAX_FADEOUT: u16 = 65535;

/// Envelope value meaning "no panning offset".
const PAN_ENVELOPE_CENTER: i32 = 32;

/// Outputs waiting to be sent to the voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteControl(u8);

impl NoteControl {
    pub const TRIGGER: u8 = 0x01;
    pub const STOP: u8 = 0x02;
    pub const FREQ: u8 = 0x04;
    pub const VOLUME: u8 = 0x08;
    pub const PANNING: u8 = 0x10;

    pub fn set(&mut self, flags: u8) {
        self.0 |= flags;
    }

    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Song-wide values that channel effects can change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Globals {
    /// Ticks per row, never 0
    pub tempo: u16,
    pub bpm: u16,
    /// 0-64
    pub global_volume: u8,
    /// Absolute tick counter
    pub tick: u32,
    /// Row to start the next order at, set by a pattern break
    pub pattern_break: Option<u8>,
}

impl Globals {
    pub fn new(tempo: u16, bpm: u16) -> Self {
        Self {
            tempo: tempo.max(1),
            bpm,
            global_volume: 64,
            tick: 0,
            pattern_break: None,
        }
    }

    /// Tick index within the current row.
    pub fn row_tick(&self) -> u32 {
        self.tick % self.tempo.max(1) as u32
    }
}

/// Everything a channel reads or writes outside itself during an update.
pub struct ChannelContext<'a> {
    pub module: &'a Module,
    pub frequencies: &'a LinearFrequencyTable,
    pub globals: &'a mut Globals,
}

/// Playback state of one module channel.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelState {
    /// Linear period (0-7680)
    pub period: u16,
    /// Channel volume (0-64)
    pub volume: u8,
    /// Channel panning (0-255)
    pub panning: u8,
    /// Current note, 0-based
    pub note: u8,
    /// Current instrument, 0-based
    pub instrument: u8,
    /// Sample resolved from instrument and note
    pub sample: Option<SampleRef>,
    /// Start offset remembered from the last `9xx`
    pub sample_offset: u32,

    /// Latched effect of the current row
    pub effect: Effect,

    pub volume_envelope: EnvelopeState,
    pub panning_envelope: EnvelopeState,

    pub tone_porta_target: u16,
    pub tone_porta_speed: u8,

    /// Vibrato phase, -32..=31
    pub vibrato_pos: i8,
    pub vibrato_speed: u8,
    pub vibrato_depth: u8,
    /// Period offset from the last vibrato step
    pub vibrato_delta: i16,

    /// Remaining fade-out level (0-65535)
    pub fadeout: u16,
    /// Set by key-off until the next real note
    pub key_off: bool,

    pub control: NoteControl,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelState {
    pub fn new() -> Self {
        let mut control = NoteControl::default();
        control.set(NoteControl::VOLUME | NoteControl::PANNING);
        Self {
            period: 0,
            volume: 64,
            panning: 0x80,
            note: 0,
            instrument: 0,
            sample: None,
            sample_offset: 0,
            effect: Effect::None,
            volume_envelope: EnvelopeState::default(),
            panning_envelope: EnvelopeState::default(),
            tone_porta_target: 0,
            tone_porta_speed: 0,
            vibrato_pos: 0,
            vibrato_speed: 0,
            vibrato_depth: 0,
            vibrato_delta: 0,
            fadeout: MAX_FADEOUT,
            key_off: false,
            control,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Process the first tick of a row.
    pub fn row_update<S: VoiceSink>(
        &mut self,
        voice: u8,
        note: &Note,
        ctx: &mut ChannelContext<'_>,
        sink: &mut S,
    ) {
        let module = ctx.module;
        self.control.clear();
        self.effect = note.effect();

        let tone_porta = self.effect.is_tone_porta();
        let delayed = self.effect.note_delay().is_some();
        let pitch = note.pitch();
        let row_note = match pitch {
            Pitch::On(n) => Some(n),
            _ => None,
        };

        if note.instrument != 0 && !tone_porta {
            self.instrument = note.instrument - 1;
        }

        if let Some(n) = row_note {
            if !tone_porta {
                self.note = n - 1;
                self.fadeout = MAX_FADEOUT;
                self.key_off = false;
                self.volume_envelope.reset();
                self.panning_envelope.reset();
            }
        }

        if pitch == Pitch::KeyOff || matches!(self.effect, Effect::KeyOff(_)) {
            self.key_off = true;
        }

        let instrument = module.instruments.get(self.instrument as usize);
        self.sample = instrument
            .and_then(|inst| inst.sample_for_note(self.note))
            .map(|sample| SampleRef {
                instrument: self.instrument,
                sample,
            });

        match self.sample.and_then(|r| module.sample(r)) {
            None => self.control.set(NoteControl::STOP),
            Some(sample) => {
                self.panning = sample.panning;
                self.volume = sample.volume.min(64);
                if !delayed {
                    self.control.set(NoteControl::PANNING | NoteControl::VOLUME);
                }

                if let Some(n) = row_note {
                    let effective = n as i32 + sample.relative_note as i32 - 1;
                    let period = note_to_period(effective, sample.finetune);
                    if tone_porta {
                        self.tone_porta_target = period;
                    } else {
                        self.period = period;
                        if !delayed {
                            self.control.set(NoteControl::FREQ | NoteControl::TRIGGER);
                        }
                    }
                }
            }
        }

        if let Some(inst) = instrument {
            self.step_envelopes(inst);
            self.apply_fadeout(inst);
        }

        match note.volume_command() {
            VolumeCommand::Volume(v) => {
                self.volume = v;
                self.control.set(NoteControl::VOLUME);
            }
            VolumeCommand::None => {}
            other => trace!(voice, command = ?other, "volume column command ignored"),
        }

        self.row_effect(voice, ctx.globals);
        self.flush(voice, ctx, sink);
    }

    /// Process a tick that is not the first of its row.
    pub fn tick_update<S: VoiceSink>(
        &mut self,
        voice: u8,
        ctx: &mut ChannelContext<'_>,
        sink: &mut S,
    ) {
        if let Some(inst) = ctx.module.instruments.get(self.instrument as usize) {
            self.step_envelopes(inst);
            self.apply_fadeout(inst);
        }

        match self.effect {
            Effect::VolumeSlide { up, down } => self.volume_slide(up, down),
            Effect::TonePorta(_) => self.tone_porta(),
            Effect::Vibrato { .. } => self.vibrato(),
            Effect::Extended(ExtendedEffect::NoteDelay(ticks)) => {
                if ctx.globals.row_tick() % 16 == ticks as u32 {
                    self.control.set(
                        NoteControl::TRIGGER
                            | NoteControl::FREQ
                            | NoteControl::VOLUME
                            | NoteControl::PANNING,
                    );
                }
            }
            _ => {}
        }

        self.flush(voice, ctx, sink);
    }

    fn row_effect(&mut self, voice: u8, globals: &mut Globals) {
        match self.effect {
            Effect::SetSpeed(ticks) => {
                if ticks > 0 {
                    globals.tempo = ticks as u16;
                }
            }
            Effect::SetBpm(bpm) => globals.bpm = bpm as u16,
            Effect::SetVolume(v) => {
                self.volume = v.min(64);
                self.control.set(NoteControl::VOLUME);
            }
            Effect::SetGlobalVolume(v) => globals.global_volume = v.min(64),
            Effect::SetPanning(p) => {
                self.panning = p;
                self.control.set(NoteControl::PANNING);
            }
            Effect::PatternBreak(row) => globals.pattern_break = Some(row),
            Effect::TonePorta(speed) => {
                if speed > 0 {
                    self.tone_porta_speed = speed;
                }
            }
            Effect::SampleOffset(p) => {
                if p > 0 {
                    self.sample_offset = (p as u32) << 8;
                }
            }
            Effect::Vibrato { speed, depth } => {
                if speed != 0 || depth != 0 {
                    self.vibrato_pos = 0;
                    self.vibrato_speed = speed;
                    self.vibrato_depth = depth;
                    self.vibrato_delta = 0;
                }
            }
            // Handled at row start or on later ticks.
            Effect::None
            | Effect::VolumeSlide { .. }
            | Effect::KeyOff(_)
            | Effect::Extended(ExtendedEffect::NoteDelay(_)) => {}
            other => trace!(voice, effect = ?other, "unhandled effect"),
        }
    }

    fn step_envelopes(&mut self, inst: &Instrument) {
        if self.volume_envelope.step(&inst.volume_envelope) {
            self.control.set(NoteControl::VOLUME);
        }
        if self.panning_envelope.step(&inst.panning_envelope) {
            self.control.set(NoteControl::PANNING);
        }
    }

    fn apply_fadeout(&mut self, inst: &Instrument) {
        if self.key_off && self.volume_envelope.active && self.fadeout > 0 {
            self.fadeout = self.fadeout.saturating_sub(inst.fadeout);
            self.control.set(NoteControl::VOLUME);
        }
    }

    /// High nibble slides up; the low nibble only counts when it is zero.
    fn volume_slide(&mut self, up: u8, down: u8) {
        if up > 0 {
            self.volume = (self.volume + up).min(64);
        } else if down > 0 {
            self.volume = self.volume.saturating_sub(down);
        }
        self.control.set(NoteControl::VOLUME);
    }

    fn tone_porta(&mut self) {
        let target = self.tone_porta_target;
        if target == 0 {
            return;
        }
        let step = (self.tone_porta_speed as u16) << 2;
        if self.period < target {
            self.period = self.period.saturating_add(step).min(target);
        } else if self.period > target {
            self.period = self.period.saturating_sub(step).max(target);
        }
        self.control.set(NoteControl::FREQ);
    }

    fn vibrato(&mut self) {
        let pos = self.vibrato_pos as i16;
        let mut delta =
            SINE_TABLE[(pos.unsigned_abs() % 32) as usize] as i16 * self.vibrato_depth as i16 / 4;
        if pos < 0 {
            delta = -delta;
        }
        self.vibrato_delta = delta;

        let mut next = pos + self.vibrato_speed as i16;
        if next > 31 {
            next -= 64;
        }
        self.vibrato_pos = next as i8;
        self.control.set(NoteControl::FREQ);
    }

    /// Period sent to the voice, including the vibrato offset while
    /// vibrato is the latched effect.
    pub fn output_period(&self) -> i32 {
        let vibrato = match self.effect {
            Effect::Vibrato { .. } => self.vibrato_delta as i32,
            _ => 0,
        };
        self.period as i32 + vibrato
    }

    /// `global/64 × volume/64 × fadeout/65535 × envelope/64`.
    pub fn final_volume(&self, global_volume: u8) -> f32 {
        let mut v = global_volume as f32 / 64.0;
        v *= self.volume as f32 / 64.0;
        v *= self.fadeout as f32 / MAX_FADEOUT as f32;
        if self.volume_envelope.active {
            v *= self.volume_envelope.value as f32 / 64.0;
        }
        v.clamp(0.0, 1.0)
    }

    /// Channel panning moved by the panning envelope, scaled by the room
    /// left toward the nearer edge.
    pub fn final_panning(&self) -> u8 {
        let pan = self.panning as i32;
        let env = if self.panning_envelope.active {
            self.panning_envelope.value as i32
        } else {
            PAN_ENVELOPE_CENTER
        };
        let swing = (env - PAN_ENVELOPE_CENTER) * (128 - (pan - 128).abs()) / 32;
        (pan + swing).clamp(0, 255) as u8
    }

    fn flush<S: VoiceSink>(&mut self, voice: u8, ctx: &ChannelContext<'_>, sink: &mut S) {
        let control = self.control;

        if control.contains(NoteControl::TRIGGER) {
            if let Some((r, sample)) = self.sample.and_then(|r| ctx.module.sample(r).map(|s| (r, s)))
            {
                let offset = match self.effect {
                    Effect::SampleOffset(_) => self.sample_offset,
                    _ => 0,
                };
                sink.dispatch(
                    voice,
                    VoiceCommand::Trigger {
                        sample: r,
                        depth: sample.bit_depth(),
                        length: sample.length,
                        offset,
                    },
                );
                let (mode, start, end) = match sample.loop_bounds() {
                    Some((start, end)) => (sample.loop_type(), start, end),
                    None => (LoopType::None, 0, 0),
                };
                sink.dispatch(voice, VoiceCommand::SetLoop { mode, start, end });
            }
        }
        if control.contains(NoteControl::STOP) {
            sink.dispatch(voice, VoiceCommand::Stop);
        }
        if control.contains(NoteControl::FREQ) {
            let hz = ctx.frequencies.frequency(self.output_period());
            sink.dispatch(voice, VoiceCommand::SetFrequency(hz));
        }
        if control.contains(NoteControl::VOLUME) {
            let volume = self.final_volume(ctx.globals.global_volume);
            sink.dispatch(voice, VoiceCommand::SetVolume(volume));
        }
        if control.contains(NoteControl::PANNING) {
            let pan = self.final_panning() as f32 / 255.0;
            sink.dispatch(voice, VoiceCommand::SetPanning(pan));
        }

        self.control.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use xm_ir::{Envelope, EnvelopeFlags, Instrument, Pattern, Sample};

    type Log = Vec<(u8, VoiceCommand)>;

    struct Rig {
        module: Module,
        table: LinearFrequencyTable,
        globals: Globals,
    }

    impl Rig {
        fn new(module: Module) -> Self {
            Self {
                module,
                table: LinearFrequencyTable::new(),
                globals: Globals::new(6, 125),
            }
        }

        fn row(&mut self, ch: &mut ChannelState, note: Note) -> Log {
            let mut log = Log::new();
            let mut ctx = ChannelContext {
                module: &self.module,
                frequencies: &self.table,
                globals: &mut self.globals,
            };
            ch.row_update(0, &note, &mut ctx, &mut log);
            self.globals.tick += 1;
            log
        }

        fn tick(&mut self, ch: &mut ChannelState) -> Log {
            let mut log = Log::new();
            let mut ctx = ChannelContext {
                module: &self.module,
                frequencies: &self.table,
                globals: &mut self.globals,
            };
            ch.tick_update(0, &mut ctx, &mut log);
            self.globals.tick += 1;
            log
        }
    }

    fn module() -> Module {
        let mut m = Module::new("t", 1);
        m.add_pattern(Pattern::new(4, 1));
        m.set_order(&[0]);
        let mut sample = Sample::from_pcm8(vec![0; 100]);
        sample.volume = 40;
        sample.panning = 100;
        sample.set_loop(LoopType::Forward, 10, 50);
        m.add_instrument(Instrument::with_sample(sample));
        m
    }

    fn note(n: u8, inst: u8, fx_type: u8, fx_param: u8) -> Note {
        let mut note = Note { note: n, instrument: inst, volume: 0, fx_type, fx_param };
        note.disambiguate_effect();
        note
    }

    fn commands(log: &Log) -> Vec<VoiceCommand> {
        log.iter().map(|(_, c)| *c).collect()
    }

    #[test]
    fn note_triggers_in_flag_order() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        let log = rig.row(&mut ch, note(49, 1, 0, 0));

        let sample = SampleRef { instrument: 0, sample: 0 };
        assert_eq!(
            commands(&log),
            vec![
                VoiceCommand::Trigger { sample, depth: xm_ir::BitDepth::Eight, length: 100, offset: 0 },
                VoiceCommand::SetLoop { mode: LoopType::Forward, start: 10, end: 60 },
                VoiceCommand::SetFrequency(8363),
                VoiceCommand::SetVolume(40.0 / 64.0),
                VoiceCommand::SetPanning(100.0 / 255.0),
            ]
        );
        assert_eq!(ch.period, 4608);
        assert_eq!(ch.note, 48);
    }

    #[test]
    fn relative_note_and_finetune_shift_period() {
        let mut m = module();
        m.instruments[0].samples[0].relative_note = 12;
        m.instruments[0].samples[0].finetune = -8;
        let mut rig = Rig::new(m);
        let mut ch = ChannelState::new();
        rig.row(&mut ch, note(49, 1, 0, 0));
        assert_eq!(ch.period, 7680 - 64 * 60 + 4);
    }

    #[test]
    fn missing_instrument_stops_voice() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        let log = rig.row(&mut ch, note(49, 5, 0, 0));
        assert_eq!(commands(&log), vec![VoiceCommand::Stop]);
        assert_eq!(ch.sample, None);
    }

    #[test]
    fn sample_offset_reaches_trigger() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        let log = rig.row(&mut ch, note(49, 1, 0x09, 0x02));
        match log[0].1 {
            VoiceCommand::Trigger { offset, .. } => assert_eq!(offset, 512),
            other => panic!("expected trigger, got {:?}", other),
        }
    }

    #[test]
    fn volume_column_overrides_sample_volume() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        let mut n = note(49, 1, 0, 0);
        n.volume = 0x30;
        let log = rig.row(&mut ch, n);
        assert_eq!(ch.volume, 0x20);
        assert!(log.contains(&(0, VoiceCommand::SetVolume(0.5))));
    }

    #[test]
    fn other_volume_column_ranges_are_ignored() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        let mut n = note(49, 1, 0, 0);
        n.volume = 0x65;
        rig.row(&mut ch, n);
        assert_eq!(ch.volume, 40);
    }

    #[test]
    fn tone_porta_sets_target_without_trigger() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        rig.row(&mut ch, note(49, 1, 0, 0));

        let log = rig.row(&mut ch, note(61, 1, 0x03, 0x10));
        assert!(!log.iter().any(|(_, c)| matches!(c, VoiceCommand::Trigger { .. })));
        assert_eq!(ch.period, 4608);
        assert_eq!(ch.tone_porta_target, 4608 - 768);
        assert_eq!(ch.tone_porta_speed, 0x10);
        assert_eq!(ch.note, 48);

        rig.tick(&mut ch);
        assert_eq!(ch.period, 4608 - 64);
        for _ in 0..20 {
            rig.tick(&mut ch);
        }
        assert_eq!(ch.period, 4608 - 768);
    }

    #[test]
    fn tone_porta_clamps_downward_too() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        ch.effect = Effect::TonePorta(0);
        ch.period = 1000;
        ch.tone_porta_target = 1010;
        ch.tone_porta_speed = 8;
        rig.tick(&mut ch);
        assert_eq!(ch.period, 1010);

        ch.tone_porta_target = 990;
        rig.tick(&mut ch);
        assert_eq!(ch.period, 990);
    }

    #[test]
    fn volume_slide_prefers_high_nibble() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        ch.volume = 60;
        ch.effect = Effect::VolumeSlide { up: 8, down: 4 };
        rig.tick(&mut ch);
        assert_eq!(ch.volume, 64);

        ch.effect = Effect::VolumeSlide { up: 0, down: 50 };
        rig.tick(&mut ch);
        assert_eq!(ch.volume, 14);
        rig.tick(&mut ch);
        assert_eq!(ch.volume, 0);
    }

    #[test]
    fn vibrato_follows_sine_and_wraps() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        rig.row(&mut ch, note(49, 1, 0x04, 0x88));
        assert_eq!((ch.vibrato_speed, ch.vibrato_depth, ch.vibrato_pos), (8, 8, 0));

        rig.tick(&mut ch);
        assert_eq!(ch.vibrato_delta, 0);
        assert_eq!(ch.vibrato_pos, 8);

        let log = rig.tick(&mut ch);
        assert_eq!(ch.vibrato_delta, 180 * 8 / 4);
        assert_eq!(ch.output_period(), 4608 + 360);
        let expected = rig.table.frequency(4608 + 360);
        assert!(log.contains(&(0, VoiceCommand::SetFrequency(expected))));

        rig.tick(&mut ch); // pos 16 -> 24
        rig.tick(&mut ch); // pos 24 -> 32 wraps to -32
        assert_eq!(ch.vibrato_pos, -32);
        rig.tick(&mut ch);
        assert_eq!(ch.vibrato_delta, 0);
        assert_eq!(ch.vibrato_pos, -24);
        rig.tick(&mut ch);
        assert_eq!(ch.vibrato_delta, -(180 * 8 / 4));
    }

    #[test]
    fn note_delay_holds_trigger_until_its_tick() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        let log = rig.row(&mut ch, note(49, 1, 0x0E, 0xD2));
        assert!(log.iter().all(|(_, c)| !matches!(c, VoiceCommand::Trigger { .. })));

        let log = rig.tick(&mut ch);
        assert!(log.iter().all(|(_, c)| !matches!(c, VoiceCommand::Trigger { .. })));

        let log = rig.tick(&mut ch);
        assert!(matches!(log[0].1, VoiceCommand::Trigger { .. }));
        assert!(log.iter().any(|(_, c)| matches!(c, VoiceCommand::SetFrequency(8363))));
    }

    #[test]
    fn key_off_fades_with_active_volume_envelope() {
        let mut m = module();
        m.instruments[0].volume_envelope = Envelope::from_points(&[(0, 64), (100, 64)]);
        m.instruments[0].fadeout = 20000;
        let mut rig = Rig::new(m);
        let mut ch = ChannelState::new();

        rig.row(&mut ch, note(49, 1, 0, 0));
        assert_eq!(ch.fadeout, MAX_FADEOUT);

        rig.row(&mut ch, note(97, 0, 0, 0));
        assert!(ch.key_off);
        assert_eq!(ch.fadeout, MAX_FADEOUT - 20000);

        for _ in 0..5 {
            rig.tick(&mut ch);
        }
        assert_eq!(ch.fadeout, 0);
        assert_eq!(ch.final_volume(64), 0.0);

        rig.row(&mut ch, note(49, 1, 0, 0));
        assert!(!ch.key_off);
        assert_eq!(ch.fadeout, MAX_FADEOUT);
    }

    #[test]
    fn key_off_effect_latches() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        rig.row(&mut ch, note(49, 1, 0x14, 0));
        assert!(ch.key_off);
        rig.row(&mut ch, note(0, 0, 0, 0));
        assert!(ch.key_off);
    }

    #[test]
    fn key_off_without_envelope_keeps_fadeout() {
        let mut m = module();
        m.instruments[0].fadeout = 20000;
        let mut rig = Rig::new(m);
        let mut ch = ChannelState::new();
        rig.row(&mut ch, note(49, 1, 0, 0));
        rig.row(&mut ch, note(97, 0, 0, 0));
        rig.tick(&mut ch);
        assert_eq!(ch.fadeout, MAX_FADEOUT);
    }

    #[test]
    fn panning_envelope_moves_pan() {
        let mut m = module();
        let mut env = Envelope::from_points(&[(0, 64)]);
        env.flags = EnvelopeFlags(EnvelopeFlags::ENABLED);
        m.instruments[0].panning_envelope = env;
        m.instruments[0].samples[0].panning = 128;
        let mut rig = Rig::new(m);
        let mut ch = ChannelState::new();
        rig.row(&mut ch, note(49, 1, 0, 0));

        assert!(ch.panning_envelope.active);
        assert_eq!(ch.final_panning(), 255);
    }

    #[test]
    fn panning_formula() {
        let mut ch = ChannelState::new();
        ch.panning = 128;
        assert_eq!(ch.final_panning(), 128);

        ch.panning_envelope.active = true;
        ch.panning_envelope.value = 0;
        assert_eq!(ch.final_panning(), 0);

        ch.panning = 192;
        ch.panning_envelope.value = 48;
        assert_eq!(ch.final_panning(), (192 + 16 * 64 / 32_i32) as u8);
    }

    #[test]
    fn volume_formula() {
        let mut ch = ChannelState::new();
        ch.volume = 32;
        assert_eq!(ch.final_volume(64), 0.5);
        assert_eq!(ch.final_volume(32), 0.25);
        ch.volume_envelope.active = true;
        ch.volume_envelope.value = 16;
        assert_eq!(ch.final_volume(64), 0.125);
    }

    #[test]
    fn global_effects_update_globals() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();

        rig.row(&mut ch, note(0, 0, 0x0F, 10));
        assert_eq!(rig.globals.tempo, 10);
        rig.row(&mut ch, note(0, 0, 0x0F, 140));
        assert_eq!(rig.globals.bpm, 140);
        rig.row(&mut ch, note(0, 0, 0x0F, 0));
        assert_eq!((rig.globals.tempo, rig.globals.bpm), (10, 140));

        rig.row(&mut ch, note(0, 0, 0x10, 80));
        assert_eq!(rig.globals.global_volume, 64);
        rig.row(&mut ch, note(0, 0, 0x0D, 5));
        assert_eq!(rig.globals.pattern_break, Some(5));
    }

    #[test]
    fn unhandled_effect_is_a_no_op() {
        let mut rig = Rig::new(module());
        let mut ch = ChannelState::new();
        rig.row(&mut ch, note(49, 1, 0x1D, 0x11));
        assert_eq!(ch.effect, Effect::Tremor { on: 1, off: 1 });

        let before = ch.clone();
        let log = rig.tick(&mut ch);
        assert!(log.is_empty());
        assert_eq!(ch, before);
    }
}
