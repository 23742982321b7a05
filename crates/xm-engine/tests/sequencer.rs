//! Sequencer scenarios driven through the public API.

use xm_engine::{tick_duration_ms, PlayerState, VoiceCommand};
use xm_ir::{Envelope, Instrument, LoopType, Module, Note, Pattern, Sample, SampleRef};

type Log = Vec<(u8, VoiceCommand)>;

fn cell(note: u8, instrument: u8, volume: u8, fx_type: u8, fx_param: u8) -> Note {
    let mut n = Note { note, instrument, volume, fx_type, fx_param };
    n.disambiguate_effect();
    n
}

fn module_with(rows: &[(u16, u16, Note)], channels: u16, pattern_rows: u16) -> Module {
    let mut module = Module::new("scenario", channels);
    let mut pattern = Pattern::new(pattern_rows, channels);
    for note in pattern.notes.iter_mut() {
        note.disambiguate_effect();
    }
    for &(row, ch, note) in rows {
        *pattern.note_mut(row, ch, channels).unwrap() = note;
    }
    module.add_pattern(pattern);
    module.set_order(&[0]);

    let mut sample = Sample::from_pcm8(vec![10; 64]);
    sample.set_loop(LoopType::PingPong, 8, 16);
    module.add_instrument(Instrument::with_sample(sample));
    module
}

fn ticks(player: &mut PlayerState, n: usize) -> Log {
    let mut log = Log::new();
    for _ in 0..n {
        player.advance_tick(&mut log);
    }
    log
}

#[test]
fn tempo_and_bpm_share_one_effect() {
    let module = module_with(
        &[(0, 0, cell(0, 0, 0, 0x0F, 10)), (1, 0, cell(0, 0, 0, 0x0F, 140))],
        1,
        4,
    );
    let mut player = PlayerState::new(module);
    assert_eq!(player.current_tick_duration_ms(), tick_duration_ms(125));

    ticks(&mut player, 1);
    assert_eq!(player.tempo(), 10);
    assert_eq!(player.current_tick_duration_ms(), 20);

    ticks(&mut player, 10);
    assert_eq!(player.bpm(), 140);
    assert_eq!(player.current_tick_duration_ms(), 1000 / (2 * 140 / 5));
}

#[test]
fn first_row_triggers_with_loop_and_levels() {
    let module = module_with(&[(0, 0, cell(49, 1, 0, 0, 0))], 1, 4);
    let mut player = PlayerState::new(module);
    let log = ticks(&mut player, 1);

    let commands: Vec<VoiceCommand> = log.iter().map(|(_, c)| *c).collect();
    assert_eq!(
        commands,
        vec![
            VoiceCommand::Trigger {
                sample: SampleRef { instrument: 0, sample: 0 },
                depth: xm_ir::BitDepth::Eight,
                length: 64,
                offset: 0,
            },
            VoiceCommand::SetLoop { mode: LoopType::PingPong, start: 8, end: 24 },
            VoiceCommand::SetFrequency(8363),
            VoiceCommand::SetVolume(1.0),
            VoiceCommand::SetPanning(128.0 / 255.0),
        ]
    );
}

#[test]
fn invalid_instrument_degrades_to_stop() {
    let module = module_with(&[(0, 0, cell(49, 7, 0, 0, 0))], 1, 4);
    let mut player = PlayerState::new(module);
    let log = ticks(&mut player, 1);
    assert_eq!(log, vec![(0, VoiceCommand::Stop)]);
}

#[test]
fn malformed_cells_never_panic() {
    let module = module_with(
        &[
            (0, 0, cell(200, 255, 0xFF, 0x30, 0xFF)),
            (1, 0, cell(97, 0, 0x9F, 0x0E, 0xFF)),
            (2, 0, cell(1, 1, 0, 0x09, 0xFF)),
            (3, 0, cell(96, 1, 0xF0, 0x21, 0x2F)),
        ],
        1,
        4,
    );
    let mut player = PlayerState::new(module);
    ticks(&mut player, 100);
    assert!(player.is_finished());
}

#[test]
fn finished_player_ignores_ticks() {
    let module = module_with(&[(0, 0, cell(49, 1, 0, 0, 0))], 1, 1);
    let mut player = PlayerState::new(module);
    ticks(&mut player, 6);
    assert!(player.is_finished());

    let position = player.position();
    let channels = player.channels().to_vec();
    let log = ticks(&mut player, 50);
    assert!(log.is_empty());
    assert_eq!(player.position(), position);
    assert_eq!(player.channels(), &channels[..]);
}

#[test]
fn tone_porta_glides_over_following_ticks() {
    let module = module_with(
        &[(0, 0, cell(49, 1, 0, 0, 0)), (1, 0, cell(50, 0, 0, 0x03, 0x08))],
        1,
        4,
    );
    let mut player = PlayerState::new(module);
    ticks(&mut player, 7);
    assert_eq!(player.channels()[0].period, 4608);
    assert_eq!(player.channels()[0].tone_porta_target, 4544);

    let log = ticks(&mut player, 2);
    assert_eq!(player.channels()[0].period, 4544);
    let freqs: Vec<u32> = log
        .iter()
        .filter_map(|(_, c)| match c {
            VoiceCommand::SetFrequency(hz) => Some(*hz),
            _ => None,
        })
        .collect();
    assert_eq!(freqs.len(), 2);
    assert!(freqs[0] > 8363);
    assert!(freqs[1] >= freqs[0]);
}

#[test]
fn key_off_fades_enveloped_note() {
    let mut module = module_with(
        &[(0, 0, cell(49, 1, 0, 0, 0)), (1, 0, cell(97, 0, 0, 0, 0))],
        1,
        8,
    );
    let inst = &mut module.instruments[0];
    inst.volume_envelope = Envelope::from_points(&[(0, 64), (4, 64)]);
    inst.fadeout = 0x2000;
    let mut player = PlayerState::new(module);

    ticks(&mut player, 6);
    assert_eq!(player.channels()[0].fadeout, 65535);
    ticks(&mut player, 1);
    assert!(player.channels()[0].key_off);
    let before = player.channels()[0].fadeout;
    ticks(&mut player, 3);
    assert!(player.channels()[0].fadeout < before);
}

#[test]
fn note_delay_triggers_mid_row() {
    let module = module_with(&[(1, 0, cell(49, 1, 0, 0x0E, 0xD3))], 1, 4);
    let mut player = PlayerState::new(module);
    ticks(&mut player, 6);

    let triggered_at = (0..6)
        .find(|_| {
            ticks(&mut player, 1)
                .iter()
                .any(|(_, c)| matches!(c, VoiceCommand::Trigger { .. }))
        })
        .unwrap();
    assert_eq!(triggered_at, 3);
}
