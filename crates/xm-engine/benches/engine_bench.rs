use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xm_engine::{PlayerOptions, PlayerState, VoiceCommand};
use xm_ir::{Instrument, Module, Note, Pattern, Sample};

/// 16 channels, every row busy, looping forever.
fn busy_module() -> Module {
    let channels = 16;
    let mut module = Module::new("bench", channels);
    let mut pattern = Pattern::new(64, channels);
    for (i, note) in pattern.notes.iter_mut().enumerate() {
        *note = Note {
            note: 25 + (i % 48) as u8,
            instrument: 1,
            volume: 0x40,
            fx_type: [0x04, 0x0A, 0x03, 0x0E][i % 4],
            fx_param: [0x46, 0x0F, 0x20, 0xD1][i % 4],
        };
    }
    module.add_pattern(pattern);
    module.set_order(&[0]);

    let mut instrument =
        Instrument::with_sample(Sample::from_pcm16((0..2048).map(|i| (i * 31) as i16).collect()));
    instrument.volume_envelope = xm_ir::Envelope::from_points(&[(0, 64), (20, 32), (200, 0)]);
    instrument.panning_envelope = xm_ir::Envelope::from_points(&[(0, 0), (50, 64)]);
    module.add_instrument(instrument);
    module
}

fn advance_tick(c: &mut Criterion) {
    let options = PlayerOptions { restart_at_end: true };
    let mut player = PlayerState::with_options(busy_module(), options);
    let mut log: Vec<(u8, VoiceCommand)> = Vec::with_capacity(1024);

    c.bench_function("advance_tick_16ch", |b| {
        b.iter(|| {
            log.clear();
            player.advance_tick(&mut log);
            black_box(log.len())
        })
    });
}

criterion_group!(benches, advance_tick);
criterion_main!(benches);
