//! Allocation-free realtime path tests.
//!
//! These tests verify that sequencer ticks, command handoff and mixing do
//! not allocate once playback is running. The song loops so that every row
//! and order change is exercised several times.
//!
//! Just run `cargo test`; no feature flags needed.

use std::path::PathBuf;
use std::sync::Arc;

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use xm_audio::{command_queue, Mixer};
use xm_engine::{PlayerOptions, PlayerState};
use xm_ir::Module;

fn load_fixture(name: &str) -> Arc<Module> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/xm")
        .join(name);
    Arc::new(xm_formats::load(&path).unwrap())
}

fn looping_player(module: &Arc<Module>) -> PlayerState {
    PlayerState::with_options(module.clone(), PlayerOptions { restart_at_end: true })
}

#[test]
fn queued_playback_alloc_free() {
    let module = load_fixture("tiny.xm");
    let mut player = looping_player(&module);
    let mut mixer = Mixer::new(module, 44100);
    let (mut commands, mut receiver) = command_queue(1024);

    // One pass through the song registers every log callsite.
    for _ in 0..64 {
        player.advance_tick(&mut commands);
        receiver.drain_into(&mut mixer);
    }

    assert_no_alloc(|| {
        for _ in 0..500 {
            player.advance_tick(&mut commands);
            receiver.drain_into(&mut mixer);
            for _ in 0..882 {
                mixer.render_frame();
            }
        }
    });
    assert_eq!(commands.take_dropped(), 0);
}

#[test]
fn direct_mixer_playback_alloc_free() {
    let module = load_fixture("tiny.xm");
    let mut player = looping_player(&module);
    let mut mixer = Mixer::new(module, 22050);

    for _ in 0..64 {
        player.advance_tick(&mut mixer);
    }

    assert_no_alloc(|| {
        for _ in 0..500 {
            player.advance_tick(&mut mixer);
            for _ in 0..441 {
                mixer.render_frame();
            }
        }
    });
}
