//! Wall-clock tick pacing for realtime playback.

use xm_engine::{PlayerState, VoiceSink};

/// Runs sequencer ticks as wall-clock time passes.
///
/// Ticks are due while the time since the last tick boundary exceeds the
/// current tick duration. Each tick moves the boundary by the duration it
/// was waited for; the duration is then re-read, so a BPM change applies
/// from the following tick. Backlog beyond one tick is discarded.
#[derive(Clone, Copy, Debug)]
pub struct TickPacer {
    /// Time of the last tick boundary in milliseconds
    last: u64,
}

impl TickPacer {
    pub fn new(now_ms: u64) -> Self {
        Self { last: now_ms }
    }

    /// Run every tick due at `now_ms` and return how many ran.
    pub fn run_due<S: VoiceSink>(
        &mut self,
        now_ms: u64,
        player: &mut PlayerState,
        sink: &mut S,
    ) -> u32 {
        let mut duration = player.current_tick_duration_ms() as u64;
        let mut ran = 0;

        while now_ms.saturating_sub(self.last) > duration {
            player.advance_tick(sink);
            self.last += duration;
            duration = player.current_tick_duration_ms() as u64;
            ran += 1;
        }

        if now_ms.saturating_sub(self.last) > duration {
            self.last = now_ms - duration;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xm_engine::VoiceCommand;
    use xm_ir::{Module, Note, Pattern};

    fn player(bpm: u16) -> PlayerState {
        let mut m = Module::new("pace", 1);
        m.default_bpm = bpm;
        m.add_pattern(Pattern::new(64, 1));
        m.set_order(&[0]);
        PlayerState::new(m)
    }

    #[test]
    fn no_tick_before_duration_elapses() {
        let mut p = player(125);
        let mut pacer = TickPacer::new(1000);
        let mut log: Vec<(u8, VoiceCommand)> = Vec::new();
        assert_eq!(pacer.run_due(1020, &mut p, &mut log), 0);
        assert_eq!(pacer.run_due(1021, &mut p, &mut log), 1);
        assert_eq!(p.position().tick, 1);
    }

    #[test]
    fn catches_up_on_several_ticks() {
        let mut p = player(125);
        let mut pacer = TickPacer::new(0);
        let mut log: Vec<(u8, VoiceCommand)> = Vec::new();
        assert_eq!(pacer.run_due(101, &mut p, &mut log), 5);
    }

    #[test]
    fn bpm_change_applies_from_the_next_tick() {
        let mut m = Module::new("pace", 1);
        let mut pattern = Pattern::new(64, 1);
        pattern.notes[0] = Note { fx_type: 0x0F, fx_param: 250, ..Note::empty() };
        m.add_pattern(pattern);
        m.set_order(&[0]);
        let mut p = PlayerState::new(m);

        let mut pacer = TickPacer::new(0);
        let mut log: Vec<(u8, VoiceCommand)> = Vec::new();
        // The first tick sets 250 BPM but was itself 20 ms long.
        assert_eq!(pacer.run_due(21, &mut p, &mut log), 1);
        assert_eq!(p.current_tick_duration_ms(), 10);
        assert_eq!(pacer.run_due(30, &mut p, &mut log), 0);
        assert_eq!(pacer.run_due(31, &mut p, &mut log), 1);
        assert_eq!(p.position().tick, 2);
    }
}
