//! Runtime evaluator for instrument envelopes.

use xm_ir::Envelope;

/// Progress through one envelope on one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeState {
    /// Frames elapsed since the note started
    pub frame: u16,
    /// Index of the control point at or before `frame`
    pub pos: u8,
    /// Last computed value (0-64)
    pub value: u16,
    /// Mirrors the envelope's enabled flag as of the last step
    pub active: bool,
}

impl EnvelopeState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Evaluate the envelope at the current frame and advance one frame.
    ///
    /// Returns `false` when the envelope is disabled, in which case the
    /// state is marked inactive and nothing else changes.
    pub fn step(&mut self, envelope: &Envelope) -> bool {
        let points = &envelope.points;
        self.active = envelope.enabled() && !points.is_empty();
        if !self.active {
            return false;
        }
        let last = points.len() - 1;

        if envelope.has_loop() && self.pos >= envelope.loop_end {
            self.pos = envelope.loop_start;
            if let Some(p) = points.get(self.pos as usize) {
                self.frame = p.frame;
            }
        }

        if self.pos as usize >= last {
            self.pos = last as u8;
            self.value = points[last].value;
            return true;
        }

        // Key-off does not release the sustain point.
        if envelope.has_sustain() && self.pos >= envelope.sustain_point {
            let sustain = (envelope.sustain_point as usize).min(last);
            self.pos = sustain as u8;
            self.value = points[sustain].value;
            return true;
        }

        let current = points[self.pos as usize];
        let next = points[self.pos as usize + 1];

        let span = next.frame as i32 - current.frame as i32;
        self.value = if span <= 0 {
            next.value
        } else {
            let t = (self.frame as i32 - current.frame as i32).clamp(0, span);
            let delta = next.value as i32 - current.value as i32;
            (current.value as i32 + delta * t / span) as u16
        };

        self.frame = self.frame.saturating_add(1);
        if self.frame >= next.frame {
            self.pos += 1;
        }
        true
    }
}
