//! Audio frame type.

/// A stereo audio frame (16-bit integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Convert a float pair in -1.0..1.0, clamping out-of-range values.
    pub fn from_f32(left: f32, right: f32) -> Self {
        Self {
            left: to_i16(left),
            right: to_i16(right),
        }
    }

    /// Float pair in -1.0..1.0, for float output devices.
    pub fn to_f32(self) -> (f32, f32) {
        (self.left as f32 / 32768.0, self.right as f32 / 32768.0)
    }
}

fn to_i16(v: f32) -> i16 {
    (v * 32767.0).clamp(-32768.0, 32767.0) as i16
}
