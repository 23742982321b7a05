//! Effect command types for XM patterns.
//!
//! Notes keep the raw effect bytes; these enums are the typed view the
//! sequencer dispatches on.

use crate::pattern::NO_EFFECT;

/// Volume column command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VolumeCommand {
    #[default]
    None,
    /// Set volume (0-64), bytes 0x10-0x50
    Volume(u8),
    VolumeSlideDown(u8),
    VolumeSlideUp(u8),
    FineVolSlideDown(u8),
    FineVolSlideUp(u8),
    VibratoSpeed(u8),
    Vibrato(u8),
    /// Set panning (0-15 coarse steps)
    Panning(u8),
    PanSlideLeft(u8),
    PanSlideRight(u8),
    TonePorta(u8),
    /// Byte in an unassigned range (0x01-0x0F, 0x51-0x5F)
    Unused(u8),
}

impl VolumeCommand {
    /// Decode a volume column byte.
    pub fn from_byte(byte: u8) -> Self {
        let low = byte & 0x0F;
        match byte {
            0x00 => VolumeCommand::None,
            0x10..=0x50 => VolumeCommand::Volume(byte - 0x10),
            0x60..=0x6F => VolumeCommand::VolumeSlideDown(low),
            0x70..=0x7F => VolumeCommand::VolumeSlideUp(low),
            0x80..=0x8F => VolumeCommand::FineVolSlideDown(low),
            0x90..=0x9F => VolumeCommand::FineVolSlideUp(low),
            0xA0..=0xAF => VolumeCommand::VibratoSpeed(low),
            0xB0..=0xBF => VolumeCommand::Vibrato(low),
            0xC0..=0xCF => VolumeCommand::Panning(low),
            0xD0..=0xDF => VolumeCommand::PanSlideLeft(low),
            0xE0..=0xEF => VolumeCommand::PanSlideRight(low),
            0xF0..=0xFF => VolumeCommand::TonePorta(low),
            other => VolumeCommand::Unused(other),
        }
    }
}

/// Effect column command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,

    // === 0-7: pitch & modulation ===
    /// Cycle between note, note+x, note+y each tick
    Arpeggio { x: u8, y: u8 },
    PortaUp(u8),
    PortaDown(u8),
    /// Slide toward the row's note at `speed × 4` period units per tick
    TonePorta(u8),
    Vibrato { speed: u8, depth: u8 },
    TonePortaVolSlide { up: u8, down: u8 },
    VibratoVolSlide { up: u8, down: u8 },
    Tremolo { speed: u8, depth: u8 },

    // === 8-F: channel & transport ===
    /// Set channel panning (0-255)
    SetPanning(u8),
    /// Start sample playback at `param × 256` frames
    SampleOffset(u8),
    /// Slide volume up by `up` or, when `up` is zero, down by `down`
    VolumeSlide { up: u8, down: u8 },
    PositionJump(u8),
    /// Set channel volume (0-64)
    SetVolume(u8),
    /// Jump to the given row of the next pattern in the order table
    PatternBreak(u8),
    /// Exx sub-commands
    Extended(ExtendedEffect),
    /// Ticks per row (parameter 0-31)
    SetSpeed(u8),
    /// Beats per minute (parameter 32-255)
    SetBpm(u8),

    // === Letter effects ===
    /// Gxx: set global volume (0-64)
    SetGlobalVolume(u8),
    /// Hxy
    GlobalVolumeSlide { up: u8, down: u8 },
    /// Kxx: key off at tick xx
    KeyOff(u8),
    /// Lxx
    SetEnvelopePosition(u8),
    /// Pxy
    PanningSlide { right: u8, left: u8 },
    /// Rxy
    MultiRetrig { interval: u8, volume_change: u8 },
    /// Txy
    Tremor { on: u8, off: u8 },
    /// X1y
    ExtraFinePortaUp(u8),
    /// X2y
    ExtraFinePortaDown(u8),

    /// Any other type/parameter pair
    Unknown { fx_type: u8, param: u8 },
}

/// Exx sub-command. The payload is the low nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendedEffect {
    FinePortaUp(u8),
    FinePortaDown(u8),
    GlissandoControl(u8),
    VibratoControl(u8),
    SetFinetune(u8),
    PatternLoop(u8),
    TremoloControl(u8),
    RetrigNote(u8),
    FineVolumeSlideUp(u8),
    FineVolumeSlideDown(u8),
    NoteCut(u8),
    /// Hold the row's note back by this many ticks
    NoteDelay(u8),
    PatternDelay(u8),
    /// E0x, E8x and EFx have no XM meaning
    Unknown(u8),
}

pub const FX_ARPEGGIO: u8 = 0x00;
pub const FX_PORTA_UP: u8 = 0x01;
pub const FX_PORTA_DOWN: u8 = 0x02;
pub const FX_TONE_PORTA: u8 = 0x03;
pub const FX_VIBRATO: u8 = 0x04;
pub const FX_TONE_PORTA_VOLUME_SLIDE: u8 = 0x05;
pub const FX_VIBRATO_VOLUME_SLIDE: u8 = 0x06;
pub const FX_TREMOLO: u8 = 0x07;
pub const FX_SET_PANNING: u8 = 0x08;
pub const FX_SAMPLE_OFFSET: u8 = 0x09;
pub const FX_VOLUME_SLIDE: u8 = 0x0A;
pub const FX_POSITION_JUMP: u8 = 0x0B;
pub const FX_SET_VOLUME: u8 = 0x0C;
pub const FX_PATTERN_BREAK: u8 = 0x0D;
pub const FX_EXTENDED: u8 = 0x0E;
pub const FX_SET_TEMPO: u8 = 0x0F;
pub const FX_SET_GLOBAL_VOLUME: u8 = 0x10;
pub const FX_GLOBAL_VOLUME_SLIDE: u8 = 0x11;
pub const FX_KEY_OFF: u8 = 0x14;
pub const FX_SET_ENVELOPE_POSITION: u8 = 0x15;
pub const FX_PANNING_SLIDE: u8 = 0x19;
pub const FX_MULTI_RETRIG: u8 = 0x1B;
pub const FX_TREMOR: u8 = 0x1D;
pub const FX_EXTRA_FINE_PORTA: u8 = 0x21;

fn nibbles(param: u8) -> (u8, u8) {
    (param >> 4, param & 0x0F)
}

impl Effect {
    /// Decode an effect type/parameter pair.
    pub fn from_raw(fx_type: u8, param: u8) -> Self {
        let (hi, lo) = nibbles(param);
        match fx_type {
            NO_EFFECT => Effect::None,
            FX_ARPEGGIO => Effect::Arpeggio { x: hi, y: lo },
            FX_PORTA_UP => Effect::PortaUp(param),
            FX_PORTA_DOWN => Effect::PortaDown(param),
            FX_TONE_PORTA => Effect::TonePorta(param),
            FX_VIBRATO => Effect::Vibrato { speed: hi, depth: lo },
            FX_TONE_PORTA_VOLUME_SLIDE => Effect::TonePortaVolSlide { up: hi, down: lo },
            FX_VIBRATO_VOLUME_SLIDE => Effect::VibratoVolSlide { up: hi, down: lo },
            FX_TREMOLO => Effect::Tremolo { speed: hi, depth: lo },
            FX_SET_PANNING => Effect::SetPanning(param),
            FX_SAMPLE_OFFSET => Effect::SampleOffset(param),
            FX_VOLUME_SLIDE => Effect::VolumeSlide { up: hi, down: lo },
            FX_POSITION_JUMP => Effect::PositionJump(param),
            FX_SET_VOLUME => Effect::SetVolume(param),
            FX_PATTERN_BREAK => Effect::PatternBreak(param),
            FX_EXTENDED => Effect::Extended(ExtendedEffect::from_param(param)),
            FX_SET_TEMPO if param < 32 => Effect::SetSpeed(param),
            FX_SET_TEMPO => Effect::SetBpm(param),
            FX_SET_GLOBAL_VOLUME => Effect::SetGlobalVolume(param),
            FX_GLOBAL_VOLUME_SLIDE => Effect::GlobalVolumeSlide { up: hi, down: lo },
            FX_KEY_OFF => Effect::KeyOff(param),
            FX_SET_ENVELOPE_POSITION => Effect::SetEnvelopePosition(param),
            FX_PANNING_SLIDE => Effect::PanningSlide { right: hi, left: lo },
            FX_MULTI_RETRIG => Effect::MultiRetrig { interval: lo, volume_change: hi },
            FX_TREMOR => Effect::Tremor { on: hi, off: lo },
            FX_EXTRA_FINE_PORTA if hi == 1 => Effect::ExtraFinePortaUp(lo),
            FX_EXTRA_FINE_PORTA if hi == 2 => Effect::ExtraFinePortaDown(lo),
            _ => Effect::Unknown { fx_type, param },
        }
    }

    /// True for the two effects that glide instead of retriggering.
    pub fn is_tone_porta(&self) -> bool {
        matches!(self, Effect::TonePorta(_) | Effect::TonePortaVolSlide { .. })
    }

    /// The delay in ticks when this is an `EDx` note delay.
    pub fn note_delay(&self) -> Option<u8> {
        match self {
            Effect::Extended(ExtendedEffect::NoteDelay(ticks)) => Some(*ticks),
            _ => None,
        }
    }
}

impl ExtendedEffect {
    /// Decode the parameter byte of an `Exy` effect.
    pub fn from_param(param: u8) -> Self {
        let (cmd, val) = nibbles(param);
        match cmd {
            0x1 => ExtendedEffect::FinePortaUp(val),
            0x2 => ExtendedEffect::FinePortaDown(val),
            0x3 => ExtendedEffect::GlissandoControl(val),
            0x4 => ExtendedEffect::VibratoControl(val),
            0x5 => ExtendedEffect::SetFinetune(val),
            0x6 => ExtendedEffect::PatternLoop(val),
            0x7 => ExtendedEffect::TremoloControl(val),
            0x9 => ExtendedEffect::RetrigNote(val),
            0xA => ExtendedEffect::FineVolumeSlideUp(val),
            0xB => ExtendedEffect::FineVolumeSlideDown(val),
            0xC => ExtendedEffect::NoteCut(val),
            0xD => ExtendedEffect::NoteDelay(val),
            0xE => ExtendedEffect::PatternDelay(val),
            _ => ExtendedEffect::Unknown(param),
        }
    }
}
