//! Fixed-layout XM header records.
//!
//! Each record mirrors the on-disk byte layout; the loader and writer
//! convert between these and the `xm-ir` model.

use binrw::binrw;

/// Size of the module header counted from the `header_size` field.
pub(crate) const MODULE_HEADER_SIZE: u32 = 276;

/// Offset of the `header_size` field from the start of the file.
pub(crate) const HEADER_SIZE_OFFSET: u64 = 60;

/// Instrument header bytes when the instrument has no samples.
pub(crate) const SHORT_INSTRUMENT_HEADER: u32 = 29;

/// Instrument header bytes including the sample-related block.
pub(crate) const FULL_INSTRUMENT_HEADER: u32 = 243;

pub(crate) const SAMPLE_HEADER_SIZE: u32 = 40;

pub(crate) const PATTERN_HEADER_SIZE: u32 = 9;

pub(crate) const END_OF_NAME_MARKER: u8 = 0x1A;

#[binrw]
#[brw(little, magic = b"Extended Module: ")]
#[derive(Clone, Debug)]
pub(crate) struct FileHeader {
    pub name: [u8; 20],
    pub marker: u8,
    pub tracker_name: [u8; 20],
    pub version: u16,
    pub header_size: u32,
    pub song_length: u16,
    pub restart_position: u16,
    pub channel_count: u16,
    pub pattern_count: u16,
    pub instrument_count: u16,
    pub flags: u16,
    pub default_tempo: u16,
    pub default_bpm: u16,
    pub order: [u8; 256],
}

/// Pattern header; `packed_size` bytes of note records follow.
#[binrw]
#[brw(little)]
#[derive(Clone, Debug)]
pub(crate) struct PatternHeader {
    pub header_length: u32,
    pub packing_type: u8,
    pub rows: u16,
    pub packed_size: u16,
}

/// Leading 29 bytes of every instrument header.
#[binrw]
#[brw(little)]
#[derive(Clone, Debug)]
pub(crate) struct InstrumentHeader {
    pub header_length: u32,
    pub name: [u8; 22],
    pub kind: u8,
    pub sample_count: u16,
}

/// Instrument fields present only when `sample_count > 0`.
///
/// Envelope points are stored as interleaved `frame, value` words, the
/// volume envelope's scalar fields before the panning envelope's.
#[binrw]
#[brw(little)]
#[derive(Clone, Debug)]
pub(crate) struct InstrumentBody {
    pub sample_header_size: u32,
    pub sample_map: [u8; 96],
    pub volume_points: [u16; 24],
    pub panning_points: [u16; 24],
    pub volume_point_count: u8,
    pub panning_point_count: u8,
    pub volume_sustain: u8,
    pub volume_loop_start: u8,
    pub volume_loop_end: u8,
    pub panning_sustain: u8,
    pub panning_loop_start: u8,
    pub panning_loop_end: u8,
    pub volume_flags: u8,
    pub panning_flags: u8,
    pub vibrato_type: u8,
    pub vibrato_sweep: u8,
    pub vibrato_depth: u8,
    pub vibrato_rate: u8,
    pub fadeout: u16,
    pub reserved: u16,
}

/// 40-byte sample header. Lengths are in bytes on disk.
#[binrw]
#[brw(little)]
#[derive(Clone, Debug)]
pub(crate) struct SampleHeader {
    pub length: u32,
    pub loop_start: u32,
    pub loop_length: u32,
    pub volume: u8,
    pub finetune: i8,
    pub kind: u8,
    pub panning: u8,
    pub relative_note: i8,
    pub reserved: u8,
    pub name: [u8; 22],
}
