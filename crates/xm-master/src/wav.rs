//! WAV encoding for 16-bit stereo PCM.

use std::io::{Cursor, Write};

use binrw::{binrw, BinWrite};
use xm_audio::Frame;

const CHANNELS: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;
const FMT_CHUNK_SIZE: u32 = 16;
const PCM_FORMAT: u16 = 1;

/// Bytes before the sample data.
pub const WAV_HEADER_SIZE: usize = 44;

/// RIFF/WAVE header with a single `fmt ` and `data` chunk.
#[binrw]
#[brw(little, magic = b"RIFF")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    #[brw(magic = b"WAVEfmt ")]
    pub fmt_size: u32,
    pub format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    #[brw(magic = b"data")]
    pub data_size: u32,
}

impl WavHeader {
    pub fn stereo16(sample_rate: u32, frame_count: usize) -> Self {
        let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
        let data_size = frame_count as u32 * block_align as u32;
        Self {
            riff_size: 36 + data_size,
            fmt_size: FMT_CHUNK_SIZE,
            format: PCM_FORMAT,
            channels: CHANNELS,
            sample_rate,
            byte_rate: sample_rate * block_align as u32,
            block_align,
            bits_per_sample: BITS_PER_SAMPLE,
            data_size,
        }
    }
}

pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    let mut header = Cursor::new(Vec::with_capacity(WAV_HEADER_SIZE));
    WavHeader::stereo16(sample_rate, frames.len())
        .write(&mut header)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    w.write_all(header.get_ref())?;

    for frame in frames {
        w.write_all(&frame.left.to_le_bytes())?;
        w.write_all(&frame.right.to_le_bytes())?;
    }
    Ok(())
}

pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(WAV_HEADER_SIZE + frames.len() * 4);
    write_wav(&mut buf, frames, sample_rate).expect("writing to a Vec cannot fail");
    buf
}
