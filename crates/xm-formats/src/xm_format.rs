//! FastTracker 2 Extended Module (XM) loader.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use binrw::BinRead;
use tracing::{debug, trace, warn};
use xm_ir::{
    AutoVibrato, Envelope, EnvelopeFlags, EnvelopePoint, Instrument, InvariantError, Module, Note,
    Pattern, Sample, SampleData, BitDepth, MAX_CHANNELS, MAX_ENVELOPE_POINTS, MAX_INSTRUMENTS,
    MAX_ORDERS, MAX_PATTERNS, MAX_PATTERN_ROWS,
};

use crate::delta::{delta_decode_16, delta_decode_8};
use crate::headers::{
    FileHeader, InstrumentBody, InstrumentHeader, PatternHeader, SampleHeader,
    END_OF_NAME_MARKER, HEADER_SIZE_OFFSET, MODULE_HEADER_SIZE,
};
use crate::{LoadError, LoadOptions, XM_VERSION};

/// Load an XM file from disk with default options.
pub fn load(path: impl AsRef<Path>) -> Result<Module, LoadError> {
    load_with(path, &LoadOptions::default())
}

/// Load an XM file from disk.
pub fn load_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Module, LoadError> {
    let file = File::open(path.as_ref()).map_err(LoadError::Io)?;
    read_xm(&mut BufReader::new(file), options)
}

/// Load an XM module from bytes with default options.
pub fn load_xm(data: &[u8]) -> Result<Module, LoadError> {
    read_xm(&mut Cursor::new(data), &LoadOptions::default())
}

/// Read an XM module from a seekable stream.
///
/// Nothing is returned unless the whole file decodes and the resulting
/// module passes [`Module::check_invariants`].
pub fn read_xm<R: Read + Seek>(reader: &mut R, options: &LoadOptions) -> Result<Module, LoadError> {
    let header = FileHeader::read(reader)?;
    if header.marker != END_OF_NAME_MARKER {
        return Err(LoadError::BadMagic);
    }

    if header.version != XM_VERSION {
        if options.strict_version {
            return Err(LoadError::UnsupportedVersion(header.version));
        }
        warn!(
            "XM version {:#06x} is not {:#06x}, reading with the current layout",
            header.version, XM_VERSION
        );
    }

    if header.header_size > MODULE_HEADER_SIZE {
        reader.seek(SeekFrom::Start(HEADER_SIZE_OFFSET + header.header_size as u64))?;
    }

    let channels = header.channel_count;
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(InvariantError::ChannelCount(channels).into());
    }
    // Counts come straight from the file; check them before reserving space.
    if header.pattern_count > MAX_PATTERNS {
        return Err(InvariantError::TooManyPatterns(header.pattern_count as usize).into());
    }
    if header.instrument_count > MAX_INSTRUMENTS {
        return Err(InvariantError::TooManyInstruments(header.instrument_count as usize).into());
    }

    let mut module = Module {
        version: header.version,
        song_length: header.song_length,
        restart_position: header.restart_position,
        channel_count: channels,
        pattern_count: header.pattern_count,
        instrument_count: header.instrument_count,
        flags: header.flags,
        default_tempo: header.default_tempo,
        default_bpm: header.default_bpm,
        order: header.order[..(header.song_length as usize).min(MAX_ORDERS)].to_vec(),
        ..Module::default()
    };
    module.set_name(&parse_name(&header.name));

    if module.song_length > 0 && module.restart_position >= module.song_length {
        warn!(
            restart = module.restart_position,
            song_length = module.song_length,
            "restart position outside song, using 0"
        );
        module.restart_position = 0;
    }

    let mut patterns = Vec::with_capacity(header.pattern_count as usize);
    let mut instruments = Vec::with_capacity(header.instrument_count as usize);

    // Current files store each instrument's sample data right after its
    // headers; older ones put all headers first and all data last.
    if header.version >= XM_VERSION {
        for index in 0..header.pattern_count {
            patterns.push(read_pattern(reader, index, channels)?);
        }
        for _ in 0..header.instrument_count {
            let (mut instrument, stored) = read_instrument(reader)?;
            read_sample_data(reader, &mut instrument, &stored)?;
            instruments.push(instrument);
        }
    } else {
        let mut stored_sizes = Vec::with_capacity(header.instrument_count as usize);
        for _ in 0..header.instrument_count {
            let (instrument, stored) = read_instrument(reader)?;
            instruments.push(instrument);
            stored_sizes.push(stored);
        }
        for index in 0..header.pattern_count {
            patterns.push(read_pattern(reader, index, channels)?);
        }
        for (instrument, stored) in instruments.iter_mut().zip(&stored_sizes) {
            read_sample_data(reader, instrument, stored)?;
        }
    }

    module.patterns = patterns;
    module.instruments = instruments;
    module.check_invariants()?;

    debug!(
        name = module.name.as_str(),
        version = module.version,
        orders = module.song_length,
        channels = module.channel_count,
        patterns = module.patterns.len(),
        instruments = module.instruments.len(),
        "loaded XM module"
    );
    Ok(module)
}

/// Decode packed note records into `notes`, in row-major order.
///
/// Returns the number of records decoded. Notes without a record keep
/// their current contents.
pub fn unpack_pattern(packed: &[u8], notes: &mut [Note]) -> Result<usize, LoadError> {
    let mut pos = 0;
    let mut index = 0;
    while pos < packed.len() {
        let capacity = notes.len();
        let note = notes.get_mut(index).ok_or_else(|| {
            LoadError::Decode(format!("packed data holds more than {} notes", capacity))
        })?;
        *note = Note::empty();

        let lead = next_byte(packed, &mut pos)?;
        let mask = if lead & 0x80 != 0 {
            lead
        } else {
            note.note = lead;
            0x1E
        };
        if mask & 0x01 != 0 {
            note.note = next_byte(packed, &mut pos)?;
        }
        if mask & 0x02 != 0 {
            note.instrument = next_byte(packed, &mut pos)?;
        }
        if mask & 0x04 != 0 {
            note.volume = next_byte(packed, &mut pos)?;
        }
        if mask & 0x08 != 0 {
            note.fx_type = next_byte(packed, &mut pos)?;
        }
        if mask & 0x10 != 0 {
            note.fx_param = next_byte(packed, &mut pos)?;
        }
        note.disambiguate_effect();
        index += 1;
    }
    Ok(index)
}

fn next_byte(packed: &[u8], pos: &mut usize) -> Result<u8, LoadError> {
    let byte = *packed
        .get(*pos)
        .ok_or_else(|| LoadError::Decode("note record runs past packed pattern data".into()))?;
    *pos += 1;
    Ok(byte)
}

fn read_pattern<R: Read + Seek>(
    reader: &mut R,
    index: u16,
    channels: u16,
) -> Result<Pattern, LoadError> {
    let header = PatternHeader::read(reader)?;
    if header.rows == 0 || header.rows > MAX_PATTERN_ROWS {
        return Err(InvariantError::PatternRows {
            pattern: index as usize,
            rows: header.rows,
        }
        .into());
    }
    let mut pattern = Pattern::new(header.rows, channels);

    if header.packed_size == 0 {
        trace!(pattern = index, rows = header.rows, "empty pattern");
        return Ok(pattern);
    }

    let mut packed = vec![0u8; header.packed_size as usize];
    reader.read_exact(&mut packed)?;
    let records = unpack_pattern(&packed, &mut pattern.notes)
        .map_err(|e| match e {
            LoadError::Decode(msg) => LoadError::Decode(format!("pattern {}: {}", index, msg)),
            other => other,
        })?;

    trace!(pattern = index, rows = header.rows, records, "unpacked pattern");
    Ok(pattern)
}

/// Read an instrument header and its sample headers.
///
/// Returns the instrument with empty sample data plus the stored byte size
/// of each sample's data.
fn read_instrument<R: Read + Seek>(reader: &mut R) -> Result<(Instrument, Vec<u32>), LoadError> {
    let start = reader.stream_position()?;
    let header = InstrumentHeader::read(reader)?;

    let mut instrument = Instrument {
        kind: header.kind,
        ..Instrument::default()
    };

    if header.sample_count > 0 {
        let body = InstrumentBody::read(reader)?;
        instrument.sample_map = body.sample_map;
        instrument.volume_envelope = build_envelope(
            &body.volume_points,
            body.volume_point_count,
            body.volume_sustain,
            body.volume_loop_start,
            body.volume_loop_end,
            body.volume_flags,
        );
        instrument.panning_envelope = build_envelope(
            &body.panning_points,
            body.panning_point_count,
            body.panning_sustain,
            body.panning_loop_start,
            body.panning_loop_end,
            body.panning_flags,
        );
        instrument.vibrato = AutoVibrato {
            kind: body.vibrato_type,
            sweep: body.vibrato_sweep,
            depth: body.vibrato_depth,
            rate: body.vibrato_rate,
        };
        instrument.fadeout = body.fadeout;
    }

    // Trailing header bytes vary between trackers.
    let consumed = reader.stream_position()? - start;
    let end = start + (header.header_length as u64).max(consumed);
    reader.seek(SeekFrom::Start(end))?;

    let mut stored = Vec::with_capacity(header.sample_count as usize);
    for _ in 0..header.sample_count {
        let sh = SampleHeader::read(reader)?;
        instrument.samples.push(sample_from_header(&sh));
        stored.push(sh.length);
    }

    Ok((instrument, stored))
}

fn build_envelope(
    words: &[u16; 24],
    count: u8,
    sustain_point: u8,
    loop_start: u8,
    loop_end: u8,
    flags: u8,
) -> Envelope {
    let mut env = Envelope {
        sustain_point,
        loop_start,
        loop_end,
        flags: EnvelopeFlags(flags),
        ..Envelope::default()
    };
    let count = (count as usize).min(MAX_ENVELOPE_POINTS);
    for pair in words.chunks_exact(2).take(count) {
        env.points.push(EnvelopePoint {
            frame: pair[0],
            value: pair[1],
        });
    }
    env
}

/// Header lengths are bytes on disk; the model counts frames.
fn sample_from_header(h: &SampleHeader) -> Sample {
    let width = if h.kind & Sample::FLAG_16BIT != 0 { 2 } else { 1 };
    Sample {
        length: h.length / width,
        loop_start: h.loop_start / width,
        loop_length: h.loop_length / width,
        volume: h.volume,
        finetune: h.finetune,
        kind: h.kind,
        panning: h.panning,
        relative_note: h.relative_note,
        data: SampleData::Empty,
    }
}

fn read_sample_data<R: Read>(
    reader: &mut R,
    instrument: &mut Instrument,
    stored: &[u32],
) -> Result<(), LoadError> {
    for (sample, &bytes) in instrument.samples.iter_mut().zip(stored) {
        let mut raw = Vec::new();
        reader.by_ref().take(bytes as u64).read_to_end(&mut raw)?;
        if raw.len() != bytes as usize {
            return Err(LoadError::Truncated);
        }

        sample.data = if sample.length == 0 {
            SampleData::Empty
        } else {
            match sample.bit_depth() {
                BitDepth::Eight => {
                    delta_decode_8(&mut raw);
                    SampleData::Pcm8(raw.into_iter().map(|b| b as i8).collect())
                }
                BitDepth::Sixteen => {
                    let mut words: Vec<u16> = raw
                        .chunks_exact(2)
                        .map(|c| u16::from_le_bytes([c[0], c[1]]))
                        .collect();
                    delta_decode_16(&mut words);
                    SampleData::Pcm16(words.into_iter().map(|w| w as i16).collect())
                }
            }
        };
    }
    Ok(())
}

fn parse_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}
