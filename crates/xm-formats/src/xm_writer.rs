//! XM writer.
//!
//! Produces a version 0x0104 file that [`crate::load_xm`] reads back into an
//! equal module.

use std::io::{Cursor, Seek, Write};

use binrw::BinWrite;
use xm_ir::{Envelope, Instrument, Module, Note, Pattern, Sample, SampleData, NO_EFFECT};

use crate::delta::{delta_encode_16, delta_encode_8};
use crate::headers::{
    FileHeader, InstrumentBody, InstrumentHeader, PatternHeader, SampleHeader,
    END_OF_NAME_MARKER, FULL_INSTRUMENT_HEADER, MODULE_HEADER_SIZE, PATTERN_HEADER_SIZE,
    SAMPLE_HEADER_SIZE, SHORT_INSTRUMENT_HEADER,
};
use crate::XM_VERSION;

const TRACKER_NAME: &str = "xmplayer";

/// Serialize a module.
pub fn write_xm(module: &Module) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    write_module(&mut out, module).expect("writing to a Vec cannot fail");
    out.into_inner()
}

fn write_module<W: Write + Seek>(w: &mut W, module: &Module) -> binrw::BinResult<()> {
    let mut order = [0u8; 256];
    for (slot, &entry) in order.iter_mut().zip(&module.order) {
        *slot = entry;
    }

    FileHeader {
        name: fixed_name(module.name.as_str()),
        marker: END_OF_NAME_MARKER,
        tracker_name: fixed_name(TRACKER_NAME),
        version: XM_VERSION,
        header_size: MODULE_HEADER_SIZE,
        song_length: module.order.len() as u16,
        restart_position: module.restart_position,
        channel_count: module.channel_count,
        pattern_count: module.patterns.len() as u16,
        instrument_count: module.instruments.len() as u16,
        flags: module.flags,
        default_tempo: module.default_tempo,
        default_bpm: module.default_bpm,
        order,
    }
    .write(w)?;

    for pattern in &module.patterns {
        let packed = pack_pattern(pattern);
        PatternHeader {
            header_length: PATTERN_HEADER_SIZE,
            packing_type: 0,
            rows: pattern.rows,
            packed_size: packed.len() as u16,
        }
        .write(w)?;
        w.write_all(&packed)?;
    }

    for instrument in &module.instruments {
        write_instrument(w, instrument)?;
        for sample in &instrument.samples {
            w.write_all(&encode_sample_data(sample))?;
        }
    }
    Ok(())
}

fn write_instrument<W: Write + Seek>(w: &mut W, inst: &Instrument) -> binrw::BinResult<()> {
    let has_samples = !inst.samples.is_empty();
    InstrumentHeader {
        header_length: if has_samples {
            FULL_INSTRUMENT_HEADER
        } else {
            SHORT_INSTRUMENT_HEADER
        },
        name: [0; 22],
        kind: inst.kind,
        sample_count: inst.samples.len() as u16,
    }
    .write(w)?;

    if !has_samples {
        return Ok(());
    }

    let vol = &inst.volume_envelope;
    let pan = &inst.panning_envelope;
    InstrumentBody {
        sample_header_size: SAMPLE_HEADER_SIZE,
        sample_map: inst.sample_map,
        volume_points: envelope_words(vol),
        panning_points: envelope_words(pan),
        volume_point_count: vol.points.len() as u8,
        panning_point_count: pan.points.len() as u8,
        volume_sustain: vol.sustain_point,
        volume_loop_start: vol.loop_start,
        volume_loop_end: vol.loop_end,
        panning_sustain: pan.sustain_point,
        panning_loop_start: pan.loop_start,
        panning_loop_end: pan.loop_end,
        volume_flags: vol.flags.0,
        panning_flags: pan.flags.0,
        vibrato_type: inst.vibrato.kind,
        vibrato_sweep: inst.vibrato.sweep,
        vibrato_depth: inst.vibrato.depth,
        vibrato_rate: inst.vibrato.rate,
        fadeout: inst.fadeout,
        reserved: 0,
    }
    .write(w)?;

    for sample in &inst.samples {
        let width = sample.bit_depth().width() as u32;
        SampleHeader {
            length: sample.length * width,
            loop_start: sample.loop_start * width,
            loop_length: sample.loop_length * width,
            volume: sample.volume,
            finetune: sample.finetune,
            kind: sample.kind,
            panning: sample.panning,
            relative_note: sample.relative_note,
            reserved: 0,
            name: [0; 22],
        }
        .write(w)?;
    }
    Ok(())
}

fn envelope_words(env: &Envelope) -> [u16; 24] {
    let mut words = [0u16; 24];
    for (pair, point) in words.chunks_exact_mut(2).zip(&env.points) {
        pair[0] = point.frame;
        pair[1] = point.value;
    }
    words
}

fn encode_sample_data(sample: &Sample) -> Vec<u8> {
    match &sample.data {
        SampleData::Empty => Vec::new(),
        SampleData::Pcm8(pcm) => {
            let mut bytes: Vec<u8> = pcm.iter().map(|&s| s as u8).collect();
            delta_encode_8(&mut bytes);
            bytes
        }
        SampleData::Pcm16(pcm) => {
            let mut words: Vec<u16> = pcm.iter().map(|&s| s as u16).collect();
            delta_encode_16(&mut words);
            words.iter().flat_map(|w| w.to_le_bytes()).collect()
        }
    }
}

/// Pack a pattern's notes. An all-empty pattern packs to nothing.
fn pack_pattern(pattern: &Pattern) -> Vec<u8> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(pattern.notes.len() * 2);
    for note in &pattern.notes {
        pack_note(&mut out, note);
    }
    out
}

fn pack_note(out: &mut Vec<u8>, note: &Note) {
    // The loader turns a stored 0/0 effect back into NO_EFFECT.
    let fx_type = if note.fx_type == NO_EFFECT && note.fx_param == 0 {
        0
    } else {
        note.fx_type
    };
    let fields = [note.note, note.instrument, note.volume, fx_type, note.fx_param];

    let mut mask = 0x80u8;
    for (bit, &value) in fields.iter().enumerate() {
        if value != 0 {
            mask |= 1 << bit;
        }
    }

    let present = mask.count_ones() as usize - 1;
    if present + 1 < fields.len() || note.note & 0x80 != 0 {
        out.push(mask);
        out.extend(fields.iter().copied().filter(|&v| v != 0));
    } else {
        out.extend_from_slice(&fields);
    }
}

fn fixed_name<const N: usize>(name: &str) -> [u8; N] {
    let mut bytes = [0u8; N];
    for (dst, src) in bytes.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    bytes
}
