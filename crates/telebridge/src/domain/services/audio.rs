//! Audio format conversion between the telephony and agent legs.
//!
//! - Telephony: G.711 μ-law, 8 kHz, mono, one byte per sample.
//! - Agent: linear PCM, signed 16-bit little-endian, 16 kHz, mono.
//!
//! Preconditions: linear PCM buffers hold whole 16-bit samples (even byte
//! length). A trailing odd byte is ignored.

use std::sync::LazyLock;

const ULAW_BIAS: i32 = 0x84;
const ULAW_CLIP: u16 = 0x1FFF;

static MULAW_DECODE_TABLE: LazyLock<[i16; 256]> = LazyLock::new(|| {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = ulaw_expand(code as u8);
    }
    table
});

static MULAW_ENCODE_TABLE: LazyLock<Box<[u8]>> = LazyLock::new(|| {
    (0..=u16::MAX)
        .map(|raw| ulaw_compress(raw as i16))
        .collect::<Vec<u8>>()
        .into_boxed_slice()
});

/// G.711 μ-law compression of one sample.
fn ulaw_compress(sample: i16) -> u8 {
    let magnitude: u16 = if sample < 0 {
        ((!sample as u16) >> 2) + 33
    } else {
        ((sample as u16) >> 2) + 33
    };
    let magnitude = magnitude.min(ULAW_CLIP);

    let mut segment: u16 = 1;
    let mut rest = magnitude >> 6;
    while rest != 0 {
        segment += 1;
        rest >>= 1;
    }

    let high_nibble = 0x8 - segment;
    let low_nibble = 0xF - ((magnitude >> segment) & 0xF);
    let mut code = ((high_nibble << 4) | low_nibble) as u8;
    if sample >= 0 {
        code |= 0x80;
    }
    code
}

/// G.711 μ-law expansion of one code.
fn ulaw_expand(code: u8) -> i16 {
    let inverted = !code;
    let exponent = (inverted >> 4) & 0x07;
    let mantissa = (inverted & 0x0F) as i32;
    let magnitude = (((mantissa << 3) + ULAW_BIAS) << exponent) - ULAW_BIAS;
    if inverted & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

fn samples(pcm: &[u8]) -> impl Iterator<Item = i16> + '_ {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

fn mean(a: i16, b: i16) -> i16 {
    ((a as i32 + b as i32) / 2) as i16
}

/// μ-law bytes to 16-bit little-endian PCM (output is twice as long).
pub fn mulaw_to_linear(mulaw: &[u8]) -> Vec<u8> {
    let table = &*MULAW_DECODE_TABLE;
    let mut out = Vec::with_capacity(mulaw.len() * 2);
    for &code in mulaw {
        out.extend_from_slice(&table[code as usize].to_le_bytes());
    }
    out
}

/// 16-bit little-endian PCM to μ-law bytes (output is half as long).
pub fn linear_to_mulaw(pcm: &[u8]) -> Vec<u8> {
    let table = &*MULAW_ENCODE_TABLE;
    samples(pcm)
        .map(|sample| table[sample as u16 as usize])
        .collect()
}

/// 8 kHz → 16 kHz by inserting the mean of each adjacent pair.
///
/// The last sample has no successor and is duplicated.
pub fn upsample_8k_to_16k(pcm: &[u8]) -> Vec<u8> {
    let input: Vec<i16> = samples(pcm).collect();
    let mut out = Vec::with_capacity(input.len() * 4);
    for (i, &current) in input.iter().enumerate() {
        let next = input.get(i + 1).copied().unwrap_or(current);
        out.extend_from_slice(&current.to_le_bytes());
        out.extend_from_slice(&mean(current, next).to_le_bytes());
    }
    out
}

/// 16 kHz → 8 kHz by averaging each consecutive pair of samples.
///
/// With an odd sample count the final unpaired sample is dropped.
pub fn downsample_16k_to_8k(pcm: &[u8]) -> Vec<u8> {
    let input: Vec<i16> = samples(pcm).collect();
    let mut out = Vec::with_capacity(input.len());
    for pair in input.chunks_exact(2) {
        out.extend_from_slice(&mean(pair[0], pair[1]).to_le_bytes());
    }
    out
}

/// Telephony frame (μ-law 8 kHz) to agent frame (PCM 16 kHz).
pub fn telephony_to_agent(mulaw: &[u8]) -> Vec<u8> {
    upsample_8k_to_16k(&mulaw_to_linear(mulaw))
}

/// Agent frame (PCM 16 kHz) to telephony frame (μ-law 8 kHz).
pub fn agent_to_telephony(pcm: &[u8]) -> Vec<u8> {
    linear_to_mulaw(&downsample_16k_to_8k(pcm))
}
