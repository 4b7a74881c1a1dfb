//! PCM helpers for CD-DA frames.
//!
//! CD audio is interleaved stereo, signed 16-bit, little-endian on the wire
//! and in the output sink.

/// Convert little-endian bytes to 16-bit samples.
///
/// A trailing odd byte is ignored.
pub fn samples_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Convert 16-bit samples to little-endian bytes.
///
/// Output length = `samples.len() * 2` bytes.
pub fn samples_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}
