//! PCM encoding for transport and debug export

use crate::{Error, Result};

/// Convert f32 samples to interleaved little-endian 16-bit PCM bytes
///
/// Samples are clamped to [-1, 1] first. Scaling is symmetric: negative
/// values scale by 32768 and non-negative by 32767, so both rails map to the
/// exact i16 extremes without a one-sided clipping bias.
#[must_use]
pub fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let scaled = if clamped < 0.0 {
            clamped * 32768.0
        } else {
            clamped * 32767.0
        };
        #[allow(clippy::cast_possible_truncation)]
        let value = scaled as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert f32 samples to WAV bytes for debug export
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    #[test]
    fn full_scale_maps_to_i16_extremes() {
        let bytes = pcm16_bytes(&[1.0, -1.0]);
        assert_eq!(decode(&bytes), vec![32767, -32768]);
    }

    #[test]
    fn out_of_range_inputs_clamp() {
        let bytes = pcm16_bytes(&[4.0, -4.0, f32::INFINITY, f32::NEG_INFINITY]);
        assert_eq!(decode(&bytes), vec![32767, -32768, 32767, -32768]);
    }

    #[test]
    fn zero_maps_to_zero() {
        assert_eq!(decode(&pcm16_bytes(&[0.0])), vec![0]);
    }

    #[test]
    fn bytes_are_little_endian() {
        // 0.5 * 32767 = 16383.5, truncated to 16383 = 0x3FFF
        let bytes = pcm16_bytes(&[0.5]);
        assert_eq!(bytes, vec![0xFF, 0x3F]);
    }

    #[test]
    fn wav_export_carries_riff_header() {
        let wav = samples_to_wav(&[0.0f32; 160], 16_000).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }
}
