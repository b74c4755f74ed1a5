//! Box-filter down-sampling for capture audio
//!
//! Capture devices run at whatever rate the hardware prefers (commonly
//! 44.1 kHz or 48 kHz); the recognizer wants 16 kHz. Each output sample is
//! the average of the input samples whose time range maps onto its slot.
//! Step boundaries are rounded per step rather than truncated, so
//! non-integer ratios do not accumulate drift over long streams.

/// Target sample rate for recognition audio (16 kHz speech PCM)
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Down-sample a block of f32 samples from `input_rate` to `output_rate`
///
/// Returns the input unchanged when the rates match. Output length is
/// `round(input_length / ratio)` where `ratio = input_rate / output_rate`.
/// An empty block yields an empty block.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn downsample(input: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if input_rate == output_rate {
        return input.to_vec();
    }

    let ratio = f64::from(input_rate) / f64::from(output_rate);
    let output_len = (input.len() as f64 / ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    let mut start = 0usize;
    for slot in 0..output_len {
        // Round each boundary independently so fractional ratios stay aligned
        let end = (((slot + 1) as f64) * ratio).round() as usize;
        let end = end.min(input.len());

        let mut accum = 0.0f32;
        let mut count = 0usize;
        for &sample in &input[start.min(end)..end] {
            accum += sample;
            count += 1;
        }

        output.push(if count > 0 { accum / count as f32 } else { 0.0 });
        start = end;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_rates_pass_through() {
        let input = vec![0.1, -0.2, 0.3, -0.4];
        let output = downsample(&input, 16_000, 16_000);
        assert_eq!(output, input);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(downsample(&[], 48_000, 16_000).is_empty());
    }

    #[test]
    fn integer_ratio_averages_triples() {
        let input = vec![0.0, 0.3, 0.6, 1.0, 1.0, 1.0];
        let output = downsample(&input, 48_000, 16_000);
        assert_eq!(output.len(), 2);
        assert!((output[0] - 0.3).abs() < 1e-6);
        assert!((output[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn output_length_tracks_rounded_ratio() {
        for len in [1usize, 7, 160, 479, 480, 481, 4800] {
            let input = vec![0.5f32; len];
            let output = downsample(&input, 48_000, 16_000);
            #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
            #[allow(clippy::cast_possible_truncation)]
            let expected = (len as f64 / 3.0).round() as usize;
            assert!(
                output.len().abs_diff(expected) <= 1,
                "len {len}: got {} expected ~{expected}",
                output.len()
            );
        }
    }

    #[test]
    fn fractional_ratio_does_not_drift() {
        // 44.1 kHz → 16 kHz has ratio 2.75625; over a long block the output
        // length must stay within one sample of len / ratio.
        let input = vec![0.25f32; 44_100];
        let output = downsample(&input, 44_100, 16_000);
        assert!(output.len().abs_diff(16_000) <= 1);
    }

    #[test]
    fn constant_input_preserves_dc_level() {
        let input = vec![0.42f32; 4800];
        for sample in downsample(&input, 48_000, 16_000) {
            assert!((sample - 0.42).abs() < 1e-6);
        }
    }
}
