//! Audio capture, playback, and PCM conversion
//!
//! The capture side records at the device's native rate; the resampler and
//! encoder bring frames to the 16 kHz little-endian 16-bit PCM the streaming
//! protocol carries.

mod capture;
mod encode;
mod playback;
mod resample;

pub use capture::AudioCapture;
pub use encode::{pcm16_bytes, samples_to_wav};
pub use playback::AudioPlayback;
pub use resample::{TARGET_SAMPLE_RATE, downsample};
