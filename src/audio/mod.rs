//! Audio input and output
//!
//! Playback of reply attachments is always available through the
//! [`AudioPlayback`] seam; the device-backed pieces need feature `audio-io`
//! (and `local-stt` for resampling captured speech).

#[cfg(feature = "audio-io")]
pub mod input;
pub mod playback;
#[cfg(feature = "local-stt")]
pub mod resampler;

#[cfg(feature = "audio-io")]
pub use input::{CapturedBlock, Microphone};
#[cfg(feature = "audio-io")]
pub use playback::SharedPlayer;
pub use playback::{default_playback, AudioPlayback, NullPlayback};
#[cfg(feature = "local-stt")]
pub use resampler::{resample_audio, AudioResampler};

/// Root mean square level of a block of samples
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[0.0; 64]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }
}
