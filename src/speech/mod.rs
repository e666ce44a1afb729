//! Speech input
//!
//! This module provides:
//! - The speech recognizer capability seam ([`SpeechRecognizer`])
//! - The voice capture adapter driving it ([`VoiceCapture`])
//! - A local Whisper-backed recognizer (feature `local-stt`)

pub mod capture;
#[cfg(feature = "local-stt")]
pub mod stt;

pub use capture::{VoiceCapture, VoiceState};
#[cfg(feature = "local-stt")]
pub use stt::{WhisperConfig, WhisperRecognizer};

use crate::Result;

/// Result of one single-shot recognition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// Recognized text
    Transcript(String),
    /// The recognizer gave up; the string says why
    Error(String),
}

/// Called exactly once with the outcome of a capture session
pub type CompletionCallback = Box<dyn FnOnce(RecognitionOutcome) + Send + 'static>;

/// A platform speech-to-text capability.
///
/// Capture is single-shot and non-continuous: one `start` produces at most
/// one outcome, delivered through the callback, after which the recognizer
/// is idle again.
pub trait SpeechRecognizer: Send {
    /// Whether the capability can be used at all on this machine
    fn is_available(&self) -> bool;

    /// Begin capturing speech in `locale` (e.g. `en-US`)
    fn start(&mut self, locale: &str, on_complete: CompletionCallback) -> Result<()>;

    /// Stop capturing. A recognizer may still finalize and report what it
    /// heard so far.
    fn stop(&mut self);
}
