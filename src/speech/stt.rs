//! Local speech recognizer backed by Whisper
//!
//! One capture session records from the default microphone until the
//! speaker goes quiet, the session hits its time cap, or the user stops it.
//! The recording is resampled to 16kHz and transcribed on the capture
//! thread; the outcome goes to the session's completion callback.

use super::{CompletionCallback, RecognitionOutcome, SpeechRecognizer};
use crate::audio::{resample_audio, CapturedBlock, Microphone};
use crate::config::ClientConfig;
use crate::{MurmurError, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Sample rate Whisper expects
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Configuration for the Whisper recognizer
#[derive(Clone, Debug)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,

    /// Number of threads to use for transcription
    pub n_threads: i32,

    /// Upper bound for one capture session in seconds
    pub max_listen_secs: f32,

    /// Trailing silence that ends a session, in seconds
    pub silence_secs: f32,

    /// RMS level above which a block counts as speech
    pub speech_threshold: f32,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            n_threads: 4,
            max_listen_secs: 10.0,
            silence_secs: 1.2,
            speech_threshold: 0.01,
        }
    }
}

impl From<&ClientConfig> for WhisperConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            model_path: config.whisper_model.clone(),
            max_listen_secs: config.max_listen_secs,
            silence_secs: config.silence_secs,
            ..Default::default()
        }
    }
}

/// Whisper language code for a BCP 47 locale (`en-US` -> `en`)
pub fn language_for_locale(locale: &str) -> Option<String> {
    let language = locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if language.is_empty() {
        None
    } else {
        Some(language)
    }
}

/// Decides when a capture session is over
#[derive(Debug)]
pub struct Endpointer {
    sample_rate: f32,
    max_secs: f32,
    silence_secs: f32,
    threshold: f32,
    elapsed: usize,
    trailing_silence: usize,
    heard_speech: bool,
}

impl Endpointer {
    pub fn new(sample_rate: u32, config: &WhisperConfig) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            max_secs: config.max_listen_secs,
            silence_secs: config.silence_secs,
            threshold: config.speech_threshold,
            elapsed: 0,
            trailing_silence: 0,
            heard_speech: false,
        }
    }

    /// Feed one captured block; returns true once the session should end
    pub fn push(&mut self, block: &CapturedBlock) -> bool {
        let frames = block.samples.len();
        self.elapsed += frames;

        if block.level >= self.threshold {
            self.heard_speech = true;
            self.trailing_silence = 0;
        } else {
            self.trailing_silence += frames;
        }

        if self.elapsed as f32 / self.sample_rate >= self.max_secs {
            debug!("Capture hit the {:.1}s cap", self.max_secs);
            return true;
        }

        self.heard_speech && self.trailing_silence as f32 / self.sample_rate >= self.silence_secs
    }

    pub fn heard_speech(&self) -> bool {
        self.heard_speech
    }
}

/// Single-shot recognizer: microphone capture plus Whisper transcription
pub struct WhisperRecognizer {
    config: WhisperConfig,
    context: Arc<WhisperContext>,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl WhisperRecognizer {
    /// Load the model. Fails when the model file or the microphone is missing.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        info!("Loading Whisper model from: {:?}", config.model_path);

        if !config.model_path.exists() {
            return Err(MurmurError::ModelLoad(format!(
                "Model file not found: {:?}",
                config.model_path
            )));
        }

        if !Microphone::is_present() {
            return Err(MurmurError::AudioDevice("No input device available".into()));
        }

        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| MurmurError::ModelLoad("Invalid model path".to_string()))?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| MurmurError::ModelLoad(format!("Failed to load Whisper model: {:?}", e)))?;

        info!("Whisper model loaded successfully");

        Ok(Self {
            config,
            context: Arc::new(context),
            stop_flag: None,
        })
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, locale: &str, on_complete: CompletionCallback) -> Result<()> {
        // A previous session may still be transcribing; it reports on its own
        self.stop();

        let stop_flag = Arc::new(AtomicBool::new(false));
        let session = CaptureSession {
            config: self.config.clone(),
            context: Arc::clone(&self.context),
            language: language_for_locale(locale),
            stop_flag: Arc::clone(&stop_flag),
        };

        thread::Builder::new()
            .name("murmur-capture".into())
            .spawn(move || {
                let outcome = match session.run() {
                    Ok(text) if text.is_empty() => {
                        RecognitionOutcome::Error("no speech detected".into())
                    }
                    Ok(text) => RecognitionOutcome::Transcript(text),
                    Err(e) => {
                        error!("Capture session failed: {}", e);
                        RecognitionOutcome::Error(e.to_string())
                    }
                };
                on_complete(outcome);
            })
            .map_err(|e| MurmurError::Speech(format!("Failed to spawn capture thread: {}", e)))?;

        self.stop_flag = Some(stop_flag);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(flag) = self.stop_flag.take() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Everything one capture thread needs
struct CaptureSession {
    config: WhisperConfig,
    context: Arc<WhisperContext>,
    language: Option<String>,
    stop_flag: Arc<AtomicBool>,
}

impl CaptureSession {
    fn run(self) -> Result<String> {
        let samples = self.record()?;
        if samples.is_empty() {
            return Ok(String::new());
        }
        self.transcribe(&samples)
    }

    /// Record until the endpointer or the stop flag ends the session.
    /// Returns 16kHz mono samples, or nothing if no speech was heard.
    fn record(&self) -> Result<Vec<f32>> {
        // cpal streams are not Send, so the device is opened on this thread
        let microphone = Microphone::open()?;
        let sample_rate = microphone.sample_rate();

        let mut endpointer = Endpointer::new(sample_rate, &self.config);
        let recording = microphone.record(&self.stop_flag, |block| endpointer.push(block))?;

        if !endpointer.heard_speech() {
            debug!("No speech in {} samples", recording.len());
            return Ok(Vec::new());
        }

        debug!(
            "Captured {:.2}s of audio",
            recording.len() as f32 / sample_rate as f32
        );
        resample_audio(&recording, sample_rate, WHISPER_SAMPLE_RATE)
    }

    fn transcribe(&self, samples: &[f32]) -> Result<String> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_n_threads(self.config.n_threads);
        params.set_translate(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_single_segment(true);

        if let Some(ref language) = self.language {
            params.set_language(Some(language.as_str()));
        }

        let mut state = self
            .context
            .create_state()
            .map_err(|e| MurmurError::Speech(format!("Failed to create state: {:?}", e)))?;

        state
            .full(params, samples)
            .map_err(|e| MurmurError::Speech(format!("Transcription failed: {:?}", e)))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| MurmurError::Speech(format!("Failed to get segments: {:?}", e)))?;

        let mut text = String::new();
        for i in 0..num_segments {
            let segment = state.full_get_segment_text(i).map_err(|e| {
                MurmurError::Speech(format!("Failed to get segment text: {:?}", e))
            })?;
            text.push_str(&segment);
        }

        let text = text.trim().to_string();
        debug!("Transcription result: '{}'", text);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WhisperConfig {
        WhisperConfig {
            max_listen_secs: 2.0,
            silence_secs: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_language_for_locale() {
        assert_eq!(language_for_locale("en-US"), Some("en".to_string()));
        assert_eq!(language_for_locale("de_DE"), Some("de".to_string()));
        assert_eq!(language_for_locale("FR"), Some("fr".to_string()));
        assert_eq!(language_for_locale(""), None);
    }

    #[test]
    fn test_silence_alone_runs_to_cap() {
        let mut endpointer = Endpointer::new(1000, &config());
        let quiet = CapturedBlock::new(vec![0.0f32; 100]);

        // 1.9s of silence does not end the session
        for _ in 0..19 {
            assert!(!endpointer.push(&quiet));
        }
        assert!(endpointer.push(&quiet));
        assert!(!endpointer.heard_speech());
    }

    #[test]
    fn test_trailing_silence_ends_session() {
        let mut endpointer = Endpointer::new(1000, &config());
        let loud = CapturedBlock::new(vec![0.5f32; 100]);
        let quiet = CapturedBlock::new(vec![0.0f32; 100]);

        assert!(!endpointer.push(&loud));
        for _ in 0..4 {
            assert!(!endpointer.push(&quiet));
        }
        assert!(endpointer.push(&quiet));
        assert!(endpointer.heard_speech());
    }

    #[test]
    fn test_speech_resets_silence() {
        let mut endpointer = Endpointer::new(1000, &config());
        let loud = CapturedBlock::new(vec![0.5f32; 100]);
        let quiet = CapturedBlock::new(vec![0.0f32; 100]);

        endpointer.push(&loud);
        for _ in 0..4 {
            endpointer.push(&quiet);
        }
        endpointer.push(&loud);
        assert!(!endpointer.push(&quiet));
    }

    #[test]
    fn test_missing_model() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            ..Default::default()
        };
        assert!(matches!(
            WhisperRecognizer::new(config),
            Err(MurmurError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_config_from_client_config() {
        let client = ClientConfig::default();
        let config = WhisperConfig::from(&client);
        assert_eq!(config.model_path, client.whisper_model);
        assert_eq!(config.silence_secs, client.silence_secs);
    }
}
