//! Voice capture adapter
//!
//! Wraps a [`SpeechRecognizer`] behind a toggle with three states. Outcomes
//! come back on a channel and are picked up from the UI thread by
//! [`VoiceCapture::poll`].

use super::{RecognitionOutcome, SpeechRecognizer};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

/// Voice input state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// No usable recognizer; the mic control is hidden
    Unavailable,
    /// Ready to listen
    Idle,
    /// Capturing speech
    Listening,
}

/// Outcome tagged with the capture session that produced it
#[derive(Debug)]
struct SessionOutcome {
    session: u64,
    outcome: RecognitionOutcome,
}

pub struct VoiceCapture {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    state: VoiceState,
    locale: String,
    session: u64,
    outcome_tx: Sender<SessionOutcome>,
    outcome_rx: Receiver<SessionOutcome>,
}

impl VoiceCapture {
    /// Create the adapter.
    ///
    /// Without a recognizer, or with one that reports itself unavailable,
    /// the adapter is permanently [`VoiceState::Unavailable`].
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>, locale: impl Into<String>) -> Self {
        let recognizer = recognizer.filter(|r| r.is_available());
        let state = if recognizer.is_some() {
            VoiceState::Idle
        } else {
            info!("Speech recognition unavailable; voice input disabled");
            VoiceState::Unavailable
        };

        let (outcome_tx, outcome_rx) = unbounded();

        Self {
            recognizer,
            state,
            locale: locale.into(),
            session: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    /// An adapter with no recognizer
    pub fn unavailable() -> Self {
        Self::new(None, "en-US")
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.state != VoiceState::Unavailable
    }

    pub fn is_listening(&self) -> bool {
        self.state == VoiceState::Listening
    }

    /// Hover text for the mic control
    pub fn tooltip(&self) -> &'static str {
        match self.state {
            VoiceState::Listening => "Listening... Click to stop",
            _ => "Click to speak",
        }
    }

    /// Start listening when idle, stop when listening
    pub fn toggle(&mut self) -> VoiceState {
        match self.state {
            VoiceState::Unavailable => {}
            VoiceState::Idle => self.start(),
            VoiceState::Listening => self.stop(),
        }
        self.state
    }

    fn start(&mut self) {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return;
        };

        self.session += 1;
        let session = self.session;
        let outcome_tx = self.outcome_tx.clone();

        let callback = Box::new(move |outcome: RecognitionOutcome| {
            if outcome_tx.send(SessionOutcome { session, outcome }).is_err() {
                debug!("Voice capture gone; dropping recognition outcome");
            }
        });

        match recognizer.start(&self.locale, callback) {
            Ok(()) => {
                self.state = VoiceState::Listening;
                debug!("Listening (session {})", session);
            }
            Err(e) => {
                warn!("Failed to start speech recognition: {}", e);
                self.state = VoiceState::Idle;
            }
        }
    }

    /// Stop listening, if listening
    pub fn stop(&mut self) {
        if self.state != VoiceState::Listening {
            return;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.state = VoiceState::Idle;
        debug!("Stopped listening (session {})", self.session);
    }

    /// Drain recognition outcomes.
    ///
    /// Returns the transcript that should go into the input field, if any.
    /// Outcomes from sessions older than the latest start are ignored.
    pub fn poll(&mut self) -> Option<String> {
        let mut transcript = None;

        while let Ok(SessionOutcome { session, outcome }) = self.outcome_rx.try_recv() {
            if session != self.session {
                debug!("Ignoring outcome of stale session {}", session);
                continue;
            }

            match outcome {
                RecognitionOutcome::Transcript(text) => {
                    debug!("Transcript received ({} chars)", text.len());
                    transcript = Some(text);
                }
                RecognitionOutcome::Error(reason) => {
                    warn!("Speech recognition error: {}", reason);
                }
            }

            if self.state == VoiceState::Listening {
                if let Some(recognizer) = self.recognizer.as_mut() {
                    recognizer.stop();
                }
                self.state = VoiceState::Idle;
            }
        }

        transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::CompletionCallback;
    use crate::{MurmurError, Result};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recognizer that hands its callback to the test
    #[derive(Clone, Default)]
    struct Scripted {
        available: bool,
        fail_start: bool,
        pending: Arc<Mutex<Vec<CompletionCallback>>>,
        stops: Arc<Mutex<usize>>,
    }

    impl Scripted {
        fn available() -> Self {
            Self {
                available: true,
                ..Default::default()
            }
        }

        fn complete(&self, outcome: RecognitionOutcome) {
            let callback = self.pending.lock().pop().expect("no capture in progress");
            callback(outcome);
        }
    }

    impl SpeechRecognizer for Scripted {
        fn is_available(&self) -> bool {
            self.available
        }

        fn start(&mut self, _locale: &str, on_complete: CompletionCallback) -> Result<()> {
            if self.fail_start {
                return Err(MurmurError::Speech("not-allowed".into()));
            }
            self.pending.lock().push(on_complete);
            Ok(())
        }

        fn stop(&mut self) {
            *self.stops.lock() += 1;
        }
    }

    #[test]
    fn test_unavailable_never_listens() {
        let mut capture = VoiceCapture::unavailable();
        assert_eq!(capture.toggle(), VoiceState::Unavailable);

        let mut capture = VoiceCapture::new(Some(Box::new(Scripted::default())), "en-US");
        assert_eq!(capture.state(), VoiceState::Unavailable);
        assert_eq!(capture.toggle(), VoiceState::Unavailable);
        assert!(!capture.is_listening());
    }

    #[test]
    fn test_toggle_cycle() {
        let recognizer = Scripted::available();
        let mut capture = VoiceCapture::new(Some(Box::new(recognizer.clone())), "en-US");

        assert_eq!(capture.tooltip(), "Click to speak");
        assert_eq!(capture.toggle(), VoiceState::Listening);
        assert_eq!(capture.tooltip(), "Listening... Click to stop");
        assert_eq!(capture.toggle(), VoiceState::Idle);
        assert_eq!(*recognizer.stops.lock(), 1);
    }

    #[test]
    fn test_transcript_returns_to_idle() {
        let recognizer = Scripted::available();
        let mut capture = VoiceCapture::new(Some(Box::new(recognizer.clone())), "en-US");

        capture.toggle();
        recognizer.complete(RecognitionOutcome::Transcript("hello there".into()));

        assert_eq!(capture.poll(), Some("hello there".to_string()));
        assert_eq!(capture.state(), VoiceState::Idle);
    }

    #[test]
    fn test_error_returns_to_idle_without_text() {
        let recognizer = Scripted::available();
        let mut capture = VoiceCapture::new(Some(Box::new(recognizer.clone())), "en-US");

        capture.toggle();
        recognizer.complete(RecognitionOutcome::Error("no-speech".into()));

        assert_eq!(capture.poll(), None);
        assert_eq!(capture.state(), VoiceState::Idle);
    }

    #[test]
    fn test_failed_start_stays_idle() {
        let recognizer = Scripted {
            available: true,
            fail_start: true,
            ..Default::default()
        };
        let mut capture = VoiceCapture::new(Some(Box::new(recognizer)), "en-US");
        assert_eq!(capture.toggle(), VoiceState::Idle);
    }

    #[test]
    fn test_stale_session_ignored() {
        let recognizer = Scripted::available();
        let mut capture = VoiceCapture::new(Some(Box::new(recognizer.clone())), "en-US");

        // First session stopped by the user, second one started
        capture.toggle();
        let first = recognizer.pending.lock().pop().unwrap();
        capture.toggle();
        capture.toggle();

        first(RecognitionOutcome::Transcript("old".into()));
        assert_eq!(capture.poll(), None);
        assert!(capture.is_listening());
    }
}
