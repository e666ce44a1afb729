//! Chat controller
//!
//! Owns everything the window shows: the message log, the input text, the
//! voice capture adapter and the new-session prompt. It issues requests
//! through the [`TransportWorker`] and applies their completions when the
//! UI thread calls [`ChatController::poll_events`].

use crate::audio::AudioPlayback;
use crate::config::{ClientConfig, ResponseOrdering};
use crate::messages::{Message, MessageLog, Sender};
use crate::speech::{SpeechRecognizer, VoiceCapture, VoiceState};
use crate::transport::{
    ChatApi, ChatReply, HistoryEntry, NewSessionReply, TransportCommand, TransportEvent,
    TransportWorker,
};
use crate::{Result, CONNECTION_APOLOGY};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEBUG_LOG_CAPACITY: usize = 100;

/// Debug information displayed in the debug panel
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    /// Status of the most recent request
    pub transport_status: String,
    /// Status of the most recent capture session
    pub voice_status: String,
    /// Recent log messages
    pub log_messages: VecDeque<String>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self {
            log_messages: VecDeque::with_capacity(DEBUG_LOG_CAPACITY),
            ..Default::default()
        }
    }

    pub fn add_log(&mut self, message: impl Into<String>) {
        if self.log_messages.len() >= DEBUG_LOG_CAPACITY {
            self.log_messages.pop_front();
        }
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.log_messages
            .push_back(format!("[{}] {}", stamp, message.into()));
    }
}

/// Central chat state
pub struct ChatController {
    config: ClientConfig,

    /// The rendered conversation
    pub log: MessageLog,

    /// Current contents of the input field
    pub input_text: String,

    /// Debug information
    pub debug_info: DebugInfo,

    /// Whether to show the debug panel
    pub show_debug_panel: bool,

    voice: VoiceCapture,
    transport: TransportWorker,
    player: Box<dyn AudioPlayback>,

    /// Sequence number of the most recently issued send
    next_seq: u64,
    /// Highest send sequence whose reply has been applied
    latest_rendered_seq: u64,
    /// Sequence number of the most recently requested audio download
    next_audio_seq: u64,
    /// Sequence number of the audio currently loaded in the player
    playing_audio_seq: u64,

    confirm_pending: bool,
    initialized: bool,
}

impl ChatController {
    /// Build the controller. No request is issued until [`Self::init`].
    pub fn new(
        config: ClientConfig,
        api: Arc<dyn ChatApi>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        player: Box<dyn AudioPlayback>,
    ) -> Result<Self> {
        let recognizer = if config.enable_voice { recognizer } else { None };
        let voice = VoiceCapture::new(recognizer, config.speech_locale.clone());
        let transport = TransportWorker::new(api)?;

        let mut debug_info = DebugInfo::new();
        debug_info.add_log(format!("Chat service: {}", config.base_url));
        debug_info.voice_status = format!("{:?}", voice.state());

        Ok(Self {
            config,
            log: MessageLog::new(),
            input_text: String::new(),
            debug_info,
            show_debug_panel: false,
            voice,
            transport,
            player,
            next_seq: 0,
            latest_rendered_seq: 0,
            next_audio_seq: 0,
            playing_audio_seq: 0,
            confirm_pending: false,
            initialized: false,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Load the conversation history. Only the first call does anything.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        info!("Loading conversation history");
        self.debug_info.add_log("Loading history");
        if let Err(e) = self.transport.dispatch(TransportCommand::FetchHistory) {
            warn!("Could not request history: {}", e);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Send the input text.
    ///
    /// Whitespace-only input is ignored and left in place. Otherwise the
    /// trimmed text is echoed into the log, the input is cleared and exactly
    /// one send is issued. Returns whether a send happened.
    pub fn submit(&mut self) -> bool {
        let text = self.input_text.trim().to_string();
        if text.is_empty() {
            return false;
        }

        self.log.append(Sender::User, text.clone());
        self.input_text.clear();

        self.next_seq += 1;
        let seq = self.next_seq;
        debug!("Sending message #{} ({} chars)", seq, text.len());
        self.debug_info.add_log(format!("Send #{}", seq));

        if let Err(e) = self
            .transport
            .dispatch(TransportCommand::SendMessage { seq, text })
        {
            warn!("Could not issue send #{}: {}", seq, e);
            self.debug_info.add_log(format!("Send #{} failed: {}", seq, e));
            self.log.append(Sender::Assistant, CONNECTION_APOLOGY);
        }

        true
    }

    /// Start or stop voice capture
    pub fn toggle_voice(&mut self) -> VoiceState {
        let state = self.voice.toggle();
        self.debug_info.voice_status = format!("{:?}", state);
        state
    }

    pub fn voice_state(&self) -> VoiceState {
        self.voice.state()
    }

    pub fn voice_tooltip(&self) -> &'static str {
        self.voice.tooltip()
    }

    /// User asked for a new conversation. Prompts first when configured to.
    pub fn request_new_session(&mut self) {
        if self.config.confirm_new_session {
            self.confirm_pending = true;
        } else {
            self.start_new_session();
        }
    }

    pub fn is_confirm_pending(&self) -> bool {
        self.confirm_pending
    }

    /// The user accepted the new-session prompt
    pub fn confirm_new_session(&mut self) {
        self.confirm_pending = false;
        self.start_new_session();
    }

    /// The user dismissed the new-session prompt
    pub fn cancel_new_session(&mut self) {
        self.confirm_pending = false;
    }

    fn start_new_session(&mut self) {
        info!("Starting a new conversation");
        self.debug_info.add_log("New session requested");
        if let Err(e) = self.transport.dispatch(TransportCommand::StartNewSession) {
            warn!("Could not request a new session: {}", e);
        }
    }

    /// Play a message's audio attachment again. Returns whether a download
    /// was issued.
    pub fn replay_audio(&mut self, id: Uuid) -> bool {
        let Some(reference) = self.log.find(id).and_then(|m| m.audio_url) else {
            return false;
        };
        self.fetch_audio(reference)
    }

    fn fetch_audio(&mut self, reference: String) -> bool {
        if !self.config.enable_audio_playback {
            return false;
        }
        self.next_audio_seq += 1;
        let seq = self.next_audio_seq;
        match self
            .transport
            .dispatch(TransportCommand::FetchAudio { seq, reference })
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not request audio: {}", e);
                false
            }
        }
    }

    /// Whether anything is outstanding that will change the UI later,
    /// including completions already received but not yet applied
    pub fn is_busy(&self) -> bool {
        self.transport.in_flight() > 0
            || self.transport.has_pending_events()
            || self.voice.is_listening()
    }

    /// Apply every completion that has arrived. Returns how many were applied.
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;

        while let Some(event) = self.transport.try_recv() {
            self.handle_event(event);
            applied += 1;
        }

        if self.poll_voice() {
            applied += 1;
        }

        applied
    }

    /// Block up to `timeout` for one transport completion and apply it
    pub fn wait_for_event(&mut self, timeout: Duration) -> bool {
        match self.transport.recv_timeout(timeout) {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    fn poll_voice(&mut self) -> bool {
        let was_listening = self.voice.is_listening();
        let transcript = self.voice.poll();

        if was_listening && !self.voice.is_listening() {
            self.debug_info.voice_status = format!("{:?}", self.voice.state());
        }

        match transcript {
            Some(text) => {
                self.debug_info.add_log(format!("Transcript: \"{}\"", text));
                self.input_text = text;
                true
            }
            None => false,
        }
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Reply { seq, result } => self.handle_reply(seq, result),
            TransportEvent::History(result) => self.handle_history(result),
            TransportEvent::NewSession(result) => self.handle_new_session(result),
            TransportEvent::Audio {
                seq,
                reference,
                result,
            } => self.handle_audio(seq, reference, result),
        }
    }

    /// Play a downloaded attachment unless a later request already played
    fn handle_audio(&mut self, seq: u64, reference: String, result: Result<Vec<u8>>) {
        if seq < self.playing_audio_seq {
            debug!(
                "Skipping audio #{} ({}); #{} already playing",
                seq, reference, self.playing_audio_seq
            );
            self.debug_info.add_log(format!("Audio #{} superseded", seq));
            return;
        }

        match result {
            Ok(bytes) => {
                debug!("Playing {} ({} bytes)", reference, bytes.len());
                self.playing_audio_seq = seq;
                if let Err(e) = self.player.load_and_play(bytes) {
                    warn!("Playback of {} failed: {}", reference, e);
                    self.debug_info.add_log(format!("Playback failed: {}", e));
                }
            }
            Err(e) => {
                warn!("Audio download failed: {}", e);
                self.debug_info.add_log(format!("Audio download failed: {}", e));
            }
        }
    }

    fn handle_reply(&mut self, seq: u64, result: Result<ChatReply>) {
        if self.config.ordering == ResponseOrdering::Latest && seq < self.latest_rendered_seq {
            info!(
                "Dropping reply #{}; #{} already rendered",
                seq, self.latest_rendered_seq
            );
            self.debug_info
                .add_log(format!("Reply #{} superseded", seq));
            return;
        }
        self.latest_rendered_seq = self.latest_rendered_seq.max(seq);

        match result {
            Ok(reply) => {
                self.debug_info.transport_status = format!("Reply #{} ok", seq);
                let message = self.log.push(
                    Message::new(Sender::Assistant, reply.response).with_audio(reply.audio_url),
                );
                if let Some(reference) = message.audio_url {
                    self.fetch_audio(reference);
                }
            }
            Err(e) => {
                warn!("Send #{} failed: {}", seq, e);
                self.debug_info.transport_status = format!("Reply #{} failed", seq);
                self.debug_info.add_log(e.to_string());
                self.log.append(Sender::Assistant, e.user_message());
            }
        }
    }

    fn handle_history(&mut self, result: Result<Vec<HistoryEntry>>) {
        match result {
            Ok(entries) => {
                info!("Loaded {} history entries", entries.len());
                self.debug_info
                    .add_log(format!("History: {} entries", entries.len()));
                for entry in entries {
                    self.log
                        .append(Sender::from_is_user(entry.is_user), entry.message);
                }
            }
            Err(e) => {
                warn!("Failed to load history: {}", e);
                self.debug_info.add_log(format!("History failed: {}", e));
            }
        }
    }

    fn handle_new_session(&mut self, result: Result<NewSessionReply>) {
        match result {
            Ok(NewSessionReply { success: true }) => {
                info!("New conversation started");
                self.debug_info.add_log("New session started");
                self.log.clear();
            }
            Ok(NewSessionReply { success: false }) => {
                warn!("Service declined to start a new session");
                self.debug_info.add_log("New session declined");
            }
            Err(e) => {
                warn!("Failed to start a new session: {}", e);
                self.debug_info.add_log(format!("New session failed: {}", e));
            }
        }
    }

    /// Stop capture and playback and shut the transport down
    pub fn teardown(&mut self) {
        self.voice.stop();
        self.player.stop();
        if self.transport.is_running() {
            self.transport.shutdown();
            info!("Chat controller torn down");
        }
    }

    /// Whether [`Self::teardown`] has run
    pub fn is_torn_down(&self) -> bool {
        !self.transport.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullPlayback;
    use futures::future::{BoxFuture, FutureExt};

    struct FixedApi;

    impl ChatApi for FixedApi {
        fn send_message<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<ChatReply>> {
            async move { Ok(ChatReply::text(text.to_uppercase())) }.boxed()
        }

        fn fetch_history(&self) -> BoxFuture<'_, Result<Vec<HistoryEntry>>> {
            async { Ok(Vec::new()) }.boxed()
        }

        fn start_new_session(&self) -> BoxFuture<'_, Result<NewSessionReply>> {
            async { Ok(NewSessionReply { success: true }) }.boxed()
        }

        fn fetch_audio<'a>(&'a self, _reference: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
            async { Ok(Vec::new()) }.boxed()
        }
    }

    fn controller() -> ChatController {
        ChatController::new(
            ClientConfig::default(),
            Arc::new(FixedApi),
            None,
            Box::new(NullPlayback),
        )
        .unwrap()
    }

    #[test]
    fn test_debug_log_is_bounded() {
        let mut info = DebugInfo::new();
        for i in 0..150 {
            info.add_log(format!("line {}", i));
        }
        assert_eq!(info.log_messages.len(), DEBUG_LOG_CAPACITY);
        assert!(info.log_messages[0].ends_with("line 50"));
    }

    #[test]
    fn test_whitespace_is_not_sent() {
        let mut controller = controller();
        controller.input_text = "   \t".to_string();
        assert!(!controller.submit());
        assert!(controller.log.is_empty());
        assert_eq!(controller.input_text, "   \t");
    }

    #[test]
    fn test_submit_trims_and_clears() {
        let mut controller = controller();
        controller.input_text = "  hello  ".to_string();
        assert!(controller.submit());
        assert!(controller.input_text.is_empty());
        assert_eq!(controller.log.get_all()[0].text, "hello");

        assert!(controller.wait_for_event(Duration::from_secs(2)));
        assert_eq!(controller.log.get_all()[1].text, "HELLO");
    }

    #[test]
    fn test_confirmation_gate() {
        let mut controller = controller();
        controller.request_new_session();
        assert!(controller.is_confirm_pending());
        controller.cancel_new_session();
        assert!(!controller.is_confirm_pending());
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut controller = controller();
        controller.init();
        controller.init();
        assert!(controller.wait_for_event(Duration::from_secs(2)));
        assert!(!controller.wait_for_event(Duration::from_millis(100)));
    }

    #[test]
    fn test_teardown_then_submit_apologizes() {
        let mut controller = controller();
        controller.teardown();
        assert!(controller.is_torn_down());

        controller.input_text = "hi".to_string();
        controller.submit();
        let messages = controller.log.get_all();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, CONNECTION_APOLOGY);
    }
}
