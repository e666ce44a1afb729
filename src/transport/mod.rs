//! Chat service transport
//!
//! This module provides the three request/response exchanges with the chat
//! service and a background worker that runs them off the UI thread.
//!
//! # Architecture
//!
//! - **ChatApi**: the capability seam; one method per endpoint
//! - **http**: the reqwest implementation of [`ChatApi`]
//! - **worker**: a tokio runtime that runs requests concurrently and reports
//!   completions over a channel, in completion order
//!
//! # Wire format
//!
//! | Endpoint | Method | Request | Response |
//! |---|---|---|---|
//! | `/chat` | POST | `{message}` | `{response, audio_url?}` or `{error}` |
//! | `/history` | GET | | `[{message, is_user}]` |
//! | `/new-session` | POST | | `{success}` |

pub mod http;
pub mod worker;

pub use http::HttpChatApi;
pub use worker::{TransportCommand, TransportEvent, TransportWorker};

use crate::{MurmurError, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Successful reply to a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            audio_url: None,
        }
    }

    pub fn with_audio(mut self, audio_url: impl Into<String>) -> Self {
        self.audio_url = Some(audio_url.into());
        self
    }
}

/// One entry of the server-side conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message: String,
    pub is_user: bool,
}

/// Reply to a new-session request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewSessionReply {
    #[serde(default)]
    pub success: bool,
}

/// Request body for `/chat`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// The two shapes a `/chat` body can take. `error` wins if both are present.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatBody {
    Failure {
        error: String,
    },
    Reply {
        response: String,
        #[serde(default)]
        audio_url: Option<String>,
    },
}

/// Decode a `/chat` response body.
///
/// An `error` field becomes [`MurmurError::Server`]; a body that is not one
/// of the two known shapes is a [`MurmurError::Transport`] failure.
pub fn parse_chat_body(body: &[u8]) -> Result<ChatReply> {
    let parsed: ChatBody = serde_json::from_slice(body)
        .map_err(|e| MurmurError::Transport(format!("Invalid /chat response: {}", e)))?;

    match parsed {
        ChatBody::Failure { error } => Err(MurmurError::Server(error)),
        ChatBody::Reply {
            response,
            audio_url,
        } => Ok(ChatReply {
            response,
            audio_url: audio_url.filter(|url| !url.trim().is_empty()),
        }),
    }
}

/// Decode a `/history` response body
pub fn parse_history_body(body: &[u8]) -> Result<Vec<HistoryEntry>> {
    serde_json::from_slice(body)
        .map_err(|e| MurmurError::Transport(format!("Invalid /history response: {}", e)))
}

/// Decode a `/new-session` response body
pub fn parse_new_session_body(body: &[u8]) -> Result<NewSessionReply> {
    serde_json::from_slice(body)
        .map_err(|e| MurmurError::Transport(format!("Invalid /new-session response: {}", e)))
}

/// The chat service as seen by the client.
///
/// Each call is a single round trip: no retry, no timeout beyond the
/// implementation's default.
pub trait ChatApi: Send + Sync + 'static {
    /// POST `/chat`
    fn send_message<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<ChatReply>>;

    /// GET `/history`
    fn fetch_history(&self) -> BoxFuture<'_, Result<Vec<HistoryEntry>>>;

    /// POST `/new-session`
    fn start_new_session(&self) -> BoxFuture<'_, Result<NewSessionReply>>;

    /// Download an audio attachment referenced by a reply
    fn fetch_audio<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}
