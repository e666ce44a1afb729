//! reqwest implementation of the chat service transport

use super::{
    parse_chat_body, parse_history_body, parse_new_session_body, ChatApi, ChatReply, ChatRequest,
    HistoryEntry, NewSessionReply,
};
use crate::{MurmurError, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Url};
use tracing::{debug, warn};

/// HTTP client for the chat service.
///
/// Keeps the service's session cookie so all three endpoints talk about the
/// same conversation.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: Url,
}

impl HttpChatApi {
    /// Create a client rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| MurmurError::Config(format!("Invalid base URL {:?}: {}", base_url, e)))?;

        // Url::join replaces the last path segment unless it ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| MurmurError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of a service endpoint such as `chat` or `/history`
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| MurmurError::Config(format!("Invalid endpoint {:?}: {}", path, e)))
    }

    /// Resolve a reference returned by the service (absolute, root-relative
    /// or relative) the way a page served from the base URL would
    pub fn resolve(&self, reference: &str) -> Result<Url> {
        self.base_url
            .join(reference)
            .map_err(|e| MurmurError::Playback(format!("Invalid audio URL {:?}: {}", reference, e)))
    }

    async fn post_chat(&self, text: &str) -> Result<ChatReply> {
        let url = self.endpoint("chat")?;
        let response = self
            .client
            .post(url)
            .json(&ChatRequest { message: text })
            .send()
            .await?;

        // Error replies come with 4xx/5xx statuses but still carry a JSON
        // body, so the body decides the outcome.
        let status = response.status();
        let body = response.bytes().await?;
        debug!("POST /chat -> {} ({} bytes)", status, body.len());

        parse_chat_body(&body)
    }

    async fn get_history(&self) -> Result<Vec<HistoryEntry>> {
        let url = self.endpoint("history")?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!("GET /history -> {} ({} bytes)", status, body.len());

        parse_history_body(&body)
    }

    async fn post_new_session(&self) -> Result<NewSessionReply> {
        let url = self.endpoint("new-session")?;
        let response = self.client.post(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!("POST /new-session -> {}", status);

        parse_new_session_body(&body)
    }

    async fn get_audio(&self, reference: &str) -> Result<Vec<u8>> {
        let url = self.resolve(reference)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MurmurError::Playback(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Audio fetch {} returned {}", url, status);
            return Err(MurmurError::Playback(format!("{} returned {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MurmurError::Playback(format!("Failed to read {}: {}", url, e)))?;
        debug!("Fetched {} bytes of audio from {}", bytes.len(), url);

        Ok(bytes.to_vec())
    }
}

impl ChatApi for HttpChatApi {
    fn send_message<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<ChatReply>> {
        self.post_chat(text).boxed()
    }

    fn fetch_history(&self) -> BoxFuture<'_, Result<Vec<HistoryEntry>>> {
        self.get_history().boxed()
    }

    fn start_new_session(&self) -> BoxFuture<'_, Result<NewSessionReply>> {
        self.post_new_session().boxed()
    }

    fn fetch_audio<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        self.get_audio(reference).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_under_prefix() {
        let api = HttpChatApi::new("https://example.com/sweety").unwrap();
        assert_eq!(api.base_url().as_str(), "https://example.com/sweety/");
        assert_eq!(
            api.endpoint("chat").unwrap().as_str(),
            "https://example.com/sweety/chat"
        );
        assert_eq!(
            api.endpoint("/new-session").unwrap().as_str(),
            "https://example.com/sweety/new-session"
        );
    }

    #[test]
    fn test_resolve_audio_references() {
        let api = HttpChatApi::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(
            api.resolve("/static/audio/a.mp3").unwrap().as_str(),
            "http://127.0.0.1:5000/static/audio/a.mp3"
        );
        assert_eq!(
            api.resolve("https://cdn.example.com/b.mp3").unwrap().as_str(),
            "https://cdn.example.com/b.mp3"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpChatApi::new("::not a url::"),
            Err(MurmurError::Config(_))
        ));
    }
}
