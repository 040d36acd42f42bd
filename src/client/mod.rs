//! The conversation controller behind the chat view.
//!
//! A [`ConversationClient`] owns the message list and the generation
//! parameters. Sending appends the user's message right away and spawns the
//! generate-reply call; the reply is appended whenever that call resolves.
//! Overlapping sends are allowed, so replies land in completion order rather
//! than send order.

pub mod platform;
pub mod transport;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail, Result};
use log::{error, info, warn};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::model::builtin_templates;
use crate::web::models::{ChatRequest, GenerationParameters, Message, Role, Template};
use platform::{Platform, Theme};
use transport::ReplyTransport;

/// Appended in place of a reply when the generate-reply call fails.
pub const FALLBACK_REPLY: &str = "⚠️ Error fetching AI response";

/// Used when the server answers successfully but without any choice.
pub const PLACEHOLDER_REPLY: &str = "🤖 This is a mock AI response.";

pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 1.0);
pub const MAX_TOKENS_RANGE: (u32, u32) = (50, 500);

pub const DOWNLOAD_FILE_NAME: &str = "response.json";

struct State {
    messages: Vec<Message>,
    params: GenerationParameters,
    input: String,
    templates: Vec<Template>,
    theme: Theme,
    pending: usize,
}

#[derive(Clone)]
pub struct ConversationClient {
    transport: Arc<dyn ReplyTransport>,
    platform: Platform,
    state: Arc<Mutex<State>>,
}

impl ConversationClient {
    pub fn new(transport: Arc<dyn ReplyTransport>, platform: Platform) -> Self {
        let theme = Theme::from_stored(platform.theme_store.load().as_deref());

        Self {
            transport,
            platform,
            state: Arc::new(Mutex::new(State {
                messages: Vec::new(),
                params: GenerationParameters::default(),
                input: String::new(),
                templates: builtin_templates(),
                theme,
                pending: 0,
            })),
        }
    }

    // The lock is never held across an await, so a poisoned guard still has
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends `text` as the next user message.
    ///
    /// Returns `None` without touching the conversation when `text` is blank.
    /// Otherwise the user message is already in [`messages`](Self::messages)
    /// when this returns, and the handle completes once the reply (or the
    /// fallback) has been appended. Must be called inside a tokio runtime.
    pub fn send_message(&self, text: &str) -> Option<JoinHandle<()>> {
        if text.trim().is_empty() {
            return None;
        }

        let request = {
            let mut state = self.lock();
            state.messages.push(Message::user(text));
            state.pending += 1;
            ChatRequest {
                messages: state.messages.clone(),
                params: state.params.clone(),
            }
        };
        info!(
            "Sending message #{} with model {}",
            request.messages.len(),
            request.params.model
        );

        let client = self.clone();
        Some(tokio::spawn(async move {
            let reply = match client.transport.generate(&request).await {
                Ok(response) => response
                    .into_reply()
                    .unwrap_or_else(|| Message::assistant(PLACEHOLDER_REPLY)),
                Err(e) => {
                    error!("Chat API error: {:#}", e);
                    Message::assistant(FALLBACK_REPLY)
                }
            };

            let mut state = client.lock();
            state.messages.push(reply);
            state.pending -= 1;
        }))
    }

    /// Sends the pending input and clears it. Blank input is left as is.
    pub fn submit_input(&self) -> Option<JoinHandle<()>> {
        let text = std::mem::take(&mut self.lock().input);
        let handle = self.send_message(&text);
        if handle.is_none() {
            self.lock().input = text;
        }
        handle
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.lock().pending > 0
    }

    pub fn input(&self) -> String {
        self.lock().input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.lock().input = text.into();
    }

    pub fn parameters(&self) -> GenerationParameters {
        self.lock().params.clone()
    }

    pub fn set_model(&self, model: impl Into<String>) {
        self.lock().params.model = model.into();
    }

    /// Clamped to the slider range. NaN and infinities are rejected and
    /// leave the current value in place.
    pub fn set_temperature(&self, temperature: f64) -> Result<()> {
        if !temperature.is_finite() {
            bail!("temperature must be a finite number, got {}", temperature);
        }
        let (min, max) = TEMPERATURE_RANGE;
        self.lock().params.temperature = temperature.clamp(min, max);
        Ok(())
    }

    /// Clamped to the slider range.
    pub fn set_max_tokens(&self, max_tokens: u32) {
        let (min, max) = MAX_TOKENS_RANGE;
        self.lock().params.max_tokens = max_tokens.clamp(min, max);
    }

    pub fn templates(&self) -> Vec<Template> {
        self.lock().templates.clone()
    }

    /// Replaces the pending input with the template's text. Returns `false`
    /// and leaves the input alone when no template has that id.
    pub fn load_template(&self, id: &str) -> bool {
        let mut state = self.lock();
        match state.templates.iter().find(|t| t.id == id) {
            Some(template) => {
                state.input = template.text.clone();
                true
            }
            None => {
                warn!("Unknown template: {}", id);
                false
            }
        }
    }

    /// Replaces the template list with the server's.
    pub async fn refresh_templates(&self) -> Result<()> {
        let templates = self.transport.templates().await?;
        info!("Loaded {} template(s)", templates.len());
        self.lock().templates = templates;
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        self.lock().theme
    }

    pub fn toggle_theme(&self) -> Theme {
        let theme = {
            let mut state = self.lock();
            state.theme = state.theme.toggled();
            state.theme
        };

        if let Err(e) = self.platform.theme_store.save(theme.as_str()) {
            error!("Failed to persist theme: {:#}", e);
        }
        theme
    }

    /// Copies an assistant reply to the clipboard.
    pub fn copy_message(&self, index: usize) -> Result<()> {
        let content = self.reply_at(index)?;
        self.platform.clipboard.set_text(&content)
    }

    /// Saves an assistant reply as `{"response": ...}` to `response.json`.
    pub fn download_message(&self, index: usize) -> Result<()> {
        let content = self.reply_at(index)?;
        let blob = serde_json::to_string_pretty(&json!({ "response": content }))?;
        self.platform.downloader.save(DOWNLOAD_FILE_NAME, &blob)
    }

    fn reply_at(&self, index: usize) -> Result<String> {
        let state = self.lock();
        let message = state
            .messages
            .get(index)
            .ok_or_else(|| anyhow!("No message at index {}", index))?;
        if message.role != Role::Assistant {
            bail!("Message {} is not an assistant reply", index);
        }
        Ok(message.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::platform::{MemoryClipboard, MemoryDownloader, MemoryThemeStore, ThemeStore};
    use super::*;
    use crate::model::Synthesizer;
    use crate::web::models::ChatResponse;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Answers like the real server; a message reading "slow" waits for the gate.
    #[derive(Default)]
    struct LocalTransport {
        gate: Notify,
        empty: bool,
    }

    #[async_trait]
    impl ReplyTransport for LocalTransport {
        async fn generate(&self, req: &ChatRequest) -> Result<ChatResponse> {
            if req.messages.last().map(|m| m.content.as_str()) == Some("slow") {
                self.gate.notified().await;
            }
            if self.empty {
                return Ok(ChatResponse { choices: vec![] });
            }
            Ok(Synthesizer::new().synthesize(req))
        }

        async fn templates(&self) -> Result<Vec<Template>> {
            Ok(vec![Template {
                id: "summary".to_string(),
                text: "Summarize the following text...".to_string(),
            }])
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl ReplyTransport for FailingTransport {
        async fn generate(&self, _req: &ChatRequest) -> Result<ChatResponse> {
            Err(anyhow!("connection refused"))
        }

        async fn templates(&self) -> Result<Vec<Template>> {
            Err(anyhow!("connection refused"))
        }
    }

    fn client_with(transport: Arc<dyn ReplyTransport>) -> ConversationClient {
        ConversationClient::new(transport, Platform::in_memory())
    }

    #[tokio::test]
    async fn blank_messages_are_ignored() {
        let client = client_with(Arc::new(LocalTransport::default()));

        assert!(client.send_message("").is_none());
        assert!(client.send_message("   ").is_none());
        assert!(client.messages().is_empty());
        assert!(!client.is_awaiting_reply());
    }

    #[tokio::test]
    async fn appends_user_message_then_reply() {
        let client = client_with(Arc::new(LocalTransport::default()));
        client.set_model("Gemini");

        let handle = client.send_message("Hi").unwrap();
        assert_eq!(client.messages(), vec![Message::user("Hi")]);
        assert!(client.is_awaiting_reply());

        handle.await.unwrap();
        let messages = client.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(messages[1].content.contains("Model: Gemini"));
        assert!(messages[1].content.contains("Your Message: \"Hi\""));
        assert!(!client.is_awaiting_reply());
    }

    #[tokio::test]
    async fn failure_appends_fallback() {
        let client = client_with(Arc::new(FailingTransport));

        client.send_message("Hi").unwrap().await.unwrap();
        assert_eq!(
            client.messages(),
            vec![Message::user("Hi"), Message::assistant(FALLBACK_REPLY)]
        );
    }

    #[tokio::test]
    async fn empty_envelope_appends_placeholder() {
        let client = client_with(Arc::new(LocalTransport {
            empty: true,
            ..Default::default()
        }));

        client.send_message("Hi").unwrap().await.unwrap();
        assert_eq!(client.messages()[1], Message::assistant(PLACEHOLDER_REPLY));
    }

    #[tokio::test]
    async fn overlapping_replies_land_in_completion_order() {
        let transport = Arc::new(LocalTransport::default());
        let client = client_with(transport.clone());

        let slow = client.send_message("slow").unwrap();
        let fast = client.send_message("fast").unwrap();

        fast.await.unwrap();
        let messages = client.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::user("slow"));
        assert_eq!(messages[1], Message::user("fast"));
        assert!(messages[2].content.contains("Your Message: \"fast\""));
        assert!(client.is_awaiting_reply());

        transport.gate.notify_one();
        slow.await.unwrap();
        let messages = client.messages();
        assert_eq!(messages.len(), 4);
        assert!(messages[3].content.contains("Your Message: \"slow\""));
        assert!(!client.is_awaiting_reply());
    }

    #[tokio::test]
    async fn submit_input_sends_and_clears() {
        let client = client_with(Arc::new(LocalTransport::default()));

        client.set_input("  ");
        assert!(client.submit_input().is_none());
        assert_eq!(client.input(), "  ");

        assert!(client.load_template("blog"));
        client.submit_input().unwrap().await.unwrap();
        assert_eq!(client.input(), "");
        assert_eq!(
            client.messages()[0],
            Message::user("Write a blog post about AI trends in 2025.")
        );
    }

    #[tokio::test]
    async fn parameters_are_clamped_and_sent() {
        let client = client_with(Arc::new(LocalTransport::default()));
        client.set_temperature(1.7).unwrap();
        client.set_max_tokens(10);

        let params = client.parameters();
        assert_eq!(params.temperature, 1.0);
        assert_eq!(params.max_tokens, 50);

        client.set_temperature(0.25).unwrap();
        client.set_max_tokens(320);
        client.send_message("x").unwrap().await.unwrap();
        let reply = &client.messages()[1].content;
        assert!(reply.contains("Temperature: 0.25"));
        assert!(reply.contains("Max Tokens: 320"));
    }

    #[tokio::test]
    async fn template_loading_replaces_input() {
        let client = client_with(Arc::new(LocalTransport::default()));
        client.set_input("draft");

        assert!(!client.load_template("missing"));
        assert_eq!(client.input(), "draft");

        assert!(client.load_template("welcome"));
        assert_eq!(client.input(), "Hello, how can I help you today?");

        client.refresh_templates().await.unwrap();
        assert!(!client.load_template("welcome"));
        assert!(client.load_template("summary"));
        assert_eq!(client.input(), "Summarize the following text...");
    }

    #[tokio::test]
    async fn failed_template_refresh_keeps_list() {
        let client = client_with(Arc::new(FailingTransport));

        assert!(client.refresh_templates().await.is_err());
        assert_eq!(client.templates(), builtin_templates());
    }

    #[test]
    fn theme_is_loaded_and_persisted() {
        let store = Arc::new(MemoryThemeStore::default());
        store.save("dark").unwrap();
        let platform = Platform {
            theme_store: store.clone(),
            ..Platform::in_memory()
        };

        let client = ConversationClient::new(Arc::new(FailingTransport), platform);
        assert_eq!(client.theme(), Theme::Dark);
        assert_eq!(client.toggle_theme(), Theme::Light);
        assert_eq!(store.load().as_deref(), Some("light"));
    }

    #[tokio::test]
    async fn copies_and_downloads_messages() {
        let clipboard = Arc::new(MemoryClipboard::default());
        let downloader = Arc::new(MemoryDownloader::default());
        let platform = Platform {
            clipboard: clipboard.clone(),
            downloader: downloader.clone(),
            ..Platform::in_memory()
        };
        let client = ConversationClient::new(Arc::new(FailingTransport), platform);
        client.send_message("Hi").unwrap().await.unwrap();

        client.copy_message(1).unwrap();
        assert_eq!(clipboard.text().as_deref(), Some(FALLBACK_REPLY));

        client.download_message(1).unwrap();
        let files = downloader.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "response.json");
        let blob: serde_json::Value = serde_json::from_str(&files[0].1).unwrap();
        assert_eq!(blob, json!({ "response": FALLBACK_REPLY }));

        assert!(client.copy_message(5).is_err());
        assert!(client.copy_message(0).is_err());
        assert!(client.download_message(0).is_err());
        assert_eq!(downloader.files().len(), 1);
    }

    #[tokio::test]
    async fn non_finite_temperature_is_rejected() {
        let client = client_with(Arc::new(LocalTransport::default()));
        client.set_temperature(0.3).unwrap();

        assert!(client.set_temperature(f64::NAN).is_err());
        assert!(client.set_temperature(f64::INFINITY).is_err());
        assert_eq!(client.parameters().temperature, 0.3);

        // The request still serializes, so the reply is a real one.
        let request = ChatRequest {
            messages: vec![Message::user("Hi")],
            params: client.parameters(),
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["temperature"], json!(0.3));

        client.send_message("Hi").unwrap().await.unwrap();
        let reply = &client.messages()[1].content;
        assert_ne!(reply.as_str(), FALLBACK_REPLY);
        assert!(reply.contains("Temperature: 0.3"));
    }
}
