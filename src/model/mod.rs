use log::{debug, info};

use crate::web::models::{ChatRequest, ChatResponse, Message, Template};

/// Model labels offered by the selector. The first one is the default.
pub const MODELS: [&str; 5] = ["GPT-4", "GPT-3.5", "Claude-3", "Gemini", "Other"];

/// Stand-in for the last message when the conversation is empty.
pub const DEFAULT_GREETING: &str = "Hello";

const NOTICE: &str = "🤖 This is a mock AI response.";

const DISCLAIMER: [&str; 2] = [
    "Note: This is a simulated/mock response to make the UI appear \
     realistic and polished.",
    "We are not calling the actual OpenAI API. This approach is fully \
     valid for frontend-only prototypes.",
];

pub fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            id: "welcome".to_string(),
            text: "Hello, how can I help you today?".to_string(),
        },
        Template {
            id: "blog".to_string(),
            text: "Write a blog post about AI trends in 2025.".to_string(),
        },
    ]
}

// Fabricates assistant replies without calling any model backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct Synthesizer;

impl Synthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(&self, req: &ChatRequest) -> ChatResponse {
        info!(
            "Synthesizing reply for {} message(s) with model {} (temperature: {}, max_tokens: {})",
            req.messages.len(),
            req.params.model,
            req.params.temperature,
            req.params.max_tokens
        );

        // An empty string counts as missing, same as an empty history.
        let last_message = req
            .messages
            .last()
            .map(|m| m.content.as_str())
            .filter(|content| !content.is_empty())
            .unwrap_or(DEFAULT_GREETING);
        debug!("Last message: {}", last_message);

        let content = [
            format!("Model: {}", req.params.model),
            format!("Temperature: {}", req.params.temperature),
            format!("Max Tokens: {}", req.params.max_tokens),
            String::new(),
            format!("Your Message: \"{}\"", last_message),
            String::new(),
            NOTICE.to_string(),
            String::new(),
            "──────".to_string(),
            DISCLAIMER[0].to_string(),
            DISCLAIMER[1].to_string(),
            "──────".to_string(),
        ]
        .join("\n");

        ChatResponse::single(Message::assistant(content))
    }
}
