//! Optional downstream notification for generated cases.
//!
//! Callers may announce a finished case to a chat webhook; the message
//! carries the originating prompt and a bounded preview of the case text.
//! The pipeline itself never depends on this.

use thiserror::Error;

/// Characters of case text included in a notification preview.
pub const PREVIEW_CHARS: usize = 3000;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP client construction failed: {0}")]
    Construction(String),

    #[error("webhook request failed: {0}")]
    Request(String),

    #[error("webhook returned status {0}")]
    Status(u16),
}

/// Notification sink abstraction (allows mocking)
pub trait NotificationSink {
    fn notify(&self, prompt: &str, case_text: &str) -> Result<(), NotifyError>;
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Webhook sink posting a structured JSON message.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Construction(e.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

impl NotificationSink for WebhookNotifier {
    fn notify(&self, prompt: &str, case_text: &str) -> Result<(), NotifyError> {
        let preview = preview(case_text, PREVIEW_CHARS);
        let message = serde_json::json!({
            "text": format!(
                "New case generated!\n\nPrompt: {prompt}\n\nCase output:\n```\n{preview}\n```"
            )
        });

        let response = self
            .client
            .post(&self.url)
            .json(&message)
            .send()
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}
