//! Chat-completion backends.
//!
//! A stage call is a role binding, a composed prompt, and the full text of
//! every declared dependency. How the context reaches the model is the
//! backend's business; the contract is only that none of it is truncated.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::roles::RoleBinding;

/// Sampling is pinned for every stage call; deterministic-leaning output
/// keeps fabrication down. Backends that cannot honor these continue with
/// their own defaults.
pub const TEMPERATURE: f32 = 0.0;
pub const TOP_P: f32 = 1.0;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP client construction failed: {0}")]
    Construction(String),

    #[error("backend is not reachable at {0}")]
    Connection(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("backend returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("response parsing error: {0}")]
    ResponseParsing(String),
}

/// Output of an earlier stage supplied as conditioning context.
#[derive(Debug, Clone, Copy)]
pub struct ContextEntry<'a> {
    pub label: &'a str,
    pub text: &'a str,
}

/// Chat-completion abstraction (allows mocking)
pub trait ChatBackend {
    fn complete(
        &self,
        binding: &RoleBinding,
        prompt: &str,
        context: &[ContextEntry<'_>],
    ) -> Result<String, BackendError>;
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

/// HTTP backend speaking the Ollama-style generate API.
pub struct OllamaBackend {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Construction(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

/// Request body for /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

/// Response body from /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// The role binding rendered as a system prompt.
fn system_prompt(binding: &RoleBinding) -> String {
    format!(
        "You are {}.\n\nGoal: {}\n\nBackstory: {}",
        binding.title, binding.goal, binding.backstory
    )
}

/// Prefix the prompt with every dependency's full text.
fn prompt_with_context(prompt: &str, context: &[ContextEntry<'_>]) -> String {
    let mut full = String::new();
    for entry in context {
        full.push_str(&format!(
            "### {} OUTPUT (context, full text)\n{}\n\n",
            entry.label.to_uppercase(),
            entry.text
        ));
    }
    full.push_str(prompt);
    full
}

impl ChatBackend for OllamaBackend {
    fn complete(
        &self,
        binding: &RoleBinding,
        prompt: &str,
        context: &[ContextEntry<'_>],
    ) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let system = system_prompt(binding);
        let full_prompt = prompt_with_context(prompt, context);
        let body = GenerateRequest {
            model: &binding.model,
            prompt: &full_prompt,
            system: &system,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                top_p: TOP_P,
            },
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                BackendError::Connection(self.base_url.clone())
            } else {
                BackendError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }
}

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

/// One recorded backend call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub role_title: String,
    pub model: String,
    pub prompt: String,
    pub context_labels: Vec<String>,
    pub context_texts: Vec<String>,
}

/// Scripted reply for the mock backend.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
    TimeOut(u64),
}

/// Mock backend for tests: replies are consumed in call order, and every
/// call is recorded for inspection through [`MockChatBackend::call_log`].
pub struct MockChatBackend {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Arc<Mutex<Vec<CallRecord>>>,
}

impl MockChatBackend {
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A backend that answers every call with the same text.
    pub fn always(text: &str) -> Self {
        Self::scripted([MockReply::Text(text.to_string())])
    }

    /// Handle to the recorded calls, valid after the backend is boxed away.
    pub fn call_log(&self) -> Arc<Mutex<Vec<CallRecord>>> {
        Arc::clone(&self.calls)
    }
}

impl ChatBackend for MockChatBackend {
    fn complete(
        &self,
        binding: &RoleBinding,
        prompt: &str,
        context: &[ContextEntry<'_>],
    ) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(CallRecord {
            role_title: binding.title.clone(),
            model: binding.model.clone(),
            prompt: prompt.to_string(),
            context_labels: context.iter().map(|c| c.label.to_string()).collect(),
            context_texts: context.iter().map(|c| c.text.to_string()).collect(),
        });

        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(reason)) => Err(BackendError::Http {
                status: 500,
                body: reason,
            }),
            Some(MockReply::TimeOut(secs)) => Err(BackendError::Timeout(secs)),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::roles::AgentRole;

    fn binding() -> RoleBinding {
        RoleBinding {
            role: AgentRole::Writer,
            title: "Case Study Writer".into(),
            goal: "Write the case".into(),
            backstory: "A careful writer".into(),
            model: "llama3".into(),
        }
    }

    #[test]
    fn system_prompt_carries_the_binding() {
        let system = system_prompt(&binding());
        assert!(system.contains("Case Study Writer"));
        assert!(system.contains("Goal: Write the case"));
        assert!(system.contains("Backstory: A careful writer"));
    }

    #[test]
    fn context_is_prefixed_in_full() {
        let context = [
            ContextEntry {
                label: "plan",
                text: "- Section one\n- Section two",
            },
            ContextEntry {
                label: "draft",
                text: "Full draft body",
            },
        ];
        let full = prompt_with_context("FINALIZE: ...", &context);
        assert!(full.contains("### PLAN OUTPUT (context, full text)\n- Section one\n- Section two"));
        assert!(full.contains("### DRAFT OUTPUT (context, full text)\nFull draft body"));
        assert!(full.ends_with("FINALIZE: ..."));
    }

    #[test]
    fn no_context_leaves_prompt_untouched() {
        assert_eq!(prompt_with_context("PLAN: ...", &[]), "PLAN: ...");
    }

    #[test]
    fn ollama_backend_trims_trailing_slash() {
        let backend =
            OllamaBackend::new("http://localhost:11434/", Duration::from_secs(30)).unwrap();
        assert_eq!(backend.base_url, "http://localhost:11434");
        assert_eq!(backend.timeout_secs, 30);
    }

    #[test]
    fn mock_replays_scripted_responses_in_order() {
        let mock = MockChatBackend::scripted([
            MockReply::Text("first".into()),
            MockReply::Text("second".into()),
        ]);
        let b = binding();
        assert_eq!(mock.complete(&b, "p", &[]).unwrap(), "first");
        assert_eq!(mock.complete(&b, "p", &[]).unwrap(), "second");
        // Last reply repeats once the script is exhausted
        assert_eq!(mock.complete(&b, "p", &[]).unwrap(), "second");
    }

    #[test]
    fn mock_records_calls() {
        let mock = MockChatBackend::always("ok");
        let log = mock.call_log();
        let b = binding();
        mock.complete(
            &b,
            "the prompt",
            &[ContextEntry {
                label: "plan",
                text: "plan text",
            }],
        )
        .unwrap();

        let calls = log.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].role_title, "Case Study Writer");
        assert_eq!(calls[0].context_labels, vec!["plan"]);
        assert_eq!(calls[0].context_texts, vec!["plan text"]);
    }

    #[test]
    fn mock_failure_reply_surfaces_as_http_error() {
        let mock = MockChatBackend::scripted([MockReply::Fail("boom".into())]);
        let err = mock.complete(&binding(), "p", &[]).unwrap_err();
        assert!(matches!(err, BackendError::Http { status: 500, .. }));
    }
}
