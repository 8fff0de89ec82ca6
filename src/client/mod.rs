//! Chat backends: where streamed response text comes from.
//!
//! [`ChatBackend`] is the seam between the pump thread and the network. The
//! pump only ever sees text deltas and a final `Result`; everything about the
//! wire protocol lives behind the trait. [`OllamaClient`] is the production
//! implementation.

mod ollama;

pub use ollama::{OllamaClient, PullProgress, DEFAULT_URL};

use crate::actor::CancelToken;
use crate::error::Result;
use crate::turn::ChatTurn;

/// Everything a backend needs to produce one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation so far, oldest first.
    pub turns: Vec<ChatTurn>,
    /// Optional system prompt, prepended as a `system` turn.
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    /// Create a request without a system prompt.
    pub fn new(model: impl Into<String>, turns: Vec<ChatTurn>) -> Self {
        Self {
            model: model.into(),
            turns,
            system_prompt: None,
        }
    }

    /// Attach a system prompt. Blank prompts are ignored.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: Option<&str>) -> Self {
        self.system_prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        self
    }

    /// The messages to send, system prompt first.
    pub fn messages(&self) -> Vec<ChatTurn> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatTurn::system(prompt.clone()));
        }
        messages.extend(self.turns.iter().cloned());
        messages
    }
}

/// A source of streamed chat responses.
///
/// Implementations block on I/O. They call `on_delta` with each piece of
/// new text, check `cancel` before every unit of input they read, and
/// return `Ok(())` as soon as they observe it.
pub trait ChatBackend: Send + Sync {
    /// Stream one response.
    fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::Role;

    #[test]
    fn test_messages_prepend_system_prompt() {
        let request = ChatRequest::new("llama3", vec![ChatTurn::user("hi")])
            .with_system_prompt(Some("Be brief."));
        let messages = request.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Be brief.");
        assert_eq!(messages[1], ChatTurn::user("hi"));
    }

    #[test]
    fn test_blank_system_prompt_ignored() {
        let request = ChatRequest::new("m", vec![]).with_system_prompt(Some("   "));
        assert!(request.system_prompt.is_none());
        assert!(request.messages().is_empty());
    }
}
