//! The text-generation seam abilities call through the worker.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::{ChatRequest, LlmClient, Message};

/// Generates a text completion for a prompt.
///
/// `history` sits between the system prompt and the new prompt, oldest
/// first.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<String>;
}

/// Assemble `[system?, history.., user(prompt)]`.
pub fn build_messages(prompt: &str, history: &[Message], system_prompt: Option<&str>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(Message::system(system));
    }
    messages.extend(history.iter().cloned());
    messages.push(Message::user(prompt));
    messages
}

#[async_trait]
impl TextModel for LlmClient {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<String> {
        let request = ChatRequest::new(build_messages(prompt, history, system_prompt));
        let text = self.chat(&request).await?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn history_goes_between_system_and_prompt() {
        let history = vec![Message::user("add milk"), Message::assistant("Added milk.")];
        let messages = build_messages("read it", &history, Some("You are a list helper."));

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[3].content, "read it");
    }

    #[test]
    fn blank_system_prompt_is_dropped() {
        let messages = build_messages("hi", &[], Some("  "));
        assert_eq!(messages, vec![Message::user("hi")]);
    }
}
