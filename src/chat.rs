use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog;
use crate::error::ChatError;
use crate::gemini::types::{Content, GenerateContentRequest};
use crate::gemini::GeminiClient;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn provider_role(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Stateless question/answer against the chat model, scoped by a fixed
/// system instruction.
///
/// With `multi_turn` off (the default) any history passed in is ignored and
/// every call is a single-turn exchange.
pub struct ChatQuery {
    client: Arc<GeminiClient>,
    model: String,
    system_instruction: String,
    multi_turn: bool,
}

impl ChatQuery {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_instruction: catalog::system_instruction(),
            multi_turn: false,
        }
    }

    pub fn with_multi_turn(mut self, multi_turn: bool) -> Self {
        self.multi_turn = multi_turn;
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn is_multi_turn(&self) -> bool {
        self.multi_turn
    }

    pub async fn ask(&self, prompt: &str) -> Result<String, ChatError> {
        self.ask_with_history(&[], prompt).await
    }

    pub async fn ask_with_history(
        &self,
        history: &[ChatTurn],
        prompt: &str,
    ) -> Result<String, ChatError> {
        let request = self.build_request(history, prompt);
        debug!(model = %self.model, turns = request.contents.len(), "sending chat request");

        let response = self.client.generate_content(&self.model, &request).await?;
        match response.text() {
            Some(text) if !text.trim().is_empty() => {
                info!(model = %self.model, chars = text.len(), "chat reply received");
                Ok(text)
            }
            _ => Err(ChatError::EmptyResponse),
        }
    }

    fn build_request(&self, history: &[ChatTurn], prompt: &str) -> GenerateContentRequest {
        let mut contents = Vec::new();
        if self.multi_turn {
            contents.extend(
                history
                    .iter()
                    .map(|t| Content::text(Some(t.role.provider_role()), t.text.as_str())),
            );
        }
        contents.push(Content::text(Some(Role::User.provider_role()), prompt));

        GenerateContentRequest {
            system_instruction: Content::text(None, self.system_instruction.as_str()),
            contents,
        }
    }
}
