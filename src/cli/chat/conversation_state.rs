use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most recent turns kept as context (10 exchanges).
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendPhase {
    #[default]
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendRejected {
    #[error("a request is already pending")]
    Pending,
}

/// Conversation context sent along with every request, plus the
/// idle/pending flag guarding against overlapping sends.
#[derive(Debug, Default)]
pub struct ConversationState {
    messages: Vec<ChatTurn>,
    phase: SendPhase,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, message: &str) {
        self.push(Role::User, message);
    }

    pub fn push_assistant(&mut self, message: &str) {
        self.push(Role::Assistant, message);
    }

    fn push(&mut self, role: Role, content: &str) {
        self.messages.push(ChatTurn {
            role,
            content: content.to_string(),
        });

        if self.messages.len() > HISTORY_LIMIT {
            let excess = self.messages.len() - HISTORY_LIMIT;
            self.messages.drain(..excess);
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase() == SendPhase::AwaitingResponse
    }

    pub fn begin_send(&mut self) -> Result<(), SendRejected> {
        if self.is_pending() {
            return Err(SendRejected::Pending);
        }
        self.phase = SendPhase::AwaitingResponse;
        Ok(())
    }

    pub fn finish_send(&mut self) {
        self.phase = SendPhase::Idle;
    }

    pub fn clear(&mut self) -> Result<(), SendRejected> {
        if self.is_pending() {
            return Err(SendRejected::Pending);
        }
        self.messages.clear();
        Ok(())
    }
}
