//! Chat turns and the token-bounded memory window

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message in a session history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Approximate token cost of this message
    pub fn tokens(&self) -> usize {
        estimate_tokens(&self.content)
    }
}

/// Rough token estimate (~4 characters per token)
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Selects the most recent history that fits a token budget
#[derive(Debug, Clone, Copy)]
pub struct ChatMemoryBuffer {
    token_limit: usize,
}

impl ChatMemoryBuffer {
    pub fn new(token_limit: usize) -> Self {
        Self { token_limit }
    }

    /// Newest suffix of `history` within the budget.
    ///
    /// Oldest messages are dropped first, and the window never opens with an
    /// assistant reply whose question was dropped.
    pub fn window<'a>(&self, history: &'a [ChatMessage]) -> &'a [ChatMessage] {
        let mut used = 0usize;
        let mut start = history.len();

        for (i, message) in history.iter().enumerate().rev() {
            let cost = message.tokens();
            if used + cost > self.token_limit {
                break;
            }
            used += cost;
            start = i;
        }

        while start < history.len() && history[start].role == Role::Assistant {
            start += 1;
        }

        &history[start..]
    }
}
