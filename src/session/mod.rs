
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::retrieval::AccessRole;

/// Author of one transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry in a session's chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// An authenticated caller's ephemeral state: who they are, what they may
/// see, and the transcript of this visit. Created at login, dropped at
/// logout; nothing here is persisted, so a crash can never leak one
/// tenant's transcript to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    tenant_id: String,
    role: AccessRole,
    history: Vec<ChatMessage>,
}

impl Session {
    /// Start a session for an authenticated caller.
    #[inline]
    pub fn login(tenant_id: impl Into<String>, role: AccessRole) -> Self {
        let tenant_id = tenant_id.into();
        debug!(tenant = %tenant_id, role = %role, "Session started");
        Self {
            tenant_id,
            role,
            history: Vec::new(),
        }
    }

    /// End the session, discarding the transcript.
    #[inline]
    pub fn logout(self) {
        debug!(tenant = %self.tenant_id, "Session ended");
    }

    #[inline]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    #[inline]
    pub fn role(&self) -> AccessRole {
        self.role
    }

    /// Append one question/answer exchange to the transcript, question
    /// first.
    #[inline]
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.history.push(ChatMessage {
            role: MessageRole::User,
            content: question.to_string(),
        });
        self.history.push(ChatMessage {
            role: MessageRole::Assistant,
            content: answer.to_string(),
        });
    }

    /// The transcript so far, in insertion order.
    #[inline]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}
