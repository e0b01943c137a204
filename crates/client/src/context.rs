//! Session and conversation context supplied by the host application.

use std::sync::{PoisonError, RwLock};

/// Source of the current authorization token.
pub trait SessionContext: Send + Sync {
    /// The token sent as the `Authorization` header, if signed in.
    fn token(&self) -> Option<String>;
}

/// Source of the currently active conversation channel.
pub trait ConversationContext: Send + Sync {
    /// The active channel id, if any.
    fn active_channel(&self) -> Option<String>;
}

/// A session with a fixed token.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Option<String>,
}

impl StaticSession {
    /// Session authenticated with `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Session with no token.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl SessionContext for StaticSession {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Conversation context whose active channel can be switched at runtime.
#[derive(Debug, Default)]
pub struct ActiveConversation {
    channel: RwLock<Option<String>>,
}

impl ActiveConversation {
    /// Context with no active channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context starting on `channel_id`.
    pub fn with_channel(channel_id: impl Into<String>) -> Self {
        Self {
            channel: RwLock::new(Some(channel_id.into())),
        }
    }

    /// Switch to `channel_id`.
    pub fn set(&self, channel_id: impl Into<String>) {
        *self.channel.write().unwrap_or_else(PoisonError::into_inner) = Some(channel_id.into());
    }

    /// Leave the current channel.
    pub fn clear(&self) {
        *self.channel.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl ConversationContext for ActiveConversation {
    fn active_channel(&self) -> Option<String> {
        self.channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
