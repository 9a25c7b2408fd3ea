//! One-time notices carried in the session until the next page render.

use serde::{Deserialize, Serialize};
use std::fmt;
use tower_sessions::{session, Session};

/// Session key holding the queued messages.
pub const MESSAGES_KEY: &str = "messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
            FlashLevel::Warning => "warning",
            FlashLevel::Info => "info",
        }
    }
}

impl fmt::Display for FlashLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

/// Append a message to the session's queue, creating the queue if absent.
pub async fn put(
    session: &Session,
    level: FlashLevel,
    message: impl Into<String>,
) -> Result<(), session::Error> {
    let mut messages: Vec<FlashMessage> = session.get(MESSAGES_KEY).await?.unwrap_or_default();
    messages.push(FlashMessage {
        level,
        message: message.into(),
    });
    session.insert(MESSAGES_KEY, messages).await
}

/// Take every queued message, leaving the queue empty.
///
/// Two requests sharing a session can race here; the store only guarantees
/// each single call is atomic, so delivery is at-most-once on a best-effort
/// basis.
pub async fn drain(session: &Session) -> Result<Vec<FlashMessage>, session::Error> {
    Ok(session
        .remove::<Vec<FlashMessage>>(MESSAGES_KEY)
        .await?
        .unwrap_or_default())
}
