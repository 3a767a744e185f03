use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two flash slots a session can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashKind {
    Warning,
    Success,
}

/// Pending one-shot notifications. At most one message per kind is live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
}

impl FlashMessages {
    /// Stores `message` under `kind`, replacing whatever was there.
    pub fn set(&mut self, kind: FlashKind, message: String) {
        match kind {
            FlashKind::Warning => self.warning = Some(message),
            FlashKind::Success => self.success = Some(message),
        }
    }

    /// Reads and clears every slot.
    pub fn take(&mut self) -> FlashMessages {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        self.warning.is_none() && self.success.is_none()
    }
}

/// Everything the application keeps in a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub flash: FlashMessages,
}

/// A stored session together with its expiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The session payload.
    pub data: SessionData,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the session is expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
