//! Invitation code model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RoomId;

/// A single-use code bound to one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationCode {
    pub code: String,
    pub room_id: RoomId,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
}

impl InvitationCode {
    pub fn new(room_id: RoomId, code: String) -> Self {
        Self {
            code,
            room_id,
            is_valid: true,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of inserting a freshly derived code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeInsert {
    Inserted,
    /// Another row already owns this code
    Conflict,
}
