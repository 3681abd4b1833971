//! Join application model for public rooms

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RoomId, UserId};

/// A request to join a public room, awaiting the host's decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: String,
    pub message: String,
    pub is_accepted: bool,
    pub created_at: DateTime<Utc>,
}
