//! Membership, role, and payment status models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RoomId, UserId};

/// Role of a member within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Creator of the room; exactly one per room
    Host,
    Member,
}

impl MemberRole {
    pub fn from_host_flag(is_host: bool) -> Self {
        if is_host {
            MemberRole::Host
        } else {
            MemberRole::Member
        }
    }

    pub fn is_host(self) -> bool {
        self == MemberRole::Host
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MemberRole::Host => "host",
            MemberRole::Member => "member",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Payment status label; no money moves through this system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Confirmed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "pending" => Some(PaymentStatus::Pending),
            "confirmed" => Some(PaymentStatus::Confirmed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's membership in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub payment_status: PaymentStatus,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// The host row written together with the room
    pub fn host(room_id: RoomId, user_id: UserId) -> Self {
        Self {
            room_id,
            user_id,
            role: MemberRole::Host,
            payment_status: PaymentStatus::Confirmed,
            joined_at: Utc::now(),
        }
    }

    /// A regular member who still owes their share
    pub fn member(room_id: RoomId, user_id: UserId) -> Self {
        Self {
            room_id,
            user_id,
            role: MemberRole::Member,
            payment_status: PaymentStatus::Unpaid,
            joined_at: Utc::now(),
        }
    }
}

/// Represents a member with their user info for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub user_id: UserId,
    pub name: String,
    pub payment_status: PaymentStatus,
    pub is_host: bool,
}

/// Outcome of a capacity-guarded membership insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberInsert {
    Inserted,
    /// Room already holds `max_count` members
    Full,
    /// The (room, user) pair already exists
    Duplicate,
}
