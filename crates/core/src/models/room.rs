//! Room model - the shared-cost group unit

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{PlanKey, RoomId, RoundId, UserId};

/// Who may discover a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn from_public(is_public: bool) -> Self {
        if is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }

    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }
}

/// Room lifecycle status; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Public room still matching members
    Created,
    /// Billing is active
    Start,
    /// Closed for good
    End,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Created => "created",
            RoomStatus::Start => "start",
            RoomStatus::End => "end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(RoomStatus::Created),
            "start" => Some(RoomStatus::Start),
            "end" => Some(RoomStatus::End),
            _ => None,
        }
    }

    /// Initial status for a freshly created room
    pub fn initial(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => RoomStatus::Created,
            Visibility::Private => RoomStatus::Start,
        }
    }

    /// Whether `next` is the single step forward from `self`
    pub fn can_advance_to(self, next: RoomStatus) -> bool {
        matches!(
            (self, next),
            (RoomStatus::Created, RoomStatus::Start) | (RoomStatus::Start, RoomStatus::End)
        )
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A room bound to a service plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub plan: PlanKey,
    pub max_count: u32,
    pub visibility: Visibility,
    pub status: RoomStatus,
    pub host_id: UserId,
    pub announcement: Option<String>,
    pub public_message: Option<String>,
    /// Only meaningful while the room is public and still `created`
    pub matching_deadline: Option<NaiveDate>,
    pub round_id: Option<RoundId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn is_public(&self) -> bool {
        self.visibility.is_public()
    }

    /// Drop matching state once a room is private; a private room never
    /// waits in `created`
    fn settle_private(&mut self) {
        if self.is_public() {
            return;
        }
        self.public_message = None;
        self.matching_deadline = None;
        if self.status == RoomStatus::Created {
            self.status = RoomStatus::Start;
        }
    }
}

/// Fields supplied by the host when creating a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub plan: PlanKey,
    pub max_count: u32,
    pub is_public: bool,
    #[serde(default)]
    pub announcement: Option<String>,
    #[serde(default)]
    pub public_message: Option<String>,
    #[serde(default)]
    pub matching_deadline: Option<NaiveDate>,
}

impl NewRoom {
    pub fn new(plan: PlanKey, max_count: u32, is_public: bool) -> Self {
        Self {
            plan,
            max_count,
            is_public,
            announcement: None,
            public_message: None,
            matching_deadline: None,
        }
    }

    pub fn with_public_message(mut self, message: impl Into<String>) -> Self {
        self.public_message = Some(message.into());
        self
    }

    pub fn with_matching_deadline(mut self, deadline: NaiveDate) -> Self {
        self.matching_deadline = Some(deadline);
        self
    }

    /// Build the room row persisted on creation
    pub fn into_room(self, host_id: UserId) -> Room {
        let now = Utc::now();
        let visibility = Visibility::from_public(self.is_public);
        let (public_message, matching_deadline) = match visibility {
            Visibility::Public => (self.public_message, self.matching_deadline),
            Visibility::Private => (None, None),
        };

        Room {
            id: 0,
            plan: self.plan,
            max_count: self.max_count,
            visibility,
            status: RoomStatus::initial(visibility),
            host_id,
            announcement: self.announcement,
            public_message,
            matching_deadline,
            round_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUpdate {
    #[serde(default)]
    pub plan: Option<PlanKey>,
    #[serde(default)]
    pub max_count: Option<u32>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub announcement: Option<String>,
    #[serde(default)]
    pub public_message: Option<String>,
}

impl RoomUpdate {
    pub fn is_empty(&self) -> bool {
        self.plan.is_none()
            && self.max_count.is_none()
            && self.is_public.is_none()
            && self.announcement.is_none()
            && self.public_message.is_none()
    }

    /// Apply the set fields onto a room
    pub fn apply_to(&self, room: &mut Room) {
        if let Some(plan) = &self.plan {
            room.plan = plan.clone();
        }
        if let Some(max_count) = self.max_count {
            room.max_count = max_count;
        }
        if let Some(is_public) = self.is_public {
            room.visibility = Visibility::from_public(is_public);
        }
        if let Some(announcement) = &self.announcement {
            room.announcement = Some(announcement.clone());
        }
        if let Some(message) = &self.public_message {
            room.public_message = Some(message.clone());
        }
        room.settle_private();
        room.updated_at = Utc::now();
    }
}
