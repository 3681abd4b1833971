//! Read projections returned by listing and detail operations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    MemberInfo, MemberRole, PaymentStatus, Room, RoomId, RoomStatus, Round, User, UserId,
};

/// A room the viewer belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedRoom {
    pub room_id: RoomId,
    pub service_name: String,
    pub plan_name: String,
    pub is_host: bool,
    pub payment_status: PaymentStatus,
    pub room_status: RoomStatus,
    pub is_public: bool,
    /// Split fee; absent when it could not be computed
    pub cost: Option<i64>,
}

/// A public room open for applications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRoom {
    pub room_id: RoomId,
    pub host_name: String,
    pub service_name: String,
    pub plan_name: String,
    pub max_count: u32,
    pub member_count: u32,
    pub plan_cost: i64,
    pub matching_deadline: Option<NaiveDate>,
    pub public_message: Option<String>,
    /// Split fee; absent when it could not be computed
    pub cost: Option<i64>,
}

/// Full room detail for a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room: Room,
    pub service_name: String,
    pub plan_cost: i64,
    pub role: MemberRole,
    pub host: User,
    pub members: Vec<MemberInfo>,
    pub round: Option<Round>,
}

/// Inputs of the fee split for one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomFeeInfo {
    pub room_id: RoomId,
    pub plan_cost: i64,
    /// Interval of the attached round, if any
    pub round_interval: Option<u32>,
}

/// A member row used by the reminder collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationInfo {
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub service_name: String,
    pub plan_name: String,
    pub room_id: RoomId,
    pub host_id: UserId,
    pub host_name: String,
    pub host_email: String,
    /// Owed fee; absent when it could not be computed
    pub owed_fee: Option<i64>,
}
