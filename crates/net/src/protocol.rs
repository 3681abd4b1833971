//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire. A client
//! sends `Request` frames carrying its requester id; the server answers each
//! with a `Response` holding the same `id`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use splitroom_core::{
    Application, Error as CoreError, InvitationCode, JoinedRoom, MemberInfo, NewRoom,
    ParticipationInfo, PaymentStatus, PlanKey, PublicRoom, Room, RoomId, RoomInfo, RoomUpdate,
    Round, RoundRequest, User, UserId,
};

/// A room operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateRoom { room: NewRoom },
    StartRoom { room_id: RoomId },
    FinishRoom { room_id: RoomId },
    UpdateRoom { room_id: RoomId, update: RoomUpdate },
    DeleteRoom { room_id: RoomId },
    Join { code: String },
    Leave { room_id: RoomId, user_id: UserId },
    AddRound { room_id: RoomId, round: RoundRequest },
    DeleteRound { room_id: RoomId },
    GetRound { room_id: RoomId },
    UpdatePaymentStatus {
        room_id: RoomId,
        user_id: UserId,
        status: PaymentStatus,
    },
    SplitFee { room_id: RoomId },
    JoinedRooms,
    PublicRooms,
    RoomInfo { room_id: RoomId },
    RoomMembers { room_id: RoomId },
    RoomHost { room_id: RoomId },
    IsPublic { room_id: RoomId },
    GenerateInvitationCode { room_id: RoomId },
    ListInvitationCodes { room_id: RoomId },
    Apply { room_id: RoomId, message: String },
    ListApplications { room_id: RoomId },
    AcceptApplication { room_id: RoomId, user_id: UserId },
    RejectApplication { room_id: RoomId, user_id: UserId },
    PlanCeiling { plan: PlanKey },
    MembersStartingOn { date: NaiveDate },
    PaymentsDueOn { date: NaiveDate },
}

/// Successful result of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Reply {
    Done,
    RoomId(RoomId),
    Room(Room),
    Round(Option<Round>),
    Fee(i64),
    JoinedRooms(Vec<JoinedRoom>),
    PublicRooms(Vec<PublicRoom>),
    RoomInfo(RoomInfo),
    Members(Vec<MemberInfo>),
    User(User),
    Flag(bool),
    Code(InvitationCode),
    Codes(Vec<InvitationCode>),
    Applications(Vec<Application>),
    Ceiling(u32),
    Participations(Vec<ParticipationInfo>),
}

/// Failure details sent to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `not_host`
    pub code: String,
    pub message: String,
}

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_FORBIDDEN: u16 = 403;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_INTERNAL: u16 = 500;
pub const STATUS_TIMEOUT: u16 = 504;

impl ErrorBody {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Status and body for a core error.
    ///
    /// Domain errors keep their message; opaque ones are reported as a
    /// generic internal failure.
    pub fn from_core(err: &CoreError) -> (u16, Self) {
        let (status, code) = match err {
            CoreError::NotHost => (STATUS_FORBIDDEN, "not_host"),
            CoreError::NotMember => (STATUS_FORBIDDEN, "not_member"),
            CoreError::NotAuthorized => (STATUS_FORBIDDEN, "not_authorized"),
            CoreError::NotPublic => (STATUS_FORBIDDEN, "not_public"),
            CoreError::PlanCapacityExceeded => (STATUS_BAD_REQUEST, "plan_capacity_exceeded"),
            CoreError::InvalidInvitationCode => (STATUS_BAD_REQUEST, "invalid_invitation_code"),
            CoreError::NotStarted => (STATUS_BAD_REQUEST, "not_started"),
            CoreError::NoRound => (STATUS_BAD_REQUEST, "no_round"),
            CoreError::NoMembers => (STATUS_BAD_REQUEST, "no_members"),
            CoreError::InvalidInput(_) => (STATUS_BAD_REQUEST, "invalid_input"),
            CoreError::RoomFull => (STATUS_CONFLICT, "room_full"),
            CoreError::AlreadyJoined => (STATUS_CONFLICT, "already_joined"),
            CoreError::AlreadyApplied => (STATUS_CONFLICT, "already_applied"),
            CoreError::RoundAlreadyCreated => (STATUS_CONFLICT, "round_already_created"),
            CoreError::AlreadyStarted => (STATUS_CONFLICT, "already_started"),
            CoreError::AlreadyEnded => (STATUS_CONFLICT, "already_ended"),
            CoreError::ApplicationNotFound => (STATUS_NOT_FOUND, "application_not_found"),
            CoreError::NotFound(_) => (STATUS_NOT_FOUND, "not_found"),
            CoreError::Timeout => return Self::timeout(),
            _ => return Self::internal(),
        };
        (status, Self::new(code, err.to_string()))
    }

    pub fn timeout() -> (u16, Self) {
        (STATUS_TIMEOUT, Self::new("timeout", "operation timed out"))
    }

    pub fn internal() -> (u16, Self) {
        (STATUS_INTERNAL, Self::new("internal", "internal error"))
    }
}

/// Network protocol messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Client asks for an operation on behalf of `requester_id`
    Request {
        id: u64,
        requester_id: UserId,
        operation: Operation,
    },

    /// Server answer to the request with the same `id`
    Response {
        id: u64,
        status: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply: Option<Reply>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },

    /// Ping to keep connection alive
    Ping,

    /// Pong response to ping
    Pong,

    /// Server is shutting down
    ServerShutdown,
}

impl Message {
    pub fn ok(id: u64, reply: Reply) -> Self {
        Message::Response {
            id,
            status: STATUS_OK,
            reply: Some(reply),
            error: None,
        }
    }

    pub fn failure(id: u64, (status, error): (u16, ErrorBody)) -> Self {
        Message::Response {
            id,
            status,
            reply: None,
            error: Some(error),
        }
    }
}
