//! Storage repository traits
//!
//! These traits define the persistence contract the room manager depends on,
//! allowing for different implementations (SQLite, mock, remote backend).
//! Operations that must not race are single methods so each backend can make
//! them atomic.

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    Application, CodeInsert, InvitationCode, JoinedRoom, MemberInfo, MemberInsert, Membership,
    ParticipationInfo, PaymentStatus, Plan, PlanKey, PublicRoom, Room, RoomFeeInfo, RoomId,
    RoomStatus, Round, RoundId, Service, ServiceId, User, UserId,
};

/// User directory operations
pub trait UserRepository {
    /// Insert or refresh a directory entry
    fn upsert_user(&self, user: &User) -> Result<()>;

    /// Find user by ID
    fn find_user(&self, user_id: UserId) -> Result<Option<User>>;
}

/// Service and plan catalog operations
pub trait CatalogRepository {
    /// Insert or refresh a service together with its plans
    fn upsert_service(&self, service: &Service) -> Result<()>;

    /// List all services with their plans
    fn list_services(&self) -> Result<Vec<Service>>;

    /// Find a plan by key
    fn find_plan(&self, key: &PlanKey) -> Result<Option<Plan>>;

    /// Member ceiling configured for a plan
    fn plan_ceiling(&self, key: &PlanKey) -> Result<Option<u32>>;

    /// Display name of a service
    fn service_name(&self, service_id: ServiceId) -> Result<Option<String>>;
}

/// Room operations
pub trait RoomRepository {
    /// Persist a room and its host membership in one unit; returns the new id
    fn create_room_with_host(&self, room: &Room) -> Result<RoomId>;

    /// Find room by ID
    fn find_room(&self, room_id: RoomId) -> Result<Option<Room>>;

    /// Persist the mutable fields of a room, guarded by its member count;
    /// false if the room holds more than `max_count` members or is gone
    fn update_room(&self, room: &Room) -> Result<bool>;

    /// Delete a room; memberships, codes, and applications cascade
    fn delete_room(&self, room_id: RoomId) -> Result<()>;

    /// Move status from `from` to `to`; false if the room was not in `from`
    fn set_status(&self, room_id: RoomId, from: RoomStatus, to: RoomStatus) -> Result<bool>;

    /// List public rooms with their member counts
    fn list_public_rooms(&self) -> Result<Vec<PublicRoom>>;

    /// Plan cost and round interval used by the fee split
    fn room_fee_info(&self, room_id: RoomId) -> Result<Option<RoomFeeInfo>>;
}

/// Membership operations
pub trait MembershipRepository {
    /// Insert a membership without a capacity check
    fn create_membership(&self, membership: &Membership) -> Result<MemberInsert>;

    /// Count members and insert in one unit, refusing past `max_count`
    fn insert_member_guarded(&self, membership: &Membership, max_count: u32)
        -> Result<MemberInsert>;

    /// Remove a membership; false if there was none
    fn delete_membership(&self, room_id: RoomId, user_id: UserId) -> Result<bool>;

    /// Current number of members including the host
    fn count_members(&self, room_id: RoomId) -> Result<u32>;

    /// Get a membership
    fn get_membership(&self, room_id: RoomId, user_id: UserId) -> Result<Option<Membership>>;

    /// Whether the user is the room's host
    fn is_host(&self, room_id: RoomId, user_id: UserId) -> Result<bool>;

    /// Set the payment status label; false if there is no such membership
    fn update_payment_status(
        &self,
        room_id: RoomId,
        user_id: UserId,
        status: PaymentStatus,
    ) -> Result<bool>;

    /// Members of a room with display info, host first
    fn list_members(&self, room_id: RoomId) -> Result<Vec<MemberInfo>>;

    /// Rooms the user belongs to, without split fees
    fn list_joined_rooms(&self, user_id: UserId) -> Result<Vec<JoinedRoom>>;

    /// Members of live rooms whose round starts on `date`
    fn members_starting_on(&self, date: NaiveDate) -> Result<Vec<ParticipationInfo>>;

    /// Unpaid members of live rooms whose payment deadline is `date`
    fn payments_due_on(&self, date: NaiveDate) -> Result<Vec<ParticipationInfo>>;
}

/// Invitation code operations
pub trait InvitationRepository {
    /// Insert a fresh valid code, reporting a code collision
    fn create_invitation_code(&self, code: &InvitationCode) -> Result<CodeInsert>;

    /// Flip a valid code to invalid in one step; returns the bound room
    fn consume_invitation_code(&self, code: &str) -> Result<Option<RoomId>>;

    /// Flip a consumed code back to valid; false if nothing changed
    fn reinstate_invitation_code(&self, code: &str) -> Result<bool>;

    /// Valid codes of a room
    fn list_valid_codes(&self, room_id: RoomId) -> Result<Vec<InvitationCode>>;
}

/// Round operations
pub trait RoundRepository {
    /// Insert a round and attach it to a room that has none, in one unit.
    /// Returns `None` when a round was already attached.
    fn attach_new_round(&self, room_id: RoomId, round: &Round) -> Result<Option<RoundId>>;

    /// Round attached to a room
    fn find_round_for_room(&self, room_id: RoomId) -> Result<Option<Round>>;

    /// Detach and delete the room's round; returns the deleted id
    fn detach_and_delete_round(&self, room_id: RoomId) -> Result<Option<RoundId>>;
}

/// Public-room application operations
pub trait ApplicationRepository {
    /// Record an application; false if one already exists
    fn create_application(&self, room_id: RoomId, user_id: UserId, message: &str)
        -> Result<bool>;

    /// Find an application
    fn find_application(&self, room_id: RoomId, user_id: UserId) -> Result<Option<Application>>;

    /// Applications for a room, oldest first
    fn list_applications(&self, room_id: RoomId) -> Result<Vec<Application>>;

    /// Insert the applicant as a member under the capacity guard and mark the
    /// application accepted, in one unit
    fn accept_application(
        &self,
        room_id: RoomId,
        user_id: UserId,
        max_count: u32,
    ) -> Result<MemberInsert>;

    /// Delete an application; false if there was none
    fn delete_application(&self, room_id: RoomId, user_id: UserId) -> Result<bool>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite, mocks, or network.
pub trait Storage:
    UserRepository
    + CatalogRepository
    + RoomRepository
    + MembershipRepository
    + InvitationRepository
    + RoundRepository
    + ApplicationRepository
{
}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: UserRepository
        + CatalogRepository
        + RoomRepository
        + MembershipRepository
        + InvitationRepository
        + RoundRepository
        + ApplicationRepository
{
}
