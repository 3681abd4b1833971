//! Room lifecycle management
//!
//! `RoomManager` is the coordinator every room operation goes through. It
//! resolves the requester's role, enforces the room state machine, and calls
//! into the invitation ledger, round scheduler, and fee splitter. Every
//! operation takes the requester explicitly and runs under its own deadline.

use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::RoomsConfig;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::fees;
use crate::invariants;
use crate::invitations::InvitationLedger;
use crate::models::{
    Application, InvitationCode, JoinedRoom, MemberInfo, MemberInsert, MemberRole, Membership,
    NewRoom, ParticipationInfo, PaymentStatus, PlanKey, PublicRoom, Room, RoomId, RoomInfo,
    RoomStatus, RoomUpdate, Round, RoundRequest, User, UserId,
};
use crate::permissions::{PermissionMatrix, RoomAction};
use crate::scheduler;
use crate::storage::Storage;

pub struct RoomManager<S> {
    store: S,
    ledger: InvitationLedger,
    timeout: Duration,
}

impl<S: Storage> RoomManager<S> {
    pub fn new(store: S, config: &RoomsConfig) -> Self {
        Self {
            store,
            ledger: InvitationLedger::from_config(config),
            timeout: config.request_timeout(),
        }
    }

    /// Underlying storage
    pub fn store(&self) -> &S {
        &self.store
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }

    fn role_of(&self, room_id: RoomId, user_id: UserId) -> Result<Option<MemberRole>> {
        Ok(self
            .store
            .get_membership(room_id, user_id)?
            .map(|membership| membership.role))
    }

    /// Check the requester may perform `action`, returning their role
    fn authorize(
        &self,
        room_id: RoomId,
        requester_id: UserId,
        action: RoomAction,
    ) -> Result<MemberRole> {
        let role = self.role_of(room_id, requester_id)?;
        if let Err(err) = PermissionMatrix::require(role, action) {
            warn!(room_id, requester_id, ?action, "Denied: {}", err);
            return Err(err);
        }
        role.ok_or(Error::NotMember)
    }

    fn load_room(&self, room_id: RoomId) -> Result<Room> {
        self.store
            .find_room(room_id)?
            .ok_or_else(|| Error::NotFound(format!("room {room_id}")))
    }

    fn plan_ceiling(&self, plan: &PlanKey) -> Result<u32> {
        self.store
            .plan_ceiling(plan)?
            .ok_or_else(|| Error::NotFound(format!("plan {plan}")))
    }

    /// Member ceiling configured for a plan
    pub fn get_plan_ceiling(&self, plan: &PlanKey) -> Result<u32> {
        self.plan_ceiling(plan)
    }

    // Room lifecycle

    /// Create a room hosted by the requester
    #[instrument(skip(self, new_room), fields(plan = %new_room.plan))]
    pub fn create(&self, requester_id: UserId, new_room: NewRoom) -> Result<RoomId> {
        let deadline = self.deadline();
        if new_room.max_count == 0 {
            return Err(Error::InvalidInput("max_count must be at least 1".into()));
        }

        deadline.check()?;
        let ceiling = self.plan_ceiling(&new_room.plan)?;
        if new_room.max_count > ceiling {
            warn!(max_count = new_room.max_count, ceiling, "Plan capacity exceeded");
            return Err(Error::PlanCapacityExceeded);
        }

        let room = new_room.into_room(requester_id);
        invariants::assert_room_invariants(&room);

        deadline.check()?;
        let room_id = self.store.create_room_with_host(&room)?;
        info!(room_id, host_id = requester_id, status = %room.status, "Room created");
        Ok(room_id)
    }

    /// Open a public room for billing
    #[instrument(skip(self))]
    pub fn start(&self, requester_id: UserId, room_id: RoomId) -> Result<()> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::StartRoom)?;

        deadline.check()?;
        let room = self.load_room(room_id)?;
        if !room.status.can_advance_to(RoomStatus::Start) {
            return Err(Error::AlreadyStarted);
        }

        deadline.check()?;
        if !self
            .store
            .set_status(room_id, RoomStatus::Created, RoomStatus::Start)?
        {
            return Err(Error::AlreadyStarted);
        }

        info!(room_id, "Room started");
        Ok(())
    }

    /// Close a started room
    #[instrument(skip(self))]
    pub fn finish(&self, requester_id: UserId, room_id: RoomId) -> Result<()> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::FinishRoom)?;

        deadline.check()?;
        let room = self.load_room(room_id)?;
        if room.status == RoomStatus::Created {
            return Err(Error::NotStarted);
        }
        if !room.status.can_advance_to(RoomStatus::End) {
            return Err(Error::AlreadyEnded);
        }

        deadline.check()?;
        if !self
            .store
            .set_status(room_id, RoomStatus::Start, RoomStatus::End)?
        {
            return Err(Error::AlreadyEnded);
        }

        info!(room_id, "Room ended");
        Ok(())
    }

    /// Apply a partial update; returns the stored room
    #[instrument(skip(self, update))]
    pub fn update(&self, requester_id: UserId, room_id: RoomId, update: RoomUpdate) -> Result<Room> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::UpdateRoom)?;

        deadline.check()?;
        let mut room = self.load_room(room_id)?;
        if update.is_empty() {
            return Ok(room);
        }
        update.apply_to(&mut room);

        if room.max_count == 0 {
            return Err(Error::InvalidInput("max_count must be at least 1".into()));
        }
        deadline.check()?;
        let ceiling = self.plan_ceiling(&room.plan)?;
        if room.max_count > ceiling {
            warn!(room_id, max_count = room.max_count, ceiling, "Plan capacity exceeded");
            return Err(Error::PlanCapacityExceeded);
        }
        invariants::assert_room_invariants(&room);

        // The write re-checks the member count against max_count
        deadline.check()?;
        if !self.store.update_room(&room)? {
            return Err(Error::InvalidInput(format!(
                "max_count {} is below the current member count",
                room.max_count
            )));
        }
        info!(room_id, "Room updated");
        Ok(room)
    }

    /// Delete a room with everything attached to it
    #[instrument(skip(self))]
    pub fn delete(&self, requester_id: UserId, room_id: RoomId) -> Result<()> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::DeleteRoom)?;

        deadline.check()?;
        self.store.delete_room(room_id)?;
        info!(room_id, "Room deleted");
        Ok(())
    }

    // Membership

    /// Join the room an invitation code is bound to
    #[instrument(skip(self, code))]
    pub fn join(&self, requester_id: UserId, code: &str) -> Result<RoomId> {
        let deadline = self.deadline();
        deadline.check()?;
        let room_id = self.ledger.consume(&self.store, code)?;

        match self.admit(requester_id, room_id, &deadline) {
            Ok(()) => {
                info!(room_id, user_id = requester_id, "Member joined");
                Ok(room_id)
            }
            Err(err) => {
                warn!(room_id, user_id = requester_id, "Join failed: {}", err);
                self.ledger.reinstate(&self.store, code)?;
                Err(err)
            }
        }
    }

    fn admit(&self, user_id: UserId, room_id: RoomId, deadline: &Deadline) -> Result<()> {
        deadline.check()?;
        let room = self.load_room(room_id)?;

        deadline.check()?;
        let membership = Membership::member(room_id, user_id);
        match self.store.insert_member_guarded(&membership, room.max_count)? {
            MemberInsert::Inserted => Ok(()),
            MemberInsert::Full => Err(Error::RoomFull),
            MemberInsert::Duplicate => Err(Error::AlreadyJoined),
        }
    }

    /// Remove a member; only the host may do this
    #[instrument(skip(self))]
    pub fn leave(&self, requester_id: UserId, room_id: RoomId, user_id: UserId) -> Result<()> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::RemoveMember)?;

        // The host stays; a room without one would be orphaned
        deadline.check()?;
        if self.store.is_host(room_id, user_id)? {
            warn!(room_id, user_id, "Refused to remove the host");
            return Err(Error::NotAuthorized);
        }

        deadline.check()?;
        if !self.store.delete_membership(room_id, user_id)? {
            return Err(Error::NotFound(format!("member {user_id} of room {room_id}")));
        }

        info!(room_id, user_id, "Member removed");
        Ok(())
    }

    /// Set a member's payment status label
    #[instrument(skip(self))]
    pub fn update_payment_status(
        &self,
        requester_id: UserId,
        room_id: RoomId,
        user_id: UserId,
        status: PaymentStatus,
    ) -> Result<()> {
        let deadline = self.deadline();
        deadline.check()?;
        let role = self.role_of(room_id, requester_id)?;
        if !PermissionMatrix::can_update_payment(role, requester_id, user_id) {
            warn!(room_id, requester_id, user_id, "Payment status update denied");
            return Err(Error::NotAuthorized);
        }

        deadline.check()?;
        if !self.store.update_payment_status(room_id, user_id, status)? {
            return Err(Error::NotFound(format!("member {user_id} of room {room_id}")));
        }

        info!(room_id, user_id, %status, "Payment status updated");
        Ok(())
    }

    // Invitation codes

    /// Issue a fresh invitation code for the room
    #[instrument(skip(self))]
    pub fn generate_invitation_code(
        &self,
        requester_id: UserId,
        room_id: RoomId,
    ) -> Result<InvitationCode> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::GenerateInvitationCode)?;
        self.ledger.generate(&self.store, room_id, &deadline)
    }

    #[instrument(skip(self))]
    pub fn list_invitation_codes(
        &self,
        requester_id: UserId,
        room_id: RoomId,
    ) -> Result<Vec<InvitationCode>> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::ListInvitationCodes)?;
        deadline.check()?;
        self.ledger.list_valid(&self.store, room_id)
    }

    // Rounds

    /// Open a billing round on a started room
    #[instrument(skip(self, request))]
    pub fn add_round(
        &self,
        requester_id: UserId,
        room_id: RoomId,
        request: &RoundRequest,
    ) -> Result<Round> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::AddRound)?;

        deadline.check()?;
        let room = self.load_room(room_id)?;
        match room.status {
            RoomStatus::Created => return Err(Error::NotStarted),
            RoomStatus::End => return Err(Error::AlreadyEnded),
            RoomStatus::Start => {}
        }
        if room.round_id.is_some() {
            return Err(Error::RoundAlreadyCreated);
        }

        let mut round = scheduler::plan_round(request)?;
        invariants::assert_round_invariants(&round);

        deadline.check()?;
        round.id = self
            .store
            .attach_new_round(room_id, &round)?
            .ok_or(Error::RoundAlreadyCreated)?;

        info!(
            room_id,
            round_id = round.id,
            start = %round.starting_time,
            end = %round.ending_time,
            "Round attached"
        );
        Ok(round)
    }

    /// Detach and delete the room's round
    #[instrument(skip(self))]
    pub fn delete_round(&self, requester_id: UserId, room_id: RoomId) -> Result<()> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::DeleteRound)?;

        deadline.check()?;
        let round_id = self
            .store
            .detach_and_delete_round(room_id)?
            .ok_or(Error::NoRound)?;

        info!(room_id, round_id, "Round deleted");
        Ok(())
    }

    pub fn get_round(&self, room_id: RoomId) -> Result<Option<Round>> {
        self.deadline().check()?;
        self.store.find_round_for_room(room_id)
    }

    // Fees

    /// Each member's share of the current round
    #[instrument(skip(self))]
    pub fn room_split_fee(&self, room_id: RoomId) -> Result<i64> {
        let deadline = self.deadline();
        deadline.check()?;
        let info = self
            .store
            .room_fee_info(room_id)?
            .ok_or_else(|| Error::NotFound(format!("room {room_id}")))?;

        deadline.check()?;
        let member_count = self.store.count_members(room_id)?;
        fees::split_for_room(&info, member_count)
    }

    /// Split fee, or `None` when it cannot be computed
    fn best_effort_fee(&self, room_id: RoomId) -> Option<i64> {
        match self.room_split_fee(room_id) {
            Ok(fee) => Some(fee),
            Err(err) => {
                debug!(room_id, "Split fee omitted: {}", err);
                None
            }
        }
    }

    // Reads

    /// Rooms the user belongs to, each with its split fee when available
    #[instrument(skip(self))]
    pub fn joined_rooms(&self, user_id: UserId) -> Result<Vec<JoinedRoom>> {
        self.deadline().check()?;
        let rooms = self
            .store
            .list_joined_rooms(user_id)?
            .into_iter()
            .map(|room| JoinedRoom {
                cost: self.best_effort_fee(room.room_id),
                ..room
            })
            .collect();
        Ok(rooms)
    }

    /// Public rooms, each with its split fee when available
    #[instrument(skip(self))]
    pub fn public_rooms(&self) -> Result<Vec<PublicRoom>> {
        self.deadline().check()?;
        let rooms = self
            .store
            .list_public_rooms()?
            .into_iter()
            .map(|room| PublicRoom {
                cost: self.best_effort_fee(room.room_id),
                ..room
            })
            .collect();
        Ok(rooms)
    }

    pub fn is_public(&self, room_id: RoomId) -> Result<bool> {
        self.deadline().check()?;
        Ok(self.load_room(room_id)?.is_public())
    }

    /// Full room detail for a member
    #[instrument(skip(self))]
    pub fn room_info(&self, requester_id: UserId, room_id: RoomId) -> Result<RoomInfo> {
        let deadline = self.deadline();
        let role = self.authorize(room_id, requester_id, RoomAction::ViewRoom)?;

        deadline.check()?;
        let room = self.load_room(room_id)?;
        let service_name = self
            .store
            .service_name(room.plan.service_id)?
            .unwrap_or_default();
        let plan_cost = self
            .store
            .find_plan(&room.plan)?
            .map(|plan| plan.cost)
            .unwrap_or_default();

        deadline.check()?;
        let host = self.host_user(room.host_id)?;
        let members = self.store.list_members(room_id)?;
        invariants::assert_member_list_invariants(&members, &room);
        let round = self.store.find_round_for_room(room_id)?;

        Ok(RoomInfo {
            room,
            service_name,
            plan_cost,
            role,
            host,
            members,
            round,
        })
    }

    #[instrument(skip(self))]
    pub fn room_members(&self, requester_id: UserId, room_id: RoomId) -> Result<Vec<MemberInfo>> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::ViewRoom)?;
        deadline.check()?;
        self.store.list_members(room_id)
    }

    #[instrument(skip(self))]
    pub fn room_host(&self, requester_id: UserId, room_id: RoomId) -> Result<User> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::ViewRoom)?;
        deadline.check()?;
        let room = self.load_room(room_id)?;
        self.host_user(room.host_id)
    }

    /// Directory entry for the host; unnamed when the directory has none
    fn host_user(&self, host_id: UserId) -> Result<User> {
        Ok(self
            .store
            .find_user(host_id)?
            .unwrap_or_else(|| User::new(host_id, "", "")))
    }

    // Applications

    /// Ask to join a public room
    #[instrument(skip(self, message))]
    pub fn apply(&self, requester_id: UserId, room_id: RoomId, message: &str) -> Result<()> {
        let deadline = self.deadline();
        deadline.check()?;
        let room = self.load_room(room_id)?;
        if !room.is_public() {
            return Err(Error::NotPublic);
        }
        if self.role_of(room_id, requester_id)?.is_some() {
            return Err(Error::AlreadyJoined);
        }

        deadline.check()?;
        if !self.store.create_application(room_id, requester_id, message)? {
            return Err(Error::AlreadyApplied);
        }

        info!(room_id, user_id = requester_id, "Application received");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn list_applications(
        &self,
        requester_id: UserId,
        room_id: RoomId,
    ) -> Result<Vec<Application>> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::ListApplications)?;
        deadline.check()?;
        self.store.list_applications(room_id)
    }

    /// Admit an applicant under the same capacity guard as joining
    #[instrument(skip(self))]
    pub fn accept_application(
        &self,
        requester_id: UserId,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<()> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::AcceptApplication)?;

        deadline.check()?;
        let pending = self
            .store
            .find_application(room_id, user_id)?
            .filter(|application| !application.is_accepted);
        if pending.is_none() {
            return Err(Error::ApplicationNotFound);
        }
        let room = self.load_room(room_id)?;

        deadline.check()?;
        match self
            .store
            .accept_application(room_id, user_id, room.max_count)?
        {
            MemberInsert::Inserted => {
                info!(room_id, user_id, "Application accepted");
                Ok(())
            }
            MemberInsert::Full => Err(Error::RoomFull),
            MemberInsert::Duplicate => Err(Error::AlreadyJoined),
        }
    }

    #[instrument(skip(self))]
    pub fn reject_application(
        &self,
        requester_id: UserId,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<()> {
        let deadline = self.deadline();
        self.authorize(room_id, requester_id, RoomAction::RejectApplication)?;

        deadline.check()?;
        if !self.store.delete_application(room_id, user_id)? {
            return Err(Error::ApplicationNotFound);
        }

        info!(room_id, user_id, "Application rejected");
        Ok(())
    }

    // Reminders

    /// Members whose round starts on `date`
    #[instrument(skip(self))]
    pub fn members_starting_on(&self, date: NaiveDate) -> Result<Vec<ParticipationInfo>> {
        self.deadline().check()?;
        let rows = self.store.members_starting_on(date)?;
        Ok(self.with_owed_fees(rows))
    }

    /// Unpaid members whose payment deadline is `date`
    #[instrument(skip(self))]
    pub fn payments_due_on(&self, date: NaiveDate) -> Result<Vec<ParticipationInfo>> {
        self.deadline().check()?;
        let rows = self.store.payments_due_on(date)?;
        Ok(self.with_owed_fees(rows))
    }

    fn with_owed_fees(&self, rows: Vec<ParticipationInfo>) -> Vec<ParticipationInfo> {
        rows.into_iter()
            .map(|row| ParticipationInfo {
                owed_fee: self.best_effort_fee(row.room_id),
                ..row
            })
            .collect()
    }
}
