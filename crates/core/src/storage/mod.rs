//! SQLite storage layer for Splitroom

mod applications;
mod catalog;
mod invitations;
mod memberships;
mod migrations;
mod parse;
mod rooms;
mod rounds;
mod traits;
mod users;

use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;
use crate::models::{
    Application, CodeInsert, InvitationCode, JoinedRoom, MemberInfo, MemberInsert, Membership,
    ParticipationInfo, PaymentStatus, Plan, PlanKey, PublicRoom, Room, RoomFeeInfo, RoomId,
    RoomStatus, Round, RoundId, Service, ServiceId, User, UserId,
};

pub use applications::ApplicationStore;
pub use catalog::CatalogStore;
pub use invitations::InvitationStore;
pub use memberships::MembershipStore;
pub use parse::{format_date, DATE_FORMAT};
pub use rooms::RoomStore;
pub use rounds::RoundStore;
pub use traits::{
    ApplicationRepository, CatalogRepository, InvitationRepository, MembershipRepository,
    RoomRepository, RoundRepository, Storage, UserRepository,
};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        migrations::current_version(&self.conn)
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    pub fn catalog(&self) -> CatalogStore<'_> {
        CatalogStore::new(&self.conn)
    }

    pub fn rooms(&self) -> RoomStore<'_> {
        RoomStore::new(&self.conn)
    }

    pub fn memberships(&self) -> MembershipStore<'_> {
        MembershipStore::new(&self.conn)
    }

    pub fn invitations(&self) -> InvitationStore<'_> {
        InvitationStore::new(&self.conn)
    }

    pub fn rounds(&self) -> RoundStore<'_> {
        RoundStore::new(&self.conn)
    }

    pub fn applications(&self) -> ApplicationStore<'_> {
        ApplicationStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl UserRepository for Database {
    fn upsert_user(&self, user: &User) -> Result<()> {
        self.users().upsert(user)
    }

    fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        self.users().find_by_id(user_id)
    }
}

impl CatalogRepository for Database {
    fn upsert_service(&self, service: &Service) -> Result<()> {
        self.catalog().upsert_service(service)
    }

    fn list_services(&self) -> Result<Vec<Service>> {
        self.catalog().list_services()
    }

    fn find_plan(&self, key: &PlanKey) -> Result<Option<Plan>> {
        self.catalog().find_plan(key)
    }

    fn plan_ceiling(&self, key: &PlanKey) -> Result<Option<u32>> {
        Ok(self.catalog().find_plan(key)?.map(|plan| plan.max_count))
    }

    fn service_name(&self, service_id: ServiceId) -> Result<Option<String>> {
        self.catalog().service_name(service_id)
    }
}

impl RoomRepository for Database {
    fn create_room_with_host(&self, room: &Room) -> Result<RoomId> {
        self.rooms().create_with_host(room)
    }

    fn find_room(&self, room_id: RoomId) -> Result<Option<Room>> {
        self.rooms().find_by_id(room_id)
    }

    fn update_room(&self, room: &Room) -> Result<bool> {
        self.rooms().update(room)
    }

    fn delete_room(&self, room_id: RoomId) -> Result<()> {
        self.rooms().delete(room_id)
    }

    fn set_status(&self, room_id: RoomId, from: RoomStatus, to: RoomStatus) -> Result<bool> {
        self.rooms().set_status(room_id, from, to)
    }

    fn list_public_rooms(&self) -> Result<Vec<PublicRoom>> {
        self.rooms().list_public()
    }

    fn room_fee_info(&self, room_id: RoomId) -> Result<Option<RoomFeeInfo>> {
        self.rooms().fee_info(room_id)
    }
}

impl MembershipRepository for Database {
    fn create_membership(&self, membership: &Membership) -> Result<MemberInsert> {
        self.memberships().create(membership)
    }

    fn insert_member_guarded(
        &self,
        membership: &Membership,
        max_count: u32,
    ) -> Result<MemberInsert> {
        self.memberships().insert_guarded(membership, max_count)
    }

    fn delete_membership(&self, room_id: RoomId, user_id: UserId) -> Result<bool> {
        self.memberships().delete(room_id, user_id)
    }

    fn count_members(&self, room_id: RoomId) -> Result<u32> {
        self.memberships().count(room_id)
    }

    fn get_membership(&self, room_id: RoomId, user_id: UserId) -> Result<Option<Membership>> {
        self.memberships().get(room_id, user_id)
    }

    fn is_host(&self, room_id: RoomId, user_id: UserId) -> Result<bool> {
        Ok(self
            .memberships()
            .get(room_id, user_id)?
            .is_some_and(|m| m.role.is_host()))
    }

    fn update_payment_status(
        &self,
        room_id: RoomId,
        user_id: UserId,
        status: PaymentStatus,
    ) -> Result<bool> {
        self.memberships()
            .update_payment_status(room_id, user_id, status)
    }

    fn list_members(&self, room_id: RoomId) -> Result<Vec<MemberInfo>> {
        self.memberships().list_members(room_id)
    }

    fn list_joined_rooms(&self, user_id: UserId) -> Result<Vec<JoinedRoom>> {
        self.memberships().list_joined_rooms(user_id)
    }

    fn members_starting_on(&self, date: NaiveDate) -> Result<Vec<ParticipationInfo>> {
        self.memberships().starting_on(date)
    }

    fn payments_due_on(&self, date: NaiveDate) -> Result<Vec<ParticipationInfo>> {
        self.memberships().due_on(date)
    }
}

impl InvitationRepository for Database {
    fn create_invitation_code(&self, code: &InvitationCode) -> Result<CodeInsert> {
        self.invitations().create(code)
    }

    fn consume_invitation_code(&self, code: &str) -> Result<Option<RoomId>> {
        self.invitations().consume(code)
    }

    fn reinstate_invitation_code(&self, code: &str) -> Result<bool> {
        self.invitations().reinstate(code)
    }

    fn list_valid_codes(&self, room_id: RoomId) -> Result<Vec<InvitationCode>> {
        self.invitations().list_valid(room_id)
    }
}

impl RoundRepository for Database {
    fn attach_new_round(&self, room_id: RoomId, round: &Round) -> Result<Option<RoundId>> {
        self.rounds().attach_new(room_id, round)
    }

    fn find_round_for_room(&self, room_id: RoomId) -> Result<Option<Round>> {
        self.rounds().find_for_room(room_id)
    }

    fn detach_and_delete_round(&self, room_id: RoomId) -> Result<Option<RoundId>> {
        self.rounds().detach_and_delete(room_id)
    }
}

impl ApplicationRepository for Database {
    fn create_application(
        &self,
        room_id: RoomId,
        user_id: UserId,
        message: &str,
    ) -> Result<bool> {
        self.applications().create(room_id, user_id, message)
    }

    fn find_application(&self, room_id: RoomId, user_id: UserId) -> Result<Option<Application>> {
        self.applications().find(room_id, user_id)
    }

    fn list_applications(&self, room_id: RoomId) -> Result<Vec<Application>> {
        self.applications().list_for_room(room_id)
    }

    fn accept_application(
        &self,
        room_id: RoomId,
        user_id: UserId,
        max_count: u32,
    ) -> Result<MemberInsert> {
        self.applications().accept(room_id, user_id, max_count)
    }

    fn delete_application(&self, room_id: RoomId, user_id: UserId) -> Result<bool> {
        self.applications().delete(room_id, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRoom, Plan};

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_service(&Service {
            id: 1,
            name: "Streamflix".into(),
            plans: vec![Plan {
                name: "family".into(),
                cost: 400,
                max_count: 3,
            }],
        })
        .unwrap();
        db
    }

    fn create_room(db: &Database, host: UserId, max_count: u32) -> RoomId {
        let room = NewRoom::new(PlanKey::new(1, "family"), max_count, false).into_room(host);
        db.create_room_with_host(&room).unwrap()
    }

    #[test]
    fn test_room_created_with_host_membership() {
        let db = seeded();
        let room_id = create_room(&db, 10, 3);

        let membership = db.get_membership(room_id, 10).unwrap().unwrap();
        assert!(membership.role.is_host());
        assert_eq!(membership.payment_status, PaymentStatus::Confirmed);
        assert!(db.is_host(room_id, 10).unwrap());
        assert_eq!(db.count_members(room_id).unwrap(), 1);
    }

    #[test]
    fn test_room_requires_known_plan() {
        let db = seeded();
        let room = NewRoom::new(PlanKey::new(1, "missing"), 2, false).into_room(10);
        assert!(db.create_room_with_host(&room).is_err());
    }

    #[test]
    fn test_guarded_insert_respects_capacity() {
        let db = seeded();
        let room_id = create_room(&db, 10, 2);

        let first = db
            .insert_member_guarded(&Membership::member(room_id, 11), 2)
            .unwrap();
        let second = db
            .insert_member_guarded(&Membership::member(room_id, 12), 2)
            .unwrap();

        assert_eq!(first, MemberInsert::Inserted);
        assert_eq!(second, MemberInsert::Full);
        assert_eq!(db.count_members(room_id).unwrap(), 2);
    }

    #[test]
    fn test_guarded_insert_reports_duplicate() {
        let db = seeded();
        let room_id = create_room(&db, 10, 3);

        let outcome = db
            .insert_member_guarded(&Membership::member(room_id, 10), 3)
            .unwrap();
        assert_eq!(outcome, MemberInsert::Duplicate);
    }

    #[test]
    fn test_consume_is_compare_and_swap() {
        let db = seeded();
        let room_id = create_room(&db, 10, 3);
        db.create_invitation_code(&InvitationCode::new(room_id, "abc1234".into()))
            .unwrap();

        assert_eq!(db.consume_invitation_code("abc1234").unwrap(), Some(room_id));
        assert_eq!(db.consume_invitation_code("abc1234").unwrap(), None);
        assert!(db.reinstate_invitation_code("abc1234").unwrap());
        assert!(!db.reinstate_invitation_code("abc1234").unwrap());
        assert_eq!(db.consume_invitation_code("abc1234").unwrap(), Some(room_id));
    }

    #[test]
    fn test_duplicate_code_reports_conflict() {
        let db = seeded();
        let room_id = create_room(&db, 10, 3);
        let code = InvitationCode::new(room_id, "fff0000".into());

        assert_eq!(db.create_invitation_code(&code).unwrap(), CodeInsert::Inserted);
        assert_eq!(db.create_invitation_code(&code).unwrap(), CodeInsert::Conflict);
    }

    #[test]
    fn test_second_round_is_not_attached() {
        let db = seeded();
        let room_id = create_room(&db, 10, 3);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let round = Round {
            id: 0,
            starting_time: start,
            ending_time: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            round_interval: 1,
            payment_deadline: NaiveDate::from_ymd_opt(2023, 12, 25).unwrap(),
            is_add_calendar: false,
        };

        let first = db.attach_new_round(room_id, &round).unwrap();
        assert!(first.is_some());
        assert_eq!(db.attach_new_round(room_id, &round).unwrap(), None);

        let stored = db.find_round_for_room(room_id).unwrap().unwrap();
        assert_eq!(Some(stored.id), first);
        assert_eq!(stored.starting_time, start);

        assert_eq!(db.detach_and_delete_round(room_id).unwrap(), first);
        assert!(db.find_round_for_room(room_id).unwrap().is_none());
        assert!(db.find_room(room_id).unwrap().unwrap().round_id.is_none());
    }

    #[test]
    fn test_delete_room_cascades() {
        let db = seeded();
        let room_id = create_room(&db, 10, 3);
        db.create_invitation_code(&InvitationCode::new(room_id, "0a0a0a0".into()))
            .unwrap();

        db.delete_room(room_id).unwrap();

        assert!(db.find_room(room_id).unwrap().is_none());
        assert_eq!(db.count_members(room_id).unwrap(), 0);
        assert!(db.list_valid_codes(room_id).unwrap().is_empty());
    }

    #[test]
    fn test_status_compare_and_set() {
        let db = seeded();
        let room = NewRoom::new(PlanKey::new(1, "family"), 3, true).into_room(10);
        let room_id = db.create_room_with_host(&room).unwrap();

        assert!(db
            .set_status(room_id, RoomStatus::Created, RoomStatus::Start)
            .unwrap());
        assert!(!db
            .set_status(room_id, RoomStatus::Created, RoomStatus::Start)
            .unwrap());
    }
}
