use splitroom_core::config::RoomsConfig;
use splitroom_core::{
    CatalogRepository, Database, Error, MembershipRepository, NewRoom, Plan, PlanKey,
    RoomManager, RoomId, RoundRequest, Service, UserId,
};
use std::path::Path;

const HOST: UserId = 100;

fn catalog() -> Service {
    Service {
        id: 7,
        name: "Streamflix".into(),
        plans: vec![Plan {
            name: "family".into(),
            cost: 900,
            max_count: 4,
        }],
    }
}

fn manager() -> RoomManager<Database> {
    let db = Database::open_in_memory().unwrap();
    db.upsert_service(&catalog()).unwrap();
    RoomManager::new(db, &RoomsConfig::default())
}

fn manager_at(path: &Path) -> RoomManager<Database> {
    let db = Database::open(path).unwrap();
    db.upsert_service(&catalog()).unwrap();
    RoomManager::new(db, &RoomsConfig::default())
}

fn room(manager: &RoomManager<Database>, max_count: u32, is_public: bool) -> RoomId {
    manager
        .create(HOST, NewRoom::new(PlanKey::new(7, "family"), max_count, is_public))
        .unwrap()
}

fn round_request() -> RoundRequest {
    RoundRequest {
        starting_time: "2024-01-01".into(),
        round_interval: 2,
        payment_deadline_weeks: 1,
        add_calendar: false,
    }
}

#[test]
fn member_count_never_exceeds_capacity() {
    let manager = manager();
    let room_id = room(&manager, 3, false);

    let mut joined = 0;
    for user in 1..=6 {
        let code = manager.generate_invitation_code(HOST, room_id).unwrap();
        match manager.join(user, &code.code) {
            Ok(_) => joined += 1,
            Err(Error::RoomFull) => {}
            Err(other) => panic!("unexpected join failure: {other}"),
        }
        let count = manager.store().count_members(room_id).unwrap();
        assert!(count <= 3);
    }
    assert_eq!(joined, 2);
}

#[test]
fn consumed_code_cannot_be_reused() {
    let manager = manager();
    let room_id = room(&manager, 4, false);
    let code = manager.generate_invitation_code(HOST, room_id).unwrap();

    manager.join(1, &code.code).unwrap();
    assert!(matches!(
        manager.join(2, &code.code),
        Err(Error::InvalidInvitationCode)
    ));
}

#[test]
fn full_room_leaves_code_valid() {
    let manager = manager();
    let room_id = room(&manager, 1, false);
    let code = manager.generate_invitation_code(HOST, room_id).unwrap();

    assert!(matches!(manager.join(1, &code.code), Err(Error::RoomFull)));

    let valid = manager.list_invitation_codes(HOST, room_id).unwrap();
    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0].code, code.code);
}

#[test]
fn reinstated_code_is_consumable_once_more() {
    let manager = manager();
    let room_id = room(&manager, 3, false);
    let code = manager.generate_invitation_code(HOST, room_id).unwrap();

    // Joining as an existing member fails downstream of the consume
    assert!(matches!(manager.join(HOST, &code.code), Err(Error::AlreadyJoined)));

    manager.join(1, &code.code).unwrap();
    assert!(matches!(
        manager.join(2, &code.code),
        Err(Error::InvalidInvitationCode)
    ));
}

#[test]
fn round_dates_are_derived() {
    let manager = manager();
    let room_id = room(&manager, 4, false);

    let round = manager.add_round(HOST, room_id, &round_request()).unwrap();
    assert_eq!(round.ending_time.to_string(), "2024-03-01");
    assert_eq!(round.payment_deadline.to_string(), "2023-12-25");

    let stored = manager.get_round(room_id).unwrap().unwrap();
    assert_eq!(stored, round);
}

#[test]
fn split_fee_truncates() {
    let manager = manager();
    let room_id = room(&manager, 4, false);
    for user in 1..=3 {
        let code = manager.generate_invitation_code(HOST, room_id).unwrap();
        manager.join(user, &code.code).unwrap();
    }
    manager
        .add_round(
            HOST,
            room_id,
            &RoundRequest {
                round_interval: 3,
                ..round_request()
            },
        )
        .unwrap();

    assert_eq!(manager.room_split_fee(room_id).unwrap(), 675);
}

#[test]
fn add_round_state_checks() {
    let manager = manager();
    let public_id = room(&manager, 4, true);
    assert!(matches!(
        manager.add_round(HOST, public_id, &round_request()),
        Err(Error::NotStarted)
    ));

    let private_id = room(&manager, 4, false);
    manager.add_round(HOST, private_id, &round_request()).unwrap();
    assert!(matches!(
        manager.add_round(HOST, private_id, &round_request()),
        Err(Error::RoundAlreadyCreated)
    ));

    manager.delete_round(HOST, private_id).unwrap();
    assert!(matches!(
        manager.delete_round(HOST, private_id),
        Err(Error::NoRound)
    ));
    manager.add_round(HOST, private_id, &round_request()).unwrap();
}

#[test]
fn non_host_is_always_refused() {
    let manager = manager();
    let room_id = room(&manager, 4, true);
    let code = manager.generate_invitation_code(HOST, room_id).unwrap();
    let member: UserId = 1;
    let outsider: UserId = 2;
    manager.join(member, &code.code).unwrap();

    for requester in [member, outsider] {
        assert!(matches!(manager.start(requester, room_id), Err(Error::NotHost)));
        assert!(matches!(manager.delete(requester, room_id), Err(Error::NotHost)));
        assert!(matches!(
            manager.add_round(requester, room_id, &round_request()),
            Err(Error::NotHost)
        ));
        assert!(matches!(
            manager.delete_round(requester, room_id),
            Err(Error::NotHost)
        ));
        assert!(matches!(
            manager.generate_invitation_code(requester, room_id),
            Err(Error::NotHost)
        ));
    }

    // Also for rooms that do not exist
    assert!(matches!(manager.start(member, 9999), Err(Error::NotHost)));
}

#[test]
fn members_only_reads() {
    let manager = manager();
    let room_id = room(&manager, 4, false);

    assert!(matches!(manager.room_info(1, room_id), Err(Error::NotMember)));
    assert!(matches!(manager.room_members(1, room_id), Err(Error::NotMember)));
    assert!(matches!(manager.room_host(1, room_id), Err(Error::NotMember)));
    assert_eq!(manager.room_host(HOST, room_id).unwrap().id, HOST);
}

#[test]
fn delete_removes_room_and_memberships() {
    let manager = manager();
    let room_id = room(&manager, 4, false);
    let code = manager.generate_invitation_code(HOST, room_id).unwrap();
    manager.join(1, &code.code).unwrap();

    manager.delete(HOST, room_id).unwrap();

    assert!(manager.joined_rooms(1).unwrap().is_empty());
    assert!(matches!(manager.is_public(room_id), Err(Error::NotFound(_))));
}

#[test]
fn public_listing_excludes_private_and_ended_rooms() {
    let manager = manager();
    let open = room(&manager, 4, true);
    room(&manager, 4, false);
    let ended = room(&manager, 4, true);
    manager.start(HOST, ended).unwrap();
    manager.finish(HOST, ended).unwrap();

    let rooms = manager.public_rooms().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_id, open);
    assert_eq!(rooms[0].member_count, 1);
    assert_eq!(rooms[0].cost, None);
}

#[test]
fn concurrent_joins_respect_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rooms.db");

    let manager = manager_at(&path);
    let room_id = room(&manager, 3, false);
    let codes: Vec<String> = (0..8)
        .map(|_| manager.generate_invitation_code(HOST, room_id).unwrap().code)
        .collect();

    let handles: Vec<_> = codes
        .into_iter()
        .enumerate()
        .map(|(i, code)| {
            let path = path.clone();
            std::thread::spawn(move || {
                let db = Database::open(&path).unwrap();
                let manager = RoomManager::new(db, &RoomsConfig::default());
                manager.join(i as UserId + 1, &code)
            })
        })
        .collect();

    let mut joined = 0;
    let mut full = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => joined += 1,
            Err(Error::RoomFull) => full += 1,
            Err(other) => panic!("unexpected join failure: {other}"),
        }
    }

    assert_eq!(joined, 2);
    assert_eq!(full, 6);
    assert_eq!(manager.store().count_members(room_id).unwrap(), 3);
    // Every refused join put its code back
    assert_eq!(manager.list_invitation_codes(HOST, room_id).unwrap().len(), 6);
}
