use std::time::Duration;

use splitroom_core::config::RoomsConfig;
use splitroom_core::{
    CatalogRepository, Database, NewRoom, PaymentStatus, Plan, PlanKey, RoomManager,
    RoundRequest, Service,
};
use splitroom_net::protocol::{Operation, Reply, STATUS_CONFLICT, STATUS_FORBIDDEN};
use splitroom_net::{Client, Error, Server};

const HOST: i64 = 1;
const GUEST: i64 = 2;

async fn start_server() -> Server {
    let db = Database::open_in_memory().unwrap();
    db.upsert_service(&Service {
        id: 3,
        name: "Tunes".into(),
        plans: vec![Plan {
            name: "duo".into(),
            cost: 1000,
            max_count: 2,
        }],
    })
    .unwrap();
    let manager = RoomManager::new(db, &RoomsConfig::default());
    Server::start("127.0.0.1:0", manager, Duration::from_secs(5))
        .await
        .unwrap()
}

#[tokio::test]
async fn join_and_split_over_tcp() {
    let server = start_server().await;
    let mut host = Client::connect(server.addr(), HOST).await.unwrap();
    let mut guest = Client::connect(server.addr(), GUEST).await.unwrap();

    host.ping().await.unwrap();

    let room_id = host
        .create_room(NewRoom::new(PlanKey::new(3, "duo"), 2, false))
        .await
        .unwrap();
    let code = host.generate_invitation_code(room_id).await.unwrap();
    assert_eq!(guest.join(&code.code).await.unwrap(), room_id);

    let round = host
        .add_round(
            room_id,
            RoundRequest {
                starting_time: "2024-01-01".into(),
                round_interval: 3,
                payment_deadline_weeks: 1,
                add_calendar: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(round.ending_time.to_string(), "2024-04-01");

    assert_eq!(guest.split_fee(room_id).await.unwrap(), 1500);
    guest
        .update_payment_status(room_id, GUEST, PaymentStatus::Pending)
        .await
        .unwrap();

    server.shutdown();
}

#[tokio::test]
async fn domain_errors_carry_status_codes() {
    let server = start_server().await;
    let mut host = Client::connect(server.addr(), HOST).await.unwrap();
    let mut guest = Client::connect(server.addr(), GUEST).await.unwrap();

    let room_id = host
        .create_room(NewRoom::new(PlanKey::new(3, "duo"), 1, false))
        .await
        .unwrap();

    let err = guest.generate_invitation_code(room_id).await.unwrap_err();
    assert!(matches!(err, Error::Remote { status, .. } if status == STATUS_FORBIDDEN));
    assert_eq!(err.remote_code(), Some("not_host"));

    let code = host.generate_invitation_code(room_id).await.unwrap();
    let err = guest.join(&code.code).await.unwrap_err();
    assert!(matches!(err, Error::Remote { status, .. } if status == STATUS_CONFLICT));
    assert_eq!(err.remote_code(), Some("room_full"));

    // The refused join left the code usable
    match host
        .call(Operation::ListInvitationCodes { room_id })
        .await
        .unwrap()
    {
        Reply::Codes(codes) => assert_eq!(codes.len(), 1),
        other => panic!("unexpected reply: {other:?}"),
    }

    server.shutdown();
}

#[tokio::test]
async fn listings_over_tcp() {
    let server = start_server().await;
    let mut host = Client::connect(server.addr(), HOST).await.unwrap();

    let room_id = host
        .create_room(NewRoom::new(PlanKey::new(3, "duo"), 2, true))
        .await
        .unwrap();

    match host.call(Operation::PublicRooms).await.unwrap() {
        Reply::PublicRooms(rooms) => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].room_id, room_id);
            assert_eq!(rooms[0].cost, None);
        }
        other => panic!("unexpected reply: {other:?}"),
    }

    match host.call(Operation::IsPublic { room_id }).await.unwrap() {
        Reply::Flag(is_public) => assert!(is_public),
        other => panic!("unexpected reply: {other:?}"),
    }

    server.shutdown();
}
