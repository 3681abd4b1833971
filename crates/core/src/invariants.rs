//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{MemberInfo, Room, RoomStatus, Round};

/// Validate that a room's state is internally consistent
pub fn assert_room_invariants(room: &Room) {
    debug_assert!(room.max_count >= 1, "Room {} has zero capacity", room.id);

    // Private rooms skip matching entirely
    debug_assert!(
        room.is_public() || room.status != RoomStatus::Created,
        "Room {} is private but still in created status",
        room.id
    );
}

/// Validate that a member list is consistent with its room
pub fn assert_member_list_invariants(members: &[MemberInfo], room: &Room) {
    let host_count = members.iter().filter(|m| m.is_host).count();
    debug_assert!(
        host_count == 1,
        "Room {} has {} hosts, expected exactly 1",
        room.id,
        host_count
    );

    debug_assert!(
        members.len() <= room.max_count as usize,
        "Room {} has {} members but max_count is {}",
        room.id,
        members.len(),
        room.max_count
    );
}

/// Validate that a round's derived dates bracket its start
pub fn assert_round_invariants(round: &Round) {
    debug_assert!(
        round.ending_time >= round.starting_time,
        "Round {} ends {} before it starts {}",
        round.id,
        round.ending_time,
        round.starting_time
    );

    debug_assert!(
        round.payment_deadline <= round.starting_time,
        "Round {} payment deadline {} falls after start {}",
        round.id,
        round.payment_deadline,
        round.starting_time
    );
}
