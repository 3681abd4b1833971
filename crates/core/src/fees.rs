//! Fee splitting between room members

use crate::error::{Error, Result};
use crate::models::RoomFeeInfo;

/// `plan_cost * round_interval / member_count`, truncated toward zero.
///
/// Remainders are dropped, not redistributed.
pub fn split(plan_cost: i64, round_interval: u32, member_count: u32) -> Result<i64> {
    if member_count == 0 {
        return Err(Error::NoMembers);
    }

    let total = plan_cost
        .checked_mul(i64::from(round_interval))
        .ok_or_else(|| Error::InvalidInput("fee total overflows".into()))?;

    Ok(total / i64::from(member_count))
}

/// Split for a room, which needs an attached round
pub fn split_for_room(info: &RoomFeeInfo, member_count: u32) -> Result<i64> {
    let interval = info.round_interval.ok_or(Error::NoRound)?;
    split(info.plan_cost, interval, member_count)
}
