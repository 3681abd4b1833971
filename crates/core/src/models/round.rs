//! Billing round model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::RoundId;

/// A billing period attached to a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub starting_time: NaiveDate,
    /// Always `starting_time + round_interval` months
    pub ending_time: NaiveDate,
    pub round_interval: u32,
    /// Always `starting_time - deadline weeks`
    pub payment_deadline: NaiveDate,
    pub is_add_calendar: bool,
}

/// Host input for opening a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRequest {
    /// ISO-8601 date or timestamp; truncated to the day
    pub starting_time: String,
    pub round_interval: u32,
    pub payment_deadline_weeks: u32,
    #[serde(default)]
    pub add_calendar: bool,
}
