//! Round scheduling: derived billing-period dates

use chrono::{DateTime, Days, Months, NaiveDate};

use crate::error::{Error, Result};
use crate::models::{Round, RoundRequest};
use crate::storage::DATE_FORMAT;

/// Dates derived from a round's start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundDates {
    pub starting_time: NaiveDate,
    pub ending_time: NaiveDate,
    pub payment_deadline: NaiveDate,
}

/// Parse an ISO-8601 date or RFC 3339 timestamp, truncated to the day
pub fn parse_start_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    match NaiveDate::parse_from_str(input, DATE_FORMAT) {
        Ok(date) => Ok(date),
        Err(date_err) => match DateTime::parse_from_rfc3339(input) {
            Ok(timestamp) => Ok(timestamp.date_naive()),
            // Report the date error; plain dates are the documented form
            Err(_) => Err(Error::InvalidDate(date_err)),
        },
    }
}

/// `end = start + interval months` (clamped to month end) and
/// `deadline = start - weeks * 7 days`
pub fn derive(start: NaiveDate, interval_months: u32, deadline_weeks: u32) -> Result<RoundDates> {
    let ending_time = start
        .checked_add_months(Months::new(interval_months))
        .ok_or_else(|| Error::InvalidInput(format!("round interval {interval_months} overflows")))?;

    let payment_deadline = start
        .checked_sub_days(Days::new(u64::from(deadline_weeks) * 7))
        .ok_or_else(|| Error::InvalidInput(format!("deadline of {deadline_weeks} weeks overflows")))?;

    Ok(RoundDates {
        starting_time: start,
        ending_time,
        payment_deadline,
    })
}

/// Build the unsaved round for a host request
pub fn plan_round(request: &RoundRequest) -> Result<Round> {
    if request.round_interval == 0 {
        return Err(Error::InvalidInput("round interval must be at least 1 month".into()));
    }

    let start = parse_start_date(&request.starting_time)?;
    let dates = derive(start, request.round_interval, request.payment_deadline_weeks)?;

    Ok(Round {
        id: 0,
        starting_time: dates.starting_time,
        ending_time: dates.ending_time,
        round_interval: request.round_interval,
        payment_deadline: dates.payment_deadline,
        is_add_calendar: request.add_calendar,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_two_month_round_with_one_week_deadline() {
        let dates = derive(ymd(2024, 1, 1), 2, 1).unwrap();
        assert_eq!(dates.ending_time, ymd(2024, 3, 1));
        assert_eq!(dates.payment_deadline, ymd(2023, 12, 25));
    }

    #[test]
    fn test_month_addition_clamps() {
        let dates = derive(ymd(2024, 1, 31), 1, 0).unwrap();
        assert_eq!(dates.ending_time, ymd(2024, 2, 29));
        assert_eq!(dates.payment_deadline, ymd(2024, 1, 31));
    }

    #[test]
    fn test_parse_accepts_date_and_timestamp() {
        assert_eq!(parse_start_date("2024-01-01").unwrap(), ymd(2024, 1, 1));
        assert_eq!(
            parse_start_date("2024-01-01T23:30:00+09:00").unwrap(),
            ymd(2024, 1, 1)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_start_date("01/02/2024"), Err(Error::InvalidDate(_))));
        assert!(parse_start_date("").is_err());
    }

    #[test]
    fn test_plan_round() {
        let round = plan_round(&RoundRequest {
            starting_time: "2024-01-01".into(),
            round_interval: 3,
            payment_deadline_weeks: 2,
            add_calendar: true,
        })
        .unwrap();

        assert_eq!(round.ending_time, ymd(2024, 4, 1));
        assert_eq!(round.payment_deadline, ymd(2023, 12, 18));
        assert!(round.is_add_calendar);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = plan_round(&RoundRequest {
            starting_time: "2024-01-01".into(),
            round_interval: 0,
            payment_deadline_weeks: 1,
            add_calendar: false,
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
