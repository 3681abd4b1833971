//! Round storage operations

use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::{debug, instrument};

use super::parse::{format_date, parse_date, OptionalExt};
use crate::error::Result;
use crate::models::{RoomId, Round, RoundId};

pub struct RoundStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoundStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a round and attach it, only if the room has none
    #[instrument(skip(self, round), fields(start = %round.starting_time, interval = round.round_interval))]
    pub fn attach_new(&self, room_id: RoomId, round: &Round) -> Result<Option<RoundId>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO rounds (starting_time, ending_time, round_interval, payment_deadline, is_add_calendar)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                format_date(round.starting_time),
                format_date(round.ending_time),
                round.round_interval,
                format_date(round.payment_deadline),
                round.is_add_calendar as i32,
            ],
        )?;
        let round_id = tx.last_insert_rowid();

        let attached = tx.execute(
            "UPDATE rooms SET round_id = ?1 WHERE room_id = ?2 AND round_id IS NULL",
            params![round_id, room_id],
        )?;
        if attached != 1 {
            debug!(room_id, "Room already has a round; rolling back");
            return Ok(None);
        }

        tx.commit()?;
        Ok(Some(round_id))
    }

    /// Round attached to a room
    #[instrument(skip(self))]
    pub fn find_for_room(&self, room_id: RoomId) -> Result<Option<Round>> {
        let round = self
            .conn
            .query_row(
                "SELECT rd.round_id, rd.starting_time, rd.ending_time, rd.round_interval,
                        rd.payment_deadline, rd.is_add_calendar
                 FROM rooms r
                 INNER JOIN rounds rd ON rd.round_id = r.round_id
                 WHERE r.room_id = ?1",
                params![room_id],
                |row| {
                    Ok(Round {
                        id: row.get(0)?,
                        starting_time: parse_date(&row.get::<_, String>(1)?)?,
                        ending_time: parse_date(&row.get::<_, String>(2)?)?,
                        round_interval: row.get(3)?,
                        payment_deadline: parse_date(&row.get::<_, String>(4)?)?,
                        is_add_calendar: row.get::<_, i32>(5)? != 0,
                    })
                },
            )
            .optional()?;

        Ok(round)
    }

    /// Detach the room's round and delete it
    #[instrument(skip(self))]
    pub fn detach_and_delete(&self, room_id: RoomId) -> Result<Option<RoundId>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let round_id = tx
            .query_row(
                "SELECT round_id FROM rooms WHERE room_id = ?1",
                params![room_id],
                |row| row.get::<_, Option<RoundId>>(0),
            )
            .optional()?
            .flatten();

        let Some(round_id) = round_id else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE rooms SET round_id = NULL WHERE room_id = ?1",
            params![room_id],
        )?;
        tx.execute("DELETE FROM rounds WHERE round_id = ?1", params![round_id])?;
        tx.commit()?;

        Ok(Some(round_id))
    }
}
