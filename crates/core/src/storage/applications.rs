//! Application storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::instrument;

use super::memberships::insert_member_within;
use super::parse::{is_unique_violation, parse_datetime, OptionalExt};
use crate::error::Result;
use crate::models::{Application, MemberInsert, Membership, RoomId, UserId};

const APPLICATION_SELECT: &str = "SELECT a.room_id, a.user_id, COALESCE(u.name, ''), a.message,
            a.is_accepted, a.created_at
     FROM applications a
     LEFT JOIN users u ON u.user_id = a.user_id";

pub struct ApplicationStore<'a> {
    conn: &'a Connection,
}

fn application_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Application> {
    Ok(Application {
        room_id: row.get(0)?,
        user_id: row.get(1)?,
        user_name: row.get(2)?,
        message: row.get(3)?,
        is_accepted: row.get::<_, i32>(4)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(5)?)?,
    })
}

impl<'a> ApplicationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Record an application
    #[instrument(skip(self, message))]
    pub fn create(&self, room_id: RoomId, user_id: UserId, message: &str) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO applications (room_id, user_id, message, is_accepted, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![room_id, user_id, message, Utc::now().to_rfc3339()],
        );

        match inserted {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Find an application
    #[instrument(skip(self))]
    pub fn find(&self, room_id: RoomId, user_id: UserId) -> Result<Option<Application>> {
        let sql = format!("{APPLICATION_SELECT} WHERE a.room_id = ?1 AND a.user_id = ?2");
        let application = self
            .conn
            .query_row(&sql, params![room_id, user_id], application_from_row)
            .optional()?;

        Ok(application)
    }

    /// List applications for a room
    #[instrument(skip(self))]
    pub fn list_for_room(&self, room_id: RoomId) -> Result<Vec<Application>> {
        let sql = format!("{APPLICATION_SELECT} WHERE a.room_id = ?1 ORDER BY a.created_at, a.user_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let applications = stmt
            .query_map(params![room_id], application_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(applications)
    }

    /// Admit the applicant and mark the application accepted
    #[instrument(skip(self))]
    pub fn accept(&self, room_id: RoomId, user_id: UserId, max_count: u32) -> Result<MemberInsert> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let outcome = insert_member_within(&tx, &Membership::member(room_id, user_id), max_count)?;
        if outcome != MemberInsert::Inserted {
            return Ok(outcome);
        }

        tx.execute(
            "UPDATE applications SET is_accepted = 1 WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
        )?;
        tx.commit()?;

        Ok(MemberInsert::Inserted)
    }

    /// Delete an application
    #[instrument(skip(self))]
    pub fn delete(&self, room_id: RoomId, user_id: UserId) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM applications WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
        )?;
        Ok(removed > 0)
    }
}
