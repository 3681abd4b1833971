//! Invitation code storage operations

use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::{is_unique_violation, parse_datetime, OptionalExt};
use crate::error::Result;
use crate::models::{CodeInsert, InvitationCode, RoomId};

pub struct InvitationStore<'a> {
    conn: &'a Connection,
}

impl<'a> InvitationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new valid code
    #[instrument(skip(self, code), fields(room_id = code.room_id))]
    pub fn create(&self, code: &InvitationCode) -> Result<CodeInsert> {
        let inserted = self.conn.execute(
            "INSERT INTO invitation_codes (code, room_id, is_valid, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                code.code,
                code.room_id,
                code.is_valid as i32,
                code.created_at.to_rfc3339(),
            ],
        );

        match inserted {
            Ok(_) => Ok(CodeInsert::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(CodeInsert::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    /// Invalidate a valid code and return its room in a single statement
    #[instrument(skip(self, code))]
    pub fn consume(&self, code: &str) -> Result<Option<RoomId>> {
        let room_id = self
            .conn
            .query_row(
                "UPDATE invitation_codes SET is_valid = 0
                 WHERE code = ?1 AND is_valid = 1
                 RETURNING room_id",
                params![code],
                |row| row.get(0),
            )
            .optional()?;

        Ok(room_id)
    }

    /// Make a consumed code usable again
    #[instrument(skip(self, code))]
    pub fn reinstate(&self, code: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE invitation_codes SET is_valid = 1 WHERE code = ?1 AND is_valid = 0",
            params![code],
        )?;
        Ok(changed == 1)
    }

    /// List valid codes for a room, newest first
    #[instrument(skip(self))]
    pub fn list_valid(&self, room_id: RoomId) -> Result<Vec<InvitationCode>> {
        let mut stmt = self.conn.prepare(
            "SELECT code, room_id, is_valid, created_at FROM invitation_codes
             WHERE room_id = ?1 AND is_valid = 1
             ORDER BY created_at DESC, code",
        )?;

        let codes = stmt
            .query_map(params![room_id], |row| {
                Ok(InvitationCode {
                    code: row.get(0)?,
                    room_id: row.get(1)?,
                    is_valid: row.get::<_, i32>(2)? != 0,
                    created_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(codes)
    }
}
