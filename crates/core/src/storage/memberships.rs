//! Membership storage operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::{debug, instrument};

use super::parse::{
    format_date, is_unique_violation, parse_datetime, parse_payment_status, parse_room_status,
    OptionalExt,
};
use crate::error::Result;
use crate::models::{
    JoinedRoom, MemberInfo, MemberInsert, MemberRole, Membership, ParticipationInfo,
    PaymentStatus, RoomId, UserId,
};

pub struct MembershipStore<'a> {
    conn: &'a Connection,
}

/// Insert a membership row, mapping the (room, user) unique constraint to `Duplicate`
pub(super) fn insert_membership(conn: &Connection, membership: &Membership) -> Result<MemberInsert> {
    let inserted = conn.execute(
        "INSERT INTO memberships (room_id, user_id, is_host, payment_status, joined_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            membership.room_id,
            membership.user_id,
            membership.role.is_host() as i32,
            membership.payment_status.as_str(),
            membership.joined_at.to_rfc3339(),
        ],
    );

    match inserted {
        Ok(_) => Ok(MemberInsert::Inserted),
        Err(e) if is_unique_violation(&e) => Ok(MemberInsert::Duplicate),
        Err(e) => Err(e.into()),
    }
}

/// Capacity check and insert, to be called inside an open transaction
pub(super) fn insert_member_within(
    conn: &Connection,
    membership: &Membership,
    max_count: u32,
) -> Result<MemberInsert> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM memberships WHERE room_id = ?1",
        params![membership.room_id],
        |row| row.get(0),
    )?;
    if count >= max_count {
        debug!(count, max_count, "Room at capacity");
        return Ok(MemberInsert::Full);
    }

    insert_membership(conn, membership)
}

const PARTICIPATION_SELECT: &str = "SELECT m.user_id, COALESCE(u.name, ''), COALESCE(u.email, ''),
            s.name, r.plan_name, r.room_id, r.admin_id,
            COALESCE(h.name, ''), COALESCE(h.email, '')
     FROM memberships m
     INNER JOIN rooms r ON r.room_id = m.room_id
     INNER JOIN rounds rd ON rd.round_id = r.round_id
     INNER JOIN services s ON s.service_id = r.service_id
     LEFT JOIN users u ON u.user_id = m.user_id
     LEFT JOIN users h ON h.user_id = r.admin_id";

impl<'a> MembershipStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Add membership without a capacity check
    #[instrument(skip(self, membership), fields(room_id = membership.room_id, user_id = membership.user_id, role = %membership.role))]
    pub fn create(&self, membership: &Membership) -> Result<MemberInsert> {
        insert_membership(self.conn, membership)
    }

    /// Count and insert under one write lock
    #[instrument(skip(self, membership), fields(room_id = membership.room_id, user_id = membership.user_id))]
    pub fn insert_guarded(&self, membership: &Membership, max_count: u32) -> Result<MemberInsert> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let outcome = insert_member_within(&tx, membership, max_count)?;
        if outcome == MemberInsert::Inserted {
            tx.commit()?;
        }
        Ok(outcome)
    }

    /// Remove membership
    #[instrument(skip(self))]
    pub fn delete(&self, room_id: RoomId, user_id: UserId) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM memberships WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
        )?;
        Ok(removed > 0)
    }

    /// Count members of a room
    #[instrument(skip(self))]
    pub fn count(&self, room_id: RoomId) -> Result<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM memberships WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Get membership
    #[instrument(skip(self))]
    pub fn get(&self, room_id: RoomId, user_id: UserId) -> Result<Option<Membership>> {
        let membership = self
            .conn
            .query_row(
                "SELECT room_id, user_id, is_host, payment_status, joined_at FROM memberships
                 WHERE room_id = ?1 AND user_id = ?2",
                params![room_id, user_id],
                |row| {
                    Ok(Membership {
                        room_id: row.get(0)?,
                        user_id: row.get(1)?,
                        role: MemberRole::from_host_flag(row.get::<_, i32>(2)? != 0),
                        payment_status: parse_payment_status(&row.get::<_, String>(3)?)?,
                        joined_at: parse_datetime(&row.get::<_, String>(4)?)?,
                    })
                },
            )
            .optional()?;

        Ok(membership)
    }

    /// Update payment status
    #[instrument(skip(self))]
    pub fn update_payment_status(
        &self,
        room_id: RoomId,
        user_id: UserId,
        status: PaymentStatus,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE memberships SET payment_status = ?1 WHERE room_id = ?2 AND user_id = ?3",
            params![status.as_str(), room_id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// List members of a room with user info
    #[instrument(skip(self))]
    pub fn list_members(&self, room_id: RoomId) -> Result<Vec<MemberInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.user_id, COALESCE(u.name, ''), m.payment_status, m.is_host
             FROM memberships m
             LEFT JOIN users u ON u.user_id = m.user_id
             WHERE m.room_id = ?1
             ORDER BY m.is_host DESC, m.joined_at, m.user_id",
        )?;

        let members = stmt
            .query_map(params![room_id], |row| {
                Ok(MemberInfo {
                    user_id: row.get(0)?,
                    name: row.get(1)?,
                    payment_status: parse_payment_status(&row.get::<_, String>(2)?)?,
                    is_host: row.get::<_, i32>(3)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(members)
    }

    /// Rooms a user belongs to
    #[instrument(skip(self))]
    pub fn list_joined_rooms(&self, user_id: UserId) -> Result<Vec<JoinedRoom>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.room_id, s.name, r.plan_name, m.is_host, m.payment_status, r.room_status,
                    r.is_public
             FROM memberships m
             INNER JOIN rooms r ON r.room_id = m.room_id
             INNER JOIN services s ON s.service_id = r.service_id
             WHERE m.user_id = ?1
             ORDER BY r.room_id",
        )?;

        let rooms = stmt
            .query_map(params![user_id], |row| {
                Ok(JoinedRoom {
                    room_id: row.get(0)?,
                    service_name: row.get(1)?,
                    plan_name: row.get(2)?,
                    is_host: row.get::<_, i32>(3)? != 0,
                    payment_status: parse_payment_status(&row.get::<_, String>(4)?)?,
                    room_status: parse_room_status(&row.get::<_, String>(5)?)?,
                    is_public: row.get::<_, i32>(6)? != 0,
                    cost: None,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rooms)
    }

    /// Members whose round starts on the given date
    #[instrument(skip(self))]
    pub fn starting_on(&self, date: NaiveDate) -> Result<Vec<ParticipationInfo>> {
        let sql = format!(
            "{PARTICIPATION_SELECT}
             WHERE rd.starting_time = ?1 AND r.room_status != 'end'
             ORDER BY r.room_id, m.user_id"
        );
        self.participation_rows(&sql, date)
    }

    /// Unpaid members whose payment deadline is the given date
    #[instrument(skip(self))]
    pub fn due_on(&self, date: NaiveDate) -> Result<Vec<ParticipationInfo>> {
        let sql = format!(
            "{PARTICIPATION_SELECT}
             WHERE rd.payment_deadline = ?1 AND m.payment_status = 'unpaid'
                   AND r.room_status != 'end'
             ORDER BY r.room_id, m.user_id"
        );
        self.participation_rows(&sql, date)
    }

    fn participation_rows(&self, sql: &str, date: NaiveDate) -> Result<Vec<ParticipationInfo>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![format_date(date)], |row| {
                Ok(ParticipationInfo {
                    user_id: row.get(0)?,
                    user_name: row.get(1)?,
                    user_email: row.get(2)?,
                    service_name: row.get(3)?,
                    plan_name: row.get(4)?,
                    room_id: row.get(5)?,
                    host_id: row.get(6)?,
                    host_name: row.get(7)?,
                    host_email: row.get(8)?,
                    owed_fee: None,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
