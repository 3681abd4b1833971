//! Room storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use tracing::instrument;

use super::memberships::insert_membership;
use super::parse::{
    format_date, parse_date_opt, parse_datetime, parse_room_status, visibility_from_i32,
    OptionalExt,
};
use crate::error::Result;
use crate::models::{
    Membership, PlanKey, PublicRoom, Room, RoomFeeInfo, RoomId, RoomStatus,
};

const ROOM_COLUMNS: &str = "room_id, service_id, plan_name, max_count, is_public, room_status, \
     admin_id, announcement, public_message, matching_deadline, round_id, created_at, updated_at";

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        plan: PlanKey {
            service_id: row.get(1)?,
            plan_name: row.get(2)?,
        },
        max_count: row.get(3)?,
        visibility: visibility_from_i32(row.get(4)?),
        status: parse_room_status(&row.get::<_, String>(5)?)?,
        host_id: row.get(6)?,
        announcement: row.get(7)?,
        public_message: row.get(8)?,
        matching_deadline: parse_date_opt(row.get(9)?)?,
        round_id: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(12)?)?,
    })
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a room and its host membership atomically
    #[instrument(skip(self, room), fields(host_id = room.host_id, plan = %room.plan))]
    pub fn create_with_host(&self, room: &Room) -> Result<RoomId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO rooms (service_id, plan_name, max_count, is_public, room_status, admin_id,
                                announcement, public_message, matching_deadline, round_id,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, ?11)",
            params![
                room.plan.service_id,
                room.plan.plan_name,
                room.max_count,
                room.is_public() as i32,
                room.status.as_str(),
                room.host_id,
                room.announcement,
                room.public_message,
                room.matching_deadline.map(format_date),
                room.created_at.to_rfc3339(),
                room.updated_at.to_rfc3339(),
            ],
        )?;
        let room_id = tx.last_insert_rowid();

        insert_membership(&tx, &Membership::host(room_id, room.host_id))?;
        tx.commit()?;

        Ok(room_id)
    }

    /// Find room by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, room_id: RoomId) -> Result<Option<Room>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE room_id = ?1");
        let room = self
            .conn
            .query_row(&sql, params![room_id], room_from_row)
            .optional()?;

        Ok(room)
    }

    /// Update mutable room fields.
    ///
    /// A room going private leaves `created` in the same statement. Returns
    /// false, writing nothing, if the room holds more members than the new
    /// `max_count` or no longer exists.
    #[instrument(skip(self, room), fields(room_id = room.id))]
    pub fn update(&self, room: &Room) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE rooms SET service_id = ?1, plan_name = ?2, max_count = ?3, is_public = ?4,
                              announcement = ?5, public_message = ?6, matching_deadline = ?7,
                              updated_at = ?8,
                              room_status = CASE WHEN ?4 = 0 AND room_status = ?10 THEN ?11
                                                 ELSE room_status END
             WHERE room_id = ?9
               AND (SELECT COUNT(*) FROM memberships WHERE room_id = ?9) <= ?3",
            params![
                room.plan.service_id,
                room.plan.plan_name,
                room.max_count,
                room.is_public() as i32,
                room.announcement,
                room.public_message,
                room.matching_deadline.map(format_date),
                Utc::now().to_rfc3339(),
                room.id,
                RoomStatus::Created.as_str(),
                RoomStatus::Start.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Delete a room
    #[instrument(skip(self))]
    pub fn delete(&self, room_id: RoomId) -> Result<()> {
        self.conn
            .execute("DELETE FROM rooms WHERE room_id = ?1", params![room_id])?;
        Ok(())
    }

    /// Compare-and-set on the room status
    #[instrument(skip(self))]
    pub fn set_status(&self, room_id: RoomId, from: RoomStatus, to: RoomStatus) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE rooms SET room_status = ?1, updated_at = ?2
             WHERE room_id = ?3 AND room_status = ?4",
            params![to.as_str(), Utc::now().to_rfc3339(), room_id, from.as_str()],
        )?;
        Ok(changed == 1)
    }

    /// Public rooms that have not ended
    #[instrument(skip(self))]
    pub fn list_public(&self) -> Result<Vec<PublicRoom>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.room_id, COALESCE(u.name, ''), s.name, r.plan_name, r.max_count,
                    (SELECT COUNT(*) FROM memberships m WHERE m.room_id = r.room_id),
                    p.cost, r.matching_deadline, r.public_message
             FROM rooms r
             INNER JOIN services s ON s.service_id = r.service_id
             INNER JOIN plans p ON p.service_id = r.service_id AND p.plan_name = r.plan_name
             LEFT JOIN users u ON u.user_id = r.admin_id
             WHERE r.is_public = 1 AND r.room_status != 'end'
             ORDER BY r.room_id",
        )?;

        let rooms = stmt
            .query_map([], |row| {
                Ok(PublicRoom {
                    room_id: row.get(0)?,
                    host_name: row.get(1)?,
                    service_name: row.get(2)?,
                    plan_name: row.get(3)?,
                    max_count: row.get(4)?,
                    member_count: row.get(5)?,
                    plan_cost: row.get(6)?,
                    matching_deadline: parse_date_opt(row.get(7)?)?,
                    public_message: row.get(8)?,
                    cost: None,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rooms)
    }

    /// Plan cost and attached round interval
    #[instrument(skip(self))]
    pub fn fee_info(&self, room_id: RoomId) -> Result<Option<RoomFeeInfo>> {
        let info = self
            .conn
            .query_row(
                "SELECT r.room_id, p.cost, rd.round_interval
                 FROM rooms r
                 INNER JOIN plans p ON p.service_id = r.service_id AND p.plan_name = r.plan_name
                 LEFT JOIN rounds rd ON rd.round_id = r.round_id
                 WHERE r.room_id = ?1",
                params![room_id],
                |row| {
                    Ok(RoomFeeInfo {
                        room_id: row.get(0)?,
                        plan_cost: row.get(1)?,
                        round_interval: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(info)
    }
}
