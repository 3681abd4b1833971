//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- User directory (credentials live with the auth collaborator)
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL
            );

            -- Service catalog
            CREATE TABLE IF NOT EXISTS services (
                service_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS plans (
                service_id INTEGER NOT NULL,
                plan_name TEXT NOT NULL,
                cost INTEGER NOT NULL,
                max_count INTEGER NOT NULL,
                PRIMARY KEY (service_id, plan_name),
                FOREIGN KEY (service_id) REFERENCES services(service_id) ON DELETE CASCADE
            );

            -- Billing rounds
            CREATE TABLE IF NOT EXISTS rounds (
                round_id INTEGER PRIMARY KEY AUTOINCREMENT,
                starting_time TEXT NOT NULL,
                ending_time TEXT NOT NULL,
                round_interval INTEGER NOT NULL,
                payment_deadline TEXT NOT NULL,
                is_add_calendar INTEGER NOT NULL DEFAULT 0
            );

            -- Rooms
            CREATE TABLE IF NOT EXISTS rooms (
                room_id INTEGER PRIMARY KEY AUTOINCREMENT,
                service_id INTEGER NOT NULL,
                plan_name TEXT NOT NULL,
                max_count INTEGER NOT NULL,
                is_public INTEGER NOT NULL,
                room_status TEXT NOT NULL,
                admin_id INTEGER NOT NULL,
                announcement TEXT,
                public_message TEXT,
                matching_deadline TEXT,
                round_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (service_id, plan_name) REFERENCES plans(service_id, plan_name),
                FOREIGN KEY (round_id) REFERENCES rounds(round_id) ON DELETE SET NULL
            );

            -- Memberships
            CREATE TABLE IF NOT EXISTS memberships (
                room_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                is_host INTEGER NOT NULL DEFAULT 0,
                payment_status TEXT NOT NULL,
                joined_at TEXT NOT NULL,
                FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE,
                UNIQUE(room_id, user_id)
            );

            -- Invitation codes
            CREATE TABLE IF NOT EXISTS invitation_codes (
                code TEXT PRIMARY KEY,
                room_id INTEGER NOT NULL,
                is_valid INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE
            );

            -- Applications to public rooms
            CREATE TABLE IF NOT EXISTS applications (
                room_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                message TEXT NOT NULL DEFAULT '',
                is_accepted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE,
                UNIQUE(room_id, user_id)
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_memberships_user ON memberships(user_id);
            CREATE INDEX IF NOT EXISTS idx_memberships_room ON memberships(room_id);
            CREATE INDEX IF NOT EXISTS idx_invitation_codes_room ON invitation_codes(room_id, is_valid);
            CREATE INDEX IF NOT EXISTS idx_rooms_public ON rooms(is_public);
            CREATE INDEX IF NOT EXISTS idx_rounds_starting ON rounds(starting_time);
            CREATE INDEX IF NOT EXISTS idx_rounds_deadline ON rounds(payment_deadline);
        "#,
    },
];

fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Highest applied version, 0 for a fresh database
pub(crate) fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

/// Apply one migration and record it in the same transaction
fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    tx.commit()?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let from = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    if pending.is_empty() {
        return Ok(());
    }

    for migration in pending {
        info!(
            version = migration.version,
            description = migration.description,
            "Applying migration"
        );
        apply(conn, migration)?;
    }

    info!(from, to = current_version(conn)?, "Database schema updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, i + 1, "{}", migration.description);
        }
    }

    #[test]
    fn test_core_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["rooms", "memberships", "invitation_codes", "rounds", "plans"] {
            let count: u32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }
}
