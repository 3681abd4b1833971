//! User directory storage operations

use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::OptionalExt;
use crate::error::Result;
use crate::models::{User, UserId};

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or refresh a user
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub fn upsert(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (user_id, name, email) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET name = excluded.name, email = excluded.email",
            params![user.id, user.name, user.email],
        )?;
        Ok(())
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT user_id, name, email FROM users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(user)
    }
}
