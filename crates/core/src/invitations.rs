//! Invitation ledger: single-use codes bound to a room
//!
//! Codes are a truncated SHA-256 digest of the issue time and room id. The
//! short keyspace makes collisions possible, so issuing retries with a fresh
//! salt whenever storage reports the code is taken.

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::RoomsConfig;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::models::{CodeInsert, InvitationCode, RoomId};
use crate::storage::InvitationRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvitationLedger {
    code_length: usize,
    max_attempts: u32,
}

impl Default for InvitationLedger {
    fn default() -> Self {
        Self::from_config(&RoomsConfig::default())
    }
}

impl InvitationLedger {
    pub fn new(code_length: usize, max_attempts: u32) -> Self {
        Self {
            code_length: code_length.clamp(1, 64),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &RoomsConfig) -> Self {
        Self::new(config.invitation_code_length, config.invitation_code_attempts)
    }

    /// Hex digest of issue time, room id, and salt, truncated to the code length
    pub fn derive_code(&self, room_id: RoomId, issued_at: DateTime<Utc>, salt: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(issued_at.to_rfc3339().as_bytes());
        hasher.update(room_id.to_be_bytes());
        hasher.update(salt.to_be_bytes());
        let digest = hasher.finalize();

        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex[..self.code_length].to_string()
    }

    /// Issue and persist a fresh valid code for a room.
    ///
    /// Authorization is the caller's job.
    pub fn generate<S: InvitationRepository + ?Sized>(
        &self,
        store: &S,
        room_id: RoomId,
        deadline: &Deadline,
    ) -> Result<InvitationCode> {
        let mut rng = rand::thread_rng();

        for attempt in 1..=self.max_attempts {
            deadline.check()?;
            let salt = if attempt == 1 { 0 } else { rng.gen() };
            let code = InvitationCode::new(room_id, self.derive_code(room_id, Utc::now(), salt));

            match store.create_invitation_code(&code)? {
                CodeInsert::Inserted => {
                    info!(room_id, attempt, "Issued invitation code");
                    return Ok(code);
                }
                CodeInsert::Conflict => {
                    debug!(room_id, attempt, "Invitation code collided, retrying");
                }
            }
        }

        warn!(room_id, attempts = self.max_attempts, "Invitation code space exhausted");
        Err(Error::CodeSpaceExhausted(self.max_attempts))
    }

    /// Flip a valid code to invalid and return its room
    pub fn consume<S: InvitationRepository + ?Sized>(&self, store: &S, code: &str) -> Result<RoomId> {
        store
            .consume_invitation_code(code)?
            .ok_or(Error::InvalidInvitationCode)
    }

    /// Undo a consume whose join failed downstream; a no-op if nothing is pending
    pub fn reinstate<S: InvitationRepository + ?Sized>(&self, store: &S, code: &str) -> Result<()> {
        if store.reinstate_invitation_code(code)? {
            warn!(code, "Reinstated invitation code after failed join");
        } else {
            debug!(code, "Reinstate found no consumed code");
        }
        Ok(())
    }

    pub fn list_valid<S: InvitationRepository + ?Sized>(
        &self,
        store: &S,
        room_id: RoomId,
    ) -> Result<Vec<InvitationCode>> {
        store.list_valid_codes(room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRoom, Plan, PlanKey, Service};
    use crate::storage::{CatalogRepository, Database, RoomRepository};
    use chrono::TimeZone;
    use std::time::Duration;

    fn room_db() -> (Database, RoomId) {
        let db = Database::open_in_memory().unwrap();
        db.upsert_service(&Service {
            id: 1,
            name: "Tunes".into(),
            plans: vec![Plan {
                name: "duo".into(),
                cost: 1200,
                max_count: 2,
            }],
        })
        .unwrap();
        let room = NewRoom::new(PlanKey::new(1, "duo"), 2, false).into_room(1);
        let room_id = db.create_room_with_host(&room).unwrap();
        (db, room_id)
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(30))
    }

    #[test]
    fn test_derived_code_shape() {
        let ledger = InvitationLedger::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let code = ledger.derive_code(42, at, 0);
        assert_eq!(code.len(), 7);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(code, ledger.derive_code(42, at, 0));
        assert_ne!(code, ledger.derive_code(43, at, 0));
    }

    #[test]
    fn test_generate_then_consume_once() {
        let (db, room_id) = room_db();
        let ledger = InvitationLedger::default();

        let code = ledger.generate(&db, room_id, &deadline()).unwrap();
        assert_eq!(ledger.list_valid(&db, room_id).unwrap().len(), 1);

        assert_eq!(ledger.consume(&db, &code.code).unwrap(), room_id);
        assert!(matches!(
            ledger.consume(&db, &code.code),
            Err(Error::InvalidInvitationCode)
        ));
        assert!(ledger.list_valid(&db, room_id).unwrap().is_empty());
    }

    #[test]
    fn test_reinstate_restores_one_use() {
        let (db, room_id) = room_db();
        let ledger = InvitationLedger::default();
        let code = ledger.generate(&db, room_id, &deadline()).unwrap();

        ledger.consume(&db, &code.code).unwrap();
        ledger.reinstate(&db, &code.code).unwrap();
        ledger.reinstate(&db, &code.code).unwrap();

        assert_eq!(ledger.consume(&db, &code.code).unwrap(), room_id);
        assert!(ledger.consume(&db, &code.code).is_err());
    }

    #[test]
    fn test_unknown_code_is_invalid() {
        let (db, _) = room_db();
        let ledger = InvitationLedger::default();
        assert!(matches!(
            ledger.consume(&db, "nope"),
            Err(Error::InvalidInvitationCode)
        ));
        ledger.reinstate(&db, "nope").unwrap();
    }

    #[test]
    fn test_single_hex_char_space_exhausts() {
        let (db, room_id) = room_db();
        let ledger = InvitationLedger::new(1, 3);

        // Sixteen codes fill the keyspace; further issues must give up
        let mut issued = 0;
        let mut exhausted = false;
        for _ in 0..200 {
            match ledger.generate(&db, room_id, &deadline()) {
                Ok(_) => issued += 1,
                Err(Error::CodeSpaceExhausted(3)) => {
                    if issued == 16 {
                        exhausted = true;
                        break;
                    }
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(issued, 16);
        assert!(exhausted);
    }

    #[test]
    fn test_generate_respects_deadline() {
        let (db, room_id) = room_db();
        let ledger = InvitationLedger::default();
        let expired = Deadline::at(std::time::Instant::now());
        assert!(matches!(
            ledger.generate(&db, room_id, &expired),
            Err(Error::Timeout)
        ));
    }
}
