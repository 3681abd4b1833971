//! Per-request deadlines
//!
//! Room operations check their deadline before every storage step and abort
//! with `Error::Timeout` once it has passed. Work already committed stays
//! committed.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now() + timeout,
        }
    }

    pub fn at(expires_at: Instant) -> Self {
        Self { expires_at }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Fail with `Timeout` if the deadline has passed
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            Err(Error::Timeout)
        } else {
            Ok(())
        }
    }
}
