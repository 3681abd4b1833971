//! Splitroom Core Library
//!
//! Models, permissions, room lifecycle logic, and storage for shared-cost
//! rooms.

pub mod config;
pub mod deadline;
pub mod error;
pub mod fees;
pub mod invariants;
pub mod invitations;
pub mod lifecycle;
pub mod models;
pub mod permissions;
pub mod scheduler;
pub mod storage;

pub use config::Config;
pub use deadline::Deadline;
pub use error::{Error, ErrorKind, Result};
pub use invitations::InvitationLedger;
pub use lifecycle::RoomManager;
pub use models::*;
pub use permissions::*;
pub use storage::{
    ApplicationRepository, CatalogRepository, Database, InvitationRepository,
    MembershipRepository, RoomRepository, RoundRepository, Storage, UserRepository,
};
