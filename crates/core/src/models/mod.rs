//! Data models for Splitroom

mod application;
mod invitation;
mod membership;
mod plan;
mod room;
mod round;
mod summary;
mod user;

pub use application::*;
pub use invitation::*;
pub use membership::*;
pub use plan::*;
pub use room::*;
pub use round::*;
pub use summary::*;
pub use user::*;

/// Identifier of a room
pub type RoomId = i64;

/// Identifier of a user (opaque, issued by the credential collaborator)
pub type UserId = i64;

/// Identifier of a billing round
pub type RoundId = i64;

/// Identifier of a subscription service
pub type ServiceId = i64;
