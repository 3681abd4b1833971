//! Error types for Splitroom Core

use thiserror::Error;

/// Whether an error is a typed domain outcome or an opaque failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Role checks and domain-rule violations, safe to show to callers
    Domain,
    /// Storage, parsing, and I/O failures; details stay internal
    Opaque,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("only the host is authorized for this action")]
    NotHost,

    #[error("only members are authorized for this action")]
    NotMember,

    #[error("user is not authorized for this action")]
    NotAuthorized,

    #[error("max count exceeds the plan ceiling")]
    PlanCapacityExceeded,

    #[error("room is full")]
    RoomFull,

    #[error("invalid invitation code")]
    InvalidInvitationCode,

    #[error("already joined")]
    AlreadyJoined,

    #[error("already applied")]
    AlreadyApplied,

    #[error("application not found")]
    ApplicationNotFound,

    #[error("round already created")]
    RoundAlreadyCreated,

    #[error("no round created")]
    NoRound,

    #[error("room not started yet")]
    NotStarted,

    #[error("room already started")]
    AlreadyStarted,

    #[error("room already ended")]
    AlreadyEnded,

    #[error("room not public")]
    NotPublic,

    #[error("cannot split a fee between zero members")]
    NoMembers,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid date: {0}")]
    InvalidDate(#[from] chrono::ParseError),

    #[error("could not issue a unique invitation code after {0} attempts")]
    CodeSpaceExhausted(u32),

    #[error("operation exceeded its deadline")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotHost
            | Error::NotMember
            | Error::NotAuthorized
            | Error::PlanCapacityExceeded
            | Error::RoomFull
            | Error::InvalidInvitationCode
            | Error::AlreadyJoined
            | Error::AlreadyApplied
            | Error::ApplicationNotFound
            | Error::RoundAlreadyCreated
            | Error::NoRound
            | Error::NotStarted
            | Error::AlreadyStarted
            | Error::AlreadyEnded
            | Error::NotPublic
            | Error::NoMembers
            | Error::NotFound(_)
            | Error::InvalidInput(_) => ErrorKind::Domain,
            Error::InvalidDate(_)
            | Error::CodeSpaceExhausted(_)
            | Error::Timeout
            | Error::Database(_)
            | Error::Io(_)
            | Error::Config(_) => ErrorKind::Opaque,
        }
    }

    pub fn is_domain(&self) -> bool {
        self.kind() == ErrorKind::Domain
    }
}

pub type Result<T> = std::result::Result<T, Error>;
