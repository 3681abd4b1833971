//! Splitroom Network Library
//!
//! TCP transport for room operations.
//!
//! # Architecture
//!
//! - **Server**: wraps a `RoomManager`, answers one response per request
//! - **Client**: sends requests on behalf of a requester id
//! - **Protocol**: Length-prefixed JSON messages; failures carry a status
//!   code and a stable error code
//!
//! # Usage
//!
//! ```ignore
//! let server = Server::start("127.0.0.1:7341", manager, timeout).await?;
//!
//! let mut client = Client::connect(server.addr(), user_id).await?;
//! let room_id = client.join("3f9a0c1").await?;
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use error::{Error, Result};
pub use protocol::{ErrorBody, Message, Operation, Reply};
pub use server::Server;

/// Default port for Splitroom servers
pub const DEFAULT_PORT: u16 = 7341;
