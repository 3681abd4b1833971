//! TCP client for a room server
//!
//! Requests are answered in order, so the client writes one request and
//! reads frames until the matching response arrives.

use std::net::SocketAddr;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use splitroom_core::{
    InvitationCode, NewRoom, PaymentStatus, RoomId, Round, RoundRequest, UserId,
};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ErrorBody, Message, Operation, Reply};

/// Client handle acting on behalf of one requester
pub struct Client {
    reader: ReadHalf<TcpStream>,
    writer: WriteHalf<TcpStream>,
    requester_id: UserId,
    next_id: u64,
}

impl Client {
    /// Connect to a room server
    pub async fn connect(addr: SocketAddr, requester_id: UserId) -> Result<Self> {
        info!(addr = %addr, requester_id, "Connecting to server");

        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = tokio::io::split(stream);

        Ok(Client {
            reader,
            writer,
            requester_id,
            next_id: 1,
        })
    }

    pub fn requester_id(&self) -> UserId {
        self.requester_id
    }

    /// Send an operation and wait for its reply
    pub async fn call(&mut self, operation: Operation) -> Result<Reply> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Message::Request {
            id,
            requester_id: self.requester_id,
            operation,
        };
        write_frame(&mut self.writer, &request).await?;

        loop {
            match read_frame::<_, Message>(&mut self.reader).await? {
                Message::Response {
                    id: response_id,
                    status,
                    reply,
                    error,
                } if response_id == id => return into_reply(status, reply, error),
                Message::ServerShutdown => return Err(Error::ServerShutdown),
                other => debug!(?other, "Skipping unrelated frame"),
            }
        }
    }

    /// Round-trip a ping
    pub async fn ping(&mut self) -> Result<()> {
        write_frame(&mut self.writer, &Message::Ping).await?;
        match read_frame::<_, Message>(&mut self.reader).await? {
            Message::Pong => Ok(()),
            Message::ServerShutdown => Err(Error::ServerShutdown),
            _ => Err(Error::Protocol("Expected Pong".into())),
        }
    }

    pub async fn create_room(&mut self, room: NewRoom) -> Result<RoomId> {
        match self.call(Operation::CreateRoom { room }).await? {
            Reply::RoomId(room_id) => Ok(room_id),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn generate_invitation_code(&mut self, room_id: RoomId) -> Result<InvitationCode> {
        match self.call(Operation::GenerateInvitationCode { room_id }).await? {
            Reply::Code(code) => Ok(code),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn join(&mut self, code: &str) -> Result<RoomId> {
        let operation = Operation::Join {
            code: code.to_string(),
        };
        match self.call(operation).await? {
            Reply::RoomId(room_id) => Ok(room_id),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn add_round(&mut self, room_id: RoomId, round: RoundRequest) -> Result<Round> {
        match self.call(Operation::AddRound { room_id, round }).await? {
            Reply::Round(Some(round)) => Ok(round),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn update_payment_status(
        &mut self,
        room_id: RoomId,
        user_id: UserId,
        status: PaymentStatus,
    ) -> Result<()> {
        let operation = Operation::UpdatePaymentStatus {
            room_id,
            user_id,
            status,
        };
        match self.call(operation).await? {
            Reply::Done => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn split_fee(&mut self, room_id: RoomId) -> Result<i64> {
        match self.call(Operation::SplitFee { room_id }).await? {
            Reply::Fee(fee) => Ok(fee),
            other => Err(unexpected(&other)),
        }
    }
}

fn into_reply(status: u16, reply: Option<Reply>, error: Option<ErrorBody>) -> Result<Reply> {
    match (reply, error) {
        (Some(reply), None) => Ok(reply),
        (_, Some(error)) => Err(Error::Remote {
            status,
            code: error.code,
            message: error.message,
        }),
        (None, None) => Err(Error::Protocol(format!("Empty response with status {status}"))),
    }
}

fn unexpected(reply: &Reply) -> Error {
    Error::Protocol(format!("Unexpected reply: {:?}", reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::STATUS_FORBIDDEN;

    #[test]
    fn test_error_response_becomes_remote_error() {
        let err = into_reply(
            STATUS_FORBIDDEN,
            None,
            Some(ErrorBody {
                code: "not_host".into(),
                message: "only the host is authorized for this action".into(),
            }),
        )
        .unwrap_err();

        assert_eq!(err.remote_code(), Some("not_host"));
        assert!(matches!(err, Error::Remote { status: 403, .. }));
    }

    #[test]
    fn test_empty_response_is_protocol_error() {
        assert!(matches!(into_reply(200, None, None), Err(Error::Protocol(_))));
    }
}
