//! TCP server exposing room operations
//!
//! Each connection sends `Request` frames and receives one `Response` per
//! request, in order. Room operations run on the blocking pool against a
//! shared `RoomManager` and are bounded by the request timeout.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::WriteHalf;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use splitroom_core::{RoomManager, Storage, UserId};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ErrorBody, Message, Operation, Reply};

type SharedManager<S> = Arc<Mutex<RoomManager<S>>>;

/// Server handle
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind and start serving `manager`
    pub async fn start<A, S>(addr: A, manager: RoomManager<S>, timeout: Duration) -> Result<Self>
    where
        A: ToSocketAddrs,
        S: Storage + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let manager = Arc::new(Mutex::new(manager));

        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(
            listener,
            manager,
            timeout,
            shutdown_tx.clone(),
            shutdown_rx,
        ));

        Ok(Server {
            addr: bound_addr,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop<S: Storage + Send + 'static>(
    listener: TcpListener,
    manager: SharedManager<S>,
    timeout: Duration,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            manager.clone(),
                            timeout,
                            shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Serve one client until it disconnects or the server stops
async fn handle_connection<S: Storage + Send + 'static>(
    stream: TcpStream,
    addr: SocketAddr,
    manager: SharedManager<S>,
    timeout: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    loop {
        tokio::select! {
            result = read_frame::<_, Message>(&mut reader) => {
                match result {
                    Ok(msg) => {
                        if let Err(e) = handle_message(msg, &mut writer, &manager, timeout).await {
                            warn!(addr = %addr, error = %e, "Write error");
                            break;
                        }
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!(addr = %addr, "Connection closed");
                        break;
                    }
                    Err(e) => {
                        warn!(addr = %addr, error = %e, "Read error");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                let _ = write_frame(&mut writer, &Message::ServerShutdown).await;
                break;
            }
        }
    }

    debug!(addr = %addr, "Client disconnected");
}

/// Handle an incoming message, writing any answer
async fn handle_message<S: Storage + Send + 'static>(
    msg: Message,
    writer: &mut WriteHalf<TcpStream>,
    manager: &SharedManager<S>,
    timeout: Duration,
) -> Result<()> {
    match msg {
        Message::Request {
            id,
            requester_id,
            operation,
        } => {
            let response = execute(manager.clone(), requester_id, operation, timeout).await;
            let response = match response {
                Ok(reply) => Message::ok(id, reply),
                Err(failure) => Message::failure(id, failure),
            };
            write_frame(writer, &response).await
        }
        Message::Ping => write_frame(writer, &Message::Pong).await,
        _ => {
            debug!("Ignoring unexpected message type");
            Ok(())
        }
    }
}

/// Run an operation on the blocking pool under the request timeout
async fn execute<S: Storage + Send + 'static>(
    manager: SharedManager<S>,
    requester_id: UserId,
    operation: Operation,
    timeout: Duration,
) -> std::result::Result<Reply, (u16, ErrorBody)> {
    let task = tokio::task::spawn_blocking(move || {
        let manager = manager.lock().map_err(|_| {
            error!("Room manager lock poisoned");
            ErrorBody::internal()
        })?;
        dispatch(&manager, requester_id, operation).map_err(|e| {
            if e.is_domain() {
                debug!(requester_id, error = %e, "Request refused");
            } else {
                error!(requester_id, error = %e, "Request failed");
            }
            ErrorBody::from_core(&e)
        })
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            error!(error = %join_err, "Request task failed");
            Err(ErrorBody::internal())
        }
        Err(_) => {
            warn!(requester_id, "Request timed out");
            Err(ErrorBody::timeout())
        }
    }
}

/// Route an operation to the room manager
fn dispatch<S: Storage>(
    manager: &RoomManager<S>,
    requester_id: UserId,
    operation: Operation,
) -> splitroom_core::Result<Reply> {
    let reply = match operation {
        Operation::CreateRoom { room } => Reply::RoomId(manager.create(requester_id, room)?),
        Operation::StartRoom { room_id } => {
            manager.start(requester_id, room_id)?;
            Reply::Done
        }
        Operation::FinishRoom { room_id } => {
            manager.finish(requester_id, room_id)?;
            Reply::Done
        }
        Operation::UpdateRoom { room_id, update } => {
            Reply::Room(manager.update(requester_id, room_id, update)?)
        }
        Operation::DeleteRoom { room_id } => {
            manager.delete(requester_id, room_id)?;
            Reply::Done
        }
        Operation::Join { code } => Reply::RoomId(manager.join(requester_id, &code)?),
        Operation::Leave { room_id, user_id } => {
            manager.leave(requester_id, room_id, user_id)?;
            Reply::Done
        }
        Operation::AddRound { room_id, round } => {
            Reply::Round(Some(manager.add_round(requester_id, room_id, &round)?))
        }
        Operation::DeleteRound { room_id } => {
            manager.delete_round(requester_id, room_id)?;
            Reply::Done
        }
        Operation::GetRound { room_id } => Reply::Round(manager.get_round(room_id)?),
        Operation::UpdatePaymentStatus {
            room_id,
            user_id,
            status,
        } => {
            manager.update_payment_status(requester_id, room_id, user_id, status)?;
            Reply::Done
        }
        Operation::SplitFee { room_id } => Reply::Fee(manager.room_split_fee(room_id)?),
        Operation::JoinedRooms => Reply::JoinedRooms(manager.joined_rooms(requester_id)?),
        Operation::PublicRooms => Reply::PublicRooms(manager.public_rooms()?),
        Operation::RoomInfo { room_id } => Reply::RoomInfo(manager.room_info(requester_id, room_id)?),
        Operation::RoomMembers { room_id } => {
            Reply::Members(manager.room_members(requester_id, room_id)?)
        }
        Operation::RoomHost { room_id } => Reply::User(manager.room_host(requester_id, room_id)?),
        Operation::IsPublic { room_id } => Reply::Flag(manager.is_public(room_id)?),
        Operation::GenerateInvitationCode { room_id } => {
            Reply::Code(manager.generate_invitation_code(requester_id, room_id)?)
        }
        Operation::ListInvitationCodes { room_id } => {
            Reply::Codes(manager.list_invitation_codes(requester_id, room_id)?)
        }
        Operation::Apply { room_id, message } => {
            manager.apply(requester_id, room_id, &message)?;
            Reply::Done
        }
        Operation::ListApplications { room_id } => {
            Reply::Applications(manager.list_applications(requester_id, room_id)?)
        }
        Operation::AcceptApplication { room_id, user_id } => {
            manager.accept_application(requester_id, room_id, user_id)?;
            Reply::Done
        }
        Operation::RejectApplication { room_id, user_id } => {
            manager.reject_application(requester_id, room_id, user_id)?;
            Reply::Done
        }
        Operation::PlanCeiling { plan } => Reply::Ceiling(manager.get_plan_ceiling(&plan)?),
        Operation::MembersStartingOn { date } => {
            Reply::Participations(manager.members_starting_on(date)?)
        }
        Operation::PaymentsDueOn { date } => {
            Reply::Participations(manager.payments_due_on(date)?)
        }
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitroom_core::config::RoomsConfig;
    use splitroom_core::Database;

    #[tokio::test]
    async fn test_server_start() {
        let db = Database::open_in_memory().unwrap();
        let manager = RoomManager::new(db, &RoomsConfig::default());
        let server = Server::start("127.0.0.1:0", manager, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(server.addr().port() > 0);
        server.shutdown();
    }

    #[test]
    fn test_dispatch_maps_operations() {
        let db = Database::open_in_memory().unwrap();
        let manager = RoomManager::new(db, &RoomsConfig::default());

        let reply = dispatch(&manager, 1, Operation::PublicRooms).unwrap();
        assert_eq!(reply, Reply::PublicRooms(Vec::new()));

        let err = dispatch(&manager, 1, Operation::StartRoom { room_id: 5 }).unwrap_err();
        assert!(matches!(err, splitroom_core::Error::NotHost));
    }
}
