//! UDP receive loop.

use std::net::SocketAddr;

use chrono::Utc;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use kingfisher_core::{Counters, RawDatagram, Result};

use crate::MAX_DATAGRAM_SIZE;
use crate::queue::{EnqueueError, WorkQueue};

/// Bind the ingest socket. The kernel receive buffer is grown when asked so
/// short bursts ride out worker scheduling hiccups.
pub fn bind_socket(addr: SocketAddr, recv_buffer_bytes: usize) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if recv_buffer_bytes > 0
        && let Err(e) = socket.set_recv_buffer_size(recv_buffer_bytes)
    {
        warn!("Could not set receive buffer to {} bytes: {}", recv_buffer_bytes, e);
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(Into::into)
}

/// Read datagrams until shutdown. Never blocks on the queue: a full queue
/// drops the datagram and counts the overflow. Only an unrecoverable socket
/// error stops the loop early, and it takes the service down with it.
pub async fn receive_loop(
    socket: UdpSocket,
    queue: WorkQueue,
    counters: Counters,
    shutdown: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, peer)) => {
                    counters.record_received();
                    let text = String::from_utf8_lossy(&buf[..len]).into_owned();
                    let datagram = RawDatagram {
                        source: peer.ip(),
                        text,
                        received_at: Utc::now(),
                    };
                    match queue.push(datagram) {
                        Ok(()) => counters.record_enqueued(),
                        Err(EnqueueError::QueueFull) => {
                            counters.record_overflow_drop();
                            warn!("Work queue is full. Dropping message from {}.", peer.ip());
                        }
                        Err(EnqueueError::WorkerUnavailable) => {
                            counters.record_overflow_drop();
                            warn!("Worker channel is full. Dropping message from {}.", peer.ip());
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Error receiving syslog message: {}; stopping receiver", e);
                    shutdown.cancel();
                    break;
                }
            },
        }
    }
    info!("Receiver stopped");
}
