use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::Dispatcher;
use super::OscError;
use super::OscMessage;
use super::Result;

/// Largest possible UDP payload; datagrams are never truncated
const RECV_BUFFER_SIZE: usize = 65_536;

/// A bound OSC listener.
///
/// Constructing one via [`OscServer::bind`] is the binding step; a bind error
/// is returned there and the server never starts listening. [`OscServer::serve`]
/// then runs the receive loop until its shutdown signal fires.
pub struct OscServer {
    socket: UdpSocket,
    dispatcher: Dispatcher,
}

impl std::fmt::Debug for OscServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscServer")
            .field("socket", &self.socket)
            .finish_non_exhaustive()
    }
}

impl OscServer {
    pub async fn bind(addr: SocketAddr, dispatcher: Dispatcher) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| OscError::Bind { addr, source })?;
        debug!("OSC socket bound on {}", addr);
        Ok(Self { socket, dispatcher })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive and dispatch datagrams until `shutdown_rx` fires or its sender
    /// is dropped.
    ///
    /// Datagrams that fail to decode are logged and skipped; the loop keeps
    /// running.
    pub async fn serve(self, mut shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        info!("Listening for OSC messages on {}", self.local_addr()?);

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("OSC listener shutting down");
                    return Ok(());
                }
                res = self.socket.recv_from(&mut buf) => match res {
                    Ok((size, peer)) => self.handle_datagram(&buf[..size], peer),
                    Err(e) => warn!("OSC receive error: {}", e),
                },
            }
        }
    }

    fn handle_datagram(&self, data: &[u8], peer: SocketAddr) {
        let packet = match rosc::decoder::decode_udp(data) {
            Ok((_, packet)) => packet,
            Err(e) => {
                warn!(
                    "Dropping malformed OSC packet ({} bytes) from {}: {}",
                    data.len(),
                    peer,
                    e
                );
                return;
            }
        };

        for msg in OscMessage::from_packet(packet) {
            trace!("OSC {} {} from {}", msg.addr, msg.type_tags(), peer);
            if self.dispatcher.dispatch(&msg) == 0 {
                debug!("No handler for OSC address {}", msg.addr);
            }
        }
    }
}

/// Send a single message to `target` from an ephemeral socket.
///
/// Returns the number of bytes sent.
pub async fn send(target: SocketAddr, msg: &OscMessage) -> Result<usize> {
    let local: SocketAddr = if target.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let buf = msg.encode()?;
    let socket = UdpSocket::bind(local).await?;
    let sent = socket.send_to(&buf, target).await?;
    debug!("Sent OSC {} ({} bytes) to {}", msg.addr, sent, target);
    Ok(sent)
}
