use crate::messages::BridgeMessage;
use crate::osc;
use crate::BridgeError;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Receives `/serialosc/list` announcements on the well-known port.
pub struct DiscoveryServer {
    socket: UdpSocket,
}

impl DiscoveryServer {
    /// Bind the discovery receiver. Failure here is fatal: without it no
    /// client can ever find the daemon.
    pub async fn bind(port: u16) -> Result<Self, BridgeError> {
        let addr = format!("0.0.0.0:{port}");
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: addr.clone(),
                source,
            })?;
        log::info!("discovery listening on {addr}");
        Ok(Self { socket })
    }

    /// The bound address (the port matters when bound ephemeral in tests).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Run the receive loop, queueing decoded packets for the bridge.
    pub async fn run(self, tx: mpsc::Sender<BridgeMessage>) {
        let mut buf = [0u8; rosc::decoder::MTU];
        loop {
            let (n, from) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    log::warn!("discovery socket read failed: {e}");
                    continue;
                }
            };
            let Some(packet) = osc::decode_datagram(&buf[..n]) else {
                continue;
            };
            if tx.send(BridgeMessage::Discovery { packet, from }).await.is_err() {
                // Bridge loop is gone; the process is shutting down.
                return;
            }
        }
    }
}
