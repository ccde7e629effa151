use rosc::OscPacket;
use std::net::SocketAddr;
use transport_serial::SerialEvent;

/// Sessions are keyed by the client's announced `"<host>:<port>"`.
pub type SessionKey = String;

/// Inbound queue depth for the bridge loop. Sized for key-event bursts
/// from the device plus a handful of chattering clients.
pub const BRIDGE_QUEUE_DEPTH: usize = 512;

/// Everything the bridge loop reacts to, handled strictly in arrival
/// order.
#[derive(Debug)]
pub enum BridgeMessage {
    /// Output of the serial read thread.
    Serial(SerialEvent),

    /// OSC packet received on the discovery socket.
    Discovery { packet: OscPacket, from: SocketAddr },

    /// OSC packet received on a session's dedicated socket.
    Session { key: SessionKey, packet: OscPacket },
}
