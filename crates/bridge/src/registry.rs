use crate::messages::{BridgeMessage, SessionKey};
use crate::osc;
use crate::BridgeError;
use core_types::{GridSize, DEFAULT_PREFIX};
use rosc::{OscMessage, OscType};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Per-client state: its prefix, its device-facing endpoint, and the
/// dedicated UDP socket the client talks to the device through.
pub struct Session {
    /// OSC address prefix prepended to device-facing addresses.
    pub prefix: String,
    /// Where device-originated OSC for this client is sent.
    pub device_host: String,
    pub device_port: u16,
    /// Local port of the session socket, published via `/serialosc/device`.
    pub sys_port: u16,
    // The endpoint that announced itself; only the initial
    // /serialosc/device reply goes here.
    client_host: String,
    client_port: u16,
    socket: Arc<UdpSocket>,
}

impl Session {
    /// Send `msg` to the session's current device endpoint.
    ///
    /// A failed send means the client went away; it is logged and
    /// swallowed, and the session stays registered.
    pub async fn send(&self, msg: OscMessage) {
        self.send_to(msg, (self.device_host.as_str(), self.device_port))
            .await;
    }

    /// Send `msg` back to the endpoint the client announced itself from.
    pub async fn send_to_client(&self, msg: OscMessage) {
        self.send_to(msg, (self.client_host.as_str(), self.client_port))
            .await;
    }

    async fn send_to(&self, msg: OscMessage, dest: (&str, u16)) {
        let addr = msg.addr.clone();
        let Some(bytes) = osc::encode(msg) else { return };
        if let Err(e) = self.socket.send_to(&bytes, dest).await {
            log::debug!("UDP send of {addr} to {}:{} failed: {e}", dest.0, dest.1);
        }
    }
}

/// Create/update operations over the set of live sessions.
///
/// Sessions are created by discovery, mutated in place by `/sys/*`
/// traffic, and live until the process exits.
pub struct SessionRegistry {
    sessions: HashMap<SessionKey, Session>,
    // Hands the bridge queue to each session's receive task.
    tx: mpsc::Sender<BridgeMessage>,
}

impl SessionRegistry {
    pub fn new(tx: mpsc::Sender<BridgeMessage>) -> Self {
        Self {
            sessions: HashMap::new(),
            tx,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Session> {
        self.sessions.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Idempotent session creation.
    ///
    /// A known client gets its existing session back with `sys_port`
    /// unchanged; a new one gets a freshly bound ephemeral socket and a
    /// receive task feeding the bridge queue.
    pub async fn ensure_session(&mut self, host: &str, port: u16) -> Result<&Session, BridgeError> {
        match self.sessions.entry(session_key(host, port)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let socket = Arc::new(UdpSocket::bind(("0.0.0.0", 0)).await.map_err(
                    |source| BridgeError::Bind {
                        addr: "0.0.0.0:0".into(),
                        source,
                    },
                )?);
                let sys_port = socket
                    .local_addr()
                    .map_err(|source| BridgeError::Bind {
                        addr: "0.0.0.0:0".into(),
                        source,
                    })?
                    .port();
                spawn_session_receiver(entry.key().clone(), Arc::clone(&socket), self.tx.clone());
                log::info!("session {} listening on udp port {}", entry.key(), sys_port);
                Ok(entry.insert(Session {
                    prefix: DEFAULT_PREFIX.to_string(),
                    device_host: host.to_string(),
                    device_port: port,
                    sys_port,
                    client_host: host.to_string(),
                    client_port: port,
                    socket,
                }))
            }
        }
    }

    /// Point device-originated traffic at a new port and confirm.
    ///
    /// Out-of-range values are dropped without a confirmation.
    pub async fn update_port(&mut self, key: &str, new_port: i32) {
        if !is_good_port(new_port) {
            log::debug!("ignoring out-of-range /sys/port {new_port} from {key}");
            return;
        }
        let Some(session) = self.sessions.get_mut(key) else {
            return;
        };
        session.device_port = new_port as u16;
        session
            .send(OscMessage {
                addr: "/sys/port".into(),
                args: vec![OscType::Int(new_port)],
            })
            .await;
    }

    /// Point device-originated traffic at a new host and confirm.
    pub async fn update_host(&mut self, key: &str, new_host: &str) {
        let Some(session) = self.sessions.get_mut(key) else {
            return;
        };
        session.device_host = new_host.to_string();
        session
            .send(OscMessage {
                addr: "/sys/host".into(),
                args: vec![OscType::String(new_host.to_string())],
            })
            .await;
    }

    /// Assign a new prefix, normalized so it is always non-empty and
    /// slash-led.
    pub fn update_prefix(&mut self, key: &str, new_prefix: &str) {
        if new_prefix.is_empty() {
            log::debug!("ignoring empty /sys/prefix from {key}");
            return;
        }
        let Some(session) = self.sessions.get_mut(key) else {
            return;
        };
        session.prefix = if new_prefix.starts_with('/') {
            new_prefix.to_string()
        } else {
            format!("/{new_prefix}")
        };
    }

    /// Emit the full `/sys/*` state dump to the session's device endpoint,
    /// in the fixed order id, size, host, port, prefix, rotation.
    pub async fn send_info(&self, key: &str, sys_id: &str, size: Option<GridSize>) {
        let Some(session) = self.sessions.get(key) else {
            return;
        };
        let size = size.unwrap_or_default();
        let fields = [
            ("/sys/id", vec![OscType::String(sys_id.to_string())]),
            (
                "/sys/size",
                vec![OscType::Int(size.x as i32), OscType::Int(size.y as i32)],
            ),
            (
                "/sys/host",
                vec![OscType::String(session.device_host.clone())],
            ),
            ("/sys/port", vec![OscType::Int(session.device_port as i32)]),
            ("/sys/prefix", vec![OscType::String(session.prefix.clone())]),
            ("/sys/rotation", vec![OscType::Int(0)]),
        ];
        for (addr, args) in fields {
            session
                .send(OscMessage {
                    addr: addr.to_string(),
                    args,
                })
                .await;
        }
    }
}

pub fn session_key(host: &str, port: u16) -> SessionKey {
    format!("{host}:{port}")
}

/// Port arguments arrive as OSC i32; anything outside (0, 65536) is bad.
pub fn is_good_port(n: i32) -> bool {
    n > 0 && n < 65536
}

/// Read loop for one session socket: decode datagrams and queue them for
/// the bridge with the session's key attached.
fn spawn_session_receiver(
    key: SessionKey,
    socket: Arc<UdpSocket>,
    tx: mpsc::Sender<BridgeMessage>,
) {
    tokio::spawn(async move {
        let mut buf = [0u8; rosc::decoder::MTU];
        loop {
            let n = match socket.recv_from(&mut buf).await {
                Ok((n, _)) => n,
                Err(e) => {
                    log::warn!("session {key} socket read failed: {e}");
                    continue;
                }
            };
            let Some(packet) = osc::decode_datagram(&buf[..n]) else {
                continue;
            };
            let msg = BridgeMessage::Session {
                key: key.clone(),
                packet,
            };
            if tx.send(msg).await.is_err() {
                // Bridge loop is gone; the process is shutting down.
                return;
            }
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn test_registry() -> (SessionRegistry, mpsc::Receiver<BridgeMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (SessionRegistry::new(tx), rx)
    }

    #[test]
    fn test_is_good_port_bounds() {
        assert!(!is_good_port(-1));
        assert!(!is_good_port(0));
        assert!(is_good_port(1));
        assert!(is_good_port(9000));
        assert!(is_good_port(65535));
        assert!(!is_good_port(65536));
    }

    #[test]
    fn test_session_key_format() {
        assert_eq!(session_key("127.0.0.1", 9000), "127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_ensure_session_is_idempotent() {
        let (mut registry, _rx) = test_registry();

        let first = registry.ensure_session("127.0.0.1", 9000).await.unwrap();
        let port = first.sys_port;
        assert!(port > 0);
        assert_eq!(first.prefix, "/monome");
        assert_eq!(first.device_host, "127.0.0.1");
        assert_eq!(first.device_port, 9000);

        // Same announcement again: same session, same bound port.
        let second = registry.ensure_session("127.0.0.1", 9000).await.unwrap();
        assert_eq!(second.sys_port, port);
        assert_eq!(registry.len(), 1);

        // A different client port is a different session.
        let third = registry.ensure_session("127.0.0.1", 9001).await.unwrap();
        assert_ne!(third.sys_port, port);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_update_port_rejects_out_of_range() {
        let (mut registry, _rx) = test_registry();
        registry.ensure_session("127.0.0.1", 9000).await.unwrap();
        let key = session_key("127.0.0.1", 9000);

        registry.update_port(&key, 0).await;
        registry.update_port(&key, -5).await;
        registry.update_port(&key, 70000).await;
        assert_eq!(registry.get(&key).unwrap().device_port, 9000);

        registry.update_port(&key, 9010).await;
        assert_eq!(registry.get(&key).unwrap().device_port, 9010);
    }

    #[tokio::test]
    async fn test_update_host_changes_endpoint() {
        let (mut registry, _rx) = test_registry();
        registry.ensure_session("127.0.0.1", 9000).await.unwrap();
        let key = session_key("127.0.0.1", 9000);

        registry.update_host(&key, "10.0.0.2").await;
        assert_eq!(registry.get(&key).unwrap().device_host, "10.0.0.2");
        // The client's announce endpoint is untouched.
        assert_eq!(registry.get(&key).unwrap().client_host, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_update_prefix_normalizes() {
        let (mut registry, _rx) = test_registry();
        registry.ensure_session("127.0.0.1", 9000).await.unwrap();
        let key = session_key("127.0.0.1", 9000);

        registry.update_prefix(&key, "/m");
        assert_eq!(registry.get(&key).unwrap().prefix, "/m");

        // Repeating the assignment changes nothing.
        registry.update_prefix(&key, "/m");
        assert_eq!(registry.get(&key).unwrap().prefix, "/m");

        // Missing slash is prepended, empty is ignored.
        registry.update_prefix(&key, "grid");
        assert_eq!(registry.get(&key).unwrap().prefix, "/grid");
        registry.update_prefix(&key, "");
        assert_eq!(registry.get(&key).unwrap().prefix, "/grid");
    }

    #[tokio::test]
    async fn test_operations_on_unknown_key_are_noops() {
        let (mut registry, _rx) = test_registry();
        registry.update_port("nobody:1", 9000).await;
        registry.update_host("nobody:1", "example").await;
        registry.update_prefix("nobody:1", "/x");
        registry.send_info("nobody:1", "monome", None).await;
        assert!(registry.is_empty());
    }
}
