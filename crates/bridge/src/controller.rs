use crate::messages::{BridgeMessage, SessionKey};
use crate::osc;
use crate::registry::{is_good_port, SessionRegistry};
use crate::BridgeError;
use core_types::{GridEvent, GridSize, DEFAULT_SYS_ID, DEVICE_KIND};
use framing::{grid, Framer, GridFramer};
use rosc::{OscMessage, OscType};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use transport_serial::{SerialEvent, SerialSink};

/// Top-level wiring: owns the framer, the serial write half, and the
/// session registry, and consumes the single bridge queue.
///
/// Everything runs through one sequential loop, which is what provides
/// the ordering guarantees: per-session packets dispatch in arrival
/// order, hardware writes never interleave, and a key event reaches
/// every session before the next message is handled.
pub struct Bridge {
    framer: GridFramer,
    serial: Box<dyn SerialSink>,
    registry: SessionRegistry,
    sys_id: String,
    size: Option<GridSize>,
}

impl Bridge {
    /// `tx` is the same queue `run` later consumes; the registry hands it
    /// to each session's receive task.
    pub fn new(serial: Box<dyn SerialSink>, tx: mpsc::Sender<BridgeMessage>) -> Self {
        Self {
            framer: GridFramer::new(),
            serial,
            registry: SessionRegistry::new(tx),
            sys_id: DEFAULT_SYS_ID.to_string(),
            size: None,
        }
    }

    /// Query the device for its id and size. The responses come back
    /// through the read thread as ordinary frames.
    pub fn init(&mut self) -> Result<(), BridgeError> {
        self.serial.send(&grid::QUERY_ID)?;
        self.serial.send(&grid::QUERY_SIZE)?;
        Ok(())
    }

    /// Consume the queue until the serial link dies or every sender hangs
    /// up.
    pub async fn run(mut self, mut rx: mpsc::Receiver<BridgeMessage>) -> Result<(), BridgeError> {
        while let Some(msg) = rx.recv().await {
            match msg {
                BridgeMessage::Serial(SerialEvent::Data(bytes)) => self.on_serial(&bytes).await,
                BridgeMessage::Serial(SerialEvent::Disconnected(reason)) => {
                    return Err(BridgeError::SerialLost(reason));
                }
                BridgeMessage::Discovery { packet, from } => {
                    for msg in osc::messages(packet) {
                        self.on_discovery(msg, from).await;
                    }
                }
                BridgeMessage::Session { key, packet } => {
                    for msg in osc::messages(packet) {
                        self.on_session(&key, msg).await;
                    }
                }
            }
        }
        log::info!("bridge queue closed, stopping");
        Ok(())
    }

    /// Frame the chunk and deliver each decoded event: size reports update
    /// shared state, key events fan out to every session.
    async fn on_serial(&mut self, bytes: &[u8]) {
        for event in self.framer.push(bytes) {
            match event {
                GridEvent::Size(size) => {
                    log::info!("device reports {}x{} grid", size.x, size.y);
                    self.size = Some(size);
                }
                GridEvent::Key { x, y, state } => {
                    for session in self.registry.iter() {
                        session
                            .send(translate::key_message(&session.prefix, x, y, state))
                            .await;
                    }
                }
            }
        }
    }

    /// `/serialosc/list` handling: create-or-reuse the session, then reply
    /// with the session's receive endpoint.
    async fn on_discovery(&mut self, msg: OscMessage, from: SocketAddr) {
        if msg.addr != "/serialosc/list" {
            log::debug!("ignoring {} on discovery port from {from}", msg.addr);
            return;
        }
        let (host, port) = match msg.args.as_slice() {
            [OscType::String(host), OscType::Int(port)] if is_good_port(*port) => {
                (host.clone(), *port as u16)
            }
            _ => {
                log::debug!("ignoring malformed /serialosc/list from {from}");
                return;
            }
        };
        let session = match self.registry.ensure_session(&host, port).await {
            Ok(session) => session,
            Err(e) => {
                log::warn!("could not create session for {host}:{port}: {e}");
                return;
            }
        };
        session
            .send_to_client(OscMessage {
                addr: "/serialosc/device".into(),
                args: vec![
                    OscType::String(self.sys_id.clone()),
                    OscType::String(DEVICE_KIND.to_string()),
                    OscType::Int(session.sys_port as i32),
                ],
            })
            .await;
    }

    /// Per-session dispatch: `/sys/*` goes to the registry, everything
    /// else is stripped of the session prefix and translated to hardware
    /// bytes.
    async fn on_session(&mut self, key: &SessionKey, msg: OscMessage) {
        match msg.addr.as_str() {
            "/sys/port" => {
                if let Some(OscType::Int(port)) = msg.args.first() {
                    self.registry.update_port(key, *port).await;
                }
            }
            "/sys/host" => {
                if let Some(OscType::String(host)) = msg.args.first() {
                    self.registry.update_host(key, host).await;
                }
            }
            "/sys/prefix" => {
                if let Some(OscType::String(prefix)) = msg.args.first() {
                    self.registry.update_prefix(key, prefix);
                }
            }
            "/sys/info" => {
                self.registry.send_info(key, &self.sys_id, self.size).await;
            }
            addr => {
                let Some(session) = self.registry.get(key) else {
                    return;
                };
                let Some(stripped) = addr.strip_prefix(session.prefix.as_str()) else {
                    log::debug!("dropping {addr} from {key}: prefix mismatch");
                    return;
                };
                let Some(bytes) = translate::to_serial(stripped, &msg.args) else {
                    log::debug!("dropping unknown address {addr} from {key}");
                    return;
                };
                if let Err(e) = self.serial.send(&bytes) {
                    // The read thread notices a dead device and ends the
                    // loop; a lone write failure is not itself fatal.
                    log::warn!("serial write failed: {e}");
                }
            }
        }
    }
}
