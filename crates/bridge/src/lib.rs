//! serialosc-contract bridge between the grid's serial protocol and
//! OSC-over-UDP clients.
//!
//! Clients announce themselves with `/serialosc/list` on the discovery
//! port; each gets a session with its own receive socket, prefix, and
//! device-facing endpoint. Key events fan out to every session; LED
//! traffic funnels down to the one serial device.

pub mod controller;
pub mod discovery;
pub mod error;
pub mod messages;
mod osc;
pub mod registry;

pub use controller::Bridge;
pub use discovery::DiscoveryServer;
pub use error::BridgeError;
pub use messages::{BridgeMessage, SessionKey, BRIDGE_QUEUE_DEPTH};
pub use registry::{Session, SessionRegistry};
