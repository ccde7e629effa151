use thiserror::Error;

/// Fatal bridge failures. Transient conditions (a vanished client, a
/// malformed datagram) are logged and swallowed before they get here.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to bind UDP {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serial link lost: {0}")]
    SerialLost(String),

    #[error("serial write failed: {0}")]
    Serial(#[from] transport_serial::SerialError),
}
