use rosc::{OscMessage, OscPacket};

/// Decode a datagram, logging and dropping anything malformed.
pub(crate) fn decode_datagram(buf: &[u8]) -> Option<OscPacket> {
    match rosc::decoder::decode_udp(buf) {
        Ok((_, packet)) => Some(packet),
        Err(e) => {
            log::debug!("dropping malformed OSC datagram: {e:?}");
            None
        }
    }
}

/// Flatten a packet into its messages. Bundles are legal OSC even though
/// grid clients rarely send them; bundle timestamps are ignored.
pub(crate) fn messages(packet: OscPacket) -> Vec<OscMessage> {
    match packet {
        OscPacket::Message(msg) => vec![msg],
        OscPacket::Bundle(bundle) => bundle.content.into_iter().flat_map(messages).collect(),
    }
}

/// Encode one message for the wire.
pub(crate) fn encode(msg: OscMessage) -> Option<Vec<u8>> {
    match rosc::encoder::encode(&OscPacket::Message(msg)) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::debug!("failed to encode OSC message: {e:?}");
            None
        }
    }
}
