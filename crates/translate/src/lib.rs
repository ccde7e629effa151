//! Stateless mapping between OSC messages and grid hardware bytes.
//!
//! Host-to-device addresses arrive with the session prefix already
//! stripped; the translator neither knows nor cares about sessions.

use core_types::KeyState;
use rosc::{OscMessage, OscType};

// Host-to-device opcodes
const OP_LED_OFF: u8 = 0x10;
const OP_LED_ON: u8 = 0x11;
const OP_LED_ALL_OFF: u8 = 0x12;
const OP_LED_ALL_ON: u8 = 0x13;
const OP_LED_MAP: u8 = 0x14;
const OP_LED_ROW: u8 = 0x15;
const OP_LED_COL: u8 = 0x16;
const OP_LED_INTENSITY: u8 = 0x17;
const OP_LEVEL_SET: u8 = 0x18;
const OP_LEVEL_ALL: u8 = 0x19;
const OP_LEVEL_MAP: u8 = 0x1a;
const OP_LEVEL_ROW: u8 = 0x1b;
const OP_LEVEL_COL: u8 = 0x1c;

/// Translate a device-bound OSC message into the bytes to write to serial.
///
/// Integer arguments are truncated to 8 bits; ranges are not validated.
/// Unknown addresses and messages missing the arguments that select an
/// opcode return `None` and are dropped by the caller.
pub fn to_serial(addr: &str, args: &[OscType]) -> Option<Vec<u8>> {
    let v = int_args(args);
    match addr {
        "/grid/led/set" => match v.as_slice() {
            &[x, y, s, ..] => Some(vec![
                if s == 0 { OP_LED_OFF } else { OP_LED_ON },
                x,
                y,
            ]),
            _ => None,
        },
        "/grid/led/all" => match v.as_slice() {
            &[s, ..] => Some(vec![if s == 0 { OP_LED_ALL_OFF } else { OP_LED_ALL_ON }]),
            _ => None,
        },
        "/grid/led/map" => Some(prefixed(OP_LED_MAP, &v)),
        "/grid/led/row" => Some(prefixed(OP_LED_ROW, &v)),
        "/grid/led/col" => Some(prefixed(OP_LED_COL, &v)),
        "/grid/led/intensity" => Some(prefixed(OP_LED_INTENSITY, &v)),
        "/grid/led/level/set" => Some(prefixed(OP_LEVEL_SET, &v)),
        "/grid/led/level/all" => Some(prefixed(OP_LEVEL_ALL, &v)),
        "/grid/led/level/map" => Some(prefixed(OP_LEVEL_MAP, &v)),
        "/grid/led/level/row" => Some(prefixed(OP_LEVEL_ROW, &v)),
        "/grid/led/level/col" => Some(prefixed(OP_LEVEL_COL, &v)),
        _ => None,
    }
}

/// Build the key event message delivered to a session.
pub fn key_message(prefix: &str, x: u8, y: u8, state: KeyState) -> OscMessage {
    OscMessage {
        addr: format!("{}/grid/key", prefix),
        args: vec![
            OscType::Int(x as i32),
            OscType::Int(y as i32),
            OscType::Int(state.as_i32()),
        ],
    }
}

/// Collect integer arguments, truncated to byte width. Non-integer
/// arguments are skipped.
fn int_args(args: &[OscType]) -> Vec<u8> {
    args.iter()
        .filter_map(|arg| match arg {
            OscType::Int(i) => Some(*i as u8),
            OscType::Long(l) => Some(*l as u8),
            _ => None,
        })
        .collect()
}

fn prefixed(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(opcode);
    out.extend_from_slice(payload);
    out
}
