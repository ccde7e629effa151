use crate::Framer;
use core_types::{GridEvent, GridSize, KeyState};

// Device-to-host opcodes
const OP_SYS_ID: u8 = 0x01;
const OP_SYS_SIZE: u8 = 0x03;
const OP_KEY_UP: u8 = 0x20;
const OP_KEY_DOWN: u8 = 0x21;

/// Every message in the handled device-to-host set is this wide.
pub const FRAME_LEN: usize = 3;

/// Host-to-device query for the device id, written once after open.
pub const QUERY_ID: [u8; 1] = [0x01];
/// Host-to-device query for the grid size, written once after open.
pub const QUERY_SIZE: [u8; 1] = [0x05];

/// Splits the serial stream into fixed-width opcode-led frames and decodes
/// them into [`GridEvent`]s.
///
/// Bytes buffer until a full frame is available, so a frame split across
/// reads reassembles correctly. A frame whose leading byte is not a known
/// opcode is dropped whole, resynchronizing on the next frame boundary.
pub struct GridFramer {
    buffer: Vec<u8>,
}

impl GridFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    fn decode(frame: &[u8]) -> Option<GridEvent> {
        let (x, y) = (frame[1], frame[2]);
        match frame[0] {
            OP_SYS_SIZE => Some(GridEvent::Size(GridSize::new(x, y))),
            OP_KEY_UP => Some(GridEvent::Key {
                x,
                y,
                state: KeyState::Up,
            }),
            OP_KEY_DOWN => Some(GridEvent::Key {
                x,
                y,
                state: KeyState::Down,
            }),
            // The sys-id response carries nothing we use; consume its
            // frame like any other unknown opcode.
            OP_SYS_ID => None,
            _ => None,
        }
    }
}

impl Default for GridFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer for GridFramer {
    fn push(&mut self, bytes: &[u8]) -> Vec<GridEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while self.buffer.len() >= FRAME_LEN {
            if let Some(event) = Self::decode(&self.buffer[..FRAME_LEN]) {
                events.push(event);
            }
            self.buffer.drain(..FRAME_LEN);
        }
        events
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn name(&self) -> &'static str {
        "Grid"
    }
}
