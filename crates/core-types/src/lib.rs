use serde::{Deserialize, Serialize};

pub mod serial;
pub use serial::{FlowControl, ParityMode, SerialConfig};

/// Device family string reported in `/serialosc/device` replies.
pub const DEVICE_KIND: &str = "monome";

/// Sys id published to clients until the device reports one of its own.
pub const DEFAULT_SYS_ID: &str = "monome";

/// OSC address prefix of a freshly created session.
pub const DEFAULT_PREFIX: &str = "/monome";

/// Well-known UDP port the discovery receiver listens on.
pub const DISCOVERY_PORT: u16 = 12002;

/// Key transition direction reported by the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    Up,
    Down,
}

impl KeyState {
    /// OSC wire value: `0` for up, `1` for down.
    pub fn as_i32(self) -> i32 {
        match self {
            KeyState::Up => 0,
            KeyState::Down => 1,
        }
    }
}

/// Physical dimensions of the attached grid, learned from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub x: u8,
    pub y: u8,
}

impl GridSize {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl Default for GridSize {
    /// 8x8 is assumed until the device says otherwise.
    fn default() -> Self {
        Self { x: 8, y: 8 }
    }
}

/// A decoded hardware event read off the serial stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
    /// A key changed state at grid coordinates (x, y).
    Key { x: u8, y: u8, state: KeyState },
    /// The device reported its dimensions.
    Size(GridSize),
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state_wire_values() {
        assert_eq!(KeyState::Up.as_i32(), 0);
        assert_eq!(KeyState::Down.as_i32(), 1);
    }

    #[test]
    fn test_grid_size_default() {
        assert_eq!(GridSize::default(), GridSize::new(8, 8));
    }

    #[test]
    fn test_grid_size_serialization() {
        let size = GridSize::new(16, 8);
        let json = serde_json::to_string(&size).unwrap();
        let deserialized: GridSize = serde_json::from_str(&json).unwrap();
        assert_eq!(size, deserialized);
    }

    #[test]
    fn test_grid_event_compile_time_exhaustiveness() {
        // This test ensures we handle all event types at compile time
        let event = GridEvent::Size(GridSize::default());
        match event {
            GridEvent::Key { .. } => {}
            GridEvent::Size(_) => {} // If a new variant is added, this will fail to compile
        }
    }
}
