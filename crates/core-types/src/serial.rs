use serde::{Deserialize, Serialize};

/// Serial line parameters for the grid link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: ParityMode,
    pub flow_control: FlowControl,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParityMode {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Hardware,
    Software,
}

impl SerialConfig {
    /// Create a standard 8N1 configuration at the specified baud rate.
    pub fn new_8n1(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: ParityMode::None,
            flow_control: FlowControl::None,
        }
    }
}

impl Default for SerialConfig {
    /// Grid devices speak 115200 8-N-1 with no flow control.
    fn default() -> Self {
        Self::new_8n1(115_200)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_8n1() {
        let config = SerialConfig::new_8n1(9600);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, 8);
        assert_eq!(config.stop_bits, 1);
        assert_eq!(config.parity, ParityMode::None);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_serial_config_default_matches_grid_link() {
        let config = SerialConfig::default();
        assert_eq!(config, SerialConfig::new_8n1(115_200));
    }

    #[test]
    fn test_serial_config_serialization() {
        let config = SerialConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SerialConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
