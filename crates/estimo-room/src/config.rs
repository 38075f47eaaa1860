//! Room configuration.

use estimo_protocol::Estimate;
use serde::{Deserialize, Serialize};

/// Settings shared by every room on a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Value substituted for every estimate while a room is not flipped.
    pub mask: Estimate,

    /// Capacity of the hub's inbound command channel. Connection tasks
    /// wait when it is full.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            mask: Estimate::String("X".to_string()),
            command_buffer: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.mask, Estimate::String("X".into()));
        assert_eq!(config.command_buffer, 256);
    }
}
