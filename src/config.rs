use std::time::Duration;

use crate::ship::ShipClass;

pub const BOARD_SIZE: u8 = 10;
pub const NUM_SHIPS: usize = 5;
pub const FLEET: [ShipClass; NUM_SHIPS] = [
    ShipClass::new("Carrier", 5),
    ShipClass::new("Battleship", 4),
    ShipClass::new("Cruiser", 3),
    ShipClass::new("Submarine", 3),
    ShipClass::new("Destroyer", 2),
];

/// Grid cells covered by a complete fleet.
pub const FLEET_CELLS: usize = 17;

/// Silence tolerated on a connection before the sweep drops it.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a disconnected player's seat is held for reconnection.
pub const DEFAULT_RECONNECT_GRACE: Duration = Duration::from_secs(60);

/// Cadence of the background sweep tick.
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Upper bound on a single outbound socket write.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Protocol faults tolerated before the connection is dropped.
pub const DEFAULT_FAULT_THRESHOLD: u32 = 3;

/// Tunable server settings. Game rules (board size, fleet) are fixed consts.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub inactivity_timeout: Duration,
    pub reconnect_grace: Duration,
    pub sweep_period: Duration,
    pub send_timeout: Duration,
    pub fault_threshold: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            reconnect_grace: DEFAULT_RECONNECT_GRACE,
            sweep_period: DEFAULT_SWEEP_PERIOD,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            fault_threshold: DEFAULT_FAULT_THRESHOLD,
        }
    }
}
