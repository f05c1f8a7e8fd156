//! Build-time configuration for the ESP32-S3 USB CDC log firmware

/// Log pipeline sizing and default timeouts
pub mod pipeline {
    /// Largest chunk moved through the transfer queue (one full-speed CDC packet)
    pub const CHUNK_CAPACITY: usize = 64;

    /// Number of chunks the transfer queue can hold
    pub const QUEUE_CAPACITY: usize = 1024;

    /// Size of the shared render scratch buffer
    pub const RENDER_BUFFER_SIZE: usize = 2048;

    /// How long a task-context log call waits for the formatter lock
    pub const LOCK_TIMEOUT_MS: u64 = 1000;

    /// How long a task-context producer waits for a free queue slot
    pub const ENQUEUE_TIMEOUT_MS: u64 = 10;

    /// Maximum level forwarded by the `log` facade backend
    pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;

    /// Tag used for firmware start-up messages
    pub const STARTUP_TAG: &str = "main";
}

/// Long-lived task timing
pub mod tasks {
    /// Grace period for host enumeration before the drain task starts writing
    pub const DRAIN_STARTUP_DELAY_MS: u64 = 8000;

    /// Heartbeat period of the background producer
    pub const BACKGROUND_PERIOD_MS: u64 = 1000;

    /// Back-off after a CDC read error
    pub const RX_RETRY_DELAY_MS: u64 = 10;
}

/// USB device descriptor values
pub mod usb {
    /// Espressif vendor ID
    pub const VID: u16 = 0x303a;
    pub const PID: u16 = 0x4001;

    pub const MANUFACTURER: &str = "Espressif Systems";
    pub const PRODUCT: &str = "CDC Log Device";
    pub const SERIAL_NUMBER: &str = "123456";

    /// Full-speed bulk endpoint packet size
    pub const MAX_PACKET_SIZE: u16 = 64;

    pub const MAX_POWER_MA: u16 = 100;
}

/// Heap used for chunk storage
pub mod heap {
    /// Enough for a full queue of maximum-size chunks plus allocator overhead
    pub const SIZE: usize = 96 * 1024;
}

/// Demo file written to the mass-storage volume
pub mod storage {
    pub const DIRECTORY: &str = "/usb/esp";
    pub const FILE_PATH: &str = "/usb/esp/test.txt";
    pub const GREETING: &str = "Hello World from the CDC log firmware!\n";

    /// Longest line read back from the demo file
    pub const MAX_LINE_LEN: usize = 64;
}
