//! Embassy tasks module
//!
//! Long-lived task bodies, generic over the `embedded-io` traits so they run
//! against the CDC-ACM adapters on hardware and against mocks in tests.
//! `main.rs` wraps each one in an `#[embassy_executor::task]`.

pub mod background;
pub mod serial;

pub use background::{background_task, heartbeat};
pub use serial::{drain_task, forward_packet, rx_task};
