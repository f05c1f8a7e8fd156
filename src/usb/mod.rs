//! USB OTG CDC-ACM serial port.
//!
//! A single virtual COM port carries both the log stream and the echo of
//! whatever the host sends.

pub mod cdc_io;

pub use cdc_io::{CdcReader, CdcWriter};
