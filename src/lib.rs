#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod logger;
pub mod pipeline;
pub mod storage;
pub mod tasks;
pub mod transport;

// The CDC-ACM adapters depend on embassy-usb, only available with embedded feature
#[cfg(feature = "embedded")]
pub mod usb;
