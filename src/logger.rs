//! `log` facade backend that writes records into the CDC log pipeline.
//!
//! Records are rendered as `"[LEVEL] target: message\n"` through
//! [`LogPipeline::try_log`], so `log::info!` and friends never block and are
//! safe from interrupt handlers. A record that arrives while another
//! message holds the formatter is dropped.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::pipeline::LogPipeline;

pub struct CdcLogger<'a, const N: usize> {
    pipeline: &'a LogPipeline<N>,
    level: LevelFilter,
}

impl<'a, const N: usize> CdcLogger<'a, N> {
    pub const fn new(pipeline: &'a LogPipeline<N>, level: LevelFilter) -> Self {
        Self { pipeline, level }
    }
}

impl<const N: usize> CdcLogger<'static, N> {
    /// Install as the global `log` backend.
    ///
    /// Must be called once during startup.
    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.level);
        Ok(())
    }
}

impl<const N: usize> Log for CdcLogger<'_, N> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        self.pipeline.try_log(
            record.level().as_str(),
            format_args!("{}: {}", record.target(), record.args()),
        );
    }

    fn flush(&self) {}
}
