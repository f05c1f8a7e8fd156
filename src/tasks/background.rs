//! Periodic background producer

use embassy_time::{Duration, Timer};

use crate::cdc_log;
use crate::pipeline::LogPipeline;

/// Emit one heartbeat line. Returns the rendered length.
pub async fn heartbeat<const N: usize>(pipeline: &LogPipeline<N>) -> usize {
    cdc_log!(pipeline, "BG", "Hello World {}", "dewe").await
}

/// Task that logs a heartbeat every `period`
pub async fn background_task<const N: usize>(pipeline: &LogPipeline<N>, period: Duration) -> ! {
    loop {
        Timer::after(period).await;
        heartbeat(pipeline).await;
    }
}
