//! Time utilities for the combat scheduler

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default combat tick rate (ticks per second)
pub const DEFAULT_COMBAT_TPS: u32 = 20;

/// Duration of one scheduler tick at the given rate
pub fn tick_interval(ticks_per_second: u32) -> Duration {
    Duration::from_micros(1_000_000 / ticks_per_second.max(1) as u64)
}

/// Delta time handed to each instance update (in seconds)
pub fn tick_delta(ticks_per_second: u32) -> f32 {
    1.0 / ticks_per_second.max(1) as f32
}

/// Convert a delta in seconds to whole simulation milliseconds
pub fn delta_to_millis(delta_secs: f32) -> u64 {
    (delta_secs.max(0.0) * 1000.0).round() as u64
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
