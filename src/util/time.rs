//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

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

/// Milliseconds since server start, from the monotonic clock.
///
/// Used as the snapshot timestamp so clients never see time run backwards
/// when the wall clock is adjusted.
pub fn monotonic_millis() -> u64 {
    SERVER_START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // 60 ticks per second
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Nominal tick length in milliseconds. Physics constants are expressed per
/// nominal tick and rescaled by the measured tick length.
pub const NOMINAL_TICK_MS: f32 = 1000.0 / SIMULATION_TPS as f32;

/// Upper bound on a single measured tick. A stalled scheduler must not
/// teleport players through platforms on the next tick.
pub const MAX_TICK_MS: f32 = NOMINAL_TICK_MS * 4.0;

/// Scale factor for a measured tick against the nominal tick
pub fn tick_scale(elapsed_ms: f32) -> f32 {
    elapsed_ms.clamp(0.0, MAX_TICK_MS) / NOMINAL_TICK_MS
}

/// Measures wall-clock spacing between simulation ticks
#[derive(Debug, Clone)]
pub struct TickClock {
    last: Instant,
}

impl TickClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Milliseconds since the previous call (or since construction/reset)
    pub fn lap_ms(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed.as_secs_f32() * 1000.0
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
