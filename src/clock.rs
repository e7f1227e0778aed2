use std::time::{SystemTime, UNIX_EPOCH};

/// A source of wall-clock timestamps for partition naming and age checks.
///
/// Partition filenames carry millisecond precision, so the clock resolution
/// is milliseconds since the UNIX epoch.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time in milliseconds since the UNIX epoch.
    fn now_millis(&self) -> u64;
}

/// A clock that uses `std::time::SystemTime`.
///
/// This is the default implementation. It is susceptible to NTP adjustments
/// but requires no calibration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX epoch");
        u64::try_from(timestamp.as_millis()).expect("system time exceeds timestamp range")
    }
}

/// A clock that uses the CPU's Time-Stamp Counter (TSC) via the `quanta` crate.
///
/// Anchors to SystemTime at initialization and then progresses on TSC ticks,
/// so successive readings never go backwards. Rollover relies on that when it
/// generates strictly increasing partition names.
#[derive(Debug, Clone)]
pub struct QuantaClock {
    clock: quanta::Clock,
    start_wall_ms: u64,
    start_instant: quanta::Instant,
}

impl Default for QuantaClock {
    fn default() -> Self {
        let clock = quanta::Clock::new();
        let start_instant = clock.now();
        let start_wall_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX epoch")
            .as_millis() as u64;

        Self {
            clock,
            start_wall_ms,
            start_instant,
        }
    }
}

impl QuantaClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for QuantaClock {
    fn now_millis(&self) -> u64 {
        let delta = self.clock.now().duration_since(self.start_instant);
        self.start_wall_ms + delta.as_millis() as u64
    }
}
