// Tick timing for the peer loops.

/// Lower bound of one simulation step, in seconds.
pub const MIN_TICK_SECS: f64 = 0.01;
/// Upper bound of one simulation step, in seconds. Long stalls never turn into one big jump.
pub const MAX_TICK_SECS: f64 = 0.1;

/// Converts a raw millisecond gap into a simulation step.
pub fn clamp_delta(elapsed_ms: i64) -> f64 {
    (elapsed_ms as f64 / 1000.0).clamp(MIN_TICK_SECS, MAX_TICK_SECS)
}

/// Remembers the previous server timestamp a peer simulated at.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickClock {
    last_ms: Option<i64>,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `now_ms` and returns the clamped delta since the previous sample.
    pub fn sample(&mut self, now_ms: i64) -> f64 {
        let dt = match self.last_ms {
            Some(last) => clamp_delta(now_ms - last),
            None => MIN_TICK_SECS,
        };
        self.last_ms = Some(now_ms);
        dt
    }

    /// Forgets the previous sample, e.g. after losing the host seat.
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
