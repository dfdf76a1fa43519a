//! Wall-clock delta/total time with pause support.

use std::time::Instant;

/// A monotonic-ish counter. Values may step backwards across timer sources
/// or power-state transitions; the clock clamps the resulting delta.
pub trait TickSource {
    fn now(&self) -> i64;
    fn seconds_per_tick(&self) -> f64;
}

/// Nanosecond ticks since the source was created.
#[derive(Debug, Clone, Copy)]
pub struct InstantTicks {
    origin: Instant,
}

impl Default for InstantTicks {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TickSource for InstantTicks {
    fn now(&self) -> i64 {
        self.origin.elapsed().as_nanos() as i64
    }

    fn seconds_per_tick(&self) -> f64 {
        1e-9
    }
}

#[derive(Debug)]
pub struct FrameClock<T: TickSource = InstantTicks> {
    source: T,
    seconds_per_tick: f64,
    delta_time: f64,
    base_time: i64,
    paused_time: i64,
    stop_time: i64,
    previous_time: i64,
    current_time: i64,
    stopped: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(InstantTicks::default())
    }
}

impl<T: TickSource> FrameClock<T> {
    pub fn new(source: T) -> Self {
        let now = source.now();
        let seconds_per_tick = source.seconds_per_tick();
        Self {
            source,
            seconds_per_tick,
            delta_time: 0.0,
            base_time: now,
            paused_time: 0,
            stop_time: 0,
            previous_time: now,
            current_time: now,
            stopped: false,
        }
    }

    /// Establishes time zero. Call once before the loop starts.
    pub fn reset(&mut self) {
        let now = self.source.now();
        self.base_time = now;
        self.previous_time = now;
        self.current_time = now;
        self.paused_time = 0;
        self.stop_time = 0;
        self.delta_time = 0.0;
        self.stopped = false;
    }

    pub fn start(&mut self) {
        if !self.stopped {
            return;
        }
        let now = self.source.now();
        self.paused_time += now - self.stop_time;
        self.previous_time = now;
        self.current_time = now;
        self.stop_time = 0;
        self.stopped = false;
    }

    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stop_time = self.source.now();
        self.stopped = true;
    }

    pub fn tick(&mut self) {
        if self.stopped {
            self.delta_time = 0.0;
            return;
        }
        self.current_time = self.source.now();
        let delta = (self.current_time - self.previous_time) as f64 * self.seconds_per_tick;
        self.previous_time = self.current_time;
        self.delta_time = delta.max(0.0);
    }

    /// Seconds since [`FrameClock::reset`], excluding every paused interval.
    pub fn total_time(&self) -> f32 {
        let end = if self.stopped {
            self.stop_time
        } else {
            self.current_time
        };
        ((end - self.paused_time - self.base_time) as f64 * self.seconds_per_tick) as f32
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time as f32
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
