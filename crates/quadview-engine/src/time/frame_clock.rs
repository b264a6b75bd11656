use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick.
    pub dt: Duration,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Measures presented-frame intervals.
///
/// Keeps an exponential moving average so the host can log a stable frame time
/// instead of per-frame jitter. Intervals longer than `idle_after` (on-demand
/// redraw with nothing to draw) are not folded into the average.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    frame_index: u64,
    average: Option<Duration>,
    idle_after: Duration,
}

/// Weight of the newest sample in the moving average.
const SMOOTHING: f64 = 0.1;

impl FrameClock {
    pub fn new() -> Self {
        Self::with_idle_threshold(Duration::from_millis(250))
    }

    pub fn with_idle_threshold(idle_after: Duration) -> Self {
        Self {
            last: None,
            frame_index: 0,
            average: None,
            idle_after,
        }
    }

    /// Forgets the previous timestamp, e.g. after the surface was reconfigured.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();

        if self.last.is_some() && dt <= self.idle_after {
            self.average = Some(match self.average {
                None => dt,
                Some(avg) => avg.mul_f64(1.0 - SMOOTHING) + dt.mul_f64(SMOOTHING),
            });
        }
        self.last = Some(now);

        let ft = FrameTime {
            dt,
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// Smoothed frame interval, once at least two busy frames were seen.
    pub fn average(&self) -> Option<Duration> {
        self.average
    }

    pub fn frames(&self) -> u64 {
        self.frame_index
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_dt() {
        let mut clock = FrameClock::new();
        let ft = clock.tick_at(Instant::now());
        assert_eq!(ft.dt, Duration::ZERO);
        assert_eq!(ft.frame_index, 0);
        assert!(clock.average().is_none());
    }

    #[test]
    fn average_tracks_steady_interval() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        for i in 0..50 {
            clock.tick_at(start + Duration::from_millis(16 * i));
        }
        let avg = clock.average().unwrap();
        assert!((avg.as_secs_f64() - 0.016).abs() < 1e-6);
        assert_eq!(clock.frames(), 50);
    }

    #[test]
    fn idle_gaps_are_not_averaged() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.tick_at(start);
        clock.tick_at(start + Duration::from_millis(10));
        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert_eq!(ft.dt, Duration::from_millis(4990));
        assert_eq!(clock.average(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn reset_restarts_interval() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.tick_at(start);
        clock.reset();
        let ft = clock.tick_at(start + Duration::from_millis(100));
        assert_eq!(ft.dt, Duration::ZERO);
        assert_eq!(ft.frame_index, 1);
    }
}
