/// Fixed-interval tick clock, polled from the UI loop
use std::time::{Duration, Instant};

/// Ticks owed after a long stall are capped so playback does not race to catch up.
const MAX_CATCH_UP_TICKS: u32 = 4;
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct TickClock {
    interval: Duration,
    next_tick: Option<Instant>,
}

impl TickClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            next_tick: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self, now: Instant) {
        self.next_tick = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    /// Number of ticks that fell due up to `now`.
    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let Some(mut next) = self.next_tick else {
            return 0;
        };

        let mut due = 0;
        while next <= now && due <= MAX_CATCH_UP_TICKS {
            due += 1;
            next += self.interval;
        }
        if due > MAX_CATCH_UP_TICKS {
            due = MAX_CATCH_UP_TICKS;
            next = now + self.interval;
        }
        self.next_tick = Some(next);
        due
    }

    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_tick
            .map(|next| next.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(50);

    #[test]
    fn test_stopped_clock_never_ticks() {
        let mut clock = TickClock::new(INTERVAL);
        assert_eq!(clock.due_ticks(Instant::now()), 0);
        assert!(clock.time_until_next(Instant::now()).is_none());
    }

    #[test]
    fn test_ticks_at_fixed_cadence() {
        let start = Instant::now();
        let mut clock = TickClock::new(INTERVAL);
        clock.start(start);

        assert_eq!(clock.due_ticks(start + Duration::from_millis(49)), 0);
        assert_eq!(clock.due_ticks(start + Duration::from_millis(50)), 1);
        assert_eq!(clock.due_ticks(start + Duration::from_millis(120)), 1);
        assert_eq!(clock.due_ticks(start + Duration::from_millis(150)), 1);
        assert_eq!(
            clock.time_until_next(start + Duration::from_millis(160)),
            Some(Duration::from_millis(40))
        );
    }

    #[test]
    fn test_catch_up_is_capped() {
        let start = Instant::now();
        let mut clock = TickClock::new(INTERVAL);
        clock.start(start);

        let late = start + Duration::from_secs(2);
        assert_eq!(clock.due_ticks(late), MAX_CATCH_UP_TICKS);
        assert_eq!(clock.due_ticks(late + Duration::from_millis(50)), 1);
    }

    #[test]
    fn test_zero_interval_is_raised_to_minimum() {
        let start = Instant::now();
        let mut clock = TickClock::new(Duration::ZERO);
        assert_eq!(clock.interval(), MIN_INTERVAL);

        clock.start(start);
        assert_eq!(clock.due_ticks(start + Duration::from_millis(1)), 1);
        assert_eq!(clock.due_ticks(start + Duration::from_secs(60)), MAX_CATCH_UP_TICKS);
    }

    #[test]
    fn test_stop_clears_schedule() {
        let start = Instant::now();
        let mut clock = TickClock::new(INTERVAL);
        clock.start(start);
        clock.stop();
        assert!(clock.time_until_next(start).is_none());
        assert_eq!(clock.due_ticks(start + Duration::from_secs(1)), 0);
    }
}
