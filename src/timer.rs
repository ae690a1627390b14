//! Deadline timers driven by an explicit clock
//!
//! Nothing here sleeps or spawns. The owner passes `now` in and polls; a
//! timer only fires from [`Timer::fire`] or [`Debouncer::poll`].

use std::time::{Duration, Instant};

use log::warn;

/// One-shot timer that can be rescheduled or cancelled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timer {
    due: Option<Instant>,
}

impl Timer {
    /// Arm the timer, replacing any previous deadline. A deadline past the
    /// clock's range leaves the timer disarmed.
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.due = now.checked_add(delay);
        if self.due.is_none() {
            warn!("Timer delay {delay:?} overflows the clock, not armed");
        }
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.due
    }

    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.due.map(|due| due.saturating_duration_since(now))
    }

    /// Disarm and return true if the deadline has passed
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// Trailing-edge debouncer: the last value passed to [`call`](Self::call)
/// comes out of [`poll`](Self::poll) once `delay` has passed without
/// another call.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    timer: Timer,
    pending: Option<T>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timer: Timer::default(),
            pending: None,
        }
    }

    pub fn call(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.timer.schedule(now, self.delay);
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.timer.fire(now) {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn timer_fires_once_after_deadline() {
        let start = Instant::now();
        let mut timer = Timer::default();
        timer.schedule(start, ms(400));

        assert!(!timer.fire(start + ms(399)));
        assert!(timer.fire(start + ms(400)));
        assert!(!timer.fire(start + ms(500)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn rescheduling_pushes_deadline_back() {
        let start = Instant::now();
        let mut timer = Timer::default();
        timer.schedule(start, ms(400));
        timer.schedule(start + ms(300), ms(400));

        assert!(!timer.fire(start + ms(500)));
        assert_eq!(timer.time_remaining(start + ms(500)), Some(ms(200)));
        assert!(timer.fire(start + ms(700)));
    }

    #[test]
    fn overflowing_delay_leaves_timer_disarmed() {
        let start = Instant::now();
        let mut timer = Timer::default();
        timer.schedule(start, Duration::MAX);

        assert!(!timer.is_armed());
        assert!(!timer.fire(start + ms(1000)));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let start = Instant::now();
        let mut timer = Timer::default();
        timer.schedule(start, ms(10));
        timer.cancel();
        assert!(!timer.fire(start + ms(100)));
    }

    #[test]
    fn debouncer_keeps_last_value_of_a_burst() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(200));

        debouncer.call(1, start);
        debouncer.call(2, start + ms(50));
        debouncer.call(3, start + ms(100));

        assert_eq!(debouncer.poll(start + ms(250)), None);
        assert_eq!(debouncer.poll(start + ms(300)), Some(3));
        assert_eq!(debouncer.poll(start + ms(600)), None);
    }

    #[test]
    fn cancelled_debouncer_drops_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(200));
        debouncer.call("zoom", start);
        debouncer.cancel();

        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + ms(300)), None);
    }
}
