use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::trace;

/// Timers a STOMP session arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Fires when the peer has been silent for too long.
    InboundHeartbeat,
    /// Fires when it is time to send our own heartbeat.
    OutboundHeartbeat,
}

/// A one-shot timer facility.
///
/// `start` arms (or re-arms) a timer to fire once after `delay`. `reset`
/// pushes an armed timer's deadline out by its original delay, measured from
/// now; resetting a timer that is not armed does nothing. `stop` disarms it;
/// a stopped timer never fires.
pub trait Scheduler {
    fn start(&mut self, timer: Timer, delay: Duration);
    fn reset(&mut self, timer: Timer);
    fn stop(&mut self, timer: Timer);
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn start(&mut self, timer: Timer, delay: Duration) {
        (**self).start(timer, delay)
    }

    fn reset(&mut self, timer: Timer) {
        (**self).reset(timer)
    }

    fn stop(&mut self, timer: Timer) {
        (**self).stop(timer)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for &mut S {
    fn start(&mut self, timer: Timer, delay: Duration) {
        (**self).start(timer, delay)
    }

    fn reset(&mut self, timer: Timer) {
        (**self).reset(timer)
    }

    fn stop(&mut self, timer: Timer) {
        (**self).stop(timer)
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    delay: Duration,
    deadline: Instant,
}

/// `Instant`-based scheduler for a poll loop.
///
/// The loop asks for [`DeadlineTimers::next_deadline`] to bound its wait and
/// then collects due timers with [`DeadlineTimers::take_expired`]. Expired
/// timers are disarmed before they are returned.
#[derive(Debug, Default)]
pub struct DeadlineTimers {
    armed: HashMap<Timer, Armed>,
}

impl DeadlineTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest deadline among armed timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.values().map(|armed| armed.deadline).min()
    }

    /// Whether `timer` is currently armed.
    pub fn is_armed(&self, timer: Timer) -> bool {
        self.armed.contains_key(&timer)
    }

    /// Disarm and return every timer due at `now`, earliest first.
    pub fn take_expired(&mut self, now: Instant) -> Vec<Timer> {
        let mut due: Vec<(Instant, Timer)> = self
            .armed
            .iter()
            .filter(|(_, armed)| armed.deadline <= now)
            .map(|(timer, armed)| (armed.deadline, *timer))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);

        for (_, timer) in &due {
            self.armed.remove(timer);
        }
        due.into_iter().map(|(_, timer)| timer).collect()
    }

    fn start_at(&mut self, timer: Timer, delay: Duration, now: Instant) {
        trace!(?timer, ?delay, "timer armed");
        self.armed.insert(
            timer,
            Armed {
                delay,
                deadline: now + delay,
            },
        );
    }

    fn reset_at(&mut self, timer: Timer, now: Instant) {
        if let Some(armed) = self.armed.get_mut(&timer) {
            armed.deadline = now + armed.delay;
        }
    }
}

impl Scheduler for DeadlineTimers {
    fn start(&mut self, timer: Timer, delay: Duration) {
        self.start_at(timer, delay, Instant::now());
    }

    fn reset(&mut self, timer: Timer) {
        self.reset_at(timer, Instant::now());
    }

    fn stop(&mut self, timer: Timer) {
        if self.armed.remove(&timer).is_some() {
            trace!(?timer, "timer stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_delay() {
        let base = Instant::now();
        let mut timers = DeadlineTimers::new();
        timers.start_at(Timer::InboundHeartbeat, Duration::from_secs(5), base);

        assert!(timers
            .take_expired(base + Duration::from_secs(4))
            .is_empty());
        assert_eq!(
            timers.take_expired(base + Duration::from_secs(5)),
            vec![Timer::InboundHeartbeat]
        );
        assert!(timers
            .take_expired(base + Duration::from_secs(60))
            .is_empty());
        assert!(!timers.is_armed(Timer::InboundHeartbeat));
    }

    #[test]
    fn reset_pushes_deadline_out() {
        let base = Instant::now();
        let mut timers = DeadlineTimers::new();
        timers.start_at(Timer::InboundHeartbeat, Duration::from_secs(5), base);
        timers.reset_at(Timer::InboundHeartbeat, base + Duration::from_secs(3));

        assert!(timers
            .take_expired(base + Duration::from_secs(6))
            .is_empty());
        assert_eq!(
            timers.next_deadline(),
            Some(base + Duration::from_secs(8))
        );
    }

    #[test]
    fn reset_of_unarmed_timer_is_ignored() {
        let mut timers = DeadlineTimers::new();
        timers.reset(Timer::OutboundHeartbeat);
        assert!(!timers.is_armed(Timer::OutboundHeartbeat));
        assert!(timers.next_deadline().is_none());
    }

    #[test]
    fn stop_disarms() {
        let base = Instant::now();
        let mut timers = DeadlineTimers::new();
        timers.start_at(Timer::OutboundHeartbeat, Duration::from_millis(10), base);
        timers.stop(Timer::OutboundHeartbeat);

        assert!(timers
            .take_expired(base + Duration::from_secs(1))
            .is_empty());
    }

    #[test]
    fn expired_timers_come_back_earliest_first() {
        let base = Instant::now();
        let mut timers = DeadlineTimers::new();
        timers.start_at(Timer::InboundHeartbeat, Duration::from_secs(3), base);
        timers.start_at(Timer::OutboundHeartbeat, Duration::from_secs(1), base);

        assert_eq!(timers.next_deadline(), Some(base + Duration::from_secs(1)));
        assert_eq!(
            timers.take_expired(base + Duration::from_secs(10)),
            vec![Timer::OutboundHeartbeat, Timer::InboundHeartbeat]
        );
    }
}
