//! Single-threaded timers on a virtual clock.
//!
//! Events come back in deadline order; ties fire in the order they were
//! scheduled. Nothing runs until the host pops it, which gives the same
//! run-to-completion behavior as a browser event loop.

use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct Scheduler<E> {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), E>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Scheduler {
            now: Duration::ZERO,
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Arm a timer that fires `delay` from now.
    pub fn schedule(&mut self, delay: Duration, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((self.now + delay, id), event);
        id
    }

    /// Disarm a timer. Returns its event if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<E> {
        let key = self.pending.keys().find(|(_, t)| *t == id).copied()?;
        self.pending.remove(&key)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.keys().any(|(_, t)| *t == id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, E)> {
        let (&(deadline, id), _) = self.pending.iter().next()?;
        if deadline > until {
            return None;
        }
        let event = self.pending.remove(&(deadline, id))?;
        self.now = self.now.max(deadline);
        Some((id, event))
    }

    /// Move the clock forward without firing anything.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_schedule_fires_in_deadline_order() {
        let mut timers = Scheduler::new();
        timers.schedule(ms(300), "late");
        timers.schedule(ms(100), "early");
        timers.schedule(ms(100), "early-second");

        let mut fired = Vec::new();
        while let Some((_, e)) = timers.pop_due(ms(1000)) {
            fired.push((e, timers.now()));
        }
        assert_eq!(
            fired,
            vec![("early", ms(100)), ("early-second", ms(100)), ("late", ms(300))]
        );
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut timers = Scheduler::new();
        let first = timers.schedule(ms(200), 1);
        let second = timers.schedule(ms(200), 2);
        assert_eq!(timers.cancel(first), Some(1));
        assert_eq!(timers.cancel(first), None);
        assert!(!timers.is_pending(first));
        assert!(timers.is_pending(second));

        assert_eq!(timers.pop_due(ms(199)).map(|(_, e)| e), None);
        assert_eq!(timers.pop_due(ms(200)).map(|(_, e)| e), Some(2));
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_delays_are_relative_to_now() {
        let mut timers = Scheduler::new();
        timers.settle(ms(500));
        timers.schedule(ms(100), ());
        assert_eq!(timers.next_deadline(), Some(ms(600)));
        timers.settle(ms(100));
        assert_eq!(timers.now(), ms(500));
    }
}
