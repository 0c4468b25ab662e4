//! Single-threaded timer queue driving every protocol callback.
//!
//! Time is virtual: the owner advances the clock and pops due events. The
//! daemon maps tokio time onto it, tests advance it by hand.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::lsa::LsaKey;
use crate::name::Name;

/// Cancelable token for one scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Everything the router can schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Expiration (foreign) or refresh (own) timer of one LSA, tagged with the
    /// sequence number stored when it was scheduled.
    ExpireOrRefresh { key: LsaKey, seq_no: u64 },
    /// Fetch one LSA. `deadline` is on the scheduler clock; `None` means the
    /// first attempt, which computes it.
    ExpressInterest {
        interest: Name,
        retry: u32,
        deadline: Option<Duration>,
    },
    BuildAdjLsa,
    CalculateRoutingTable,
    TuningStep,
}

#[derive(Debug)]
pub struct Scheduler<E> {
    epoch: DateTime<Utc>,
    elapsed: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, u64), E>,
    deadlines: HashMap<u64, Duration>,
}

pub type EventScheduler = Scheduler<Event>;

impl<E> Scheduler<E> {
    /// A scheduler whose clock reads `epoch` at elapsed zero.
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            elapsed: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Wall-clock reading of the virtual clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.epoch + to_chrono(self.elapsed)
    }

    /// Time since the scheduler was created.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Wall-clock time `delay` from now.
    pub fn after(&self, delay: Duration) -> DateTime<Utc> {
        self.now() + to_chrono(delay)
    }

    /// Duration from now until `at`, zero if `at` is in the past.
    pub fn until(&self, at: DateTime<Utc>) -> Duration {
        (at - self.now()).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn schedule(&mut self, delay: Duration, event: E) -> TaskHandle {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.elapsed + delay;
        self.queue.insert((due, id), event);
        self.deadlines.insert(id, due);
        TaskHandle(id)
    }

    /// Cancels a pending event. Returns false if it already fired or was canceled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.deadlines.remove(&handle.0) {
            Some(due) => self.queue.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Removes the earliest event due at or before `until`, moving the clock to
    /// its deadline. Events due at the same instant fire in scheduling order.
    pub fn pop_due(&mut self, until: Duration) -> Option<E> {
        let (due, id) = *self.queue.keys().next()?;
        if due > until {
            return None;
        }
        self.deadlines.remove(&id);
        self.elapsed = self.elapsed.max(due);
        self.queue.remove(&(due, id))
    }

    /// Moves the clock forward; never backwards.
    pub fn advance_clock(&mut self, to: Duration) {
        self.elapsed = self.elapsed.max(to);
    }

    pub fn pending(&self) -> impl Iterator<Item = &E> {
        self.queue.values()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_then_insertion_order() {
        let mut s = Scheduler::new(Utc::now());
        s.schedule(Duration::from_secs(5), "late");
        s.schedule(Duration::from_secs(1), "first");
        s.schedule(Duration::from_secs(1), "second");

        assert_eq!(s.pop_due(Duration::from_secs(10)), Some("first"));
        assert_eq!(s.pop_due(Duration::from_secs(10)), Some("second"));
        assert_eq!(s.elapsed(), Duration::from_secs(1));
        assert_eq!(s.pop_due(Duration::from_secs(4)), None);
        assert_eq!(s.pop_due(Duration::from_secs(5)), Some("late"));
        assert!(s.is_empty());
    }

    #[test]
    fn canceled_events_never_fire() {
        let mut s = Scheduler::new(Utc::now());
        let h = s.schedule(Duration::from_secs(1), 1);
        assert!(s.is_pending(h));
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(!s.is_pending(h));
        assert_eq!(s.pop_due(Duration::from_secs(2)), None);
    }

    #[test]
    fn wall_clock_follows_virtual_time() {
        let epoch = Utc::now();
        let mut s: Scheduler<()> = Scheduler::new(epoch);
        s.advance_clock(Duration::from_secs(30));
        assert_eq!(s.now(), epoch + chrono::Duration::seconds(30));
        assert_eq!(s.until(epoch + chrono::Duration::seconds(40)), Duration::from_secs(10));
        assert_eq!(s.until(epoch), Duration::ZERO);
    }
}
