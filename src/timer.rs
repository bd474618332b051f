use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

#[derive(Clone, Debug)]
pub struct Timer {
    pub id: TimerId,
    due_at_ms: u64,
    paused_remaining_ms: Option<u64>,
}

impl Timer {
    pub fn new(id: TimerId, now_ms: u64, delay_ms: u64) -> Self {
        Self {
            id,
            due_at_ms: now_ms.saturating_add(delay_ms),
            paused_remaining_ms: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_remaining_ms.is_some()
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.paused_remaining_ms
            .unwrap_or_else(|| self.due_at_ms.saturating_sub(now_ms))
    }

    pub fn pause(&mut self, now_ms: u64) {
        if self.is_paused() {
            return;
        }
        self.paused_remaining_ms = Some(self.due_at_ms.saturating_sub(now_ms));
    }

    pub fn resume(&mut self, now_ms: u64) {
        if let Some(remaining) = self.paused_remaining_ms.take() {
            self.due_at_ms = now_ms.saturating_add(remaining);
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        !self.is_paused() && now_ms >= self.due_at_ms
    }

    fn due_at_ms(&self) -> u64 {
        self.due_at_ms
    }
}

#[derive(Clone, Debug)]
pub struct TimerSet<A> {
    next_id: u64,
    timers: BTreeMap<TimerId, (Timer, A)>,
}

impl<A> Default for TimerSet<A> {
    fn default() -> Self {
        Self {
            next_id: 1,
            timers: BTreeMap::new(),
        }
    }
}

impl<A> TimerSet<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(id, (Timer::new(id, now_ms, delay_ms), action));
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn remaining_ms(&self, id: TimerId, now_ms: u64) -> Option<u64> {
        self.timers
            .get(&id)
            .map(|(timer, _)| timer.remaining_ms(now_ms))
    }

    pub fn is_paused(&self, id: TimerId) -> bool {
        self.timers
            .get(&id)
            .map(|(timer, _)| timer.is_paused())
            .unwrap_or(false)
    }

    pub fn pause(&mut self, id: TimerId, now_ms: u64) {
        if let Some((timer, _)) = self.timers.get_mut(&id) {
            timer.pause(now_ms);
        }
    }

    pub fn resume(&mut self, id: TimerId, now_ms: u64) {
        if let Some((timer, _)) = self.timers.get_mut(&id) {
            timer.resume(now_ms);
        }
    }

    pub fn pause_all(&mut self, now_ms: u64) -> Vec<TimerId> {
        let mut paused = Vec::new();
        for (id, (timer, _)) in self.timers.iter_mut() {
            if !timer.is_paused() {
                timer.pause(now_ms);
                paused.push(*id);
            }
        }
        paused
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, A)> {
        let id = self
            .timers
            .iter()
            .filter(|(_, (timer, _))| timer.is_due(now_ms))
            .min_by_key(|(id, (timer, _))| (timer.due_at_ms(), **id))
            .map(|(id, _)| *id)?;
        self.timers.remove(&id).map(|(_, action)| (id, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_once_when_due() {
        let mut timers = TimerSet::new();
        let id = timers.schedule(0, 100, "a");
        assert!(timers.pop_due(99).is_none());
        assert_eq!(timers.pop_due(100), Some((id, "a")));
        assert!(timers.pop_due(200).is_none());
    }

    #[test]
    fn paused_timer_keeps_remaining_time() {
        let mut timers = TimerSet::new();
        let id = timers.schedule(0, 5_000, ());
        timers.pause(id, 2_000);
        assert_eq!(timers.remaining_ms(id, 2_000), Some(3_000));

        assert!(timers.pop_due(7_000).is_none());
        assert_eq!(timers.remaining_ms(id, 7_000), Some(3_000));

        timers.resume(id, 7_000);
        assert!(timers.pop_due(9_999).is_none());
        assert!(timers.pop_due(10_000).is_some());
    }

    #[test]
    fn cancel_is_a_no_op_for_missing_ids() {
        let mut timers = TimerSet::new();
        let id = timers.schedule(0, 10, ());
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(!timers.cancel(TimerId(999)));
        assert!(timers.is_empty());
    }

    #[test]
    fn due_timers_pop_in_due_then_creation_order() {
        let mut timers = TimerSet::new();
        timers.schedule(0, 50, "late");
        timers.schedule(0, 10, "first");
        timers.schedule(0, 10, "second");
        let order: Vec<&str> = std::iter::from_fn(|| timers.pop_due(100))
            .map(|(_, action)| action)
            .collect();
        assert_eq!(order, vec!["first", "second", "late"]);
    }

    #[test]
    fn pause_all_skips_already_paused_timers() {
        let mut timers = TimerSet::new();
        let a = timers.schedule(0, 100, ());
        let b = timers.schedule(0, 100, ());
        timers.pause(a, 10);
        let paused = timers.pause_all(20);
        assert_eq!(paused, vec![b]);
        assert!(timers.is_paused(a));
        assert!(timers.is_paused(b));
    }
}
