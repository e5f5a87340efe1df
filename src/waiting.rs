use crossbeam_queue::ArrayQueue;
use tokio::time::Instant;

/// Bounded FIFO of the instants at which waiting slots were claimed.
///
/// Slots are not tied to callers: [`WaitingSlots::pop`] always hands back the oldest claim.
#[derive(Debug)]
pub(crate) struct WaitingSlots {
    // `ArrayQueue` cannot be built with zero capacity.
    slots: Option<ArrayQueue<Instant>>,
}

impl WaitingSlots {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: (capacity > 0).then(|| ArrayQueue::new(capacity)),
        }
    }

    /// Claims a slot stamped with `now`, or returns `false` when every slot is taken.
    pub(crate) fn try_claim(&self, now: Instant) -> bool {
        self.slots
            .as_ref()
            .is_some_and(|slots| slots.push(now).is_ok())
    }

    pub(crate) fn pop(&self) -> Option<Instant> {
        self.slots.as_ref().and_then(ArrayQueue::pop)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.as_ref().map_or(0, ArrayQueue::len)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::WaitingSlots;

    #[test]
    fn oldest_claim_is_released_first() {
        let slots = WaitingSlots::new(2);
        let first = Instant::now();
        let second = first + Duration::from_secs(1);

        assert!(slots.try_claim(first));
        assert!(slots.try_claim(second));
        assert!(!slots.try_claim(second));
        assert_eq!(slots.len(), 2);

        assert_eq!(slots.pop(), Some(first));
        assert_eq!(slots.pop(), Some(second));
        assert_eq!(slots.pop(), None);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let slots = WaitingSlots::new(0);
        assert!(!slots.try_claim(Instant::now()));
        assert_eq!(slots.len(), 0);
        assert_eq!(slots.pop(), None);
    }
}
