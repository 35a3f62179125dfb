use std::collections::VecDeque;

use mcm_trace::TraceEntry;

/// Pending session entries in replay order. Entries are sorted by time
/// once on construction; entries sharing a timestamp keep their order.
#[derive(Debug, Clone)]
pub struct TraceQueue {
    pending: VecDeque<TraceEntry>,
    replayed: usize,
}

impl TraceQueue {
    pub fn new<E>(entries: E) -> Self
    where
        E: IntoIterator<Item = TraceEntry>,
    {
        let mut entries: Vec<TraceEntry> = entries.into_iter().collect();
        entries.sort_by_key(|entry| entry.time_ms);
        TraceQueue {
            pending: entries.into(),
            replayed: 0,
        }
    }

    pub fn next(&mut self) -> Option<TraceEntry> {
        let entry = self.pending.pop_front()?;
        self.replayed += 1;
        Some(entry)
    }

    #[cfg(test)]
    pub fn peek(&self) -> Option<&TraceEntry> {
        self.pending.front()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn replayed(&self) -> usize {
        self.replayed
    }
}

#[cfg(test)]
mod tests {
    use mcm_trace::TraceEvent;

    use super::TraceQueue;
    use mcm_trace::TraceEntry;

    fn entry(time_ms: u64, event: TraceEvent) -> TraceEntry {
        TraceEntry { time_ms, event }
    }

    #[test]
    fn queue_orders_by_time_and_keeps_ties_stable() {
        let mut queue = TraceQueue::new(vec![
            entry(32, TraceEvent::Tick),
            entry(0, TraceEvent::MenuOpened),
            entry(32, TraceEvent::MenuClosed),
        ]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek().map(|e| e.time_ms), Some(0));

        assert_eq!(queue.next().map(|e| e.event), Some(TraceEvent::MenuOpened));
        assert_eq!(queue.next().map(|e| e.event), Some(TraceEvent::Tick));
        assert_eq!(queue.next().map(|e| e.event), Some(TraceEvent::MenuClosed));
        assert!(queue.next().is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.replayed(), 3);
    }
}
