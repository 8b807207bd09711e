//! Trigger queue with coalescing
//!
//! At most one trigger is pending. A trigger pushed while another is still
//! pending is merged into it, so a burst of change notifications becomes a
//! single cycle and nothing is lost.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::core::model::{ChangeEvent, ChangeKind};

/// What starts a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Full scan of the content set
    Initial,
    /// Files changed on disk
    Changes(Vec<ChangeEvent>),
    /// The content patterns themselves changed; implies a full scan
    PatternsChanged(Vec<String>),
}

impl Trigger {
    /// Merge `next` into `self`.
    ///
    /// Pattern changes win over everything (latest patterns kept), a full
    /// scan wins over change lists, and change lists are unioned by path
    /// with the latest kind for each path.
    pub fn coalesce(self, next: Trigger) -> Trigger {
        match (self, next) {
            (_, Trigger::PatternsChanged(patterns)) => Trigger::PatternsChanged(patterns),
            (Trigger::PatternsChanged(patterns), _) => Trigger::PatternsChanged(patterns),
            (Trigger::Initial, _) | (_, Trigger::Initial) => Trigger::Initial,
            (Trigger::Changes(earlier), Trigger::Changes(later)) => {
                let mut merged: BTreeMap<PathBuf, ChangeKind> = BTreeMap::new();
                for event in earlier.into_iter().chain(later) {
                    merged.insert(event.path, event.kind);
                }
                Trigger::Changes(
                    merged
                        .into_iter()
                        .map(|(path, kind)| ChangeEvent::new(path, kind))
                        .collect(),
                )
            }
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Option<Trigger>,
    closed: bool,
    coalesced: usize,
}

/// Single-slot blocking queue shared between notifiers and the orchestrator
#[derive(Debug, Default)]
pub struct TriggerQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `trigger`, merging with any pending one. Ignored once closed.
    pub fn push(&self, trigger: Trigger) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.closed {
            return;
        }
        state.pending = Some(match state.pending.take() {
            Some(pending) => {
                state.coalesced += 1;
                pending.coalesce(trigger)
            }
            None => trigger,
        });
        self.ready.notify_one();
    }

    /// Block until a trigger is available. `None` once closed and drained.
    pub fn next(&self) -> Option<Trigger> {
        let mut state = self.state.lock().ok()?;
        loop {
            if let Some(trigger) = state.pending.take() {
                return Some(trigger);
            }
            if state.closed {
                return None;
            }
            state = self.ready.wait(state).ok()?;
        }
    }

    /// Like [`next`](Self::next) but gives up after `timeout`
    pub fn next_timeout(&self, timeout: Duration) -> Option<Trigger> {
        let state = self.state.lock().ok()?;
        let (mut state, _) = self
            .ready
            .wait_timeout_while(state, timeout, |s| s.pending.is_none() && !s.closed)
            .ok()?;
        state.pending.take()
    }

    /// Stop accepting triggers and wake the consumer
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
        }
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// Number of triggers merged into a pending one so far
    pub fn coalesced(&self) -> usize {
        self.state.lock().map(|s| s.coalesced).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn changed(path: &str, kind: ChangeKind) -> Trigger {
        Trigger::Changes(vec![ChangeEvent::new(path, kind)])
    }

    #[test]
    fn test_changes_are_unioned() {
        let merged = changed("a.rs", ChangeKind::Modified)
            .coalesce(changed("b.rs", ChangeKind::Created))
            .coalesce(changed("a.rs", ChangeKind::Removed));
        assert_eq!(
            merged,
            Trigger::Changes(vec![
                ChangeEvent::new("a.rs", ChangeKind::Removed),
                ChangeEvent::new("b.rs", ChangeKind::Created),
            ])
        );
    }

    #[test]
    fn test_full_scan_dominates() {
        assert_eq!(
            changed("a.rs", ChangeKind::Modified).coalesce(Trigger::Initial),
            Trigger::Initial
        );
        assert_eq!(
            Trigger::Initial.coalesce(changed("a.rs", ChangeKind::Modified)),
            Trigger::Initial
        );
        let patterns = vec!["src/**/*.html".to_string()];
        assert_eq!(
            Trigger::PatternsChanged(patterns.clone()).coalesce(Trigger::Initial),
            Trigger::PatternsChanged(patterns)
        );
    }

    #[test]
    fn test_push_coalesces_pending() {
        let queue = TriggerQueue::new();
        queue.push(changed("a.rs", ChangeKind::Modified));
        queue.push(changed("b.rs", ChangeKind::Modified));
        assert_eq!(queue.coalesced(), 1);

        match queue.next_timeout(Duration::from_millis(10)) {
            Some(Trigger::Changes(events)) => assert_eq!(events.len(), 2),
            other => panic!("unexpected trigger: {:?}", other),
        }
        assert!(queue.next_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_close_wakes_consumer() {
        let queue = Arc::new(TriggerQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.next())
        };
        queue.close();
        assert!(consumer.join().unwrap().is_none());

        queue.push(Trigger::Initial);
        assert!(queue.next().is_none());
        assert!(queue.is_closed());
    }

    #[test]
    fn test_pending_trigger_survives_close() {
        let queue = TriggerQueue::new();
        queue.push(Trigger::Initial);
        queue.close();
        assert_eq!(queue.next(), Some(Trigger::Initial));
        assert_eq!(queue.next(), None);
    }
}
