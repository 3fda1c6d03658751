//! # Aggregate Store
//!
//! Holds the current [`Snapshot`] behind an `RwLock<Arc<Snapshot>>`.
//!
//! - `read()` takes the read lock only long enough to clone the `Arc`. The
//!   caller then owns a reference to a complete snapshot and never holds the
//!   lock while querying it.
//! - `swap()` builds nothing under the lock. The new snapshot is fully formed
//!   before the write lock is taken, and the critical section is a single
//!   pointer replacement.
//!
//! Old snapshots stay alive for as long as some reader still holds them.
//!
//! Every swap also announces the new generation on a `tokio::sync::watch`
//! channel, so consumers can react to fresh data instead of polling.

use super::bugmap::BugMap;
use super::record::Bug;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

/// # Snapshot
///
/// One reconciliation result: the raw fetch and its classification. Both
/// halves always come from the same fetch.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    reconciled_at: DateTime<Utc>,
    bugs: Vec<Arc<Bug>>,
    bug_map: BugMap,
}

impl Snapshot {
    /// Pairs a fetch with its classification, stamped with the current time.
    pub fn new(generation: u64, bugs: Vec<Arc<Bug>>, bug_map: BugMap) -> Self {
        Self {
            generation,
            reconciled_at: Utc::now(),
            bugs,
            bug_map,
        }
    }

    /// Reconciliation cycle that produced this snapshot. Starts at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the snapshot was built.
    pub fn reconciled_at(&self) -> DateTime<Utc> {
        self.reconciled_at
    }

    /// The raw fetch, in tracker order.
    pub fn bugs(&self) -> &[Arc<Bug>] {
        &self.bugs
    }

    /// The per-team classification of [`Snapshot::bugs`].
    pub fn bug_map(&self) -> &BugMap {
        &self.bug_map
    }
}

/// # Aggregate Store
///
/// Shared between the reconciler (the only writer) and any number of readers.
#[derive(Debug)]
pub struct AggregateStore {
    current: RwLock<Arc<Snapshot>>,
    generations: watch::Sender<u64>,
}

impl AggregateStore {
    /// Creates the store around the first successfully reconciled snapshot.
    pub fn new(initial: Snapshot) -> Self {
        let (generations, _) = watch::channel(initial.generation());
        Self {
            current: RwLock::new(Arc::new(initial)),
            generations,
        }
    }

    /// Returns the current snapshot.
    pub fn read(&self) -> Arc<Snapshot> {
        // The guarded value is a plain pointer, so a poisoned lock still holds
        // a complete snapshot.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Installs `next` as the current snapshot and returns the one it replaced.
    pub fn swap(&self, next: Snapshot) -> Arc<Snapshot> {
        let generation = next.generation();
        let next = Arc::new(next);
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, next)
        };
        // Announced after the write lock is released, so a woken subscriber
        // always reads at least this generation.
        self.generations.send_replace(generation);
        previous
    }

    /// Watches the generation of the current snapshot.
    ///
    /// The receiver starts with the current generation marked as seen;
    /// `changed()` resolves on the next swap.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generations.subscribe()
    }

    /// Generation of the current snapshot.
    pub fn generation(&self) -> u64 {
        self.read().generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// A snapshot whose every bug id and team entry encodes `generation`, so a
    /// torn read would show up as mismatched ids.
    fn stamped(generation: u64, size: u64) -> Snapshot {
        let bugs: Vec<Arc<Bug>> = (0..size)
            .map(|i| {
                Arc::new(Bug {
                    id: generation * 1_000 + i,
                    ..Default::default()
                })
            })
            .collect();
        let mut map = BugMap::with_teams([format!("team-{}", generation)]);
        for bug in &bugs {
            map.push(&format!("team-{}", generation), Arc::clone(bug));
        }
        Snapshot::new(generation, bugs, map)
    }

    #[test]
    fn test_read_returns_installed_snapshot() {
        let store = AggregateStore::new(stamped(1, 3));
        assert_eq!(store.generation(), 1);

        let previous = store.swap(stamped(2, 5));
        assert_eq!(previous.generation(), 1);
        assert_eq!(store.read().generation(), 2);
        assert_eq!(store.read().bugs().len(), 5);
    }

    #[test]
    fn test_readers_keep_their_snapshot_across_swap() {
        let store = AggregateStore::new(stamped(1, 2));
        let held = store.read();

        store.swap(stamped(2, 4));

        assert_eq!(held.generation(), 1);
        assert_eq!(held.bugs().len(), 2);
        assert_eq!(held.bug_map().count_all("team-1"), 2);
        assert_eq!(store.read().generation(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_are_woken_by_swaps() {
        let store = AggregateStore::new(stamped(1, 1));
        let mut generations = store.subscribe();
        assert_eq!(*generations.borrow(), 1);
        assert!(!generations.has_changed().unwrap());

        store.swap(stamped(2, 1));
        generations.changed().await.unwrap();
        assert_eq!(*generations.borrow_and_update(), 2);
        assert_eq!(store.read().generation(), 2);
    }

    #[test]
    fn test_concurrent_reads_never_see_torn_snapshots() {
        let store = Arc::new(AggregateStore::new(stamped(1, 16)));

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for generation in 2..=200 {
                    store.swap(stamped(generation, 16 + generation % 7));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..2_000 {
                        let snap = store.read();
                        let generation = snap.generation();
                        assert!(generation >= last, "generation went backwards");
                        last = generation;

                        let team = format!("team-{}", generation);
                        assert_eq!(snap.bug_map().len(), 1);
                        assert_eq!(snap.bug_map().count_all(&team), snap.bugs().len());
                        for bug in snap.bugs() {
                            assert_eq!(bug.id / 1_000, generation);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.generation(), 200);
    }
}
