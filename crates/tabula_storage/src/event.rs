//! Storage change log for incremental consumers.
//!
//! The world appends an event whenever something happens that can change
//! which tables a cached query matches. Each subscriber reads from its own
//! cursor; entries every live subscriber has read are dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tabula_foundation::EntityId;

use crate::table::TableId;

/// A change that may affect cached query matches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageEvent {
    /// A new table was created.
    TableCreated(TableId),
    /// An entity used as a prototype changed type or was destroyed.
    PrototypeChanged(EntityId),
}

/// A reader's position in the event log.
///
/// Dropping the subscription releases the entries it had not read.
#[derive(Debug)]
pub struct Subscription {
    cursor: Arc<AtomicU64>,
}

impl Subscription {
    /// Sequence number of the next event this subscriber will read.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }
}

/// Append-only log of [`StorageEvent`]s with compaction.
#[derive(Debug, Default)]
pub struct EventLog {
    /// Sequence number of `events[0]`.
    base: u64,
    events: VecDeque<StorageEvent>,
    cursors: Vec<Weak<AtomicU64>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next event will get.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.base + self.events.len() as u64
    }

    /// Starts reading from the current end of the log.
    pub fn subscribe(&mut self) -> Subscription {
        let cursor = Arc::new(AtomicU64::new(self.end()));
        self.cursors.push(Arc::downgrade(&cursor));
        Subscription { cursor }
    }

    /// Appends an event, then drops entries no live subscriber still needs.
    pub fn push(&mut self, event: StorageEvent) {
        self.cursors.retain(|cursor| cursor.strong_count() > 0);
        if self.cursors.is_empty() {
            self.base = self.end() + 1;
            self.events.clear();
            return;
        }
        self.events.push_back(event);

        let oldest = self
            .cursors
            .iter()
            .filter_map(Weak::upgrade)
            .map(|cursor| cursor.load(Ordering::Acquire))
            .min()
            .unwrap_or_else(|| self.end());
        while self.base < oldest && self.events.pop_front().is_some() {
            self.base += 1;
        }
    }

    /// Returns everything `subscription` has not read yet and advances it.
    #[must_use]
    pub fn read(&self, subscription: &Subscription) -> Vec<StorageEvent> {
        let from = subscription.position().max(self.base);
        let skip = usize::try_from(from - self.base).unwrap_or(usize::MAX);
        let unread = self.events.iter().skip(skip).copied().collect();
        subscription.cursor.store(self.end(), Ordering::Release);
        unread
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
