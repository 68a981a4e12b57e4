use crate::config::DEFAULT_MAX_ENTRIES;
use crate::path_utils::display_label;
use crate::types::{DocumentHandle, RecencyEntry};
use std::collections::VecDeque;

/// Wall clock in unix seconds.
pub type Clock = fn() -> i64;

pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Most-recently-used list of document identities.
///
/// The head is always the most recently activated document. Touching an entry
/// removes it wherever it is and pushes a fresh copy to the front, so the list
/// stays ordered by `last_used` without ever being sorted. Lookups are linear
/// scans which is fine for the small capacities this is used with.
#[derive(Debug, Clone)]
pub struct RecencyTracker {
    entries: VecDeque<RecencyEntry>,
    max_entries: usize,
    clock: Clock,
}

impl Default for RecencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl RecencyTracker {
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, unix_now)
    }

    pub fn with_clock(max_entries: usize, clock: Clock) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: VecDeque::with_capacity(max_entries + 1),
            max_entries,
            clock,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head(&self) -> Option<&RecencyEntry> {
        self.entries.front()
    }

    pub fn get(&self, identity: &str) -> Option<&RecencyEntry> {
        self.entries.iter().find(|entry| entry.identity == identity)
    }

    /// Records an activation of `identity`. Empty identities are ignored, the
    /// caller is responsible for filtering documents the host marks as not
    /// trackable.
    ///
    /// `raw_name` is the name the host shows for the document; the label is
    /// derived from it when present, otherwise from the identity.
    pub fn record_access(
        &mut self,
        identity: &str,
        raw_name: &str,
        live_handle: Option<DocumentHandle>,
    ) {
        if identity.is_empty() {
            return;
        }

        if let Some(head) = self.entries.front_mut()
            && head.identity == identity
        {
            // repeated activation of the head must not churn the list
            if head.live_handle.is_none() {
                head.live_handle = live_handle;
            }
            return;
        }

        if let Some(position) = self.entries.iter().position(|e| e.identity == identity) {
            self.entries.remove(position);
        }

        // the new head may never be older than the previous one, even when
        // the wall clock jumps backwards
        let now = (self.clock)();
        let last_used = self
            .entries
            .front()
            .map_or(now, |head| now.max(head.last_used));

        let label_source = if raw_name.is_empty() {
            identity
        } else {
            raw_name
        };

        self.entries.push_front(RecencyEntry {
            identity: identity.to_string(),
            display_label: display_label(label_source),
            last_used,
            live_handle,
        });

        while self.entries.len() > self.max_entries {
            if let Some(evicted) = self.entries.pop_back() {
                tracing::debug!(identity = ?evicted.identity, "Evicted oldest recency entry");
            }
        }
    }

    /// Ordered copy of the list, most recent first.
    pub fn snapshot(&self) -> Vec<RecencyEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecencyEntry> {
        self.entries.iter()
    }

    /// Replaces the whole list with persisted records. Records are trusted to
    /// be unique already, live handles are dropped and anything past the
    /// capacity is cut off.
    pub fn restore(&mut self, records: Vec<RecencyEntry>) {
        self.entries = records
            .into_iter()
            .take(self.max_entries)
            .map(|record| RecencyEntry {
                live_handle: None,
                ..record
            })
            .collect();
    }

    /// Marks the entry for `identity` as backed by an open document without
    /// changing its position. Returns false when the identity is not tracked.
    pub fn attach_live_handle(&mut self, identity: &str, handle: DocumentHandle) -> bool {
        match self.entries.iter_mut().find(|e| e.identity == identity) {
            Some(entry) => {
                entry.live_handle = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Clears the live handle of whichever entry holds `handle`.
    pub fn forget_live_handle(&mut self, handle: DocumentHandle) -> bool {
        let mut forgotten = false;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.live_handle == Some(handle))
        {
            entry.live_handle = None;
            forgotten = true;
        }
        forgotten
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
