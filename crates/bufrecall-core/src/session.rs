//! Owned state of one editor session.
//!
//! `RecallSession` bundles the recency tracker with its backing store and has
//! an explicit lifecycle: [`RecallSession::initialize`] at startup,
//! [`RecallSession::record_access`] on every activation and
//! [`RecallSession::flush_to_store`] once at teardown. Storage faults never
//! escape this type, they are logged and degrade to an empty or unsaved
//! history.

use crate::config::RecallConfig;
use crate::error::Result;
use crate::path_utils::identity_exists;
use crate::recency::{Clock, RecencyTracker, unix_now};
use crate::recency_store::RecencyStore;
use crate::store_healthcheck::{StoreHealth, StoreHealthChecker};
use crate::types::{DocumentHandle, RecencyEntry, RecentListing};

/// Host side answers needed to annotate the recent list.
pub trait HostProbe {
    /// Is the entry currently backed by an open document.
    fn is_live(&self, entry: &RecencyEntry) -> bool;
    /// Does a resource still exist at `identity`.
    fn exists(&self, identity: &str) -> bool;
}

/// Probe that trusts the tracked live handles and checks the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl HostProbe for FsProbe {
    fn is_live(&self, entry: &RecencyEntry) -> bool {
        entry.live_handle.is_some()
    }

    fn exists(&self, identity: &str) -> bool {
        identity_exists(identity)
    }
}

/// A document the host reports as loaded at startup.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub handle: DocumentHandle,
    pub identity: String,
    pub raw_name: String,
    /// False for unlisted or special documents that must not be tracked.
    pub trackable: bool,
}

#[derive(Debug, Clone)]
pub struct SessionHealth {
    pub tracked_entries: usize,
    pub max_entries: usize,
    pub store: StoreHealth,
}

#[derive(Debug)]
pub struct RecallSession {
    config: RecallConfig,
    tracker: RecencyTracker,
    store: RecencyStore,
}

impl RecallSession {
    /// Validates the config and creates an empty session. Nothing is read
    /// from disk until [`RecallSession::initialize`].
    pub fn new(config: RecallConfig) -> Result<Self> {
        Self::with_clock(config, unix_now)
    }

    pub fn with_clock(config: RecallConfig, clock: Clock) -> Result<Self> {
        config.validate()?;
        let store = RecencyStore::new(config.store_path());
        let tracker = RecencyTracker::with_clock(config.max_entries, clock);

        Ok(Self {
            config,
            tracker,
            store,
        })
    }

    pub fn config(&self) -> &RecallConfig {
        &self.config
    }

    pub fn tracker(&self) -> &RecencyTracker {
        &self.tracker
    }

    pub fn store(&self) -> &RecencyStore {
        &self.store
    }

    /// Loads the persisted history and merges the currently loaded documents
    /// into it: known identities get their live handle back, unknown ones are
    /// recorded as fresh accesses.
    pub fn initialize(&mut self, loaded: &[LoadedDocument]) {
        let records = match self.store.load() {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load recency history, starting empty");
                Vec::new()
            }
        };
        let restored = records.len();
        self.tracker.restore(records);

        for document in loaded.iter().filter(|d| d.trackable) {
            if document.identity.is_empty() {
                continue;
            }
            if !self
                .tracker
                .attach_live_handle(&document.identity, document.handle)
            {
                self.tracker.record_access(
                    &document.identity,
                    &document.raw_name,
                    Some(document.handle),
                );
            }
        }

        tracing::info!(
            restored,
            loaded = loaded.len(),
            tracked = self.tracker.len(),
            path = %self.store.path().display(),
            "Recall session initialized"
        );
    }

    /// Activation hook. Untrackable documents and empty identities are
    /// ignored.
    pub fn record_access(
        &mut self,
        identity: &str,
        raw_name: &str,
        handle: Option<DocumentHandle>,
        trackable: bool,
    ) {
        if !trackable || identity.is_empty() {
            return;
        }

        self.tracker.record_access(identity, raw_name, handle);
    }

    /// The host unloaded the document behind `handle`.
    pub fn forget_document(&mut self, handle: DocumentHandle) {
        if self.tracker.forget_live_handle(handle) {
            tracing::debug!(handle, "Dropped live handle");
        }
    }

    /// Writes the tracker to the store. Returns whether the write succeeded;
    /// a failure leaves the in-memory list untouched and is not retried.
    pub fn flush_to_store(&self) -> bool {
        match self.store.save(&self.tracker.snapshot()) {
            Ok(()) => {
                tracing::info!(
                    count = self.tracker.len(),
                    path = %self.store.path().display(),
                    "Flushed recency history"
                );
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "History not saved this session");
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.tracker.clear();
    }

    /// Recent entries with liveness and, for entries that are not live,
    /// whether the resource still exists.
    pub fn list_recent(&self, probe: &impl HostProbe) -> Vec<RecentListing> {
        self.tracker
            .iter()
            .map(|entry| {
                let is_live = probe.is_live(entry);
                let exists = if is_live {
                    None
                } else {
                    Some(probe.exists(&entry.identity))
                };

                RecentListing {
                    entry: entry.clone(),
                    is_live,
                    exists,
                }
            })
            .collect()
    }

    pub fn health(&self) -> Result<SessionHealth> {
        Ok(SessionHealth {
            tracked_entries: self.tracker.len(),
            max_entries: self.tracker.max_entries(),
            store: self.store.get_health()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tempfile::TempDir;

    static TICK: AtomicI64 = AtomicI64::new(1_000);

    fn ticking_clock() -> i64 {
        TICK.fetch_add(1, Ordering::Relaxed)
    }

    fn config_in(dir: &TempDir, max_entries: usize) -> RecallConfig {
        RecallConfig {
            max_entries,
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    fn loaded(handle: DocumentHandle, identity: &str, trackable: bool) -> LoadedDocument {
        LoadedDocument {
            handle,
            identity: identity.to_string(),
            raw_name: identity.to_string(),
            trackable,
        }
    }

    struct StubProbe;

    impl HostProbe for StubProbe {
        fn is_live(&self, entry: &RecencyEntry) -> bool {
            entry.identity.ends_with("live.rs")
        }

        fn exists(&self, identity: &str) -> bool {
            !identity.contains("gone")
        }
    }

    #[test]
    fn history_survives_restart() {
        let tmp = TempDir::new().unwrap();

        let mut first = RecallSession::with_clock(config_in(&tmp, 10), ticking_clock).unwrap();
        first.initialize(&[]);
        first.record_access("/p/a.rs", "", Some(1), true);
        first.record_access("/p/b.rs", "", Some(2), true);
        assert!(first.flush_to_store());

        let mut second = RecallSession::with_clock(config_in(&tmp, 10), ticking_clock).unwrap();
        second.initialize(&[loaded(7, "/p/a.rs", true)]);

        let entries = second.tracker().snapshot();
        let identities: Vec<&str> = entries.iter().map(|e| e.identity.as_str()).collect();
        assert_eq!(identities, vec!["/p/b.rs", "/p/a.rs"]);
        assert_eq!(entries[0].live_handle, None);
        assert_eq!(entries[1].live_handle, Some(7));
    }

    #[test]
    fn unknown_loaded_documents_are_seeded() {
        let tmp = TempDir::new().unwrap();
        let mut session = RecallSession::with_clock(config_in(&tmp, 10), ticking_clock).unwrap();
        session.initialize(&[
            loaded(1, "/p/x.rs", true),
            loaded(2, "/p/help.txt", false),
            loaded(3, "", true),
        ]);

        let entries = session.tracker().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identity, "/p/x.rs");
        assert_eq!(entries[0].live_handle, Some(1));
    }

    #[test]
    fn untrackable_access_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let mut session = RecallSession::with_clock(config_in(&tmp, 10), ticking_clock).unwrap();
        session.record_access("/p/quickfix", "", Some(4), false);
        session.record_access("", "", Some(5), true);
        assert!(session.tracker().is_empty());
    }

    #[test]
    fn corrupted_store_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, 10);
        std::fs::write(config.store_path(), "{not json").unwrap();

        let mut session = RecallSession::with_clock(config, ticking_clock).unwrap();
        session.initialize(&[]);
        assert!(session.tracker().is_empty());
    }

    #[test]
    fn failed_flush_keeps_memory_state() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        // the data dir is a regular file so the store directory cannot be created
        let config = RecallConfig {
            data_dir: Some(blocker),
            ..Default::default()
        };
        let mut session = RecallSession::with_clock(config, ticking_clock).unwrap();
        session.record_access("/p/a.rs", "", None, true);

        assert!(!session.flush_to_store());
        assert_eq!(session.tracker().len(), 1);
    }

    #[test]
    fn listing_probes_existence_only_when_not_live() {
        let tmp = TempDir::new().unwrap();
        let mut session = RecallSession::with_clock(config_in(&tmp, 10), ticking_clock).unwrap();
        session.record_access("/p/gone.rs", "", None, true);
        session.record_access("/p/here.rs", "", None, true);
        session.record_access("/p/live.rs", "", Some(1), true);

        let listing = session.list_recent(&StubProbe);
        let flags: Vec<(&str, bool, Option<bool>)> = listing
            .iter()
            .map(|l| (l.entry.identity.as_str(), l.is_live, l.exists))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("/p/live.rs", true, None),
                ("/p/here.rs", false, Some(true)),
                ("/p/gone.rs", false, Some(false)),
            ]
        );
    }

    #[test]
    fn forget_document_clears_handle() {
        let tmp = TempDir::new().unwrap();
        let mut session = RecallSession::with_clock(config_in(&tmp, 10), ticking_clock).unwrap();
        session.record_access("/p/a.rs", "", Some(3), true);
        session.forget_document(3);

        let listing = session.list_recent(&FsProbe);
        assert!(!listing[0].is_live);
    }

    #[test]
    fn health_reports_store_state() {
        let tmp = TempDir::new().unwrap();
        let mut session = RecallSession::with_clock(config_in(&tmp, 5), ticking_clock).unwrap();
        session.record_access("/p/a.rs", "", None, true);

        let before = session.health().unwrap();
        assert!(!before.store.exists);
        assert_eq!(before.tracked_entries, 1);
        assert_eq!(before.max_entries, 5);

        session.flush_to_store();
        let after = session.health().unwrap();
        assert!(after.store.exists);
        assert_eq!(after.store.entry_count, 1);
        assert!(after.store.disk_size > 0);
    }
}
