// src/staging/store.rs

use crate::circle::models::PendingTransfer;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// A registry entry: the transfer plus what is fixed at staging time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTransfer {
    pub transfer: PendingTransfer,
    /// Sent with every execution attempt so upstream can deduplicate retries.
    pub idempotency_key: Uuid,
    pub staged_at: DateTime<Utc>,
}

/// Registry of transfers waiting for confirmation, keyed by an opaque code.
pub trait PendingStore: Send + Sync {
    /// Stores the transfer under a freshly generated code and returns the code.
    fn put(&self, transfer: PendingTransfer) -> String;

    /// Atomically removes and returns the entry for `code`.
    fn take(&self, code: &str) -> Option<StagedTransfer>;

    /// Puts a previously taken entry back under its original code.
    fn restore(&self, code: String, staged: StagedTransfer);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Process-local store. Nothing survives a restart and entries never expire.
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    entries: DashMap<String, StagedTransfer>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingStore for InMemoryPendingStore {
    fn put(&self, transfer: PendingTransfer) -> String {
        let staged = StagedTransfer {
            transfer,
            idempotency_key: Uuid::new_v4(),
            staged_at: Utc::now(),
        };
        loop {
            let code = Uuid::new_v4().to_string();
            // Never overwrite a live entry, however unlikely the collision.
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.entries.entry(code.clone()) {
                slot.insert(staged);
                return code;
            }
        }
    }

    fn take(&self, code: &str) -> Option<StagedTransfer> {
        self.entries.remove(code).map(|(_, staged)| staged)
    }

    fn restore(&self, code: String, staged: StagedTransfer) {
        self.entries.insert(code, staged);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
