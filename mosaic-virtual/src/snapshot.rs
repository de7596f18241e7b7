//! Scroll snapshots and their session storage.
//!
//! A [`ScrollSnapshot`] captures what is needed to bring a feed back to the
//! same place after it was hidden: the scroll offset and every measured size.
//! Applying one replaces the measurement store wholesale and jumps to the
//! offset before anything is drawn, so the restored items land where they were.
//!
//! Snapshots are versioned JSON. Anything that fails to decode, from a newer
//! format or otherwise, is dropped and the controller starts over at offset 0.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    controller::ViewportController, error::SnapshotError, measurement::MeasurementCache, px::Px,
};

/// Format version written by [`ScrollSnapshot::encode`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Key used by [`SessionPersistence::new`].
pub const DEFAULT_SNAPSHOT_KEY: &str = "scroll-settings";

/// Scroll offset plus measurement cache of one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollSnapshot {
    /// Format version.
    pub version: u32,
    /// Scroll offset at capture time.
    pub offset: Px,
    /// Measured sizes at capture time.
    pub measurements: MeasurementCache,
}

impl ScrollSnapshot {
    /// Captures the current state of `controller`.
    pub fn capture(controller: &ViewportController) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            offset: controller.scroll_offset(),
            measurements: controller.measurements().cache(),
        }
    }

    /// Encodes into an opaque blob.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a blob produced by [`Self::encode`].
    pub fn decode(blob: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(blob)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

/// What [`apply`] or [`resume`] did with a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The snapshot was applied.
    Restored {
        /// Offset the controller jumped to.
        offset: Px,
    },
    /// No snapshot was stored.
    Missing,
    /// The snapshot could not be used.
    Discarded,
}

/// Captures `controller` into an opaque blob.
pub fn snapshot(controller: &ViewportController) -> Result<Vec<u8>, SnapshotError> {
    ScrollSnapshot::capture(controller).encode()
}

/// Restores `controller` from a blob produced by [`snapshot`].
///
/// On success the measurement store is replaced, the offset is applied and
/// positions are recomputed before this returns. A missing or unusable blob
/// resets the controller to its uninitialized state at offset 0.
pub fn apply(blob: Option<&[u8]>, controller: &mut ViewportController) -> RestoreOutcome {
    let outcome = resume(blob, controller);
    if !matches!(outcome, RestoreOutcome::Restored { .. }) {
        controller.reset();
    }
    outcome
}

/// Like [`apply`], but a missing or unusable blob leaves `controller` as it is.
///
/// Used when the controller still holds live state of its own, e.g. a feed
/// that was only hidden.
pub fn resume(blob: Option<&[u8]>, controller: &mut ViewportController) -> RestoreOutcome {
    let Some(blob) = blob else {
        return RestoreOutcome::Missing;
    };
    match restore(blob, controller) {
        Ok(offset) => RestoreOutcome::Restored { offset },
        Err(err) => {
            debug!("discarding scroll snapshot: {err}");
            RestoreOutcome::Discarded
        }
    }
}

fn restore(blob: &[u8], controller: &mut ViewportController) -> Result<Px, SnapshotError> {
    let snapshot = ScrollSnapshot::decode(blob)?;
    let offset = snapshot.offset.max(Px::ZERO);
    controller.restore_from(&snapshot.measurements, offset)?;
    debug!(
        %offset,
        measured = snapshot.measurements.entries.len(),
        "scroll snapshot restored"
    );
    Ok(offset)
}

/// Key-value storage scoped to one session.
pub trait SessionStore {
    /// Blob stored under `key`.
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    /// Stores `blob` under `key`, replacing any previous value.
    fn set(&self, key: &str, blob: Vec<u8>);
    /// Deletes `key`.
    fn remove(&self, key: &str);
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, blob: Vec<u8>) {
        (**self).set(key, blob)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

/// In-process [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, blob: Vec<u8>) {
        self.entries.lock().insert(key.to_owned(), blob);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// Saves and restores one feed's snapshot under a fixed key.
#[derive(Debug)]
pub struct SessionPersistence<S> {
    store: S,
    key: String,
}

impl<S: SessionStore> SessionPersistence<S> {
    /// Uses [`DEFAULT_SNAPSHOT_KEY`].
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_SNAPSHOT_KEY)
    }

    /// Uses a custom key, e.g. one per feed.
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Writes a snapshot of `controller`.
    pub fn save(&self, controller: &ViewportController) -> Result<(), SnapshotError> {
        let blob = snapshot(controller)?;
        debug!(key = %self.key, bytes = blob.len(), "scroll snapshot saved");
        self.store.set(&self.key, blob);
        Ok(())
    }

    /// Applies the stored snapshot to `controller`. See [`apply`].
    pub fn restore(&self, controller: &mut ViewportController) -> RestoreOutcome {
        let blob = self.store.get(&self.key);
        apply(blob.as_deref(), controller)
    }

    /// Applies the stored snapshot to `controller` if it is usable. See [`resume`].
    pub fn resume(&self, controller: &mut ViewportController) -> RestoreOutcome {
        let blob = self.store.get(&self.key);
        resume(blob.as_deref(), controller)
    }

    /// Deletes the stored snapshot.
    pub fn clear(&self) {
        self.store.remove(&self.key);
    }
}
