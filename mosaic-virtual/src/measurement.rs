//! Per-item size observations.
//!
//! The [`MeasurementStore`] remembers the last size reported for every item
//! that has been materialized at least once and answers with a configured
//! estimate for everything else. It also tracks the earliest index whose
//! cached position no longer holds, which the layout engine uses to resume
//! instead of recomputing the whole feed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::{MeasurementError, SnapshotError},
    px::Px,
};

/// One observed item size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Item index.
    pub index: usize,
    /// Observed size along the scroll axis.
    pub size: Px,
}

/// Copyable form of a [`MeasurementStore`], ordered by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementCache {
    /// Measured entries in ascending index order.
    pub entries: Vec<Measurement>,
}

/// Holds the measured size of every materialized item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementStore {
    estimate: Px,
    measured: BTreeMap<usize, Px>,
    stale_from: Option<usize>,
}

impl MeasurementStore {
    /// Creates an empty store answering `estimate` for unmeasured items.
    ///
    /// The estimate is validated by [`VirtualizerConfig`](crate::VirtualizerConfig).
    pub fn new(estimate: Px) -> Self {
        Self {
            estimate,
            measured: BTreeMap::new(),
            stale_from: None,
        }
    }

    /// Size used for items without a measurement.
    pub fn estimate(&self) -> Px {
        self.estimate
    }

    /// Last observed size of `index`, or the estimate.
    pub fn get(&self, index: usize) -> Px {
        self.measured.get(&index).copied().unwrap_or(self.estimate)
    }

    /// Whether `index` has been measured.
    pub fn is_measured(&self, index: usize) -> bool {
        self.measured.contains_key(&index)
    }

    /// Number of measured items.
    pub fn measured_len(&self) -> usize {
        self.measured.len()
    }

    /// Records the observed size of `index`.
    ///
    /// Returns `Ok(true)` when the stored value changed, in which case every
    /// cached position from `index` onwards is marked stale. Reporting the
    /// value already stored is a no-op.
    pub fn set(&mut self, index: usize, size: Px) -> Result<bool, MeasurementError> {
        if !size.is_positive() {
            return Err(MeasurementError::NonPositiveSize { index, size });
        }
        let previous = self.measured.insert(index, size);
        if previous == Some(size) {
            return Ok(false);
        }
        trace!(index, %size, previous = ?previous, "measurement recorded");
        self.mark_stale(index);
        Ok(true)
    }

    /// Drops every measurement.
    pub fn clear(&mut self) {
        self.measured.clear();
        self.mark_stale(0);
    }

    /// Marks every cached position from `index` onwards as stale.
    pub fn mark_stale(&mut self, index: usize) {
        self.stale_from = Some(self.stale_from.map_or(index, |from| from.min(index)));
    }

    /// Earliest stale index, if any, without clearing it.
    pub fn stale_from(&self) -> Option<usize> {
        self.stale_from
    }

    /// Hands the earliest stale index to the caller and clears the mark.
    pub fn take_stale_from(&mut self) -> Option<usize> {
        self.stale_from.take()
    }

    /// Copies out the measured entries.
    pub fn cache(&self) -> MeasurementCache {
        MeasurementCache {
            entries: self
                .measured
                .iter()
                .map(|(&index, &size)| Measurement { index, size })
                .collect(),
        }
    }

    /// Replaces every measurement with the contents of `cache`.
    ///
    /// The cache is checked before anything is touched, so a rejected cache
    /// leaves the store as it was.
    pub fn replace(&mut self, cache: &MeasurementCache) -> Result<(), SnapshotError> {
        if let Some(bad) = cache.entries.iter().find(|entry| !entry.size.is_positive()) {
            return Err(SnapshotError::InvalidMeasurement {
                index: bad.index,
                size: bad.size,
            });
        }
        self.measured = cache
            .entries
            .iter()
            .map(|entry| (entry.index, entry.size))
            .collect();
        self.mark_stale(0);
        Ok(())
    }

    /// Serializes the measured entries into an opaque blob.
    pub fn serialize(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(&self.cache())?)
    }

    /// Replaces the store's contents with a blob produced by [`Self::serialize`].
    pub fn restore(&mut self, blob: &[u8]) -> Result<(), SnapshotError> {
        let cache: MeasurementCache = serde_json::from_slice(blob)?;
        self.replace(&cache)
    }
}
