//! Error types shared across the virtualization engine.

use thiserror::Error;

use crate::px::Px;

/// Invalid engine configuration, reported at construction time.
///
/// Values are never clamped into range; a bad configuration is a caller bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The lane count must be at least one.
    #[error("lane count must be at least 1, got {0}")]
    InvalidLaneCount(usize),
    /// The size estimate used for unmeasured items must be positive.
    #[error("estimated item size must be positive, got {0}")]
    NonPositiveEstimate(Px),
    /// The gap between consecutive items of a lane must not be negative.
    #[error("item gap must not be negative, got {0}")]
    NegativeGap(Px),
    /// The initial scroll offset must not be negative.
    #[error("initial scroll offset must not be negative, got {0}")]
    NegativeInitialOffset(Px),
    /// The page size of a feed loader must be at least one.
    #[error("page size must be at least 1")]
    EmptyPageSize,
}

/// A rejected size observation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasurementError {
    /// Zero or negative sizes would produce empty or reversed ranges.
    #[error("non-positive size {size} reported for item {index}")]
    NonPositiveSize {
        /// Index of the reporting item.
        index: usize,
        /// The rejected size.
        size: Px,
    },
    /// The reporting index is not part of the feed.
    #[error("size reported for item {index} of a feed with {count} items")]
    OutOfRange {
        /// Index of the reporting item.
        index: usize,
        /// Item count at report time.
        count: usize,
    },
}

/// Failure to decode or encode a scroll snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The blob is not a valid snapshot document.
    #[error("malformed scroll snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The blob was written by an incompatible format version.
    #[error("unsupported scroll snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the blob.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
    /// The snapshot carries a size that could never have been measured.
    #[error("scroll snapshot holds non-positive size {size} for item {index}")]
    InvalidMeasurement {
        /// Index of the offending entry.
        index: usize,
        /// The offending size.
        size: Px,
    },
}

/// A failure reported by a page source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The backing store could not be reached or answered with an error.
    #[error("page {page} failed to load: {message}")]
    Source {
        /// Requested page index.
        page: usize,
        /// Description from the page source.
        message: String,
    },
    /// The page source answered with a page past the reported total.
    #[error("page {page} is out of range for {total} items")]
    OutOfRange {
        /// Requested page index.
        page: usize,
        /// Total item count reported by the source.
        total: usize,
    },
}
