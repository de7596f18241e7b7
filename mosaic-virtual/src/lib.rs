//! Virtualization engine for masonry feeds.
//!
//! Items of unknown, variable height are distributed across a fixed number of
//! lanes, and only the ones near the viewport are materialized. Sizes start
//! out as an estimate and are corrected as rendered items report their real
//! size; positions are recomputed incrementally from the first index that
//! changed.
//!
//! # Example
//!
//! ```
//! use mosaic_virtual::{ViewportController, ViewportEvent, VirtualizerConfig, px::Px};
//!
//! # fn main() -> Result<(), mosaic_virtual::ConfigurationError> {
//! let mut controller = ViewportController::new(VirtualizerConfig::default())?;
//! controller.dispatch(ViewportEvent::ItemCountChanged(1000))?;
//! controller.dispatch(ViewportEvent::Resized(Px(800)))?;
//!
//! let range = controller.range();
//! assert_eq!(range.visible, 0..6);
//! assert_eq!(range.materialized, 0..31);
//!
//! for entry in controller.virtual_items() {
//!     // Render item `entry.index` in lane `entry.lane` at `entry.start`,
//!     // then report its rendered height back.
//!     let _ = controller.report_measurement(entry.index, Px(240));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A [`FeedSession`] adds paged loading, list/detail navigation and scroll
//! restoration on top of the controller.
#![deny(missing_docs, clippy::unwrap_used)]

pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod layout;
pub mod measurement;
pub mod navigation;
pub mod observer;
pub mod px;
pub mod range;
pub mod session;
pub mod snapshot;

pub use config::VirtualizerConfig;
pub use controller::{ViewportController, ViewportEvent, ViewportPhase};
pub use error::{ConfigurationError, FeedError, MeasurementError, SnapshotError};
pub use feed::{FeedLoader, FeedStatus, FetchOutcome, FetchTicket, Page, PageSource};
pub use layout::{LayoutEngine, PositionEntry};
pub use measurement::{Measurement, MeasurementCache, MeasurementStore};
pub use navigation::{Navigator, Route};
pub use observer::{ElementSizeObserver, HeadlessObserver, SizeEvent};
pub use range::{VirtualRange, select_range};
pub use session::FeedSession;
pub use snapshot::{
    MemorySessionStore, RestoreOutcome, ScrollSnapshot, SessionPersistence, SessionStore, apply,
    resume, snapshot,
};
