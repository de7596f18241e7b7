//! The viewport controller.
//!
//! [`ViewportController`] owns the measurement store and the layout cache of
//! one mounted feed. Every input (scroll, resize, item count, lane count,
//! measurements, detach and reattach) is a [`ViewportEvent`]; the derived
//! state (positions, total extent, materialized range, phase) is recomputed
//! lazily the next time it is read.
//!
//! # Phases
//!
//! ```text
//! Uninitialized -> Measuring -> Settling -> Stable
//!                                  ^          |
//!                                  +----------+
//! ```
//!
//! `Measuring` means positions were computed from estimates only, `Settling`
//! that real sizes are arriving, and `Stable` that every visible item has been
//! measured. Scrolling onto unmeasured items moves a stable viewport back to
//! `Settling`.

use std::ops::Range;

use tracing::{debug, warn};

use crate::{
    config::{VirtualizerConfig, validate_lanes},
    error::{ConfigurationError, MeasurementError, SnapshotError},
    layout::{LayoutEngine, PositionEntry},
    measurement::{MeasurementCache, MeasurementStore},
    observer::{ElementSizeObserver, SizeEvent},
    px::Px,
    range::{VirtualRange, select_range},
};

/// Upper bound on measure/relayout rounds performed by [`ViewportController::settle`].
const MAX_SETTLE_PASSES: usize = 16;

/// Lifecycle of a mounted feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportPhase {
    /// Nothing has been laid out yet.
    Uninitialized,
    /// Positions exist but come from estimates only.
    Measuring,
    /// Real measurements are being folded into the layout.
    Settling,
    /// Every visible item has been measured.
    Stable,
}

/// Inputs driving a [`ViewportController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    /// The user scrolled to the given offset.
    Scrolled(Px),
    /// The viewport changed size along the scroll axis.
    Resized(Px),
    /// The number of items changed.
    ItemCountChanged(usize),
    /// The number of lanes changed.
    LanesChanged(usize),
    /// A materialized item reported its rendered size.
    Measured(SizeEvent),
    /// The materialized view was hidden but kept mounted.
    Detached,
    /// The materialized view is shown again.
    Reattached,
}

/// Orchestrates measurement, layout and range selection for one feed.
pub struct ViewportController {
    config: VirtualizerConfig,
    store: MeasurementStore,
    layout: LayoutEngine,
    count: usize,
    lanes: usize,
    scroll_offset: Px,
    viewport_size: Px,
    range: VirtualRange,
    observed: Range<usize>,
    phase: ViewportPhase,
    attached: bool,
    layout_dirty: bool,
    range_dirty: bool,
    observer: Option<Box<dyn ElementSizeObserver>>,
}

impl ViewportController {
    /// Creates a controller for an empty feed.
    pub fn new(config: VirtualizerConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            store: MeasurementStore::new(config.estimated_size),
            layout: LayoutEngine::new(config.gap),
            count: 0,
            lanes: config.lanes,
            scroll_offset: config.initial_offset,
            viewport_size: Px::ZERO,
            range: VirtualRange::empty(),
            observed: 0..0,
            phase: ViewportPhase::Uninitialized,
            attached: true,
            layout_dirty: true,
            range_dirty: true,
            observer: None,
            config,
        })
    }

    /// Installs the observer that reports rendered sizes.
    ///
    /// Items already materialized are observed on the next refresh.
    pub fn set_observer(&mut self, observer: Box<dyn ElementSizeObserver>) {
        self.observer = Some(observer);
        self.observed = 0..0;
        self.range_dirty = true;
    }

    /// Removes and returns the installed observer.
    pub fn take_observer(&mut self) -> Option<Box<dyn ElementSizeObserver>> {
        self.observed = 0..0;
        self.observer.take()
    }

    /// Configuration the controller was built with.
    pub fn config(&self) -> &VirtualizerConfig {
        &self.config
    }

    /// Current phase, as of the last refresh.
    pub fn phase(&self) -> ViewportPhase {
        self.phase
    }

    /// Whether the materialized view is shown.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Number of items in the feed.
    pub fn item_count(&self) -> usize {
        self.count
    }

    /// Number of lanes in use.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Current scroll offset.
    pub fn scroll_offset(&self) -> Px {
        self.scroll_offset
    }

    /// Current viewport size.
    pub fn viewport_size(&self) -> Px {
        self.viewport_size
    }

    /// Read access to the measurement store.
    pub fn measurements(&self) -> &MeasurementStore {
        &self.store
    }

    /// Applies one event.
    ///
    /// Only a lane count of zero fails. Rejected measurements are logged and
    /// otherwise ignored.
    pub fn dispatch(&mut self, event: ViewportEvent) -> Result<(), ConfigurationError> {
        match event {
            ViewportEvent::Scrolled(offset) => self.on_scroll(offset),
            ViewportEvent::Resized(size) => self.set_viewport_size(size),
            ViewportEvent::ItemCountChanged(count) => self.set_item_count(count),
            ViewportEvent::LanesChanged(lanes) => self.set_lanes(lanes)?,
            ViewportEvent::Measured(SizeEvent { index, size }) => {
                let _ = self.report_measurement(index, size);
            }
            ViewportEvent::Detached => self.detach(),
            ViewportEvent::Reattached => self.reattach(),
        }
        Ok(())
    }

    /// Handles a scroll event coming from the scroll container.
    ///
    /// Ignored while detached: the container then belongs to another view.
    pub fn on_scroll(&mut self, offset: Px) {
        if !self.attached {
            debug!(%offset, "ignoring scroll while detached");
            return;
        }
        self.set_offset(offset);
    }

    /// Jumps to `offset` immediately, without animation.
    pub fn scroll_to_offset(&mut self, offset: Px) {
        self.set_offset(offset);
    }

    fn set_offset(&mut self, offset: Px) {
        let offset = offset.max(Px::ZERO);
        if offset != self.scroll_offset {
            self.scroll_offset = offset;
            self.range_dirty = true;
        }
    }

    /// Updates the viewport size.
    pub fn set_viewport_size(&mut self, size: Px) {
        let size = size.max(Px::ZERO);
        if size != self.viewport_size {
            self.viewport_size = size;
            self.range_dirty = true;
        }
    }

    /// Updates the item count, e.g. after a page was loaded.
    pub fn set_item_count(&mut self, count: usize) {
        if count != self.count {
            self.count = count;
            self.layout_dirty = true;
        }
    }

    /// Updates the lane count. Every position is recomputed.
    pub fn set_lanes(&mut self, lanes: usize) -> Result<(), ConfigurationError> {
        validate_lanes(lanes)?;
        if lanes != self.lanes {
            debug!(from = self.lanes, to = lanes, "lane count changed");
            self.lanes = lanes;
            self.layout_dirty = true;
        }
        Ok(())
    }

    /// Records the rendered size of a materialized item.
    ///
    /// Returns whether the stored size changed. Non-positive sizes and
    /// indices past the item count are rejected and the previous value is
    /// kept, attached or not. Valid reports arriving while detached describe
    /// the hidden view and are dropped.
    pub fn report_measurement(&mut self, index: usize, size: Px) -> Result<bool, MeasurementError> {
        if index >= self.count {
            let err = MeasurementError::OutOfRange {
                index,
                count: self.count,
            };
            debug!("{err}");
            return Err(err);
        }
        if !size.is_positive() {
            let err = MeasurementError::NonPositiveSize { index, size };
            warn!("{err}; keeping {}", self.store.get(index));
            return Err(err);
        }
        if !self.attached {
            debug!(index, %size, "ignoring measurement while detached");
            return Ok(false);
        }
        let changed = self.store.set(index, size)?;
        if changed {
            self.layout_dirty = true;
            if self.phase == ViewportPhase::Measuring {
                self.phase = ViewportPhase::Settling;
            }
        }
        Ok(changed)
    }

    /// Hides the materialized view while keeping its measured state.
    pub fn detach(&mut self) {
        if self.attached {
            debug!(offset = %self.scroll_offset, "viewport detached");
            self.attached = false;
        }
    }

    /// Shows the materialized view again.
    ///
    /// Every materialized item is observed afresh, so sizes that changed
    /// while hidden are reported again.
    pub fn reattach(&mut self) {
        if !self.attached {
            debug!(offset = %self.scroll_offset, "viewport reattached");
            self.attached = true;
            if let Some(observer) = self.observer.as_mut() {
                for index in self.observed.clone() {
                    observer.unobserve(index);
                }
                let _ = observer.take_events();
            }
            self.observed = 0..0;
            self.range_dirty = true;
        }
    }

    /// Replaces the measurement store wholesale and jumps to `offset`.
    pub(crate) fn restore_from(
        &mut self,
        cache: &MeasurementCache,
        offset: Px,
    ) -> Result<(), SnapshotError> {
        self.store.replace(cache)?;
        self.layout.invalidate();
        self.layout_dirty = true;
        self.phase = ViewportPhase::Uninitialized;
        self.scroll_to_offset(offset);
        self.range_dirty = true;
        self.refresh();
        Ok(())
    }

    /// Drops all measurements and returns to offset zero.
    pub fn reset(&mut self) {
        self.store.clear();
        self.layout.invalidate();
        self.layout_dirty = true;
        self.scroll_offset = Px::ZERO;
        self.range = VirtualRange::empty();
        self.range_dirty = true;
        self.phase = ViewportPhase::Uninitialized;
    }

    /// Brings positions, range, observer subscriptions and phase up to date.
    ///
    /// Size reports already delivered by the observer are applied first, so a
    /// range is never computed from an estimate that has been superseded.
    /// While detached the observer is left alone: nothing is drained and no
    /// subscription changes until [`Self::reattach`].
    pub fn refresh(&mut self) {
        let _ = self.drain_observer();

        if self.layout_dirty || self.store.stale_from().is_some() {
            match self.layout.compute(self.count, self.lanes, &mut self.store) {
                Ok(_) => {
                    if self.count > 0 && self.phase == ViewportPhase::Uninitialized {
                        self.phase = ViewportPhase::Measuring;
                    }
                }
                Err(err) => warn!("layout skipped: {err}"),
            }
            self.layout_dirty = false;
            self.range_dirty = true;
        }

        if self.range_dirty {
            self.range = select_range(
                self.layout.positions(),
                self.layout.total_extent(),
                self.scroll_offset,
                self.viewport_size,
                self.config.overscan,
            );
            self.range_dirty = false;
            self.sync_observer();
        }

        self.update_phase();
    }

    /// Refreshes until the observer stops reporting new sizes.
    ///
    /// Returns whether the viewport reached [`ViewportPhase::Stable`].
    pub fn settle(&mut self) -> bool {
        for _ in 0..MAX_SETTLE_PASSES {
            self.refresh();
            if !self.drain_observer() {
                return self.phase == ViewportPhase::Stable;
            }
        }
        self.refresh();
        self.phase == ViewportPhase::Stable
    }

    /// Positions of every item.
    pub fn positions(&mut self) -> &[PositionEntry] {
        self.refresh();
        self.layout.positions()
    }

    /// Scrollable content length.
    pub fn total_extent(&mut self) -> Px {
        self.refresh();
        self.layout.total_extent()
    }

    /// Indices to materialize this pass.
    pub fn range(&mut self) -> VirtualRange {
        self.refresh();
        self.range.clone()
    }

    /// Positions of the items to materialize this pass, in index order.
    pub fn virtual_items(&mut self) -> Vec<PositionEntry> {
        self.refresh();
        self.range
            .indices()
            .filter_map(|index| self.layout.position(index).copied())
            .collect()
    }

    /// Applies pending size reports; returns whether any stored size changed.
    fn drain_observer(&mut self) -> bool {
        if !self.attached {
            return false;
        }
        let Some(observer) = self.observer.as_mut() else {
            return false;
        };
        let events = observer.take_events();
        let mut changed = false;
        for SizeEvent { index, size } in events {
            changed |= self.report_measurement(index, size).unwrap_or(false);
        }
        changed
    }

    fn sync_observer(&mut self) {
        if !self.attached {
            return;
        }
        let Some(observer) = self.observer.as_mut() else {
            return;
        };
        let next = self.range.indices();
        for index in self.observed.clone() {
            if !next.contains(&index) {
                observer.unobserve(index);
            }
        }
        for index in next.clone() {
            if !self.observed.contains(&index) {
                observer.observe(index);
            }
        }
        self.observed = next;
    }

    fn update_phase(&mut self) {
        if self.count == 0 || self.range.visible.is_empty() {
            return;
        }
        let pending = self
            .range
            .visible
            .clone()
            .any(|index| !self.store.is_measured(index));
        self.phase = match (self.phase, pending) {
            (_, false) => ViewportPhase::Stable,
            (ViewportPhase::Stable, true) => ViewportPhase::Settling,
            (ViewportPhase::Uninitialized, true) => ViewportPhase::Measuring,
            (phase, true) => phase,
        };
    }
}
