//! Element size observation.
//!
//! The controller never measures anything itself. Whatever renders the
//! materialized items (a browser, a terminal, a test) plugs in an
//! [`ElementSizeObserver`] that reports real sizes once they are known.

use std::collections::BTreeSet;

use crate::px::Px;

/// A size reported for one materialized item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEvent {
    /// Item index.
    pub index: usize,
    /// Rendered size along the scroll axis.
    pub size: Px,
}

/// Capability that watches rendered items and reports their sizes.
pub trait ElementSizeObserver {
    /// Starts watching the element rendered for `index`.
    fn observe(&mut self, index: usize);

    /// Stops watching `index`; its element left the materialized range.
    fn unobserve(&mut self, index: usize);

    /// Size reports gathered since the previous call.
    fn take_events(&mut self) -> Vec<SizeEvent>;
}

/// Observer for environments without a renderer.
///
/// Sizes come from a closure. Every newly observed index produces one event,
/// and [`HeadlessObserver::resize`] simulates an element changing size after
/// it was first laid out.
pub struct HeadlessObserver<F> {
    size_of: F,
    observed: BTreeSet<usize>,
    pending: Vec<SizeEvent>,
}

impl<F> HeadlessObserver<F>
where
    F: FnMut(usize) -> Px,
{
    /// Creates an observer that asks `size_of` for the size of each element.
    pub fn new(size_of: F) -> Self {
        Self {
            size_of,
            observed: BTreeSet::new(),
            pending: Vec::new(),
        }
    }

    /// Indices currently watched.
    pub fn observed(&self) -> impl Iterator<Item = usize> + '_ {
        self.observed.iter().copied()
    }

    /// Re-measures `index` if it is watched.
    pub fn resize(&mut self, index: usize) {
        if self.observed.contains(&index) {
            let size = (self.size_of)(index);
            self.pending.push(SizeEvent { index, size });
        }
    }
}

impl<F> ElementSizeObserver for HeadlessObserver<F>
where
    F: FnMut(usize) -> Px,
{
    fn observe(&mut self, index: usize) {
        if self.observed.insert(index) {
            let size = (self.size_of)(index);
            self.pending.push(SizeEvent { index, size });
        }
    }

    fn unobserve(&mut self, index: usize) {
        self.observed.remove(&index);
    }

    fn take_events(&mut self) -> Vec<SizeEvent> {
        std::mem::take(&mut self.pending)
    }
}
