//! Selection of the indices to materialize.
//!
//! Layout keeps `start` non-decreasing in index order, so the end of the
//! visible run is a plain partition point. The beginning needs one extra step:
//! an item that starts above the viewport may still reach into it, and there is
//! at most one such item per lane. Those are found by walking backwards from
//! the partition point until every lane has been seen once.

use std::ops::Range;

use smallvec::{SmallVec, smallvec};

use crate::{layout::PositionEntry, px::Px};

/// The indices selected for one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualRange {
    /// Indices intersecting the viewport.
    pub visible: Range<usize>,
    /// Indices to materialize: `visible` widened by the overscan.
    pub materialized: Range<usize>,
}

impl VirtualRange {
    /// A selection materializing nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether nothing is materialized.
    pub fn is_empty(&self) -> bool {
        self.materialized.is_empty()
    }

    /// Number of materialized indices.
    pub fn len(&self) -> usize {
        self.materialized.len()
    }

    /// Whether `index` is materialized.
    pub fn contains(&self, index: usize) -> bool {
        self.materialized.contains(&index)
    }

    /// Materialized indices in ascending order.
    pub fn indices(&self) -> Range<usize> {
        self.materialized.clone()
    }
}

/// Chooses the indices to materialize for a viewport.
///
/// `positions` must come from [`LayoutEngine`](crate::LayoutEngine), one entry
/// per index in index order. The visible run covers every item with
/// `start + size > scroll_offset` and `start < scroll_offset + viewport_size`;
/// it is then widened by `overscan` on both sides and clamped to the item count.
///
/// A viewport with no size, or one scrolled past the content, selects nothing.
pub fn select_range(
    positions: &[PositionEntry],
    total_extent: Px,
    scroll_offset: Px,
    viewport_size: Px,
    overscan: usize,
) -> VirtualRange {
    let count = positions.len();
    if count == 0 || !viewport_size.is_positive() || scroll_offset >= total_extent {
        return VirtualRange::empty();
    }

    let bottom = scroll_offset.saturating_add(viewport_size);
    let first = first_visible(positions, scroll_offset);
    let end = positions.partition_point(|entry| entry.start < bottom);
    if first >= end {
        return VirtualRange::empty();
    }

    VirtualRange {
        visible: first..end,
        materialized: first.saturating_sub(overscan)..end.saturating_add(overscan).min(count),
    }
}

/// Lowest index whose trailing edge lies below `offset`.
fn first_visible(positions: &[PositionEntry], offset: Px) -> usize {
    let below = positions.partition_point(|entry| entry.start <= offset);
    // Every lane's first entry starts at zero.
    let lanes = positions.partition_point(|entry| entry.start <= Px::ZERO).max(1);

    let mut seen: SmallVec<[bool; 8]> = smallvec![false; lanes];
    let mut remaining = lanes;
    let mut first = below;
    for entry in positions[..below].iter().rev() {
        if remaining == 0 {
            break;
        }
        let Some(flag) = seen.get_mut(entry.lane) else {
            continue;
        };
        if *flag {
            continue;
        }
        *flag = true;
        remaining -= 1;
        if entry.end() > offset {
            first = entry.index;
        }
    }
    first
}
