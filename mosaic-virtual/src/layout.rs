//! Lane layout for variable-size items.
//!
//! Items are placed in index order into the lane whose cursor (next free
//! offset) is the smallest, with ties going to the lowest lane. This greedy
//! balancing keeps lanes at similar heights and, as a side effect, makes the
//! `start` of successive entries non-decreasing, which the range selector
//! relies on.
//!
//! Positions are cached between passes. A pass resumes at the earliest index
//! the [`MeasurementStore`] marked stale, rebuilding the lane cursors from the
//! cached entries right before that point.

use smallvec::{SmallVec, smallvec};
use tracing::{instrument, trace};

use crate::{
    config::validate_lanes, error::ConfigurationError, measurement::MeasurementStore, px::Px,
};

type LaneVec<T> = SmallVec<[T; 4]>;

/// Placement of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEntry {
    /// Item index.
    pub index: usize,
    /// Lane the item is placed in.
    pub lane: usize,
    /// Offset of the item's leading edge along the scroll axis.
    pub start: Px,
    /// Item size along the scroll axis.
    pub size: Px,
}

impl PositionEntry {
    /// Offset of the item's trailing edge.
    pub fn end(&self) -> Px {
        self.start.saturating_add(self.size)
    }
}

/// Computes and caches item positions across lanes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEngine {
    lanes: usize,
    gap: Px,
    positions: Vec<PositionEntry>,
    total_extent: Px,
    last_recomputed: usize,
}

impl LayoutEngine {
    /// Creates an engine with no cached positions.
    pub fn new(gap: Px) -> Self {
        Self {
            lanes: 0,
            gap,
            positions: Vec::new(),
            total_extent: Px::ZERO,
            last_recomputed: 0,
        }
    }

    /// Positions from the last pass, in index order.
    pub fn positions(&self) -> &[PositionEntry] {
        &self.positions
    }

    /// Placement of `index` from the last pass.
    pub fn position(&self, index: usize) -> Option<&PositionEntry> {
        self.positions.get(index)
    }

    /// Content length from the last pass.
    pub fn total_extent(&self) -> Px {
        self.total_extent
    }

    /// Lane count used by the last pass, zero before the first one.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Number of entries the last pass had to place.
    pub fn last_recomputed(&self) -> usize {
        self.last_recomputed
    }

    /// Drops every cached position; the next pass starts from index 0.
    pub fn invalidate(&mut self) {
        self.positions.clear();
        self.total_extent = Px::ZERO;
    }

    /// Places `count` items across `lanes` lanes.
    ///
    /// Returns the positions (one per index, in index order) and the total
    /// extent. Entries before the earliest stale index are reused.
    #[instrument(level = "trace", skip(self, store))]
    pub fn compute(
        &mut self,
        count: usize,
        lanes: usize,
        store: &mut MeasurementStore,
    ) -> Result<(&[PositionEntry], Px), ConfigurationError> {
        validate_lanes(lanes)?;

        let mut resume = self.positions.len().min(count);
        if lanes != self.lanes {
            self.lanes = lanes;
            resume = 0;
        }
        if let Some(stale) = store.take_stale_from() {
            resume = resume.min(stale);
        }
        self.positions.truncate(resume);

        let mut cursors: LaneVec<Px> = self
            .last_end_per_lane()
            .into_iter()
            .map(|end| end.map_or(Px::ZERO, |end| end.saturating_add(self.gap)))
            .collect();

        self.positions.reserve(count - resume);
        for index in resume..count {
            let lane = shortest_lane(&cursors);
            let start = cursors[lane];
            let size = store.get(index);
            self.positions.push(PositionEntry {
                index,
                lane,
                start,
                size,
            });
            cursors[lane] = start.saturating_add(size).saturating_add(self.gap);
        }

        self.last_recomputed = count - resume;
        self.total_extent = self
            .last_end_per_lane()
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(Px::ZERO);
        trace!(
            count,
            lanes,
            resume,
            extent = %self.total_extent,
            "layout pass"
        );
        Ok((&self.positions, self.total_extent))
    }

    /// Trailing edge of the last cached entry of every lane.
    fn last_end_per_lane(&self) -> LaneVec<Option<Px>> {
        let mut ends: LaneVec<Option<Px>> = smallvec![None; self.lanes];
        let mut found = 0;
        for entry in self.positions.iter().rev() {
            if found == self.lanes {
                break;
            }
            let Some(slot) = ends.get_mut(entry.lane) else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(entry.end());
                found += 1;
            }
        }
        ends
    }
}

fn shortest_lane(cursors: &[Px]) -> usize {
    cursors
        .iter()
        .enumerate()
        .min_by_key(|(_, cursor)| **cursor)
        .map_or(0, |(lane, _)| lane)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn store_with(sizes: &[(usize, i32)]) -> MeasurementStore {
        let mut store = MeasurementStore::new(Px(300));
        for &(index, size) in sizes {
            assert_eq!(store.set(index, Px(size)), Ok(true));
        }
        store
    }

    fn run(
        engine: &mut LayoutEngine,
        count: usize,
        lanes: usize,
        store: &mut MeasurementStore,
    ) -> (Vec<PositionEntry>, Px) {
        match engine.compute(count, lanes, store) {
            Ok((positions, extent)) => (positions.to_vec(), extent),
            Err(err) => panic!("layout failed: {err}"),
        }
    }

    fn varied_store(count: usize) -> MeasurementStore {
        let sizes: Vec<(usize, i32)> = (0..count)
            .filter(|index| index % 3 != 0)
            .map(|index| (index, 100 + ((index * 37) % 300) as i32))
            .collect();
        store_with(&sizes)
    }

    #[test]
    fn produces_one_entry_per_index() {
        for count in [0, 1, 2, 5, 17, 100] {
            for lanes in 1..=5 {
                let mut store = varied_store(count);
                let mut engine = LayoutEngine::new(Px::ZERO);
                let (positions, _) = run(&mut engine, count, lanes, &mut store);

                assert_eq!(positions.len(), count);
                let indices: HashSet<usize> = positions.iter().map(|p| p.index).collect();
                assert_eq!(indices.len(), count);
                assert!(positions.iter().enumerate().all(|(i, p)| p.index == i));
                assert!(positions.iter().all(|p| p.lane < lanes));
            }
        }
    }

    #[test]
    fn extent_is_tallest_lane_sum() {
        let count = 73;
        let lanes = 3;
        let mut store = varied_store(count);
        let mut engine = LayoutEngine::new(Px::ZERO);
        let (positions, extent) = run(&mut engine, count, lanes, &mut store);

        let mut sums = vec![Px::ZERO; lanes];
        for entry in &positions {
            sums[entry.lane] += entry.size;
        }
        assert_eq!(Some(extent), sums.into_iter().max());
    }

    #[test]
    fn entries_in_a_lane_do_not_overlap() {
        let mut store = varied_store(60);
        let mut engine = LayoutEngine::new(Px(16));
        let (positions, _) = run(&mut engine, 60, 4, &mut store);

        for lane in 0..4 {
            let in_lane: Vec<&PositionEntry> =
                positions.iter().filter(|p| p.lane == lane).collect();
            for pair in in_lane.windows(2) {
                assert!(pair[0].start <= pair[1].start);
                assert_eq!(pair[0].end() + Px(16), pair[1].start);
            }
        }
        assert!(positions.windows(2).all(|pair| pair[0].start <= pair[1].start));
    }

    #[test]
    fn ties_go_to_lowest_lane() {
        let mut store = MeasurementStore::new(Px(300));
        let mut engine = LayoutEngine::new(Px::ZERO);
        let (positions, extent) = run(&mut engine, 6, 2, &mut store);

        let lanes: Vec<usize> = positions.iter().map(|p| p.lane).collect();
        let starts: Vec<Px> = positions.iter().map(|p| p.start).collect();
        assert_eq!(lanes, vec![0, 1, 0, 1, 0, 1]);
        assert_eq!(
            starts,
            vec![Px(0), Px(0), Px(300), Px(300), Px(600), Px(600)]
        );
        assert_eq!(extent, Px(900));
    }

    #[test]
    fn empty_feed_has_no_extent() {
        let mut store = MeasurementStore::new(Px(300));
        let mut engine = LayoutEngine::new(Px(8));
        let (positions, extent) = run(&mut engine, 0, 2, &mut store);
        assert!(positions.is_empty());
        assert_eq!(extent, Px::ZERO);
    }

    #[test]
    fn zero_lanes_is_a_configuration_error() {
        let mut store = MeasurementStore::new(Px(300));
        let mut engine = LayoutEngine::new(Px::ZERO);
        assert_eq!(
            engine.compute(10, 0, &mut store).map(|(_, extent)| extent),
            Err(ConfigurationError::InvalidLaneCount(0))
        );
    }

    #[test]
    fn unchanged_measurement_costs_nothing() {
        let mut store = MeasurementStore::new(Px(300));
        let mut engine = LayoutEngine::new(Px::ZERO);
        run(&mut engine, 100, 2, &mut store);
        assert_eq!(engine.last_recomputed(), 100);

        assert_eq!(store.set(10, Px(420)), Ok(true));
        run(&mut engine, 100, 2, &mut store);
        assert_eq!(engine.last_recomputed(), 90);

        assert_eq!(store.set(10, Px(420)), Ok(false));
        run(&mut engine, 100, 2, &mut store);
        assert_eq!(engine.last_recomputed(), 0);
    }

    #[test]
    fn offscreen_growth_shifts_same_lane_entries() {
        let mut store = MeasurementStore::new(Px(300));
        let mut engine = LayoutEngine::new(Px::ZERO);
        let (before, extent_before) = run(&mut engine, 40, 2, &mut store);

        assert_eq!(store.set(5, Px(450)), Ok(true));
        let (after, extent_after) = run(&mut engine, 40, 2, &mut store);

        assert_eq!(engine.last_recomputed(), 35);
        assert_eq!(&before[..5], &after[..5]);
        let lane = after[5].lane;
        assert_eq!(after[5].size, Px(450));
        for index in 6..40 {
            assert_eq!(after[index].lane, before[index].lane);
            let expected = if after[index].lane == lane {
                before[index].start + Px(150)
            } else {
                before[index].start
            };
            assert_eq!(after[index].start, expected, "index {index}");
        }
        assert_eq!(extent_after, extent_before + Px(150));
    }

    #[test]
    fn incremental_pass_matches_full_pass() {
        let mut store = varied_store(120);
        let mut engine = LayoutEngine::new(Px(4));
        run(&mut engine, 120, 3, &mut store);

        for (index, size) in [(90, 77), (31, 512), (64, 205)] {
            assert_eq!(store.set(index, Px(size)), Ok(true));
        }
        let (incremental, incremental_extent) = run(&mut engine, 120, 3, &mut store);
        assert_eq!(engine.last_recomputed(), 120 - 31);

        store.mark_stale(0);
        let mut fresh = LayoutEngine::new(Px(4));
        let (full, full_extent) = run(&mut fresh, 120, 3, &mut store);
        assert_eq!(incremental, full);
        assert_eq!(incremental_extent, full_extent);
    }

    #[test]
    fn appended_items_only_place_the_tail() {
        let mut store = varied_store(150);
        let mut engine = LayoutEngine::new(Px::ZERO);
        run(&mut engine, 100, 2, &mut store);
        let (grown, _) = run(&mut engine, 150, 2, &mut store);
        assert_eq!(engine.last_recomputed(), 50);

        store.mark_stale(0);
        let mut fresh = LayoutEngine::new(Px::ZERO);
        let (full, _) = run(&mut fresh, 150, 2, &mut store);
        assert_eq!(grown, full);

        let (shrunk, _) = run(&mut engine, 30, 2, &mut store);
        assert_eq!(engine.last_recomputed(), 0);
        assert_eq!(&shrunk[..], &full[..30]);
    }

    #[test]
    fn more_lanes_never_grow_extent() {
        let mut store = varied_store(200);
        let mut engine = LayoutEngine::new(Px::ZERO);
        let (two_lanes, extent_two) = run(&mut engine, 200, 2, &mut store);
        let (three_lanes, extent_three) = run(&mut engine, 200, 3, &mut store);

        assert_eq!(engine.last_recomputed(), 200);
        assert_eq!(engine.lanes(), 3);
        assert!(extent_three <= extent_two);
        assert!(three_lanes.iter().any(|p| p.lane == 2));
        assert_ne!(two_lanes, three_lanes);
    }
}
