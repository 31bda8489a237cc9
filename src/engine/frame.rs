//! Per-frame scratch: every pool the visibility pass draws from, reset
//! at the start of a frame and reused across frames.

use std::fmt;

use crate::{
    config::RenderConfig,
    engine::{
        arena::{BitSet, BoundedVec, CapacityError, Pool},
        domost::SpanList,
        masks::MaskItem,
        plane::PlaneEquation,
        scan::{Bunch, Scan},
        types::{BunchId, View},
    },
    world::SectorId,
};

/// Per-frame counters, returned by every rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub sectors: u32,
    pub scans: u32,
    pub bunches: u32,
    pub bunches_drawn: u32,
    pub polygons: u32,
    pub sky_fills: u32,
    pub masks: u32,

    /* capacity fallbacks */
    pub dropped_scans: u32,
    pub dropped_bunches: u32,
    pub dropped_sectors: u32,
    pub dropped_masks: u32,
    pub span_overflows: u32,
}

impl FrameStats {
    pub fn note(&mut self, err: CapacityError) {
        let slot = match err.pool {
            Pool::Scans => &mut self.dropped_scans,
            Pool::Bunches => &mut self.dropped_bunches,
            Pool::SectorStack => &mut self.dropped_sectors,
            Pool::Masks => &mut self.dropped_masks,
            Pool::SpanNodes => &mut self.span_overflows,
        };
        *slot += 1;
    }

    pub fn capacity_drops(&self) -> u32 {
        self.dropped_scans
            + self.dropped_bunches
            + self.dropped_sectors
            + self.dropped_masks
            + self.span_overflows
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sectors {} scans {} bunches {}/{} polys {} sky {} masks {}",
            self.sectors,
            self.scans,
            self.bunches_drawn,
            self.bunches,
            self.polygons,
            self.sky_fills,
            self.masks
        )
    }
}

/// All scratch the pipeline touches while drawing one frame.
///
/// Sized once from [`RenderConfig`]; [`FrameRenderState::reset`] at frame
/// entry makes it reusable without reallocating.
pub struct FrameRenderState {
    pub(crate) view: View,
    pub(crate) scan_distance: f32,
    pub(crate) scans: BoundedVec<Scan>,
    pub(crate) bunches: BoundedVec<Bunch>,
    /// undrawn bunches, ascending `x_left`
    pub(crate) pending: Vec<BunchId>,
    pub(crate) got_sector: BitSet,
    pub(crate) got_bunch: BitSet,
    pub(crate) sector_stack: BoundedVec<SectorId>,
    pub(crate) spans: SpanList,
    pub(crate) masks: BoundedVec<MaskItem>,
    pub(crate) compared: Vec<bool>,
    pub(crate) plane: PlaneEquation,
    pub(crate) stats: FrameStats,
}

impl FrameRenderState {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            view: View::default(),
            scan_distance: config.scan_distance,
            scans: BoundedVec::new(Pool::Scans, config.max_scans),
            bunches: BoundedVec::new(Pool::Bunches, config.max_bunches),
            pending: Vec::with_capacity(config.max_bunches),
            got_sector: BitSet::default(),
            got_bunch: BitSet::with_len(config.max_bunches),
            sector_stack: BoundedVec::new(Pool::SectorStack, config.max_sector_stack),
            spans: SpanList::new(config.max_span_nodes),
            masks: BoundedVec::new(Pool::Masks, config.max_masks),
            compared: Vec::with_capacity(config.max_bunches),
            plane: PlaneEquation::default(),
            stats: FrameStats::default(),
        }
    }

    /// Forget the previous frame.
    pub fn reset(&mut self, view: View, sector_count: usize) {
        self.view = view;
        self.scans.clear();
        self.bunches.clear();
        self.pending.clear();
        self.got_sector.reset(sector_count);
        self.got_bunch.reset(self.bunches.capacity());
        self.sector_stack.clear();
        self.spans
            .reset(0.0, view.width as f32, 0.0, view.height as f32);
        self.masks.clear();
        self.stats = FrameStats::default();
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn scans(&self) -> &[Scan] {
        self.scans.as_slice()
    }

    pub fn bunches(&self) -> &[Bunch] {
        self.bunches.as_slice()
    }

    pub fn pending(&self) -> &[BunchId] {
        &self.pending
    }

    pub fn sector_visited(&self, sector: SectorId) -> bool {
        self.got_sector.contains(sector as usize)
    }

    pub fn bunch_drawn(&self, bunch: BunchId) -> bool {
        self.got_bunch.contains(bunch as usize)
    }

    pub fn spans(&self) -> &SpanList {
        &self.spans
    }

    pub fn masks(&self) -> &[MaskItem] {
        self.masks.as_slice()
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Walls of one bunch, left to right.
    pub fn bunch_scans(&self, bunch: BunchId) -> impl Iterator<Item = &Scan> + '_ {
        let mut cur = self.bunches.get(bunch as usize).map(|b| b.first);
        std::iter::from_fn(move || {
            let scan = &self.scans[cur? as usize];
            cur = scan.next;
            Some(scan)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Camera;
    use glam::Vec3;

    #[test]
    fn note_routes_to_matching_counter() {
        let mut st = FrameStats::default();
        st.note(CapacityError {
            pool: Pool::Bunches,
            capacity: 4,
        });
        st.note(CapacityError {
            pool: Pool::SpanNodes,
            capacity: 4,
        });
        assert_eq!(st.dropped_bunches, 1);
        assert_eq!(st.span_overflows, 1);
        assert_eq!(st.capacity_drops(), 2);
    }

    #[test]
    fn reset_opens_the_whole_viewport() {
        let cfg = RenderConfig::default();
        let mut state = FrameRenderState::new(&cfg);
        let cam = Camera::new(Vec3::ZERO, 0.0, 1.5);
        state.reset(View::new(&cam, 320, 200, cfg.near), 4);
        let strips: Vec<_> = state.spans().strips().collect();
        assert_eq!(strips.len(), 1);
        assert_eq!((strips[0].x0, strips[0].x1), (0.0, 320.0));
        assert!(!state.sector_visited(0));
        assert!(state.pending().is_empty());
    }
}
