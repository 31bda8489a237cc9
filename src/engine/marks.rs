use crate::{
    engine::arena::BitSet,
    world::{SectorId, WallId, World},
};

/// Receives the sectors and walls a frame actually drew (automap).
pub trait DrawnSink {
    fn sector_drawn(&mut self, sector: SectorId);
    fn wall_drawn(&mut self, wall: WallId);
}

/// No automap.
impl DrawnSink for () {
    fn sector_drawn(&mut self, _: SectorId) {}
    fn wall_drawn(&mut self, _: WallId) {}
}

/// "Seen" bits that accumulate across frames. Marking is idempotent.
#[derive(Clone, Debug, Default)]
pub struct MapMarks {
    sectors: BitSet,
    walls: BitSet,
}

impl MapMarks {
    pub fn new(world: &World) -> Self {
        Self {
            sectors: BitSet::with_len(world.sectors.len()),
            walls: BitSet::with_len(world.walls.len()),
        }
    }

    pub fn sector_seen(&self, sector: SectorId) -> bool {
        self.sectors.contains(sector as usize)
    }

    pub fn wall_seen(&self, wall: WallId) -> bool {
        self.walls.contains(wall as usize)
    }

    pub fn seen_sectors(&self) -> usize {
        self.sectors.count()
    }

    pub fn seen_walls(&self) -> usize {
        self.walls.count()
    }

    pub fn clear(&mut self) {
        self.sectors.reset(0);
        self.walls.reset(0);
    }
}

impl DrawnSink for MapMarks {
    fn sector_drawn(&mut self, sector: SectorId) {
        self.sectors.insert(sector as usize);
    }

    fn wall_drawn(&mut self, wall: WallId) {
        self.walls.insert(wall as usize);
    }
}
