use std::collections::HashMap;
use std::ops::Range;

use glam::Vec2;
use thiserror::Error;

use super::{SectorId, SurfacePlane, TextureError, Wall, WallId, World};

/// Structural problems found by [`World::validate`].
#[derive(Error, Debug, PartialEq)]
pub enum WorldError {
    #[error("sector {sector} wall run {first}..{end} exceeds {walls} walls")]
    WallRange {
        sector: SectorId,
        first: WallId,
        end: usize,
        walls: usize,
    },

    #[error("wall {wall} point2 {point2} leaves its sector")]
    Point2 { wall: WallId, point2: WallId },

    #[error("wall {wall} loop never closes")]
    OpenLoop { wall: WallId },

    #[error("wall {wall} portal references missing sector {sector}")]
    PortalSector { wall: WallId, sector: SectorId },

    #[error("wall {wall} portal back-reference is not reciprocal")]
    PortalPair { wall: WallId },

    #[error("sprite {sprite} sits in missing sector {sector}")]
    SpriteSector { sprite: u16, sector: SectorId },

    #[error("too many {0} for 16-bit ids")]
    Overflow(&'static str),

    #[error(transparent)]
    Texture(#[from] TextureError),
}

// ──────────────────────────────────────────────────────────────────────────
//                       World – public helpers
// ──────────────────────────────────────────────────────────────────────────
impl World {
    /// Wall ids owned by `sector`, in loop order.
    #[inline]
    pub fn walls_of(&self, sector: SectorId) -> Range<WallId> {
        let s = &self.sectors[sector as usize];
        s.first_wall..s.first_wall + s.wall_count
    }

    /// End point of `wall` (the start of its successor).
    #[inline(always)]
    pub fn wall_end(&self, wall: WallId) -> Vec2 {
        self.walls[self.walls[wall as usize].point2 as usize].pos
    }

    #[inline]
    pub fn ceiling_z(&self, sector: SectorId, p: Vec2) -> f32 {
        let s = &self.sectors[sector as usize];
        self.plane_z(s.first_wall, &s.ceiling, p)
    }

    #[inline]
    pub fn floor_z(&self, sector: SectorId, p: Vec2) -> f32 {
        let s = &self.sectors[sector as usize];
        self.plane_z(s.first_wall, &s.floor, p)
    }

    fn plane_z(&self, first_wall: WallId, plane: &SurfacePlane, p: Vec2) -> f32 {
        if plane.slope == 0.0 {
            return plane.height;
        }
        let a = self.walls[first_wall as usize].pos;
        let d = self.wall_end(first_wall) - a;
        let len = d.length();
        if len == 0.0 {
            return plane.height;
        }
        // interior lies to the right of every wall
        let inward = Vec2::new(d.y, -d.x) / len;
        plane.height + plane.slope * (p - a).dot(inward)
    }

    /// Crossing-number test over every loop of the sector.
    pub fn inside(&self, sector: SectorId, p: Vec2) -> bool {
        let mut crossings = 0u32;
        for w in self.walls_of(sector) {
            let a = self.walls[w as usize].pos;
            let b = self.wall_end(w);
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    crossings += 1;
                }
            }
        }
        crossings & 1 == 1
    }

    /// First sector containing `p`.
    pub fn find_sector(&self, p: Vec2) -> Option<SectorId> {
        (0..self.sectors.len() as SectorId).find(|&s| self.inside(s, p))
    }

    /// Distance from `p` to the nearest solid wall of `sector`. Portals
    /// don't count, the eye may walk through them.
    pub fn wall_clearance(&self, sector: SectorId, p: Vec2) -> f32 {
        self.walls_of(sector)
            .filter(|&w| self.walls[w as usize].next_sector.is_none())
            .map(|w| {
                let a = self.walls[w as usize].pos;
                let d = self.wall_end(w) - a;
                let len2 = d.length_squared();
                let t = if len2 > 0.0 {
                    ((p - a).dot(d) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                p.distance(a + d * t)
            })
            .fold(f32::INFINITY, f32::min)
    }

    /// Pair up walls whose endpoints coincide in reverse order across two
    /// sectors and turn them into portals.
    pub fn link_portals(&mut self) {
        let key = |a: Vec2, b: Vec2| (a.x.to_bits(), a.y.to_bits(), b.x.to_bits(), b.y.to_bits());

        let mut owner = vec![0 as SectorId; self.walls.len()];
        for s in 0..self.sectors.len() as SectorId {
            for w in self.walls_of(s) {
                owner[w as usize] = s;
            }
        }

        let mut by_edge: HashMap<_, WallId> = HashMap::with_capacity(self.walls.len());
        for w in 0..self.walls.len() as WallId {
            by_edge.insert(key(self.walls[w as usize].pos, self.wall_end(w)), w);
        }

        for w in 0..self.walls.len() as WallId {
            let reverse = key(self.wall_end(w), self.walls[w as usize].pos);
            if let Some(&other) = by_edge.get(&reverse) {
                if owner[other as usize] != owner[w as usize] {
                    let wall: &mut Wall = &mut self.walls[w as usize];
                    wall.next_wall = Some(other);
                    wall.next_sector = Some(owner[other as usize]);
                }
            }
        }
    }

    /// Check the invariants the renderer relies on: wall runs in range,
    /// closed loops, reciprocal portals, valid sprite sectors.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.sectors.len() > SectorId::MAX as usize {
            return Err(WorldError::Overflow("sectors"));
        }
        if self.walls.len() > WallId::MAX as usize {
            return Err(WorldError::Overflow("walls"));
        }

        for (s, sector) in self.sectors.iter().enumerate() {
            let first = sector.first_wall;
            let end = first as usize + sector.wall_count as usize;
            if end > self.walls.len() {
                return Err(WorldError::WallRange {
                    sector: s as SectorId,
                    first,
                    end,
                    walls: self.walls.len(),
                });
            }

            let run = first..end as WallId;
            for w in run.clone() {
                let wall = &self.walls[w as usize];
                if !run.contains(&wall.point2) {
                    return Err(WorldError::Point2 {
                        wall: w,
                        point2: wall.point2,
                    });
                }
                // every loop closes by jumping back to a lower id
                if wall.point2 == w || (wall.point2 != w + 1 && wall.point2 > w) {
                    return Err(WorldError::OpenLoop { wall: w });
                }

                if let Some(ns) = wall.next_sector {
                    if ns as usize >= self.sectors.len() {
                        return Err(WorldError::PortalSector { wall: w, sector: ns });
                    }
                    let back = wall
                        .next_wall
                        .and_then(|nw| self.walls.get(nw as usize))
                        .and_then(|nw| nw.next_wall);
                    if back != Some(w) {
                        return Err(WorldError::PortalPair { wall: w });
                    }
                }
            }
            if let Some(last) = run.clone().last() {
                if self.walls[last as usize].point2 >= last {
                    return Err(WorldError::OpenLoop { wall: last });
                }
            }
        }

        for (i, sprite) in self.sprites.iter().enumerate() {
            if sprite.sector as usize >= self.sectors.len() {
                return Err(WorldError::SpriteSector {
                    sprite: i as u16,
                    sector: sprite.sector,
                });
            }
        }
        Ok(())
    }
}
