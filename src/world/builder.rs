use glam::Vec2;

use super::{
    NO_TEXTURE, Sector, SectorId, Sprite, SpriteId, SurfacePlane, TextureId, Wall, WallId, World,
    WorldError,
};

/// Programmatic map construction.
///
/// Loops are given as point lists in clockwise order (interior on the
/// right). Walls that share an edge in reverse order with another sector
/// become portals when the map is built.
#[derive(Default)]
pub struct MapBuilder {
    world: World,
    wall_tex: TextureId,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self {
            world: World::default(),
            wall_tex: NO_TEXTURE,
        }
    }

    /// Texture given to walls created by later [`MapBuilder::sector`] calls.
    pub fn wall_tex(&mut self, tex: TextureId) -> &mut Self {
        self.wall_tex = tex;
        self
    }

    /// Append a sector made of one outer loop and any number of inner
    /// loops (pillars). Returns its id.
    pub fn sector(
        &mut self,
        loops: &[&[Vec2]],
        floor: SurfacePlane,
        ceiling: SurfacePlane,
    ) -> SectorId {
        let first = self.world.walls.len();
        for lp in loops {
            let start = self.world.walls.len();
            let n = lp.len();
            for (i, &p) in lp.iter().enumerate() {
                let point2 = if i + 1 == n { start } else { start + i + 1 };
                self.world
                    .walls
                    .push(Wall::new(p, point2 as WallId, self.wall_tex));
            }
        }
        self.world.sectors.push(Sector {
            first_wall: first as WallId,
            wall_count: (self.world.walls.len() - first) as u16,
            ceiling,
            floor,
        });
        (self.world.sectors.len() - 1) as SectorId
    }

    pub fn wall_mut(&mut self, id: WallId) -> &mut Wall {
        &mut self.world.walls[id as usize]
    }

    /// First wall of `sector` whose start point is `p`.
    pub fn wall_at(&self, sector: SectorId, p: Vec2) -> Option<WallId> {
        self.world
            .walls_of(sector)
            .find(|&w| self.world.walls[w as usize].pos == p)
    }

    pub fn sprite(&mut self, sprite: Sprite) -> SpriteId {
        self.world.sprites.push(sprite);
        (self.world.sprites.len() - 1) as SpriteId
    }

    /// Link portals and validate.
    pub fn build(mut self) -> Result<World, WorldError> {
        if self.world.walls.len() > WallId::MAX as usize {
            return Err(WorldError::Overflow("walls"));
        }
        self.world.link_portals();
        self.world.validate()?;
        Ok(self.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    #[test]
    fn loops_close_on_their_first_wall() {
        let mut b = MapBuilder::new();
        let outer = [vec2(0., 0.), vec2(0., 100.), vec2(100., 100.), vec2(100., 0.)];
        let pillar = [vec2(40., 40.), vec2(60., 40.), vec2(60., 60.), vec2(40., 60.)];
        b.sector(
            &[&outer, &pillar],
            SurfacePlane::flat(0.0, NO_TEXTURE),
            SurfacePlane::flat(64.0, NO_TEXTURE),
        );
        let w = b.build().unwrap();
        assert_eq!(w.sectors[0].wall_count, 8);
        assert_eq!(w.walls[3].point2, 0);
        assert_eq!(w.walls[7].point2, 4);
        // inside the room, outside the pillar
        assert!(w.inside(0, vec2(10.0, 10.0)));
        assert!(!w.inside(0, vec2(50.0, 50.0)));
    }

    #[test]
    fn wall_at_finds_start_point() {
        let mut b = MapBuilder::new();
        let sq = [vec2(0., 0.), vec2(0., 8.), vec2(8., 8.), vec2(8., 0.)];
        let s = b.sector(
            &[&sq],
            SurfacePlane::flat(0.0, NO_TEXTURE),
            SurfacePlane::flat(8.0, NO_TEXTURE),
        );
        assert_eq!(b.wall_at(s, vec2(8., 8.)), Some(2));
        assert_eq!(b.wall_at(s, vec2(1., 1.)), None);
    }
}
