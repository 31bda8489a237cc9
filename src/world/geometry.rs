use bitflags::bitflags;
use glam::{Vec2, Vec3};

use crate::world::texture::{PaletteId, TextureId};

pub type SectorId = u16;
pub type WallId = u16;
pub type SpriteId = u16;

/// Runtime snapshot of one map (immutable while a frame is drawn).
#[derive(Clone, Debug, Default)]
pub struct World {
    pub sectors: Vec<Sector>,
    pub walls: Vec<Wall>,
    pub sprites: Vec<Sprite>,
}

/*----------------------------- sectors ------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct SurfaceFlags: u8 {
        /// Sky: the surface is never textured, the strip is left to the
        /// sky fill and upper/lower steps between two sky sectors vanish.
        const PARALLAX = 0x01;
    }
}

/// Floor or ceiling of a sector.
///
/// The height is measured at the sector's first wall; `slope` is the rise
/// per map unit when moving from that wall towards the sector interior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePlane {
    pub height: f32,
    pub slope: f32,
    pub tex: TextureId,
    pub shade: i8,
    pub pal: PaletteId,
    pub panning: Vec2,
    pub flags: SurfaceFlags,
}

impl SurfacePlane {
    pub fn flat(height: f32, tex: TextureId) -> Self {
        Self {
            height,
            slope: 0.0,
            tex,
            shade: 0,
            pal: 0,
            panning: Vec2::ZERO,
            flags: SurfaceFlags::empty(),
        }
    }

    #[inline]
    pub fn is_parallax(&self) -> bool {
        self.flags.contains(SurfaceFlags::PARALLAX)
    }
}

#[derive(Clone, Debug)]
pub struct Sector {
    /// First wall of a contiguous run; the run may hold several loops.
    pub first_wall: WallId,
    pub wall_count: u16,
    pub ceiling: SurfacePlane,
    pub floor: SurfacePlane,
}

/*------------------------------ walls -------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct WallFlags: u16 {
        /// Portal is drawn as a solid wall and never traversed.
        const ONE_WAY         = 0x0001;
        /// Portal carries `over_tex` drawn after the rooms.
        const MASKED          = 0x0002;
        const TRANSLUCENT     = 0x0004;
        const TRANSLUCENT_INV = 0x0008;
    }
}

/// Directed wall edge `pos → walls[point2].pos`. The sector interior lies
/// on the right-hand side of the direction of travel.
#[derive(Clone, Debug)]
pub struct Wall {
    pub pos: Vec2,
    pub point2: WallId,
    pub next_wall: Option<WallId>,
    pub next_sector: Option<SectorId>,
    pub flags: WallFlags,
    pub tex: TextureId,
    pub over_tex: TextureId,
    pub shade: i8,
    pub pal: PaletteId,
    /// Texels per map unit along (x) and down (y) the wall.
    pub repeat: Vec2,
    pub panning: Vec2,
}

impl Wall {
    pub fn new(pos: Vec2, point2: WallId, tex: TextureId) -> Self {
        Self {
            pos,
            point2,
            next_wall: None,
            next_sector: None,
            flags: WallFlags::empty(),
            tex,
            over_tex: tex,
            shade: 0,
            pal: 0,
            repeat: Vec2::ONE,
            panning: Vec2::ZERO,
        }
    }

    /// Neighbour sector the scanner may walk into.
    #[inline]
    pub fn traversable(&self) -> Option<SectorId> {
        if self.flags.contains(WallFlags::ONE_WAY) {
            None
        } else {
            self.next_sector
        }
    }
}

/*----------------------------- sprites ------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct SpriteFlags: u8 {
        const TRANSLUCENT     = 0x01;
        const TRANSLUCENT_INV = 0x02;
        const INVISIBLE       = 0x04;
    }
}

/// Camera-facing billboard; `pos.z` is the bottom edge.
#[derive(Clone, Debug)]
pub struct Sprite {
    pub pos: Vec3,
    pub sector: SectorId,
    pub tex: TextureId,
    /// World-space width and height.
    pub size: Vec2,
    pub shade: i8,
    pub pal: PaletteId,
    pub flags: SpriteFlags,
}
