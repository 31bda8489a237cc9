//! Plane equations: screen-linear functionals for 1/z, u/z and v/z, and
//! the builders that derive them for walls, flats and sprites.

use glam::Vec2;

use crate::{
    engine::types::View,
    renderer::ScreenPoly,
    world::{SectorId, Sprite, SurfacePlane, Texture, Wall, World},
};

/// `f(x, y) = dx * x + dy * y + k`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Linear {
    pub dx: f32,
    pub dy: f32,
    pub k: f32,
}

impl Linear {
    #[inline(always)]
    pub fn eval(&self, p: Vec2) -> f32 {
        self.dx * p.x + self.dy * p.y + self.k
    }

    pub fn with_gradient(&self, g: Vec2, k: f32) -> Self {
        Self { dx: g.x, dy: g.y, k }
    }
}

/// Screen-space mapping of one surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaneEquation {
    pub inv_z: Linear,
    pub u_z: Linear,
    pub v_z: Linear,
}

/// A screen point with known depth and texture coordinates.
#[derive(Clone, Copy, Debug)]
pub struct PlanePoint {
    pub pos: Vec2,
    pub depth: f32,
    pub u: f32,
    pub v: f32,
}

impl PlanePoint {
    pub fn new(pos: Vec2, depth: f32, u: f32, v: f32) -> Self {
        Self { pos, depth, u, v }
    }
}

impl PlaneEquation {
    /// Solve for the three functionals through `pts`.
    ///
    /// `None` if the points are collinear on screen or a depth is not
    /// positive.
    pub fn from_points(pts: &[PlanePoint; 3]) -> Option<Self> {
        if pts.iter().any(|p| !(p.depth > 0.0)) {
            return None;
        }
        let p0 = pts[0].pos.as_dvec2();
        let e1 = pts[1].pos.as_dvec2() - p0;
        let e2 = pts[2].pos.as_dvec2() - p0;
        let det = e1.perp_dot(e2);
        if det.abs() < 1e-9 {
            return None;
        }

        let solve = |f: [f64; 3]| {
            let (d1, d2) = (f[1] - f[0], f[2] - f[0]);
            let a = (d1 * e2.y - d2 * e1.y) / det;
            let b = (e1.x * d2 - e2.x * d1) / det;
            Linear {
                dx: a as f32,
                dy: b as f32,
                k: (f[0] - a * p0.x - b * p0.y) as f32,
            }
        };
        let inv = pts.map(|p| 1.0 / p.depth as f64);
        Some(Self {
            inv_z: solve(inv),
            u_z: solve([0, 1, 2].map(|i| pts[i].u as f64 * inv[i])),
            v_z: solve([0, 1, 2].map(|i| pts[i].v as f64 * inv[i])),
        })
    }

    /// `(depth, u, v)` at screen point `p`; `None` behind the eye.
    #[inline]
    pub fn eval(&self, p: Vec2) -> Option<(f32, f32, f32)> {
        let inv = self.inv_z.eval(p);
        if !(inv > 0.0) {
            return None;
        }
        Some((1.0 / inv, self.u_z.eval(p) / inv, self.v_z.eval(p) / inv))
    }

    pub fn map(&self, f: impl Fn(&Linear) -> Linear) -> Self {
        Self {
            inv_z: f(&self.inv_z),
            u_z: f(&self.u_z),
            v_z: f(&self.v_z),
        }
    }
}

/*──────────────────────────── surface builders ───────────────────────────*/

/// The visible piece of one wall after near clipping.
#[derive(Clone, Copy, Debug)]
pub struct WallPiece {
    /// camera-space endpoints
    pub c0: Vec2,
    pub c1: Vec2,
    /// fractions along the wall
    pub t0: f32,
    pub t1: f32,
    pub len: f32,
}

/// Wall texture mapping: `u` runs along the wall, `v` down from `ref_z`.
pub fn wall_plane(view: &View, piece: &WallPiece, wall: &Wall, ref_z: f32) -> Option<PlaneEquation> {
    let u = |t: f32| t * piece.len * wall.repeat.x + wall.panning.x;
    let v = |z: f32| (ref_z - z) * wall.repeat.y + wall.panning.y;
    let (za, zb) = (view.eye.z + 1.0, view.eye.z - 1.0);

    let pt = |c: Vec2, t: f32, z: f32| {
        PlanePoint::new(
            Vec2::new(view.screen_x(c), view.screen_y(c.y, z)),
            c.y,
            u(t),
            v(z),
        )
    };
    PlaneEquation::from_points(&[
        pt(piece.c0, piece.t0, za),
        pt(piece.c1, piece.t1, za),
        pt(piece.c0, piece.t0, zb),
    ])
}

/// Floor or ceiling of `sector`, textured in world units.
pub fn flat_plane(
    view: &View,
    world: &World,
    sector: SectorId,
    surface: &SurfacePlane,
    floor: bool,
) -> Option<PlaneEquation> {
    let eye = view.eye.truncate();
    let d = 1.0f32.max(view.near * 4.0);
    let points = [
        eye + view.forward * d,
        eye + view.forward * d + view.right * d,
        eye + view.forward * (2.0 * d),
    ];

    let pt = |q: Vec2| {
        let z = if floor {
            world.floor_z(sector, q)
        } else {
            world.ceiling_z(sector, q)
        };
        let c = view.to_cam(q);
        PlanePoint::new(
            Vec2::new(view.screen_x(c), view.screen_y(c.y, z)),
            c.y,
            q.x + surface.panning.x,
            -q.y + surface.panning.y,
        )
    };
    PlaneEquation::from_points(&points.map(pt))
}

/// Camera-facing billboard: returns its screen quad, the mapping and the
/// depth used for sorting.
pub fn sprite_plane(
    view: &View,
    sprite: &Sprite,
    tex: &Texture,
) -> Option<(ScreenPoly, PlaneEquation, f32)> {
    let c = view.to_cam(sprite.pos.truncate());
    if c.y < view.near {
        return None;
    }
    let half = sprite.size.x * 0.5;
    let (bottom, top) = (sprite.pos.z, sprite.pos.z + sprite.size.y);
    let x0 = view.screen_x(Vec2::new(c.x - half, c.y));
    let x1 = view.screen_x(Vec2::new(c.x + half, c.y));
    let y0 = view.screen_y(c.y, top);
    let y1 = view.screen_y(c.y, bottom);

    let (w, h) = (tex.w as f32, tex.h as f32);
    let eq = PlaneEquation::from_points(&[
        PlanePoint::new(Vec2::new(x0, y0), c.y, 0.0, 0.0),
        PlanePoint::new(Vec2::new(x1, y0), c.y, w, 0.0),
        PlanePoint::new(Vec2::new(x0, y1), c.y, 0.0, h),
    ])?;
    let quad = ScreenPoly::from_slice(&[
        Vec2::new(x0, y0),
        Vec2::new(x1, y0),
        Vec2::new(x1, y1),
        Vec2::new(x0, y1),
    ]);
    Some((quad, eq, c.y))
}

/// World position at fraction `t` along a wall.
#[inline]
pub fn along(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}
