//! The frozen view of a frame and the camera-space helpers around it.

use glam::{Vec2, Vec3};

use crate::{engine::plane::PlaneEquation, renderer::ScreenPoly, world::Camera};

pub type BunchId = u16;
pub type ScanId = u32;

/// Camera state frozen for one frame, plus the viewport it projects onto.
#[derive(Clone, Copy, Debug)]
pub struct View {
    pub eye: Vec3,
    pub forward: Vec2,
    pub right: Vec2,
    pub focal: f32,
    pub width: usize,
    pub height: usize,
    pub half_w: f32,
    pub half_h: f32,
    /// pixels, + = look down
    pub horizon: f32,
    pub near: f32,
    pub roll: f32,
}

impl Default for View {
    fn default() -> Self {
        Self::new(&Camera::new(Vec3::ZERO, 0.0, 90f32.to_radians()), 1, 1, 1.0)
    }
}

impl View {
    pub fn new(camera: &Camera, width: usize, height: usize, near: f32) -> Self {
        Self {
            eye: camera.pos,
            forward: camera.forward(),
            right: camera.right(),
            focal: camera.screen_scale(width),
            width,
            height,
            half_w: width as f32 * 0.5,
            half_h: height as f32 * 0.5,
            horizon: camera.horizon,
            near,
            roll: camera.roll,
        }
    }

    /// World X-Y → (lateral, depth).
    #[inline(always)]
    pub fn to_cam(&self, p: Vec2) -> Vec2 {
        let d = p - self.eye.truncate();
        Vec2::new(d.dot(self.right), d.dot(self.forward))
    }

    #[inline(always)]
    pub fn screen_x(&self, c: Vec2) -> f32 {
        self.half_w + c.x * self.focal / c.y
    }

    /// Screen row of world height `z` seen at `depth`.
    #[inline(always)]
    pub fn screen_y(&self, depth: f32, z: f32) -> f32 {
        self.half_h + self.horizon - (z - self.eye.z) * self.focal / depth
    }

    /// Project a world point; `None` when it sits in front of the near plane.
    pub fn project(&self, p: Vec3) -> Option<(Vec2, f32)> {
        let c = self.to_cam(p.truncate());
        if c.y < self.near {
            return None;
        }
        Some((Vec2::new(self.screen_x(c), self.screen_y(c.y, p.z)), c.y))
    }

    /*──────────────────────────── roll ────────────────────────────*/

    #[inline]
    fn centre(&self) -> Vec2 {
        Vec2::new(self.half_w, self.half_h)
    }

    /// Rotate screen vertices about the viewport centre.
    pub fn roll_polygon(&self, poly: &mut ScreenPoly) {
        if self.roll == 0.0 {
            return;
        }
        let rot = Vec2::from_angle(self.roll);
        let c = self.centre();
        for p in poly.iter_mut() {
            *p = rot.rotate(*p - c) + c;
        }
    }

    /// The plane equation matching [`View::roll_polygon`].
    pub fn roll_plane(&self, eq: &PlaneEquation) -> PlaneEquation {
        if self.roll == 0.0 {
            return *eq;
        }
        let rot = Vec2::from_angle(self.roll);
        let c = self.centre();
        eq.map(|l| {
            let a = Vec2::new(l.dx, l.dy);
            let ra = rot.rotate(a);
            l.with_gradient(ra, l.k + a.dot(c) - ra.dot(c))
        })
    }
}

/// Clip a camera-space segment against `depth >= near`.
///
/// Returns the clipped endpoints and their fractions along the original
/// segment, or `None` if the segment lies wholly behind the plane.
pub fn clip_near(mut p1: Vec2, mut p2: Vec2, near: f32) -> Option<(Vec2, Vec2, f32, f32)> {
    if p1.y < near && p2.y < near {
        return None;
    }
    let (a, b) = (p1, p2);
    let mut t1 = 0.0;
    let mut t2 = 1.0;
    if a.y < near {
        let t = (near - a.y) / (b.y - a.y);
        p1 = a + (b - a) * t;
        p1.y = near;
        t1 = t;
    }
    if b.y < near {
        let t = (near - b.y) / (a.y - b.y);
        p2 = b + (a - b) * t;
        p2.y = near;
        t2 = 1.0 - t;
    }
    Some((p1, p2, t1, t2))
}
