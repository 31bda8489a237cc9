use glam::{Vec2, Vec3};

/// Player view-point in world space.
///
/// * `pos.z` is the absolute eye height.
/// * Looking up/down is a y-shear of the screen (`horizon`, in pixels),
///   not a true pitch, so walls stay vertical on screen.
/// * `roll` tilts the final image around the screen centre.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub pos: Vec3,
    /// radians (0 = east, counter-clockwise)
    pub yaw: f32,
    /// vertical screen offset of the horizon, pixels (+ = look down)
    pub horizon: f32,
    /// radians
    pub roll: f32,
    /// horizontal FoV (radians)
    pub fov: f32,
}

impl Camera {
    /// Create a new camera at `pos`, facing `yaw`, with horizontal FoV `fov`.
    pub fn new(pos: Vec3, yaw: f32, fov: f32) -> Self {
        Self {
            pos,
            yaw,
            horizon: 0.0,
            roll: 0.0,
            fov,
        }
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit vector pointing where the camera looks on the X-Y plane.
    #[inline(always)]
    pub fn forward(&self) -> Vec2 {
        let (s, c) = self.yaw.sin_cos();
        Vec2::new(c, s)
    }

    /// Unit vector pointing to the camera's right on the X-Y plane.
    #[inline(always)]
    pub fn right(&self) -> Vec2 {
        let (s, c) = self.yaw.sin_cos();
        Vec2::new(s, -c)
    }

    /// Transform an X–Y point `p` into camera-local coords:
    ///  .x = lateral offset (+ right)
    ///  .y = depth along forward axis
    #[inline]
    pub fn to_cam(&self, p: Vec2) -> Vec2 {
        let d = p - self.pos.truncate();
        Vec2::new(d.dot(self.right()), d.dot(self.forward()))
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Move by `forward` units and `side` (strafe), preserving eye height.
    pub fn step(&mut self, forward: f32, side: f32) {
        let f = self.forward();
        let r = self.right();
        self.pos.x += f.x * forward + r.x * side;
        self.pos.y += f.y * forward + r.y * side;
    }

    /// Rotate around Z-axis (positive = turn left).
    pub fn turn(&mut self, delta_yaw: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
    }

    /// Shift the horizon, clamped to `±limit` pixels.
    pub fn look(&mut self, delta: f32, limit: f32) {
        self.horizon = (self.horizon + delta).clamp(-limit, limit);
    }

    /*───────────────── projection helpers ─────────────────*/

    /// Pixel-per-map-unit scale for viewport width `w`.
    ///
    /// ```text
    /// focal = w / (2 * tan(fov/2))
    /// ```
    #[inline]
    pub fn screen_scale(&self, w: usize) -> f32 {
        (w as f32) * 0.5 / (self.fov * 0.5).tan()
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
