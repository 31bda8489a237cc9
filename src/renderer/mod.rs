//! Rendering abstraction layer.
//!
//! *The visibility core never touches a pixel buffer directly.*
//! It hands screen-space polygons, each carrying the plane equation that
//! maps it to depth and texture, to a type that implements
//! [`SurfaceRenderer`].
//!
//! * [`software::Software`] rasterizes into a CPU frame-buffer.
//! * [`hardware::Hardware`] turns every polygon into a triangle fan for a
//!   [`hardware::GpuBackend`].
//!
//! [`Backend`] picks one of the two at run time.

use glam::Vec2;
use smallvec::SmallVec;

use crate::{
    engine::PlaneEquation,
    world::{PaletteId, TextureId, TextureSource},
};

pub mod hardware;
pub mod software;

/// Pixel format of the software frame-buffer (0xAARRGGBB).
pub type Rgba = u32;

/// Screen-space convex polygon, clockwise on screen.
pub type ScreenPoly = SmallVec<[Vec2; 8]>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// texel [`TRANSPARENT_INDEX`](crate::world::TRANSPARENT_INDEX) is skipped
    Masked,
    /// one third surface, two thirds background
    Translucent,
    /// two thirds surface, one third background
    TranslucentInv,
}

impl BlendMode {
    #[inline]
    pub fn writes_depth(self) -> bool {
        matches!(self, BlendMode::Opaque | BlendMode::Masked)
    }
}

/// Texture, palette and lighting of one drawn surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceParams {
    pub tex: TextureId,
    pub pal: PaletteId,
    /// 0 = full bright, larger = darker
    pub shade: i8,
    pub blend: BlendMode,
}

/// Region emitted by the span clipper: left and right sides vertical,
/// top and bottom straight lines given by their heights at `x0` and `x1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trapezoid {
    pub x0: f32,
    pub x1: f32,
    pub top: [f32; 2],
    pub bottom: [f32; 2],
}

impl Trapezoid {
    /// Corner list, clockwise on screen, with collapsed corners removed.
    pub fn to_polygon(&self) -> ScreenPoly {
        let mut poly = ScreenPoly::new();
        for p in [
            Vec2::new(self.x0, self.top[0]),
            Vec2::new(self.x1, self.top[1]),
            Vec2::new(self.x1, self.bottom[1]),
            Vec2::new(self.x0, self.bottom[0]),
        ] {
            if poly.last() != Some(&p) {
                poly.push(p);
            }
        }
        if poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        poly
    }
}

/// Fewer than three vertices or no area.
pub(crate) fn degenerate(poly: &[Vec2]) -> bool {
    if poly.len() < 3 {
        return true;
    }
    let mut area2 = 0.0;
    for (i, a) in poly.iter().enumerate() {
        let b = poly[(i + 1) % poly.len()];
        area2 += a.perp_dot(b);
    }
    !(area2.abs() > 1e-6)
}

/// A renderer that owns its scratch for the whole frame.
///
/// `end_frame` hands the finished buffer to a user-supplied closure.
/// Software callers typically forward it to their window-manager;
/// GPU back-ends can ignore the slice because they never allocate it.
pub trait SurfaceRenderer {
    /// (Re)allocate internal scratch for the requested resolution and clear it.
    fn begin_frame(&mut self, width: usize, height: usize);

    /// Draw one convex polygon mapped by `plane`.
    ///
    /// Polygons with fewer than three vertices or zero area draw nothing,
    /// as do surfaces whose texture is not resident yet.
    fn fill_polygon(
        &mut self,
        poly: &[Vec2],
        plane: &PlaneEquation,
        surface: &SurfaceParams,
        textures: &mut dyn TextureSource,
    );

    /// Draw a clipper trapezoid; the default turns it into a polygon.
    fn fill_trapezoid(
        &mut self,
        trap: &Trapezoid,
        plane: &PlaneEquation,
        surface: &SurfaceParams,
        textures: &mut dyn TextureSource,
    ) {
        self.fill_polygon(&trap.to_polygon(), plane, surface, textures);
    }

    /// Flat sky colour over `poly`; no depth is written.
    fn fill_sky(&mut self, poly: &[Vec2]);

    /// Finish the frame and **loan** the finished buffer to `submit`.
    ///
    /// * `submit(&[Rgba], w, h)` is run exactly once per frame.
    /// * GPU back-ends call it with an empty slice.
    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize);
}

/// Which rasterization path to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    #[default]
    Software,
    Hardware,
}

/// Run-time choice between the two paths.
pub enum Backend {
    Software(software::Software),
    Hardware(hardware::Hardware<hardware::CommandRecorder>),
}

impl Backend {
    pub fn new(kind: BackendKind, config: &crate::config::RenderConfig) -> Self {
        match kind {
            BackendKind::Software => Backend::Software(software::Software::new(config)),
            BackendKind::Hardware => Backend::Hardware(hardware::Hardware::new(
                hardware::CommandRecorder::default(),
                config,
            )),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Software(_) => BackendKind::Software,
            Backend::Hardware(_) => BackendKind::Hardware,
        }
    }
}

impl SurfaceRenderer for Backend {
    fn begin_frame(&mut self, width: usize, height: usize) {
        match self {
            Backend::Software(r) => r.begin_frame(width, height),
            Backend::Hardware(r) => r.begin_frame(width, height),
        }
    }

    fn fill_polygon(
        &mut self,
        poly: &[Vec2],
        plane: &PlaneEquation,
        surface: &SurfaceParams,
        textures: &mut dyn TextureSource,
    ) {
        match self {
            Backend::Software(r) => r.fill_polygon(poly, plane, surface, textures),
            Backend::Hardware(r) => r.fill_polygon(poly, plane, surface, textures),
        }
    }

    fn fill_sky(&mut self, poly: &[Vec2]) {
        match self {
            Backend::Software(r) => r.fill_sky(poly),
            Backend::Hardware(r) => r.fill_sky(poly),
        }
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        match self {
            Backend::Software(r) => r.end_frame(submit),
            Backend::Hardware(r) => r.end_frame(submit),
        }
    }
}
