//! Hardware polygon submission.
//!
//! Each clipped polygon becomes a triangle fan whose vertices carry 1/z
//! and u, v evaluated from the surface's plane equation; the GPU does the
//! perspective division. Textures are uploaded once per
//! (texture, palette, flags) combination and cached by handle.

use std::collections::HashMap;

use bitflags::bitflags;
use glam::Vec2;
use smallvec::SmallVec;

use crate::{
    config::RenderConfig,
    engine::PlaneEquation,
    renderer::{BlendMode, Rgba, SurfaceParams, SurfaceRenderer, degenerate},
    world::{
        Availability, PaletteId, Texture, TextureId, TextureSource, texture::SHADE_LEVELS,
    },
};

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct GpuTexFlags: u8 {
        /// upload with index 255 turned into alpha 0
        const MASKED = 0x01;
    }
}

/// Opaque id of an uploaded texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuTexKey {
    pub tex: TextureId,
    pub pal: PaletteId,
    pub flags: GpuTexFlags,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthFunc {
    Always,
    LessEqual,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpuVertex {
    pub pos: Vec2,
    pub inv_z: f32,
    pub uv: Vec2,
}

/// One triangle fan, ready for the GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct GpuPolygon {
    pub vertices: SmallVec<[GpuVertex; 8]>,
    /// `None` draws flat `color`
    pub texture: Option<GpuHandle>,
    pub blend: BlendMode,
    pub depth: DepthFunc,
    pub depth_write: bool,
    /// modulation colour (shade), or the fill colour when untextured
    pub color: Rgba,
}

/// What the GPU side must provide.
pub trait GpuBackend {
    fn begin_frame(&mut self, width: usize, height: usize);

    /// Upload `tex` expanded through `lut` and return its handle.
    fn upload(&mut self, key: GpuTexKey, tex: &Texture, lut: &[Rgba; 256]) -> GpuHandle;

    fn submit(&mut self, poly: GpuPolygon);

    fn present(&mut self);
}

/// Backend that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    pub size: (usize, usize),
    pub frames: u32,
    pub uploads: Vec<GpuTexKey>,
    /// submissions of the current frame
    pub polygons: Vec<GpuPolygon>,
}

impl GpuBackend for CommandRecorder {
    fn begin_frame(&mut self, width: usize, height: usize) {
        self.size = (width, height);
        self.polygons.clear();
    }

    fn upload(&mut self, key: GpuTexKey, _tex: &Texture, _lut: &[Rgba; 256]) -> GpuHandle {
        self.uploads.push(key);
        GpuHandle(self.uploads.len() as u32)
    }

    fn submit(&mut self, poly: GpuPolygon) {
        self.polygons.push(poly);
    }

    fn present(&mut self) {
        self.frames += 1;
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                              Renderer                                */
/*───────────────────────────────────────────────────────────────────────*/

pub struct Hardware<B: GpuBackend> {
    backend: B,
    cache: HashMap<GpuTexKey, GpuHandle>,
    width: usize,
    height: usize,
    sky_color: Rgba,
}

impl<B: GpuBackend> Hardware<B> {
    pub fn new(backend: B, config: &RenderConfig) -> Self {
        Self {
            backend,
            cache: HashMap::new(),
            width: 0,
            height: 0,
            sky_color: config.sky_color,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of textures uploaded so far.
    pub fn cached_textures(&self) -> usize {
        self.cache.len()
    }

    /// Handle for `tex` under `pal`, uploading it on first use.
    /// `None` while the texture is not resident.
    pub fn gpu_handle(
        &mut self,
        textures: &mut dyn TextureSource,
        tex: TextureId,
        pal: PaletteId,
        flags: GpuTexFlags,
    ) -> Option<GpuHandle> {
        let key = GpuTexKey { tex, pal, flags };
        if let Some(&h) = self.cache.get(&key) {
            return Some(h);
        }
        if textures.request(tex, pal) == Availability::Pending {
            return None;
        }
        let pixels = textures.texture(tex)?;
        let lut = textures.shade_lut(pal, 0);
        let handle = self.backend.upload(key, pixels, &lut);
        self.cache.insert(key, handle);
        Some(handle)
    }
}

/// Grey modulation for `shade`: full bright at 0, black at the last level.
fn shade_color(shade: i8) -> Rgba {
    let levels = SHADE_LEVELS as u32;
    let s = (shade.max(0) as u32).min(levels);
    let k = 255 * (levels - s) / levels;
    0xFF00_0000 | k << 16 | k << 8 | k
}

impl<B: GpuBackend> SurfaceRenderer for Hardware<B> {
    fn begin_frame(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.backend.begin_frame(width, height);
    }

    fn fill_polygon(
        &mut self,
        poly: &[Vec2],
        plane: &PlaneEquation,
        surface: &SurfaceParams,
        textures: &mut dyn TextureSource,
    ) {
        if degenerate(poly) {
            return;
        }
        let mut vertices = SmallVec::new();
        for &pos in poly {
            let Some((depth, u, v)) = plane.eval(pos) else {
                return;
            };
            vertices.push(GpuVertex {
                pos,
                inv_z: 1.0 / depth,
                uv: Vec2::new(u, v),
            });
        }

        let flags = if surface.blend == BlendMode::Opaque {
            GpuTexFlags::empty()
        } else {
            GpuTexFlags::MASKED
        };
        let Some(handle) = self.gpu_handle(textures, surface.tex, surface.pal, flags) else {
            return;
        };
        self.backend.submit(GpuPolygon {
            vertices,
            texture: Some(handle),
            blend: surface.blend,
            depth: DepthFunc::LessEqual,
            depth_write: surface.blend.writes_depth(),
            color: shade_color(surface.shade),
        });
    }

    fn fill_sky(&mut self, poly: &[Vec2]) {
        if degenerate(poly) {
            return;
        }
        let vertices = poly
            .iter()
            .map(|&pos| GpuVertex {
                pos,
                inv_z: 0.0,
                uv: Vec2::ZERO,
            })
            .collect();
        self.backend.submit(GpuPolygon {
            vertices,
            texture: None,
            blend: BlendMode::Opaque,
            depth: DepthFunc::Always,
            depth_write: false,
            color: self.sky_color,
        });
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        self.backend.present();
        submit(&[], self.width, self.height);
    }
}
