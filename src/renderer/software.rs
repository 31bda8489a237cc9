//! ---------------------------------------------------------------------------
//! Software (CPU) polygon rasterizer
//!
//! * Fills a `Vec<u32>` frame-buffer in **0xAARRGGBB** format.
//! * Convex polygons are walked scanline by scanline at pixel centres.
//! * 1/z steps linearly along a row; u and v are divided out exactly every
//!   `1 << shift` pixels and interpolated linearly in between.
//! * A scratch 1/z buffer backs the permissive (`>=`) depth test used by
//!   masked walls and sprites.
//! ---------------------------------------------------------------------------

use glam::Vec2;

use crate::{
    config::RenderConfig,
    engine::PlaneEquation,
    renderer::{BlendMode, Rgba, SurfaceParams, SurfaceRenderer, degenerate},
    world::{Availability, TRANSPARENT_INDEX, Texture, TextureSource},
};

/*───────────────────────────────────────────────────────────────────────*/
/*                              Backend                                 */
/*───────────────────────────────────────────────────────────────────────*/

pub struct Software {
    scratch: Vec<Rgba>,
    /// 1/z of the nearest opaque pixel, 0 = nothing drawn
    depth: Vec<f32>,
    width: usize,
    height: usize,

    shift: u32,
    depth_test: bool,
    sky_color: Rgba,
    clear_color: Rgba,
}

impl Default for Software {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

impl Software {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            scratch: Vec::new(),
            depth: Vec::new(),
            width: 0,
            height: 0,
            shift: config.hyperbolic_shift,
            depth_test: config.depth_test,
            sky_color: config.sky_color,
            clear_color: config.clear_color,
        }
    }

    /// The frame drawn so far.
    pub fn pixels(&self) -> &[Rgba] {
        &self.scratch
    }

    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl SurfaceRenderer for Software {
    fn begin_frame(&mut self, w: usize, h: usize) {
        // (re)allocate if resolution changed
        if w != self.width || h != self.height {
            self.width = w;
            self.height = h;
            self.scratch.resize(w * h, 0);
            self.depth.resize(w * h, 0.0);
        }
        self.scratch.fill(self.clear_color);
        self.depth.fill(0.0);
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
        if textures.request(surface.tex, surface.pal) == Availability::Pending {
            return;
        }
        let Some(tex) = textures.texture(surface.tex) else {
            return;
        };
        let lut = textures.shade_lut(surface.pal, surface.shade.max(0) as u8);

        let span = Span {
            plane,
            tex,
            lut: &lut,
            blend: surface.blend,
            run: 1 << self.shift,
            depth_test: self.depth_test,
        };
        let (w, h) = (self.width, self.height);
        let (scratch, depth) = (&mut self.scratch, &mut self.depth);
        scan_rows(poly, w, h, |y, x0, x1| {
            let row = y * w;
            span.draw(
                y,
                x0,
                &mut scratch[row + x0..row + x1],
                &mut depth[row + x0..row + x1],
            );
        });
    }

    fn fill_sky(&mut self, poly: &[Vec2]) {
        if degenerate(poly) {
            return;
        }
        let (w, h, color) = (self.width, self.height, self.sky_color);
        let scratch = &mut self.scratch;
        scan_rows(poly, w, h, |y, x0, x1| {
            scratch[y * w + x0..y * w + x1].fill(color);
        });
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        submit(&self.scratch, self.width, self.height);
    }
}

/*──────────────────────── polygon walking ────────────────────────────*/

/// Call `row(y, x0, x1)` for every pixel row the convex `poly` covers,
/// `x0..x1` being the pixels whose centres lie inside.
fn scan_rows(poly: &[Vec2], width: usize, height: usize, mut row: impl FnMut(usize, usize, usize)) {
    let (mut y_min, mut y_max) = (f32::INFINITY, f32::NEG_INFINITY);
    for p in poly {
        y_min = y_min.min(p.y);
        y_max = y_max.max(p.y);
    }
    let first = ((y_min - 0.5).ceil().max(0.0)) as usize;
    let last = ((y_max - 0.5).ceil().min(height as f32)).max(0.0) as usize;

    for y in first..last {
        let yc = y as f32 + 0.5;
        let (mut xl, mut xr) = (f32::INFINITY, f32::NEG_INFINITY);
        for (i, a) in poly.iter().enumerate() {
            let b = poly[(i + 1) % poly.len()];
            let (lo, hi) = if a.y <= b.y { (*a, b) } else { (b, *a) };
            if yc < lo.y || yc >= hi.y {
                continue;
            }
            let x = lo.x + (yc - lo.y) * (hi.x - lo.x) / (hi.y - lo.y);
            xl = xl.min(x);
            xr = xr.max(x);
        }
        if !(xl < xr) {
            continue;
        }
        let x0 = (xl - 0.5).ceil().clamp(0.0, width as f32) as usize;
        let x1 = (xr - 0.5).ceil().clamp(0.0, width as f32) as usize;
        if x0 < x1 {
            row(y, x0, x1);
        }
    }
}

/*──────────────────────── span rendering ─────────────────────────────*/

/// Per-polygon constants shared by all its rows.
struct Span<'a> {
    plane: &'a PlaneEquation,
    tex: &'a Texture,
    lut: &'a [Rgba; 256],
    blend: BlendMode,
    run: usize,
    depth_test: bool,
}

impl Span<'_> {
    /// Draw pixels `x0..x0 + dst.len()` of row `y`.
    fn draw(&self, y: usize, x0: usize, dst: &mut [Rgba], depth: &mut [f32]) {
        let p = Vec2::new(x0 as f32 + 0.5, y as f32 + 0.5);
        let eq = self.plane;
        let (mut iz, mut uz, mut vz) = (eq.inv_z.eval(p), eq.u_z.eval(p), eq.v_z.eval(p));
        let (diz, duz, dvz) = (eq.inv_z.dx, eq.u_z.dx, eq.v_z.dx);

        let mut x = 0;
        while x < dst.len() {
            let n = self.run.min(dst.len() - x);
            let nf = n as f32;
            let (iz1, uz1, vz1) = (iz + diz * nf, uz + duz * nf, vz + dvz * nf);

            if iz > 0.0 && iz1 > 0.0 {
                let (u0, v0) = (uz / iz, vz / iz);
                let (du, dv) = ((uz1 / iz1 - u0) / nf, (vz1 / iz1 - v0) / nf);
                let (mut u, mut v, mut z) = (u0, v0, iz);
                for i in x..x + n {
                    self.plot(&mut dst[i], &mut depth[i], z, u, v);
                    u += du;
                    v += dv;
                    z += diz;
                }
            } else {
                // run straddles the eye plane: divide every pixel
                let (mut z, mut zu, mut zv) = (iz, uz, vz);
                for i in x..x + n {
                    if z > 0.0 {
                        self.plot(&mut dst[i], &mut depth[i], z, zu / z, zv / z);
                    }
                    z += diz;
                    zu += duz;
                    zv += dvz;
                }
            }

            iz = iz1;
            uz = uz1;
            vz = vz1;
            x += n;
        }
    }

    #[inline(always)]
    fn plot(&self, dst: &mut Rgba, depth: &mut f32, iz: f32, u: f32, v: f32) {
        if self.depth_test && iz < *depth {
            return;
        }
        let texel = self.tex.texel(u, v);
        if texel == TRANSPARENT_INDEX && self.blend != BlendMode::Opaque {
            return;
        }
        let src = self.lut[texel as usize];
        *dst = match self.blend {
            BlendMode::Opaque | BlendMode::Masked => src,
            BlendMode::Translucent => mix_thirds(src, *dst, 1),
            BlendMode::TranslucentInv => mix_thirds(src, *dst, 2),
        };
        if self.blend.writes_depth() {
            *depth = iz;
        }
    }
}

/// `src * w/3 + dst * (3-w)/3` per channel; alpha forced opaque.
#[inline(always)]
fn mix_thirds(src: Rgba, dst: Rgba, w: u32) -> Rgba {
    let ch = |shift: u32| {
        let s = (src >> shift) & 0xFF;
        let d = (dst >> shift) & 0xFF;
        ((s * w + d * (3 - w)) / 3) << shift
    };
    0xFF00_0000 | ch(16) | ch(8) | ch(0)
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::PlanePoint,
        world::{PaletteId, TextureId},
    };
    use glam::vec2;

    /* tiny helpers ---------------------------------------------------*/

    /// One texture, identity-ish colours: index `i` maps to `0xFF0000ii`.
    struct OneTex {
        tex: Texture,
        ready: bool,
    }

    impl OneTex {
        fn solid(idx: u8) -> Self {
            Self {
                tex: Texture {
                    name: "T".into(),
                    w: 4,
                    h: 4,
                    pixels: vec![idx; 16],
                },
                ready: true,
            }
        }
    }

    impl TextureSource for OneTex {
        fn request(&mut self, _: TextureId, _: PaletteId) -> Availability {
            if self.ready {
                Availability::Ready
            } else {
                Availability::Pending
            }
        }

        fn texture(&self, _: TextureId) -> Option<&Texture> {
            Some(&self.tex)
        }

        fn shade_lut(&self, _: PaletteId, _: u8) -> [Rgba; 256] {
            std::array::from_fn(|i| 0xFF00_0000 | i as u32)
        }
    }

    fn flat(depth: f32) -> PlaneEquation {
        PlaneEquation::from_points(&[
            PlanePoint::new(vec2(0.0, 0.0), depth, 0.0, 0.0),
            PlanePoint::new(vec2(8.0, 0.0), depth, 8.0, 0.0),
            PlanePoint::new(vec2(0.0, 8.0), depth, 0.0, 8.0),
        ])
        .unwrap()
    }

    fn square(x: f32, y: f32, s: f32) -> [Vec2; 4] {
        [vec2(x, y), vec2(x + s, y), vec2(x + s, y + s), vec2(x, y + s)]
    }

    fn params(blend: BlendMode) -> SurfaceParams {
        SurfaceParams {
            tex: 1,
            pal: 0,
            shade: 0,
            blend,
        }
    }

    fn frame() -> Software {
        let cfg = RenderConfig {
            clear_color: 0xFF00_0000,
            sky_color: 0xFF12_3456,
            ..Default::default()
        };
        let mut sw = Software::new(&cfg);
        sw.begin_frame(16, 16);
        sw
    }

    fn painted(sw: &Software) -> usize {
        sw.pixels().iter().filter(|&&c| c != 0xFF00_0000).count()
    }

    #[test]
    fn square_covers_its_pixel_centres() {
        let mut sw = frame();
        let mut tex = OneTex::solid(7);
        sw.fill_polygon(&square(2.0, 2.0, 4.0), &flat(1.0), &params(BlendMode::Opaque), &mut tex);
        assert_eq!(painted(&sw), 16);
        assert_eq!(sw.pixels()[2 * 16 + 2], 0xFF00_0007);
        assert_eq!(sw.pixels()[6 * 16 + 6], 0xFF00_0000);
        assert_eq!(sw.depth()[3 * 16 + 3], 1.0);
    }

    #[test]
    fn degenerate_and_pending_draw_nothing() {
        let mut sw = frame();
        let mut tex = OneTex::solid(7);
        let eq = flat(1.0);
        let p = params(BlendMode::Opaque);
        sw.fill_polygon(&[vec2(0.0, 0.0), vec2(8.0, 8.0)], &eq, &p, &mut tex);
        sw.fill_polygon(&[vec2(0.0, 0.0), vec2(4.0, 4.0), vec2(8.0, 8.0)], &eq, &p, &mut tex);
        tex.ready = false;
        sw.fill_polygon(&square(0.0, 0.0, 8.0), &eq, &p, &mut tex);
        assert_eq!(painted(&sw), 0);
    }

    #[test]
    fn masked_skips_transparent_texels() {
        let mut sw = frame();
        let mut tex = OneTex::solid(TRANSPARENT_INDEX);
        sw.fill_polygon(&square(0.0, 0.0, 8.0), &flat(1.0), &params(BlendMode::Masked), &mut tex);
        assert_eq!(painted(&sw), 0);
        // nothing drawn, nothing occludes
        assert!(sw.depth().iter().all(|&z| z == 0.0));
        sw.fill_polygon(&square(0.0, 0.0, 8.0), &flat(1.0), &params(BlendMode::Opaque), &mut tex);
        assert_eq!(painted(&sw), 64);
    }

    #[test]
    fn translucent_ratios() {
        let mut sw = frame();
        let mut tex = OneTex::solid(0x90);
        sw.fill_polygon(&square(0.0, 0.0, 4.0), &flat(1.0), &params(BlendMode::Translucent), &mut tex);
        sw.fill_polygon(&square(8.0, 0.0, 4.0), &flat(1.0), &params(BlendMode::TranslucentInv), &mut tex);
        assert_eq!(sw.pixels()[0], 0xFF00_0030);
        assert_eq!(sw.pixels()[8], 0xFF00_0060);
        // translucent surfaces leave depth alone
        assert_eq!(sw.depth()[0], 0.0);
    }

    #[test]
    fn depth_test_keeps_the_nearer_surface() {
        let mut sw = frame();
        let mut far = OneTex::solid(1);
        let mut near = OneTex::solid(2);
        let p = params(BlendMode::Opaque);
        sw.fill_polygon(&square(0.0, 0.0, 8.0), &flat(10.0), &p, &mut far);
        sw.fill_polygon(&square(0.0, 0.0, 8.0), &flat(2.0), &p, &mut near);
        sw.fill_polygon(&square(0.0, 0.0, 8.0), &flat(10.0), &p, &mut far);
        assert_eq!(sw.pixels()[4 * 16 + 4], 0xFF00_0002);
    }

    #[test]
    fn hyperbolic_runs_track_perspective() {
        // depth grows left to right; u is exact at run boundaries and
        // never strays far in between
        let eq = PlaneEquation::from_points(&[
            PlanePoint::new(vec2(0.0, 0.0), 1.0, 0.0, 0.0),
            PlanePoint::new(vec2(16.0, 0.0), 2.0, 64.0, 0.0),
            PlanePoint::new(vec2(0.0, 16.0), 1.0, 0.0, 16.0),
        ])
        .unwrap();
        let tex = Texture {
            name: "RAMP".into(),
            w: 256,
            h: 1,
            pixels: (0..=255).collect(),
        };
        let lut: [Rgba; 256] = std::array::from_fn(|i| i as u32);
        let span = Span {
            plane: &eq,
            tex: &tex,
            lut: &lut,
            blend: BlendMode::Opaque,
            run: 4,
            depth_test: false,
        };
        let mut dst = [0; 16];
        let mut depth = [0.0; 16];
        span.draw(0, 0, &mut dst, &mut depth);
        for (x, &c) in dst.iter().enumerate() {
            let (_, u, _) = eq.eval(vec2(x as f32 + 0.5, 0.5)).unwrap();
            assert!((c as f32 - u.floor()).abs() <= 3.0, "x {x}: {c} vs {u}");
        }
        assert!(dst[15] > dst[8]);
    }

    #[test]
    fn sky_fill_ignores_depth() {
        let mut sw = frame();
        sw.fill_sky(&square(0.0, 0.0, 2.0));
        assert_eq!(sw.pixels()[0], 0xFF12_3456);
        assert_eq!(sw.depth()[0], 0.0);
        let mut seen = None;
        sw.end_frame(|fb, w, h| seen = Some((fb.len(), w, h)));
        assert_eq!(seen, Some((256, 16, 16)));
    }
}
