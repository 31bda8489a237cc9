// Format-agnostic repository of paletted textures.
// The renderer and world logic interact through `TextureId` only.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use once_cell::sync::Lazy;

use crate::renderer::Rgba;

/// Runtime handle for a texture in this bank.
///
/// *Guaranteed* to remain stable for the lifetime of the bank.
pub type TextureId = u16;

/// Index of a shading table set (a "palookup").
pub type PaletteId = u8;

/// `TextureId` whose pixels are the checkerboard fallback.
/// Always = 0 because `TextureBank::new()` inserts it first.
pub const NO_TEXTURE: TextureId = 0;

/// Texel value skipped by the masked and translucent blend modes.
pub const TRANSPARENT_INDEX: u8 = 255;

/// Number of darkening steps in a [`Colormap`].
pub const SHADE_LEVELS: usize = 32;

/// CPU-side storage: 8-bit palette indices in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<u8>,
}

/// Convenience checkerboard 8×8 (dark/light grey).
impl Default for Texture {
    fn default() -> Self {
        const LIGHT_IDX: u8 = 0xB6;
        const DARK_IDX: u8 = 0x49;
        let mut pix = vec![0u8; 8 * 8];
        for y in 0..8 {
            for x in 0..8 {
                pix[y * 8 + x] = if (x ^ y) & 1 == 0 { LIGHT_IDX } else { DARK_IDX };
            }
        }
        Texture {
            name: "CHECKER".to_string(),
            w: 8,
            h: 8,
            pixels: pix,
        }
    }
}

impl Texture {
    /// Texel at (`u`, `v`), wrapping in both directions.
    #[inline(always)]
    pub fn texel(&self, u: f32, v: f32) -> u8 {
        let x = (u.floor() as i32).rem_euclid(self.w as i32) as usize;
        let y = (v.floor() as i32).rem_euclid(self.h as i32) as usize;
        self.pixels[y * self.w + x]
    }
}

/// Things that can go wrong when using the bank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second texture with an existing name.
    #[error("texture name `{0}` already present in bank")]
    Duplicate(String),

    /// Requested ID is outside `0 .. bank.len()`.
    #[error("texture id {0} out of range")]
    BadId(TextureId),

    /// Requested palette has no shading tables.
    #[error("palette {0} not registered")]
    BadPalette(PaletteId),

    /// Loader could not produce pixels for a lazily registered texture.
    #[error("failed to load texture `{name}`: {reason}")]
    Load { name: String, reason: String },

    /// Pixel buffer does not match the declared size.
    #[error("texture `{0}` has inconsistent dimensions")]
    Dimensions(String),
}

pub struct Palette(pub [u32; 256]);

/// 3-3-2 RGB cube; good enough for tests and the demo map.
static DEFAULT_PALETTE: Lazy<Palette> = Lazy::new(|| {
    let mut pal = [0u32; 256];
    for (i, c) in pal.iter_mut().enumerate() {
        let r = ((i >> 5) & 7) as u32 * 255 / 7;
        let g = ((i >> 2) & 7) as u32 * 255 / 7;
        let b = (i & 3) as u32 * 255 / 3;
        *c = 0xFF00_0000 | (r << 16) | (g << 8) | b;
    }
    Palette(pal)
});

/// Shading tables matching [`DEFAULT_PALETTE`]: every shade maps a texel to
/// the nearest palette entry of the darkened colour.
static DEFAULT_COLORMAP: Lazy<Colormap> = Lazy::new(|| Colormap::darkening(&DEFAULT_PALETTE));

impl Default for Palette {
    fn default() -> Self {
        Palette(DEFAULT_PALETTE.0)
    }
}
impl Index<usize> for Palette {
    type Output = u32;
    fn index(&self, idx: usize) -> &u32 {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Palette {
    fn index_mut(&mut self, idx: usize) -> &mut u32 {
        &mut self.0[idx]
    }
}

#[derive(Clone)]
pub struct Colormap(pub [[u8; 256]; SHADE_LEVELS]);

impl Default for Colormap {
    fn default() -> Self {
        DEFAULT_COLORMAP.clone()
    }
}
impl Index<usize> for Colormap {
    type Output = [u8; 256];
    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Colormap {
    fn index_mut(&mut self, idx: usize) -> &mut [u8; 256] {
        &mut self.0[idx]
    }
}

impl Colormap {
    /// Build shade tables for `palette` by nearest-colour search.
    pub fn darkening(palette: &Palette) -> Self {
        let rgb = |c: u32| [(c >> 16) & 0xFF, (c >> 8) & 0xFF, c & 0xFF].map(|v| v as i32);
        let mut map = [[0u8; 256]; SHADE_LEVELS];
        for (shade, table) in map.iter_mut().enumerate() {
            let keep = (SHADE_LEVELS - shade) as i32;
            for (i, out) in table.iter_mut().enumerate() {
                let want = rgb(palette[i]).map(|v| v * keep / SHADE_LEVELS as i32);
                let mut best = (i32::MAX, i as u8);
                for (j, &c) in palette.0.iter().enumerate() {
                    if j == TRANSPARENT_INDEX as usize {
                        continue;
                    }
                    let have = rgb(c);
                    let d = (0..3).map(|k| (want[k] - have[k]).pow(2)).sum::<i32>();
                    if d < best.0 {
                        best = (d, j as u8);
                    }
                }
                *out = best.1;
            }
            table[TRANSPARENT_INDEX as usize] = TRANSPARENT_INDEX;
        }
        Colormap(map)
    }
}

/// Result of asking a [`TextureSource`] for pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Ready,
    /// Not resident yet; the surface is skipped this frame.
    Pending,
}

/// What the rasterizers need from the resource manager.
pub trait TextureSource {
    /// Make `id` resident if possible. Loading is synchronous: when this
    /// returns `Ready`, [`TextureSource::texture`] yields the pixels.
    fn request(&mut self, id: TextureId, pal: PaletteId) -> Availability;

    fn texture(&self, id: TextureId) -> Option<&Texture>;

    /// 256-entry colour lookup for one palette/shade combination.
    fn shade_lut(&self, pal: PaletteId, shade: u8) -> [Rgba; 256];
}

/// Produces pixels for textures registered with
/// [`TextureBank::register_lazy`].
pub trait TextureLoader {
    fn load(&mut self, name: &str) -> Result<Texture, TextureError>;
}

enum Slot {
    Resident(Texture),
    Unloaded(String),
    /// Load failed once; the checkerboard stands in from now on.
    Failed,
}

/// A palette-agnostic cache of textures.
///
/// * Stores exactly one copy of every name.
/// * ID **0** is always the “missing” checkerboard.
/// * Textures may be registered lazily and are loaded the first time a
///   surface asks for them.
///
/// **Thread-safety:** access `TextureBank` from a single thread.
pub struct TextureBank {
    by_name: HashMap<String, TextureId>,
    data: Vec<Slot>,
    palette: Palette,
    colormaps: Vec<Colormap>,
    loader: Option<Box<dyn TextureLoader>>,
}

impl TextureBank {
    // ---------------------------------------------------------------------
    // Constructors
    // ---------------------------------------------------------------------

    /// Create an empty bank with a mandatory *missing* texture used as
    /// fallback.  The texture is inserted under the fixed name `"MISSING"`
    /// and obtains the handle **0**.
    pub fn new(missing_tex: Texture) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("MISSING".into(), NO_TEXTURE);
        Self {
            by_name,
            data: vec![Slot::Resident(missing_tex)],
            palette: Palette::default(),
            colormaps: vec![Colormap::default()],
            loader: None,
        }
    }

    pub fn default_with_checker() -> Self {
        Self::new(Texture::default())
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// Replace the shading tables of palette 0.
    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormaps[0] = colormap;
    }

    /// Register an extra shading table set; returns its palette id.
    pub fn add_palookup(&mut self, colormap: Colormap) -> PaletteId {
        self.colormaps.push(colormap);
        (self.colormaps.len() - 1) as PaletteId
    }

    pub fn set_loader(&mut self, loader: Box<dyn TextureLoader>) {
        self.loader = Some(loader);
    }

    pub fn get_color(&self, pal: PaletteId, shade_idx: u8, texel: u8) -> u32 {
        let map = self.colormaps.get(pal as usize).unwrap_or(&self.colormaps[0]);
        let shade = (shade_idx as usize).min(SHADE_LEVELS - 1);
        self.palette[map[shade][texel as usize] as usize]
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    /// Number of textures stored (including the “missing” one).
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    } // only checker

    /// Obtain the id for a registered texture by name.
    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    /// Fallback-safe query: unknown names resolve to the checkerboard id.
    pub fn id_or_missing(&self, name: &str) -> TextureId {
        self.id(name).unwrap_or(NO_TEXTURE)
    }

    /// Borrow a resident texture by id.
    pub fn texture(&self, id: TextureId) -> Result<&Texture, TextureError> {
        match self.data.get(id as usize) {
            Some(Slot::Resident(t)) => Ok(t),
            Some(Slot::Failed) => self.texture(NO_TEXTURE),
            Some(Slot::Unloaded(_)) | None => Err(TextureError::BadId(id)),
        }
    }

    pub fn is_resident(&self, id: TextureId) -> bool {
        matches!(self.data.get(id as usize), Some(Slot::Resident(_)))
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert a texture under `name`.
    ///
    /// * Returns the newly assigned `TextureId`.
    /// * Fails if the name already exists (`Duplicate`).
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        tex: Texture,
    ) -> Result<TextureId, TextureError> {
        let name = name.into();
        if tex.w == 0 || tex.h == 0 || tex.pixels.len() != tex.w * tex.h {
            return Err(TextureError::Dimensions(name));
        }
        let id = self.reserve(&name)?;
        self.data.push(Slot::Resident(tex));
        Ok(id)
    }

    /// Register `name` without pixels; the attached loader fills it in on
    /// first use.
    pub fn register_lazy<S: Into<String>>(&mut self, name: S) -> Result<TextureId, TextureError> {
        let name = name.into();
        let id = self.reserve(&name)?;
        self.data.push(Slot::Unloaded(name));
        Ok(id)
    }

    fn reserve(&mut self, name: &str) -> Result<TextureId, TextureError> {
        if self.by_name.contains_key(name) {
            return Err(TextureError::Duplicate(name.to_string()));
        }
        let id = self.data.len() as TextureId;
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Load every listed texture now so the frame never stalls on I/O.
    pub fn prefetch(&mut self, ids: impl IntoIterator<Item = TextureId>) {
        for id in ids {
            self.ensure_loaded(id);
        }
    }

    fn ensure_loaded(&mut self, id: TextureId) -> Availability {
        let name = match self.data.get(id as usize) {
            Some(Slot::Resident(_)) | Some(Slot::Failed) => return Availability::Ready,
            Some(Slot::Unloaded(name)) => name.clone(),
            None => return Availability::Pending,
        };
        let Some(loader) = self.loader.as_mut() else {
            return Availability::Pending;
        };
        self.data[id as usize] = match loader.load(&name) {
            Ok(tex) if tex.w > 0 && tex.h > 0 && tex.pixels.len() == tex.w * tex.h => {
                Slot::Resident(tex)
            }
            Ok(_) => {
                log::warn!("{}", TextureError::Dimensions(name));
                Slot::Failed
            }
            Err(err) => {
                log::warn!("{err}");
                Slot::Failed
            }
        };
        Availability::Ready
    }
}

impl TextureSource for TextureBank {
    fn request(&mut self, id: TextureId, _pal: PaletteId) -> Availability {
        self.ensure_loaded(id)
    }

    fn texture(&self, id: TextureId) -> Option<&Texture> {
        TextureBank::texture(self, id).ok()
    }

    fn shade_lut(&self, pal: PaletteId, shade: u8) -> [Rgba; 256] {
        let mut lut = [0; 256];
        for (i, c) in lut.iter_mut().enumerate() {
            *c = self.get_color(pal, shade, i as u8);
        }
        lut
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_tex(color: u8) -> Texture {
        Texture {
            name: "Dummy".to_string(),
            w: 2,
            h: 2,
            pixels: vec![color; 4],
        }
    }

    struct SolidLoader;
    impl TextureLoader for SolidLoader {
        fn load(&mut self, name: &str) -> Result<Texture, TextureError> {
            if name == "BROKEN" {
                return Err(TextureError::Load {
                    name: name.into(),
                    reason: "no such file".into(),
                });
            }
            Ok(dummy_tex(7))
        }
    }

    #[test]
    fn insert_and_lookup() {
        let mut bank = TextureBank::default_with_checker();
        let red = bank.insert("RED", dummy_tex(0x00)).unwrap();
        let blue = bank.insert("BLUE", dummy_tex(0xFF)).unwrap();

        assert_ne!(red, NO_TEXTURE);
        assert_ne!(blue, red);
        assert_eq!(bank.id("RED"), Some(red));
        assert_eq!(bank.id("NOPE"), None);

        assert_eq!(bank.texture(red).unwrap().pixels[0], 0x00);
        assert_eq!(bank.texture(blue).unwrap().pixels[0], 0xFF);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut bank = TextureBank::default_with_checker();
        bank.insert("WOOD", dummy_tex(1)).unwrap();
        let err = bank.insert("WOOD", dummy_tex(2)).unwrap_err();
        assert_eq!(err, TextureError::Duplicate("WOOD".into()));
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn bad_id_guard() {
        let bank = TextureBank::default_with_checker();
        let bad = TextureId::MAX;
        assert_eq!(bank.texture(bad).unwrap_err(), TextureError::BadId(bad));
    }

    #[test]
    fn lazy_texture_pending_without_loader() {
        let mut bank = TextureBank::default_with_checker();
        let id = bank.register_lazy("LATER").unwrap();
        assert_eq!(bank.request(id, 0), Availability::Pending);
        assert!(!bank.is_resident(id));
        assert!(TextureSource::texture(&bank, id).is_none());
    }

    #[test]
    fn lazy_texture_loads_on_request() {
        let mut bank = TextureBank::default_with_checker();
        let id = bank.register_lazy("LATER").unwrap();
        bank.set_loader(Box::new(SolidLoader));
        assert_eq!(bank.request(id, 0), Availability::Ready);
        assert!(bank.is_resident(id));
        assert_eq!(bank.texture(id).unwrap().pixels, vec![7; 4]);
    }

    #[test]
    fn failed_load_falls_back_to_checker() {
        let mut bank = TextureBank::default_with_checker();
        let id = bank.register_lazy("BROKEN").unwrap();
        bank.set_loader(Box::new(SolidLoader));
        bank.prefetch([id]);
        assert_eq!(bank.texture(id).unwrap().name, "CHECKER");
    }

    #[test]
    fn shade_zero_is_identity_and_darkens_after() {
        let bank = TextureBank::default_with_checker();
        let white = 0xFF;
        assert_eq!(bank.get_color(0, 0, 0xFE), DEFAULT_PALETTE[0xFE]);
        let dark = bank.get_color(0, 31, 0xFE) & 0xFF_FFFF;
        assert!(dark < DEFAULT_PALETTE[0xFE] & 0xFF_FFFF);
        // the transparent index survives shading
        assert_eq!(bank.colormaps[0][20][white], TRANSPARENT_INDEX);
    }

    #[test]
    fn extra_palookup_gets_its_own_id() {
        let mut bank = TextureBank::default_with_checker();
        let mut red = Colormap::default();
        red[0] = [0xB0; 256];
        let pal = bank.add_palookup(red);
        assert_eq!(pal, 1);
        assert_eq!(bank.get_color(pal, 0, 0x10), DEFAULT_PALETTE[0xB0]);
        assert_eq!(bank.shade_lut(pal, 0)[3], DEFAULT_PALETTE[0xB0]);
        // palette 0 is untouched, unknown ids fall back to it
        assert_eq!(bank.get_color(0, 0, 0x10), DEFAULT_PALETTE[0x10]);
        assert_eq!(bank.get_color(9, 0, 0x10), DEFAULT_PALETTE[0x10]);
    }

    #[test]
    fn texel_wraps() {
        let t = Texture {
            name: "T".into(),
            w: 2,
            h: 2,
            pixels: vec![1, 2, 3, 4],
        };
        assert_eq!(t.texel(0.5, 0.5), 1);
        assert_eq!(t.texel(3.2, 1.0), 4);
        assert_eq!(t.texel(-0.5, -0.5), 4);
    }
}
