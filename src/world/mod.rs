mod builder;
mod camera;
pub mod demo;
mod geometry;
mod helpers;
pub mod texture;

pub use geometry::{
    Sector, SectorId, Sprite, SpriteFlags, SpriteId, SurfaceFlags, SurfacePlane, Wall, WallFlags,
    WallId, World,
};

pub use builder::MapBuilder;
pub use camera::Camera;
pub use helpers::WorldError;

pub use texture::{
    Availability, Colormap, NO_TEXTURE, Palette, PaletteId, TRANSPARENT_INDEX, Texture,
    TextureBank, TextureError, TextureId, TextureLoader, TextureSource,
};
