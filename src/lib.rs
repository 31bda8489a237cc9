//! Build-style portal renderer: sectors joined by portals are walked from
//! the camera outwards, visible walls are drawn front to back through a
//! vertical-span clipper, and the resulting convex polygons are
//! rasterized in software or handed to a GPU back end.

pub mod config;
pub mod engine;
pub mod renderer;
pub mod world;
