//! Per-frame visibility core: portal scanning, bunch ordering, span
//! clipping and the surface plane equations fed to the renderers.

mod arena;
mod domost;
#[allow(clippy::module_inception)]
mod engine;
mod frame;
mod marks;
mod masks;
mod order;
mod plane;
mod scan;
mod types;
mod walls;

pub use arena::{BitSet, BoundedVec, CapacityError, Pool};
pub use domost::{SpanList, SpanTag, Strip};
pub use engine::Engine;
pub use frame::{FrameRenderState, FrameStats};
pub use marks::{DrawnSink, MapMarks};
pub use masks::{MaskItem, MaskKind};
pub use order::{Front, front_test, select_next, wall_front};
pub use plane::{
    Linear, PlaneEquation, PlanePoint, WallPiece, along, flat_plane, sprite_plane, wall_plane,
};
pub use scan::{Bunch, Scan, scan_sector};
pub use types::{BunchId, ScanId, View, clip_near};
