//! Drawing one bunch: every scan contributes a floor edge, a ceiling edge
//! and its wall (solid, or the upper and lower steps of a portal) to the
//! span clipper, which hands back exactly the newly visible regions.

use glam::Vec2;

use crate::{
    engine::{
        frame::{FrameRenderState, FrameStats},
        marks::DrawnSink,
        masks::{MaskItem, MaskKind},
        plane::{PlaneEquation, WallPiece, along, flat_plane, wall_plane},
        scan::{Scan, scan_sector},
        types::{BunchId, View, clip_near},
    },
    renderer::{BlendMode, ScreenPoly, SurfaceParams, SurfaceRenderer, Trapezoid},
    world::{SectorId, SurfacePlane, TextureSource, Wall, WallFlags, WallId, World},
};

/// Screen height used for the edge of a solid wall: above everything, so
/// clipping it on the floor side closes the whole range.
const ABOVE_ALL: f32 = -1.0e9;

/// Where the painted pixels and automap marks of a frame go.
pub(crate) struct Output<'a, R: SurfaceRenderer> {
    pub renderer: &'a mut R,
    pub textures: &'a mut dyn TextureSource,
    pub sink: &'a mut dyn DrawnSink,
}

/// What to do with the regions a clip uncovers.
#[derive(Clone, Copy, Debug)]
enum Fill {
    Draw(SurfaceParams),
    Sky,
    /// clip without drawing (back side of a flat, unsolvable plane)
    Hidden,
}

/// A wall after near clipping, with everything its surfaces need.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Projected {
    pub piece: WallPiece,
    pub x0: f32,
    pub x1: f32,
    /// world points at the clipped ends
    pub n0: Vec2,
    pub n1: Vec2,
}

impl Projected {
    pub fn new(view: &View, world: &World, wall: WallId) -> Option<Self> {
        let (p1, p2) = (world.walls[wall as usize].pos, world.wall_end(wall));
        let (c0, c1, t0, t1) = clip_near(view.to_cam(p1), view.to_cam(p2), view.near)?;
        let (x0, x1) = (view.screen_x(c0), view.screen_x(c1));
        if !(x0 < x1) {
            return None;
        }
        Some(Self {
            piece: WallPiece {
                c0,
                c1,
                t0,
                t1,
                len: (p2 - p1).length(),
            },
            x0,
            x1,
            n0: along(p1, p2, t0),
            n1: along(p1, p2, t1),
        })
    }

    /// Screen rows of world heights `z0`, `z1` at the two ends.
    #[inline]
    pub fn rows(&self, view: &View, z0: f32, z1: f32) -> [f32; 2] {
        [
            view.screen_y(self.piece.c0.y, z0),
            view.screen_y(self.piece.c1.y, z1),
        ]
    }

    pub fn ceiling_rows(&self, view: &View, world: &World, sector: SectorId) -> [f32; 2] {
        self.rows(
            view,
            world.ceiling_z(sector, self.n0),
            world.ceiling_z(sector, self.n1),
        )
    }

    pub fn floor_rows(&self, view: &View, world: &World, sector: SectorId) -> [f32; 2] {
        self.rows(
            view,
            world.floor_z(sector, self.n0),
            world.floor_z(sector, self.n1),
        )
    }
}

/*──────────────────────────── bunch drawing ────────────────────────────*/

pub(crate) fn draw_bunch<R: SurfaceRenderer>(
    state: &mut FrameRenderState,
    world: &World,
    bunch: BunchId,
    out: &mut Output<'_, R>,
) {
    let mut cur = Some(state.bunches[bunch as usize].first);
    while let Some(z) = cur {
        let scan = state.scans[z as usize];
        cur = scan.next;
        draw_scan(state, world, bunch, &scan, out);
    }
}

fn draw_scan<R: SurfaceRenderer>(
    state: &mut FrameRenderState,
    world: &World,
    bunch: BunchId,
    scan: &Scan,
    out: &mut Output<'_, R>,
) {
    let view = state.view;
    let Some(pr) = Projected::new(&view, world, scan.wall) else {
        return;
    };
    let (x0, x1) = (pr.x0, pr.x1);
    let sector = scan.sector;
    let sec = &world.sectors[sector as usize];
    let wall = &world.walls[scan.wall as usize];

    let [cy0, cy1] = pr.ceiling_rows(&view, world, sector);
    let [fy0, fy1] = pr.floor_rows(&view, world, sector);

    let fill = flat_fill(&view, world, sector, &sec.floor, true);
    clip(state, out, bunch, [x0, fy0, x1, fy1], fill);
    let fill = flat_fill(&view, world, sector, &sec.ceiling, false);
    clip(state, out, bunch, [x1, cy1, x0, cy0], fill);

    match wall.traversable() {
        Some(next) => {
            let ns = &world.sectors[next as usize];
            let [ocy0, ocy1] = pr.ceiling_rows(&view, world, next);
            let [ofy0, ofy1] = pr.floor_rows(&view, world, next);

            // upper step
            if (ocy0 > cy0 || ocy1 > cy1)
                && !(sec.ceiling.is_parallax() && ns.ceiling.is_parallax())
            {
                let fill = wall_fill(&view, &pr, wall, sec.ceiling.height);
                clip(state, out, bunch, [x1, ocy1, x0, ocy0], fill);
            }
            // lower step
            if (ofy0 < fy0 || ofy1 < fy1) && !(sec.floor.is_parallax() && ns.floor.is_parallax()) {
                let fill = wall_fill(&view, &pr, wall, ns.floor.height);
                clip(state, out, bunch, [x0, ofy0, x1, ofy1], fill);
            }

            if wall.flags.contains(WallFlags::MASKED) {
                let item = MaskItem {
                    kind: MaskKind::Wall {
                        wall: scan.wall,
                        sector,
                    },
                    depth: (pr.piece.c0.y + pr.piece.c1.y) * 0.5,
                };
                if let Err(err) = state.masks.try_push(item) {
                    state.stats.note(err);
                }
            }
        }
        None => {
            let fill = wall_fill(&view, &pr, wall, sec.ceiling.height);
            clip(state, out, bunch, [x0, ABOVE_ALL, x1, ABOVE_ALL], fill);
        }
    }

    out.sink.wall_drawn(scan.wall);
    out.sink.sector_drawn(sector);

    if let Some(next) = wall.traversable() {
        if !state.got_sector.contains(next as usize) && state.spans.test_visible(x0, x1) {
            scan_sector(state, world, next);
        }
    }
}

/// Floor (`floor == true`) or ceiling of `sector`.
fn flat_fill(
    view: &View,
    world: &World,
    sector: SectorId,
    surface: &SurfacePlane,
    floor: bool,
) -> (Fill, PlaneEquation) {
    if surface.is_parallax() {
        return (Fill::Sky, PlaneEquation::default());
    }
    let eye = view.eye.truncate();
    let facing = if floor {
        view.eye.z > world.floor_z(sector, eye)
    } else {
        view.eye.z < world.ceiling_z(sector, eye)
    };
    if !facing {
        return (Fill::Hidden, PlaneEquation::default());
    }
    match flat_plane(view, world, sector, surface, floor) {
        Some(eq) => (
            Fill::Draw(SurfaceParams {
                tex: surface.tex,
                pal: surface.pal,
                shade: surface.shade,
                blend: BlendMode::Opaque,
            }),
            eq,
        ),
        None => (Fill::Hidden, PlaneEquation::default()),
    }
}

fn wall_fill(view: &View, pr: &Projected, wall: &Wall, ref_z: f32) -> (Fill, PlaneEquation) {
    match wall_plane(view, &pr.piece, wall, ref_z) {
        Some(eq) => (
            Fill::Draw(SurfaceParams {
                tex: wall.tex,
                pal: wall.pal,
                shade: wall.shade,
                blend: BlendMode::Opaque,
            }),
            eq,
        ),
        None => (Fill::Hidden, PlaneEquation::default()),
    }
}

/// Run one edge through the span clipper, painting what it uncovers.
fn clip<R: SurfaceRenderer>(
    state: &mut FrameRenderState,
    out: &mut Output<'_, R>,
    bunch: BunchId,
    edge: [f32; 4],
    (fill, eq): (Fill, PlaneEquation),
) {
    state.plane = eq;
    let FrameRenderState {
        spans,
        plane,
        view,
        stats,
        ..
    } = state;
    let [x0, y0, x1, y1] = edge;
    spans.clip_edge(x0, y0, x1, y1, bunch, |trap| {
        paint(out, view, stats, plane, fill, trap)
    });
}

fn paint<R: SurfaceRenderer>(
    out: &mut Output<'_, R>,
    view: &View,
    stats: &mut FrameStats,
    plane: &PlaneEquation,
    fill: Fill,
    trap: &Trapezoid,
) {
    match fill {
        Fill::Hidden => {}
        Fill::Sky => {
            let mut poly = trap.to_polygon();
            view.roll_polygon(&mut poly);
            out.renderer.fill_sky(&poly);
            stats.sky_fills += 1;
        }
        Fill::Draw(surface) => {
            if view.roll == 0.0 {
                out.renderer
                    .fill_trapezoid(trap, plane, &surface, &mut *out.textures);
            } else {
                fill_rolled(out, view, trap.to_polygon(), plane, &surface);
            }
            stats.polygons += 1;
        }
    }
}

/// Fill `poly` after applying the view's roll to it and its plane.
pub(crate) fn fill_rolled<R: SurfaceRenderer>(
    out: &mut Output<'_, R>,
    view: &View,
    mut poly: ScreenPoly,
    plane: &PlaneEquation,
    surface: &SurfaceParams,
) {
    if view.roll == 0.0 {
        out.renderer
            .fill_polygon(&poly, plane, surface, &mut *out.textures);
        return;
    }
    view.roll_polygon(&mut poly);
    let rolled = view.roll_plane(plane);
    out.renderer
        .fill_polygon(&poly, &rolled, surface, &mut *out.textures);
}
