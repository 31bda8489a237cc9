//! Portal graph scanner: turns the walls of reachable sectors into
//! screen intervals (scans) and groups them into bunches.

use crate::{
    engine::{
        frame::FrameRenderState,
        masks::{MaskItem, MaskKind},
        order::add_pending,
        types::{BunchId, ScanId},
    },
    world::{SectorId, SpriteFlags, WallId, World},
};

/// Projected x-interval of one front-facing wall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scan {
    pub sector: SectorId,
    pub wall: WallId,
    pub x_left: f32,
    pub x_right: f32,
    /// next scan of the same bunch
    pub next: Option<ScanId>,
}

/// Chain of scans continuous both in the world and on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bunch {
    pub first: ScanId,
    pub last: ScanId,
    pub x_left: f32,
    pub x_right: f32,
}

/// Endpoint substitutes for walls crossing the near plane.
const FAR_LEFT: f32 = -1.0e32;
const FAR_RIGHT: f32 = 1.0e32;

/// Scan `sector` and every neighbour close enough to the eye to be
/// entered through its portal. Returns the number of new bunches.
///
/// A sector already visited this frame (or an unknown id) is a no-op.
pub fn scan_sector(state: &mut FrameRenderState, world: &World, sector: SectorId) -> usize {
    if sector as usize >= world.sectors.len() || state.got_sector.contains(sector as usize) {
        return 0;
    }
    let before = state.bunches.len();

    state.sector_stack.clear();
    state.got_sector.insert(sector as usize);
    if let Err(err) = state.sector_stack.try_push(sector) {
        state.stats.note(err);
        return 0;
    }

    while let Some(sec) = state.sector_stack.pop() {
        state.stats.sectors += 1;
        collect_sprites(state, world, sec);
        scan_walls(state, world, sec);
    }

    let added = state.bunches.len() - before;
    state.stats.bunches += added as u32;
    added
}

fn collect_sprites(state: &mut FrameRenderState, world: &World, sector: SectorId) {
    let view = state.view;
    for (id, sprite) in world.sprites.iter().enumerate() {
        if sprite.sector != sector || sprite.flags.contains(SpriteFlags::INVISIBLE) {
            continue;
        }
        let depth = view.to_cam(sprite.pos.truncate()).y;
        if depth < view.near {
            continue;
        }
        let item = MaskItem {
            kind: MaskKind::Sprite(id as u16),
            depth,
        };
        if let Err(err) = state.masks.try_push(item) {
            state.stats.note(err);
        }
    }
}

fn scan_walls(state: &mut FrameRenderState, world: &World, sector: SectorId) {
    let view = state.view;
    let eye = view.eye.truncate();
    let reach2 = state.scan_distance * state.scan_distance;

    let first_scan = state.scans.len();
    let first_bunch = state.bunches.len();
    let mut loop_first = first_scan;

    for w in world.walls_of(sector) {
        let wall = &world.walls[w as usize];
        let (p1, p2) = (wall.pos, world.wall_end(w));

        // portals right next to the eye are entered before they are drawn
        if let Some(next) = wall.traversable() {
            if !state.got_sector.contains(next as usize) {
                let cross = (p1 - eye).perp_dot(p2 - eye);
                if cross * cross <= (p2 - p1).length_squared() * reach2 {
                    match state.sector_stack.try_push(next) {
                        Ok(_) => {
                            state.got_sector.insert(next as usize);
                        }
                        Err(err) => state.stats.note(err),
                    }
                }
            }
        }

        let (c1, c2) = (view.to_cam(p1), view.to_cam(p2));
        if (c1.y >= view.near || c2.y >= view.near) && c1.x * c2.y < c2.x * c1.y {
            let x_left = if c1.y >= view.near { view.screen_x(c1) } else { FAR_LEFT };
            let x_right = if c2.y >= view.near { view.screen_x(c2) } else { FAR_RIGHT };
            if x_left < x_right {
                let id = state.scans.len() as ScanId;
                let scan = Scan {
                    sector,
                    wall: w,
                    x_left,
                    x_right,
                    next: Some(id + 1),
                };
                match state.scans.try_push(scan) {
                    Ok(_) => state.stats.scans += 1,
                    Err(err) => state.stats.note(err),
                }
            }
        }

        // end of a loop: close the chain on the loop's first scan
        if wall.point2 < w && loop_first < state.scans.len() {
            let last = state.scans.len() - 1;
            state.scans[last].next = Some(loop_first as ScanId);
            loop_first = state.scans.len();
        }
    }

    cut_bunches(state, world, first_scan, first_bunch);
}

/// Break the circular chains wherever world or screen continuity fails;
/// each break starts a bunch.
fn cut_bunches(state: &mut FrameRenderState, world: &World, first_scan: usize, first_bunch: usize) {
    for z in first_scan..state.scans.len() {
        let scan = state.scans[z];
        let Some(n) = scan.next else { continue };
        let continuous = state.scans.get(n as usize).is_some_and(|next| {
            world.walls[scan.wall as usize].point2 == next.wall && scan.x_right <= next.x_left
        });
        if continuous {
            continue;
        }
        state.scans[z].next = None;
        if (n as usize) < state.scans.len() {
            let bunch = Bunch {
                first: n,
                last: n,
                x_left: state.scans[n as usize].x_left,
                x_right: state.scans[n as usize].x_right,
            };
            if let Err(err) = state.bunches.try_push(bunch) {
                state.stats.note(err);
            }
        }
    }

    for b in first_bunch..state.bunches.len() {
        let mut z = state.bunches[b].first;
        while let Some(n) = state.scans[z as usize].next {
            z = n;
        }
        let bunch = &mut state.bunches[b];
        bunch.last = z;
        bunch.x_right = state.scans[z as usize].x_right;
        add_pending(state, b as BunchId);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RenderConfig,
        engine::types::View,
        world::{Camera, MapBuilder, NO_TEXTURE, SurfacePlane},
    };
    use glam::{Vec2, vec2};

    fn room(size: f32) -> World {
        let mut b = MapBuilder::new();
        let pts = [vec2(0.0, 0.0), vec2(0.0, size), vec2(size, size), vec2(size, 0.0)];
        b.sector(
            &[&pts],
            SurfacePlane::flat(0.0, NO_TEXTURE),
            SurfacePlane::flat(64.0, NO_TEXTURE),
        );
        b.build().unwrap()
    }

    fn state_at(world: &World, pos: Vec2, yaw: f32) -> FrameRenderState {
        let cfg = RenderConfig::default();
        let mut state = FrameRenderState::new(&cfg);
        let cam = Camera::new(pos.extend(32.0), yaw, 90f32.to_radians());
        state.reset(View::new(&cam, 320, 200, cfg.near), world.sectors.len());
        state
    }

    #[test]
    fn room_around_the_eye_is_one_bunch() {
        let world = room(256.0);
        let mut state = state_at(&world, vec2(32.0, 128.0), 0.0);
        assert_eq!(scan_sector(&mut state, &world, 0), 1);
        // west wall is behind the eye, the other three face it
        assert_eq!(state.scans().len(), 3);
        let b = state.bunches()[0];
        assert_eq!(b.x_left, FAR_LEFT);
        assert_eq!(b.x_right, FAR_RIGHT);
        assert_eq!(state.bunch_scans(0).count(), 3);
    }

    #[test]
    fn second_scan_is_a_no_op() {
        let world = room(128.0);
        let mut state = state_at(&world, vec2(64.0, 64.0), 0.3);
        let first = scan_sector(&mut state, &world, 0);
        let scans = state.scans().len();
        assert!(first > 0);
        assert_eq!(scan_sector(&mut state, &world, 0), 0);
        assert_eq!(state.scans().len(), scans);
        assert_eq!(state.stats().sectors, 1);
    }

    #[test]
    fn unknown_sector_is_ignored() {
        let world = room(128.0);
        let mut state = state_at(&world, vec2(64.0, 64.0), 0.0);
        assert_eq!(scan_sector(&mut state, &world, 7), 0);
        assert!(state.scans().is_empty());
    }

    #[test]
    fn pillar_seen_from_outside_faces_two_walls() {
        let mut b = MapBuilder::new();
        let outer = [vec2(0., 0.), vec2(0., 256.), vec2(256., 256.), vec2(256., 0.)];
        // inner loops run counter-clockwise so the room stays on the right
        let pillar = [vec2(160., 96.), vec2(192., 96.), vec2(192., 160.), vec2(160., 160.)];
        b.sector(
            &[&outer, &pillar],
            SurfacePlane::flat(0.0, NO_TEXTURE),
            SurfacePlane::flat(64.0, NO_TEXTURE),
        );
        let world = b.build().unwrap();
        let mut state = state_at(&world, vec2(32.0, 64.0), 0.0);
        scan_sector(&mut state, &world, 0);
        let pillar_scans = state.scans().iter().filter(|s| s.wall >= 4).count();
        assert_eq!(pillar_scans, 2);
        // the pillar is its own bunch, narrower than the room around it
        assert!(state.bunches().len() >= 2);
    }

    #[test]
    fn chain_folding_back_on_screen_is_cut() {
        // diamond room; its west corner lies behind the eye, so the chain
        // jumps from the right edge of the screen back to the left there
        let mut b = MapBuilder::new();
        let pts = [vec2(128., 256.), vec2(256., 128.), vec2(128., 0.), vec2(0., 128.)];
        b.sector(
            &[&pts],
            SurfacePlane::flat(0.0, NO_TEXTURE),
            SurfacePlane::flat(64.0, NO_TEXTURE),
        );
        let world = b.build().unwrap();
        let mut state = state_at(&world, vec2(16.0, 128.0), 0.0);
        assert_eq!(scan_sector(&mut state, &world, 0), 1);
        assert_eq!(state.scans().len(), 4);

        let bunch = state.bunches()[0];
        assert_eq!(state.scans()[bunch.first as usize].wall, 3);
        assert_eq!(state.scans()[bunch.last as usize].wall, 2);
        assert_eq!((bunch.x_left, bunch.x_right), (FAR_LEFT, FAR_RIGHT));
        assert_eq!(state.bunch_scans(0).count(), 4);
    }
}
