//! Bunch occlusion ordering: picks the next undrawn bunch nothing else
//! can hide, using only side-of-line tests against the eye.

use glam::{DVec2, Vec2};

use crate::{
    engine::{
        frame::FrameRenderState,
        types::{BunchId, ScanId},
    },
    world::{WallId, World},
};

/// Outcome of a pairwise front test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Front {
    /// the first argument is in front
    First,
    /// the second argument is in front
    Second,
    /// collinear, crossing or not overlapping
    Indeterminate,
}

/// Which of two walls is closer to `eye`.
pub fn wall_front(world: &World, eye: Vec2, a: WallId, b: WallId) -> Front {
    let seg = |w: WallId| {
        (
            world.walls[w as usize].pos.as_dvec2(),
            world.wall_end(w).as_dvec2(),
        )
    };
    let (a0, a1) = seg(a);
    let (b0, b1) = seg(b);
    let eye = eye.as_dvec2();
    let side = |o: DVec2, d: DVec2, p: DVec2| (p - o).perp_dot(d);

    // b entirely on one side of a's line?
    let d = a1 - a0;
    if let Some(t) = same_side(side(a0, d, b0), side(a0, d, b1)) {
        let cam = side(a0, d, eye);
        return if (cam >= 0.0) == (t >= 0.0) {
            Front::Second
        } else {
            Front::First
        };
    }

    // a entirely on one side of b's line?
    let d = b1 - b0;
    if let Some(t) = same_side(side(b0, d, a0), side(b0, d, a1)) {
        let cam = side(b0, d, eye);
        return if (cam >= 0.0) == (t >= 0.0) {
            Front::First
        } else {
            Front::Second
        };
    }

    Front::Indeterminate
}

/// Sign shared by two side values, a zero taking the other's sign.
/// `None` when they straddle the line or both are zero.
fn same_side(t1: f64, t2: f64) -> Option<f64> {
    let t1 = if t1 == 0.0 { t2 } else { t1 };
    if t1 == 0.0 {
        return None;
    }
    let t2 = if t2 == 0.0 { t1 } else { t2 };
    ((t1 > 0.0) == (t2 > 0.0)).then_some(t1)
}

/// Compare two bunches over their shared screen range.
pub fn front_test(state: &FrameRenderState, world: &World, a: BunchId, b: BunchId) -> Front {
    let (ba, bb) = (state.bunches[a as usize], state.bunches[b as usize]);
    if ba.x_left >= bb.x_right || bb.x_left >= ba.x_right {
        return Front::Indeterminate;
    }
    let eye = state.view.eye.truncate();
    let wall = |s: ScanId| state.scans[s as usize].wall;

    if ba.x_left >= bb.x_left {
        let i = first_reaching(state, bb.first, ba.x_left);
        wall_front(world, eye, wall(ba.first), wall(i))
    } else {
        let i = first_reaching(state, ba.first, bb.x_left);
        wall_front(world, eye, wall(i), wall(bb.first))
    }
}

/// First scan of the chain at `from` that extends past `x`.
fn first_reaching(state: &FrameRenderState, mut from: ScanId, x: f32) -> ScanId {
    loop {
        let scan = &state.scans[from as usize];
        match scan.next {
            Some(n) if scan.x_right <= x => from = n,
            _ => return from,
        }
    }
}

/// Queue a bunch for drawing, keeping `pending` sorted by `x_left`.
pub(crate) fn add_pending(state: &mut FrameRenderState, id: BunchId) {
    let x = state.bunches[id as usize].x_left;
    let bunches = &state.bunches;
    let pos = state
        .pending
        .partition_point(|&p| bunches[p as usize].x_left <= x);
    state.pending.insert(pos, id);
}

/// Remove and return the bunch to draw next.
///
/// The first pending bunch is the initial candidate; any bunch found in
/// front of the candidate replaces it. A second pass re-checks the bunches
/// the first pass could not compare, restarting whenever the candidate
/// changes. Indeterminate results never move the candidate.
pub fn select_next(state: &mut FrameRenderState, world: &World) -> Option<BunchId> {
    let n = state.pending.len();
    if n == 0 {
        return None;
    }
    state.compared.clear();
    state.compared.resize(n, false);

    let mut closest = 0;
    state.compared[0] = true;
    for i in 1..n {
        match front_test(state, world, state.pending[i], state.pending[closest]) {
            Front::Indeterminate => continue,
            Front::First => closest = i,
            Front::Second => {}
        }
        state.compared[i] = true;
    }

    let mut i = 0;
    while i < n {
        if !state.compared[i] {
            match front_test(state, world, state.pending[i], state.pending[closest]) {
                Front::Indeterminate => {}
                Front::First => {
                    state.compared[i] = true;
                    closest = i;
                    i = 0;
                    continue;
                }
                Front::Second => state.compared[i] = true,
            }
        }
        i += 1;
    }

    let id = state.pending.remove(closest);
    state.got_bunch.insert(id as usize);
    Some(id)
}
