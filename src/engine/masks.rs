//! Masked walls and face sprites, drawn after the rooms from far to near
//! against the depth the opaque surfaces left behind.

use crate::{
    engine::{
        frame::FrameRenderState,
        plane::{sprite_plane, wall_plane},
        types::View,
        walls::{Output, Projected, fill_rolled},
    },
    renderer::{BlendMode, SurfaceParams, SurfaceRenderer, Trapezoid},
    world::{Availability, SectorId, SpriteFlags, SpriteId, WallFlags, WallId, World},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaskKind {
    Sprite(SpriteId),
    /// masked portal seen from `sector`
    Wall { wall: WallId, sector: SectorId },
}

/// Something drawn after the rooms; `depth` orders them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskItem {
    pub kind: MaskKind,
    pub depth: f32,
}

pub(crate) fn draw_masks<R: SurfaceRenderer>(
    state: &mut FrameRenderState,
    world: &World,
    out: &mut Output<'_, R>,
) {
    // far first; equal depths keep collection order
    state
        .masks
        .as_mut_slice()
        .sort_by(|a, b| b.depth.total_cmp(&a.depth));

    let view = state.view;
    for item in state.masks.iter() {
        let drawn = match item.kind {
            MaskKind::Sprite(id) => draw_sprite(&view, world, id, out),
            MaskKind::Wall { wall, sector } => draw_masked_wall(&view, world, wall, sector, out),
        };
        if drawn {
            state.stats.masks += 1;
        }
    }
}

fn draw_sprite<R: SurfaceRenderer>(
    view: &View,
    world: &World,
    id: SpriteId,
    out: &mut Output<'_, R>,
) -> bool {
    let sprite = &world.sprites[id as usize];
    if out.textures.request(sprite.tex, sprite.pal) == Availability::Pending {
        return false;
    }
    let Some((poly, eq, _)) = out
        .textures
        .texture(sprite.tex)
        .and_then(|tex| sprite_plane(view, sprite, tex))
    else {
        return false;
    };

    let blend = if sprite.flags.contains(SpriteFlags::TRANSLUCENT) {
        BlendMode::Translucent
    } else if sprite.flags.contains(SpriteFlags::TRANSLUCENT_INV) {
        BlendMode::TranslucentInv
    } else {
        BlendMode::Masked
    };
    let surface = SurfaceParams {
        tex: sprite.tex,
        pal: sprite.pal,
        shade: sprite.shade,
        blend,
    };
    fill_rolled(out, view, poly, &eq, &surface);
    true
}

/// The portal opening between the higher floor and the lower ceiling of
/// the two sectors, covered with the wall's `over_tex`.
fn draw_masked_wall<R: SurfaceRenderer>(
    view: &View,
    world: &World,
    wall_id: WallId,
    sector: SectorId,
    out: &mut Output<'_, R>,
) -> bool {
    let wall = &world.walls[wall_id as usize];
    let Some(next) = wall.next_sector else {
        return false;
    };
    let Some(pr) = Projected::new(view, world, wall_id) else {
        return false;
    };

    let top = |p| world.ceiling_z(sector, p).min(world.ceiling_z(next, p));
    let bottom = |p| world.floor_z(sector, p).max(world.floor_z(next, p));
    let (t0, t1) = (top(pr.n0), top(pr.n1));
    let (b0, b1) = (bottom(pr.n0), bottom(pr.n1));
    if t0 <= b0 && t1 <= b1 {
        return false;
    }
    let trap = Trapezoid {
        x0: pr.x0,
        x1: pr.x1,
        top: pr.rows(view, t0, t1),
        bottom: pr.rows(view, b0, b1),
    };

    let ref_z = world.sectors[sector as usize]
        .ceiling
        .height
        .min(world.sectors[next as usize].ceiling.height);
    let Some(eq) = wall_plane(view, &pr.piece, wall, ref_z) else {
        return false;
    };

    let blend = if wall.flags.contains(WallFlags::TRANSLUCENT) {
        BlendMode::Translucent
    } else if wall.flags.contains(WallFlags::TRANSLUCENT_INV) {
        BlendMode::TranslucentInv
    } else {
        BlendMode::Masked
    };
    let surface = SurfaceParams {
        tex: wall.over_tex,
        pal: wall.pal,
        shade: wall.shade,
        blend,
    };
    fill_rolled(out, view, trap.to_polygon(), &eq, &surface);
    true
}
