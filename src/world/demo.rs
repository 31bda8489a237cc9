//! Small hand-built maps: the three reference layouts used by the tests
//! and benches, and a textured level for the viewer.

use glam::{Vec2, Vec3, vec2};

use super::{
    Camera, MapBuilder, NO_TEXTURE, SectorId, Sprite, SpriteFlags, SurfaceFlags, SurfacePlane,
    TRANSPARENT_INDEX, Texture, TextureBank, TextureId, WallFlags, World, WorldError,
};

/// Square room `size` units wide with its corner at the origin.
pub fn single_room(size: f32) -> Result<World, WorldError> {
    let mut b = MapBuilder::new();
    b.sector(
        &[&[vec2(0., 0.), vec2(0., size), vec2(size, size), vec2(size, 0.)]],
        SurfacePlane::flat(0.0, NO_TEXTURE),
        SurfacePlane::flat(128.0, NO_TEXTURE),
    );
    b.build()
}

/*──────────────────────── two rooms, one door ───────────────────────*/

/// Room 0 spans `(0,0)..(256,256)`; room 1 spans `(256,32)..(512,224)`.
/// They share the doorway `x = 256, y ∈ [96,160]`.
pub fn two_rooms_with_door() -> Result<World, WorldError> {
    let mut b = MapBuilder::new();
    add_two_rooms(
        &mut b,
        &[],
        [SurfacePlane::flat(0.0, NO_TEXTURE); 2],
        [SurfacePlane::flat(128.0, NO_TEXTURE); 2],
    );
    b.build()
}

fn add_two_rooms(
    b: &mut MapBuilder,
    pillars: &[&[Vec2]],
    floors: [SurfacePlane; 2],
    ceilings: [SurfacePlane; 2],
) -> [SectorId; 2] {
    let outer: &[Vec2] = &[
        vec2(0., 0.),
        vec2(0., 256.),
        vec2(256., 256.),
        vec2(256., 160.),
        vec2(256., 96.),
        vec2(256., 0.),
    ];
    let loops: Vec<&[Vec2]> = std::iter::once(outer).chain(pillars.iter().copied()).collect();
    let room = b.sector(&loops, floors[0], ceilings[0]);
    let hall = b.sector(
        &[&[
            vec2(256., 32.),
            vec2(256., 96.),
            vec2(256., 160.),
            vec2(256., 224.),
            vec2(512., 224.),
            vec2(512., 32.),
        ]],
        floors[1],
        ceilings[1],
    );
    [room, hall]
}

/*─────────────────────────── ring corridor ──────────────────────────*/

/// Four corridor sectors around a 128×128 pillar, each opening into the
/// next, so walking the portals leads back to the start.
///
/// Sector 0 is the south bar `(0,0)..(384,128)`, then east, north, west.
pub fn ring_corridor() -> Result<World, WorldError> {
    let mut b = MapBuilder::new();
    let floor = SurfacePlane::flat(0.0, NO_TEXTURE);
    let ceiling = SurfacePlane::flat(128.0, NO_TEXTURE);
    let loops: [&[Vec2]; 4] = [
        &[
            vec2(0., 0.),
            vec2(0., 128.),
            vec2(128., 128.),
            vec2(256., 128.),
            vec2(384., 128.),
            vec2(384., 0.),
        ],
        &[vec2(256., 128.), vec2(256., 256.), vec2(384., 256.), vec2(384., 128.)],
        &[
            vec2(0., 256.),
            vec2(0., 384.),
            vec2(384., 384.),
            vec2(384., 256.),
            vec2(256., 256.),
            vec2(128., 256.),
        ],
        &[vec2(0., 128.), vec2(0., 256.), vec2(128., 256.), vec2(128., 128.)],
    ];
    for lp in loops {
        b.sector(&[lp], floor, ceiling);
    }
    b.build()
}

/*──────────────────────────── demo level ────────────────────────────*/

/// The two-room layout dressed up: textured walls, a pillar, a masked
/// grate in the doorway, a raised sloped floor under an open sky in the
/// second room and a few sprites. Textures are generated into `bank`.
pub fn demo_level(bank: &mut TextureBank) -> Result<World, WorldError> {
    let brick = texture(bank, "BRICK", 32, 32, |x, y| {
        let row = y / 8;
        let offs = if row % 2 == 0 { 0 } else { 8 };
        if y % 8 == 7 || (x + offs) % 16 == 15 {
            0x92 // mortar
        } else {
            0xA4 + ((x * 7 + y * 3) % 3) as u8
        }
    })?;
    let planks = texture(bank, "PLANKS", 64, 64, |x, y| {
        if x % 16 == 0 { 0x44 } else { 0x68 + ((y / 4 + x / 16) % 2) as u8 }
    })?;
    let tiles = texture(bank, "TILES", 32, 32, |x, y| {
        if x % 16 == 0 || y % 16 == 0 { 0x49 } else { 0x6D }
    })?;
    let grate = texture(bank, "GRATE", 16, 16, |x, y| {
        if x % 8 < 2 || y % 8 < 2 { 0x49 } else { TRANSPARENT_INDEX }
    })?;
    let lamp = texture(bank, "LAMP", 16, 32, |x, y| {
        let (dx, dy) = (x as i32 - 8, y as i32 - 8);
        if dx * dx + dy * dy < 36 {
            0xF8
        } else if y > 12 && (7..9).contains(&x) {
            0x49
        } else {
            TRANSPARENT_INDEX
        }
    })?;

    let mut b = MapBuilder::new();
    b.wall_tex(brick);

    let mut sloped = SurfacePlane::flat(8.0, tiles);
    sloped.slope = 0.1;
    let mut sky = SurfacePlane::flat(160.0, NO_TEXTURE);
    sky.flags |= SurfaceFlags::PARALLAX;

    // a pillar off to the side of the first room
    let pillar = [vec2(96., 48.), vec2(128., 48.), vec2(128., 80.), vec2(96., 80.)];
    let [room, hall] = add_two_rooms(
        &mut b,
        &[&pillar[..]],
        [SurfacePlane::flat(0.0, planks), sloped],
        [SurfacePlane::flat(128.0, planks), sky],
    );

    for id in [b.wall_at(room, vec2(256., 160.)), b.wall_at(hall, vec2(256., 96.))]
        .into_iter()
        .flatten()
    {
        let wall = b.wall_mut(id);
        wall.flags |= WallFlags::MASKED;
        wall.over_tex = grate;
        wall.repeat = Vec2::splat(0.5);
    }

    for (pos, sector, flags) in [
        (Vec3::new(200.0, 48.0, 0.0), room, SpriteFlags::empty()),
        (Vec3::new(200.0, 208.0, 0.0), room, SpriteFlags::TRANSLUCENT),
        (Vec3::new(448.0, 128.0, 0.0), hall, SpriteFlags::empty()),
    ] {
        b.sprite(Sprite {
            pos,
            sector,
            tex: lamp,
            size: Vec2::new(16.0, 32.0),
            shade: 0,
            pal: 0,
            flags,
        });
    }

    b.build()
}

/// Starting view for [`demo_level`]: west side of the first room,
/// looking at the doorway.
pub fn demo_camera() -> Camera {
    Camera::new(Vec3::new(40.0, 128.0, 48.0), 0.0, 90f32.to_radians())
}

fn texture(
    bank: &mut TextureBank,
    name: &str,
    w: usize,
    h: usize,
    texel: impl Fn(usize, usize) -> u8,
) -> Result<TextureId, WorldError> {
    if let Some(id) = bank.id(name) {
        return Ok(id);
    }
    let pixels = (0..w * h).map(|i| texel(i % w, i / w)).collect();
    let tex = Texture {
        name: name.to_string(),
        w,
        h,
        pixels,
    };
    Ok(bank.insert(name, tex)?)
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
