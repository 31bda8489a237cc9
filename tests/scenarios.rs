//! End-to-end checks of the visibility core on the reference maps.

use glam::{Vec2, Vec3, vec2};

use yabuild_rs::{
    config::RenderConfig,
    engine::{
        BunchId, Engine, Front, FrameRenderState, MapMarks, PlaneEquation, PlanePoint, SpanList,
        SpanTag, View, front_test, scan_sector, select_next,
    },
    renderer::{Rgba, SurfaceParams, SurfaceRenderer, software::Software},
    world::{
        Camera, MapBuilder, NO_TEXTURE, SectorId, SurfacePlane, TextureBank, TextureSource, World,
        demo,
    },
};

/*─────────────────────────── helpers ───────────────────────────*/

/// Records what reaches the rasterizer instead of drawing it.
#[derive(Default)]
struct Recorder {
    fills: usize,
    skies: usize,
    planes: Vec<PlaneEquation>,
}

impl SurfaceRenderer for Recorder {
    fn begin_frame(&mut self, _width: usize, _height: usize) {
        *self = Recorder::default();
    }

    fn fill_polygon(
        &mut self,
        _poly: &[Vec2],
        plane: &PlaneEquation,
        _surface: &SurfaceParams,
        _textures: &mut dyn TextureSource,
    ) {
        self.fills += 1;
        if !self.planes.contains(plane) {
            self.planes.push(*plane);
        }
    }

    fn fill_sky(&mut self, _poly: &[Vec2]) {
        self.skies += 1;
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        submit(&[], 0, 0);
    }
}

fn config() -> RenderConfig {
    RenderConfig {
        width: 320,
        height: 200,
        ..Default::default()
    }
}

fn camera(x: f32, y: f32, yaw: f32) -> Camera {
    Camera::new(Vec3::new(x, y, 64.0), yaw, 90f32.to_radians())
}

fn state_for(world: &World, cam: &Camera) -> FrameRenderState {
    let cfg = config();
    let mut state = FrameRenderState::new(&cfg);
    state.reset(
        View::new(cam, cfg.width, cfg.height, cfg.near),
        world.sectors.len(),
    );
    state
}

fn bunch_sector(state: &FrameRenderState, b: BunchId) -> Option<SectorId> {
    state.bunch_scans(b).next().map(|s| s.sector)
}

fn render<R: SurfaceRenderer>(engine: &mut Engine<R>, world: &World, cam: &Camera) -> MapMarks {
    let mut bank = TextureBank::default_with_checker();
    let mut marks = MapMarks::new(world);
    engine.render_frame(world, cam, &mut bank, &mut marks, |_, _, _| {});
    marks
}

/*──────────────────────── scenario A ────────────────────────*/

#[test]
fn single_room_is_one_sector_and_one_bunch() {
    let world = demo::single_room(256.0).unwrap();
    let cam = camera(32.0, 128.0, 0.0);

    let mut state = state_for(&world, &cam);
    assert_eq!(scan_sector(&mut state, &world, 0), 1);
    assert_eq!(state.stats().sectors, 1);
    assert_eq!(state.scans().len(), 3);

    let mut engine = Engine::new(Recorder::default(), config()).unwrap();
    let marks = render(&mut engine, &world, &cam);
    let stats = *engine.state().stats();
    assert_eq!(stats.sectors, 1);
    assert_eq!((stats.bunches, stats.bunches_drawn), (1, 1));
    assert!(engine.state().spans().strips().all(|s| s.is_closed()));

    // three walls, one floor, one ceiling
    assert_eq!(engine.renderer().planes.len(), 5);
    assert_eq!(engine.renderer().fills as u32, stats.polygons);
    assert_eq!(engine.renderer().skies, 0);
    assert_eq!(marks.seen_walls(), 3);
}

/*──────────────────────── scenario B ────────────────────────*/

#[test]
fn doorway_enters_the_second_room_once() {
    let world = demo::two_rooms_with_door().unwrap();
    let cam = camera(64.0, 128.0, 0.0);

    let mut engine = Engine::new(Software::new(&config()), config()).unwrap();
    let marks = render(&mut engine, &world, &cam);
    let state = engine.state();
    assert_eq!(state.stats().sectors, 2);
    assert!(state.sector_visited(1));
    assert!(marks.sector_seen(1));
    assert_eq!(state.stats().capacity_drops(), 0);

    // the hall's far walls were drawn exactly once each
    let hall_scans = state.scans().iter().filter(|s| s.sector == 1).count();
    assert!(hall_scans > 0);
    let mut walls: Vec<_> = state
        .scans()
        .iter()
        .filter(|s| s.sector == 1)
        .map(|s| s.wall)
        .collect();
    walls.dedup();
    assert_eq!(walls.len(), hall_scans);
}

#[test]
fn far_room_is_ordered_behind_the_door_wall() {
    let world = demo::two_rooms_with_door().unwrap();
    let cam = camera(64.0, 128.0, 0.0);
    let mut state = state_for(&world, &cam);

    // both rooms pending at once
    scan_sector(&mut state, &world, 0);
    scan_sector(&mut state, &world, 1);
    let near: Vec<BunchId> = (0..state.bunches().len() as BunchId)
        .filter(|&b| bunch_sector(&state, b) == Some(0))
        .collect();
    let far: Vec<BunchId> = (0..state.bunches().len() as BunchId)
        .filter(|&b| bunch_sector(&state, b) == Some(1))
        .collect();
    assert!(!near.is_empty() && !far.is_empty());

    for &n in &near {
        for &f in &far {
            let front = front_test(&state, &world, n, f);
            assert!(matches!(front, Front::First | Front::Indeterminate), "{n} vs {f}");
        }
    }
    let door = near
        .iter()
        .copied()
        .find(|&n| far.iter().any(|&f| front_test(&state, &world, n, f) == Front::First));
    assert!(door.is_some());

    let order: Vec<BunchId> = std::iter::from_fn(|| select_next(&mut state, &world)).collect();
    let last_near = order.iter().rposition(|b| near.contains(b));
    let first_far = order.iter().position(|b| far.contains(b));
    assert!(last_near < first_far, "{order:?}");
}

/*──────────────────────── scenario C ────────────────────────*/

#[test]
fn ring_corridor_terminates() {
    let world = demo::ring_corridor().unwrap();
    for (x, y, yaw) in [(64.0, 64.0, 0.0), (320.0, 64.0, 1.6), (64.0, 64.0, 1.6)] {
        let cam = camera(x, y, yaw);
        let mut engine = Engine::new(Software::new(&config()), config()).unwrap();
        render(&mut engine, &world, &cam);
        let stats = engine.state().stats();
        assert!(stats.sectors <= 4, "{stats}");
        assert_eq!(stats.bunches_drawn, stats.bunches);
    }

    // rescanning by hand still enters each sector once
    let cam = camera(127.0, 127.0, 0.8);
    let mut state = state_for(&world, &cam);
    scan_sector(&mut state, &world, 0);
    for s in 0..4 {
        scan_sector(&mut state, &world, s);
    }
    assert_eq!(state.stats().sectors, 4);
}

/*──────────────────────── properties ────────────────────────*/

#[test]
fn scanning_twice_changes_nothing() {
    let world = demo::two_rooms_with_door().unwrap();
    let cam = camera(64.0, 128.0, 0.2);
    let mut state = state_for(&world, &cam);
    scan_sector(&mut state, &world, 0);
    let (scans, bunches) = (state.scans().to_vec(), state.bunches().to_vec());
    assert_eq!(scan_sector(&mut state, &world, 0), 0);
    assert_eq!(state.scans(), scans.as_slice());
    assert_eq!(state.bunches(), bunches.as_slice());

    // marks after two identical frames match the first
    let mut engine = Engine::new(Software::new(&config()), config()).unwrap();
    let first = render(&mut engine, &world, &cam);
    let second = render(&mut engine, &world, &cam);
    assert_eq!(first.seen_walls(), second.seen_walls());
    assert_eq!(first.seen_sectors(), second.seen_sectors());
}

#[test]
fn strips_partition_the_screen_and_only_tighten() {
    let (w, h) = (320.0f32, 200.0f32);
    let mut spans = SpanList::new(256);
    spans.reset(0.0, w, 0.0, h);

    let probes: Vec<f64> = (0..64).map(|i| (i as f64 + 0.5) * w as f64 / 64.0).collect();
    let tags = |s: &SpanList| -> Vec<(SpanTag, SpanTag)> {
        probes
            .iter()
            .map(|&x| {
                s.strips()
                    .find(|st| st.x0 <= x && x < st.x1)
                    .map(|st| (st.ctag, st.ftag))
                    .unwrap()
            })
            .collect()
    };

    // a deterministic mix of floors, ceilings and solid walls
    let mut seed = 0x2545_f491u32;
    let mut next = move |range: f32| {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        (seed % 10_000) as f32 / 10_000.0 * range
    };
    let mut before = tags(&spans);
    for i in 0..200 {
        let (a, b) = (next(w), next(w));
        let (x0, x1) = (a.min(b), a.max(b));
        let (y0, y1) = (next(h * 1.2) - h * 0.1, next(h * 1.2) - h * 0.1);
        match i % 3 {
            0 => spans.clip_edge(x0, y0, x1, y1, i as BunchId, |_| {}),
            1 => spans.clip_edge(x1, y0, x0, y1, i as BunchId, |_| {}),
            _ => spans.clip_edge(x0, -1.0e9, x1, -1.0e9, i as BunchId, |_| {}),
        }

        let strips: Vec<_> = spans.strips().collect();
        assert_eq!(strips.first().map(|s| s.x0), Some(0.0));
        assert_eq!(strips.last().map(|s| s.x1), Some(w as f64));
        assert!(strips.windows(2).all(|p| p[0].x1 == p[1].x0));
        assert!(strips.iter().all(|s| s.x0 <= s.x1));

        let after = tags(&spans);
        for ((c0, f0), (c1, f1)) in before.iter().zip(&after) {
            assert!(*c0 == SpanTag::Open || *c1 != SpanTag::Open);
            assert!(*f0 == SpanTag::Open || *f1 != SpanTag::Open);
        }
        before = after;
    }
}

fn pillar_room(order: [usize; 3]) -> World {
    let outer = [vec2(0., 0.), vec2(0., 512.), vec2(512., 512.), vec2(512., 0.)];
    let pillar = |y: f32| [vec2(256., y), vec2(288., y), vec2(288., y + 32.), vec2(256., y + 32.)];
    let pillars = [pillar(96.0), pillar(240.0), pillar(384.0)];
    let mut loops: Vec<&[Vec2]> = vec![&outer[..]];
    loops.extend(order.iter().map(|&i| &pillars[i][..]));
    let mut b = MapBuilder::new();
    b.sector(
        &loops,
        SurfacePlane::flat(0.0, NO_TEXTURE),
        SurfacePlane::flat(128.0, NO_TEXTURE),
    );
    b.build().unwrap()
}

#[test]
fn separate_bunches_come_out_left_to_right() {
    let cam = camera(64.0, 256.0, 0.0);
    let mut runs = Vec::new();
    for order in [[0, 1, 2], [2, 0, 1], [1, 2, 0]] {
        let world = pillar_room(order);
        let mut state = state_for(&world, &cam);
        scan_sector(&mut state, &world, 0);
        assert_eq!(state.bunches().len(), 4);
        let xs: Vec<f32> = std::iter::from_fn(|| {
            select_next(&mut state, &world).map(|b| state.bunches()[b as usize].x_left)
        })
        .collect();
        runs.push(xs);
    }

    // pillars left to right, then the room around them
    let xs = &runs[0];
    assert!(xs[..3].windows(2).all(|p| p[0] < p[1]), "{xs:?}");
    assert!(runs.iter().all(|r| r == xs));
}

#[test]
fn plane_reproduces_its_three_points() {
    let mut checked = 0;
    for i in 0..50 {
        let f = i as f32;
        let pts = [
            PlanePoint::new(vec2(10.0 + f, 20.0), 1.0 + f * 0.1, 0.0, 0.0),
            PlanePoint::new(vec2(200.0, 30.0 + f * 2.0), 4.0, 64.0 + f, 0.0),
            PlanePoint::new(vec2(90.0, 150.0 - f), 2.5 + f * 0.05, 16.0, 32.0 - f),
        ];
        let Some(eq) = PlaneEquation::from_points(&pts) else {
            continue;
        };
        for p in &pts {
            let (depth, u, v) = eq.eval(p.pos).unwrap();
            assert!((depth - p.depth).abs() < 1e-3 * p.depth, "depth {depth} vs {}", p.depth);
            assert!((u - p.u).abs() < 1e-2, "u {u} vs {}", p.u);
            assert!((v - p.v).abs() < 1e-2, "v {v} vs {}", p.v);
        }
        checked += 1;
    }
    assert!(checked > 40);
}

#[test]
fn demo_level_renders_on_both_backends() {
    use yabuild_rs::renderer::{Backend, BackendKind};

    let mut bank = TextureBank::default_with_checker();
    let world = demo::demo_level(&mut bank).unwrap();
    let cam = demo::demo_camera();
    for kind in [BackendKind::Software, BackendKind::Hardware] {
        let cfg = RenderConfig {
            backend: kind,
            ..config()
        };
        let mut engine = Engine::new(Backend::new(kind, &cfg), cfg).unwrap();
        let stats = engine.render_frame(&world, &cam, &mut bank, &mut (), |_, _, _| {});
        assert_eq!(stats.sectors, 2);
        assert!(stats.polygons > 0);
        assert!(stats.masks > 0);
        assert_eq!(engine.renderer().kind(), kind);
    }
}

#[test]
fn tiny_pools_degrade_without_panicking() {
    let mut bank = TextureBank::default_with_checker();
    let world = demo::demo_level(&mut bank).unwrap();
    let cfg = RenderConfig {
        max_scans: 2,
        max_bunches: 1,
        max_span_nodes: 2,
        max_sector_stack: 1,
        max_masks: 1,
        ..config()
    };
    let mut engine = Engine::new(Software::new(&cfg), cfg).unwrap();
    let stats = engine.render_frame(&world, &demo::demo_camera(), &mut bank, &mut (), |_, _, _| {});
    assert!(stats.dropped_scans > 0);
    assert!(stats.capacity_drops() > 0);
    assert_eq!(stats.bunches_drawn, stats.bunches);
}
