use clap::Parser;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::time::{Duration, Instant};

use yabuild_rs::{
    config::RenderConfig,
    engine::{Engine, MapMarks},
    renderer::{Backend, BackendKind},
    world::{TextureBank, demo},
};

const EYE_HEIGHT: f32 = 48.0;
const WALK_SPEED: f32 = 4.0;
const TURN_SPEED: f32 = 0.05;
const LOOK_SPEED: f32 = 6.0;
/// Closest the eye may get to a solid wall, well outside the near plane.
const WALL_MARGIN: f32 = 16.0;

/// Walk the demo map with the portal renderer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Rasterization path
    #[arg(long, value_enum, default_value_t = BackendKind::Software)]
    backend: BackendKind,

    #[arg(long, default_value_t = 1280)]
    width: usize,

    #[arg(long, default_value_t = 800)]
    height: usize,

    /// Horizontal field of view, degrees
    #[arg(long, default_value_t = 90.0)]
    fov: f32,

    /// Exact perspective divide every 2^N pixels
    #[arg(long, default_value_t = 4)]
    hyperbolic_shift: u32,

    /// Disable the software depth test
    #[arg(long)]
    no_depth_test: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = RenderConfig {
        width: args.width,
        height: args.height,
        backend: args.backend,
        hyperbolic_shift: args.hyperbolic_shift,
        depth_test: !args.no_depth_test,
        ..Default::default()
    };
    let mut engine = Engine::new(Backend::new(config.backend, &config), config)?;
    let margin = WALL_MARGIN.max(engine.config().near * 4.0);

    let mut texture_bank = TextureBank::default_with_checker();
    let world = demo::demo_level(&mut texture_bank)?;
    let mut marks = MapMarks::new(&world);

    let mut camera = demo::demo_camera();
    camera.fov = args.fov.to_radians();

    log::info!(
        "demo map: {} sectors, {} walls, {} sprites ({:?} backend)",
        world.sectors.len(),
        world.walls.len(),
        world.sprites.len(),
        engine.renderer().kind()
    );

    let (w, h) = (args.width, args.height);
    let mut win = Window::new("Rust Build Portal Render", w, h, WindowOptions::default())?;
    win.set_target_fps(60);

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO; // cumulated render time
    let mut acc_frames = 0usize; // frames in the current window
    let mut last_print = Instant::now(); // when we printed last

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let t0 = Instant::now(); // ┌─ frame timer start

        /* movement --------------------------------------------------------- */
        let run = win.is_key_down(Key::LeftShift) || win.is_key_down(Key::RightShift);
        let speed = if run { WALK_SPEED * 2.0 } else { WALK_SPEED };
        let mut forward = 0.0;
        let mut side = 0.0;
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += speed;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= speed;
        }
        if win.is_key_down(Key::A) {
            side -= speed;
        }
        if win.is_key_down(Key::D) {
            side += speed;
        }
        if win.is_key_down(Key::Left) {
            camera.turn(TURN_SPEED);
        }
        if win.is_key_down(Key::Right) {
            camera.turn(-TURN_SPEED);
        }
        if win.is_key_down(Key::PageUp) {
            camera.look(-LOOK_SPEED, h as f32);
        }
        if win.is_key_down(Key::PageDown) {
            camera.look(LOOK_SPEED, h as f32);
        }
        if win.is_key_down(Key::Q) {
            camera.roll -= 0.01;
        }
        if win.is_key_down(Key::E) {
            camera.roll += 0.01;
        }
        if win.is_key_pressed(Key::Home, KeyRepeat::No) {
            camera.horizon = 0.0;
            camera.roll = 0.0;
        }

        /* stay inside the map and off the walls, eye follows the floor */
        let mut moved = camera;
        moved.step(forward, side);
        if let Some(sector) = world
            .find_sector(moved.pos.truncate())
            .filter(|&s| world.wall_clearance(s, moved.pos.truncate()) >= margin)
        {
            camera = moved;
            camera.pos.z = world.floor_z(sector, camera.pos.truncate()) + EYE_HEIGHT;
        }

        /* draw */
        let stats = engine.render_frame(
            &world,
            &camera,
            &mut texture_bank,
            &mut marks,
            |fb, fw, fh| {
                // ─────────── accumulate & report every ~3 s ────────────────────
                acc_time += t0.elapsed();
                acc_frames += 1;
                let shown = if fb.is_empty() {
                    win.update();
                    Ok(())
                } else {
                    win.update_with_buffer(fb, fw, fh)
                };
                if let Err(err) = shown {
                    log::error!("present failed: {err}");
                }
            },
        );

        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames as f64;
            let fps = 1000.0 / avg_ms;
            println!("avg render: {:.2} ms  ({:.1} FPS)  {}", avg_ms, fps, stats);
            println!(
                "automap: {}/{} sectors, {}/{} walls seen",
                marks.seen_sectors(),
                world.sectors.len(),
                marks.seen_walls(),
                world.walls.len()
            );
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}
