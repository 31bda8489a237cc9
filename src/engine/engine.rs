//! Frame driver.

use log::{debug, trace, warn};

use crate::{
    config::{ConfigError, RenderConfig},
    engine::{
        frame::{FrameRenderState, FrameStats},
        marks::DrawnSink,
        masks::draw_masks,
        order::select_next,
        scan::scan_sector,
        types::View,
        walls::{Output, draw_bunch},
    },
    renderer::{Rgba, SurfaceRenderer},
    world::{Camera, SectorId, TextureSource, World},
};

/// Owns the renderer and the per-frame scratch; draws one frame per call.
pub struct Engine<R: SurfaceRenderer> {
    renderer: R,
    config: RenderConfig,
    state: FrameRenderState,
}

impl<R: SurfaceRenderer> Engine<R> {
    pub fn new(renderer: R, config: RenderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = FrameRenderState::new(&config);
        Ok(Self {
            renderer,
            config,
            state,
        })
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Scratch of the last frame, for inspection.
    pub fn state(&self) -> &FrameRenderState {
        &self.state
    }

    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), ConfigError> {
        let config = RenderConfig {
            width,
            height,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Draw the world as seen by `camera` and hand the frame to `submit`.
    ///
    /// An eye outside every sector gives an empty (cleared) frame.
    pub fn render_frame(
        &mut self,
        world: &World,
        camera: &Camera,
        textures: &mut dyn TextureSource,
        sink: &mut dyn DrawnSink,
        submit: impl FnOnce(&[Rgba], usize, usize),
    ) -> FrameStats {
        let (w, h) = (self.config.width, self.config.height);
        self.renderer.begin_frame(w, h);
        self.state
            .reset(View::new(camera, w, h, self.config.near), world.sectors.len());

        match world.find_sector(camera.pos.truncate()) {
            Some(start) => {
                let mut out = Output {
                    renderer: &mut self.renderer,
                    textures,
                    sink,
                };
                draw_rooms(&mut self.state, world, start, &mut out);
                draw_masks(&mut self.state, world, &mut out);
            }
            None => trace!("eye {} is outside every sector", camera.pos),
        }

        self.renderer.end_frame(submit);

        let stats = &mut self.state.stats;
        stats.span_overflows = self.state.spans.overflows();
        debug!("{stats}");
        if stats.capacity_drops() > 0 {
            warn!(
                "capacity fallback: {} scans, {} bunches, {} sectors, {} masks dropped, {} span overflows",
                stats.dropped_scans,
                stats.dropped_bunches,
                stats.dropped_sectors,
                stats.dropped_masks,
                stats.span_overflows
            );
        }
        *stats
    }
}

/// Scan the camera sector, then draw bunches front to back until none
/// are left; drawing a portal scans the sector behind it.
pub(crate) fn draw_rooms<R: SurfaceRenderer>(
    state: &mut FrameRenderState,
    world: &World,
    start: SectorId,
    out: &mut Output<'_, R>,
) {
    scan_sector(state, world, start);
    while let Some(bunch) = select_next(state, world) {
        draw_bunch(state, world, bunch, out);
        state.stats.bunches_drawn += 1;
    }
}
