//! Renderer configuration: viewport, pool capacities and rasterizer knobs.

use thiserror::Error;

use crate::renderer::{BackendKind, Rgba};

/// Largest bunch count a `u16` id can address.
pub const MAX_BUNCHES: usize = 1 << 16;

/// Largest supported hyperbolic step shift (256-pixel runs).
pub const MAX_HYPERBOLIC_SHIFT: u32 = 8;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("viewport {width}x{height} must be at least 1x1")]
    Viewport { width: usize, height: usize },

    #[error("{pool} capacity {value} is out of range (1..={max})")]
    Capacity {
        pool: &'static str,
        value: usize,
        max: usize,
    },

    #[error("near distance {0} must be positive and finite")]
    Near(f32),

    #[error("hyperbolic shift {0} exceeds {MAX_HYPERBOLIC_SHIFT}")]
    HyperbolicShift(u32),

    #[error("portal scan distance {0} must be non-negative and finite")]
    ScanDistance(f32),
}

/// Everything a [`crate::engine::Engine`] is sized and tuned from.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub backend: BackendKind,

    /* per-frame pools */
    pub max_scans: usize,
    pub max_bunches: usize,
    pub max_span_nodes: usize,
    pub max_sector_stack: usize,
    pub max_masks: usize,

    /// u/v are divided exactly every `1 << hyperbolic_shift` pixels
    pub hyperbolic_shift: u32,
    /// camera-space near plane distance
    pub near: f32,
    /// portals whose line passes closer than this to the eye are entered
    /// before they are drawn
    pub scan_distance: f32,
    pub depth_test: bool,
    pub sky_color: Rgba,
    pub clear_color: Rgba,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
            backend: BackendKind::Software,
            max_scans: 4096,
            max_bunches: 1024,
            max_span_nodes: 4096,
            max_sector_stack: 1024,
            max_masks: 512,
            hyperbolic_shift: 4,
            near: 0.25,
            scan_distance: 4.0,
            depth_test: true,
            sky_color: 0xFF_40_70_B0,
            clear_color: 0xFF_20_20_20,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Viewport {
                width: self.width,
                height: self.height,
            });
        }
        for (pool, value, max) in [
            ("scan", self.max_scans, u32::MAX as usize),
            ("bunch", self.max_bunches, MAX_BUNCHES),
            ("span node", self.max_span_nodes, u32::MAX as usize),
            ("sector stack", self.max_sector_stack, usize::MAX),
            ("mask", self.max_masks, usize::MAX),
        ] {
            if value == 0 || value > max {
                return Err(ConfigError::Capacity { pool, value, max });
            }
        }
        if !(self.near > 0.0 && self.near.is_finite()) {
            return Err(ConfigError::Near(self.near));
        }
        if self.hyperbolic_shift > MAX_HYPERBOLIC_SHIFT {
            return Err(ConfigError::HyperbolicShift(self.hyperbolic_shift));
        }
        if !(self.scan_distance >= 0.0 && self.scan_distance.is_finite()) {
            return Err(ConfigError::ScanDistance(self.scan_distance));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(RenderConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_values() {
        let cfg = RenderConfig {
            max_bunches: MAX_BUNCHES + 1,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Capacity { pool: "bunch", .. })
        ));

        let cfg = RenderConfig {
            near: 0.0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Near(0.0)));

        let cfg = RenderConfig {
            hyperbolic_shift: 9,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err().to_string(),
            "hyperbolic shift 9 exceeds 8"
        );

        let cfg = RenderConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Viewport { .. })));
    }
}
