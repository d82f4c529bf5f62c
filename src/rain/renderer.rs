use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::surface::Surface;

/// Tunables for the background rain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RainConfig {
    pub glyphs: String,
    /// Viewports narrower than this use `narrow_cell`.
    pub breakpoint: u32,
    pub narrow_cell: u32,
    pub wide_cell: u32,
    pub fade_base: f32,
    /// Extra fade added as intensity drops from 1.0 toward 0.0.
    pub fade_span: f32,
    pub glyph_alpha_base: f32,
    pub glyph_alpha_span: f32,
    /// Chance per frame that a column past the bottom edge restarts at row 0.
    pub reset_chance: f64,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            glyphs: "01ABCDEFGHIJKLMNOPQRSTUVWXYZ$#@%&*+-=<>[]{}()".into(),
            breakpoint: 520,
            narrow_cell: 14,
            wide_cell: 16,
            fade_base: 0.08,
            fade_span: 0.06,
            glyph_alpha_base: 0.55,
            glyph_alpha_span: 0.35,
            reset_chance: 0.025,
        }
    }
}

impl RainConfig {
    pub fn cell_for_width(&self, width: u32) -> u32 {
        if width < self.breakpoint {
            self.narrow_cell
        } else {
            self.wide_cell
        }
    }
}

/// Column-per-cell falling glyph streams.
pub struct RainRenderer {
    config: RainConfig,
    glyphs: Vec<char>,
    width: u32,
    height: u32,
    cell: u32,
    drops: Vec<u32>,
}

impl RainRenderer {
    pub fn new(config: RainConfig, width: u32, height: u32, rng: &mut dyn RngCore) -> Self {
        let mut glyphs: Vec<char> = config.glyphs.chars().collect();
        if glyphs.is_empty() {
            glyphs.push('0');
        }
        let mut renderer = Self {
            config,
            glyphs,
            width: 0,
            height: 0,
            cell: 1,
            drops: Vec::new(),
        };
        renderer.resize(width, height, rng);
        renderer
    }

    /// Recomputes the column grid and scatters the drops over the viewport.
    pub fn resize(&mut self, width: u32, height: u32, rng: &mut dyn RngCore) {
        self.width = width;
        self.height = height;
        self.cell = self.config.cell_for_width(width).max(1);

        let columns = (width / self.cell) as usize;
        let rows = (height / self.cell).max(1);
        self.drops = (0..columns).map(|_| rng.gen_range(0..rows)).collect();
    }

    pub fn cell(&self) -> u32 {
        self.cell
    }

    pub fn columns(&self) -> usize {
        self.drops.len()
    }

    pub fn drops(&self) -> &[u32] {
        &self.drops
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn overlay_opacity(&self, intensity: f32) -> f32 {
        self.config.fade_base + (1.0 - intensity.clamp(0.0, 1.0)) * self.config.fade_span
    }

    /// Draws one frame: trail fade, then one glyph per column. The column grid
    /// follows the surface if its size changed since the last frame.
    pub fn draw(&mut self, surface: &mut dyn Surface, intensity: f32, rng: &mut dyn RngCore) {
        let (width, height) = surface.size();
        if (width, height) != (self.width, self.height) {
            self.resize(width, height, rng);
        }
        let intensity = intensity.clamp(0.0, 1.0);
        surface.fade(self.overlay_opacity(intensity));

        for (column, drop) in self.drops.iter_mut().enumerate() {
            let glyph = self.glyphs[rng.gen_range(0..self.glyphs.len())];
            let x = column as u32 * self.cell;
            let y = drop.saturating_mul(self.cell);

            let shimmer: f32 = rng.gen();
            let alpha = self.config.glyph_alpha_base
                + shimmer * self.config.glyph_alpha_span * intensity;
            surface.draw_glyph(x, y, glyph, alpha);

            if y > self.height && rng.gen_bool(self.config.reset_chance.clamp(0.0, 1.0)) {
                *drop = 0;
            } else {
                *drop = drop.saturating_add(1);
            }
        }
    }
}
