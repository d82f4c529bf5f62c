/// Pixel-space drawing target for the rain.
pub trait Surface: Send {
    fn size(&self) -> (u32, u32);

    /// Paints a translucent black overlay over the whole viewport.
    fn fade(&mut self, opacity: f32);

    fn draw_glyph(&mut self, x: u32, y: u32, glyph: char, alpha: f32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    glyph: char,
    alpha: f32,
}

/// Character-cell framebuffer. Pixels map onto cells of `cell` pixels square.
#[derive(Debug, Clone)]
pub struct GridSurface {
    width: u32,
    height: u32,
    cell: u32,
    cols: usize,
    cells: Vec<Option<Cell>>,
}

/// Cells dimmer than this are cleared by `fade`.
const MIN_VISIBLE_ALPHA: f32 = 0.04;

impl GridSurface {
    pub fn new(width: u32, height: u32, cell: u32) -> Self {
        let cell = cell.max(1);
        let cols = (width / cell) as usize;
        let rows = (height / cell) as usize;
        Self {
            width,
            height,
            cell,
            cols,
            cells: vec![None; cols * rows],
        }
    }

    pub fn rows(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.cells.len() / self.cols
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn alpha_at(&self, col: usize, row: usize) -> f32 {
        self.index(col, row)
            .and_then(|idx| self.cells[idx])
            .map(|cell| cell.alpha)
            .unwrap_or(0.0)
    }

    pub fn glyph_at(&self, col: usize, row: usize) -> Option<char> {
        self.index(col, row)
            .and_then(|idx| self.cells[idx])
            .map(|cell| cell.glyph)
    }

    pub fn lit_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Renders visible cells as text, one line per row.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.rows());
        for row in self.cells.chunks(self.cols.max(1)) {
            for cell in row {
                out.push(cell.map(|c| c.glyph).unwrap_or(' '));
            }
            out.push('\n');
        }
        out
    }

    fn index(&self, col: usize, row: usize) -> Option<usize> {
        (col < self.cols && row < self.rows()).then(|| row * self.cols + col)
    }
}

impl Surface for GridSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fade(&mut self, opacity: f32) {
        let keep = 1.0 - opacity.clamp(0.0, 1.0);
        for slot in self.cells.iter_mut() {
            if let Some(cell) = slot {
                cell.alpha *= keep;
                if cell.alpha < MIN_VISIBLE_ALPHA {
                    *slot = None;
                }
            }
        }
    }

    fn draw_glyph(&mut self, x: u32, y: u32, glyph: char, alpha: f32) {
        let col = (x / self.cell) as usize;
        let row = (y / self.cell) as usize;
        if let Some(idx) = self.index(col, row) {
            self.cells[idx] = Some(Cell {
                glyph,
                alpha: alpha.clamp(0.0, 1.0),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_map_pixels_to_cells_and_clip() {
        let mut surface = GridSurface::new(160, 64, 16);
        assert_eq!((surface.cols(), surface.rows()), (10, 4));

        surface.draw_glyph(33, 17, 'A', 0.9);
        surface.draw_glyph(160, 0, 'B', 0.9);
        surface.draw_glyph(0, 64, 'C', 0.9);

        assert_eq!(surface.glyph_at(2, 1), Some('A'));
        assert_eq!(surface.lit_cells(), 1);
    }

    #[test]
    fn fade_dims_then_clears() {
        let mut surface = GridSurface::new(32, 32, 16);
        surface.draw_glyph(0, 0, '#', 0.8);

        surface.fade(0.5);
        assert!((surface.alpha_at(0, 0) - 0.4).abs() < 1e-6);

        for _ in 0..10 {
            surface.fade(0.5);
        }
        assert_eq!(surface.glyph_at(0, 0), None);
        assert!(surface.to_text().trim().is_empty());
    }
}
