//! Per-block two-color search with error diffusion.
//!
//! Each fine-mode block may render at most two colors, but committing a
//! block changes what its neighbors should render through diffused
//! error. For every block this search simulates each unordered pair of
//! candidate colors on an isolated working patch, keeps the pair with
//! the least accumulated squared error, then commits it for real and
//! diffuses the residue onto pixels no block has finalized yet.

use log::debug;

use crate::color::Rgb;
use crate::grid::PixelGrid;
use crate::quantize::{lattice, CustomPalette};

use super::diffusion::{distribute_error, LeftSpill, PixelBuffer};

const BLOCK_W: usize = 2;
const BLOCK_H: usize = 4;

// The working patch adds a context column on both sides and a context
// row below the block, so simulated diffusion lands where it would on
// the real grid.
const PATCH_W: usize = BLOCK_W + 2;
const PATCH_H: usize = BLOCK_H + 1;

/// Isolated copy of one block plus its context border. Out-of-image
/// context pixels read as black.
#[derive(Clone, Copy)]
struct Patch {
    pixels: [Rgb; PATCH_W * PATCH_H],
}

impl Patch {
    fn from_grid(grid: &PixelGrid, bx: usize, by: usize) -> Self {
        let mut pixels = [Rgb::BLACK; PATCH_W * PATCH_H];
        for (py, row) in pixels.chunks_mut(PATCH_W).enumerate() {
            for (px, pixel) in row.iter_mut().enumerate() {
                let gx = bx as isize + px as isize - 1;
                let gy = (by + py) as isize;
                if gx >= 0
                    && (gx as usize) < grid.width()
                    && (gy as usize) < grid.height()
                {
                    *pixel = grid.get(gx as usize, gy as usize);
                }
            }
        }
        Self { pixels }
    }
}

impl PixelBuffer for Patch {
    fn dims(&self) -> (usize, usize) {
        (PATCH_W, PATCH_H)
    }

    fn pixel(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * PATCH_W + x]
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        self.pixels[y * PATCH_W + x] = color;
    }
}

/// Candidate colors for a block, deduplicated in discovery order: each
/// pixel contributes its nearest lattice color and its four nearest
/// custom palette colors.
fn candidate_colors(grid: &PixelGrid, bx: usize, by: usize, palette: &CustomPalette) -> Vec<Rgb> {
    let mut candidates = Vec::new();
    for yi in 0..BLOCK_H {
        for xi in 0..BLOCK_W {
            let pixel = grid.get(bx + xi, by + yi);
            let quantized = lattice::nearest(pixel);
            if !candidates.contains(&quantized) {
                candidates.push(quantized);
            }
            for color in palette.nearest_n(pixel, 4) {
                if !candidates.contains(&color) {
                    candidates.push(color);
                }
            }
        }
    }
    candidates
}

/// Simulates committing the pair (c1, c2) on a working copy of the
/// patch. Returns the accumulated squared error and the bitmap of block
/// pixels assigned to c2, aborting early (with a partial, already
/// over-budget error) once the running total exceeds `budget`.
fn simulate_pair(template: &Patch, c1: Rgb, c2: Rgb, budget: u64) -> (u64, u8) {
    let mut work = *template;
    let mut error = 0u64;
    let mut map = 0u8;
    'rows: for yi in 0..BLOCK_H {
        if error > budget {
            break;
        }
        for xi in 1..=BLOCK_W {
            let original = work.pixel(xi, yi);
            let e1 = original.distance_squared(c1) as u64;
            let e2 = original.distance_squared(c2) as u64;
            let used = if e2 < e1 {
                error += e2;
                map |= 1 << ((xi - 1) + yi * BLOCK_W);
                c2
            } else {
                error += e1;
                c1
            };
            if error > budget {
                break 'rows;
            }
            distribute_error(&mut work, xi, yi, original, used, LeftSpill::Allowed);
        }
    }
    (error, map)
}

/// Searches the best two-color commitment for the block at (bx, by) and
/// applies it to the grid, diffusing the residual error forward.
fn dither_block(grid: &mut PixelGrid, palette: &CustomPalette, bx: usize, by: usize) {
    let candidates = candidate_colors(grid, bx, by, palette);
    let Some(&fallback) = candidates.first() else {
        return;
    };

    let template = Patch::from_grid(grid, bx, by);
    let mut best: Option<(Rgb, Rgb, u8)> = None;
    let mut best_error = u64::MAX;
    for i in 0..candidates.len() {
        for j in i + 1..candidates.len() {
            let (error, map) = simulate_pair(&template, candidates[i], candidates[j], best_error);
            if error < best_error {
                best_error = error;
                best = Some((candidates[i], candidates[j], map));
            }
        }
    }
    // A block whose pixels produce a single candidate goes solid.
    let (c1, c2, map) = best.unwrap_or((fallback, fallback, 0));

    for yi in 0..BLOCK_H {
        for xi in 0..BLOCK_W {
            let original = grid.get(bx + xi, by + yi);
            let used = if map & (1 << (xi + yi * BLOCK_W)) != 0 {
                c2
            } else {
                c1
            };
            distribute_error(
                grid,
                bx + xi,
                by + yi,
                original,
                used,
                LeftSpill::BlockBounded,
            );
        }
    }
}

/// Dithers the whole grid block by block in raster order.
///
/// The order is a hard sequential dependency: each commit diffuses error
/// onto pixels later blocks will read, so blocks of one image cannot be
/// processed out of order or in parallel.
pub fn dither_pass(grid: &mut PixelGrid, palette: &CustomPalette) {
    debug!(
        "Dithering {}x{} grid against {} palette colors",
        grid.width(),
        grid.height(),
        palette.len()
    );
    for by in (0..grid.height()).step_by(BLOCK_H) {
        for bx in (0..grid.width()).step_by(BLOCK_W) {
            dither_block(grid, palette, bx, by);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_palette() -> CustomPalette {
        CustomPalette::new()
    }

    #[test]
    fn test_patch_pads_out_of_image_context_with_black() {
        let grid = PixelGrid::filled(2, 4, Rgb::new(100, 100, 100));
        let patch = Patch::from_grid(&grid, 0, 0);
        // Left and right context columns and the bottom context row fall
        // outside the 2x4 image.
        assert_eq!(patch.pixel(0, 0), Rgb::BLACK);
        assert_eq!(patch.pixel(3, 2), Rgb::BLACK);
        assert_eq!(patch.pixel(1, 4), Rgb::BLACK);
        // Block pixels sit at patch columns 1..=2.
        assert_eq!(patch.pixel(1, 0), Rgb::new(100, 100, 100));
        assert_eq!(patch.pixel(2, 3), Rgb::new(100, 100, 100));
    }

    #[test]
    fn test_candidates_for_uniform_block_on_lattice() {
        let grid = PixelGrid::filled(2, 4, Rgb::new(102, 146, 128));
        let candidates = candidate_colors(&grid, 0, 0, &empty_palette());
        assert_eq!(candidates, vec![Rgb::new(102, 146, 128)]);
    }

    #[test]
    fn test_candidates_include_palette_neighbors_once() {
        let grid = PixelGrid::filled(2, 4, Rgb::new(100, 100, 100));
        let mut palette = CustomPalette::new();
        palette.record(Rgb::new(101, 101, 101));
        palette.record(Rgb::new(9, 9, 9));
        let candidates = candidate_colors(&grid, 0, 0, &palette);
        assert_eq!(
            candidates,
            vec![
                lattice::nearest(Rgb::new(100, 100, 100)),
                Rgb::new(101, 101, 101),
                Rgb::new(9, 9, 9),
            ]
        );
    }

    #[test]
    fn test_simulate_pair_prefers_exact_match() {
        let grid = PixelGrid::filled(2, 4, Rgb::new(40, 40, 40));
        let patch = Patch::from_grid(&grid, 0, 0);
        let exact = Rgb::new(40, 40, 40);
        let off = Rgb::new(90, 90, 90);
        let (error, map) = simulate_pair(&patch, exact, off, u64::MAX);
        assert_eq!(error, 0);
        assert_eq!(map, 0);
        let (error, map) = simulate_pair(&patch, off, exact, u64::MAX);
        assert_eq!(error, 0);
        assert_eq!(map, 0xFF);
    }

    #[test]
    fn test_simulate_pair_aborts_over_budget() {
        let grid = PixelGrid::filled(2, 4, Rgb::new(40, 40, 40));
        let patch = Patch::from_grid(&grid, 0, 0);
        let far = Rgb::new(240, 240, 240);
        let farther = Rgb::new(255, 255, 255);
        let (error, _) = simulate_pair(&patch, far, farther, 10);
        // Aborted after the first pixel: its error alone beats the budget.
        assert_eq!(error, far.distance_squared(Rgb::new(40, 40, 40)) as u64);
    }

    #[test]
    fn test_dither_keeps_exact_two_color_block() {
        // Two lattice colors in a checker pattern quantize to themselves,
        // so the best pair reproduces the block exactly.
        let dark = Rgb::new(51, 36, 64);
        let light = Rgb::new(204, 216, 192);
        let mut grid = PixelGrid::filled(2, 4, dark);
        for y in 0..4 {
            grid.set(y % 2, y, light);
        }
        let expected = grid.clone();
        dither_pass(&mut grid, &empty_palette());
        assert_eq!(grid, expected);
    }

    #[test]
    fn test_dither_solid_block_with_single_candidate() {
        let mut grid = PixelGrid::filled(2, 4, Rgb::new(102, 146, 128));
        dither_pass(&mut grid, &empty_palette());
        assert!(grid
            .pixels()
            .iter()
            .all(|&pixel| pixel == Rgb::new(102, 146, 128)));
    }

    #[test]
    fn test_dither_resolves_every_pixel_to_a_candidate() {
        let mut palette = CustomPalette::new();
        palette.record(Rgb::new(123, 17, 200));
        let mut grid = PixelGrid::filled(8, 8, Rgb::new(120, 20, 190));
        for y in 0..8 {
            for x in 0..8 {
                grid.set(x, y, Rgb::new(110 + (x * 3) as u8, 15 + y as u8, 180));
            }
        }
        dither_pass(&mut grid, &palette);
        for &pixel in grid.pixels() {
            assert!(
                lattice::contains(pixel) || palette.contains(pixel),
                "pixel {:?} is neither lattice nor palette",
                pixel
            );
        }
    }
}
