//! Adaptive color reduction via median cut.
//!
//! Every conversion starts by folding the image onto at most 32 colors so
//! the block passes and the palette budget work against a bounded color
//! set; the dithered pipeline runs this on a scratch copy to seed its
//! palette while dithering the original pixels.

use std::collections::HashMap;

use log::debug;

use crate::color::Rgb;
use crate::grid::PixelGrid;

/// A box of distinct colors with their pixel populations.
struct ColorBox {
    colors: Vec<(Rgb, u32)>,
}

fn channel(color: Rgb, axis: usize) -> u8 {
    match axis {
        0 => color.r,
        1 => color.g,
        _ => color.b,
    }
}

impl ColorBox {
    /// The channel spanning the widest value range, and that range.
    fn widest_axis(&self) -> (usize, u8) {
        let mut best_axis = 0;
        let mut best_range = 0;
        for axis in 0..3 {
            let mut min = u8::MAX;
            let mut max = u8::MIN;
            for &(color, _) in &self.colors {
                let value = channel(color, axis);
                min = min.min(value);
                max = max.max(value);
            }
            let range = max - min;
            if range > best_range {
                best_range = range;
                best_axis = axis;
            }
        }
        (best_axis, best_range)
    }

    /// Splits at the population median of the widest channel. Requires at
    /// least two distinct colors.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let (axis, _) = self.widest_axis();
        self.colors
            .sort_by_key(|&(color, _)| (channel(color, axis), color));
        let total: u64 = self.colors.iter().map(|&(_, count)| count as u64).sum();
        let mut accumulated = 0u64;
        let mut split = self.colors.len() - 1;
        for (i, &(_, count)) in self.colors.iter().enumerate() {
            accumulated += count as u64;
            if accumulated * 2 >= total {
                split = i + 1;
                break;
            }
        }
        let split = split.clamp(1, self.colors.len() - 1);
        let upper = self.colors.split_off(split);
        (self, ColorBox { colors: upper })
    }

    /// Population-weighted per-channel mean, truncating.
    fn mean(&self) -> Rgb {
        let mut sums = [0u64; 3];
        let mut total = 0u64;
        for &(color, count) in &self.colors {
            let count = count as u64;
            sums[0] += color.r as u64 * count;
            sums[1] += color.g as u64 * count;
            sums[2] += color.b as u64 * count;
            total += count;
        }
        Rgb::new(
            (sums[0] / total) as u8,
            (sums[1] / total) as u8,
            (sums[2] / total) as u8,
        )
    }
}

/// Reduces the grid to at most `max_colors` distinct colors in place.
/// Grids already within the bound are left untouched.
pub fn reduce(grid: &mut PixelGrid, max_colors: usize) {
    let mut histogram: HashMap<Rgb, u32> = HashMap::new();
    for &pixel in grid.pixels() {
        *histogram.entry(pixel).or_insert(0) += 1;
    }
    if histogram.len() <= max_colors {
        debug!(
            "Reduction skipped: {} distinct colors within bound {}",
            histogram.len(),
            max_colors
        );
        return;
    }
    let distinct = histogram.len();

    let mut colors: Vec<(Rgb, u32)> = histogram.into_iter().collect();
    colors.sort();
    let mut boxes = vec![ColorBox { colors }];

    while boxes.len() < max_colors {
        // Widest splittable box; ties fall to the lowest index.
        let mut candidate: Option<(usize, u8)> = None;
        for (i, color_box) in boxes.iter().enumerate() {
            if color_box.colors.len() < 2 {
                continue;
            }
            let (_, range) = color_box.widest_axis();
            if candidate.map_or(true, |(_, best)| range > best) {
                candidate = Some((i, range));
            }
        }
        let Some((i, _)) = candidate else {
            break;
        };
        let (lower, upper) = boxes.remove(i).split();
        boxes.push(lower);
        boxes.push(upper);
    }

    let mut mapping: HashMap<Rgb, Rgb> = HashMap::new();
    for color_box in &boxes {
        let representative = color_box.mean();
        for &(color, _) in &color_box.colors {
            mapping.insert(color, representative);
        }
    }

    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if let Some(&replacement) = mapping.get(&grid.get(x, y)) {
                grid.set(x, y, replacement);
            }
        }
    }
    debug!(
        "Reduced {} distinct colors into {} boxes",
        distinct,
        boxes.len()
    );
}
