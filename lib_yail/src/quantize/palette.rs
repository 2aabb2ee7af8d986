use std::collections::HashMap;

use log::debug;

use crate::color::Rgb;
use crate::constants::PALETTE_CAPACITY;
use crate::grid::PixelGrid;
use crate::quantize::lattice;

/// Replacements recorded for colors evicted by [`CustomPalette::rebalance`].
///
/// An evicted color maps to its nearest surviving custom color and to its
/// nearest lattice color; repaint prefers the custom survivor. Pure black
/// and pure white map to themselves (they are lattice members and never
/// spend a custom slot).
#[derive(Debug, Default)]
pub struct Remapping {
    pub custom: HashMap<Rgb, Rgb>,
    pub lattice: HashMap<Rgb, Rgb>,
}

impl Remapping {
    pub fn is_empty(&self) -> bool {
        self.custom.is_empty() && self.lattice.is_empty()
    }

    /// The replacement repaint applies: custom survivor first, then lattice.
    pub fn resolve(&self, color: Rgb) -> Option<Rgb> {
        self.custom
            .get(&color)
            .or_else(|| self.lattice.get(&color))
            .copied()
    }
}

/// The per-image custom palette: up to 16 extra colors supplementing the
/// fixed lattice.
///
/// Built fresh for every conversion run. Entries keep insertion order
/// across evictions; once the palette has stabilized (no further
/// `record`/`rebalance` calls), an entry's position is its codec index
/// (color bytes 240..=255) and the order it is serialized in.
#[derive(Debug, Default)]
pub struct CustomPalette {
    entries: Vec<(Rgb, u32)>,
    index: HashMap<Rgb, usize>,
}

impl CustomPalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, color: Rgb) -> bool {
        self.index.contains_key(&color)
    }

    pub fn index_of(&self, color: Rgb) -> Option<usize> {
        self.index.get(&color).copied()
    }

    /// Entries in insertion (= codec index) order.
    pub fn colors(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.entries.iter().map(|&(color, _)| color)
    }

    #[cfg(test)]
    fn score_of(&self, color: Rgb) -> Option<u32> {
        self.index.get(&color).map(|&i| self.entries[i].1)
    }

    /// Notes one more use of `color`: inserts it with score 0, or bumps
    /// the score of an existing entry.
    pub fn record(&mut self, color: Rgb) {
        match self.index.get(&color) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(color, self.entries.len());
                self.entries.push((color, 0));
            }
        }
    }

    /// Bounds the palette to its 16-slot budget.
    ///
    /// Pure black and pure white are always evicted first and map to
    /// themselves: both are exact lattice members (indices 0 and 239), so
    /// they keep rendering as themselves without spending a slot. Then the
    /// single lowest-scored entry is evicted until at most 16 remain; ties
    /// fall to the earliest-inserted entry. Every other evicted color maps
    /// to its nearest surviving custom color and its nearest lattice color.
    pub fn rebalance(&mut self) -> Remapping {
        let mut remapping = Remapping::default();

        for special in [Rgb::BLACK, Rgb::WHITE] {
            if self.contains(special) {
                self.entries.retain(|&(color, _)| color != special);
                remapping.custom.insert(special, special);
            }
        }

        let mut evicted = Vec::new();
        while self.entries.len() > PALETTE_CAPACITY {
            let mut victim = 0;
            for (i, entry) in self.entries.iter().enumerate().skip(1) {
                if entry.1 < self.entries[victim].1 {
                    victim = i;
                }
            }
            evicted.push(self.entries.remove(victim).0);
        }

        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, &(color, _))| (color, i))
            .collect();

        for color in evicted {
            if let Some(survivor) = self.nearest(color) {
                remapping.custom.insert(color, survivor);
            }
            remapping.lattice.insert(color, lattice::nearest(color));
        }

        if !remapping.is_empty() {
            debug!(
                "Palette rebalanced: {} entries kept, {} colors remapped",
                self.entries.len(),
                remapping.custom.len().max(remapping.lattice.len())
            );
        }
        remapping
    }

    /// Conflation pass run after `rebalance`: every pixel whose color is
    /// no longer in the palette is rewritten to its recorded replacement.
    ///
    /// Colors found in neither replacement map are left untouched; the
    /// encoder rejects anything that is neither a lattice member nor a
    /// palette entry, so a gap here surfaces as an encoding error instead
    /// of being patched over.
    pub fn repaint(&self, grid: &mut PixelGrid, remapping: &Remapping) {
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let color = grid.get(x, y);
                if self.contains(color) {
                    continue;
                }
                if let Some(replacement) = remapping.resolve(color) {
                    grid.set(x, y, replacement);
                }
            }
        }
    }

    /// Builds the stabilized dithering palette from a color-reduced copy
    /// of the image: every pixel is tallied, then the 16-slot bound is
    /// applied, leaving the highest-frequency colors minus pure black and
    /// pure white.
    pub fn seed_from(grid: &PixelGrid) -> CustomPalette {
        let mut palette = CustomPalette::new();
        for &pixel in grid.pixels() {
            palette.record(pixel);
        }
        palette.rebalance();
        debug!("Seeded {}-color palette", palette.len());
        palette
    }

    /// Nearest palette entry by squared distance, ties toward the lower
    /// index. `None` when the palette is empty.
    pub fn nearest(&self, color: Rgb) -> Option<Rgb> {
        let mut best: Option<Rgb> = None;
        let mut best_distance = u32::MAX;
        for &(entry, _) in &self.entries {
            let distance = entry.distance_squared(color);
            if distance < best_distance {
                best_distance = distance;
                best = Some(entry);
            }
        }
        best
    }

    /// Up to `n` nearest palette entries, closest first; ties keep the
    /// lower palette index.
    pub fn nearest_n(&self, color: Rgb, n: usize) -> Vec<Rgb> {
        let mut ranked: Vec<(u32, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, &(entry, _))| (entry.distance_squared(color), i))
            .collect();
        ranked.sort();
        ranked
            .into_iter()
            .take(n)
            .map(|(_, i)| self.entries[i].0)
            .collect()
    }
}
