//! Block-level operations: slicing the grid into fixed-size blocks,
//! folding a block onto two representative colors, and encoding a
//! resolved block into its symbol and color bytes.

use thiserror::Error;

use crate::color::Rgb;
use crate::constants::CUSTOM_INDEX_BASE;
use crate::grid::PixelGrid;
use crate::quantize::{lattice, CustomPalette};

use super::format::Mode;

#[derive(Error, Debug)]
pub enum BlockEncodeError {
    #[error("Color ({0}, {1}, {2}) is neither a lattice member nor a custom palette entry")]
    UnresolvableColor(u8, u8, u8),
}

/// One encoded block: the symbol mask plus its color references.
///
/// Bit i of the symbol (block raster order) is set iff pixel i uses the
/// foreground color. Pixel 0 defines the background, so bit 0 is always
/// clear and a symbol never reaches 0xFF.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedBlock {
    pub symbol: u8,
    pub background: u8,
    pub foreground: Option<u8>,
}

impl EncodedBlock {
    /// The literal bytes grouping identical blocks in the table: fine
    /// blocks are symbol + background (+ foreground unless solid), coarse
    /// blocks always carry exactly two color bytes and no symbol.
    pub fn key_bytes(&self, mode: Mode) -> Vec<u8> {
        match mode {
            Mode::Coarse => vec![
                self.background,
                self.foreground.unwrap_or(self.background),
            ],
            Mode::Fine => {
                let mut key = vec![self.symbol, self.background];
                if let Some(foreground) = self.foreground {
                    key.push(foreground);
                }
                key
            }
        }
    }
}

/// Origins of every block in traversal (raster) order.
pub fn block_origins(
    width: usize,
    height: usize,
    mode: Mode,
) -> impl Iterator<Item = (usize, usize)> {
    (0..height).step_by(mode.block_height()).flat_map(move |y| {
        (0..width)
            .step_by(mode.block_width())
            .map(move |x| (x, y))
    })
}

/// A block's pixels in raster order (rows, then columns).
pub fn read_block(grid: &PixelGrid, mode: Mode, x: usize, y: usize) -> Vec<Rgb> {
    let mut pixels = Vec::with_capacity(mode.block_len());
    for j in 0..mode.block_height() {
        for i in 0..mode.block_width() {
            pixels.push(grid.get(x + i, y + j));
        }
    }
    pixels
}

pub fn write_block(grid: &mut PixelGrid, mode: Mode, x: usize, y: usize, pixels: &[Rgb]) {
    for j in 0..mode.block_height() {
        for i in 0..mode.block_width() {
            grid.set(x + i, y + j, pixels[j * mode.block_width() + i]);
        }
    }
}

/// Folds a block onto two representative colors and records both.
///
/// The first representative is the reference pixel; the second is the
/// pixel strictly farthest from it (the reference itself for uniform
/// blocks). Every pixel then takes the closer of the two, ties keeping
/// the reference color.
pub fn select_block_colors(pixels: &mut [Rgb], reference: usize, palette: &mut CustomPalette) {
    let first = pixels[reference];
    let mut second = first;
    let mut farthest = 0u32;
    for (i, &pixel) in pixels.iter().enumerate() {
        if i == reference {
            continue;
        }
        let distance = first.distance_squared(pixel);
        if distance > farthest {
            farthest = distance;
            second = pixel;
        }
    }

    palette.record(first);
    palette.record(second);

    for pixel in pixels.iter_mut() {
        if first.distance_squared(*pixel) > second.distance_squared(*pixel) {
            *pixel = second;
        } else {
            *pixel = first;
        }
    }
}

/// Maps a resolved color to its single-byte reference: the lattice index
/// (0..=239) when the color is an exact lattice member, otherwise 240
/// plus its index in the stabilized custom palette.
///
/// # Errors
/// - Returns `BlockEncodeError::UnresolvableColor` if the color is in
///   neither set; this means the palette invariants were violated
///   upstream and the conversion must fail rather than patch the pixel
pub fn color_byte(color: Rgb, palette: &CustomPalette) -> Result<u8, BlockEncodeError> {
    if let Some(index) = lattice::index_of(color) {
        return Ok(index);
    }
    match palette.index_of(color) {
        Some(index) => Ok(CUSTOM_INDEX_BASE + index as u8),
        None => Err(BlockEncodeError::UnresolvableColor(color.r, color.g, color.b)),
    }
}

/// Encodes a block whose pixels already resolve to at most two colors.
pub fn encode_block(
    pixels: &[Rgb],
    mode: Mode,
    palette: &CustomPalette,
) -> Result<EncodedBlock, BlockEncodeError> {
    let background = pixels[0];
    let foreground = pixels
        .iter()
        .copied()
        .find(|&pixel| pixel != background)
        .unwrap_or(background);

    let mut symbol = 0u8;
    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel != background {
            symbol |= 1 << i;
        }
    }

    let background = color_byte(background, palette)?;
    let foreground = color_byte(foreground, palette)?;
    let foreground = match mode {
        Mode::Coarse => Some(foreground),
        Mode::Fine if symbol != 0 => Some(foreground),
        Mode::Fine => None,
    };

    Ok(EncodedBlock {
        symbol,
        background,
        foreground,
    })
}
