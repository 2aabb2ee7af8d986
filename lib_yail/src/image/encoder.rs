use log::{debug, error, info};
use thiserror::Error;

use crate::constants::{CONTINUATION, FF_ESCAPE, FORMAT_VERSION, GROUP_DELIMITER, REDUCE_TARGET};
use crate::dither;
use crate::grid::PixelGrid;
use crate::quantize::{reduce, CustomPalette};

use super::blocks::{self, BlockEncodeError};
use super::format::{Mode, SIGNATURE};
use super::table::{self, TableToken};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Image dimensions ({width}, {height}) exceed the {mode:?} limit of ({max_width}, {max_height})")]
    OutOfBounds {
        mode: Mode,
        width: usize,
        height: usize,
        max_width: usize,
        max_height: usize,
    },
    #[error("Image dimensions ({width}, {height}) are not a whole number of {block_width}x{block_height} blocks")]
    MisalignedDimensions {
        width: usize,
        height: usize,
        block_width: usize,
        block_height: usize,
    },
    #[error("Failed to encode block at grid position ({col}, {row})")]
    BlockEncodingFailed {
        col: usize,
        row: usize,
        source: BlockEncodeError,
    },
}

/// Converts a coarse-mode image (1×2 blocks, at most 160×100 pixels)
/// into the final byte stream.
///
/// The grid is mutated in place and afterwards holds the
/// palette-constrained preview of the encoded image.
///
/// # Errors
/// - Returns `ConvertError::OutOfBounds` if the image exceeds 160×100
/// - Returns `ConvertError::MisalignedDimensions` if the height is odd
pub fn convert_coarse(pixels: &mut PixelGrid) -> Result<Vec<u8>, ConvertError> {
    convert(pixels, Mode::Coarse, false)
}

/// Converts a fine-mode image (2×4 blocks, at most 320×200 pixels) into
/// the final byte stream, optionally running the error-diffusion search
/// instead of the plain per-block merge.
///
/// The grid is mutated in place and afterwards holds the
/// palette-constrained preview of the encoded image.
///
/// # Errors
/// - Returns `ConvertError::OutOfBounds` if the image exceeds 320×200
/// - Returns `ConvertError::MisalignedDimensions` if the dimensions are
///   not multiples of 2×4
pub fn convert_fine(pixels: &mut PixelGrid, dither: bool) -> Result<Vec<u8>, ConvertError> {
    convert(pixels, Mode::Fine, dither)
}

fn convert(grid: &mut PixelGrid, mode: Mode, dither: bool) -> Result<Vec<u8>, ConvertError> {
    info!(
        "Starting {:?} conversion of {}x{} image (dither: {})",
        mode,
        grid.width(),
        grid.height(),
        dither
    );
    validate_dimensions(grid, mode)?;

    // Stage 1: resolve every pixel onto at most two colors per block,
    // leaving a stabilized custom palette behind.
    let palette = if dither {
        dither_pipeline(grid)
    } else {
        merge_pipeline(grid, mode)
    };

    // Stage 2: encode each block against the stabilized palette.
    let grid_width = grid.width() / mode.block_width();
    let grid_height = grid.height() / mode.block_height();
    let mut encoded = Vec::with_capacity(grid_width * grid_height);
    for (x, y) in blocks::block_origins(grid.width(), grid.height(), mode) {
        let pixels = blocks::read_block(grid, mode, x, y);
        let block = blocks::encode_block(&pixels, mode, &palette).map_err(|source| {
            let (col, row) = (x / mode.block_width() + 1, y / mode.block_height() + 1);
            error!("Unresolvable color in block ({}, {}): {}", col, row, source);
            ConvertError::BlockEncodingFailed { col, row, source }
        })?;
        encoded.push(block);
    }
    debug!("Encoded {} blocks", encoded.len());

    // Stage 3: run-compress and serialize.
    let tokens = table::compress(&encoded, grid_width, mode);
    let bytes = serialize(mode, grid_width, grid_height, &palette, &tokens);
    info!("Conversion complete: {} bytes", bytes.len());
    Ok(bytes)
}

fn validate_dimensions(grid: &PixelGrid, mode: Mode) -> Result<(), ConvertError> {
    let (width, height) = (grid.width(), grid.height());
    if width > mode.max_width() || height > mode.max_height() {
        error!(
            "Image dimensions exceed range({},{})(x,y): ({}, {})",
            mode.max_width(),
            mode.max_height(),
            width,
            height
        );
        return Err(ConvertError::OutOfBounds {
            mode,
            width,
            height,
            max_width: mode.max_width(),
            max_height: mode.max_height(),
        });
    }
    if width % mode.block_width() != 0 || height % mode.block_height() != 0 {
        error!(
            "Image dimensions ({}, {}) leave a partial {}x{} block",
            width,
            height,
            mode.block_width(),
            mode.block_height()
        );
        return Err(ConvertError::MisalignedDimensions {
            width,
            height,
            block_width: mode.block_width(),
            block_height: mode.block_height(),
        });
    }
    Ok(())
}

/// Non-dithered path: adaptive reduction, per-block two-color merge,
/// then palette rebalance and the repaint conflation pass.
fn merge_pipeline(grid: &mut PixelGrid, mode: Mode) -> CustomPalette {
    reduce(grid, REDUCE_TARGET);

    let mut palette = CustomPalette::new();
    for (x, y) in blocks::block_origins(grid.width(), grid.height(), mode) {
        let mut pixels = blocks::read_block(grid, mode, x, y);
        blocks::select_block_colors(&mut pixels, mode.reference_index(), &mut palette);
        blocks::write_block(grid, mode, x, y, &pixels);
    }
    debug!("Block merge recorded {} palette candidates", palette.len());

    let remapping = palette.rebalance();
    palette.repaint(grid, &remapping);
    palette
}

/// Dithered path: seed the palette from a reduced scratch copy, then run
/// the two-color search with error diffusion over the original pixels.
fn dither_pipeline(grid: &mut PixelGrid) -> CustomPalette {
    let mut scratch = grid.clone();
    reduce(&mut scratch, REDUCE_TARGET);
    let palette = CustomPalette::seed_from(&scratch);
    dither::dither_pass(grid, &palette);
    palette
}

/// Lays out the final stream: header, palette, escaped table bytes.
///
/// Escaping: a literal 0xFF data byte becomes 0xFE, the group delimiter
/// is emitted as 0xFF, the continuation marker as 0xFD. Every 0xFF in
/// the emitted table is therefore a true group delimiter.
fn serialize(
    mode: Mode,
    grid_width: usize,
    grid_height: usize,
    palette: &CustomPalette,
    tokens: &[TableToken],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&SIGNATURE);
    out.push(FORMAT_VERSION);
    out.push(mode.raw());
    out.push(grid_width as u8);
    out.push(grid_height as u8);
    out.push(palette.len() as u8);
    for color in palette.colors() {
        out.extend_from_slice(&color.channels());
    }
    debug!(
        "Header written: mode {:?}, grid {}x{}, {} palette colors",
        mode,
        grid_width,
        grid_height,
        palette.len()
    );

    for &token in tokens {
        out.push(match token {
            TableToken::Byte(0xFF) => FF_ESCAPE,
            TableToken::Byte(byte) => byte,
            TableToken::Continuation => CONTINUATION,
            TableToken::EndGroup => GROUP_DELIMITER,
        });
    }
    out
}
