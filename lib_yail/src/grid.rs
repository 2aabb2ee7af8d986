use thiserror::Error;

use crate::color::Rgb;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Invalid pixel buffer length: expected {expected} pixels for {width}x{height}, got {actual}")]
    LengthMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
}

/// A width × height grid of RGB pixels in row-major order.
///
/// The conversion entry points mutate the grid in place; after a
/// successful conversion it holds the palette-constrained preview of
/// the encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl PixelGrid {
    /// Wraps a row-major pixel buffer.
    ///
    /// # Errors
    /// - Returns `GridError::LengthMismatch` if the buffer does not hold
    ///   exactly `width * height` pixels
    pub fn new(width: usize, height: usize, pixels: Vec<Rgb>) -> Result<Self, GridError> {
        let expected = width * height;
        if pixels.len() != expected {
            return Err(GridError::LengthMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A grid filled with a single color.
    pub fn filled(width: usize, height: usize, color: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, color: Rgb) {
        self.pixels[y * self.width + x] = color;
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }
}
