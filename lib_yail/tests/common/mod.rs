#![allow(dead_code)]

use lib_yail::image::Mode;
use lib_yail::{PixelGrid, Rgb};

/// A grid filled with one color.
pub fn uniform_grid(width: usize, height: usize, color: Rgb) -> PixelGrid {
    PixelGrid::filled(width, height, color)
}

/// A black/white checkerboard.
pub fn checkerboard(width: usize, height: usize) -> PixelGrid {
    let mut grid = PixelGrid::filled(width, height, Rgb::BLACK);
    for y in 0..height {
        for x in 0..width {
            if (x + y) % 2 == 1 {
                grid.set(x, y, Rgb::WHITE);
            }
        }
    }
    grid
}

/// Vertical color bands, one block column wide, `band_width` pixels each.
pub fn banded_grid(width: usize, height: usize, band_width: usize) -> PixelGrid {
    let mut grid = PixelGrid::filled(width, height, Rgb::BLACK);
    for y in 0..height {
        for x in 0..width {
            let band = (x / band_width) as u8;
            grid.set(x, y, Rgb::new(30 + band * 13, 200 - band * 9, 60 + band * 5));
        }
    }
    grid
}

/// A smooth diagonal ramp with many distinct colors.
pub fn ramp_grid(width: usize, height: usize) -> PixelGrid {
    let mut grid = PixelGrid::filled(width, height, Rgb::BLACK);
    for y in 0..height {
        for x in 0..width {
            grid.set(
                x,
                y,
                Rgb::new(
                    (x * 255 / width.max(1)) as u8,
                    (y * 255 / height.max(1)) as u8,
                    ((x + y) * 127 / (width + height).max(1)) as u8,
                ),
            );
        }
    }
    grid
}

/// One parsed table group.
#[derive(Debug)]
pub struct Group {
    pub key: Vec<u8>,
    pub coords: Vec<(u8, u8)>,
    pub continuations: usize,
}

/// A structurally validated encoded stream.
#[derive(Debug)]
pub struct ParsedImage {
    pub mode: Mode,
    pub grid_width: usize,
    pub grid_height: usize,
    pub palette: Vec<Rgb>,
    pub groups: Vec<Group>,
}

fn successor(col: u8, row: u8, grid_width: usize) -> (u8, u8) {
    if (col as usize) < grid_width {
        (col + 1, row)
    } else {
        (1, row + 1)
    }
}

/// Decodes the stream far enough to validate its structure: header
/// layout, key sizes, coordinate ranges, and that every block position
/// is covered exactly once. Any stray 0xFF outside a group boundary
/// breaks the walk and fails an assertion.
pub fn parse(bytes: &[u8]) -> ParsedImage {
    assert!(bytes.len() >= 9, "stream shorter than a header");
    assert_eq!(&bytes[0..4], b"YAIL", "bad signature");
    assert_eq!(bytes[4], 1, "unexpected format version");
    let mode = Mode::from_raw(bytes[5]).expect("valid mode byte");
    let grid_width = bytes[6] as usize;
    let grid_height = bytes[7] as usize;
    let palette_count = bytes[8] as usize;

    let mut cursor = 9;
    let mut palette = Vec::with_capacity(palette_count);
    for _ in 0..palette_count {
        palette.push(Rgb::new(bytes[cursor], bytes[cursor + 1], bytes[cursor + 2]));
        cursor += 3;
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut seen = vec![false; grid_width * grid_height];
    while cursor < bytes.len() {
        let key = match mode {
            Mode::Coarse => {
                let key = bytes[cursor..cursor + 2].to_vec();
                cursor += 2;
                key
            }
            Mode::Fine => {
                let symbol = bytes[cursor];
                assert_ne!(symbol, 0xFF, "group delimiter in key position");
                let len = if symbol == 0 { 2 } else { 3 };
                let key = bytes[cursor..cursor + len].to_vec();
                cursor += len;
                key
            }
        };

        let mut coords: Vec<(u8, u8)> = Vec::new();
        let mut continuations = 0;
        loop {
            assert!(cursor < bytes.len(), "unterminated group");
            let byte = bytes[cursor];
            if byte == 0xFF {
                cursor += 1;
                break;
            }
            let coord = if byte == 0xFD {
                cursor += 1;
                continuations += 1;
                let &(col, row) = coords.last().expect("continuation without a coordinate");
                successor(col, row, grid_width)
            } else {
                let (col, row) = (bytes[cursor], bytes[cursor + 1]);
                cursor += 2;
                (col, row)
            };
            assert!(
                (1..=grid_width as u8).contains(&coord.0),
                "column {} out of range",
                coord.0
            );
            assert!(
                (1..=grid_height as u8).contains(&coord.1),
                "row {} out of range",
                coord.1
            );
            coords.push(coord);
        }
        assert!(!coords.is_empty(), "group without coordinates");

        for &(col, row) in &coords {
            let index = (row as usize - 1) * grid_width + (col as usize - 1);
            assert!(!seen[index], "block ({}, {}) covered twice", col, row);
            seen[index] = true;
        }
        groups.push(Group {
            key,
            coords,
            continuations,
        });
    }
    assert!(
        seen.iter().all(|&covered| covered),
        "not every block position was covered"
    );

    ParsedImage {
        mode,
        grid_width,
        grid_height,
        palette,
        groups,
    }
}
