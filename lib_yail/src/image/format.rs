use thiserror::Error;

/// Four-byte signature opening every encoded stream.
pub const SIGNATURE: [u8; 4] = *b"YAIL";

#[derive(Error, Debug)]
#[error("Unknown display mode byte: {0:#04x}")]
pub struct UnknownMode(pub u8);

/// The two supported display modes.
///
/// The raw byte doubles as the mode's historical resolution id in the
/// header (16 for coarse, 32 for fine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One color cell per source pixel: 1×2 blocks, up to 160×100 pixels.
    Coarse,
    /// Two colors per cell via 2×4 sub-blocks, up to 320×200 pixels.
    Fine,
}

impl Mode {
    pub const fn raw(self) -> u8 {
        match self {
            Mode::Coarse => 16,
            Mode::Fine => 32,
        }
    }

    pub fn from_raw(value: u8) -> Result<Mode, UnknownMode> {
        match value {
            16 => Ok(Mode::Coarse),
            32 => Ok(Mode::Fine),
            other => Err(UnknownMode(other)),
        }
    }

    /// Block width in source pixels.
    pub const fn block_width(self) -> usize {
        match self {
            Mode::Coarse => 1,
            Mode::Fine => 2,
        }
    }

    /// Block height in source pixels.
    pub const fn block_height(self) -> usize {
        match self {
            Mode::Coarse => 2,
            Mode::Fine => 4,
        }
    }

    /// Pixels per block.
    pub const fn block_len(self) -> usize {
        self.block_width() * self.block_height()
    }

    /// Index of the pixel anchoring the two-color merge.
    pub const fn reference_index(self) -> usize {
        match self {
            Mode::Coarse => 0,
            Mode::Fine => 4,
        }
    }

    pub const fn max_width(self) -> usize {
        match self {
            Mode::Coarse => 160,
            Mode::Fine => 320,
        }
    }

    pub const fn max_height(self) -> usize {
        match self {
            Mode::Coarse => 100,
            Mode::Fine => 200,
        }
    }
}
