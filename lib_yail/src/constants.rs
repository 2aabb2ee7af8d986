/// Format version written into every header.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum number of custom palette entries a single image may carry.
pub const PALETTE_CAPACITY: usize = 16;

/// First color byte value referring to the custom palette instead of the
/// quantization lattice. Custom indices occupy 240..=255.
pub const CUSTOM_INDEX_BASE: u8 = 240;

/// Wire byte ending a table group. The format's legacy hex form spelled
/// this as '?' (0x3F); it is always emitted as 0xFF.
pub const GROUP_DELIMITER: u8 = 0xFF;

/// Wire byte a literal 0xFF data byte is rewritten to, so every 0xFF in
/// the emitted table is a true group delimiter.
pub const FF_ESCAPE: u8 = 0xFE;

/// Wire byte repeating the previous table key at the successor
/// coordinate. Only ever appears where a coordinate would, and genuine
/// coordinate bytes never exceed 0xA0.
pub const CONTINUATION: u8 = 0xFD;

/// Number of colors the adaptive pre-reduction pass leaves in an image.
pub const REDUCE_TARGET: usize = 32;
