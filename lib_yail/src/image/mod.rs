pub mod blocks;
pub mod encoder;
pub mod format;
pub mod table;

pub use encoder::{convert_coarse, convert_fine, ConvertError};
pub use format::{Mode, UnknownMode};
