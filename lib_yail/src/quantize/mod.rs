pub mod lattice;
pub mod palette;
pub mod reduce;

pub use palette::{CustomPalette, Remapping};
pub use reduce::reduce;
