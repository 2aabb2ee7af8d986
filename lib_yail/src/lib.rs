pub mod color;
pub mod constants;
pub mod dither;
pub mod grid;
pub mod image;
pub mod quantize;

use log::*;
use std::fs::File;
use std::io::Write;

pub use crate::color::Rgb;
pub use crate::grid::PixelGrid;
pub use crate::image::{convert_coarse, convert_fine, ConvertError, Mode};

pub fn init_logging() {
    let target = Box::new(File::create("log.txt").expect("Can't create file"));

    env_logger::Builder::new()
        .target(env_logger::Target::Pipe(target))
        .filter(Some("lib_yail"), LevelFilter::Debug)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}
