//! Little-endian binary reader/writer for the map descriptor formats.

mod reader;
mod writer;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;
