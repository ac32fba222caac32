//! Frame source and sink backends

pub mod gif;
pub mod memory;
pub mod png_sequence;

pub use gif::GifSource;
pub use memory::{MemorySink, MemorySource};
pub use png_sequence::{PngSequenceSink, PngSequenceSource};
