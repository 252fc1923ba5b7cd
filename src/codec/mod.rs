//! Frame-level reading and writing over the two halves of an async stream.

mod framed;

pub use framed::{FrameReader, FrameWriter, MaskGenerator};
