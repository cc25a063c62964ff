//! Length-framed byte buffers for the session wire protocol.  Encode with a [MessageWriter] and
//! decode captured buffers with a [MessageReader].
//!
//! A frame is a 2-byte little-endian length prefix, a tag byte, then the contents.  Frames nest:
//! the writer keeps a stack of open frames and backfills each length prefix when the frame is
//! closed, so callers never compute lengths by hand.  Integers come in two widths: fixed
//! little-endian, and "packed" (7-bit groups, fewer bytes for small magnitudes).
//!
//! This crate doesn't understand what the frames mean, just how to lay them out.  Higher layers
//! decide tags and payload shapes.
mod delivery;
mod reader;
mod varint;
mod writer;

pub use delivery::*;
pub use reader::*;
pub use varint::{decode_packed_u32, encode_packed_u32, PackedError};
pub use writer::*;
