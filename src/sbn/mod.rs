//! Chunked binary object transfer (`AT^SBNR` / `AT^SBNW`).
//!
//! Objects move over the line channel hex-encoded: reads arrive as tagged
//! hex lines inside one reply, writes go out as fixed-size raw chunks, one
//! command/raw-bytes/terminator round trip each.

pub mod frame;

pub use frame::{extract_frame, CHUNK_HEX_CHARS, MAX_OBJECT_BYTES};
