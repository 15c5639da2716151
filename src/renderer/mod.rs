//! Rendering data
//!
//! No GPU code lives here; ropes are turned into plain vertex arrays a host
//! renderer can upload as line strips.

pub mod vertex;

pub use vertex::{LineVertex, as_bytes, colors, rope_line_vertices};
