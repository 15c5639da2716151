//! Vertex types for rope line rendering

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::sim::rope::RopeChain;

/// Polyline vertex: world position, half-width and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub width: f32,
    pub color: [f32; 4],
}

impl LineVertex {
    pub const fn new(position: Vec3, width: f32, color: [f32; 4]) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            width,
            color,
        }
    }
}

/// One vertex per drawn rope point (two for a rigid chain, none when inactive)
pub fn rope_line_vertices(chain: &RopeChain, width: f32, color: [f32; 4]) -> Vec<LineVertex> {
    chain
        .line_points()
        .into_iter()
        .map(|p| LineVertex::new(p, width, color))
        .collect()
}

/// Raw bytes for uploading to a vertex buffer
pub fn as_bytes(vertices: &[LineVertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

/// Colors for rope elements
pub mod colors {
    pub const HOOK_ROPE: [f32; 4] = [0.55, 0.4, 0.25, 1.0];
    pub const HOLD_ROPE: [f32; 4] = [0.45, 0.32, 0.2, 1.0];
    pub const CROSSHAIR: [f32; 4] = [1.0, 1.0, 1.0, 0.8];
}
