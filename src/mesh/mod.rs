//! Mesh welding into indexed per-slot vertex buffers.

pub mod welder;

pub use welder::{BoneTable, SkinAttributes, UvChannel, VertexBuffer, VertexWelder, WeldKey};
