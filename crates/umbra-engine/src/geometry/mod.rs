//! CPU-side geometry: attribute layouts, the mesh builder and draw units.
//!
//! A [`Mesh`] is filled through shape helpers under the current transform, then
//! consumed by [`ModelBuilder`] which validates it against a shader program.
//! Models are rebuilt every frame; nothing here retains GPU state.

mod attribute;
mod mesh;
mod model;

pub use attribute::{AttributeSet, ComponentType, StepMode, VertexAttribute};
pub use mesh::{CIRCLE_SEGMENTS, Mesh, UvRect};
pub use model::{BlendMode, InstanceStream, Model, ModelBuilder, TextureBinding, Topology};
