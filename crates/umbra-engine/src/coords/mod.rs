//! Coordinate spaces, transforms and the camera.
//!
//! Canonical CPU space:
//! - device pixels of the drawable
//! - origin top-left
//! - +X right, +Y down
//!
//! Shaders receive `Camera::view_projection()` as a `mat3x3<f32>` and map to
//! clip space on the GPU.

mod camera;
mod stack;
mod transform;
mod vec2;
mod viewport;

pub use camera::Camera;
pub use stack::TransformStack;
pub use transform::Transform;
pub use vec2::Vec2;
pub use viewport::Viewport;
