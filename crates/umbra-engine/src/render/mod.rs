//! GPU rendering subsystem.
//!
//! [`GpuRenderer`] replays a [`FrameCommands`](crate::pipeline::FrameCommands)
//! trace with wgpu: it owns the textures behind every `TargetId`, a pipeline
//! cache keyed by program and vertex layout, and the shared sampler.
//!
//! Convention:
//! - bind group 0 holds the program's uniform block at binding 0;
//! - bind group 1 holds the clamp-to-edge sampler at binding 0 and texture
//!   slot `k` at binding `k + 1`.

mod common;
mod ctx;
mod executor;
mod resources;

pub use ctx::{FrameTarget, RenderCtx};
pub use executor::GpuRenderer;
