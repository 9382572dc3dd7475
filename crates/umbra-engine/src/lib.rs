//! Umbra engine crate.
//!
//! A 2D deferred-lighting renderer: sprites are rasterized once into albedo and
//! normal buffers, point lights accumulate into a light buffer by sampling the
//! normals, and a composite pass combines both into the final image.
//!
//! The frame logic in [`pipeline`] is pure CPU work that records a
//! [`pipeline::FrameCommands`] trace; [`render::GpuRenderer`] replays that trace
//! on wgpu. The platform pieces (`device`, `window`, `core`) host it.

pub mod config;
pub mod error;

pub mod coords;
pub mod geometry;
pub mod paint;
pub mod pipeline;
pub mod shader;
pub mod target;

pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod window;

pub use error::RenderError;
