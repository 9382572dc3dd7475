//! GPU device + surface management.
//!
//! Creates the wgpu instance, adapter, device and queue for a window, keeps
//! the swapchain configured across resizes and hands out per-frame encoders.

mod frame;
mod gpu;
mod init;
mod surface;

pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
