//! Render targets: offscreen color buffers addressed by [`TargetId`].
//!
//! The pool only tracks bookkeeping. Every allocation, upload and disposal is
//! queued as a [`TargetCommand`] and replayed by the GPU executor at the start
//! of the next frame.

mod image;
mod pool;

pub use self::image::decode_rgba;
pub use pool::{ColorSpace, TargetCommand, TargetFormat, TargetId, TargetInfo, TargetPool, TargetState};
