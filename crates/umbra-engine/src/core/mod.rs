//! Contracts between the runtime loop and the host application.

mod app;
mod ctx;
mod time;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
pub use time::{FrameClock, FrameTime};
