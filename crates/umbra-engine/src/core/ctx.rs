use winit::window::Window;

use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::{FrameTarget, RenderCtx};

use super::app::AppControl;
use super::time::FrameTime;

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// `'a` is the callback borrow; `'w` is the window borrow carried by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires the swapchain image, calls `draw` with a [`RenderCtx`] and a
    /// [`FrameTarget`], then submits and presents.
    ///
    /// Surface errors are recovered through [`Gpu::handle_surface_error`];
    /// only an out-of-memory surface turns into [`AppControl::Exit`]. A
    /// minimized window skips the frame without calling `draw`.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&RenderCtx<'_>, &mut FrameTarget<'_>),
    {
        let viewport = self.gpu.viewport();
        if !viewport.is_valid() {
            return AppControl::Continue;
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                };
            }
        };

        let rctx = RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            viewport,
        );

        // FrameTarget borrows the encoder; drop it before submit() takes the frame.
        {
            let mut target = FrameTarget::new(&mut frame.encoder, &frame.view);
            draw(&rctx, &mut target);
        }

        self.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
