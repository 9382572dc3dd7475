use super::{Transform, Vec2, Viewport};

/// 2D camera: drawable size plus a pan offset in world units.
///
/// Projection and view are recomputed from their inputs on every call; no
/// matrix is cached across a change.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Camera {
    pan: Vec2,
    viewport: Viewport,
}

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        Self { pan: Vec2::ZERO, viewport }
    }

    /// Orthographic map from device pixels to clip space.
    ///
    /// `[0, width] × [0, height]` (top-left origin, +Y down) lands on
    /// `[-1, 1]²` with +Y up. Zero sizes are treated as one pixel.
    pub fn projection(width: u32, height: u32) -> Transform {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        Transform::new(2.0 / w, 0.0, -1.0, 0.0, -2.0 / h, 1.0)
    }

    /// World-to-screen translation: increasing pan moves the world left/up.
    pub fn view(pan_x: f32, pan_y: f32) -> Transform {
        Transform::translation(-pan_x, -pan_y)
    }

    #[inline]
    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    #[inline]
    pub fn set_pan(&mut self, x: f32, y: f32) {
        self.pan = Vec2::new(x, y);
    }

    #[inline]
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan = self.pan + Vec2::new(dx, dy);
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn projection_matrix(&self) -> Transform {
        Self::projection(self.viewport.width, self.viewport.height)
    }

    pub fn view_matrix(&self) -> Transform {
        Self::view(self.pan.x, self.pan.y)
    }

    /// `projection · view`: world units to clip space.
    pub fn view_projection(&self) -> Transform {
        self.projection_matrix().compose(&self.view_matrix())
    }

    /// World position to device pixels.
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.view_matrix().apply_vec(world)
    }

    /// Device pixels to `[0, 1]²` texture coordinates of a drawable-sized target.
    pub fn screen_uv(&self, screen: Vec2) -> Vec2 {
        let [w, h] = self.viewport.to_f32();
        Vec2::new(screen.x / w, screen.y / h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_point(p: Vec2, x: f32, y: f32) {
        assert_abs_diff_eq!(p.x, x, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, y, epsilon = 1e-6);
    }

    #[test]
    fn projection_maps_corners_to_clip() {
        let p = Camera::projection(800, 600);
        assert_point(p.apply(0.0, 0.0), -1.0, 1.0);
        assert_point(p.apply(800.0, 600.0), 1.0, -1.0);
        assert_point(p.apply(400.0, 300.0), 0.0, 0.0);
    }

    #[test]
    fn projection_tolerates_zero_size() {
        assert!(Camera::projection(0, 0).is_finite());
    }

    #[test]
    fn view_moves_world_against_pan() {
        let v = Camera::view(10.0, 5.0);
        assert_point(v.apply(10.0, 5.0), 0.0, 0.0);
        assert_point(v.apply(0.0, 0.0), -10.0, -5.0);
    }

    #[test]
    fn view_projection_follows_pan_and_size() {
        let mut cam = Camera::new(Viewport::new(200, 100));
        cam.set_pan(50.0, 25.0);
        // World (150, 75) is the screen center once panned.
        assert_point(cam.view_projection().apply(150.0, 75.0), 0.0, 0.0);

        cam.set_viewport(Viewport::new(400, 100));
        assert_point(cam.view_projection().apply(250.0, 75.0), 0.0, 0.0);
    }

    #[test]
    fn screen_uv_normalizes_by_viewport() {
        let mut cam = Camera::new(Viewport::new(400, 300));
        cam.pan_by(100.0, 0.0);
        let screen = cam.world_to_screen(Vec2::new(300.0, 150.0));
        assert_point(screen, 200.0, 150.0);
        assert_point(cam.screen_uv(screen), 0.5, 0.5);
    }
}
