//! CPU side of the light model. The WGSL in `shaders/light.frag.wgsl`
//! evaluates the same formulas per fragment.

use crate::coords::Vec2;
use crate::paint::Color;

/// Encoded `(0, 0, 1)`: a surface facing the viewer.
pub const FLAT_NORMAL: Color = Color::new(0.5, 0.5, 1.0, 1.0);

/// Point light on the sprite plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    /// Local coordinates, mapped through the current transform when added.
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
    /// Distance above the plane; `None` uses the pipeline default.
    pub height: Option<f32>,
}

impl PointLight {
    pub fn new(x: f32, y: f32, radius: f32, color: Color) -> Self {
        Self {
            position: Vec2::new(x, y),
            radius,
            color,
            height: None,
        }
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    /// Lights with a non-positive or non-finite radius contribute nothing.
    pub fn is_visible(&self) -> bool {
        self.radius.is_finite() && self.radius > 0.0 && self.position.is_finite()
    }
}

/// Linear falloff: 1 at the center, 0 at and beyond `radius`.
pub fn attenuation(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / radius).max(0.0)
}

/// `[-1, 1]³ → [0, 1]³`.
pub fn encode_normal(n: [f32; 3]) -> [f32; 3] {
    n.map(|c| c * 0.5 + 0.5)
}

/// `[0, 1]³ → [-1, 1]³`, renormalized.
pub fn decode_normal(s: [f32; 3]) -> [f32; 3] {
    let [x, y, z] = s.map(|c| c * 2.0 - 1.0);
    let len = (x * x + y * y + z * z).sqrt();
    if len <= f32::EPSILON {
        return [0.0, 0.0, 1.0];
    }
    [x / len, y / len, z / len]
}

/// Light reaching a fragment at `offset` from the light's screen position.
///
/// Same formula as `fs_main` in `shaders/light.frag.wgsl`.
///
/// `light_dir` points from the raised light to the fragment; the diffuse
/// term is `max(dot(n, -light_dir), 0)`.
pub fn shade(normal: [f32; 3], offset: Vec2, radius: f32, height: f32) -> f32 {
    let att = attenuation(offset.length(), radius);
    let [lx, ly, lz] = [offset.x, offset.y, -height];
    let len = (lx * lx + ly * ly + lz * lz).sqrt();
    if len <= f32::EPSILON {
        return att;
    }
    let to_light = [-lx / len, -ly / len, -lz / len];
    let diffuse = normal[0] * to_light[0] + normal[1] * to_light[1] + normal[2] * to_light[2];
    att * diffuse.max(0.0)
}
