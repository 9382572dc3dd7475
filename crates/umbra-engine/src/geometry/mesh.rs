use std::f32::consts::TAU;

use crate::coords::Transform;
use crate::error::RenderError;
use crate::paint::Color;

use super::AttributeSet;

/// Wedges per circle.
pub const CIRCLE_SEGMENTS: usize = 36;

/// Texture-space rectangle `[u0, v0] → [u1, v1]` mapped onto a shape.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

impl UvRect {
    /// The whole texture.
    pub const FULL: UvRect = UvRect::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    pub const fn new(u0: f32, v0: f32, u1: f32, v1: f32) -> Self {
        Self { u0, v0, u1, v1 }
    }

    /// Linear interpolation inside the rect; `(0, 0)` → `(u0, v0)`.
    #[inline]
    pub fn map(&self, s: f32, t: f32) -> [f32; 2] {
        [
            self.u0 + (self.u1 - self.u0) * s,
            self.v0 + (self.v1 - self.v0) * t,
        ]
    }
}

/// Interleaved CPU vertex stream built from shapes.
///
/// Each vertex is `[x, y, (r, g, b), (s, t)]`, the optional parts present
/// according to [`AttributeSet`]. Positions are transformed by the mesh's
/// current transform at append time, so the stored data is already in world
/// space.
#[derive(Debug, Clone)]
pub struct Mesh {
    data: Vec<f32>,
    attributes: AttributeSet,
    color: [f32; 3],
    transform: Transform,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// Position-only mesh.
    pub fn new() -> Self {
        Self::with_attributes(AttributeSet::POSITION)
    }

    pub fn with_attributes(attributes: AttributeSet) -> Self {
        Self {
            data: Vec::new(),
            attributes: attributes.with_position(),
            color: [1.0, 1.0, 1.0],
            transform: Transform::IDENTITY,
        }
    }

    #[inline]
    pub fn attributes(&self) -> AttributeSet {
        self.attributes
    }

    /// Floats per vertex.
    #[inline]
    pub fn stride(&self) -> usize {
        self.attributes.stride()
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.stride()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    #[inline]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Applies to vertices appended after this call.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Applies to vertices appended after this call. Alpha is ignored.
    pub fn set_color(&mut self, color: Color) {
        self.color = color.to_rgb();
    }

    pub(crate) fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Appends one vertex at local `(x, y)`.
    pub fn append(&mut self, x: f32, y: f32, uv: Option<[f32; 2]>) -> Result<(), RenderError> {
        let uv = self.require_uv(uv)?;
        self.push_vertex(x, y, uv);
        Ok(())
    }

    /// Two triangles covering `(x, y)`–`(x + w, y + h)`, six vertices.
    ///
    /// Corners are transformed one by one, so a rotated rectangle stays a
    /// parallelogram rather than an axis-aligned box.
    pub fn add_rectangle(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        uv: Option<UvRect>,
    ) -> Result<(), RenderError> {
        let uv = self.require_uv(uv)?;
        let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
        let tex = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

        self.data.reserve(6 * self.stride());
        for i in [0usize, 1, 2, 0, 2, 3] {
            let (px, py) = corners[i];
            let (s, t) = tex[i];
            self.push_vertex(px, py, uv.map(|r| r.map(s, t)));
        }
        Ok(())
    }

    /// Triangle fan of [`CIRCLE_SEGMENTS`] independent wedges, `3 · N` vertices.
    ///
    /// With texcoords, the unit circle maps into `uv` with the center at the
    /// rect's midpoint.
    pub fn add_circle(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        uv: Option<UvRect>,
    ) -> Result<(), RenderError> {
        let uv = self.require_uv(uv)?;
        let tex = |cos: f32, sin: f32| uv.map(|r| r.map(0.5 + 0.5 * cos, 0.5 + 0.5 * sin));

        self.data.reserve(3 * CIRCLE_SEGMENTS * self.stride());
        for i in 0..CIRCLE_SEGMENTS {
            let a0 = TAU * i as f32 / CIRCLE_SEGMENTS as f32;
            let a1 = TAU * (i + 1) as f32 / CIRCLE_SEGMENTS as f32;
            let (s0, c0) = a0.sin_cos();
            let (s1, c1) = a1.sin_cos();

            self.push_vertex(cx, cy, tex(0.0, 0.0));
            self.push_vertex(cx + radius * c0, cy + radius * s0, tex(c0, s0));
            self.push_vertex(cx + radius * c1, cy + radius * s1, tex(c1, s1));
        }
        Ok(())
    }

    /// `Some(uv)` passes through unless the mesh has no texcoords, in which
    /// case it's dropped. `None` on a textured mesh is an error.
    fn require_uv<T>(&self, uv: Option<T>) -> Result<Option<T>, RenderError> {
        if self.attributes.contains(AttributeSet::TEXCOORD) {
            uv.map(Some).ok_or(RenderError::MissingTexCoord)
        } else {
            Ok(None)
        }
    }

    fn push_vertex(&mut self, x: f32, y: f32, uv: Option<[f32; 2]>) {
        let p = self.transform.apply(x, y);
        self.data.extend_from_slice(&[p.x, p.y]);
        if self.attributes.contains(AttributeSet::COLOR) {
            self.data.extend_from_slice(&self.color);
        }
        if let Some(uv) = uv {
            self.data.extend_from_slice(&uv);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_2;

    fn positions(mesh: &Mesh) -> Vec<[f32; 2]> {
        mesh.data()
            .chunks_exact(mesh.stride())
            .map(|v| [v[0], v[1]])
            .collect()
    }

    fn assert_positions(got: &[[f32; 2]], want: &[[f32; 2]]) {
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            assert_abs_diff_eq!(g[0], w[0], epsilon = 1e-4);
            assert_abs_diff_eq!(g[1], w[1], epsilon = 1e-4);
        }
    }

    #[test]
    fn rectangle_under_identity() {
        let mut mesh = Mesh::new();
        mesh.add_rectangle(0.0, 0.0, 10.0, 20.0, None).unwrap();

        assert_eq!(mesh.vertex_count(), 6);
        assert_positions(
            &positions(&mesh),
            &[[0.0, 0.0], [10.0, 0.0], [10.0, 20.0], [0.0, 0.0], [10.0, 20.0], [0.0, 20.0]],
        );
    }

    #[test]
    fn rectangle_under_quarter_turn() {
        let mut mesh = Mesh::new();
        mesh.set_transform(Transform::rotation(FRAC_PI_2));
        mesh.add_rectangle(0.0, 0.0, 10.0, 20.0, None).unwrap();

        // (x, y) → (-y, x)
        assert_positions(
            &positions(&mesh),
            &[[0.0, 0.0], [0.0, 10.0], [-20.0, 10.0], [0.0, 0.0], [-20.0, 10.0], [-20.0, 0.0]],
        );
    }

    #[test]
    fn rectangle_texcoords_follow_uv_rect() {
        let mut mesh = Mesh::with_attributes(AttributeSet::TEXCOORD);
        let uv = UvRect::new(0.25, 0.5, 0.75, 1.0);
        mesh.add_rectangle(0.0, 0.0, 1.0, 1.0, Some(uv)).unwrap();

        let tex: Vec<[f32; 2]> = mesh.data().chunks_exact(4).map(|v| [v[2], v[3]]).collect();
        assert_eq!(tex[0], [0.25, 0.5]);
        assert_eq!(tex[1], [0.75, 0.5]);
        assert_eq!(tex[2], [0.75, 1.0]);
        assert_eq!(tex[5], [0.25, 1.0]);
    }

    #[test]
    fn circle_wedges_stay_within_radius() {
        let (cx, cy, r) = (5.0, -3.0, 12.0);
        let mut mesh = Mesh::new();
        mesh.add_circle(cx, cy, r, None).unwrap();

        assert_eq!(mesh.vertex_count(), 3 * CIRCLE_SEGMENTS);
        let pts = positions(&mesh);
        for p in &pts {
            let d = ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt();
            assert!(d <= r + 1e-4, "vertex {p:?} outside radius");
        }

        let angle_sum: f32 = pts
            .chunks_exact(3)
            .map(|w| {
                let a = (w[1][1] - cy).atan2(w[1][0] - cx);
                let b = (w[2][1] - cy).atan2(w[2][0] - cx);
                let mut d = b - a;
                if d < 0.0 {
                    d += TAU;
                }
                d
            })
            .sum();
        assert_abs_diff_eq!(angle_sum, TAU, epsilon = 1e-3);
    }

    #[test]
    fn circle_center_maps_to_uv_center() {
        let mut mesh = Mesh::with_attributes(AttributeSet::TEXCOORD);
        mesh.add_circle(0.0, 0.0, 1.0, Some(UvRect::FULL)).unwrap();
        let first = &mesh.data()[..4];
        assert_eq!([first[2], first[3]], [0.5, 0.5]);
    }

    #[test]
    fn textured_mesh_requires_uv() {
        let mut mesh = Mesh::with_attributes(AttributeSet::TEXCOORD);
        assert_eq!(mesh.add_rectangle(0.0, 0.0, 1.0, 1.0, None), Err(RenderError::MissingTexCoord));
        assert_eq!(mesh.add_circle(0.0, 0.0, 1.0, None), Err(RenderError::MissingTexCoord));
        assert_eq!(mesh.append(0.0, 0.0, None), Err(RenderError::MissingTexCoord));
        assert!(mesh.is_empty());
    }

    #[test]
    fn color_applies_to_later_vertices_only() {
        let mut mesh = Mesh::with_attributes(AttributeSet::COLOR);
        mesh.append(0.0, 0.0, None).unwrap();
        mesh.set_color(Color::rgb(1.0, 0.0, 0.5));
        mesh.append(1.0, 0.0, None).unwrap();

        assert_eq!(mesh.stride(), 5);
        assert_eq!(&mesh.data()[2..5], &[1.0, 1.0, 1.0]);
        assert_eq!(&mesh.data()[7..10], &[1.0, 0.0, 0.5]);
    }
}
