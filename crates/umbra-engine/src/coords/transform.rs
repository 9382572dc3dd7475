use super::Vec2;

/// 2D affine transform stored as a row-major 3×3 matrix.
///
/// ```text
/// | a  b  tx |
/// | c  d  ty |
/// | 0  0  1  |
/// ```
///
/// The bottom row is fixed at `(0, 0, 1)`; projective terms are not
/// representable. Transforms are values: every operation returns a new one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    m: [f32; 9],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    /// Builds `[a b tx; c d ty; 0 0 1]`.
    #[inline]
    pub const fn new(a: f32, b: f32, tx: f32, c: f32, d: f32, ty: f32) -> Self {
        Self { m: [a, b, tx, c, d, ty, 0.0, 0.0, 1.0] }
    }

    #[inline]
    pub const fn translation(x: f32, y: f32) -> Self {
        Self::new(1.0, 0.0, x, 0.0, 1.0, y)
    }

    /// Rotation by `radians`, counter-clockwise in a Y-up frame (clockwise on a
    /// Y-down screen).
    #[inline]
    pub fn rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos, -sin, 0.0, sin, cos, 0.0)
    }

    #[inline]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, 0.0, sy, 0.0)
    }

    /// Row-major elements, bottom row included.
    #[inline]
    pub const fn to_array(&self) -> [f32; 9] {
        self.m
    }

    #[inline]
    pub fn translation_part(&self) -> Vec2 {
        Vec2::new(self.m[2], self.m[5])
    }

    /// Matrix product `self · other`.
    ///
    /// Applying the result to a point applies `other` first, then `self`. A
    /// parent transform composed with a child's local transform therefore
    /// yields the child's local-to-world map.
    pub fn compose(&self, other: &Transform) -> Transform {
        let [a, b, tx, c, d, ty, ..] = self.m;
        let [oa, ob, otx, oc, od, oty, ..] = other.m;
        Transform::new(
            a * oa + b * oc,
            a * ob + b * od,
            a * otx + b * oty + tx,
            c * oa + d * oc,
            c * ob + d * od,
            c * otx + d * oty + ty,
        )
    }

    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> Vec2 {
        let [a, b, tx, c, d, ty, ..] = self.m;
        Vec2::new(a * x + b * y + tx, c * x + d * y + ty)
    }

    #[inline]
    pub fn apply_vec(&self, p: Vec2) -> Vec2 {
        self.apply(p.x, p.y)
    }

    /// Returns `None` for singular transforms (e.g. a zero scale axis).
    pub fn inverse(&self) -> Option<Transform> {
        let [a, b, tx, c, d, ty, ..] = self.m;
        let det = a * d - b * c;
        if det.abs() <= f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        let (ia, ib, ic, id) = (d * inv, -b * inv, -c * inv, a * inv);
        Some(Transform::new(
            ia,
            ib,
            -(ia * tx + ib * ty),
            ic,
            id,
            -(ic * tx + id * ty),
        ))
    }

    /// Length scale of the linear part: `sqrt(|det|)`.
    ///
    /// Exact for uniform scales and rotations; the geometric mean of the two
    /// axis scales otherwise.
    #[inline]
    pub fn uniform_scale(&self) -> f32 {
        let [a, b, _, c, d, ..] = self.m;
        (a * d - b * c).abs().sqrt()
    }

    /// Columns of the full 3×3 matrix, the layout WGSL `mat3x3<f32>` expects.
    #[inline]
    pub fn to_mat3_columns(&self) -> [[f32; 3]; 3] {
        let m = &self.m;
        [[m[0], m[3], m[6]], [m[1], m[4], m[7]], [m[2], m[5], m[8]]]
    }

    /// Column-major 4×4 embedding (Z passes through untouched).
    pub fn to_mat4_columns(&self) -> [[f32; 4]; 4] {
        let [a, b, tx, c, d, ty, ..] = self.m;
        [
            [a, c, 0.0, 0.0],
            [b, d, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [tx, ty, 0.0, 1.0],
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_2;

    fn assert_point(p: Vec2, x: f32, y: f32) {
        assert_abs_diff_eq!(p.x, x, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, y, epsilon = 1e-5);
    }

    fn assert_transform(t: &Transform, expected: [f32; 9]) {
        for (got, want) in t.to_array().iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-5);
        }
    }

    // ── compose ───────────────────────────────────────────────────────────

    #[test]
    fn identity_is_neutral() {
        let t = Transform::new(2.0, 1.0, 5.0, -1.0, 3.0, 7.0);
        assert_eq!(Transform::IDENTITY.compose(&t), t);
        assert_eq!(t.compose(&Transform::IDENTITY), t);
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let translate = Transform::translation(10.0, 0.0);
        let scale = Transform::scale(2.0, 2.0);

        // scale, then translate
        assert_point(translate.compose(&scale).apply(1.0, 1.0), 12.0, 2.0);
        // translate, then scale
        assert_point(scale.compose(&translate).apply(1.0, 1.0), 22.0, 2.0);
    }

    #[test]
    fn compose_matches_hand_computed_matrix() {
        let r = Transform::rotation(FRAC_PI_2);
        let t = Transform::translation(3.0, 4.0);
        // R · T = [0 -1 -4; 1 0 3; 0 0 1]
        assert_transform(&r.compose(&t), [0.0, -1.0, -4.0, 1.0, 0.0, 3.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn compose_is_associative() {
        let a = Transform::translation(1.0, -2.0);
        let b = Transform::rotation(0.7);
        let c = Transform::scale(3.0, 0.5);
        let left = a.compose(&b).compose(&c);
        let right = a.compose(&b.compose(&c));
        assert_transform(&left, right.to_array());
    }

    #[test]
    fn compose_does_not_mutate_operands() {
        let a = Transform::translation(1.0, 1.0);
        let before = a;
        let _ = a.compose(&Transform::scale(4.0, 4.0));
        assert_eq!(a, before);
    }

    // ── apply ─────────────────────────────────────────────────────────────

    #[test]
    fn rotation_quarter_turn() {
        assert_point(Transform::rotation(FRAC_PI_2).apply(10.0, 0.0), 0.0, 10.0);
        assert_point(Transform::rotation(FRAC_PI_2).apply(0.0, 20.0), -20.0, 0.0);
    }

    // ── inverse ───────────────────────────────────────────────────────────

    #[test]
    fn inverse_round_trips() {
        let t = Transform::translation(5.0, -3.0)
            .compose(&Transform::rotation(1.1))
            .compose(&Transform::scale(2.0, 4.0));
        let inv = t.inverse().unwrap();
        assert_transform(&t.compose(&inv), Transform::IDENTITY.to_array());
        assert_point(inv.apply_vec(t.apply(7.0, 9.0)), 7.0, 9.0);
    }

    #[test]
    fn uniform_scale_ignores_rotation_and_translation() {
        let t = Transform::translation(9.0, -4.0)
            .compose(&Transform::rotation(0.8))
            .compose(&Transform::scale(3.0, 3.0));
        assert_abs_diff_eq!(t.uniform_scale(), 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(Transform::scale(2.0, 8.0).uniform_scale(), 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(Transform::scale(-2.0, 2.0).uniform_scale(), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn singular_has_no_inverse() {
        assert!(Transform::scale(0.0, 1.0).inverse().is_none());
    }

    // ── GPU layouts ───────────────────────────────────────────────────────

    #[test]
    fn columns_are_transposed_rows() {
        let t = Transform::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(t.to_mat3_columns(), [[1.0, 4.0, 0.0], [2.0, 5.0, 0.0], [3.0, 6.0, 1.0]]);
        assert_eq!(t.to_mat4_columns()[3], [3.0, 6.0, 0.0, 1.0]);
    }
}
