use super::Transform;

/// Stack of composed transforms.
///
/// The root frame is the identity and can't be popped. Each pushed frame holds
/// the already-composed transform, so `current()` is O(1).
///
/// ```
/// # use umbra_engine::coords::{Transform, TransformStack};
/// let mut stack = TransformStack::new();
/// stack.push(Transform::translation(100.0, 50.0)); // parent
/// stack.push(Transform::rotation(0.5));            // child, local to parent
/// // ... draw child geometry with stack.current() ...
/// stack.pop();
/// stack.pop();
/// ```
#[derive(Debug, Clone)]
pub struct TransformStack {
    frames: Vec<Transform>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack {
    pub fn new() -> Self {
        Self { frames: vec![Transform::IDENTITY] }
    }

    /// Active transform: every pushed transform applied innermost first.
    #[inline]
    pub fn current(&self) -> Transform {
        // The root frame is never removed.
        self.frames.last().copied().unwrap_or(Transform::IDENTITY)
    }

    /// Replaces the active transform with `current · t`.
    #[inline]
    pub fn push(&mut self, t: Transform) {
        let composed = self.current().compose(&t);
        self.frames.push(composed);
    }

    /// Restores the transform active before the matching `push`.
    ///
    /// Popping the root frame is a no-op.
    #[inline]
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of pushed frames (0 when only the root is present).
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Drops every pushed frame, keeping the root.
    #[inline]
    pub fn reset(&mut self) {
        self.frames.truncate(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn starts_at_identity() {
        let stack = TransformStack::new();
        assert_eq!(stack.current(), Transform::IDENTITY);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn push_push_applies_inner_first() {
        let mut stack = TransformStack::new();
        stack.push(Transform::translation(10.0, 0.0));
        stack.push(Transform::rotation(FRAC_PI_2));

        // rotate (1, 0) -> (0, 1), then translate -> (10, 1)
        let p = stack.current().apply(1.0, 0.0);
        assert_abs_diff_eq!(p.x, 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-5);

        let expected = Transform::translation(10.0, 0.0).compose(&Transform::rotation(FRAC_PI_2));
        assert_eq!(stack.current(), expected);
    }

    #[test]
    fn pop_restores_previous() {
        let mut stack = TransformStack::new();
        stack.push(Transform::translation(3.0, 4.0));
        let parent = stack.current();
        stack.push(Transform::scale(2.0, 2.0));
        stack.pop();
        assert_eq!(stack.current(), parent);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn pop_on_root_is_noop() {
        let mut stack = TransformStack::new();
        stack.pop();
        stack.pop();
        assert_eq!(stack.current(), Transform::IDENTITY);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn reset_keeps_root() {
        let mut stack = TransformStack::new();
        stack.push(Transform::translation(1.0, 1.0));
        stack.push(Transform::translation(1.0, 1.0));
        stack.reset();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current(), Transform::IDENTITY);
    }
}
