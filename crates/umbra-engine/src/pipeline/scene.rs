use crate::coords::Vec2;
use crate::geometry::{Model, UvRect};
use crate::paint::Color;
use crate::target::TargetId;

/// G-buffer layer a model is drawn into.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Layer {
    #[default]
    Albedo,
    Normal,
}

/// Textured rectangle drawn into both G-buffer layers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprite {
    pub albedo: TargetId,
    /// Linear normal map; `None` draws a flat surface.
    pub normal: Option<TargetId>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub uv: UvRect,
    pub tint: Color,
}

impl Sprite {
    pub fn new(albedo: TargetId, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            albedo,
            normal: None,
            x,
            y,
            width,
            height,
            uv: UvRect::FULL,
            tint: Color::WHITE,
        }
    }

    pub fn normal_map(mut self, normal: TargetId) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn uv(mut self, uv: UvRect) -> Self {
        self.uv = uv;
        self
    }

    pub fn tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }
}

/// A light after its position went through the transform stack.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct QueuedLight {
    pub world: Vec2,
    pub radius: f32,
    pub height: f32,
    pub color: Color,
}

/// Everything submitted since the last frame.
#[derive(Debug, Default)]
pub(crate) struct SceneQueue {
    pub albedo: Vec<Model>,
    pub normal: Vec<Model>,
    pub lights: Vec<QueuedLight>,
}

impl SceneQueue {
    pub fn push(&mut self, layer: Layer, model: Model) {
        match layer {
            Layer::Albedo => self.albedo.push(model),
            Layer::Normal => self.normal.push(model),
        }
    }

    pub fn take(&mut self) -> SceneQueue {
        std::mem::take(self)
    }
}
