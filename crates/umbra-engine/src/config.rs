//! Pipeline configuration.
//!
//! Device and window settings live next to the code that consumes them
//! (`device::GpuInit`, `window::RuntimeConfig`); this module covers the
//! deferred-lighting passes.

use crate::paint::Color;

/// Clear policy for the albedo buffer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum AlbedoClear {
    /// Full-alpha black.
    #[default]
    OpaqueBlack,
    /// Zero alpha; uncovered pixels stay transparent through the composite.
    Transparent,
}

impl AlbedoClear {
    #[inline]
    pub fn color(self) -> Color {
        match self {
            AlbedoClear::OpaqueBlack => Color::BLACK,
            AlbedoClear::Transparent => Color::TRANSPARENT,
        }
    }
}

/// How the composite pass combines albedo and accumulated light.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompositeMode {
    /// `albedo + light`.
    #[default]
    Additive,
    /// `albedo * (ambient + light)`.
    Modulate,
}

/// Settings for [`RenderPipeline`](crate::pipeline::RenderPipeline).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub albedo_clear: AlbedoClear,
    pub composite: CompositeMode,

    /// Ambient term used by [`CompositeMode::Modulate`]. Ignored otherwise.
    pub ambient: Color,

    /// Apply `pow(c, 1/2.2)` to the composite output.
    ///
    /// Leave off when presenting to an sRGB surface: the hardware already
    /// encodes on store.
    pub gamma_correct: bool,

    /// Height above the sprite plane used for lights added without one.
    pub default_light_height: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            albedo_clear: AlbedoClear::default(),
            composite: CompositeMode::default(),
            ambient: Color::rgb(0.1, 0.1, 0.12),
            gamma_correct: false,
            default_light_height: 48.0,
        }
    }
}
