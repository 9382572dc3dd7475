//! The deferred-lighting frame.
//!
//! [`RenderPipeline`] collects sprites, custom models and lights, then
//! [`RenderPipeline::render`] records the G-buffer, light and composite passes
//! into a [`FrameCommands`] trace.

mod builtin;
mod command;
mod deferred;
mod lighting;
mod phase;
mod scene;

pub use builtin::{
    BuiltinPrograms, COMPOSITE_ALBEDO_SLOT, COMPOSITE_LIGHT_SLOT, LIGHT_CENTER_SLOT, LIGHT_COLOR_SLOT,
    LIGHT_NORMAL_SLOT, LIGHT_PARAMS_SLOT, NORMAL_ALBEDO_SLOT, NORMAL_MAP_SLOT, SPRITE_ALBEDO_SLOT,
};
pub use command::{Command, FrameCommands, PassKind, PassTarget};
pub use deferred::{GBuffer, RenderPipeline};
pub use lighting::{FLAT_NORMAL, PointLight, attenuation, decode_normal, encode_normal, shade};
pub use phase::FramePhase;
pub use scene::{Layer, Sprite};
