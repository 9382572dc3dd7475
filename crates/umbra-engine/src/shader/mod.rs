//! Shader programs: WGSL compilation, cross-stage linking, reflection and
//! named uniforms.

mod program;
mod reflect;
mod uniform;

pub use program::{ProgramId, ProgramRegistry, ShaderProgram, ShaderSource, ShaderStage};
pub use reflect::{FRAGMENT_ENTRY, Reflection, StageIo, TEXTURE_GROUP, UNIFORM_GROUP, VERTEX_ENTRY};
pub use uniform::{TextureSlot, UniformCache, UniformKind, UniformLayout, UniformMember, UniformValue};
