use thiserror::Error;

use crate::coords::Viewport;
use crate::pipeline::FramePhase;
use crate::shader::{ProgramId, ShaderStage, UniformKind};
use crate::target::TargetId;

/// Errors reported by the render pipeline.
///
/// Only [`RenderError::ResourceUnavailable`] is fatal. Every other variant is
/// reported (logged and collected into the frame's diagnostics) while the
/// affected draw degrades to a no-op, so a frame always completes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The surface, adapter or device could not be created.
    #[error("GPU resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("{stage} stage of program '{program}' failed to compile:\n{diagnostic}")]
    ShaderCompile {
        program: String,
        stage: ShaderStage,
        diagnostic: String,
    },

    #[error("program '{program}' failed to link: {diagnostic}")]
    ShaderLink { program: String, diagnostic: String },

    /// A draw or uniform write referenced a program whose compile/link failed.
    #[error("program '{program}' is unusable")]
    ProgramUnusable { program: String },

    /// The mesh carries `TEXCOORD` but the caller supplied no coordinate.
    #[error("mesh carries TEXCOORD but no texture coordinate was supplied")]
    MissingTexCoord,

    #[error("attribute contract violated for program '{program}': {detail}")]
    AttributeContractViolation { program: String, detail: String },

    #[error("{target} used after dispose")]
    UseAfterDispose { target: TargetId },

    #[error("{target} is {actual}, consuming pass expects {expected}")]
    SizeMismatch {
        target: TargetId,
        expected: Viewport,
        actual: Viewport,
    },

    /// A pass would write the target it samples from.
    #[error("{target} is sampled by the composite pass and cannot be its output")]
    FeedbackLoop { target: TargetId },

    #[error("unknown {0}")]
    UnknownTarget(TargetId),

    #[error("unknown program {0}")]
    UnknownProgram(ProgramId),

    #[error("program '{program}' has no uniform named '{name}'")]
    UnknownUniform { program: String, name: String },

    #[error("uniform '{name}' of program '{program}' is {expected}, got {actual}")]
    UniformTypeMismatch {
        program: String,
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },

    #[error("image decode failed: {0}")]
    ImageDecode(String),

    #[error("invalid size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("illegal frame phase transition {from:?} -> {to:?}")]
    PhaseOrder { from: FramePhase, to: FramePhase },
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::ImageDecode(err.to_string())
    }
}
