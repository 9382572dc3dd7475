use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::RenderError;

use super::reflect::{self, FRAGMENT_ENTRY, Reflection, VERTEX_ENTRY};
use super::uniform::{UniformCache, UniformValue};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => VERTEX_ENTRY,
            ShaderStage::Fragment => FRAGMENT_ENTRY,
        }
    }

    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Index of a program inside its [`ProgramRegistry`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// WGSL text of both stages. Each stage is a standalone module.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSource {
    pub fn new(vertex: impl Into<Cow<'static, str>>, fragment: impl Into<Cow<'static, str>>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LinkState {
    Linked(Arc<Reflection>),
    Unusable(RenderError),
}

/// A vertex + fragment pair, validated and reflected on the CPU.
///
/// A program that fails to compile or link is still constructed: it keeps
/// the error, refuses uniform writes and is skipped by every draw that
/// references it.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    source: ShaderSource,
    state: LinkState,
    uniforms: Option<UniformCache>,
}

impl ShaderProgram {
    pub fn compile(id: ProgramId, label: impl Into<String>, source: ShaderSource) -> Self {
        let label = label.into();
        let state = match Self::build(&label, &source) {
            Ok(reflection) => {
                log::info!(
                    "program '{label}' linked: {} inputs, {} uniform bytes, {} textures",
                    reflection.vertex_inputs.len(),
                    reflection.layout.size,
                    reflection.layout.textures.len()
                );
                LinkState::Linked(Arc::new(reflection))
            }
            Err(err) => {
                log::error!("{err}");
                LinkState::Unusable(err)
            }
        };

        let uniforms = match &state {
            LinkState::Linked(r) => Some(UniformCache::new(label.clone(), Arc::new(r.layout.clone()))),
            LinkState::Unusable(_) => None,
        };

        Self { id, label, source, state, uniforms }
    }

    fn build(label: &str, source: &ShaderSource) -> Result<Reflection, RenderError> {
        let vertex = reflect::compile_stage(label, ShaderStage::Vertex, &source.vertex)?;
        let fragment = reflect::compile_stage(label, ShaderStage::Fragment, &source.fragment)?;
        reflect::link(label, &vertex, &fragment)
    }

    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    #[inline]
    pub fn is_usable(&self) -> bool {
        matches!(self.state, LinkState::Linked(_))
    }

    /// The compile or link failure, if any.
    pub fn error(&self) -> Option<&RenderError> {
        match &self.state {
            LinkState::Unusable(err) => Some(err),
            LinkState::Linked(_) => None,
        }
    }

    pub fn reflection(&self) -> Option<&Arc<Reflection>> {
        match &self.state {
            LinkState::Linked(r) => Some(r),
            LinkState::Unusable(_) => None,
        }
    }

    /// The reflection, or [`RenderError::ProgramUnusable`].
    pub fn ensure_usable(&self) -> Result<&Arc<Reflection>, RenderError> {
        self.reflection().ok_or_else(|| RenderError::ProgramUnusable {
            program: self.label.clone(),
        })
    }

    pub fn uniforms(&self) -> Option<&UniformCache> {
        self.uniforms.as_ref()
    }

    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError> {
        match self.uniforms.as_mut() {
            Some(cache) => cache.set(name, value),
            None => Err(RenderError::ProgramUnusable {
                program: self.label.clone(),
            }),
        }
    }
}

/// Owns every program; ids are never reused.
#[derive(Debug, Default)]
pub struct ProgramRegistry {
    programs: Vec<ShaderProgram>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and registers a program. Always returns an id, even when the
    /// program ends up unusable.
    pub fn create(&mut self, label: impl Into<String>, source: ShaderSource) -> ProgramId {
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(ShaderProgram::compile(id, label, source));
        id
    }

    pub fn get(&self, id: ProgramId) -> Result<&ShaderProgram, RenderError> {
        self.programs
            .get(id.0 as usize)
            .ok_or(RenderError::UnknownProgram(id))
    }

    pub fn get_mut(&mut self, id: ProgramId) -> Result<&mut ShaderProgram, RenderError> {
        self.programs
            .get_mut(id.0 as usize)
            .ok_or(RenderError::UnknownProgram(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderProgram> {
        self.programs.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
