//! WGSL front half of a program: parse, validate and reflect with naga.
//!
//! Stage conventions:
//! - entry points are `vs_main` (vertex module) and `fs_main` (fragment module);
//! - the uniform block is a struct at `@group(0) @binding(0)`;
//! - the shared sampler sits at `@group(1) @binding(0)` and texture slot `k`
//!   at `@group(1) @binding(k + 1)`.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Module, ScalarKind, TypeInner, VectorSize};

use crate::error::RenderError;

use super::program::ShaderStage;
use super::uniform::{TextureSlot, UniformKind, UniformLayout, UniformMember};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

pub const UNIFORM_GROUP: u32 = 0;
pub const TEXTURE_GROUP: u32 = 1;

/// One `@location(n)` stage input or output, in float components.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StageIo {
    pub location: u32,
    pub components: u32,
}

/// Everything the pipeline needs to know about a linked program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reflection {
    /// Vertex shader inputs, sorted by location.
    pub vertex_inputs: Vec<StageIo>,
    pub layout: UniformLayout,
}

impl Reflection {
    pub fn vertex_input(&self, location: u32) -> Option<&StageIo> {
        self.vertex_inputs.iter().find(|io| io.location == location)
    }
}

/// Parses and validates one stage. The diagnostic is naga's rendered report.
pub(crate) fn compile_stage(
    program: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<Module, RenderError> {
    let compile_err = |diagnostic: String| RenderError::ShaderCompile {
        program: program.to_string(),
        stage,
        diagnostic,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_err(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| compile_err(e.emit_to_string(source)))?;

    let entry = stage.entry_point();
    let has_entry = module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry && ep.stage == stage.to_naga());
    if !has_entry {
        return Err(compile_err(format!("missing @{stage} entry point `{entry}`")));
    }
    Ok(module)
}

/// Cross-stage checks plus the merged interface.
pub(crate) fn link(program: &str, vertex: &Module, fragment: &Module) -> Result<Reflection, RenderError> {
    let link_err = |diagnostic: String| RenderError::ShaderLink {
        program: program.to_string(),
        diagnostic,
    };

    let vs = entry(vertex, ShaderStage::Vertex).map_err(&link_err)?;
    let fs = entry(fragment, ShaderStage::Fragment).map_err(&link_err)?;

    let mut vertex_inputs = Vec::new();
    for arg in &vs.arguments {
        collect_io(vertex, arg.ty, arg.binding.as_ref(), &mut vertex_inputs).map_err(&link_err)?;
    }
    vertex_inputs.sort_by_key(|io| io.location);

    let mut varyings = Vec::new();
    if let Some(result) = &vs.result {
        collect_io(vertex, result.ty, result.binding.as_ref(), &mut varyings).map_err(&link_err)?;
    }

    let mut fragment_inputs = Vec::new();
    for arg in &fs.arguments {
        collect_io(fragment, arg.ty, arg.binding.as_ref(), &mut fragment_inputs).map_err(&link_err)?;
    }
    for input in &fragment_inputs {
        match varyings.iter().find(|v| v.location == input.location) {
            None => {
                return Err(link_err(format!(
                    "fragment input @location({}) is not written by the vertex stage",
                    input.location
                )));
            }
            Some(out) if out.components != input.components => {
                return Err(link_err(format!(
                    "@location({}) is {} components in the vertex stage but {} in the fragment stage",
                    input.location, out.components, input.components
                )));
            }
            Some(_) => {}
        }
    }

    let mut layout = UniformLayout::default();
    for module in [vertex, fragment] {
        merge_globals(module, &mut layout).map_err(&link_err)?;
    }
    layout.textures.sort_by_key(|t| t.slot);

    Ok(Reflection { vertex_inputs, layout })
}

fn entry(module: &Module, stage: ShaderStage) -> Result<&naga::Function, String> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point() && ep.stage == stage.to_naga())
        .map(|ep| &ep.function)
        .ok_or_else(|| format!("no @{stage} entry point `{}`", stage.entry_point()))
}

/// Flattens a (possibly struct-typed) argument or result into located IO.
fn collect_io(
    module: &Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    out: &mut Vec<StageIo>,
) -> Result<(), String> {
    match binding {
        Some(Binding::Location { location, .. }) => {
            let components = float_components(&module.types[ty].inner)
                .ok_or_else(|| format!("@location({location}) must be a float scalar or vector"))?;
            out.push(StageIo { location: *location, components });
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_io(module, member.ty, member.binding.as_ref(), out)?;
                }
            }
        }
    }
    Ok(())
}

fn float_components(inner: &TypeInner) -> Option<u32> {
    match inner {
        TypeInner::Scalar(s) if s.kind == ScalarKind::Float => Some(1),
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => {
            Some(vector_len(*size))
        }
        _ => None,
    }
}

fn vector_len(size: VectorSize) -> u32 {
    match size {
        VectorSize::Bi => 2,
        VectorSize::Tri => 3,
        VectorSize::Quad => 4,
    }
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match float_components(inner) {
        Some(1) => return Some(UniformKind::Float),
        Some(2) => return Some(UniformKind::Vec2),
        Some(3) => return Some(UniformKind::Vec3),
        Some(4) => return Some(UniformKind::Vec4),
        _ => {}
    }
    match inner {
        TypeInner::Matrix { columns: VectorSize::Tri, rows: VectorSize::Tri, scalar }
            if scalar.kind == ScalarKind::Float =>
        {
            Some(UniformKind::Mat3)
        }
        TypeInner::Matrix { columns: VectorSize::Quad, rows: VectorSize::Quad, scalar }
            if scalar.kind == ScalarKind::Float =>
        {
            Some(UniformKind::Mat4)
        }
        _ => None,
    }
}

/// Folds one stage's resource bindings into `layout`.
///
/// Members with the same name must agree on offset and kind; the block size is
/// the largest span either stage declares.
fn merge_globals(module: &Module, layout: &mut UniformLayout) -> Result<(), String> {
    for (_, global) in module.global_variables.iter() {
        let Some(binding) = &global.binding else { continue };
        let name = global.name.clone().unwrap_or_default();
        let inner = &module.types[global.ty].inner;

        match global.space {
            AddressSpace::Uniform => {
                if (binding.group, binding.binding) != (UNIFORM_GROUP, 0) {
                    return Err(format!(
                        "uniform '{name}' must be bound at @group({UNIFORM_GROUP}) @binding(0)"
                    ));
                }
                let TypeInner::Struct { members, span } = inner else {
                    return Err(format!("uniform '{name}' must be a struct"));
                };
                for member in members {
                    let member_name = member.name.clone().unwrap_or_default();
                    let kind = uniform_kind(&module.types[member.ty].inner).ok_or_else(|| {
                        format!("uniform member '{member_name}' has an unsupported type")
                    })?;
                    match layout.member(&member_name) {
                        Some(prev) if prev.offset != member.offset || prev.kind != kind => {
                            return Err(format!(
                                "uniform member '{member_name}' differs between stages"
                            ));
                        }
                        Some(_) => {}
                        None => layout.members.push(UniformMember {
                            name: member_name,
                            offset: member.offset,
                            kind,
                        }),
                    }
                }
                layout.size = layout.size.max(*span);
            }
            AddressSpace::Handle => {
                if binding.group != TEXTURE_GROUP {
                    return Err(format!(
                        "'{name}' must be bound in @group({TEXTURE_GROUP})"
                    ));
                }
                match inner {
                    TypeInner::Sampler { .. } if binding.binding == 0 => {}
                    TypeInner::Sampler { .. } => {
                        return Err(format!("sampler '{name}' must use @binding(0)"));
                    }
                    TypeInner::Image { .. } if binding.binding > 0 => {
                        let slot = binding.binding - 1;
                        match layout.textures.iter().find(|t| t.slot == slot) {
                            Some(prev) if prev.name != name => {
                                return Err(format!(
                                    "texture slot {slot} is '{}' in one stage and '{name}' in the other",
                                    prev.name
                                ));
                            }
                            Some(_) => {}
                            None => layout.textures.push(TextureSlot { name, slot }),
                        }
                    }
                    _ => return Err(format!("'{name}' uses an unsupported resource binding")),
                }
            }
            _ => {}
        }
    }
    Ok(())
}
