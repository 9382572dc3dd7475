use std::collections::BTreeSet;

use crate::error::RenderError;
use crate::shader::{ProgramId, ShaderProgram, UniformCache};
use crate::target::TargetId;

use super::{AttributeSet, Mesh, VertexAttribute};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Overwrite the destination.
    Replace,
    /// Straight-alpha "over".
    #[default]
    AlphaOver,
    /// Premultiplied-alpha "over".
    Premultiplied,
    /// `src + dst`, used to accumulate light.
    Additive,
}

/// Per-instance data feeding one shader location.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceStream {
    pub attribute: VertexAttribute,
    pub data: Vec<f32>,
}

impl InstanceStream {
    pub fn new(slot: u32, components: u32, data: Vec<f32>) -> Self {
        Self {
            attribute: VertexAttribute::per_instance(slot, components),
            data,
        }
    }

    /// Number of complete instances in `data`.
    #[inline]
    pub fn instance_count(&self) -> u32 {
        (self.data.len() / self.attribute.components.max(1) as usize) as u32
    }
}

/// Texture read from sampler slot `slot` during the draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub slot: u32,
    pub target: TargetId,
}

/// One draw: geometry, program, textures and a uniform snapshot.
///
/// Immutable once built. The pipeline consumes it in the frame it was
/// submitted to.
#[derive(Debug, Clone)]
pub struct Model {
    program: ProgramId,
    vertices: Vec<f32>,
    attributes: AttributeSet,
    instances: Vec<InstanceStream>,
    textures: Vec<TextureBinding>,
    topology: Topology,
    blend: BlendMode,
    element_count: u32,
    instance_count: u32,
    uniforms: Option<UniformCache>,
}

impl Model {
    pub fn builder(mesh: Mesh, program: &ShaderProgram) -> ModelBuilder<'_> {
        ModelBuilder {
            mesh,
            program,
            instances: Vec::new(),
            textures: Vec::new(),
            topology: Topology::default(),
            blend: BlendMode::default(),
        }
    }

    #[inline]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    #[inline]
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    #[inline]
    pub fn attributes(&self) -> AttributeSet {
        self.attributes
    }

    #[inline]
    pub fn instances(&self) -> &[InstanceStream] {
        &self.instances
    }

    #[inline]
    pub fn textures(&self) -> &[TextureBinding] {
        &self.textures
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    /// Vertices per instance.
    #[inline]
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    #[inline]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Nothing would be rasterized.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.element_count == 0 || self.instance_count == 0
    }

    pub fn uniforms(&self) -> Option<&UniformCache> {
        self.uniforms.as_ref()
    }

    pub(crate) fn uniforms_mut(&mut self) -> Option<&mut UniformCache> {
        self.uniforms.as_mut()
    }
}

pub struct ModelBuilder<'p> {
    mesh: Mesh,
    program: &'p ShaderProgram,
    instances: Vec<InstanceStream>,
    textures: Vec<TextureBinding>,
    topology: Topology,
    blend: BlendMode,
}

impl<'p> ModelBuilder<'p> {
    pub fn instances(mut self, stream: InstanceStream) -> Self {
        self.instances.push(stream);
        self
    }

    pub fn texture(mut self, slot: u32, target: TargetId) -> Self {
        self.textures.push(TextureBinding { slot, target });
        self
    }

    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Checks the mesh, instance streams and textures against the program's
    /// reflected interface and snapshots its current uniforms.
    pub fn build(self) -> Result<Model, RenderError> {
        let reflection = self.program.ensure_usable()?;
        let violation = |detail: String| RenderError::AttributeContractViolation {
            program: self.program.label().to_string(),
            detail,
        };

        let mut instance_count = None;
        let mut seen = BTreeSet::new();
        for stream in &self.instances {
            let attr = stream.attribute;
            if attr.slot < AttributeSet::FIRST_INSTANCE_SLOT {
                return Err(violation(format!(
                    "instance stream at slot {} overlaps the vertex stream",
                    attr.slot
                )));
            }
            if !seen.insert(attr.slot) {
                return Err(violation(format!("two instance streams at slot {}", attr.slot)));
            }
            if attr.components == 0 || stream.data.len() % attr.components as usize != 0 {
                return Err(violation(format!(
                    "instance stream at slot {} holds {} floats, not a multiple of {}",
                    attr.slot,
                    stream.data.len(),
                    attr.components
                )));
            }
            let count = stream.instance_count();
            if *instance_count.get_or_insert(count) != count {
                return Err(violation(format!(
                    "instance stream at slot {} has {count} instances, others have {}",
                    attr.slot,
                    instance_count.unwrap_or_default()
                )));
            }
        }

        let attributes = self.mesh.attributes();
        for input in &reflection.vertex_inputs {
            let provided = attributes.components_at(input.location).or_else(|| {
                self.instances
                    .iter()
                    .find(|s| s.attribute.slot == input.location)
                    .map(|s| s.attribute.components)
            });
            match provided {
                None => {
                    return Err(violation(format!(
                        "shader reads @location({}) but nothing provides it",
                        input.location
                    )));
                }
                Some(n) if n != input.components => {
                    return Err(violation(format!(
                        "@location({}) has {n} components, shader expects {}",
                        input.location, input.components
                    )));
                }
                Some(_) => {}
            }
        }

        let mut slots = BTreeSet::new();
        for binding in &self.textures {
            if !slots.insert(binding.slot) {
                return Err(violation(format!("texture slot {} bound twice", binding.slot)));
            }
            if !reflection.layout.textures.iter().any(|t| t.slot == binding.slot) {
                return Err(violation(format!("program has no texture at slot {}", binding.slot)));
            }
        }
        if let Some(missing) = reflection
            .layout
            .textures
            .iter()
            .find(|t| !slots.contains(&t.slot))
        {
            return Err(violation(format!(
                "texture '{}' (slot {}) is not bound",
                missing.name, missing.slot
            )));
        }

        let element_count = self.mesh.vertex_count() as u32;
        let mut textures = self.textures;
        textures.sort_by_key(|t| t.slot);

        Ok(Model {
            program: self.program.id(),
            vertices: self.mesh.into_data(),
            attributes,
            instances: self.instances,
            textures,
            topology: self.topology,
            blend: self.blend,
            element_count,
            instance_count: instance_count.unwrap_or(1),
            uniforms: self.program.uniforms().cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{ProgramRegistry, ShaderSource, UniformValue};
    use crate::target::TargetId;

    const VS: &str = r#"
struct Globals { view_projection: mat3x3<f32> };
@group(0) @binding(0) var<uniform> globals: Globals;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) offset: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) offset: vec2<f32>,
) -> VsOut {
    var out: VsOut;
    let p = globals.view_projection * vec3<f32>(position + offset, 1.0);
    out.clip = vec4<f32>(p.xy, 0.0, 1.0);
    out.uv = uv;
    out.offset = offset;
    return out;
}
"#;

    const FS: &str = r#"
@group(1) @binding(0) var samp: sampler;
@group(1) @binding(1) var albedo: texture_2d<f32>;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(albedo, samp, uv);
}
"#;

    fn program() -> ShaderProgram {
        let mut registry = ProgramRegistry::new();
        let id = registry.create("instanced", ShaderSource::new(VS, FS));
        registry.get(id).unwrap().clone()
    }

    fn quad() -> Mesh {
        let mut mesh = Mesh::with_attributes(AttributeSet::TEXCOORD);
        mesh.add_rectangle(0.0, 0.0, 1.0, 1.0, Some(Default::default())).unwrap();
        mesh
    }

    #[test]
    fn builds_with_full_contract() {
        let p = program();
        let model = Model::builder(quad(), &p)
            .instances(InstanceStream::new(3, 2, vec![0.0, 0.0, 5.0, 5.0, 9.0, 9.0]))
            .texture(0, TargetId(0))
            .build()
            .unwrap();

        assert_eq!(model.element_count(), 6);
        assert_eq!(model.instance_count(), 3);
        assert_eq!(model.program(), p.id());
        assert!(model.uniforms().is_some());
    }

    #[test]
    fn missing_instance_stream_is_a_violation() {
        let p = program();
        let err = Model::builder(quad(), &p).texture(0, TargetId(0)).build().unwrap_err();
        assert!(matches!(err, RenderError::AttributeContractViolation { .. }));
    }

    #[test]
    fn mesh_without_texcoords_is_a_violation() {
        let p = program();
        let mut mesh = Mesh::new();
        mesh.add_rectangle(0.0, 0.0, 1.0, 1.0, None).unwrap();
        let err = Model::builder(mesh, &p)
            .instances(InstanceStream::new(3, 2, vec![0.0, 0.0]))
            .texture(0, TargetId(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, RenderError::AttributeContractViolation { .. }));
    }

    #[test]
    fn texture_slots_must_be_covered_once() {
        let p = program();
        let stream = || InstanceStream::new(3, 2, vec![0.0, 0.0]);

        assert!(Model::builder(quad(), &p).instances(stream()).build().is_err());
        assert!(
            Model::builder(quad(), &p)
                .instances(stream())
                .texture(0, TargetId(0))
                .texture(0, TargetId(1))
                .build()
                .is_err()
        );
    }

    #[test]
    fn uniforms_are_snapshotted() {
        let mut p = program();
        let model = Model::builder(quad(), &p)
            .instances(InstanceStream::new(3, 2, vec![0.0, 0.0]))
            .texture(0, TargetId(0))
            .build()
            .unwrap();
        let before = model.uniforms().unwrap().bytes().to_vec();

        p.set_uniform(
            "view_projection",
            UniformValue::Mat3(crate::coords::Transform::scale(2.0, 2.0)),
        )
        .unwrap();
        assert_eq!(model.uniforms().unwrap().bytes(), before.as_slice());
    }

    #[test]
    fn empty_mesh_builds_an_empty_model() {
        let p = program();
        let model = Model::builder(Mesh::with_attributes(AttributeSet::TEXCOORD), &p)
            .instances(InstanceStream::new(3, 2, vec![0.0, 0.0]))
            .texture(0, TargetId(0))
            .build()
            .unwrap();
        assert!(model.is_empty());
    }
}
