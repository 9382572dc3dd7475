use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::geometry::{AttributeSet, BlendMode, Model, Topology};
use crate::pipeline::{Command, FrameCommands, PassKind, PassTarget};
use crate::paint::Color;
use crate::shader::{ProgramId, ProgramRegistry, Reflection, ShaderProgram};

use super::common::{blend_state, load_op, primitive_topology, sampler_descriptor, vertex_format};
use super::resources::TextureStore;
use super::{FrameTarget, RenderCtx};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    blend: BlendMode,
    format: wgpu::TextureFormat,
    attributes: AttributeSet,
    /// `(slot, components)` per instance stream, in buffer order.
    instances: Vec<(u32, u32)>,
    topology: Topology,
}

impl PipelineKey {
    fn new(model: &Model, format: wgpu::TextureFormat) -> Self {
        Self {
            program: model.program(),
            blend: model.blend(),
            format,
            attributes: model.attributes(),
            instances: model
                .instances()
                .iter()
                .map(|s| (s.attribute.slot, s.attribute.components))
                .collect(),
            topology: model.topology(),
        }
    }
}

struct CachedPipeline {
    pipeline: wgpu::RenderPipeline,
    /// Group 0; present whenever the program has a uniform block or textures.
    uniform_layout: Option<wgpu::BindGroupLayout>,
    /// Group 1; present when the program samples textures.
    texture_layout: Option<wgpu::BindGroupLayout>,
}

/// Everything one draw needs, resolved before the pass begins.
struct PreparedDraw {
    pipeline: wgpu::RenderPipeline,
    bind_groups: Vec<wgpu::BindGroup>,
    vertex_buffers: Vec<wgpu::Buffer>,
    vertex_count: u32,
    instance_count: u32,
}

struct PassRecord {
    kind: PassKind,
    target: PassTarget,
    clear: Option<Color>,
    draws: Vec<Model>,
}

/// Replays frame traces on wgpu.
///
/// Target storage persists across frames; per-draw vertex, instance and
/// uniform buffers are created for the frame and dropped with it.
#[derive(Default)]
pub struct GpuRenderer {
    textures: TextureStore,
    pipelines: HashMap<PipelineKey, CachedPipeline>,
    sampler: Option<wgpu::Sampler>,
}

impl GpuRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every pass of `frame` into `target.encoder`, in trace order.
    pub fn execute(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut FrameTarget<'_>,
        programs: &ProgramRegistry,
        frame: FrameCommands,
    ) {
        self.ensure_sampler(ctx);

        let mut pass: Option<PassRecord> = None;
        for command in frame.commands {
            match command {
                Command::Target(cmd) => self.textures.apply(ctx.device, ctx.queue, cmd),
                Command::BeginPass { kind, target, clear, .. } => {
                    pass = Some(PassRecord { kind, target, clear, draws: Vec::new() });
                }
                Command::Draw(model) => match pass.as_mut() {
                    Some(p) => p.draws.push(model),
                    None => log::warn!("draw outside a pass ignored"),
                },
                Command::EndPass => {
                    if let Some(p) = pass.take() {
                        self.record_pass(ctx, target, programs, p);
                    }
                }
            }
        }
    }

    fn record_pass(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut FrameTarget<'_>,
        programs: &ProgramRegistry,
        pass: PassRecord,
    ) {
        let format = match pass.target {
            PassTarget::Surface => ctx.surface_format,
            PassTarget::Offscreen(id) => match self.textures.get(id) {
                Some(t) => t.format,
                None => {
                    log::warn!("{:?} pass skipped: {id} has no GPU storage", pass.kind);
                    return;
                }
            },
        };

        let mut prepared = Vec::with_capacity(pass.draws.len());
        for model in &pass.draws {
            match programs.get(model.program()) {
                Ok(program) => {
                    if let Some(draw) = self.prepare(ctx, program, model, format) {
                        prepared.push(draw);
                    }
                }
                Err(err) => log::warn!("{err}"),
            }
        }

        let view = match pass.target {
            PassTarget::Surface => target.surface_view,
            PassTarget::Offscreen(id) => match self.textures.get(id) {
                Some(t) => &t.view,
                None => return,
            },
        };

        let label = format!("umbra {:?} pass", pass.kind);
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op(pass.clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for draw in &prepared {
            rpass.set_pipeline(&draw.pipeline);
            for (group, bind_group) in draw.bind_groups.iter().enumerate() {
                rpass.set_bind_group(group as u32, bind_group, &[]);
            }
            for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                rpass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
            rpass.draw(0..draw.vertex_count, 0..draw.instance_count);
        }
    }

    /// Builds buffers and bind groups for one model. `None` skips the draw.
    fn prepare(
        &mut self,
        ctx: &RenderCtx<'_>,
        program: &ShaderProgram,
        model: &Model,
        format: wgpu::TextureFormat,
    ) -> Option<PreparedDraw> {
        let reflection = program.reflection()?.clone();
        let key = PipelineKey::new(model, format);
        if !self.pipelines.contains_key(&key) {
            let cached = create_pipeline(ctx.device, program, &reflection, model, format)?;
            log::debug!("created pipeline for '{}' ({format:?})", program.label());
            self.pipelines.insert(key.clone(), cached);
        }
        let cached = self.pipelines.get(&key)?;
        let label = Some(program.label());

        let mut vertex_buffers = vec![ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label,
            contents: bytemuck::cast_slice(model.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        })];
        for stream in model.instances() {
            vertex_buffers.push(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::cast_slice(&stream.data),
                usage: wgpu::BufferUsages::VERTEX,
            }));
        }

        let mut bind_groups = Vec::new();
        if let Some(layout) = &cached.uniform_layout {
            let uniform_buffer = model.uniforms().filter(|u| !u.bytes().is_empty()).map(|u| {
                ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label,
                    contents: u.bytes(),
                    usage: wgpu::BufferUsages::UNIFORM,
                })
            });
            let entries: Vec<wgpu::BindGroupEntry<'_>> = uniform_buffer
                .iter()
                .map(|buffer| wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                })
                .collect();
            if reflection.layout.has_block() && entries.is_empty() {
                log::warn!("draw with '{}' skipped: no uniform snapshot", program.label());
                return None;
            }
            bind_groups.push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label,
                layout,
                entries: &entries,
            }));
        }

        if let Some(layout) = &cached.texture_layout {
            let sampler = self.sampler.as_ref()?;
            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(sampler),
            }];
            for slot in &reflection.layout.textures {
                let bound = model.textures().iter().find(|b| b.slot == slot.slot)?;
                let Some(texture) = self.textures.get(bound.target) else {
                    log::warn!("draw with '{}' skipped: {} has no GPU storage", program.label(), bound.target);
                    return None;
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: slot.slot + 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                });
            }
            bind_groups.push(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label,
                layout,
                entries: &entries,
            }));
        }

        Some(PreparedDraw {
            pipeline: cached.pipeline.clone(),
            bind_groups,
            vertex_buffers,
            vertex_count: model.element_count(),
            instance_count: model.instance_count(),
        })
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_some() {
            return;
        }
        self.sampler = Some(ctx.device.create_sampler(&sampler_descriptor()));
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    program: &ShaderProgram,
    reflection: &Reflection,
    model: &Model,
    format: wgpu::TextureFormat,
) -> Option<CachedPipeline> {
    let label = Some(program.label());
    let layout = &reflection.layout;
    let visibility = wgpu::ShaderStages::VERTEX_FRAGMENT;

    let uniform_layout = (layout.has_block() || layout.has_textures()).then(|| {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = layout
            .has_block()
            .then_some(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(layout.size as u64),
                },
                count: None,
            })
            .into_iter()
            .collect();
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor { label, entries: &entries })
    });

    let texture_layout = layout.has_textures().then(|| {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        entries.extend(layout.textures.iter().map(|t| wgpu::BindGroupLayoutEntry {
            binding: t.slot + 1,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor { label, entries: &entries })
    });

    let group_layouts: Vec<&wgpu::BindGroupLayout> =
        uniform_layout.iter().chain(texture_layout.iter()).collect();
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label,
        bind_group_layouts: &group_layouts,
        immediate_size: 0,
    });

    // vertex stream first, then one buffer per instance stream
    let mut attribute_lists: Vec<Vec<wgpu::VertexAttribute>> = Vec::new();
    let mut strides = Vec::new();
    let mut offset = 0;
    let mut mesh_attrs = Vec::new();
    for attr in model.attributes().vertex_attributes() {
        mesh_attrs.push(wgpu::VertexAttribute {
            format: vertex_format(attr.components)?,
            offset,
            shader_location: attr.slot,
        });
        offset += attr.byte_size();
    }
    attribute_lists.push(mesh_attrs);
    strides.push((offset, wgpu::VertexStepMode::Vertex));
    for stream in model.instances() {
        let attr = stream.attribute;
        attribute_lists.push(vec![wgpu::VertexAttribute {
            format: vertex_format(attr.components)?,
            offset: 0,
            shader_location: attr.slot,
        }]);
        strides.push((attr.byte_size(), wgpu::VertexStepMode::Instance));
    }
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = attribute_lists
        .iter()
        .zip(&strides)
        .map(|(attributes, (array_stride, step_mode))| wgpu::VertexBufferLayout {
            array_stride: *array_stride,
            step_mode: *step_mode,
            attributes,
        })
        .collect();

    let source = program.source();
    let vs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label,
        source: wgpu::ShaderSource::Wgsl(source.vertex.clone()),
    });
    let fs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label,
        source: wgpu::ShaderSource::Wgsl(source.fragment.clone()),
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label,
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vs,
            entry_point: Some(crate::shader::VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fs,
            entry_point: Some(crate::shader::FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: blend_state(model.blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: primitive_topology(model.topology()),
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    Some(CachedPipeline {
        pipeline,
        uniform_layout,
        texture_layout,
    })
}
