use crate::config::{CompositeMode, PipelineConfig};
use crate::coords::{Camera, TransformStack, Viewport};
use crate::error::RenderError;
use crate::geometry::{AttributeSet, BlendMode, InstanceStream, Mesh, Model, UvRect};
use crate::paint::Color;
use crate::shader::{ProgramId, ProgramRegistry, ShaderProgram, ShaderSource, UniformValue};
use crate::target::{ColorSpace, TargetFormat, TargetId, TargetPool};

use super::builtin::{self, BuiltinPrograms};
use super::command::{Command, FrameCommands, PassKind, PassTarget};
use super::lighting::{FLAT_NORMAL, PointLight};
use super::phase::FramePhase;
use super::scene::{Layer, QueuedLight, SceneQueue, Sprite};

/// Intermediate buffers, all sized to the drawable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GBuffer {
    pub albedo: TargetId,
    pub normal: TargetId,
    pub light: TargetId,
}

impl GBuffer {
    fn ids(&self) -> [TargetId; 3] {
        [self.albedo, self.normal, self.light]
    }

    fn contains(&self, id: TargetId) -> bool {
        self.ids().contains(&id)
    }
}

type ResizeCallback = Box<dyn FnMut(Viewport)>;

/// Three-pass deferred 2D lighting.
///
/// Owns the camera, the transform stack, every render target and program, and
/// the per-frame submission queues. [`render`](Self::render) turns the queues
/// into a [`FrameCommands`] trace; nothing here touches the GPU.
pub struct RenderPipeline {
    config: PipelineConfig,
    camera: Camera,
    transforms: TransformStack,
    targets: TargetPool,
    programs: ProgramRegistry,
    builtin: BuiltinPrograms,
    gbuffer: GBuffer,
    flat_normal: TargetId,
    queue: SceneQueue,
    phase: FramePhase,
    pending_size: Option<Viewport>,
    resize_callback: Option<ResizeCallback>,
    /// Problems reported between frames, flushed into the next trace.
    deferred_diagnostics: Vec<RenderError>,
    frame_index: u64,
}

impl RenderPipeline {
    /// Allocates the G-buffer at `size` and compiles the built-in programs.
    pub fn new(config: PipelineConfig, size: Viewport) -> Result<Self, RenderError> {
        let mut targets = TargetPool::new();
        let gbuffer = GBuffer {
            albedo: targets.from_size("albedo", size.width, size.height, TargetFormat::Rgba8UnormSrgb)?,
            normal: targets.from_size("normal", size.width, size.height, TargetFormat::Rgba8Unorm)?,
            light: targets.from_size("light", size.width, size.height, TargetFormat::Rgba16Float)?,
        };
        let flat_normal = targets.placeholder("flat normal", FLAT_NORMAL);

        let mut programs = ProgramRegistry::new();
        let builtin = BuiltinPrograms::register(&mut programs);

        log::info!("render pipeline created at {size}");

        Ok(Self {
            config,
            camera: Camera::new(size),
            transforms: TransformStack::new(),
            targets,
            programs,
            builtin,
            gbuffer,
            flat_normal,
            queue: SceneQueue::default(),
            phase: FramePhase::Idle,
            pending_size: None,
            resize_callback: None,
            deferred_diagnostics: Vec::new(),
            frame_index: 0,
        })
    }

    // ── configuration and state ───────────────────────────────────────────

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    #[inline]
    pub fn transforms(&self) -> &TransformStack {
        &self.transforms
    }

    #[inline]
    pub fn transforms_mut(&mut self) -> &mut TransformStack {
        &mut self.transforms
    }

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[inline]
    pub fn gbuffer(&self) -> GBuffer {
        self.gbuffer
    }

    #[inline]
    pub fn builtin(&self) -> BuiltinPrograms {
        self.builtin
    }

    #[inline]
    pub fn targets(&self) -> &TargetPool {
        &self.targets
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    // ── resize ────────────────────────────────────────────────────────────

    /// Runs before the pipeline records a new drawable size.
    pub fn set_resize_callback(&mut self, callback: impl FnMut(Viewport) + 'static) {
        self.resize_callback = Some(Box::new(callback));
    }

    /// Records a new drawable size; the G-buffer is reallocated once at the
    /// start of the next [`render`](Self::render). Zero sizes are ignored.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        let size = Viewport::new(width, height);
        if !size.is_valid() {
            log::debug!("ignoring resize to {size}");
            return;
        }
        if let Some(callback) = self.resize_callback.as_mut() {
            callback(size);
        }
        self.pending_size = Some(size);
    }

    // ── programs ──────────────────────────────────────────────────────────

    /// Compiles a caller program. Failures are logged and kept on the
    /// program; the id is valid either way.
    pub fn create_program(&mut self, label: impl Into<String>, source: ShaderSource) -> ProgramId {
        self.programs.create(label, source)
    }

    pub fn program(&self, id: ProgramId) -> Result<&ShaderProgram, RenderError> {
        self.programs.get(id)
    }

    pub fn program_mut(&mut self, id: ProgramId) -> Result<&mut ShaderProgram, RenderError> {
        self.programs.get_mut(id)
    }

    #[inline]
    pub fn programs(&self) -> &ProgramRegistry {
        &self.programs
    }

    // ── targets ───────────────────────────────────────────────────────────

    pub fn create_target(
        &mut self,
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: TargetFormat,
    ) -> Result<TargetId, RenderError> {
        self.targets.from_size(label, width, height, format)
    }

    pub fn create_placeholder(&mut self, label: impl Into<String>, color: Color) -> TargetId {
        self.targets.placeholder(label, color)
    }

    pub fn upload_rgba(
        &mut self,
        id: TargetId,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        space: ColorSpace,
    ) -> Result<(), RenderError> {
        self.targets.upload_rgba(id, width, height, pixels, space)
    }

    pub fn load_image(&mut self, id: TargetId, bytes: &[u8], space: ColorSpace) -> Result<(), RenderError> {
        self.targets.load_image(id, bytes, space)
    }

    pub fn dispose_target(&mut self, id: TargetId) -> Result<(), RenderError> {
        self.targets.dispose(id)
    }

    pub fn target_size(&self, id: TargetId) -> Result<Viewport, RenderError> {
        self.targets.size(id)
    }

    // ── submission ────────────────────────────────────────────────────────

    /// Empty mesh seeded with the current transform.
    pub fn mesh(&self, attributes: AttributeSet) -> Mesh {
        let mut mesh = Mesh::with_attributes(attributes);
        mesh.set_transform(self.transforms.current());
        mesh
    }

    /// Queues `model` for the albedo layer.
    pub fn submit(&mut self, model: Model) {
        self.submit_to(Layer::Albedo, model);
    }

    pub fn submit_to(&mut self, layer: Layer, model: Model) {
        self.queue.push(layer, model);
    }

    /// Queues a sprite into both G-buffer layers under the current transform.
    ///
    /// Failures are logged and reported in the next frame's diagnostics.
    pub fn draw_sprite(&mut self, sprite: &Sprite) {
        if let Err(err) = self.try_draw_sprite(sprite) {
            log::warn!("sprite dropped: {err}");
            self.deferred_diagnostics.push(err);
        }
    }

    fn try_draw_sprite(&mut self, sprite: &Sprite) -> Result<(), RenderError> {
        self.targets.ensure_live(sprite.albedo)?;
        let normal_map = match sprite.normal {
            Some(id) => {
                self.targets.ensure_live(id)?;
                id
            }
            None => self.flat_normal,
        };

        let quad = |pipeline: &Self| -> Result<Mesh, RenderError> {
            let mut mesh = pipeline.mesh(AttributeSet::TEXCOORD);
            mesh.add_rectangle(sprite.x, sprite.y, sprite.width, sprite.height, Some(sprite.uv))?;
            Ok(mesh)
        };
        let albedo_mesh = quad(self)?;
        let normal_mesh = quad(self)?;

        let program = self.programs.get_mut(self.builtin.sprite)?;
        program.set_uniform("tint", UniformValue::Vec4(sprite.tint.to_rgba()))?;
        let albedo = Model::builder(albedo_mesh, program)
            .texture(builtin::SPRITE_ALBEDO_SLOT, sprite.albedo)
            .blend(BlendMode::AlphaOver)
            .build()?;

        let program = self.programs.get(self.builtin.normal)?;
        let normal = Model::builder(normal_mesh, program)
            .texture(builtin::NORMAL_ALBEDO_SLOT, sprite.albedo)
            .texture(builtin::NORMAL_MAP_SLOT, normal_map)
            .blend(BlendMode::AlphaOver)
            .build()?;

        self.queue.push(Layer::Albedo, albedo);
        self.queue.push(Layer::Normal, normal);
        Ok(())
    }

    /// Queues a point light. Its position is mapped through the current
    /// transform now and its radius scaled by the transform's
    /// [`uniform_scale`](crate::coords::Transform::uniform_scale); the camera
    /// view is applied at render time. The height stays in screen pixels.
    pub fn add_light(&mut self, light: PointLight) {
        if !light.is_visible() {
            log::debug!("dropping light with radius {}", light.radius);
            return;
        }
        let transform = self.transforms.current();
        let radius = light.radius * transform.uniform_scale();
        if !(radius.is_finite() && radius > 0.0) {
            log::debug!("dropping light collapsed by a singular transform");
            return;
        }
        self.queue.lights.push(QueuedLight {
            world: transform.apply_vec(light.position),
            radius,
            height: light.height.unwrap_or(self.config.default_light_height),
            color: light.color,
        });
    }

    pub fn queued_lights(&self) -> usize {
        self.queue.lights.len()
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Runs the three passes over everything queued since the last frame.
    ///
    /// `output` selects the composite destination: the surface when `None`,
    /// otherwise a caller target. Only an unusable output (disposed, or one
    /// of the G-buffer targets the composite samples) fails the call;
    /// every other problem degrades a draw and lands in the trace's
    /// diagnostics.
    pub fn render(&mut self, output: Option<TargetId>) -> Result<FrameCommands, RenderError> {
        let output_size = match output {
            Some(id) if self.gbuffer.contains(id) => {
                let err = RenderError::FeedbackLoop { target: id };
                log::error!("composite output rejected: {err}");
                return Err(err);
            }
            Some(id) => match self.targets.ensure_live(id) {
                Ok(info) => Some(info.size),
                Err(err) => {
                    log::error!("composite output rejected: {err}");
                    return Err(err);
                }
            },
            None => None,
        };

        self.apply_pending_resize();

        let size = self.camera.viewport();
        let mut frame = FrameCommands::new(size);
        frame.diagnostics.append(&mut self.deferred_diagnostics);
        for command in self.targets.take_pending() {
            frame.push(Command::Target(command));
        }

        let queue = self.queue.take();

        self.phase.advance(FramePhase::GBufferFill)?;
        self.record_pass(
            &mut frame,
            PassKind::Albedo,
            PassTarget::Offscreen(self.gbuffer.albedo),
            size,
            Some(self.config.albedo_clear.color()),
            queue.albedo,
        );
        self.record_pass(
            &mut frame,
            PassKind::Normal,
            PassTarget::Offscreen(self.gbuffer.normal),
            size,
            Some(FLAT_NORMAL),
            queue.normal,
        );

        self.phase.advance(FramePhase::LightAccumulate)?;
        let lights = self.light_model(&queue.lights, &mut frame);
        self.record_pass(
            &mut frame,
            PassKind::Light,
            PassTarget::Offscreen(self.gbuffer.light),
            size,
            Some(Color::BLACK),
            lights,
        );

        self.phase.advance(FramePhase::Composite)?;
        let (target, target_size) = match (output, output_size) {
            (Some(id), Some(actual)) => {
                if actual != size {
                    report(
                        &mut frame,
                        RenderError::SizeMismatch { target: id, expected: size, actual },
                    );
                }
                (PassTarget::Offscreen(id), actual)
            }
            _ => (PassTarget::Surface, size),
        };
        let composite = self.composite_model(&mut frame);
        self.record_pass(
            &mut frame,
            PassKind::Composite,
            target,
            target_size,
            Some(Color::BLACK),
            composite,
        );

        self.phase.advance(FramePhase::Idle)?;
        self.frame_index += 1;
        log::debug!(
            "frame {}: {} draws, {} diagnostics",
            self.frame_index,
            frame.draw_count(),
            frame.diagnostics.len()
        );
        Ok(frame)
    }

    fn apply_pending_resize(&mut self) {
        let Some(size) = self.pending_size.take() else {
            return;
        };
        if size == self.camera.viewport() {
            return;
        }
        log::info!("resizing G-buffer {} -> {size}", self.camera.viewport());
        for id in self.gbuffer.ids() {
            if let Err(err) = self.targets.reallocate(id, size.width, size.height) {
                log::error!("G-buffer reallocation failed: {err}");
                self.deferred_diagnostics.push(err);
            }
        }
        self.camera.set_viewport(size);
    }

    fn record_pass(
        &self,
        frame: &mut FrameCommands,
        kind: PassKind,
        target: PassTarget,
        size: Viewport,
        clear: Option<Color>,
        models: impl IntoIterator<Item = Model>,
    ) {
        frame.push(Command::BeginPass { kind, target, size, clear });
        for model in models {
            if let Some(model) = self.prepare_draw(frame, model) {
                frame.push(Command::Draw(model));
            }
        }
        frame.push(Command::EndPass);
    }

    /// Validates a queued model against current resources and fills the
    /// engine-provided uniforms. `None` skips the draw.
    fn prepare_draw(&self, frame: &mut FrameCommands, mut model: Model) -> Option<Model> {
        if model.is_empty() {
            return None;
        }

        let program = match self.programs.get(model.program()) {
            Ok(p) => p,
            Err(err) => {
                report(frame, err);
                return None;
            }
        };
        if let Err(err) = program.ensure_usable() {
            report(frame, err);
            return None;
        }

        for binding in model.textures() {
            let info = match self.targets.ensure_live(binding.target) {
                Ok(info) => info,
                Err(err) => {
                    report(frame, err);
                    return None;
                }
            };
            // G-buffer inputs are sampled in screen space
            if self.gbuffer.contains(binding.target) && info.size != frame.size {
                let err = RenderError::SizeMismatch {
                    target: binding.target,
                    expected: frame.size,
                    actual: info.size,
                };
                report(frame, err);
            }
        }

        if let Some(uniforms) = model.uniforms_mut() {
            uniforms.set_if_declared("view_projection", UniformValue::Mat3(self.camera.view_projection()));
            uniforms.set_if_declared("projection", UniformValue::Mat3(self.camera.projection_matrix()));
            uniforms.set_if_declared("viewport", UniformValue::Vec2(self.camera.viewport().to_f32()));
        }
        Some(model)
    }

    /// One instanced draw covering every queued light.
    fn light_model(&self, lights: &[QueuedLight], frame: &mut FrameCommands) -> Option<Model> {
        if lights.is_empty() {
            return None;
        }

        let mut centers = Vec::with_capacity(lights.len() * 2);
        let mut params = Vec::with_capacity(lights.len() * 2);
        let mut colors = Vec::with_capacity(lights.len() * 3);
        for light in lights {
            centers.extend_from_slice(&self.camera.world_to_screen(light.world).to_array());
            params.extend_from_slice(&[light.radius, light.height]);
            colors.extend_from_slice(&light.color.to_rgb());
        }

        let build = || -> Result<Model, RenderError> {
            let mut circle = Mesh::new();
            circle.add_circle(0.0, 0.0, 1.0, None)?;
            let program = self.programs.get(self.builtin.light)?;
            Model::builder(circle, program)
                .instances(InstanceStream::new(builtin::LIGHT_CENTER_SLOT, 2, centers))
                .instances(InstanceStream::new(builtin::LIGHT_PARAMS_SLOT, 2, params))
                .instances(InstanceStream::new(builtin::LIGHT_COLOR_SLOT, 3, colors))
                .texture(builtin::LIGHT_NORMAL_SLOT, self.gbuffer.normal)
                .blend(BlendMode::Additive)
                .build()
        };
        build().map_err(|err| report(frame, err)).ok()
    }

    /// Full-drawable quad over albedo and light.
    fn composite_model(&mut self, frame: &mut FrameCommands) -> Option<Model> {
        let size = self.camera.viewport();
        let [w, h] = size.to_f32();
        let config = &self.config;
        let mode = match config.composite {
            CompositeMode::Additive => 0.0,
            CompositeMode::Modulate => 1.0,
        };
        let gamma = if config.gamma_correct { 1.0 } else { 0.0 };
        let ambient = config.ambient.to_rgb();

        let build = |programs: &mut ProgramRegistry| -> Result<Model, RenderError> {
            let mut quad = Mesh::with_attributes(AttributeSet::TEXCOORD);
            quad.add_rectangle(0.0, 0.0, w, h, Some(UvRect::FULL))?;

            let program = programs.get_mut(self.builtin.composite)?;
            program.set_uniform("ambient", UniformValue::Vec3(ambient))?;
            program.set_uniform("gamma", UniformValue::Float(gamma))?;
            program.set_uniform("mode", UniformValue::Float(mode))?;
            Model::builder(quad, program)
                .texture(builtin::COMPOSITE_ALBEDO_SLOT, self.gbuffer.albedo)
                .texture(builtin::COMPOSITE_LIGHT_SLOT, self.gbuffer.light)
                .blend(BlendMode::Replace)
                .build()
        };
        build(&mut self.programs).map_err(|err| report(frame, err)).ok()
    }
}

/// Logs `err` at a level matching its severity and records it on the frame.
fn report(frame: &mut FrameCommands, err: RenderError) {
    match &err {
        RenderError::SizeMismatch { .. }
        | RenderError::AttributeContractViolation { .. }
        | RenderError::MissingTexCoord
        | RenderError::UnknownUniform { .. }
        | RenderError::UniformTypeMismatch { .. } => log::warn!("{err}"),
        _ => log::error!("{err}"),
    }
    frame.diagnostics.push(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Transform;
    use crate::target::TargetCommand;
    use approx::assert_abs_diff_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pipeline(width: u32, height: u32) -> RenderPipeline {
        RenderPipeline::new(PipelineConfig::default(), Viewport::new(width, height)).unwrap()
    }

    fn models_in(frame: &FrameCommands, kind: PassKind) -> Vec<&Model> {
        let mut current = None;
        let mut out = Vec::new();
        for command in &frame.commands {
            match command {
                Command::BeginPass { kind: k, .. } => current = Some(*k),
                Command::EndPass => current = None,
                Command::Draw(model) if current == Some(kind) => out.push(model),
                _ => {}
            }
        }
        out
    }

    fn floats(bytes: &[u8], offset: u32, n: usize) -> Vec<f32> {
        bytes[offset as usize..offset as usize + n * 4]
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn sprite_texture(p: &mut RenderPipeline) -> TargetId {
        p.create_placeholder("white", Color::WHITE)
    }

    #[test]
    fn first_frame_runs_four_passes_in_order() {
        let mut p = pipeline(800, 600);
        let frame = p.render(None).unwrap();

        let g = p.gbuffer();
        let size = Viewport::new(800, 600);
        assert_eq!(
            frame.passes(),
            vec![
                (PassKind::Albedo, PassTarget::Offscreen(g.albedo), size),
                (PassKind::Normal, PassTarget::Offscreen(g.normal), size),
                (PassKind::Light, PassTarget::Offscreen(g.light), size),
                (PassKind::Composite, PassTarget::Surface, size),
            ]
        );
        // three G-buffer targets plus the flat normal placeholder
        assert_eq!(frame.allocations().count(), 4);
        assert_eq!(frame.draws_in(PassKind::Composite), 1);
        assert_eq!(frame.draws_in(PassKind::Light), 0);
        assert!(frame.diagnostics.is_empty(), "{:?}", frame.diagnostics);
        assert_eq!(p.phase(), FramePhase::Idle);
    }

    #[test]
    fn resize_reallocates_gbuffer_exactly_once() {
        let mut p = pipeline(800, 600);
        p.render(None).unwrap();

        p.on_resize(400, 300);
        let frame = p.render(None).unwrap();

        let g = p.gbuffer();
        let disposed: Vec<TargetId> = frame.disposals().map(TargetCommand::target).collect();
        let allocated: Vec<TargetId> = frame.allocations().map(TargetCommand::target).collect();
        assert_eq!(disposed, vec![g.albedo, g.normal, g.light]);
        assert_eq!(allocated, vec![g.albedo, g.normal, g.light]);

        let composite = frame.passes().into_iter().find(|(k, ..)| *k == PassKind::Composite).unwrap();
        assert_eq!(composite.2, Viewport::new(400, 300));
        assert_eq!(p.target_size(g.light).unwrap(), Viewport::new(400, 300));

        let next = p.render(None).unwrap();
        assert_eq!(next.allocations().count(), 0);
        assert_eq!(next.disposals().count(), 0);
    }

    #[test]
    fn repeated_resizes_collapse() {
        let mut p = pipeline(800, 600);
        p.render(None).unwrap();

        p.on_resize(1024, 768);
        p.on_resize(640, 480);
        p.on_resize(400, 300);
        let frame = p.render(None).unwrap();

        assert_eq!(frame.disposals().count(), 3);
        assert_eq!(frame.allocations().count(), 3);
        assert_eq!(frame.size, Viewport::new(400, 300));
    }

    #[test]
    fn resize_callback_runs_and_zero_sizes_are_ignored() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut p = pipeline(800, 600);
        let sink = Rc::clone(&seen);
        p.set_resize_callback(move |size| sink.borrow_mut().push(size));
        p.render(None).unwrap();

        p.on_resize(0, 300);
        assert!(seen.borrow().is_empty());
        assert_eq!(p.render(None).unwrap().disposals().count(), 0);

        p.on_resize(320, 200);
        assert_eq!(*seen.borrow(), vec![Viewport::new(320, 200)]);
        assert_eq!(p.camera().viewport(), Viewport::new(800, 600));
        p.render(None).unwrap();
        assert_eq!(p.camera().viewport(), Viewport::new(320, 200));
    }

    #[test]
    fn broken_program_produces_no_draws() {
        let mut p = pipeline(64, 64);
        let broken = p.create_program(
            "broken",
            ShaderSource::new(
                "@vertex fn vs_main(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> { return vec4<f32>(p, 0.0, 1.0); }",
                "@fragment fn fs_main() -> @location(0) vec4<f32> { return undefined_value; }",
            ),
        );
        let program = p.program(broken).unwrap();
        assert!(!program.is_usable());

        let mut mesh = p.mesh(AttributeSet::POSITION);
        mesh.add_rectangle(0.0, 0.0, 4.0, 4.0, None).unwrap();
        let err = Model::builder(mesh, program).build().unwrap_err();
        assert_eq!(err, RenderError::ProgramUnusable { program: "broken".into() });

        // a model built elsewhere whose id resolves to the broken program here
        let solid = ShaderSource::new(
            "@vertex fn vs_main(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> { return vec4<f32>(p, 0.0, 1.0); }",
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        );
        let mut other = ProgramRegistry::new();
        let mut id = other.create("solid", solid.clone());
        while id != broken {
            id = other.create("solid", solid.clone());
        }
        let usable = other.get(id).unwrap();
        assert!(usable.is_usable());

        let mut mesh = p.mesh(AttributeSet::POSITION);
        mesh.add_rectangle(0.0, 0.0, 4.0, 4.0, None).unwrap();
        let model = Model::builder(mesh, usable).build().unwrap();
        p.submit(model.clone());
        p.submit_to(Layer::Normal, model);

        let frame = p.render(None).unwrap();
        assert_eq!(frame.draws_in(PassKind::Albedo), 0);
        assert_eq!(frame.draws_in(PassKind::Normal), 0);
        let unusable = frame
            .diagnostics
            .iter()
            .filter(|e| **e == RenderError::ProgramUnusable { program: "broken".into() })
            .count();
        assert_eq!(unusable, 2);
    }

    #[test]
    fn sprite_lands_in_both_gbuffer_layers() {
        let mut p = pipeline(200, 100);
        let tex = sprite_texture(&mut p);
        p.camera_mut().set_pan(10.0, 0.0);
        p.draw_sprite(&Sprite::new(tex, 0.0, 0.0, 32.0, 32.0));

        let frame = p.render(None).unwrap();
        assert_eq!(frame.draws_in(PassKind::Albedo), 1);
        assert_eq!(frame.draws_in(PassKind::Normal), 1);

        let albedo = models_in(&frame, PassKind::Albedo)[0];
        let normal = models_in(&frame, PassKind::Normal)[0];
        assert_eq!(albedo.textures()[0].target, tex);
        assert_eq!(normal.textures()[1].target, p.flat_normal);

        let uniforms = albedo.uniforms().unwrap();
        let offset = uniforms.layout().member("view_projection").unwrap().offset;
        let expected = p.camera().view_projection().to_mat3_columns();
        let got = floats(uniforms.bytes(), offset, 12);
        assert_abs_diff_eq!(got[8], expected[2][0], epsilon = 1e-6);
        assert_abs_diff_eq!(got[0], expected[0][0], epsilon = 1e-6);
    }

    #[test]
    fn sprite_tint_is_snapshotted_per_draw() {
        let mut p = pipeline(64, 64);
        let tex = sprite_texture(&mut p);
        p.draw_sprite(&Sprite::new(tex, 0.0, 0.0, 8.0, 8.0).tint(Color::rgb(1.0, 0.0, 0.0)));
        p.draw_sprite(&Sprite::new(tex, 8.0, 0.0, 8.0, 8.0).tint(Color::rgb(0.0, 0.0, 1.0)));

        let frame = p.render(None).unwrap();
        let tints: Vec<Vec<f32>> = models_in(&frame, PassKind::Albedo)
            .iter()
            .map(|m| {
                let u = m.uniforms().unwrap();
                floats(u.bytes(), u.layout().member("tint").unwrap().offset, 4)
            })
            .collect();
        assert_eq!(tints, vec![vec![1.0, 0.0, 0.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]]);
    }

    #[test]
    fn sprite_follows_transform_stack() {
        let mut p = pipeline(64, 64);
        let tex = sprite_texture(&mut p);
        p.transforms_mut().push(Transform::translation(5.0, 7.0));
        p.draw_sprite(&Sprite::new(tex, 0.0, 0.0, 1.0, 1.0));
        p.transforms_mut().pop();

        let frame = p.render(None).unwrap();
        let albedo = models_in(&frame, PassKind::Albedo)[0];
        assert_eq!(&albedo.vertices()[..2], &[5.0, 7.0]);
    }

    #[test]
    fn lights_become_one_instanced_draw() {
        let mut p = pipeline(200, 200);
        p.camera_mut().set_pan(20.0, 0.0);
        p.transforms_mut().push(Transform::translation(100.0, 50.0));
        p.add_light(PointLight::new(0.0, 0.0, 40.0, Color::WHITE));
        p.transforms_mut().pop();
        p.add_light(PointLight::new(10.0, 10.0, 30.0, Color::rgb(1.0, 0.5, 0.0)).with_height(12.0));
        p.add_light(PointLight::new(0.0, 0.0, 0.0, Color::WHITE));
        p.add_light(PointLight::new(0.0, 0.0, -5.0, Color::WHITE));
        assert_eq!(p.queued_lights(), 2);

        let frame = p.render(None).unwrap();
        let lights = models_in(&frame, PassKind::Light);
        assert_eq!(lights.len(), 1);

        let model = lights[0];
        assert_eq!(model.instance_count(), 2);
        assert_eq!(model.blend(), BlendMode::Additive);
        assert_eq!(model.element_count() as usize, 3 * crate::geometry::CIRCLE_SEGMENTS);

        let stream = |slot| &model.instances().iter().find(|s| s.attribute.slot == slot).unwrap().data;
        assert_eq!(stream(builtin::LIGHT_CENTER_SLOT), &vec![80.0, 50.0, -10.0, 10.0]);
        assert_eq!(
            stream(builtin::LIGHT_PARAMS_SLOT),
            &vec![40.0, p.config().default_light_height, 30.0, 12.0]
        );
        assert_eq!(model.textures()[0].target, p.gbuffer().normal);
    }

    #[test]
    fn light_radius_follows_transform_scale() {
        let mut p = pipeline(200, 200);
        p.transforms_mut().push(Transform::translation(50.0, 50.0));
        p.transforms_mut().push(Transform::scale(2.0, 2.0));
        p.add_light(PointLight::new(10.0, 0.0, 15.0, Color::WHITE).with_height(8.0));
        p.transforms_mut().push(Transform::scale(0.0, 1.0));
        p.add_light(PointLight::new(0.0, 0.0, 15.0, Color::WHITE));
        assert_eq!(p.queued_lights(), 1);

        let frame = p.render(None).unwrap();
        let model = models_in(&frame, PassKind::Light)[0];
        let stream = |slot| &model.instances().iter().find(|s| s.attribute.slot == slot).unwrap().data;
        assert_eq!(stream(builtin::LIGHT_CENTER_SLOT), &vec![70.0, 50.0]);
        assert_eq!(stream(builtin::LIGHT_PARAMS_SLOT), &vec![30.0, 8.0]);
    }

    #[test]
    fn disposed_texture_degrades_the_draw() {
        let mut p = pipeline(64, 64);
        let tex = sprite_texture(&mut p);
        p.draw_sprite(&Sprite::new(tex, 0.0, 0.0, 8.0, 8.0));
        p.dispose_target(tex).unwrap();

        let frame = p.render(None).unwrap();
        assert_eq!(frame.draws_in(PassKind::Albedo), 0);
        assert!(frame.diagnostics.contains(&RenderError::UseAfterDispose { target: tex }));
        // the frame still completes
        assert_eq!(frame.draws_in(PassKind::Composite), 1);
    }

    #[test]
    fn sprite_with_disposed_texture_is_reported_next_frame() {
        let mut p = pipeline(64, 64);
        let tex = sprite_texture(&mut p);
        p.dispose_target(tex).unwrap();
        p.draw_sprite(&Sprite::new(tex, 0.0, 0.0, 8.0, 8.0));

        let frame = p.render(None).unwrap();
        assert_eq!(frame.draw_count(), 1);
        assert_eq!(frame.diagnostics, vec![RenderError::UseAfterDispose { target: tex }]);
    }

    #[test]
    fn disposed_output_fails_render() {
        let mut p = pipeline(64, 64);
        let out = p.create_target("out", 64, 64, TargetFormat::Rgba8Unorm).unwrap();
        p.dispose_target(out).unwrap();
        assert_eq!(p.render(Some(out)).unwrap_err(), RenderError::UseAfterDispose { target: out });
        assert_eq!(p.phase(), FramePhase::Idle);
    }

    #[test]
    fn gbuffer_targets_are_rejected_as_output() {
        let mut p = pipeline(64, 64);
        let tex = sprite_texture(&mut p);
        p.draw_sprite(&Sprite::new(tex, 0.0, 0.0, 8.0, 8.0));
        let g = p.gbuffer();

        for id in [g.albedo, g.normal, g.light] {
            assert_eq!(p.render(Some(id)).unwrap_err(), RenderError::FeedbackLoop { target: id });
            assert_eq!(p.phase(), FramePhase::Idle);
        }

        // nothing was consumed; the surface frame still gets the sprite
        let frame = p.render(None).unwrap();
        assert_eq!(frame.draws_in(PassKind::Albedo), 1);
        assert_eq!(frame.passes().pop().unwrap().1, PassTarget::Surface);
    }

    #[test]
    fn mismatched_output_warns_but_composites() {
        let mut p = pipeline(64, 64);
        let out = p.create_target("thumb", 32, 32, TargetFormat::Rgba8Unorm).unwrap();
        let frame = p.render(Some(out)).unwrap();

        assert!(frame.diagnostics.iter().any(|e| matches!(e, RenderError::SizeMismatch { target, .. } if *target == out)));
        let composite = frame.passes().pop().unwrap();
        assert_eq!(composite, (PassKind::Composite, PassTarget::Offscreen(out), Viewport::new(32, 32)));
        assert_eq!(frame.draws_in(PassKind::Composite), 1);
    }

    #[test]
    fn composite_uniforms_follow_config() {
        let mut p = pipeline(64, 64);
        p.config_mut().composite = CompositeMode::Modulate;
        p.config_mut().gamma_correct = true;
        p.config_mut().ambient = Color::rgb(0.25, 0.5, 0.75);

        let frame = p.render(None).unwrap();
        let model = models_in(&frame, PassKind::Composite)[0];
        let u = model.uniforms().unwrap();
        let read = |name: &str, n| floats(u.bytes(), u.layout().member(name).unwrap().offset, n);
        assert_eq!(read("mode", 1), vec![1.0]);
        assert_eq!(read("gamma", 1), vec![1.0]);
        assert_eq!(read("ambient", 3), vec![0.25, 0.5, 0.75]);
        assert_eq!(model.element_count(), 6);
    }

    #[test]
    fn custom_model_is_submitted_with_engine_uniforms() {
        let mut p = pipeline(100, 50);
        let id = p.create_program(
            "flat",
            ShaderSource::new(
                r#"
struct Globals { view_projection: mat3x3<f32>, viewport: vec2<f32> };
@group(0) @binding(0) var<uniform> globals: Globals;
@vertex
fn vs_main(@location(0) p: vec2<f32>, @location(1) c: vec3<f32>) -> @builtin(position) vec4<f32> {
    let clip = globals.view_projection * vec3<f32>(p, 1.0);
    return vec4<f32>(clip.xy, 0.0, 1.0);
}
"#,
                "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
            ),
        );
        let mut mesh = p.mesh(AttributeSet::COLOR);
        mesh.add_circle(10.0, 10.0, 5.0, None).unwrap();
        let model = Model::builder(mesh, p.program(id).unwrap()).build().unwrap();
        p.submit(model);

        let frame = p.render(None).unwrap();
        let model = models_in(&frame, PassKind::Albedo)[0];
        let u = model.uniforms().unwrap();
        let viewport = floats(u.bytes(), u.layout().member("viewport").unwrap().offset, 2);
        assert_eq!(viewport, vec![100.0, 50.0]);
    }
}
