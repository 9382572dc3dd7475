//! Deferred-lighting demo.
//!
//! A tiled floor with a spinning crate in the middle, lit by a handful of
//! orbiting point lights while the camera drifts slowly.
//!
//! Usage: `umbra-demo [albedo.png]`. Without an argument the floor texture is
//! generated procedurally.

use std::f32::consts::TAU;

use anyhow::{Context, Result};
use winit::dpi::LogicalSize;

use umbra_engine::config::PipelineConfig;
use umbra_engine::coords::{Transform, Viewport};
use umbra_engine::core::{App, AppControl, FrameCtx};
use umbra_engine::device::GpuInit;
use umbra_engine::logging::{init_logging, LoggingConfig};
use umbra_engine::paint::Color;
use umbra_engine::pipeline::{encode_normal, PointLight, RenderPipeline, Sprite};
use umbra_engine::render::GpuRenderer;
use umbra_engine::target::{ColorSpace, TargetId};
use umbra_engine::window::{Runtime, RuntimeConfig};

const TEXTURE_SIZE: u32 = 128;
const TILE: f32 = 128.0;
const FLOOR_TILES: i32 = 12;
const CRATE_SIZE: f32 = 160.0;

struct Demo {
    pipeline: RenderPipeline,
    renderer: GpuRenderer,
    floor: TargetId,
    floor_normal: TargetId,
    crate_albedo: TargetId,
    crate_normal: TargetId,
    lights: Vec<Orbit>,
}

/// A light circling the world origin.
struct Orbit {
    distance: f32,
    speed: f32,
    phase: f32,
    radius: f32,
    color: Color,
}

impl Orbit {
    fn light(&self, t: f32) -> PointLight {
        let angle = self.phase + t * self.speed;
        PointLight::new(
            angle.cos() * self.distance,
            angle.sin() * self.distance,
            self.radius,
            self.color,
        )
    }
}

impl Demo {
    fn new(albedo_png: Option<Vec<u8>>) -> Result<Self> {
        let mut pipeline = RenderPipeline::new(PipelineConfig::default(), Viewport::new(1280, 720))
            .context("failed to set up the render pipeline")?;

        pipeline.set_resize_callback(|vp| log::info!("demo viewport {}x{}", vp.width, vp.height));

        let floor = pipeline.create_placeholder("floor albedo", Color::WHITE);
        match albedo_png {
            Some(bytes) => pipeline
                .load_image(floor, &bytes, ColorSpace::Srgb)
                .context("failed to decode the floor texture")?,
            None => pipeline.upload_rgba(
                floor,
                TEXTURE_SIZE,
                TEXTURE_SIZE,
                brick_albedo(TEXTURE_SIZE),
                ColorSpace::Srgb,
            )?,
        }

        let floor_normal = pipeline.create_placeholder("floor normal", Color::WHITE);
        pipeline.upload_rgba(
            floor_normal,
            TEXTURE_SIZE,
            TEXTURE_SIZE,
            brick_normal(TEXTURE_SIZE),
            ColorSpace::Linear,
        )?;

        let crate_albedo = pipeline.create_placeholder("crate albedo", Color::WHITE);
        pipeline.upload_rgba(
            crate_albedo,
            TEXTURE_SIZE,
            TEXTURE_SIZE,
            crate_pattern(TEXTURE_SIZE),
            ColorSpace::Srgb,
        )?;

        let crate_normal = pipeline.create_placeholder("crate normal", Color::WHITE);
        pipeline.upload_rgba(
            crate_normal,
            TEXTURE_SIZE,
            TEXTURE_SIZE,
            bevel_normal(TEXTURE_SIZE),
            ColorSpace::Linear,
        )?;

        let lights = vec![
            Orbit { distance: 260.0, speed: 0.7, phase: 0.0, radius: 380.0, color: Color::rgb(1.0, 0.55, 0.25) },
            Orbit { distance: 420.0, speed: -0.4, phase: 2.1, radius: 460.0, color: Color::rgb(0.3, 0.6, 1.0) },
            Orbit { distance: 120.0, speed: 1.3, phase: 4.0, radius: 240.0, color: Color::rgb(0.5, 1.0, 0.5) },
            Orbit { distance: 600.0, speed: 0.25, phase: 1.0, radius: 520.0, color: Color::rgb(1.0, 1.0, 0.9) },
        ];

        Ok(Self {
            pipeline,
            renderer: GpuRenderer::new(),
            floor,
            floor_normal,
            crate_albedo,
            crate_normal,
            lights,
        })
    }

    fn build_scene(&mut self, t: f32) {
        let vp = self.pipeline.camera().viewport();
        let pan_x = (t * 0.2).sin() * 120.0 - vp.width as f32 * 0.5;
        let pan_y = (t * 0.15).cos() * 80.0 - vp.height as f32 * 0.5;
        self.pipeline.camera_mut().set_pan(pan_x, pan_y);

        let half = FLOOR_TILES / 2;
        for row in -half..half {
            for col in -half..half {
                let sprite = Sprite::new(self.floor, col as f32 * TILE, row as f32 * TILE, TILE, TILE)
                    .normal_map(self.floor_normal);
                self.pipeline.draw_sprite(&sprite);
            }
        }

        let spin = Transform::rotation(t * 0.5);
        self.pipeline.transforms_mut().push(spin);
        let half_crate = CRATE_SIZE * 0.5;
        let crate_sprite = Sprite::new(self.crate_albedo, -half_crate, -half_crate, CRATE_SIZE, CRATE_SIZE)
            .normal_map(self.crate_normal);
        self.pipeline.draw_sprite(&crate_sprite);
        self.pipeline.transforms_mut().pop();

        for orbit in &self.lights {
            self.pipeline.add_light(orbit.light(t));
        }
    }
}

impl App for Demo {
    fn on_resize(&mut self, viewport: Viewport) {
        self.pipeline.on_resize(viewport.width, viewport.height);
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.build_scene(ctx.time.elapsed);

        let frame = match self.pipeline.render(None) {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("frame skipped: {err}");
                return AppControl::Continue;
            }
        };

        if ctx.time.frame_index % 300 == 0 {
            log::debug!(
                "frame {}: {} draws, {:.1} ms",
                ctx.time.frame_index,
                frame.draw_count(),
                ctx.time.dt * 1000.0
            );
        }

        let programs = self.pipeline.programs();
        let renderer = &mut self.renderer;
        ctx.render(|rctx, target| renderer.execute(rctx, target, programs, frame))
    }
}

// ── procedural textures ───────────────────────────────────────────────────

fn pixel_buffer(size: u32, mut texel: impl FnMut(u32, u32) -> [u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            out.extend_from_slice(&texel(x, y));
        }
    }
    out
}

fn normal_texel(n: [f32; 3]) -> [u8; 4] {
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt().max(f32::EPSILON);
    let [r, g, b] = encode_normal(n.map(|c| c / len));
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8, 255]
}

/// Four courses of bricks with a mortar gap, every other course offset.
fn brick_cell(size: u32, x: u32, y: u32) -> (f32, f32, bool) {
    let course = size / 4;
    let brick_w = size / 2;
    let row = y / course;
    let shifted = if row % 2 == 0 { x } else { (x + brick_w / 2) % size };
    let u = (shifted % brick_w) as f32 / brick_w as f32;
    let v = (y % course) as f32 / course as f32;
    let mortar = u < 0.04 || v < 0.08;
    (u, v, mortar)
}

fn brick_albedo(size: u32) -> Vec<u8> {
    pixel_buffer(size, |x, y| {
        let (_, _, mortar) = brick_cell(size, x, y);
        if mortar {
            [150, 145, 135, 255]
        } else {
            let grain = ((x * 7 + y * 13) % 17) as u8;
            [150 + grain, 70 + grain / 2, 50, 255]
        }
    })
}

fn brick_normal(size: u32) -> Vec<u8> {
    pixel_buffer(size, |x, y| {
        let (u, v, mortar) = brick_cell(size, x, y);
        if mortar {
            return normal_texel([0.0, 0.0, 1.0]);
        }
        // bevel the brick edges outward
        let edge = 0.12;
        let nx = if u < edge { -1.0 } else if u > 1.0 - edge { 1.0 } else { 0.0 };
        let ny = if v < edge { -1.0 } else if v > 1.0 - edge { 1.0 } else { 0.0 };
        normal_texel([nx * 0.6, ny * 0.6, 1.0])
    })
}

fn crate_pattern(size: u32) -> Vec<u8> {
    let border = size / 10;
    pixel_buffer(size, |x, y| {
        let frame = x < border || y < border || x >= size - border || y >= size - border;
        let diagonal = x.abs_diff(y) < border / 2;
        if frame || diagonal {
            [120, 80, 40, 255]
        } else {
            let plank = ((y / (size / 8)) % 2) as u8 * 12;
            [170 + plank, 125 + plank, 70, 255]
        }
    })
}

/// Pyramid bevel: normals tilt toward the nearest edge.
fn bevel_normal(size: u32) -> Vec<u8> {
    let s = size as f32;
    pixel_buffer(size, |x, y| {
        let u = (x as f32 + 0.5) / s * 2.0 - 1.0;
        let v = (y as f32 + 0.5) / s * 2.0 - 1.0;
        let edge = u.abs().max(v.abs());
        if edge < 0.8 {
            return normal_texel([0.0, 0.0, 1.0]);
        }
        let n = if u.abs() > v.abs() { [u.signum(), 0.0, 0.8] } else { [0.0, v.signum(), 0.8] };
        normal_texel(n)
    })
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let albedo_png = match std::env::args().nth(1) {
        Some(path) => Some(std::fs::read(&path).with_context(|| format!("failed to read {path}"))?),
        None => None,
    };

    let demo = Demo::new(albedo_png)?;
    log::info!(
        "{} lights orbiting, full turn of the slowest every {:.0}s",
        demo.lights.len(),
        demo.lights
            .iter()
            .map(|o| TAU / o.speed.abs())
            .fold(0.0, f32::max)
    );

    Runtime::run(
        RuntimeConfig {
            title: "umbra demo".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        },
        GpuInit::default(),
        demo,
    )
}
