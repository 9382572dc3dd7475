use std::collections::HashMap;

use crate::coords::Viewport;
use crate::target::{TargetCommand, TargetFormat, TargetId};

use super::common::texture_format;

/// GPU storage behind one target generation.
pub(super) struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub generation: u32,
    pub size: Viewport,
}

/// Textures keyed by target id, kept in step with the pool's commands.
#[derive(Default)]
pub(super) struct TextureStore {
    textures: HashMap<TargetId, GpuTexture>,
}

impl TextureStore {
    pub fn get(&self, id: TargetId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    pub fn apply(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, command: TargetCommand) {
        match command {
            TargetCommand::Allocate {
                target,
                generation,
                size,
                format,
                label,
                pixels,
            } => {
                let gpu = allocate(device, &label, size, format, generation);
                if let Some(pixels) = pixels {
                    upload(queue, &gpu, format, &pixels);
                }
                if let Some(old) = self.textures.insert(target, gpu) {
                    log::warn!("{target} generation {} replaced without dispose", old.generation);
                    old.texture.destroy();
                }
            }
            TargetCommand::Dispose { target, generation } => match self.textures.remove(&target) {
                Some(old) if old.generation == generation => old.texture.destroy(),
                Some(newer) => {
                    // stale dispose; keep the live generation
                    self.textures.insert(target, newer);
                }
                None => log::warn!("dispose of {target} with no GPU storage"),
            },
        }
    }
}

fn allocate(
    device: &wgpu::Device,
    label: &str,
    size: Viewport,
    format: TargetFormat,
    generation: u32,
) -> GpuTexture {
    let wgpu_format = texture_format(format);
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        format: wgpu_format,
        generation,
        size,
    }
}

fn upload(queue: &wgpu::Queue, gpu: &GpuTexture, format: TargetFormat, pixels: &[u8]) {
    let bpp = format.bytes_per_pixel();
    let expected = (gpu.size.width * gpu.size.height * bpp) as usize;
    if pixels.len() != expected {
        log::warn!(
            "skipping upload: {} bytes for a {} {format:?} texture",
            pixels.len(),
            gpu.size
        );
        return;
    }
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &gpu.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(bpp * gpu.size.width),
            rows_per_image: Some(gpu.size.height),
        },
        extent(gpu.size),
    );
}

fn extent(size: Viewport) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    }
}
