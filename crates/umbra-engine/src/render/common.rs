//! Mappings from engine types to wgpu descriptors.

use crate::geometry::{BlendMode, Topology};
use crate::paint::Color;
use crate::target::TargetFormat;

// ── blend ─────────────────────────────────────────────────────────────────

fn component(src: wgpu::BlendFactor, dst: wgpu::BlendFactor) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation: wgpu::BlendOperation::Add,
    }
}

pub(super) fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    use wgpu::BlendFactor::{One, OneMinusSrcAlpha, SrcAlpha};
    match mode {
        BlendMode::Replace => None,
        BlendMode::AlphaOver => Some(wgpu::BlendState {
            color: component(SrcAlpha, OneMinusSrcAlpha),
            alpha: component(One, OneMinusSrcAlpha),
        }),
        BlendMode::Premultiplied => Some(wgpu::BlendState {
            color: component(One, OneMinusSrcAlpha),
            alpha: component(One, OneMinusSrcAlpha),
        }),
        BlendMode::Additive => Some(wgpu::BlendState {
            color: component(One, One),
            alpha: component(One, One),
        }),
    }
}

// ── sampling ──────────────────────────────────────────────────────────────

/// Shared sampler for every texture slot.
///
/// Screen-space UVs land exactly on the drawable edge, so addressing clamps
/// instead of wrapping into the opposite border.
pub(super) fn sampler_descriptor() -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("umbra clamp sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    }
}

// ── formats ───────────────────────────────────────────────────────────────

pub(super) fn texture_format(format: TargetFormat) -> wgpu::TextureFormat {
    match format {
        TargetFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TargetFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TargetFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

pub(super) fn vertex_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

pub(super) fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        Topology::LineList => wgpu::PrimitiveTopology::LineList,
        Topology::PointList => wgpu::PrimitiveTopology::PointList,
    }
}

pub(super) fn load_op(clear: Option<Color>) -> wgpu::LoadOp<wgpu::Color> {
    match clear {
        Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }),
        None => wgpu::LoadOp::Load,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additive_blend_sums() {
        let state = blend_state(BlendMode::Additive).unwrap();
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert!(blend_state(BlendMode::Replace).is_none());
    }

    #[test]
    fn sampler_clamps_and_filters_linearly() {
        let desc = sampler_descriptor();
        for mode in [desc.address_mode_u, desc.address_mode_v, desc.address_mode_w] {
            assert_eq!(mode, wgpu::AddressMode::ClampToEdge);
        }
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Linear);
    }

    #[test]
    fn vertex_formats_cover_float_vectors() {
        assert_eq!(vertex_format(3), Some(wgpu::VertexFormat::Float32x3));
        assert_eq!(vertex_format(5), None);
    }
}
