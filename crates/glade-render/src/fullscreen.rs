//! Full-screen quad helpers shared by the blit and scatter passes.
//!
//! Every full-screen pass draws a single oversized triangle generated from
//! the vertex index, samples one texture, and writes one color target.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// Per-draw uniform slot, written once per draw call at a dynamic offset.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawUniform {
    /// Color multiplier applied to the fragment output.
    pub tint: [f32; 4],
    /// `x`: alpha-test threshold (0 disables). `yzw`: unused.
    pub params: [f32; 4],
}

impl DrawUniform {
    pub fn new(tint: Vec4, alpha_threshold: f32) -> Self {
        Self {
            tint: tint.to_array(),
            params: [alpha_threshold, 0.0, 0.0, 0.0],
        }
    }
}

/// Byte distance between [`DrawUniform`] slots. Matches the default
/// `min_uniform_buffer_offset_alignment`.
pub const DRAW_UNIFORM_STRIDE: u64 = 256;

/// Number of draw slots reserved per frame.
pub const DRAW_SLOTS_PER_FRAME: u64 = 64;

/// Tinted texture blit.
pub const BLIT_SHADER_SOURCE: &str = r#"
struct DrawUniform {
    tint: vec4<f32>,
    params: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var<uniform> draw: DrawUniform;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_blit(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(input_tex, input_sampler, in.uv);
    return vec4<f32>(color.rgb * draw.tint.rgb, draw.tint.a);
}
"#;

/// Layout for the per-draw uniform at a dynamic offset.
pub fn create_draw_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("draw-uniform-bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: std::num::NonZeroU64::new(
                    std::mem::size_of::<DrawUniform>() as u64,
                ),
            },
            count: None,
        }],
    })
}

/// Texture at binding 0, filtering sampler at binding 1.
pub fn create_texture_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn create_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Bilinear, clamp-to-edge. Off-screen scatter samples land on the border.
pub fn create_linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Create a full-screen render pipeline with the given fragment entry point.
pub fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fragment_entry: &str,
    target_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

/// Run a single full-screen pass with no depth attachment.
pub fn run_fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    pipeline: &wgpu::RenderPipeline,
    bind_groups: &[(&wgpu::BindGroup, &[u32])],
    target_view: &wgpu::TextureView,
    load_op: wgpu::LoadOp<wgpu::Color>,
    label: &str,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: load_op,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    pass.set_pipeline(pipeline);
    for (index, (group, offsets)) in bind_groups.iter().enumerate() {
        pass.set_bind_group(index as u32, *group, offsets);
    }
    pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_uniform_size() {
        assert_eq!(std::mem::size_of::<DrawUniform>(), 32);
    }

    #[test]
    fn test_stride_fits_uniform_and_alignment() {
        assert!(DRAW_UNIFORM_STRIDE >= std::mem::size_of::<DrawUniform>() as u64);
        let align = u64::from(wgpu::Limits::default().min_uniform_buffer_offset_alignment);
        assert_eq!(DRAW_UNIFORM_STRIDE % align, 0);
    }

    #[test]
    fn test_draw_uniform_packs_threshold() {
        let u = DrawUniform::new(Vec4::new(0.5, 0.5, 0.5, 1.0), 0.9);
        assert_eq!(u.tint, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(u.params[0], 0.9);
    }

    #[test]
    fn test_fullscreen_triangle_covers_clip_space() {
        // Mirrors vs_fullscreen: vertices (0,0), (2,0), (0,2) in uv space.
        let verts: Vec<(f32, f32)> = (0u32..3)
            .map(|idx| (((idx << 1) & 2) as f32, (idx & 2) as f32))
            .map(|(u, v)| (u * 2.0 - 1.0, v * 2.0 - 1.0))
            .collect();
        assert_eq!(verts, vec![(-1.0, -1.0), (3.0, -1.0), (-1.0, 3.0)]);
    }
}
