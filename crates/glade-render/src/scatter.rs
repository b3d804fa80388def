//! Screen-space light scattering.
//!
//! Each output pixel marches [`SCATTER_SAMPLES`] steps from itself toward the
//! light's screen position, accumulating the occlusion mask with a geometric
//! falloff. Bright (unoccluded) sky streaks outward from the light; black
//! silhouettes cut shafts into it.
//!
//! The filter exists twice with the same maths: [`SCATTER_SHADER_SOURCE`]
//! for the GPU and [`apply_cpu`] for the software device.

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2, Vec3, Vec4};
use glade_config::ScatterProfile;

use crate::error::CompositorError;
use crate::fullscreen::{create_fullscreen_pipeline, run_fullscreen_pass};
use crate::image::Image;

/// Number of taps marched toward the light per pixel.
pub const SCATTER_SAMPLES: u32 = 64;

/// Everything the filter needs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScatterParams {
    pub profile: ScatterProfile,
    /// Light position in normalized screen space, y down. May be off-screen.
    pub light_pos: Vec2,
    /// Size of the destination in pixels.
    pub viewport: UVec2,
}

impl ScatterParams {
    pub fn new(profile: ScatterProfile, light_pos: Vec2, viewport: UVec2) -> Self {
        Self {
            profile,
            light_pos,
            viewport,
        }
    }

    pub fn validate(&self) -> Result<(), CompositorError> {
        let p = &self.profile;
        if ![p.density, p.weight, p.decay, p.exposure]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(CompositorError::MissingParameter("scatter profile"));
        }
        if !self.light_pos.is_finite() {
            return Err(CompositorError::MissingParameter("light position"));
        }
        if self.viewport.x == 0 || self.viewport.y == 0 {
            return Err(CompositorError::MissingParameter("scatter viewport"));
        }
        Ok(())
    }

    pub fn to_uniform(&self) -> ScatterUniform {
        ScatterUniform {
            light_pos: self.light_pos.to_array(),
            viewport: self.viewport.as_vec2().to_array(),
            density: self.profile.density,
            weight: self.profile.weight,
            decay: self.profile.decay,
            exposure: self.profile.exposure,
        }
    }
}

/// GPU layout of [`ScatterParams`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ScatterUniform {
    pub light_pos: [f32; 2],
    pub viewport: [f32; 2],
    pub density: f32,
    pub weight: f32,
    pub decay: f32,
    pub exposure: f32,
}

pub const SCATTER_SHADER_SOURCE: &str = r#"
struct ScatterUniform {
    light_pos: vec2<f32>,
    viewport: vec2<f32>,
    density: f32,
    weight: f32,
    decay: f32,
    exposure: f32,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

const SCATTER_SAMPLES: i32 = 64;

@group(0) @binding(0) var<uniform> params: ScatterUniform;
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
fn fs_scatter(in: VertexOutput) -> @location(0) vec4<f32> {
    var uv = in.uv;
    let delta = (uv - params.light_pos) * params.density / f32(SCATTER_SAMPLES);
    var color = textureSampleLevel(input_tex, input_sampler, uv, 0.0).rgb * params.weight;
    var illumination = 1.0;
    for (var i = 1; i <= SCATTER_SAMPLES; i++) {
        uv = uv - delta;
        illumination = illumination * params.decay;
        let s = textureSampleLevel(input_tex, input_sampler, uv, 0.0).rgb;
        color = color + s * params.weight * illumination * params.density;
    }
    return vec4<f32>(color * params.exposure, 1.0);
}
"#;

/// Run the filter on the CPU, producing a `width` x `height` image.
///
/// `source` may have any size; it is sampled bilinearly with clamp-to-edge.
pub fn apply_cpu(source: &Image, width: u32, height: u32, params: &ScatterParams) -> Image {
    let p = params.profile;
    let light = params.light_pos;
    let mut out = Image::new(width, height, Vec4::ZERO);
    for y in 0..out.height() {
        for x in 0..out.width() {
            let mut uv = out.uv_of(x, y);
            let delta = (uv - light) * p.density / SCATTER_SAMPLES as f32;
            let mut color: Vec3 = source.sample(uv).truncate() * p.weight;
            let mut illumination = 1.0;
            for _ in 1..=SCATTER_SAMPLES {
                uv -= delta;
                illumination *= p.decay;
                color += source.sample(uv).truncate() * p.weight * illumination * p.density;
            }
            out.set(x, y, (color * p.exposure).extend(1.0));
        }
    }
    out
}

/// GPU implementation of the filter.
pub struct LightScatterFilter {
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl LightScatterFilter {
    /// `texture_bgl` must be the texture + sampler layout the source targets
    /// were created with.
    pub fn new(
        device: &wgpu::Device,
        texture_bgl: &wgpu::BindGroupLayout,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scatter-shader"),
            source: wgpu::ShaderSource::Wgsl(SCATTER_SHADER_SOURCE.into()),
        });

        let params_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scatter-params-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<ScatterUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scatter-layout"),
            bind_group_layouts: &[&params_bgl, texture_bgl],
            immediate_size: 0,
        });
        // Output replaces the destination.
        let pipeline = create_fullscreen_pipeline(
            device,
            &shader,
            &layout,
            "fs_scatter",
            target_format,
            None,
            "scatter-pipeline",
        );

        use wgpu::util::DeviceExt;
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scatter-params"),
            contents: bytemuck::bytes_of(&ScatterUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scatter-params-bg"),
            layout: &params_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        Self {
            params_buffer,
            params_bind_group,
            pipeline,
        }
    }

    /// Record the filter from `source` into `target_view`.
    pub fn apply(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::BindGroup,
        target_view: &wgpu::TextureView,
        params: &ScatterParams,
    ) -> Result<(), CompositorError> {
        params.validate()?;
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params.to_uniform()));
        run_fullscreen_pass(
            encoder,
            &self.pipeline,
            &[(&self.params_bind_group, &[]), (source, &[])],
            target_view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            "light-scatter",
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glade_config::ScatterPreset;

    fn params(profile: ScatterProfile, light: Vec2) -> ScatterParams {
        ScatterParams::new(profile, light, UVec2::new(16, 16))
    }

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<ScatterUniform>(), 32);
    }

    #[test]
    fn test_zero_density_is_scaled_source() {
        let source = Image::from_fn(16, 16, |x, y| {
            Vec4::new(x as f32 / 15.0, y as f32 / 15.0, 0.25, 1.0)
        });
        let profile = ScatterProfile {
            density: 0.0,
            ..ScatterPreset::Meadow.profile()
        };
        let out = apply_cpu(&source, 16, 16, &params(profile, Vec2::new(0.3, 0.7)));
        let k = profile.exposure * profile.weight;
        for y in 0..16 {
            for x in 0..16 {
                let expected = source.get(x, y).truncate() * k;
                let got = out.get(x, y);
                assert!((got.truncate() - expected).length() < 1e-5, "({x},{y})");
                assert_eq!(got.w, 1.0);
            }
        }
    }

    #[test]
    fn test_uniform_white_input_matches_geometric_sum() {
        let source = Image::new(8, 8, Vec4::ONE);
        let profile = ScatterPreset::Meadow.profile();
        let out = apply_cpu(&source, 8, 8, &params(profile, Vec2::splat(0.5)));
        let tail: f32 = (1..=SCATTER_SAMPLES)
            .map(|i| profile.decay.powi(i as i32))
            .sum();
        let expected = profile.exposure * profile.weight * (1.0 + profile.density * tail);
        for p in out.pixels() {
            assert!((p.x - expected).abs() < 1e-4, "{} vs {expected}", p.x);
        }
    }

    #[test]
    fn test_black_input_stays_black() {
        let source = Image::new(8, 8, Vec4::new(0.0, 0.0, 0.0, 1.0));
        let out = apply_cpu(&source, 4, 4, &params(ScatterProfile::default(), Vec2::splat(0.5)));
        assert!(out.pixels().iter().all(|p| p.truncate() == Vec3::ZERO && p.w == 1.0));
    }

    #[test]
    fn test_off_screen_light_stays_finite() {
        let source = Image::from_fn(8, 8, |x, _| Vec4::splat((x % 2) as f32));
        for light in [Vec2::new(-3.0, 0.5), Vec2::new(0.5, 40.0), Vec2::new(1e6, -1e6)] {
            let out = apply_cpu(&source, 8, 8, &params(ScatterProfile::default(), light));
            assert!(out.pixels().iter().all(|p| p.is_finite()), "light {light}");
        }
    }

    #[test]
    fn test_shafts_extend_away_from_light() {
        // Bright left half, dark right half, light on the left: the dark side
        // picks up light marched in from the bright side.
        let source = Image::from_fn(32, 8, |x, _| {
            if x < 16 { Vec4::ONE } else { Vec4::new(0.0, 0.0, 0.0, 1.0) }
        });
        let out = apply_cpu(&source, 32, 8, &params(ScatterProfile::default(), Vec2::new(0.0, 0.5)));
        assert!(out.get(18, 4).x > 0.0);
        assert!(out.get(18, 4).x > out.get(30, 4).x);
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut p = params(ScatterProfile::default(), Vec2::new(f32::NAN, 0.5));
        assert!(matches!(
            p.validate(),
            Err(CompositorError::MissingParameter("light position"))
        ));
        p.light_pos = Vec2::splat(0.5);
        p.profile.decay = f32::INFINITY;
        assert!(matches!(
            p.validate(),
            Err(CompositorError::MissingParameter("scatter profile"))
        ));
        p.profile.decay = 0.9;
        assert!(p.validate().is_ok());
        p.viewport = UVec2::ZERO;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_shader_declares_same_sample_count() {
        assert!(SCATTER_SHADER_SOURCE.contains(&format!("SCATTER_SAMPLES: i32 = {SCATTER_SAMPLES};")));
    }
}
