//! WGSL sources for the scene draws.
//!
//! Each [`SceneDraw`] gets one module made of a shared prelude (frame
//! uniform, bone palette, per-draw uniform, lighting helpers) and a body.
//! The same module serves the occlusion and the color pass; silhouettes come
//! from the pipeline's blend state and alpha testing reads `draw.params.x`.

use wgpu::VertexBufferLayout;

use crate::compositor::SceneDraw;
use crate::vertex_format::{
    INSTANCE_LAYOUT, LEAF_VERTEX_LAYOUT, TERRAIN_VERTEX_LAYOUT, TRUNK_VERTEX_LAYOUT,
};

const PRELUDE: &str = r#"
struct FrameUniform {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    view_proj: mat4x4<f32>,
    inv_view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    sun_dir: vec4<f32>,
    sun_color: vec4<f32>,
    sky_zenith: vec4<f32>,
    sky_horizon: vec4<f32>,
    fog_color: vec4<f32>,
    fog_params: vec4<f32>,
};

struct DrawUniform {
    tint: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> frame: FrameUniform;
@group(0) @binding(1) var<storage, read> palette: array<mat4x4<f32>>;
@group(1) @binding(0) var<uniform> draw: DrawUniform;

fn sky_color(dir: vec3<f32>) -> vec3<f32> {
    let up = clamp(dir.y, 0.0, 1.0);
    let above = mix(frame.sky_horizon.rgb, frame.sky_zenith.rgb, pow(up, 0.6));
    let below = mix(frame.sky_horizon.rgb, frame.fog_color.rgb, clamp(-dir.y * 4.0, 0.0, 1.0));
    return select(above, below, dir.y < 0.0);
}

fn sun_light(normal: vec3<f32>) -> vec3<f32> {
    let n_dot_l = max(dot(normalize(normal), frame.sun_dir.xyz), 0.0);
    return frame.sky_zenith.rgb * 0.35 + frame.sun_color.rgb * n_dot_l;
}

fn apply_fog(color: vec3<f32>, world_pos: vec3<f32>) -> vec3<f32> {
    let dist = distance(world_pos, frame.camera_pos.xyz);
    let span = max(frame.fog_params.y - frame.fog_params.x, 0.001);
    let f = clamp((dist - frame.fog_params.x) / span, 0.0, 1.0);
    return mix(color, frame.fog_color.rgb, f);
}

struct InstanceInput {
    @location(8) world0: vec4<f32>,
    @location(9) world1: vec4<f32>,
    @location(10) world2: vec4<f32>,
    @location(11) world3: vec4<f32>,
    @location(12) palette_offset: u32,
};

fn instance_world(inst: InstanceInput) -> mat4x4<f32> {
    return mat4x4<f32>(inst.world0, inst.world1, inst.world2, inst.world3);
}

struct SurfaceOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};
"#;

const SKY_BODY: &str = r#"
struct SkyOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

// Full-screen triangle on the far plane.
@vertex
fn vs_sky(@builtin(vertex_index) idx: u32) -> SkyOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    let ndc = uv * 2.0 - 1.0;
    var out: SkyOutput;
    out.position = vec4<f32>(ndc, 0.0, 1.0);
    out.ndc = ndc;
    return out;
}

@fragment
fn fs_sky(in: SkyOutput) -> @location(0) vec4<f32> {
    let far = frame.inv_view_proj * vec4<f32>(in.ndc, 0.0, 1.0);
    let near = frame.inv_view_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let dir = normalize(far.xyz / far.w - near.xyz / near.w);
    return vec4<f32>(sky_color(dir) * draw.tint.rgb, 1.0);
}
"#;

const SUN_BODY: &str = r#"
struct SunOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) local: vec2<f32>,
};

const HALO_SCALE: f32 = 4.0;

// Camera-facing quad around the sun direction, pinned to the far plane.
@vertex
fn vs_sun(@builtin(vertex_index) idx: u32) -> SunOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[idx];
    let centre = (frame.view * vec4<f32>(frame.sun_dir.xyz, 0.0)).xyz;
    let size = frame.sun_dir.w * HALO_SCALE;
    var clip = frame.proj * vec4<f32>(centre + vec3<f32>(corner * size, 0.0), 0.0);
    clip.z = 0.0;
    var out: SunOutput;
    out.position = clip;
    out.local = corner;
    return out;
}

@fragment
fn fs_sun(in: SunOutput) -> @location(0) vec4<f32> {
    let d = length(in.local);
    let core_edge = 1.0 / HALO_SCALE;
    let core = 1.0 - smoothstep(core_edge * 0.8, core_edge, d);
    let halo = pow(max(1.0 - d, 0.0), 3.0) * 0.6;
    let intensity = min(core + halo, 1.0);
    return vec4<f32>(frame.sun_color.rgb * intensity * draw.tint.rgb, intensity);
}
"#;

const TERRAIN_BODY: &str = r#"
struct TerrainInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_terrain(v: TerrainInput) -> SurfaceOutput {
    var out: SurfaceOutput;
    out.position = frame.view_proj * vec4<f32>(v.position, 1.0);
    out.world_pos = v.position;
    out.normal = v.normal;
    out.uv = v.uv;
    return out;
}

@fragment
fn fs_terrain(in: SurfaceOutput) -> @location(0) vec4<f32> {
    let cell = floor(in.uv * 4.0);
    let n = fract(sin(dot(cell, vec2<f32>(12.9898, 78.233))) * 43758.5453);
    let albedo = mix(vec3<f32>(0.23, 0.36, 0.14), vec3<f32>(0.31, 0.42, 0.18), n);
    let lit = albedo * sun_light(in.normal);
    return vec4<f32>(apply_fog(lit, in.world_pos) * draw.tint.rgb, 1.0);
}
"#;

const TRUNK_BODY: &str = r#"
struct TrunkInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) bone: u32,
};

@vertex
fn vs_trunk(v: TrunkInput, inst: InstanceInput) -> SurfaceOutput {
    let model = instance_world(inst) * palette[inst.palette_offset + v.bone];
    let world_pos = model * vec4<f32>(v.position, 1.0);
    var out: SurfaceOutput;
    out.position = frame.view_proj * world_pos;
    out.world_pos = world_pos.xyz;
    out.normal = normalize((model * vec4<f32>(v.normal, 0.0)).xyz);
    out.uv = v.uv;
    return out;
}

@fragment
fn fs_trunk(in: SurfaceOutput) -> @location(0) vec4<f32> {
    let grain = 0.85 + 0.15 * sin(in.uv.y * 40.0 + sin(in.uv.x * 12.0) * 2.0);
    let albedo = vec3<f32>(0.30, 0.22, 0.15) * grain;
    let lit = albedo * sun_light(in.normal);
    return vec4<f32>(apply_fog(lit, in.world_pos) * draw.tint.rgb, 1.0);
}
"#;

const LEAF_BODY: &str = r#"
struct LeafInput {
    @location(0) position: vec3<f32>,
    @location(1) texcoord: vec2<f32>,
    @location(2) offset: vec2<f32>,
    @location(3) color: vec4<f32>,
    @location(4) bone: vec2<i32>,
    @location(5) branch_normal: vec3<f32>,
};

struct LeafOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) texcoord: vec2<f32>,
    @location(3) color: vec4<f32>,
};

// The centre is skinned, the corner offset is added in view space.
@vertex
fn vs_leaf(v: LeafInput, inst: InstanceInput) -> LeafOutput {
    let world = instance_world(inst);
    let model = world * palette[inst.palette_offset + u32(v.bone.x)];
    let centre = model * vec4<f32>(v.position, 1.0);
    let scale = length(world[0].xyz);
    let view_pos = frame.view * centre + vec4<f32>(v.offset * scale, 0.0, 0.0);
    var out: LeafOutput;
    out.position = frame.proj * view_pos;
    out.world_pos = centre.xyz;
    out.normal = normalize((model * vec4<f32>(v.branch_normal, 0.0)).xyz);
    out.texcoord = v.texcoord;
    out.color = v.color;
    return out;
}

@fragment
fn fs_leaf(in: LeafOutput) -> @location(0) vec4<f32> {
    let d = length(in.texcoord * 2.0 - 1.0);
    let alpha = in.color.a * (1.0 - smoothstep(0.75, 1.0, d));
    if alpha < draw.params.x {
        discard;
    }
    let lit = in.color.rgb * sun_light(in.normal);
    return vec4<f32>(apply_fog(lit, in.world_pos) * draw.tint.rgb, alpha);
}
"#;

static TERRAIN_BUFFERS: [VertexBufferLayout<'static>; 1] = [TERRAIN_VERTEX_LAYOUT];
static TRUNK_BUFFERS: [VertexBufferLayout<'static>; 2] = [TRUNK_VERTEX_LAYOUT, INSTANCE_LAYOUT];
static LEAF_BUFFERS: [VertexBufferLayout<'static>; 2] = [LEAF_VERTEX_LAYOUT, INSTANCE_LAYOUT];

/// Shader source and vertex input of one [`SceneDraw`].
pub struct SceneShader {
    pub source: String,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub buffers: &'static [VertexBufferLayout<'static>],
    /// Vertices per draw for buffer-less draws.
    pub procedural_vertices: u32,
}

pub fn scene_shader(draw: SceneDraw) -> SceneShader {
    match draw {
        SceneDraw::Sky => compose(SKY_BODY, "vs_sky", "fs_sky", &[], 3),
        SceneDraw::Sun => compose(SUN_BODY, "vs_sun", "fs_sun", &[], 6),
        SceneDraw::Terrain => compose(TERRAIN_BODY, "vs_terrain", "fs_terrain", &TERRAIN_BUFFERS, 0),
        SceneDraw::TreeTrunks => compose(TRUNK_BODY, "vs_trunk", "fs_trunk", &TRUNK_BUFFERS, 0),
        SceneDraw::TreeLeaves => compose(LEAF_BODY, "vs_leaf", "fs_leaf", &LEAF_BUFFERS, 0),
    }
}

fn compose(
    body: &str,
    vertex_entry: &'static str,
    fragment_entry: &'static str,
    buffers: &'static [VertexBufferLayout<'static>],
    procedural_vertices: u32,
) -> SceneShader {
    SceneShader {
        source: format!("{PRELUDE}{body}"),
        vertex_entry,
        fragment_entry,
        buffers,
        procedural_vertices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_DRAWS: [SceneDraw; 5] = [
        SceneDraw::Sky,
        SceneDraw::Sun,
        SceneDraw::Terrain,
        SceneDraw::TreeTrunks,
        SceneDraw::TreeLeaves,
    ];

    #[test]
    fn test_every_draw_defines_its_entry_points() {
        for draw in ALL_DRAWS {
            let shader = scene_shader(draw);
            assert!(shader.source.contains(&format!("fn {}(", shader.vertex_entry)), "{draw:?}");
            assert!(shader.source.contains(&format!("fn {}(", shader.fragment_entry)), "{draw:?}");
        }
    }

    #[test]
    fn test_procedural_draws_have_no_buffers() {
        for draw in ALL_DRAWS {
            let shader = scene_shader(draw);
            assert_eq!(shader.buffers.is_empty(), shader.procedural_vertices > 0, "{draw:?}");
        }
    }

    #[test]
    fn test_tree_draws_are_instanced() {
        for draw in [SceneDraw::TreeTrunks, SceneDraw::TreeLeaves] {
            let shader = scene_shader(draw);
            assert_eq!(shader.buffers.len(), 2);
            assert_eq!(shader.buffers[1].step_mode, wgpu::VertexStepMode::Instance);
            assert!(shader.source.contains("palette[inst.palette_offset"));
        }
    }

    #[test]
    fn test_leaves_alpha_test_against_draw_threshold() {
        let shader = scene_shader(SceneDraw::TreeLeaves);
        assert!(shader.source.contains("if alpha < draw.params.x"));
        assert!(shader.source.contains("discard;"));
    }

    #[test]
    fn test_sun_is_pinned_to_far_plane() {
        assert!(scene_shader(SceneDraw::Sun).source.contains("clip.z = 0.0;"));
    }
}
