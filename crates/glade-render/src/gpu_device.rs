//! wgpu implementation of [`RenderDevice`].
//!
//! [`GpuScene`] owns everything that outlives a frame: pipelines built from
//! [`SceneCompositor::pipeline_plan`], mesh and instance buffers, the bone
//! palette and the render targets. [`GpuFrame`] borrows it for one command
//! encoder and records each compositor operation as its own render pass.

use std::collections::HashMap;

use glam::{Mat4, Vec4};
use glade_foliage::Forest;
use glade_terrain::TerrainMesh;
use wgpu::util::DeviceExt;

use crate::buffer::{BufferAllocator, MeshBuffer};
use crate::camera::FrameUniform;
use crate::compositor::{PlannedOp, RenderDevice, SceneCompositor, SceneDraw};
use crate::error::CompositorError;
use crate::fullscreen::{
    BLIT_SHADER_SOURCE, DRAW_SLOTS_PER_FRAME, DRAW_UNIFORM_STRIDE, DrawUniform,
    create_draw_bind_group_layout, create_fullscreen_pipeline, create_linear_sampler,
    create_texture_bind_group_layout, run_fullscreen_pass,
};
use crate::pass::{BlendMode, DEPTH_CLEAR_VALUE, PassDescriptor};
use crate::scatter::{LightScatterFilter, ScatterParams};
use crate::shaders::{SceneShader, scene_shader};
use crate::target::{RenderTargets, TargetId, TargetLayout};
use crate::vertex_format::InstanceRaw;

type PaletteEntry = [[f32; 4]; 4];

struct ScenePipeline {
    pipeline: wgpu::RenderPipeline,
    procedural_vertices: u32,
}

/// Trunk and leaf meshes of one tree variant plus its instances.
struct TreeVariantBuffers {
    trunk: MeshBuffer,
    leaves: MeshBuffer,
    instances: wgpu::Buffer,
    instance_capacity: usize,
    instance_count: u32,
}

/// GPU resources for the compositor's scene.
pub struct GpuScene {
    format: wgpu::TextureFormat,
    frame_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    frame_buffer: wgpu::Buffer,
    palette_buffer: wgpu::Buffer,
    palette_capacity: usize,
    frame_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    pipelines: HashMap<(SceneDraw, PassDescriptor), ScenePipeline>,
    blits: HashMap<BlendMode, wgpu::RenderPipeline>,
    scatter: LightScatterFilter,
    /// `None` once released.
    targets: Option<RenderTargets>,
    terrain: MeshBuffer,
    trees: Vec<TreeVariantBuffers>,
}

impl GpuScene {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        layout: TargetLayout,
        terrain: &TerrainMesh,
        forest: &Forest,
    ) -> Self {
        let frame_bgl = create_frame_bind_group_layout(device);
        let draw_bgl = create_draw_bind_group_layout(device);
        let texture_bgl = create_texture_bind_group_layout(device, "target-texture-bgl");
        let sampler = create_linear_sampler(device, "target-sampler");

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame-uniform"),
            contents: bytemuck::bytes_of(&FrameUniform::new(
                &Default::default(),
                &Default::default(),
                0.0,
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let palette_capacity = forest
            .skeletons()
            .iter()
            .map(|s| s.len())
            .sum::<usize>()
            .max(1);
        let palette_buffer = create_palette_buffer(device, palette_capacity);
        let frame_bind_group =
            create_frame_bind_group(device, &frame_bgl, &frame_buffer, &palette_buffer);

        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw-uniforms"),
            size: DRAW_UNIFORM_STRIDE * DRAW_SLOTS_PER_FRAME,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw-uniform-bg"),
            layout: &draw_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &draw_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[&frame_bgl, &draw_bgl],
            immediate_size: 0,
        });
        let blit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit-pipeline-layout"),
            bind_group_layouts: &[&draw_bgl, &texture_bgl],
            immediate_size: 0,
        });
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit-shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER_SOURCE.into()),
        });

        let mut modules: HashMap<SceneDraw, (SceneShader, wgpu::ShaderModule)> = HashMap::new();
        let mut pipelines = HashMap::new();
        let mut blits = HashMap::new();
        for op in SceneCompositor::pipeline_plan() {
            match op {
                PlannedOp::Draw(draw, pass) => {
                    let (shader, module) = modules.entry(draw).or_insert_with(|| {
                        let shader = scene_shader(draw);
                        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                            label: Some(&format!("{draw:?}-shader")),
                            source: wgpu::ShaderSource::Wgsl(shader.source.as_str().into()),
                        });
                        (shader, module)
                    });
                    let pipeline =
                        create_scene_pipeline(device, &scene_layout, shader, module, draw, &pass, format);
                    pipelines.insert(
                        (draw, pass),
                        ScenePipeline {
                            pipeline,
                            procedural_vertices: shader.procedural_vertices,
                        },
                    );
                }
                PlannedOp::Fullscreen(blend) => {
                    let pipeline = create_fullscreen_pipeline(
                        device,
                        &blit_shader,
                        &blit_layout,
                        "fs_blit",
                        format,
                        blend.to_wgpu(),
                        &format!("blit-{blend:?}"),
                    );
                    blits.insert(blend, pipeline);
                }
                PlannedOp::Scatter => {}
            }
        }
        let scatter = LightScatterFilter::new(device, &texture_bgl, format);
        log::info!(
            "Built {} scene pipelines and {} blit pipelines",
            pipelines.len(),
            blits.len()
        );

        let allocator = BufferAllocator::new(device);
        let terrain_buffer = allocator.create_mesh(
            "terrain",
            bytemuck::cast_slice(&terrain.vertices),
            &terrain.indices,
        );
        let trees = forest
            .variants()
            .iter()
            .enumerate()
            .map(|(variant, model)| {
                let instance_capacity = forest.instances_of(variant).count();
                TreeVariantBuffers {
                    trunk: allocator.create_mesh(
                        &format!("trunk-{variant}"),
                        bytemuck::cast_slice(&model.trunk.vertices),
                        &model.trunk.indices,
                    ),
                    leaves: allocator.create_mesh(
                        &format!("leaves-{variant}"),
                        bytemuck::cast_slice(&model.leaves.vertices),
                        &model.leaves.indices,
                    ),
                    instances: allocator
                        .create_instance_buffer(&format!("trees-{variant}"), instance_capacity),
                    instance_capacity,
                    instance_count: 0,
                }
            })
            .collect();

        let targets = RenderTargets::new(device, &texture_bgl, &sampler, format, layout);

        Self {
            format,
            frame_bgl,
            texture_bgl,
            sampler,
            frame_buffer,
            palette_buffer,
            palette_capacity,
            frame_bind_group,
            draw_buffer,
            draw_bind_group,
            pipelines,
            blits,
            scatter,
            targets: Some(targets),
            terrain: terrain_buffer,
            trees,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Current target layout, or `None` after release.
    pub fn layout(&self) -> Option<TargetLayout> {
        self.targets.as_ref().map(RenderTargets::layout)
    }

    /// Upload the frame uniform, every tree's bone palette and the per-variant
    /// instance lists.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameUniform,
        forest: &Forest,
    ) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(frame));

        let mut palette: Vec<Mat4> = Vec::new();
        let groups = forest.write_palettes(&mut palette);
        if palette.len() > self.palette_capacity {
            self.palette_capacity = palette.len().next_power_of_two();
            self.palette_buffer = create_palette_buffer(device, self.palette_capacity);
            self.frame_bind_group = create_frame_bind_group(
                device,
                &self.frame_bgl,
                &self.frame_buffer,
                &self.palette_buffer,
            );
            log::debug!("Grew bone palette to {} matrices", self.palette_capacity);
        }
        let raw: Vec<PaletteEntry> = palette.iter().map(Mat4::to_cols_array_2d).collect();
        if !raw.is_empty() {
            queue.write_buffer(&self.palette_buffer, 0, bytemuck::cast_slice(&raw));
        }

        let instances = forest.instances();
        for (buffers, group) in self.trees.iter_mut().zip(&groups) {
            let raw: Vec<InstanceRaw> = group
                .iter()
                .take(buffers.instance_capacity)
                .map(|&(index, offset)| InstanceRaw::new(instances[index].world, offset))
                .collect();
            if group.len() > buffers.instance_capacity {
                log::warn!(
                    "Dropping {} tree instances over buffer capacity",
                    group.len() - buffers.instance_capacity
                );
            }
            if !raw.is_empty() {
                queue.write_buffer(&buffers.instances, 0, bytemuck::cast_slice(&raw));
            }
            buffers.instance_count = raw.len() as u32;
        }
    }

    /// Reallocate the targets for a new backbuffer size. Between frames only.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<bool, CompositorError> {
        let targets = self.targets.as_mut().ok_or(CompositorError::TargetsReleased)?;
        Ok(targets.resize(device, &self.texture_bgl, &self.sampler, width, height))
    }

    /// Free the render targets. Later frames fail with `TargetsReleased`.
    pub fn release(&mut self) {
        if self.targets.take().is_some() {
            log::debug!("Released render targets");
        }
    }

    /// Start recording one frame into `encoder`, presenting to `backbuffer`.
    pub fn frame<'a>(
        &'a self,
        queue: &'a wgpu::Queue,
        encoder: &'a mut wgpu::CommandEncoder,
        backbuffer: &'a wgpu::TextureView,
    ) -> GpuFrame<'a> {
        GpuFrame {
            scene: self,
            queue,
            encoder,
            backbuffer,
            bound: TargetId::Backbuffer,
            next_slot: 0,
        }
    }
}

/// One frame's command recording.
pub struct GpuFrame<'a> {
    scene: &'a GpuScene,
    queue: &'a wgpu::Queue,
    encoder: &'a mut wgpu::CommandEncoder,
    backbuffer: &'a wgpu::TextureView,
    bound: TargetId,
    next_slot: u64,
}

impl<'a> GpuFrame<'a> {
    /// Draw uniform slots used so far.
    pub fn slots_used(&self) -> u64 {
        self.next_slot
    }

    fn targets(&self) -> Result<&'a RenderTargets, CompositorError> {
        self.scene
            .targets
            .as_ref()
            .ok_or(CompositorError::TargetsReleased)
    }

    fn color_view(&self, target: TargetId) -> Result<&'a wgpu::TextureView, CompositorError> {
        match target {
            TargetId::Backbuffer => {
                self.targets()?;
                Ok(self.backbuffer)
            }
            TargetId::Scene => Ok(&self.targets()?.scene.view),
            TargetId::Scatter => Ok(&self.targets()?.scatter.view),
        }
    }

    fn depth_view(&self, target: TargetId) -> Result<Option<&'a wgpu::TextureView>, CompositorError> {
        if target.has_depth() {
            Ok(Some(&self.targets()?.depth.view))
        } else {
            Ok(None)
        }
    }

    fn sample_source(&self, source: TargetId) -> Result<&'a wgpu::BindGroup, CompositorError> {
        if source == self.bound {
            return Err(CompositorError::SourceIsBound(source));
        }
        match source {
            TargetId::Backbuffer => Err(CompositorError::Device(
                "the backbuffer cannot be sampled".to_string(),
            )),
            TargetId::Scene => Ok(&self.targets()?.scene.bind_group),
            TargetId::Scatter => Ok(&self.targets()?.scatter.bind_group),
        }
    }

    /// Write `uniform` into the next free slot and return its dynamic offset.
    fn push_draw_uniform(&mut self, uniform: DrawUniform) -> Result<u32, CompositorError> {
        if self.next_slot >= DRAW_SLOTS_PER_FRAME {
            return Err(CompositorError::Device(format!(
                "more than {DRAW_SLOTS_PER_FRAME} draws in one frame"
            )));
        }
        let offset = self.next_slot * DRAW_UNIFORM_STRIDE;
        self.next_slot += 1;
        self.queue
            .write_buffer(&self.scene.draw_buffer, offset, bytemuck::bytes_of(&uniform));
        Ok(offset as u32)
    }
}

impl RenderDevice for GpuFrame<'_> {
    fn bind_target(&mut self, target: TargetId) -> Result<(), CompositorError> {
        self.targets()?;
        self.bound = target;
        Ok(())
    }

    fn unbind_target(&mut self) {
        self.bound = TargetId::Backbuffer;
    }

    fn bound_target(&self) -> TargetId {
        self.bound
    }

    fn clear(&mut self, color: Vec4) -> Result<(), CompositorError> {
        let view = self.color_view(self.bound)?;
        let depth = self.depth_view(self.bound)?;
        let clear = wgpu::Color {
            r: f64::from(color.x),
            g: f64::from(color.y),
            b: f64::from(color.z),
            a: f64::from(color.w),
        };
        begin_pass(
            self.encoder,
            view,
            depth,
            wgpu::LoadOp::Clear(clear),
            wgpu::LoadOp::Clear(DEPTH_CLEAR_VALUE),
            "clear",
        );
        Ok(())
    }

    fn draw(&mut self, draw: SceneDraw, pass: &PassDescriptor) -> Result<(), CompositorError> {
        let view = self.color_view(self.bound)?;
        let Some(depth) = self.depth_view(self.bound)? else {
            return Err(CompositorError::Device(format!(
                "{draw:?} needs a depth attachment, {:?} has none",
                self.bound
            )));
        };
        let scene = self.scene;
        let pipeline = scene
            .pipelines
            .get(&(draw, *pass))
            .ok_or(CompositorError::MissingPipeline { draw, pass: *pass })?;
        let offset = self.push_draw_uniform(DrawUniform::new(Vec4::ONE, pass.alpha_threshold()))?;

        let mut rpass = begin_pass(
            self.encoder,
            view,
            Some(depth),
            wgpu::LoadOp::Load,
            wgpu::LoadOp::Load,
            &format!("{draw:?}"),
        );
        rpass.set_pipeline(&pipeline.pipeline);
        rpass.set_bind_group(0, &scene.frame_bind_group, &[]);
        rpass.set_bind_group(1, &scene.draw_bind_group, &[offset]);

        match draw {
            SceneDraw::Sky | SceneDraw::Sun => {
                rpass.draw(0..pipeline.procedural_vertices, 0..1);
            }
            SceneDraw::Terrain => {
                if !scene.terrain.is_empty() {
                    scene.terrain.bind(&mut rpass);
                    scene.terrain.draw(&mut rpass);
                }
            }
            SceneDraw::TreeTrunks | SceneDraw::TreeLeaves => {
                for tree in &scene.trees {
                    let mesh = if draw == SceneDraw::TreeTrunks {
                        &tree.trunk
                    } else {
                        &tree.leaves
                    };
                    if mesh.is_empty() || tree.instance_count == 0 {
                        continue;
                    }
                    mesh.bind(&mut rpass);
                    rpass.set_vertex_buffer(1, tree.instances.slice(..));
                    mesh.draw_instanced(&mut rpass, tree.instance_count);
                }
            }
        }
        Ok(())
    }

    fn draw_fullscreen(
        &mut self,
        source: TargetId,
        blend: BlendMode,
        tint: Vec4,
    ) -> Result<(), CompositorError> {
        let view = self.color_view(self.bound)?;
        let source_group = self.sample_source(source)?;
        let scene = self.scene;
        let pipeline = scene
            .blits
            .get(&blend)
            .ok_or_else(|| CompositorError::Device(format!("no blit pipeline for {blend:?}")))?;
        let offsets = [self.push_draw_uniform(DrawUniform::new(tint, 0.0))?];
        let groups: [(&wgpu::BindGroup, &[u32]); 2] =
            [(&scene.draw_bind_group, &offsets), (source_group, &[])];
        run_fullscreen_pass(
            self.encoder,
            pipeline,
            &groups,
            view,
            wgpu::LoadOp::Load,
            "fullscreen-blit",
        );
        Ok(())
    }

    fn light_scatter(
        &mut self,
        source: TargetId,
        params: &ScatterParams,
    ) -> Result<(), CompositorError> {
        let view = self.color_view(self.bound)?;
        let source_group = self.sample_source(source)?;
        self.scene
            .scatter
            .apply(self.queue, self.encoder, source_group, view, params)
    }
}

fn create_frame_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("frame-bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniform>() as u64,
                    ),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<PaletteEntry>() as u64,
                    ),
                },
                count: None,
            },
        ],
    })
}

fn create_palette_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("bone-palette"),
        size: (capacity.max(1) * std::mem::size_of::<PaletteEntry>()) as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    frame: &wgpu::Buffer,
    palette: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame-bg"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: palette.as_entire_binding(),
            },
        ],
    })
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &SceneShader,
    module: &wgpu::ShaderModule,
    draw: SceneDraw,
    pass: &PassDescriptor,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{draw:?}-{:?}", pass.blend)),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(shader.vertex_entry),
            buffers: shader.buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: pass.primitive_state(),
        depth_stencil: Some(pass.depth_stencil_state()),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(shader.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: pass.blend.to_wgpu(),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    color: &wgpu::TextureView,
    depth: Option<&wgpu::TextureView>,
    color_load: wgpu::LoadOp<wgpu::Color>,
    depth_load: wgpu::LoadOp<f32>,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: color_load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: depth_load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{CompositorSettings, FrameInputs};
    use glam::Vec2;
    use glade_foliage::{ForestParams, TreeProfile};
    use glade_terrain::{Heightmap, HeightmapParams, Terrain};

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    fn create_test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });

            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok()?;

            adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                    experimental_features: Default::default(),
                    ..Default::default()
                })
                .await
                .ok()
        })
    }

    fn small_scene() -> (TerrainMesh, Forest) {
        let map = Heightmap::generate(16, 16, &HeightmapParams::default()).unwrap();
        let terrain = Terrain::new(map, 4.0, 20.0);
        let profile = TreeProfile {
            levels: 1,
            leaves_per_bone: 2,
            ..Default::default()
        };
        let variants = profile
            .variants(2)
            .iter()
            .enumerate()
            .map(|(i, p)| p.generate(i as u64).unwrap())
            .collect();
        let params = ForestParams {
            count: 6,
            ..Default::default()
        };
        let forest = Forest::populate(&terrain, variants, &params).unwrap();
        (TerrainMesh::build(&terrain), forest)
    }

    fn backbuffer(device: &wgpu::Device, layout: TargetLayout) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("test-backbuffer"),
                size: wgpu::Extent3d {
                    width: layout.width(),
                    height: layout.height(),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    #[test]
    fn test_every_planned_draw_has_a_pipeline() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let (terrain, forest) = small_scene();
        let scene = GpuScene::new(&device, FORMAT, TargetLayout::new(64, 48, 4), &terrain, &forest);
        for op in SceneCompositor::pipeline_plan() {
            match op {
                PlannedOp::Draw(draw, pass) => {
                    assert!(scene.pipelines.contains_key(&(draw, pass)), "{draw:?} {pass:?}");
                }
                PlannedOp::Fullscreen(blend) => assert!(scene.blits.contains_key(&blend)),
                PlannedOp::Scatter => {}
            }
        }
        assert_eq!(scene.trees.len(), forest.variants().len());
    }

    #[test]
    fn test_full_frame_records_and_submits() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (terrain, forest) = small_scene();
        let layout = TargetLayout::new(64, 48, 4);
        let mut scene = GpuScene::new(&device, FORMAT, layout, &terrain, &forest);
        let uniform = FrameUniform::new(&Default::default(), &Default::default(), 0.0);
        scene.update(&device, &queue, &uniform, &forest);

        let view = backbuffer(&device, layout);
        let compositor = SceneCompositor::new(CompositorSettings::default(), layout).unwrap();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let report = {
            let mut frame = scene.frame(&queue, &mut encoder, &view);
            let inputs = FrameInputs {
                light_screen_pos: Vec2::new(0.5, 0.3),
                intensity: 0.8,
            };
            let report = compositor.render(&mut frame, &inputs).unwrap();
            assert_eq!(frame.slots_used(), 10);
            assert_eq!(frame.bound_target(), TargetId::Backbuffer);
            report
        };
        queue.submit(Some(encoder.finish()));
        assert_eq!(report.draw_calls, 11);
    }

    #[test]
    fn test_frame_after_release_fails() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (terrain, forest) = small_scene();
        let layout = TargetLayout::new(32, 32, 4);
        let mut scene = GpuScene::new(&device, FORMAT, layout, &terrain, &forest);
        scene.release();
        assert!(scene.layout().is_none());
        assert!(matches!(
            scene.resize(&device, 64, 64),
            Err(CompositorError::TargetsReleased)
        ));

        let view = backbuffer(&device, layout);
        let compositor = SceneCompositor::new(CompositorSettings::default(), layout).unwrap();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let mut frame = scene.frame(&queue, &mut encoder, &view);
        let err = compositor
            .render(&mut frame, &FrameInputs { light_screen_pos: Vec2::splat(0.5), intensity: 1.0 })
            .unwrap_err();
        assert!(matches!(err, CompositorError::TargetsReleased));
    }

    #[test]
    fn test_sampling_the_bound_target_is_rejected() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let (terrain, forest) = small_scene();
        let layout = TargetLayout::new(32, 32, 4);
        let scene = GpuScene::new(&device, FORMAT, layout, &terrain, &forest);
        let view = backbuffer(&device, layout);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let mut frame = scene.frame(&queue, &mut encoder, &view);
        frame.bind_target(TargetId::Scene).unwrap();
        let err = frame
            .draw_fullscreen(TargetId::Scene, BlendMode::Opaque, Vec4::ONE)
            .unwrap_err();
        assert!(matches!(err, CompositorError::SourceIsBound(TargetId::Scene)));
        frame.unbind_target();
        let err = frame
            .draw_fullscreen(TargetId::Backbuffer, BlendMode::Opaque, Vec4::ONE)
            .unwrap_err();
        assert!(matches!(err, CompositorError::SourceIsBound(TargetId::Backbuffer)));
    }

    #[test]
    fn test_resize_reallocates_targets() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let (terrain, forest) = small_scene();
        let mut scene = GpuScene::new(&device, FORMAT, TargetLayout::new(32, 32, 4), &terrain, &forest);
        assert!(scene.resize(&device, 80, 40).unwrap());
        assert!(!scene.resize(&device, 80, 40).unwrap());
        let layout = scene.layout().unwrap();
        assert_eq!(layout.size_of(TargetId::Scatter), (20, 10));
    }
}
