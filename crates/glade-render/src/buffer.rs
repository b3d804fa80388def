//! Vertex, index and instance buffers for scene meshes.

use wgpu::util::DeviceExt;

use crate::vertex_format::InstanceRaw;

/// An indexed mesh on the GPU. Indices are always `u32`.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffer {
    /// Bind vertex slot 0 and the index buffer.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Draw `instances` copies using the instance buffer bound at slot 1.
    pub fn draw_instanced(&self, render_pass: &mut wgpu::RenderPass<'_>, instances: u32) {
        render_pass.draw_indexed(0..self.index_count, 0, 0..instances);
    }

    pub fn is_empty(&self) -> bool {
        self.index_count == 0
    }
}

/// Creates mesh and instance buffers on one device.
pub struct BufferAllocator<'a> {
    device: &'a wgpu::Device,
}

impl<'a> BufferAllocator<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    pub fn create_mesh(&self, label: &str, vertices: &[u8], indices: &[u32]) -> MeshBuffer {
        MeshBuffer {
            vertex_buffer: self.create_buffer(
                &format!("{label}-vertices"),
                vertices,
                wgpu::BufferUsages::VERTEX,
            ),
            index_buffer: self.create_buffer(
                &format!("{label}-indices"),
                bytemuck::cast_slice(indices),
                wgpu::BufferUsages::INDEX,
            ),
            index_count: indices.len() as u32,
        }
    }

    /// Instance buffer with room for `capacity` instances, rewritten each frame.
    pub fn create_instance_buffer(&self, label: &str, capacity: usize) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity.max(1) * std::mem::size_of::<InstanceRaw>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_buffer(&self, label: &str, data: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        // Zero-sized buffers cannot be bound; keep one aligned word.
        let padding = [0u8; 4];
        let contents = if data.is_empty() { &padding[..] } else { data };
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: usage | wgpu::BufferUsages::COPY_DST,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_mesh_index_count_matches_input() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let allocator = BufferAllocator::new(&device);
        let mesh = allocator.create_mesh("quad", &[0u8; 128], &[0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.index_count, 6);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_empty_mesh_is_empty_but_bindable() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let allocator = BufferAllocator::new(&device);
        let mesh = allocator.create_mesh("empty", &[], &[]);
        assert!(mesh.is_empty());
        assert!(mesh.vertex_buffer.size() > 0);
    }

    #[test]
    fn test_instance_buffer_capacity() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let allocator = BufferAllocator::new(&device);
        let buffer = allocator.create_instance_buffer("trees", 10);
        assert_eq!(buffer.size(), 800);
        let empty = allocator.create_instance_buffer("none", 0);
        assert_eq!(empty.size(), 80);
    }
}
