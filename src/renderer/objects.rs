// renderer/objects.rs
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::{DeviceExt, DrawIndirectArgs};

use crate::camera::BoundingBox;
use crate::error::{RenderError, Result};
use crate::renderer::bindings::BindingDescriptor;

/// Upper bound on triangles in one meshlet; every indirect draw emits this
/// many triangles per meshlet instance and the shader discards the excess.
pub const MAX_MESHLET_TRIANGLES: u32 = 124;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, Default, PartialEq)]
pub struct GpuMeshlet {
    pub bounds: [f32; 4], // bounding sphere: center xyz + radius
    pub first_index: u32,
    pub triangle_count: u32,
    pub _padding: [u32; 2], // 32 byte stride
}

impl GpuMeshlet {
    pub fn new(first_index: u32, triangle_count: u32, center: [f32; 3], radius: f32) -> Self {
        Self {
            bounds: [center[0], center[1], center[2], radius],
            first_index,
            triangle_count,
            _padding: [0; 2],
        }
    }

    pub fn radius(&self) -> f32 {
        self.bounds[3]
    }
}

/// One entry of the drawn meshlet list: which instance, which meshlet.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, Default, PartialEq, Eq)]
pub struct DrawnMeshlet {
    pub instance_id: u32,
    pub meshlet_id: u32,
}

/// CPU-side mesh data an object is created from.
#[derive(Debug, Clone, Default)]
pub struct MeshletMeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub meshlets: Vec<GpuMeshlet>,
}

impl MeshletMeshData {
    pub fn validate(&self, object: &str) -> Result<()> {
        let invalid = |reason: String| RenderError::InvalidMeshData {
            object: object.to_string(),
            reason,
        };

        let vertex_count = self.positions.len();
        if self.normals.len() != vertex_count || self.uvs.len() != vertex_count {
            return Err(invalid(format!(
                "{} positions, {} normals, {} uvs",
                vertex_count,
                self.normals.len(),
                self.uvs.len()
            )));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(invalid(format!(
                "index {index} out of range for {vertex_count} vertices"
            )));
        }
        for (id, meshlet) in self.meshlets.iter().enumerate() {
            if meshlet.triangle_count > MAX_MESHLET_TRIANGLES {
                return Err(invalid(format!(
                    "meshlet {id} has {} triangles (max {MAX_MESHLET_TRIANGLES})",
                    meshlet.triangle_count
                )));
            }
            let end = meshlet.first_index as usize + meshlet.triangle_count as usize * 3;
            if end > self.indices.len() {
                return Err(invalid(format!(
                    "meshlet {id} reads indices up to {end}, buffer has {}",
                    self.indices.len()
                )));
            }
        }
        Ok(())
    }

    pub fn bounds(&self) -> BoundingBox {
        let mut min = glam::Vec3::splat(f32::MAX);
        let mut max = glam::Vec3::splat(f32::MIN);
        for p in &self.positions {
            let p = glam::Vec3::from_array(*p);
            min = min.min(p);
            max = max.max(p);
        }
        if self.positions.is_empty() {
            min = glam::Vec3::ZERO;
            max = glam::Vec3::ZERO;
        }
        BoundingBox::new(min, max)
    }
}

/// Visible-meshlet output of the culling stage for one object.
///
/// Normally written on the GPU in the same frame; the CPU writers exist for
/// hosts that run without culling.
pub struct DrawnMeshletList {
    pub ids: wgpu::Buffer,
    pub args: wgpu::Buffer,
    capacity: u32,
}

impl DrawnMeshletList {
    fn new(device: &wgpu::Device, label: &str, capacity: u32) -> Self {
        // storage bindings may not be empty
        let size = (capacity.max(1) as usize * std::mem::size_of::<DrawnMeshlet>()) as u64;
        let ids = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}-drawnMeshletIds")),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let args = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-drawnMeshletArgs")),
            contents: Self::draw_args(0).as_bytes(),
            usage: wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            ids,
            args,
            capacity,
        }
    }

    /// Indirect arguments for `drawn` meshlets: one instance per meshlet.
    pub fn draw_args(drawn: u32) -> DrawIndirectArgs {
        DrawIndirectArgs {
            vertex_count: MAX_MESHLET_TRIANGLES * 3,
            instance_count: drawn,
            first_vertex: 0,
            first_instance: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Uploads `drawn` and the matching indirect arguments.
    ///
    /// Entries past the capacity are dropped.
    pub fn write(&self, queue: &wgpu::Queue, drawn: &[DrawnMeshlet]) -> u32 {
        let count = drawn.len().min(self.capacity as usize);
        if count < drawn.len() {
            log::warn!(
                "Drawn meshlet list overflow: {} entries, capacity {}",
                drawn.len(),
                self.capacity
            );
        }
        if count > 0 {
            queue.write_buffer(&self.ids, 0, bytemuck::cast_slice(&drawn[..count]));
        }
        let count = u32::try_from(count).unwrap_or(self.capacity);
        queue.write_buffer(&self.args, 0, Self::draw_args(count).as_bytes());
        count
    }
}

/// Converts an element count into the `u32` the GPU side indexes with.
fn count_u32(object: &str, what: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| RenderError::InvalidMeshData {
        object: object.to_string(),
        reason: format!("{len} {what} do not fit a u32 index"),
    })
}

/// Size of the drawn list that can hold every meshlet of every instance.
pub fn drawn_capacity(object: &str, meshlet_count: u32, instance_count: u32) -> Result<u32> {
    meshlet_count
        .checked_mul(instance_count.max(1))
        .ok_or_else(|| RenderError::InvalidMeshData {
            object: object.to_string(),
            reason: format!(
                "{meshlet_count} meshlets x {instance_count} instances overflow the drawn list"
            ),
        })
}

/// Every meshlet of every instance, in instance-major order.
pub fn all_meshlets(instance_count: u32, meshlet_count: u32) -> Vec<DrawnMeshlet> {
    (0..instance_count)
        .flat_map(|instance_id| {
            (0..meshlet_count).map(move |meshlet_id| DrawnMeshlet {
                instance_id,
                meshlet_id,
            })
        })
        .collect()
}

/// GPU buffers of one mesh asset. Sizes are fixed at creation.
pub struct MeshletObjectBuffers {
    vertex_positions: wgpu::Buffer,
    vertex_normals: wgpu::Buffer,
    vertex_uvs: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    meshlets: wgpu::Buffer,
    pub drawn: DrawnMeshletList,
    meshlet_count: u32,
    vertex_count: u32,
}

impl MeshletObjectBuffers {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        mesh: &MeshletMeshData,
        instance_count: u32,
    ) -> Result<Self> {
        mesh.validate(label)?;

        let storage = |suffix: &str, contents: &[u8]| {
            // pad so that empty meshes still produce a bindable buffer
            let padded;
            let contents = if contents.is_empty() {
                padded = [0u8; 16];
                &padded[..]
            } else {
                contents
            };
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}-{suffix}")),
                contents,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
        };

        let meshlet_count = count_u32(label, "meshlets", mesh.meshlets.len())?;
        let vertex_count = count_u32(label, "vertices", mesh.positions.len())?;
        let capacity = drawn_capacity(label, meshlet_count, instance_count)?;
        Ok(Self {
            vertex_positions: storage("vertexPositions", bytemuck::cast_slice(&mesh.positions)),
            vertex_normals: storage("vertexNormals", bytemuck::cast_slice(&mesh.normals)),
            vertex_uvs: storage("vertexUV", bytemuck::cast_slice(&mesh.uvs)),
            index_buffer: storage("indexBuffer", bytemuck::cast_slice(&mesh.indices)),
            meshlets: storage("meshlets", bytemuck::cast_slice(&mesh.meshlets)),
            drawn: DrawnMeshletList::new(device, label, capacity),
            meshlet_count,
            vertex_count,
        })
    }

    pub fn meshlet_count(&self) -> u32 {
        self.meshlet_count
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn bind_meshlet_data(&self, binding: u32) -> BindingDescriptor<'_> {
        BindingDescriptor::buffer(binding, &self.meshlets)
    }

    pub fn bind_drawn_meshlet_ids(&self, binding: u32) -> BindingDescriptor<'_> {
        BindingDescriptor::buffer(binding, &self.drawn.ids)
    }

    pub fn bind_vertex_positions(&self, binding: u32) -> BindingDescriptor<'_> {
        BindingDescriptor::buffer(binding, &self.vertex_positions)
    }

    pub fn bind_vertex_normals(&self, binding: u32) -> BindingDescriptor<'_> {
        BindingDescriptor::buffer(binding, &self.vertex_normals)
    }

    pub fn bind_vertex_uvs(&self, binding: u32) -> BindingDescriptor<'_> {
        BindingDescriptor::buffer(binding, &self.vertex_uvs)
    }

    pub fn bind_index_buffer(&self, binding: u32) -> BindingDescriptor<'_> {
        BindingDescriptor::buffer(binding, &self.index_buffer)
    }

    /// Records the indirect draw; counts come from the drawn meshlet list.
    pub fn draw_meshlets_indirect(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.draw_indirect(&self.drawn.args, 0);
    }
}

/// A renderable mesh asset plus its instances.
pub struct MeshletObject {
    pub name: String,
    pub buffers: MeshletObjectBuffers,
    pub bounds: BoundingBox,
    /// Scene key of the diffuse texture, resolved through `SceneResources`.
    pub diffuse_texture: Option<String>,
    instance_transforms: wgpu::Buffer,
    instance_count: u32,
}

impl MeshletObject {
    pub fn new(
        device: &wgpu::Device,
        name: impl Into<String>,
        mesh: &MeshletMeshData,
        instances: &[Mat4],
        diffuse_texture: Option<String>,
    ) -> Result<Self> {
        let name = name.into();
        if instances.is_empty() {
            return Err(RenderError::InvalidMeshData {
                object: name,
                reason: "object has no instances".into(),
            });
        }

        let instance_count = count_u32(&name, "instances", instances.len())?;
        let buffers = MeshletObjectBuffers::new(device, &name, mesh, instance_count)?;
        let transforms: Vec<[[f32; 4]; 4]> =
            instances.iter().map(|m| m.to_cols_array_2d()).collect();
        let instance_transforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name}-instancesTransforms")),
            contents: bytemuck::cast_slice(&transforms),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            bounds: mesh.bounds(),
            name,
            buffers,
            diffuse_texture,
            instance_transforms,
            instance_count,
        })
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn bind_instance_transforms(&self, binding: u32) -> BindingDescriptor<'_> {
        BindingDescriptor::buffer(binding, &self.instance_transforms)
    }

    /// Marks every meshlet of every instance as drawn.
    pub fn draw_all_meshlets(&self, queue: &wgpu::Queue) -> u32 {
        let drawn = all_meshlets(self.instance_count, self.buffers.meshlet_count());
        self.buffers.drawn.write(queue, &drawn)
    }
}
