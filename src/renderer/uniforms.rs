// renderer/uniforms.rs
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::renderer::bindings::BindingDescriptor;
use crate::settings::RenderSettings;

/// Per-frame camera and viewport constants shared by every pass.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct RenderUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// width, height, 1/width, 1/height
    pub viewport: [f32; 4],
}

impl RenderUniforms {
    pub fn new() -> Self {
        Self::from_matrices(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO, (1, 1))
    }

    pub fn from_matrices(view: Mat4, proj: Mat4, camera_pos: Vec3, size: (u32, u32)) -> Self {
        let width = size.0.max(1) as f32;
        let height = size.1.max(1) as f32;
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            view_proj: (proj * view).to_cols_array_2d(),
            camera_position: camera_pos.extend(1.0).to_array(),
            viewport: [width, height, 1.0 / width, 1.0 / height],
        }
    }

    pub fn from_camera(camera: &Camera, settings: &RenderSettings, size: (u32, u32)) -> Self {
        let aspect = size.0.max(1) as f32 / size.1.max(1) as f32;
        Self::from_matrices(
            camera.view_matrix(),
            camera.projection(&settings.camera, aspect),
            camera.position(),
            size,
        )
    }
}

impl Default for RenderUniforms {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the uniform buffer; hands its binding to passes by slot index.
pub struct GlobalUniforms {
    buffer: wgpu::Buffer,
    data: RenderUniforms,
}

impl GlobalUniforms {
    pub fn new(device: &wgpu::Device) -> Self {
        let data = RenderUniforms::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("renderUniforms"),
            contents: bytemuck::bytes_of(&data),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self { buffer, data }
    }

    pub fn data(&self) -> &RenderUniforms {
        &self.data
    }

    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        camera: &Camera,
        settings: &RenderSettings,
        size: (u32, u32),
    ) {
        self.data = RenderUniforms::from_camera(camera, settings, size);
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.data));
    }

    pub fn create_binding_desc(&self, binding: u32) -> BindingDescriptor<'_> {
        BindingDescriptor::buffer(binding, &self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_uniforms_is_224_bytes() {
        // 3 * mat4x4<f32> = 192 bytes, 2 * vec4<f32> = 32 bytes
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 224);
    }

    #[test]
    fn viewport_carries_reciprocals() {
        let u = RenderUniforms::from_matrices(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO, (800, 400));
        assert_eq!(u.viewport, [800.0, 400.0, 1.0 / 800.0, 1.0 / 400.0]);
    }

    #[test]
    fn zero_size_does_not_divide_by_zero() {
        let u = RenderUniforms::from_matrices(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO, (0, 0));
        assert!(u.viewport.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn camera_position_matches_camera() {
        let settings = RenderSettings::default();
        let camera = Camera::from_settings(&settings.camera);
        let u = RenderUniforms::from_camera(&camera, &settings, (640, 480));
        assert!((u.camera_position[2] - 3.0).abs() < 1e-5);
        assert_eq!(u.camera_position[3], 1.0);
    }
}
