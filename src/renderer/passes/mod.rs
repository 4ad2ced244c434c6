// renderer/passes/mod.rs
//! Geometry passes and the split of meshlets between rasterization paths.

pub mod rasterize_hw;

use glam::{Mat4, Vec3};

use crate::error::Result;
use crate::renderer::attachments::AttachmentLoad;
use crate::renderer::context::PassCtx;
use crate::renderer::objects::{DrawnMeshlet, GpuMeshlet, MeshletObject};
use crate::settings::RenderSettings;

pub use rasterize_hw::RasterizeHwPass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterPath {
    /// Fixed-function triangles through a render pipeline.
    Hardware,
    /// Compute rasterizer for meshlets too small for efficient hardware triangles.
    Software,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterizeStats {
    /// Objects that received a draw call.
    pub drawn: u32,
    /// Objects skipped because their resources were not ready.
    pub skipped: u32,
}

/// One draw contract, several implementations.
///
/// Every implementation reads the objects' drawn meshlet lists and writes
/// into the frame's shared color and depth attachments with the given load
/// op. Callers make sure each meshlet is handed to exactly one path.
pub trait MeshletRasterizer {
    fn path(&self) -> RasterPath;

    fn rasterize(
        &mut self,
        ctx: &mut PassCtx<'_>,
        objects: &[&MeshletObject],
        load: AttachmentLoad,
    ) -> Result<RasterizeStats>;
}

/// A meshlet instance with its world-space bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshletCandidate {
    pub id: DrawnMeshlet,
    pub center: Vec3,
    pub radius: f32,
}

/// World-space bounding spheres for every meshlet of every instance.
pub fn meshlet_candidates(instances: &[Mat4], meshlets: &[GpuMeshlet]) -> Vec<MeshletCandidate> {
    let mut out = Vec::with_capacity(instances.len() * meshlets.len());
    for (instance_id, transform) in instances.iter().enumerate() {
        let (scale, _, _) = transform.to_scale_rotation_translation();
        let max_scale = scale.abs().max_element();
        for (meshlet_id, meshlet) in meshlets.iter().enumerate() {
            let local = Vec3::new(meshlet.bounds[0], meshlet.bounds[1], meshlet.bounds[2]);
            out.push(MeshletCandidate {
                id: DrawnMeshlet {
                    instance_id: instance_id as u32,
                    meshlet_id: meshlet_id as u32,
                },
                center: transform.transform_point3(local),
                radius: meshlet.radius() * max_scale,
            });
        }
    }
    out
}

/// Approximate on-screen diameter in pixels of a sphere.
///
/// Infinite when the camera is inside the sphere.
pub fn projected_size(radius: f32, distance: f32, fov_y_radians: f32, viewport_height: f32) -> f32 {
    if distance <= radius {
        return f32::INFINITY;
    }
    radius * viewport_height / (distance * (fov_y_radians * 0.5).tan())
}

/// Disjoint per-frame assignment of meshlets to rasterization paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterPartition {
    pub hardware: Vec<DrawnMeshlet>,
    pub software: Vec<DrawnMeshlet>,
}

/// Threshold rule deciding which path draws a meshlet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerSplit {
    /// Projected size in pixels below which meshlets go to software.
    /// `None` routes everything to hardware.
    pub software_threshold: Option<f32>,
    pub fov_y_radians: f32,
    pub viewport_height: f32,
}

impl RasterizerSplit {
    pub fn from_settings(settings: &RenderSettings, viewport_height: u32) -> Self {
        let sw = &settings.software_rasterizer;
        let software_threshold = (sw.enabled && sw.threshold > 0.0).then_some(sw.threshold);
        Self {
            software_threshold,
            fov_y_radians: settings.camera.fov_y_radians(),
            viewport_height: viewport_height.max(1) as f32,
        }
    }

    pub fn path_for(&self, projected_size: f32) -> RasterPath {
        match self.software_threshold {
            Some(threshold) if projected_size < threshold => RasterPath::Software,
            _ => RasterPath::Hardware,
        }
    }

    /// Every candidate lands in exactly one of the two lists, order kept.
    pub fn partition(&self, camera_position: Vec3, candidates: &[MeshletCandidate]) -> RasterPartition {
        let mut out = RasterPartition::default();
        for candidate in candidates {
            let distance = candidate.center.distance(camera_position);
            let size = projected_size(
                candidate.radius,
                distance,
                self.fov_y_radians,
                self.viewport_height,
            );
            match self.path_for(size) {
                RasterPath::Hardware => out.hardware.push(candidate.id),
                RasterPath::Software => out.software.push(candidate.id),
            }
        }
        out
    }
}
