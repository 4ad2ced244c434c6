use std::collections::HashSet;

use glam::{Mat4, Vec3};
use meshlet_passes::renderer::objects::GpuMeshlet;
use meshlet_passes::renderer::passes::{meshlet_candidates, RasterPath, RasterizerSplit};
use meshlet_passes::RenderSettings;

fn scene_candidates() -> Vec<meshlet_passes::renderer::passes::MeshletCandidate> {
    let meshlets: Vec<GpuMeshlet> = (0..8)
        .map(|i| GpuMeshlet::new(i * 3, 1, [i as f32, 0.0, 0.0], 0.05 + i as f32 * 0.1))
        .collect();
    // instances marching away from the camera
    let instances: Vec<Mat4> = (0..6)
        .map(|i| Mat4::from_translation(Vec3::new(0.0, 0.0, -(i as f32).powi(3) * 5.0)))
        .collect();
    meshlet_candidates(&instances, &meshlets)
}

#[test]
fn partition_is_disjoint_and_complete() {
    let settings = RenderSettings::default();
    let split = RasterizerSplit::from_settings(&settings, 720);
    let candidates = scene_candidates();

    let partition = split.partition(Vec3::new(0.0, 0.0, 3.0), &candidates);

    assert!(!partition.hardware.is_empty());
    assert!(!partition.software.is_empty());
    assert_eq!(
        partition.hardware.len() + partition.software.len(),
        candidates.len()
    );

    let hardware: HashSet<_> = partition
        .hardware
        .iter()
        .map(|d| (d.instance_id, d.meshlet_id))
        .collect();
    let software: HashSet<_> = partition
        .software
        .iter()
        .map(|d| (d.instance_id, d.meshlet_id))
        .collect();
    assert!(hardware.is_disjoint(&software));
    assert_eq!(hardware.len() + software.len(), candidates.len());
}

#[test]
fn zero_threshold_in_config_disables_software_path() {
    let settings =
        RenderSettings::from_json(r#"{ "software_rasterizer": { "threshold": 0 } }"#).unwrap();
    assert!(!settings.software_rasterizer.enabled);

    let split = RasterizerSplit::from_settings(&settings, 720);
    let candidates = scene_candidates();
    let partition = split.partition(Vec3::new(0.0, 0.0, 3.0), &candidates);

    assert!(partition.software.is_empty());
    assert_eq!(partition.hardware.len(), candidates.len());
}

#[test]
fn larger_threshold_moves_meshlets_to_software() {
    let candidates = scene_candidates();
    let eye = Vec3::new(0.0, 0.0, 3.0);
    let mut settings = RenderSettings::default();

    settings.software_rasterizer.threshold = 4.0;
    let small = RasterizerSplit::from_settings(&settings, 720).partition(eye, &candidates);
    settings.software_rasterizer.threshold = 400.0;
    let large = RasterizerSplit::from_settings(&settings, 720).partition(eye, &candidates);

    assert!(large.software.len() >= small.software.len());
    for id in &small.software {
        assert!(large.software.contains(id));
    }
}

#[test]
fn path_choice_depends_only_on_projected_size() {
    let split = RasterizerSplit::from_settings(&RenderSettings::default(), 1080);
    assert_eq!(split.path_for(1.0), RasterPath::Software);
    assert_eq!(split.path_for(1_000.0), RasterPath::Hardware);
}
