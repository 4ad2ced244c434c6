//! Headless frame driver: renders one frame of a generated meshlet grid into
//! the offscreen HDR target and logs what each path would draw.

use std::error::Error;

use glam::{Mat4, Vec3};
use meshlet_passes::renderer::objects::{GpuMeshlet, MeshletMeshData, MeshletObject};
use meshlet_passes::renderer::passes::{meshlet_candidates, RasterizerSplit};
use meshlet_passes::renderer::{
    AttachmentLoad, FrameAttachments, GlobalUniforms, GpuProfiler, PassCtx, RasterizeHwPass,
    SceneTextures, HDR_FORMAT,
};
use meshlet_passes::{Camera, RenderSettings};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// A flat `cells` x `cells` grid on the XY plane, one meshlet per row.
fn grid_mesh(cells: u32) -> MeshletMeshData {
    let mut mesh = MeshletMeshData::default();
    let step = 1.0 / cells as f32;
    for y in 0..=cells {
        for x in 0..=cells {
            let (u, v) = (x as f32 * step, y as f32 * step);
            mesh.positions.push([u - 0.5, v - 0.5, 0.0]);
            mesh.normals.push([0.0, 0.0, 1.0]);
            mesh.uvs.push([u, 1.0 - v]);
        }
    }

    let row = cells + 1;
    for y in 0..cells {
        let first_index = mesh.indices.len() as u32;
        for x in 0..cells {
            let i = y * row + x;
            mesh.indices.extend_from_slice(&[i, i + 1, i + row + 1, i, i + row + 1, i + row]);
        }
        let center_y = (y as f32 + 0.5) * step - 0.5;
        let radius = (0.25 + step * step * 0.25).sqrt();
        mesh.meshlets.push(GpuMeshlet::new(first_index, cells * 2, [0.0, center_y, 0.0], radius));
    }
    mesh
}

async fn run() -> Result<(), Box<dyn Error>> {
    let settings = RenderSettings::load();

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Device"),
            required_features: adapter.features() & wgpu::Features::TIMESTAMP_QUERY,
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await?;
    log::info!("Using adapter {:?}", adapter.get_info().name);

    let attachments = FrameAttachments::new(&device, WIDTH, HEIGHT);
    let mut profiler = GpuProfiler::new(&device, &queue);
    let mut hw_pass = RasterizeHwPass::new(&device, HDR_FORMAT)?;

    let mut scene = SceneTextures::new(&device);
    scene.insert_solid_color(&device, &queue, "white", [255, 255, 255, 255]);
    scene.set_fallback("white");

    let mesh = grid_mesh(16);
    let instances: Vec<Mat4> = (0..4)
        .map(|i| Mat4::from_translation(Vec3::new(i as f32 * 1.5 - 2.25, 0.0, -(i as f32) * 4.0)))
        .collect();
    let object = MeshletObject::new(&device, "grid", &mesh, &instances, None)?;

    let mut camera = Camera::from_settings(&settings.camera);
    camera.focus_bounding_box(&object.bounds, settings.camera.fov_y_radians());
    let mut uniforms = GlobalUniforms::new(&device);
    uniforms.update(&queue, &camera, &settings, (WIDTH, HEIGHT));

    let split = RasterizerSplit::from_settings(&settings, HEIGHT);
    let candidates = meshlet_candidates(&instances, &mesh.meshlets);
    let partition = split.partition(camera.position(), &candidates);
    let drawn = object.buffers.drawn.write(&queue, &partition.hardware);
    log::info!(
        "{} meshlets: {} hardware, {} software (software kernel not available, skipped)",
        candidates.len(),
        drawn,
        partition.software.len()
    );

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Frame Encoder"),
    });
    let stats = {
        let mut ctx = PassCtx::new(&device, &mut encoder, &attachments, &uniforms, &scene, &settings);
        if let Some(profiler) = profiler.as_mut() {
            ctx = ctx.with_profiler(profiler);
        }
        hw_pass.cmd_hardware_rasterize_all(&mut ctx, &[&object], AttachmentLoad::Clear)?
    };
    if let Some(profiler) = profiler.as_mut() {
        profiler.end_frame(&mut encoder);
    }
    queue.submit(Some(encoder.finish()));
    if let Some(profiler) = profiler.as_mut() {
        profiler.after_submit();
    }

    log::info!(
        "Frame recorded: {} objects drawn, {} skipped",
        stats.drawn,
        stats.skipped
    );

    device.poll(wgpu::PollType::wait_indefinitely())?;
    if let Some(profiler) = profiler.as_mut() {
        if profiler.try_read_previous_frame() {
            for timing in profiler.last_timings() {
                log::info!("GPU {}: {:.3} ms", timing.name, timing.duration_ms);
            }
        } else {
            log::warn!("GPU timings not available after the frame");
        }
    }
    Ok(())
}

fn main() {
    meshlet_passes::init_logging();
    if let Err(err) = pollster::block_on(run()) {
        log::error!("Application error: {}", err);
    }
}
