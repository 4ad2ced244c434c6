// renderer/passes/rasterize_hw.rs
use crate::error::{RenderError, Result};
use crate::renderer::attachments::{AttachmentLoad, DEPTH_FORMAT};
use crate::renderer::bindings::{
    assert_texture_view, BindingDescriptor, BindingSlot, BindingSlotTable, SlotKind,
};
use crate::renderer::cache::BindingsCache;
use crate::renderer::context::PassCtx;
use crate::renderer::objects::MeshletObject;
use crate::renderer::passes::{MeshletRasterizer, RasterPath, RasterizeStats};
use crate::renderer::pipeline_builder::{validate_color_format, with_validation, PipelineBuilder};

pub const SHADER_CODE: &str = include_str!("../../shader/rasterize_hw.wgsl");

const VS: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX;
const FS: wgpu::ShaderStages = wgpu::ShaderStages::FRAGMENT;
const VS_FS: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX_FRAGMENT;

const SLOTS: &[BindingSlot] = &[
    BindingSlot::new("renderUniforms", 0, SlotKind::Uniform, VS_FS),
    BindingSlot::new("meshlets", 1, SlotKind::Storage, VS),
    BindingSlot::new("drawnMeshletIds", 2, SlotKind::Storage, VS),
    BindingSlot::new("instancesTransforms", 3, SlotKind::Storage, VS),
    BindingSlot::new("vertexPositions", 4, SlotKind::Storage, VS),
    BindingSlot::new("vertexNormals", 5, SlotKind::Storage, VS),
    BindingSlot::new("vertexUV", 6, SlotKind::Storage, VS),
    BindingSlot::new("indexBuffer", 7, SlotKind::Storage, VS),
    BindingSlot::new("diffuseTexture", 8, SlotKind::Texture, FS),
    BindingSlot::new("diffuseSampler", 9, SlotKind::Sampler, FS),
];

/// Slot indices resolved once by name from the table.
#[derive(Debug, Clone, Copy)]
struct HwBindings {
    render_uniforms: u32,
    meshlets: u32,
    drawn_meshlet_ids: u32,
    instances_transforms: u32,
    vertex_positions: u32,
    vertex_normals: u32,
    vertex_uv: u32,
    index_buffer: u32,
    diffuse_texture: u32,
    diffuse_sampler: u32,
}

impl HwBindings {
    fn resolve(table: &BindingSlotTable) -> Result<Self> {
        Ok(Self {
            render_uniforms: table.index_of("renderUniforms")?,
            meshlets: table.index_of("meshlets")?,
            drawn_meshlet_ids: table.index_of("drawnMeshletIds")?,
            instances_transforms: table.index_of("instancesTransforms")?,
            vertex_positions: table.index_of("vertexPositions")?,
            vertex_normals: table.index_of("vertexNormals")?,
            vertex_uv: table.index_of("vertexUV")?,
            index_buffer: table.index_of("indexBuffer")?,
            diffuse_texture: table.index_of("diffuseTexture")?,
            diffuse_sampler: table.index_of("diffuseSampler")?,
        })
    }
}

/// Draws meshlets with fixed-function triangles into the shared HDR and
/// depth attachments, one indirect draw per object.
pub struct RasterizeHwPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    slots: BindingSlotTable,
    bindings: HwBindings,
    cache: BindingsCache<String>,
    out_format: wgpu::TextureFormat,
}

impl RasterizeHwPass {
    pub const NAME: &'static str = "RasterizeHwPass";

    pub fn slot_table() -> Result<BindingSlotTable> {
        BindingSlotTable::new(Self::NAME, SLOTS)
    }

    /// Builds the pipeline for `out_format`. Any failure here is fatal for
    /// the pass and should abort startup.
    pub fn new(device: &wgpu::Device, out_format: wgpu::TextureFormat) -> Result<Self> {
        validate_color_format(Self::NAME, out_format, device.features())?;

        let slots = Self::slot_table()?;
        slots.check_shader(SHADER_CODE)?;
        let bindings = HwBindings::resolve(&slots)?;
        let layout = slots.create_layout(device);

        let pipeline = with_validation(device, Self::NAME, || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("RasterizeHwShader"),
                source: wgpu::ShaderSource::Wgsl(SHADER_CODE.into()),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("RasterizeHwPipelineLayout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

            PipelineBuilder::new(device, &pipeline_layout, &shader)
                .with_label(Self::NAME)
                .with_vertex_entry("main_vs")
                .with_fragment_entry("main_fs")
                .with_color_target(out_format, None)
                .with_depth_stencil(DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
                .with_no_culling()
                .build()
        })?;

        log::info!("{} pipeline created for {:?}", Self::NAME, out_format);

        Ok(Self {
            pipeline,
            layout,
            slots,
            bindings,
            cache: BindingsCache::new(),
            out_format,
        })
    }

    pub fn out_format(&self) -> wgpu::TextureFormat {
        self.out_format
    }

    /// Drops the cached bind group of `object`; call after replacing its
    /// buffers or textures.
    pub fn invalidate(&mut self, object: &str) -> bool {
        self.cache.invalidate(object)
    }

    pub fn cached_bindings(&self) -> usize {
        self.cache.len()
    }

    pub fn cmd_hardware_rasterize(
        &mut self,
        ctx: &mut PassCtx<'_>,
        object: &MeshletObject,
        load: AttachmentLoad,
    ) -> Result<()> {
        self.cmd_hardware_rasterize_all(ctx, &[object], load)
            .map(|_| ())
    }

    /// Records one render pass drawing every ready object.
    ///
    /// The pass is opened even when nothing is drawn so a `Clear` still
    /// clears. Objects whose resources are missing are skipped for this
    /// frame. A construction error stops binding the remaining objects, but
    /// the pass is still recorded with the objects prepared so far before
    /// the error is returned.
    pub fn cmd_hardware_rasterize_all(
        &mut self,
        ctx: &mut PassCtx<'_>,
        objects: &[&MeshletObject],
        load: AttachmentLoad,
    ) -> Result<RasterizeStats> {
        let mut stats = RasterizeStats::default();
        let prepared = prepare_ready(objects, |object| self.prepare_bindings(ctx, object));
        stats.skipped = prepared.skipped;

        let mut render_pass = ctx.begin_render_pass(Self::NAME, load);
        render_pass.set_pipeline(&self.pipeline);
        for object in prepared.ready {
            let Some(bind_group) = self.cache.get(object.name.as_str()) else {
                continue;
            };
            render_pass.set_bind_group(0, bind_group, &[]);
            object.buffers.draw_meshlets_indirect(&mut render_pass);
            stats.drawn += 1;
        }
        drop(render_pass);

        match prepared.failure {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }

    /// Makes sure `object` has a bind group; false when it is not ready yet.
    fn prepare_bindings(&mut self, ctx: &PassCtx<'_>, object: &MeshletObject) -> Result<bool> {
        let Self {
            cache,
            slots,
            layout,
            bindings,
            ..
        } = self;

        let built = cache.get_or_create(object.name.as_str(), || {
            log::debug!("{}: creating bindings for '{}'", Self::NAME, object.name);
            create_bindings(slots, layout, bindings, ctx, object)
        });

        match built {
            Ok(_) => Ok(true),
            Err(err) if err.is_transient() => {
                log::debug!("{}: skipping '{}' this frame: {}", Self::NAME, object.name, err);
                Ok(false)
            }
            Err(err) => {
                log::error!("{}: cannot bind '{}': {}", Self::NAME, object.name, err);
                Err(err)
            }
        }
    }
}

/// Objects sorted into ready and skipped, stopping at the first hard error.
struct Prepared<'o, T> {
    ready: Vec<&'o T>,
    skipped: u32,
    failure: Option<RenderError>,
}

fn prepare_ready<'o, T, F>(objects: &[&'o T], mut prepare: F) -> Prepared<'o, T>
where
    F: FnMut(&T) -> Result<bool>,
{
    let mut prepared = Prepared {
        ready: Vec::with_capacity(objects.len()),
        skipped: 0,
        failure: None,
    };
    for &object in objects {
        match prepare(object) {
            Ok(true) => prepared.ready.push(object),
            Ok(false) => prepared.skipped += 1,
            Err(err) => {
                prepared.failure = Some(err);
                break;
            }
        }
    }
    prepared
}

fn create_bindings(
    slots: &BindingSlotTable,
    layout: &wgpu::BindGroupLayout,
    b: &HwBindings,
    ctx: &PassCtx<'_>,
    object: &MeshletObject,
) -> Result<wgpu::BindGroup> {
    let diffuse_texture =
        ctx.scene
            .diffuse_texture(object)
            .ok_or_else(|| RenderError::ResourceNotReady {
                object: object.name.clone(),
                resource: "diffuseTexture".into(),
            })?;
    assert_texture_view(&diffuse_texture);

    let buffers = &object.buffers;
    let descriptors = [
        ctx.global_uniforms.create_binding_desc(b.render_uniforms),
        buffers.bind_meshlet_data(b.meshlets),
        buffers.bind_drawn_meshlet_ids(b.drawn_meshlet_ids),
        object.bind_instance_transforms(b.instances_transforms),
        buffers.bind_vertex_positions(b.vertex_positions),
        buffers.bind_vertex_normals(b.vertex_normals),
        buffers.bind_vertex_uvs(b.vertex_uv),
        buffers.bind_index_buffer(b.index_buffer),
        BindingDescriptor::new(b.diffuse_texture, diffuse_texture),
        BindingDescriptor::sampler(b.diffuse_sampler, ctx.scene.sampler()),
    ];

    slots.create_bind_group(ctx.device, layout, &object.name, &descriptors)
}

impl MeshletRasterizer for RasterizeHwPass {
    fn path(&self) -> RasterPath {
        RasterPath::Hardware
    }

    fn rasterize(
        &mut self,
        ctx: &mut PassCtx<'_>,
        objects: &[&MeshletObject],
        load: AttachmentLoad,
    ) -> Result<RasterizeStats> {
        self.cmd_hardware_rasterize_all(ctx, objects, load)
    }
}
