// renderer/context.rs
use crate::renderer::attachments::{
    color_attachment, depth_attachment, AttachmentLoad, FrameAttachments,
};
use crate::renderer::profiler::GpuProfiler;
use crate::renderer::scene::SceneResources;
use crate::renderer::uniforms::GlobalUniforms;
use crate::settings::RenderSettings;

/// Frame-scoped bundle handed to every pass.
///
/// Only borrows: the frame driver owns the encoder, targets, uniforms and
/// profiler, and drops the context before submitting.
pub struct PassCtx<'a> {
    pub device: &'a wgpu::Device,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub hdr_render_view: &'a wgpu::TextureView,
    pub depth_view: &'a wgpu::TextureView,
    pub global_uniforms: &'a GlobalUniforms,
    pub scene: &'a dyn SceneResources,
    pub settings: &'a RenderSettings,
    pub profiler: Option<&'a mut GpuProfiler>,
}

impl<'a> PassCtx<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        encoder: &'a mut wgpu::CommandEncoder,
        attachments: &'a FrameAttachments,
        global_uniforms: &'a GlobalUniforms,
        scene: &'a dyn SceneResources,
        settings: &'a RenderSettings,
    ) -> Self {
        Self {
            device,
            encoder,
            hdr_render_view: &attachments.hdr_view,
            depth_view: &attachments.depth_view,
            global_uniforms,
            scene,
            settings,
            profiler: None,
        }
    }

    pub fn with_profiler(mut self, profiler: &'a mut GpuProfiler) -> Self {
        self.profiler = Some(profiler);
        self
    }

    /// Opens a render pass on the shared HDR color and depth targets.
    pub fn begin_render_pass(&mut self, label: &str, load: AttachmentLoad) -> wgpu::RenderPass<'_> {
        let timestamp_writes = self
            .profiler
            .as_deref_mut()
            .and_then(|profiler| profiler.create_scope_gpu(label));

        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(color_attachment(
                self.hdr_render_view,
                self.settings.clear_color(),
                load,
            ))],
            depth_stencil_attachment: Some(depth_attachment(self.depth_view, load)),
            timestamp_writes,
            occlusion_query_set: None,
        })
    }
}
