// src/renderer/pipeline_builder.rs
use crate::error::{RenderError, Result};

/// Builder for render pipelines that fetch their vertex data from storage
/// buffers.
///
/// No vertex buffer layouts are ever declared: meshlet rendering addresses
/// vertices through the bound index and meshlet buffers inside the shader.
pub struct PipelineBuilder<'a> {
    device: &'a wgpu::Device,
    label: Option<&'a str>,
    layout: &'a wgpu::PipelineLayout,
    shader: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: Option<&'a str>,
    color_targets: Vec<Option<wgpu::ColorTargetState>>,
    depth_stencil: Option<wgpu::DepthStencilState>,
    primitive: wgpu::PrimitiveState,
    multisample: wgpu::MultisampleState,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        layout: &'a wgpu::PipelineLayout,
        shader: &'a wgpu::ShaderModule,
    ) -> Self {
        Self {
            device,
            label: None,
            layout,
            shader,
            vertex_entry: "vs_main",
            fragment_entry: Some("fs_main"),
            color_targets: Vec::new(),
            depth_stencil: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// Set the vertex shader entry point (default: "vs_main")
    pub fn with_vertex_entry(mut self, entry: &'a str) -> Self {
        self.vertex_entry = entry;
        self
    }

    /// Set the fragment shader entry point (default: "fs_main")
    pub fn with_fragment_entry(mut self, entry: &'a str) -> Self {
        self.fragment_entry = Some(entry);
        self
    }

    pub fn with_color_target(
        mut self,
        format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> Self {
        self.color_targets.push(Some(wgpu::ColorTargetState {
            format,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        }));
        self
    }

    pub fn with_depth_stencil(
        mut self,
        format: wgpu::TextureFormat,
        depth_write: bool,
        depth_compare: wgpu::CompareFunction,
    ) -> Self {
        self.depth_stencil = Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: depth_write,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });
        self
    }

    pub fn with_no_culling(mut self) -> Self {
        self.primitive.cull_mode = None;
        self
    }

    pub fn build(self) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: self.label,
            layout: Some(self.layout),
            vertex: wgpu::VertexState {
                module: self.shader,
                entry_point: Some(self.vertex_entry),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: self.fragment_entry.map(|entry| wgpu::FragmentState {
                module: self.shader,
                entry_point: Some(entry),
                targets: &self.color_targets,
                compilation_options: Default::default(),
            }),
            primitive: self.primitive,
            depth_stencil: self.depth_stencil,
            multisample: self.multisample,
            multiview: None,
            cache: None,
        })
    }
}

/// Rejects formats a float fragment output cannot render into.
pub fn validate_color_format(
    pass: &'static str,
    format: wgpu::TextureFormat,
    features: wgpu::Features,
) -> Result<()> {
    let unsupported = || RenderError::UnsupportedFormat { pass, format };

    if format.is_depth_stencil_format() {
        return Err(unsupported());
    }
    let caps = format.guaranteed_format_features(features);
    if !caps
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
    {
        return Err(unsupported());
    }
    match format.sample_type(None, Some(features)) {
        Some(wgpu::TextureSampleType::Float { .. }) => Ok(()),
        _ => Err(unsupported()),
    }
}

/// Runs `create` inside a validation error scope and turns a captured error
/// into `RenderError::PipelineCreation`.
///
/// Only used at construction time; waiting for the scope is acceptable there.
pub fn with_validation<T>(
    device: &wgpu::Device,
    pass: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(err) => Err(RenderError::PipelineCreation {
            pass,
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASS: &str = "TestPass";

    #[test]
    fn hdr_and_srgb_targets_are_accepted() {
        for format in [
            wgpu::TextureFormat::Rgba16Float,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ] {
            validate_color_format(PASS, format, wgpu::Features::empty()).unwrap();
        }
    }

    #[test]
    fn depth_formats_are_rejected() {
        let err = validate_color_format(
            PASS,
            wgpu::TextureFormat::Depth24Plus,
            wgpu::Features::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedFormat { .. }));
    }

    #[test]
    fn integer_and_compressed_formats_are_rejected() {
        for format in [
            wgpu::TextureFormat::Rgba8Uint,
            wgpu::TextureFormat::Bc1RgbaUnorm,
        ] {
            assert!(validate_color_format(PASS, format, wgpu::Features::all()).is_err());
        }
    }
}
