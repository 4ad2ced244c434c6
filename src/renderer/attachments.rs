// renderer/attachments.rs
//! Shared color and depth targets written by every geometry pass of a frame.
//!
//! Exactly one pass per frame may clear an attachment; every later pass must
//! load it. Nothing here enforces that, the frame driver picks the load op.

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Depth is cleared to the far plane.
pub const DEPTH_CLEAR_VALUE: f32 = 1.0;

/// How a pass initializes the shared attachments when it begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentLoad {
    /// Replace prior contents (color with the configured clear color, depth with 1.0).
    Clear,
    /// Keep what earlier passes wrote.
    Load,
}

pub fn color_ops(load: AttachmentLoad, clear_color: wgpu::Color) -> wgpu::Operations<wgpu::Color> {
    wgpu::Operations {
        load: match load {
            AttachmentLoad::Clear => wgpu::LoadOp::Clear(clear_color),
            AttachmentLoad::Load => wgpu::LoadOp::Load,
        },
        store: wgpu::StoreOp::Store,
    }
}

pub fn depth_ops(load: AttachmentLoad) -> wgpu::Operations<f32> {
    wgpu::Operations {
        load: match load {
            AttachmentLoad::Clear => wgpu::LoadOp::Clear(DEPTH_CLEAR_VALUE),
            AttachmentLoad::Load => wgpu::LoadOp::Load,
        },
        store: wgpu::StoreOp::Store,
    }
}

pub fn color_attachment(
    view: &wgpu::TextureView,
    clear_color: wgpu::Color,
    load: AttachmentLoad,
) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        depth_slice: None,
        ops: color_ops(load, clear_color),
    }
}

pub fn depth_attachment(
    view: &wgpu::TextureView,
    load: AttachmentLoad,
) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(depth_ops(load)),
        stencil_ops: None,
    }
}

/// HDR accumulation target plus depth, sized to the viewport.
pub struct FrameAttachments {
    pub hdr_texture: wgpu::Texture,
    pub hdr_view: wgpu::TextureView,
    pub depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    size: (u32, u32),
}

impl FrameAttachments {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = (width.max(1), height.max(1));
        let (hdr_texture, hdr_view) = create_target(
            device,
            "hdrRenderTexture",
            HDR_FORMAT,
            size,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        );
        let (depth_texture, depth_view) = create_target(
            device,
            "depthTexture",
            DEPTH_FORMAT,
            size,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );

        Self {
            hdr_texture,
            hdr_view,
            depth_texture,
            depth_view,
            size,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Recreates both targets; returns false when the size did not change.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if (width.max(1), height.max(1)) == self.size {
            return false;
        }
        log::debug!("Resizing frame attachments to {}x{}", width, height);
        *self = Self::new(device, width, height);
        true
    }
}

fn create_target(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    size: (u32, u32),
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_uses_configured_color_and_far_depth() {
        let color = wgpu::Color { r: 0.2, g: 0.2, b: 0.2, a: 1.0 };
        assert_eq!(color_ops(AttachmentLoad::Clear, color).load, wgpu::LoadOp::Clear(color));
        assert_eq!(depth_ops(AttachmentLoad::Clear).load, wgpu::LoadOp::Clear(1.0));
    }

    #[test]
    fn load_preserves_both_attachments() {
        assert_eq!(
            color_ops(AttachmentLoad::Load, wgpu::Color::RED).load,
            wgpu::LoadOp::Load
        );
        assert_eq!(depth_ops(AttachmentLoad::Load).load, wgpu::LoadOp::Load);
    }

    #[test]
    fn every_load_op_stores() {
        for load in [AttachmentLoad::Clear, AttachmentLoad::Load] {
            assert_eq!(color_ops(load, wgpu::Color::BLACK).store, wgpu::StoreOp::Store);
            assert_eq!(depth_ops(load).store, wgpu::StoreOp::Store);
        }
    }

    #[test]
    fn depth_format_is_depth24plus() {
        assert!(DEPTH_FORMAT.is_depth_stencil_format());
        assert!(matches!(DEPTH_FORMAT, wgpu::TextureFormat::Depth24Plus));
    }
}
