// renderer/scene.rs
use std::collections::HashMap;

use crate::renderer::objects::MeshletObject;

/// What passes need from the scene besides the objects themselves.
///
/// Lookups never block: a texture that is still uploading is simply absent.
pub trait SceneResources {
    fn diffuse_texture(&self, object: &MeshletObject) -> Option<wgpu::BindingResource<'_>>;
    fn sampler(&self) -> &wgpu::Sampler;
}

/// Texture views registered by key plus one shared linear sampler.
pub struct SceneTextures {
    views: HashMap<String, wgpu::TextureView>,
    fallback: Option<String>,
    sampler: wgpu::Sampler,
}

impl SceneTextures {
    pub fn new(device: &wgpu::Device) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("diffuseSampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            views: HashMap::new(),
            fallback: None,
            sampler,
        }
    }

    /// Registers (or replaces) a view. Passes caching bind groups that use
    /// the old view must be invalidated by the caller.
    pub fn insert(&mut self, key: impl Into<String>, view: wgpu::TextureView) {
        self.views.insert(key.into(), view);
    }

    pub fn remove(&mut self, key: &str) -> Option<wgpu::TextureView> {
        self.views.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.views.contains_key(key)
    }

    /// View used for objects without their own diffuse texture.
    pub fn set_fallback(&mut self, key: impl Into<String>) {
        self.fallback = Some(key.into());
    }

    /// Uploads a 1x1 RGBA8 texture and registers it under `key`.
    pub fn insert_solid_color(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: &str,
        rgba: [u8; 4],
    ) {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(key),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );
        self.insert(key, texture.create_view(&wgpu::TextureViewDescriptor::default()));
    }

    fn key_for<'a>(&'a self, object: &'a MeshletObject) -> Option<&'a str> {
        object
            .diffuse_texture
            .as_deref()
            .or(self.fallback.as_deref())
    }
}

impl SceneResources for SceneTextures {
    fn diffuse_texture(&self, object: &MeshletObject) -> Option<wgpu::BindingResource<'_>> {
        let key = self.key_for(object)?;
        self.views.get(key).map(wgpu::BindingResource::TextureView)
    }

    fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}
