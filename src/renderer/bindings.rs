// renderer/bindings.rs
//! Named binding-slot tables and the descriptors data owners hand to passes.
//!
//! Every pass declares its group-0 interface once as a [`BindingSlotTable`].
//! The table produces the explicit bind group layout, is checked against the
//! `@binding` declarations of the pass shader when the pipeline is built,
//! and validates the descriptor list assembled for each object before a bind
//! group is created. A mismatch is an error at that point, never a silently
//! empty slot at draw time.

use std::collections::HashSet;

use crate::error::{RenderError, Result};

/// What a slot in the layout expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Uniform,
    Storage,
    Texture,
    Sampler,
}

/// What a descriptor actually provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    TextureView,
    Sampler,
    Other,
}

impl SlotKind {
    pub fn accepts(self, resource: ResourceKind) -> bool {
        matches!(
            (self, resource),
            (SlotKind::Uniform, ResourceKind::Buffer)
                | (SlotKind::Storage, ResourceKind::Buffer)
                | (SlotKind::Texture, ResourceKind::TextureView)
                | (SlotKind::Sampler, ResourceKind::Sampler)
        )
    }

    fn binding_type(self) -> wgpu::BindingType {
        match self {
            SlotKind::Uniform => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            SlotKind::Storage => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            SlotKind::Texture => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            SlotKind::Sampler => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BindingSlot {
    pub name: &'static str,
    pub binding: u32,
    pub kind: SlotKind,
    pub visibility: wgpu::ShaderStages,
}

impl BindingSlot {
    pub const fn new(
        name: &'static str,
        binding: u32,
        kind: SlotKind,
        visibility: wgpu::ShaderStages,
    ) -> Self {
        Self {
            name,
            binding,
            kind,
            visibility,
        }
    }
}

/// One `(slot, resource)` pair produced by a data owner.
#[derive(Debug, Clone)]
pub struct BindingDescriptor<'a> {
    pub binding: u32,
    pub resource: wgpu::BindingResource<'a>,
}

impl<'a> BindingDescriptor<'a> {
    pub fn new(binding: u32, resource: wgpu::BindingResource<'a>) -> Self {
        Self { binding, resource }
    }

    pub fn buffer(binding: u32, buffer: &'a wgpu::Buffer) -> Self {
        Self::new(binding, buffer.as_entire_binding())
    }

    pub fn texture_view(binding: u32, view: &'a wgpu::TextureView) -> Self {
        Self::new(binding, wgpu::BindingResource::TextureView(view))
    }

    pub fn sampler(binding: u32, sampler: &'a wgpu::Sampler) -> Self {
        Self::new(binding, wgpu::BindingResource::Sampler(sampler))
    }

    pub fn kind(&self) -> ResourceKind {
        resource_kind(&self.resource)
    }
}

pub fn resource_kind(resource: &wgpu::BindingResource<'_>) -> ResourceKind {
    match resource {
        wgpu::BindingResource::Buffer(_) => ResourceKind::Buffer,
        wgpu::BindingResource::TextureView(_) => ResourceKind::TextureView,
        wgpu::BindingResource::Sampler(_) => ResourceKind::Sampler,
        _ => ResourceKind::Other,
    }
}

/// Panics unless `resource` is a single texture view.
///
/// Handing a buffer or sampler to a texture slot is a programming error,
/// not a recoverable condition.
pub fn assert_texture_view(resource: &wgpu::BindingResource<'_>) {
    let kind = resource_kind(resource);
    assert!(
        kind == ResourceKind::TextureView,
        "expected a texture view, got {kind:?}"
    );
}

/// The group-0 interface of one pass, keyed by human readable names.
#[derive(Debug, Clone)]
pub struct BindingSlotTable {
    pass: &'static str,
    slots: Vec<BindingSlot>,
}

impl BindingSlotTable {
    pub fn new(pass: &'static str, slots: &[BindingSlot]) -> Result<Self> {
        let mut names = HashSet::new();
        let mut indices = HashSet::new();
        for slot in slots {
            if !names.insert(slot.name) {
                return Err(RenderError::ShaderInterface {
                    pass,
                    reason: format!("slot name '{}' declared twice", slot.name),
                });
            }
            if !indices.insert(slot.binding) {
                return Err(RenderError::ShaderInterface {
                    pass,
                    reason: format!("binding {} declared twice", slot.binding),
                });
            }
        }

        Ok(Self {
            pass,
            slots: slots.to_vec(),
        })
    }

    pub fn pass(&self) -> &'static str {
        self.pass
    }

    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Result<&BindingSlot> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .ok_or_else(|| RenderError::UnknownSlot(name.to_string()))
    }

    pub fn index_of(&self, name: &str) -> Result<u32> {
        self.slot(name).map(|slot| slot.binding)
    }

    fn slot_at(&self, binding: u32) -> Option<&BindingSlot> {
        self.slots.iter().find(|slot| slot.binding == binding)
    }

    pub fn layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        self.slots
            .iter()
            .map(|slot| wgpu::BindGroupLayoutEntry {
                binding: slot.binding,
                visibility: slot.visibility,
                ty: slot.kind.binding_type(),
                count: None,
            })
            .collect()
    }

    pub fn create_layout(&self, device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(self.pass),
            entries: &self.layout_entries(),
        })
    }

    /// Checks that `provided` covers every slot exactly once with the right kind.
    pub fn check<I>(&self, object: &str, provided: I) -> Result<()>
    where
        I: IntoIterator<Item = (u32, ResourceKind)>,
    {
        let mismatch = |reason: String| RenderError::BindingMismatch {
            pass: self.pass,
            object: object.to_string(),
            reason,
        };

        let mut seen = HashSet::new();
        for (binding, kind) in provided {
            let slot = self
                .slot_at(binding)
                .ok_or_else(|| mismatch(format!("unexpected slot {binding}")))?;
            if !seen.insert(binding) {
                return Err(mismatch(format!(
                    "slot '{}' ({binding}) bound twice",
                    slot.name
                )));
            }
            if !slot.kind.accepts(kind) {
                return Err(mismatch(format!(
                    "slot '{}' ({binding}) expects {:?}, got {kind:?}",
                    slot.name, slot.kind
                )));
            }
        }

        if let Some(missing) = self.slots.iter().find(|s| !seen.contains(&s.binding)) {
            return Err(mismatch(format!(
                "missing slot '{}' ({})",
                missing.name, missing.binding
            )));
        }

        Ok(())
    }

    /// Compares the table against the group-0 resources declared by `wgsl`:
    /// every slot must be declared under its name with a matching kind, and
    /// the shader may not declare slots the table lacks.
    pub fn check_shader(&self, wgsl: &str) -> Result<()> {
        let declared = shader_bindings(wgsl)?;
        let interface_error = |reason: String| RenderError::ShaderInterface {
            pass: self.pass,
            reason,
        };

        for slot in &self.slots {
            let Some(found) = declared.iter().find(|d| d.binding == slot.binding) else {
                return Err(interface_error(format!(
                    "shader does not declare binding {} ('{}')",
                    slot.binding, slot.name
                )));
            };
            if found.name != slot.name {
                return Err(interface_error(format!(
                    "binding {} is '{}' in the shader but '{}' in the table",
                    slot.binding, found.name, slot.name
                )));
            }
            if found.kind != Some(slot.kind) {
                return Err(interface_error(format!(
                    "binding {} ('{}') is {:?} in the table but {} in the shader",
                    slot.binding,
                    slot.name,
                    slot.kind,
                    found.kind.map_or("an unsupported resource".to_string(), |k| format!("{k:?}"))
                )));
            }
            if found.writable {
                return Err(interface_error(format!(
                    "binding {} ('{}') is writable in the shader but read-only in the layout",
                    slot.binding, slot.name
                )));
            }
        }

        if let Some(extra) = declared.iter().find(|d| self.slot_at(d.binding).is_none()) {
            return Err(interface_error(format!(
                "shader declares binding {} ('{}') missing from the table",
                extra.binding, extra.name
            )));
        }

        Ok(())
    }

    /// Validates `descriptors` and creates the bind group for `object`.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        object: &str,
        descriptors: &[BindingDescriptor<'_>],
    ) -> Result<wgpu::BindGroup> {
        self.check(object, descriptors.iter().map(|d| (d.binding, d.kind())))?;

        let entries: Vec<wgpu::BindGroupEntry> = descriptors
            .iter()
            .map(|d| wgpu::BindGroupEntry {
                binding: d.binding,
                resource: d.resource.clone(),
            })
            .collect();

        let label = format!("{}-{}", self.pass, object);
        log::debug!("Creating bind group '{}' ({} entries)", label, entries.len());

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout,
            entries: &entries,
        }))
    }
}

/// A group-0 resource variable declared by a shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBinding {
    pub binding: u32,
    pub name: String,
    /// `None` for resources no slot kind describes (storage textures,
    /// binding arrays, push constants).
    pub kind: Option<SlotKind>,
    /// Storage buffer declared with write access.
    pub writable: bool,
}

/// Parses `wgsl` and lists its `@group(0)` resources in declaration order.
pub fn shader_bindings(wgsl: &str) -> Result<Vec<ShaderBinding>> {
    let module = naga::front::wgsl::parse_str(wgsl)
        .map_err(|err| RenderError::ShaderParse(err.emit_to_string(wgsl)))?;

    let bindings = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref().filter(|b| b.group == 0)?;
            let inner = &module.types[var.ty].inner;
            let (kind, writable) = match (var.space, inner) {
                (naga::AddressSpace::Uniform, _) => (Some(SlotKind::Uniform), false),
                (naga::AddressSpace::Storage { access }, _) => (
                    Some(SlotKind::Storage),
                    access.contains(naga::StorageAccess::STORE),
                ),
                (
                    naga::AddressSpace::Handle,
                    naga::TypeInner::Image {
                        class: naga::ImageClass::Storage { .. },
                        ..
                    },
                ) => (None, false),
                (naga::AddressSpace::Handle, naga::TypeInner::Image { .. }) => {
                    (Some(SlotKind::Texture), false)
                }
                (naga::AddressSpace::Handle, naga::TypeInner::Sampler { .. }) => {
                    (Some(SlotKind::Sampler), false)
                }
                _ => (None, false),
            };
            Some(ShaderBinding {
                binding: binding.binding,
                name: var.name.clone().unwrap_or_default(),
                kind,
                writable,
            })
        })
        .collect();

    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX;
    const FS: wgpu::ShaderStages = wgpu::ShaderStages::FRAGMENT;

    fn table() -> BindingSlotTable {
        BindingSlotTable::new(
            "TestPass",
            &[
                BindingSlot::new("uniforms", 0, SlotKind::Uniform, VS),
                BindingSlot::new("positions", 1, SlotKind::Storage, VS),
                BindingSlot::new("diffuse", 2, SlotKind::Texture, FS),
                BindingSlot::new("linearSampler", 3, SlotKind::Sampler, FS),
            ],
        )
        .unwrap()
    }

    fn full_set() -> Vec<(u32, ResourceKind)> {
        vec![
            (0, ResourceKind::Buffer),
            (1, ResourceKind::Buffer),
            (2, ResourceKind::TextureView),
            (3, ResourceKind::Sampler),
        ]
    }

    #[test]
    fn complete_set_passes_in_any_order() {
        let mut set = full_set();
        set.reverse();
        table().check("obj", set).unwrap();
    }

    #[test]
    fn missing_slot_is_reported_by_name() {
        let mut set = full_set();
        set.remove(2);
        let err = table().check("obj", set).unwrap_err();
        assert!(matches!(err, RenderError::BindingMismatch { .. }));
        assert!(err.to_string().contains("diffuse"));
    }

    #[test]
    fn unexpected_and_duplicate_slots_fail() {
        let mut extra = full_set();
        extra.push((9, ResourceKind::Buffer));
        assert!(table().check("obj", extra).is_err());

        let mut dup = full_set();
        dup.push((1, ResourceKind::Buffer));
        let err = table().check("obj", dup).unwrap_err();
        assert!(err.to_string().contains("bound twice"));
    }

    #[test]
    fn wrong_kind_fails() {
        let mut set = full_set();
        set[2] = (2, ResourceKind::Buffer);
        let err = table().check("obj", set).unwrap_err();
        assert!(err.to_string().contains("expects Texture"));
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let dup_name = BindingSlotTable::new(
            "TestPass",
            &[
                BindingSlot::new("a", 0, SlotKind::Uniform, VS),
                BindingSlot::new("a", 1, SlotKind::Uniform, VS),
            ],
        );
        assert!(dup_name.is_err());

        let dup_index = BindingSlotTable::new(
            "TestPass",
            &[
                BindingSlot::new("a", 0, SlotKind::Uniform, VS),
                BindingSlot::new("b", 0, SlotKind::Uniform, VS),
            ],
        );
        assert!(dup_index.is_err());
    }

    #[test]
    fn index_of_looks_up_by_name() {
        let t = table();
        assert_eq!(t.index_of("diffuse").unwrap(), 2);
        assert!(matches!(
            t.index_of("normals"),
            Err(RenderError::UnknownSlot(name)) if name == "normals"
        ));
    }

    #[test]
    fn layout_entries_follow_slot_kinds() {
        let entries = table().layout_entries();
        assert_eq!(entries.len(), 4);
        assert!(matches!(
            entries[1].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                ..
            }
        ));
        assert!(matches!(entries[3].ty, wgpu::BindingType::Sampler(_)));
        assert_eq!(entries[2].visibility, FS);
    }

    const SHADER: &str = r#"
struct Uniforms { view_proj: mat4x4<f32> }
struct Other { value: f32 }

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(0) @binding(1) var<storage, read> positions: array<f32>;
@group(0) @binding(2)
var diffuse: texture_2d<f32>;
@group(0) @binding(3) var linearSampler: sampler;
@group(1) @binding(0) var<uniform> unrelated: Other;
"#;

    fn names(wgsl: &str) -> Vec<(u32, String)> {
        shader_bindings(wgsl)
            .unwrap()
            .into_iter()
            .map(|b| (b.binding, b.name))
            .collect()
    }

    #[test]
    fn shader_bindings_are_parsed() {
        let found = shader_bindings(SHADER).unwrap();
        let summary: Vec<_> = found.iter().map(|b| (b.binding, b.name.as_str(), b.kind)).collect();
        assert_eq!(
            summary,
            vec![
                (0, "uniforms", Some(SlotKind::Uniform)),
                (1, "positions", Some(SlotKind::Storage)),
                (2, "diffuse", Some(SlotKind::Texture)),
                (3, "linearSampler", Some(SlotKind::Sampler)),
            ]
        );
    }

    #[test]
    fn commented_out_declarations_are_ignored() {
        let wgsl = "// @group(0) @binding(4) var old: sampler;\n\
                    /* @group(0) @binding(5) var older: sampler; */\n\
                    @group(0) @binding(0) var a: sampler;";
        assert_eq!(names(wgsl), vec![(0, "a".to_string())]);
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let wgsl = "@binding(0) @group(0) var a: sampler;\n\
                    @binding(1)\n@group(0)\nvar<storage, read> b: array<u32>;";
        assert_eq!(names(wgsl), vec![(0, "a".to_string()), (1, "b".to_string())]);
    }

    #[test]
    fn invalid_wgsl_is_a_parse_error() {
        let err = shader_bindings("@group(0) @binding(0) var a: NoSuchType;").unwrap_err();
        assert!(matches!(err, RenderError::ShaderParse(_)));
        assert!(table().check_shader("fn broken(").is_err());
    }

    #[test]
    fn check_shader_accepts_matching_interface() {
        table().check_shader(SHADER).unwrap();
    }

    #[test]
    fn check_shader_rejects_renamed_or_missing_bindings() {
        let renamed = SHADER.replace("diffuse:", "albedo:");
        let err = table().check_shader(&renamed).unwrap_err();
        assert!(err.to_string().contains("albedo"));

        let missing = SHADER.replace("@group(0) @binding(3) var linearSampler: sampler;", "");
        assert!(table().check_shader(&missing).is_err());

        let extra = format!("{SHADER}\n@group(0) @binding(7) var<storage, read> extra: array<u32>;");
        let err = table().check_shader(&extra).unwrap_err();
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn check_shader_rejects_wrong_resource_kind() {
        let as_storage = SHADER.replace(
            "var<uniform> uniforms: Uniforms;",
            "var<storage, read> uniforms: Uniforms;",
        );
        let err = table().check_shader(&as_storage).unwrap_err();
        assert!(err.to_string().contains("Uniform in the table but Storage"));

        let as_sampler = SHADER.replace("var diffuse: texture_2d<f32>;", "var diffuse: sampler;");
        assert!(matches!(
            table().check_shader(&as_sampler),
            Err(RenderError::ShaderInterface { .. })
        ));
    }

    #[test]
    fn check_shader_rejects_writable_storage() {
        let writable = SHADER.replace("var<storage, read> positions", "var<storage, read_write> positions");
        let err = table().check_shader(&writable).unwrap_err();
        assert!(err.to_string().contains("writable"));
    }

    #[test]
    fn slot_kinds_accept_matching_resources() {
        assert!(SlotKind::Uniform.accepts(ResourceKind::Buffer));
        assert!(SlotKind::Storage.accepts(ResourceKind::Buffer));
        assert!(!SlotKind::Texture.accepts(ResourceKind::Sampler));
        assert!(!SlotKind::Sampler.accepts(ResourceKind::Other));
    }
}
