pub mod attachments;
pub mod bindings;
pub mod cache;
pub mod context;
pub mod objects;
pub mod passes;
pub mod pipeline_builder;
pub mod profiler;
pub mod scene;
pub mod uniforms;

pub use attachments::{AttachmentLoad, FrameAttachments, DEPTH_FORMAT, HDR_FORMAT};
pub use bindings::{BindingDescriptor, BindingSlot, BindingSlotTable, ShaderBinding, SlotKind};
pub use cache::BindingsCache;
pub use context::PassCtx;
pub use objects::{DrawnMeshlet, DrawnMeshletList, GpuMeshlet, MeshletMeshData, MeshletObject};
pub use passes::{MeshletRasterizer, RasterPath, RasterizeHwPass, RasterizeStats, RasterizerSplit};
pub use profiler::GpuProfiler;
pub use scene::{SceneResources, SceneTextures};
pub use uniforms::{GlobalUniforms, RenderUniforms};
