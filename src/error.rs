//! Error types for pass construction and per-frame recording.
//!
//! Errors fall in two classes. Construction errors (a pipeline that cannot be
//! built, a binding set that does not match its layout) are fatal for the
//! pass and surface at startup. Transient errors (an object whose textures or
//! buffers are still loading) only skip that object for the current frame.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// The assembled binding list does not match the pipeline's slot table.
    #[error("{pass}: binding mismatch for '{object}': {reason}")]
    BindingMismatch {
        pass: &'static str,
        object: String,
        reason: String,
    },

    /// A binding slot name was looked up that the table does not declare.
    #[error("unknown binding slot '{0}'")]
    UnknownSlot(String),

    /// The slot table disagrees with the `@binding` declarations of the shader.
    #[error("{pass}: shader interface mismatch: {reason}")]
    ShaderInterface { pass: &'static str, reason: String },

    /// The pass shader is not valid WGSL.
    #[error("shader failed to parse: {0}")]
    ShaderParse(String),

    /// The requested color format cannot be used as a render attachment.
    #[error("{pass}: unsupported output format {format:?}")]
    UnsupportedFormat {
        pass: &'static str,
        format: wgpu::TextureFormat,
    },

    /// wgpu reported a validation error while building shader or pipeline.
    #[error("{pass}: pipeline creation failed: {reason}")]
    PipelineCreation { pass: &'static str, reason: String },

    /// Mesh data handed to object creation is internally inconsistent.
    #[error("invalid meshlet data for '{object}': {reason}")]
    InvalidMeshData { object: String, reason: String },

    /// A resource the object needs is not uploaded yet. Retried next frame.
    #[error("object '{object}' is not ready: missing {resource}")]
    ResourceNotReady { object: String, resource: String },
}

impl RenderError {
    /// Returns true for errors that only skip an object for the current frame.
    pub fn is_transient(&self) -> bool {
        matches!(self, RenderError::ResourceNotReady { .. })
    }
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
