//! Render-pass orchestration and resource binding for meshlet rendering.
//!
//! Objects own their GPU buffers and describe their own bindings; passes
//! own one pipeline each plus a per-object bind group cache, and record
//! indirect draws into attachments shared by every pass of the frame.

pub mod camera;
pub mod error;
pub mod renderer;
pub mod settings;

pub use camera::{BoundingBox, Camera, CameraInput, Directions};
pub use error::{RenderError, Result};
pub use settings::RenderSettings;

/// Installs the `env_logger` backend, `info` unless `RUST_LOG` says otherwise.
/// Calling it more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
