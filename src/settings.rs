use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Immutable configuration snapshot handed to every pass through `PassCtx`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "RenderSettings::default_clear_color")]
    pub clear_color: [f32; 3],
    #[serde(default)]
    pub software_rasterizer: SoftwareRasterizerSettings,
    #[serde(default)]
    pub impostors: ImpostorSettings,
    #[serde(default)]
    pub nanite: NaniteSettings,
    #[serde(default)]
    pub camera: CameraSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: Self::default_clear_color(),
            software_rasterizer: SoftwareRasterizerSettings::default(),
            impostors: ImpostorSettings::default(),
            nanite: NaniteSettings::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                warn!(
                    "Failed to parse {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let settings = serde_json::from_str::<RenderSettings>(contents)?;
        Ok(settings.validate())
    }

    fn validate(mut self) -> Self {
        // Thresholds are magnitudes; a sign typed into a config file is ignored.
        let sw = &mut self.software_rasterizer;
        sw.threshold = sw.threshold.abs();
        if !sw.threshold.is_finite() {
            warn!("Software rasterizer threshold must be finite. Using default value.");
            sw.threshold = SoftwareRasterizerSettings::default().threshold;
        }
        if sw.threshold == 0.0 {
            sw.enabled = false;
        }

        self.impostors.billboard_threshold = self.impostors.billboard_threshold.abs();
        if self.impostors.texture_size == 0 {
            warn!("Impostor texture size must be greater than zero. Using default value.");
            self.impostors.texture_size = ImpostorSettings::default().texture_size;
        }

        self.nanite.error_threshold = self.nanite.error_threshold.abs();

        let camera = &mut self.camera;
        if !(camera.fov_y_degrees > 0.0 && camera.fov_y_degrees < 180.0) {
            warn!(
                "Camera field of view {} is out of range. Using default value.",
                camera.fov_y_degrees
            );
            camera.fov_y_degrees = CameraSettings::default().fov_y_degrees;
        }
        if camera.near <= 0.0 || camera.far <= camera.near {
            warn!("Camera clip planes are invalid. Using default near/far.");
            camera.near = CameraSettings::default().near;
            camera.far = CameraSettings::default().far;
        }

        self
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b] = self.clear_color;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }

    const fn default_clear_color() -> [f32; 3] {
        [0.2, 0.2, 0.2]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftwareRasterizerSettings {
    pub enabled: bool,
    /// Projected meshlet size (pixels) below which the compute path takes over.
    pub threshold: f32,
}

impl Default for SoftwareRasterizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 16.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpostorSettings {
    pub billboard_threshold: f32,
    pub texture_size: u32,
    pub force_only_billboards: bool,
}

impl Default for ImpostorSettings {
    fn default() -> Self {
        Self {
            billboard_threshold: 2000.0,
            texture_size: 512,
            force_only_billboards: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NaniteSettings {
    pub error_threshold: f32,
}

impl Default for NaniteSettings {
    fn default() -> Self {
        Self {
            error_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub movement_speed: f32,
    pub rotation_speed: f32,
}

impl CameraSettings {
    pub fn fov_y_radians(&self) -> f32 {
        self.fov_y_degrees.to_radians()
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            target: [0.0, 0.0, 0.0],
            fov_y_degrees: 60.0,
            near: 0.01,
            far: 100.0,
            movement_speed: 1.0,
            rotation_speed: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let settings = RenderSettings::from_json("{}").unwrap();
        assert_eq!(settings.clear_color, [0.2, 0.2, 0.2]);
        assert!(settings.software_rasterizer.enabled);
        assert_eq!(settings.impostors.texture_size, 512);
        assert_eq!(settings.camera.fov_y_degrees, 60.0);
    }

    #[test]
    fn zero_threshold_disables_software_rasterizer() {
        let settings = RenderSettings::from_json(
            r#"{ "software_rasterizer": { "enabled": true, "threshold": 0.0 } }"#,
        )
        .unwrap();
        assert!(!settings.software_rasterizer.enabled);
    }

    #[test]
    fn negative_thresholds_become_magnitudes() {
        let settings = RenderSettings::from_json(
            r#"{
                "software_rasterizer": { "enabled": true, "threshold": -500.0 },
                "impostors": { "billboard_threshold": -10.0, "texture_size": 256, "force_only_billboards": true },
                "nanite": { "error_threshold": -0.5 }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.software_rasterizer.threshold, 500.0);
        assert_eq!(settings.impostors.billboard_threshold, 10.0);
        assert!(settings.impostors.force_only_billboards);
        assert_eq!(settings.nanite.error_threshold, 0.5);
    }

    #[test]
    fn validate_replaces_invalid_camera_values() {
        let mut settings = RenderSettings::default();
        settings.camera.fov_y_degrees = 0.0;
        settings.camera.near = 5.0;
        settings.camera.far = 1.0;
        settings.impostors.texture_size = 0;

        let validated = settings.validate();
        let defaults = CameraSettings::default();
        assert_eq!(validated.camera.fov_y_degrees, defaults.fov_y_degrees);
        assert_eq!(validated.camera.near, defaults.near);
        assert_eq!(validated.camera.far, defaults.far);
        assert_eq!(validated.impostors.texture_size, 512);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RenderSettings::from_json("{ not json").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = RenderSettings::load_from_path("definitely/not/here/settings.json");
        assert!(settings.software_rasterizer.enabled);
        assert_eq!(settings.camera.movement_speed, 1.0);
    }

    #[test]
    fn clear_color_is_opaque() {
        let color = RenderSettings::default().clear_color();
        assert_eq!(color.a, 1.0);
        assert!((color.r - 0.2).abs() < 1e-6);
    }
}
