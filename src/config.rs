/// Render settings loaded from TOML
use crate::rendering::encoder::ColorMode;
use glam::Vec3;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading [`RenderSettings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSettings {
    pub color_mode: ColorMode,
    /// Sky color at full daylight, linear RGB.
    pub sky_color: [f32; 3],
    /// Distance at which fog reaches full strength.
    pub render_distance: f32,
    /// Fog strength in [0, 1].
    pub fog: f32,
    /// Disable backface culling for opaque materials.
    pub show_both_faces: bool,
    pub vignette: bool,
    pub debug_info: bool,
    /// Target frame rate for the caller's pacing loop.
    pub fps: u32,
    /// Render at `width` x `height` instead of the terminal size.
    pub fixed_window_size: bool,
    pub width: usize,
    pub height: usize,
    pub cursor_visible: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Full,
            sky_color: [0.486, 0.882, 1.0],
            render_distance: 100.0,
            fog: 0.5,
            show_both_faces: false,
            vignette: true,
            debug_info: false,
            fps: 24,
            fixed_window_size: false,
            width: 80,
            height: 24,
            cursor_visible: false,
        }
    }
}

impl RenderSettings {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load `path`, falling back to defaults when it is missing or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => {
                log::info!("loaded settings from {}", path.display());
                settings
            }
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::info!("{} not found, using default settings", path.display());
                Self::default()
            }
            Err(err) => {
                log::warn!("{}, using default settings", err);
                Self::default()
            }
        }
    }

    #[inline]
    pub fn sky_color(&self) -> Vec3 {
        Vec3::from_array(self.sky_color)
    }

    /// Frame budget implied by `fps`.
    pub fn frame_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}
