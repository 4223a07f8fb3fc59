use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::annotation::InjuryRecord;
use crate::atlas::RegionAtlas;
use crate::geometry::SurfaceSize;
use crate::render::RenderStyle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidthClass {
    Compact,
    Regular,
    Wide,
}

/// Viewport-width buckets and the surface size used for each.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResponsiveLayout {
    pub compact_max: f32,
    pub regular_max: f32,
    pub compact: SurfaceSize,
    pub regular: SurfaceSize,
    pub wide: SurfaceSize,
}

impl Default for ResponsiveLayout {
    fn default() -> Self {
        Self {
            compact_max: 768.0,
            regular_max: 1024.0,
            compact: SurfaceSize::new(300.0, 450.0),
            regular: SurfaceSize::new(400.0, 600.0),
            wide: SurfaceSize::new(500.0, 750.0),
        }
    }
}

impl ResponsiveLayout {
    pub fn width_class(&self, viewport_width: f32) -> WidthClass {
        if viewport_width < self.compact_max {
            WidthClass::Compact
        } else if viewport_width < self.regular_max {
            WidthClass::Regular
        } else {
            WidthClass::Wide
        }
    }

    pub fn surface_size(&self, viewport_width: f32) -> SurfaceSize {
        match self.width_class(viewport_width) {
            WidthClass::Compact => self.compact,
            WidthClass::Regular => self.regular,
            WidthClass::Wide => self.wide,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub background_path: Option<PathBuf>,
    pub atlas_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    pub initial_injuries_path: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub style: RenderStyle,
    pub layout: ResponsiveLayout,
}

impl Settings {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "bodymap", "bodymap")
    }

    fn file_path() -> Option<PathBuf> {
        let dirs = Self::project_dirs()?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir).ok()?;
        Some(config_dir.join("settings.json"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("cannot parse settings in {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The configured atlas, or the built-in silhouette when none is set.
    pub fn atlas(&self) -> Result<RegionAtlas> {
        let Some(path) = self.atlas_path.as_ref() else {
            return Ok(RegionAtlas::body());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read atlas from {}", path.display()))?;
        RegionAtlas::from_json(&raw).with_context(|| format!("invalid atlas {}", path.display()))
    }

    pub fn initial_injuries(&self) -> Result<Vec<InjuryRecord>> {
        let Some(path) = self.initial_injuries_path.as_ref() else {
            return Ok(Vec::new());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read injuries from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("cannot parse injuries in {}", path.display()))
    }

    pub fn export_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = self.export_dir.clone() {
            return Some(dir);
        }
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::{ResponsiveLayout, Settings, WidthClass};
    use crate::geometry::SurfaceSize;

    #[test]
    fn breakpoints_pick_surface_size() {
        let layout = ResponsiveLayout::default();
        assert_eq!(layout.width_class(375.0), WidthClass::Compact);
        assert_eq!(layout.surface_size(375.0), SurfaceSize::new(300.0, 450.0));
        assert_eq!(layout.width_class(768.0), WidthClass::Regular);
        assert_eq!(layout.surface_size(1000.0), SurfaceSize::new(400.0, 600.0));
        assert_eq!(layout.width_class(1024.0), WidthClass::Wide);
        assert_eq!(layout.surface_size(1920.0), SurfaceSize::new(500.0, 750.0));
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{ "style": { "marker_radius": 8.0 }, "layout": { "compact_max": 600.0 } }"#,
        )
        .expect("settings json");
        assert_eq!(settings.style.marker_radius, 8.0);
        assert_eq!(settings.style.label_font_size, 12.0);
        assert_eq!(settings.layout.compact_max, 600.0);
        assert_eq!(settings.layout.regular_max, 1024.0);
        assert!(settings.background_path.is_none());
    }

    #[test]
    fn missing_atlas_path_uses_builtin_body() {
        let settings = Settings::default();
        let atlas = settings.atlas().expect("builtin atlas");
        assert!(atlas.get("chest").is_some());
        assert!(settings.initial_injuries().expect("no seed").is_empty());
    }

    #[test]
    fn settings_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!(
            "bodymap-settings-{}.json",
            std::process::id()
        ));
        let mut settings = Settings::default();
        settings.style.stroke_width = 2.5;
        std::fs::write(&path, serde_json::to_string_pretty(&settings).expect("json"))
            .expect("write settings");

        let loaded = Settings::load_from(&path).expect("load settings");
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.style.stroke_width, 2.5);
    }
}
