//! Configuration system for the window core
//!
//! Loads configuration from TOML file at `~/.config/area-core/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::shared::Geometry;
use crate::wm::focus::FocusPolicy;
use crate::wm::placement::PlacementPolicy;
use crate::wm::rules::Rules;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decorations: DecorationConfig,
    pub behavior: BehaviorConfig,
    pub electric_border: ElectricBorderConfig,
    pub move_resize: MoveResizeConfig,
    pub desktops: DesktopConfig,
    pub outputs: Vec<OutputConfig>,
    pub effects: EffectsConfig,
    pub session: SessionConfig,
    pub palettes: Vec<PaletteConfig>,
    pub rules: Vec<Rules>,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::default().save_to(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        match Self::load_from(&config_path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Falling back to default config: {:#}", e);
                Ok(Self::default())
            }
        }
    }

    /// Load and parse a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area-core");

        Ok(config_dir.join("config.toml"))
    }

    /// Write this configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        info!("Wrote config file at {:?}", path);
        Ok(())
    }

    /// Output rectangles, or a single 1920x1080 output when none configured
    pub fn output_geometries(&self) -> Vec<(String, Geometry)> {
        if self.outputs.is_empty() {
            return vec![("default".to_string(), Geometry::new(0, 0, 1920, 1080))];
        }
        self.outputs
            .iter()
            .map(|o| (o.name.clone(), Geometry::new(o.x, o.y, o.width, o.height)))
            .collect()
    }
}

/// Window decoration geometry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationConfig {
    /// Titlebar height in pixels
    pub titlebar_height: i32,
    /// Border width in pixels
    pub border_width: i32,
    /// Color scheme used when a window does not name one
    pub palette: String,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            titlebar_height: 32,
            border_width: 2,
            palette: "default".to_string(),
        }
    }
}

/// Window behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub focus_policy: FocusPolicy,
    /// Raise a window when it is clicked
    pub click_raise: bool,
    /// Raise the window under the pointer after a delay
    pub auto_raise: bool,
    pub auto_raise_interval_ms: u64,
    /// Active window is tracked per screen
    pub separate_screen_focus: bool,
    pub placement: PlacementPolicy,
    /// Drop decorations of fully maximized windows
    pub borderless_maximized_windows: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            focus_policy: FocusPolicy::ClickToFocus,
            click_raise: true,
            auto_raise: false,
            auto_raise_interval_ms: 750,
            separate_screen_focus: false,
            placement: PlacementPolicy::Smart,
            borderless_maximized_windows: false,
        }
    }
}

/// Screen edge tiling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectricBorderConfig {
    /// Drag to the left/right edge tiles
    pub tiling: bool,
    /// Drag to the top edge maximizes
    pub maximize: bool,
    /// Fraction of the edge height that counts as a corner
    pub corner_ratio: f64,
    /// Debounce before committing the preview on inner edges
    pub delay_ms: u64,
}

impl Default for ElectricBorderConfig {
    fn default() -> Self {
        Self {
            tiling: true,
            maximize: true,
            corner_ratio: 0.25,
            delay_ms: 250,
        }
    }
}

/// Interactive move/resize configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveResizeConfig {
    /// Press time before a titlebar click becomes a drag
    pub start_drag_time_ms: u64,
    /// Allow moving windows so the titlebar leaves the screen
    pub unrestricted_move_resize: bool,
    /// Snap distances in pixels, 0 disables
    pub border_snap_zone: i32,
    pub window_snap_zone: i32,
    pub center_snap_zone: i32,
}

impl Default for MoveResizeConfig {
    fn default() -> Self {
        Self {
            start_drag_time_ms: 500,
            unrestricted_move_resize: false,
            border_snap_zone: 10,
            window_snap_zone: 10,
            center_snap_zone: 0,
        }
    }
}

/// Virtual desktop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    pub count: u32,
    pub names: Vec<String>,
    pub rows: u32,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            count: 4,
            names: Vec::new(),
            rows: 1,
        }
    }
}

/// Output (monitor) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Effects configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Keep closed windows as remnants for closing animations
    pub remnants: bool,
    /// How long a remnant keeps references to its live leads
    pub annexed_timeout_ms: u64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            remnants: true,
            annexed_timeout_ms: 100,
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session file override; defaults to the data directory
    pub path: Option<PathBuf>,
}

/// Named decoration color scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    pub name: String,
    #[serde(default)]
    pub colors: WindowColors,
}

/// Window colors configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowColors {
    /// Titlebar color of the active window (hex: 0xRRGGBB)
    pub active_titlebar: u32,
    /// Titlebar color of inactive windows (hex: 0xRRGGBB)
    pub inactive_titlebar: u32,
    /// Border color (hex: 0xRRGGBB)
    pub border: u32,
    /// Title text color (hex: 0xRRGGBB)
    pub text: u32,
}

impl Default for WindowColors {
    fn default() -> Self {
        // Nord Theme Colors
        Self {
            active_titlebar: 0x3b4252,
            inactive_titlebar: 0x2e3440,
            border: 0x5e81ac,
            text: 0xeceff4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [behavior]
            click_raise = false

            [electric_border]
            corner_ratio = 0.1
            "#,
        )
        .unwrap();
        assert!(!config.behavior.click_raise);
        assert_eq!(config.behavior.auto_raise_interval_ms, 750);
        assert_eq!(config.electric_border.corner_ratio, 0.1);
        assert_eq!(config.electric_border.delay_ms, 250);
        assert_eq!(config.decorations, DecorationConfig::default());
    }

    #[test]
    fn default_output_when_none_configured() {
        let config = Config::default();
        assert_eq!(
            config.output_geometries(),
            vec![("default".to_string(), Geometry::new(0, 0, 1920, 1080))]
        );
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.desktops.count = 6;
        config.outputs.push(OutputConfig {
            name: "DP-1".into(),
            x: 0,
            y: 0,
            width: 2560,
            height: 1440,
            scale: 1.0,
        });
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn rules_parse_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [[rules]]
            app_id = "term"
            above = { policy = "force", value = true }
            "#,
        )
        .unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].app_id.as_deref(), Some("term"));
        assert!(config.rules[0].above.value);
    }
}
