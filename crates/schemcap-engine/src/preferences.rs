//! User preferences.
//!
//! Stored as pretty-printed JSON in `~/.schemcap/preferences.json`. A
//! missing file is not an error: defaults are used and written back so the
//! user has something to edit.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use schemcap_netlist::{join_attrs, Attr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kinds::SymbolStyle;

const PREFERENCES_DIR: &str = ".schemcap";
const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid preferences in {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Which nodes get a name label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelNodes {
    #[default]
    None,
    All,
    Alpha,
    Pins,
    Primary,
}

/// Which nodes get a dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawNodes {
    None,
    #[default]
    Connections,
    Primary,
    All,
}

/// What is written next to each component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelCpts {
    #[serde(rename = "none")]
    None,
    #[default]
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "value")]
    Value,
    #[serde(rename = "value+name")]
    ValueName,
}

macro_rules! option_str {
    ($ty:ident { $($variant:ident => $s:literal),* $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s,)*
                }
            }
        }
    };
}

option_str!(LabelNodes { None => "none", All => "all", Alpha => "alpha", Pins => "pins", Primary => "primary" });
option_str!(DrawNodes { None => "none", Connections => "connections", Primary => "primary", All => "all" });
option_str!(LabelCpts { None => "none", Name => "name", Value => "value", ValueName => "value+name" });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
    pub style: SymbolStyle,
    pub label_nodes: LabelNodes,
    pub draw_nodes: DrawNodes,
    pub label_cpts: LabelCpts,
    pub node_size: f64,
    pub node_color: String,
    /// `on` or `off`.
    pub grid: String,
    #[serde(rename = "lw")]
    pub line_width: f64,
    /// Distance between the nodes of a size 1 component.
    pub node_spacing: f64,
    pub grid_spacing: f64,
    pub snap_grid: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            style: SymbolStyle::American,
            label_nodes: LabelNodes::None,
            draw_nodes: DrawNodes::Connections,
            label_cpts: LabelCpts::Name,
            node_size: 0.15,
            node_color: "black".to_string(),
            grid: "on".to_string(),
            line_width: 1.2,
            node_spacing: 2.0,
            grid_spacing: 0.5,
            snap_grid: true,
        }
    }
}

impl Preferences {
    /// `~/.schemcap/preferences.json`
    pub fn default_path() -> Result<PathBuf, PreferencesError> {
        let home = dirs::home_dir().ok_or(PreferencesError::NoHomeDir)?;
        Ok(home.join(PREFERENCES_DIR).join(PREFERENCES_FILE))
    }

    pub fn load() -> Result<Self, PreferencesError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, PreferencesError> {
        if !path.exists() {
            info!("Creating default preferences at {}", path.display());
            let preferences = Self::default();
            preferences.save_to(path)?;
            return Ok(preferences);
        }

        let text = fs::read_to_string(path).map_err(|source| PreferencesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let preferences = serde_json::from_str(&text).map_err(|source| PreferencesError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded preferences from {}", path.display());
        Ok(preferences)
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), PreferencesError> {
        let io_error = |source| PreferencesError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| PreferencesError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(io_error)
    }

    /// Options written on the last line of a saved schematic.
    pub fn schematic_options(&self) -> Vec<Attr> {
        let mut options = vec![
            Attr::pair("draw_nodes", self.draw_nodes.as_str()),
            Attr::pair("label_nodes", self.label_nodes.as_str()),
            Attr::pair("style", self.style.as_str()),
        ];
        match self.label_cpts {
            LabelCpts::None => {}
            LabelCpts::Name => options.push(Attr::pair("label_ids", "true")),
            LabelCpts::Value => options.push(Attr::pair("label_values", "true")),
            LabelCpts::ValueName => {
                options.push(Attr::pair("label_ids", "true"));
                options.push(Attr::pair("label_values", "true"));
            }
        }
        options
    }

    pub fn schematic_preferences(&self) -> String {
        join_attrs(&self.schematic_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_schematic_preferences() {
        let mut prefs = Preferences::default();
        assert_eq!(
            prefs.schematic_preferences(),
            "draw_nodes=connections, label_nodes=none, style=american, label_ids=true"
        );

        prefs.label_cpts = LabelCpts::ValueName;
        prefs.style = SymbolStyle::European;
        assert_eq!(
            prefs.schematic_preferences(),
            "draw_nodes=connections, label_nodes=none, style=european, label_ids=true, label_values=true"
        );

        prefs.label_cpts = LabelCpts::None;
        assert!(!prefs.schematic_preferences().contains("label_"));
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(PREFERENCES_FILE);

        let prefs = Preferences::load_from(&path).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PREFERENCES_FILE);

        let prefs = Preferences {
            style: SymbolStyle::British,
            label_cpts: LabelCpts::Value,
            snap_grid: false,
            ..Default::default()
        };
        prefs.save_to(&path).unwrap();
        assert_eq!(Preferences::load_from(&path).unwrap(), prefs);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"label_cpts\": \"value\""));
        assert!(text.contains("\"lw\": 1.2"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PREFERENCES_FILE);
        fs::write(&path, r#"{"style": "european"}"#).unwrap();

        let prefs = Preferences::load_from(&path).unwrap();
        assert_eq!(prefs.style, SymbolStyle::European);
        assert_eq!(prefs.node_spacing, 2.0);
    }

    #[test]
    fn test_unknown_style_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PREFERENCES_FILE);
        fs::write(&path, r#"{"style": "gothic"}"#).unwrap();

        assert!(matches!(
            Preferences::load_from(&path),
            Err(PreferencesError::Parse { .. })
        ));
    }
}
