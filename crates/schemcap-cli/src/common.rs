use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::debug;
use schemcap_engine::{Circuit, CircuitConfig, ComponentRegistry, Position, Preferences};

/// Options shared by every command that reads or writes schematics.
#[derive(Args, Debug, Default, Clone)]
pub struct PreferenceArgs {
    /// Preferences file. Defaults to ~/.schemcap/preferences.json.
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub preferences: Option<PathBuf>,
}

impl PreferenceArgs {
    pub fn load(&self) -> Result<Preferences> {
        let preferences = match &self.preferences {
            Some(path) => Preferences::load_from(path),
            None => Preferences::load(),
        };
        preferences.context("Failed to load preferences")
    }
}

pub fn read_circuit<'r>(
    path: &Path,
    registry: &'r ComponentRegistry,
    preferences: &Preferences,
) -> Result<Circuit<'r>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    debug!("Loading schematic {}", path.display());
    Circuit::from_schematic(&text, registry, CircuitConfig::from(preferences))
        .with_context(|| format!("Failed to load schematic {}", path.display()))
}

/// Write to `path`, or stdout when there is none.
pub fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

/// `x,y`
pub fn parse_point(s: &str) -> Result<Position, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let coordinate = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid coordinate `{v}` in `{s}`"))
    };
    Ok(Position::new(coordinate(x)?, coordinate(y)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1.5, -2"), Ok(Position::new(1.5, -2.0)));
        assert!(parse_point("1.5").is_err());
        assert!(parse_point("a,2").is_err());
    }
}
