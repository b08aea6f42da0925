//! Symbol sketches.
//!
//! A sketch is the SVG drawing of one symbol, stored as
//! `<dir>/<style>/<sketch_key>.svg`. Sketches are parsed once and cached per
//! style. Missing files can be produced on demand by a [`SketchGenerator`],
//! which draws the component's sketch netlist with an external tool.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use schemcap_netlist::NetItem;
use svg::node::element::tag::Type;
use svg::parser::Event;
use thiserror::Error;

use crate::component::Component;
use crate::family::Family;
use crate::kinds::SymbolStyle;

/// Sketch dimensions are in points.
pub const POINTS_TO_CM: f64 = 2.54 / 72.0;

#[derive(Debug, Error)]
pub enum SketchError {
    #[error("Unsupported style `{0}`, must be one of american, british, european")]
    UnsupportedStyle(String),

    #[error("No sketch for `{key}` at {}", .path.display())]
    NotFound { key: String, path: PathBuf },

    #[error("Failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid SVG in {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to generate sketch `{key}`: {reason}")]
    Generator { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SketchPath {
    /// SVG path data.
    pub d: String,
    pub transform: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    pub width: f64,
    pub height: f64,
    pub paths: Vec<SketchPath>,
}

impl Sketch {
    /// Parse an SVG drawing. Paths inside `symbol` and `clipPath` elements
    /// are definitions, not strokes, and are skipped.
    pub fn parse(text: &str, path: &Path) -> Result<Self, SketchError> {
        let parse_error = |reason: String| SketchError::Parse {
            path: path.to_path_buf(),
            reason,
        };

        let parser = svg::read(text).map_err(|e| parse_error(e.to_string()))?;

        let mut width = None;
        let mut height = None;
        let mut paths = Vec::new();
        let mut hidden_depth = 0usize;

        for event in parser {
            match event {
                Event::Error(error) => return Err(parse_error(error.to_string())),
                Event::Tag("svg", Type::Start | Type::Empty, attributes) if width.is_none() => {
                    width = attributes.get("width").and_then(|v| parse_length(v));
                    height = attributes.get("height").and_then(|v| parse_length(v));
                }
                Event::Tag("symbol" | "clipPath", Type::Start, _) => hidden_depth += 1,
                Event::Tag("symbol" | "clipPath", Type::End, _) => {
                    hidden_depth = hidden_depth.saturating_sub(1)
                }
                Event::Tag("path", Type::Start | Type::Empty, attributes) if hidden_depth == 0 => {
                    let Some(d) = attributes.get("d") else {
                        continue;
                    };
                    paths.push(SketchPath {
                        d: d.to_string(),
                        transform: attributes.get("transform").map(|v| v.to_string()),
                        style: attributes.get("style").map(|v| v.to_string()),
                    });
                }
                _ => {}
            }
        }

        let (Some(width), Some(height)) = (width, height) else {
            return Err(parse_error("missing width or height".to_string()));
        };

        Ok(Self {
            width,
            height,
            paths,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SketchError> {
        let text = fs::read_to_string(path).map_err(|source| SketchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Width and height in centimetres.
    pub fn size_cm(&self) -> (f64, f64) {
        (self.width * POINTS_TO_CM, self.height * POINTS_TO_CM)
    }
}

/// `12.5pt` -> 12.5
fn parse_length(value: &str) -> Option<f64> {
    let number = value
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    number.parse().ok()
}

/// Draws a missing sketch.
pub trait SketchGenerator {
    /// Write an SVG drawing of `net` to `path`.
    fn generate(&self, net: &NetItem, path: &Path) -> Result<(), SketchError>;
}

/// Sketch cache keyed by `(style, sketch_key)`.
pub struct SketchLibrary {
    dir: PathBuf,
    style: SymbolStyle,
    cache: HashMap<(SymbolStyle, String), Sketch>,
    generator: Option<Box<dyn SketchGenerator>>,
}

impl SketchLibrary {
    pub fn new<P: Into<PathBuf>>(dir: P, style: SymbolStyle) -> Self {
        Self {
            dir: dir.into(),
            style,
            cache: HashMap::new(),
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Box<dyn SketchGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn style(&self) -> SymbolStyle {
        self.style
    }

    pub fn set_style(&mut self, style: &str) -> Result<(), SketchError> {
        self.style = style
            .parse()
            .map_err(|_| SketchError::UnsupportedStyle(style.to_string()))?;
        Ok(())
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        sketch_path(&self.dir, self.style, key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Sketch for `key` in the current style. `net` is handed to the
    /// generator when the file does not exist yet.
    pub fn lookup(&mut self, key: &str, net: Option<&NetItem>) -> Result<&Sketch, SketchError> {
        let style = self.style;
        self.lookup_in(style, key, net)
    }

    fn lookup_in(
        &mut self,
        style: SymbolStyle,
        key: &str,
        net: Option<&NetItem>,
    ) -> Result<&Sketch, SketchError> {
        let Self {
            dir,
            cache,
            generator,
            ..
        } = self;

        match cache.entry((style, key.to_string())) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = sketch_path(dir, style, key);
                if !path.exists() {
                    match (generator.as_deref(), net) {
                        (Some(generator), Some(net)) => {
                            info!("Generating sketch {}", path.display());
                            if let Some(parent) = path.parent() {
                                fs::create_dir_all(parent).map_err(|source| SketchError::Io {
                                    path: parent.to_path_buf(),
                                    source,
                                })?;
                            }
                            generator.generate(net, &path)?;
                        }
                        _ => {
                            return Err(SketchError::NotFound {
                                key: key.to_string(),
                                path,
                            })
                        }
                    }
                }
                debug!("Loading sketch {}", path.display());
                Ok(entry.insert(Sketch::load(&path)?))
            }
        }
    }

    /// Sketch of a component's symbol. A component with its own style is
    /// looked up in that style's directory.
    pub fn lookup_component(
        &mut self,
        component: &Component,
        family: &Family,
    ) -> Result<&Sketch, SketchError> {
        let style = component.style.unwrap_or(self.style);
        let key = component.sketch_key();
        let net = component.sketch_net(family);
        self.lookup_in(style, &key, Some(&net))
    }
}

fn sketch_path(dir: &Path, style: SymbolStyle, key: &str) -> PathBuf {
    dir.join(style.as_str()).join(format!("{key}.svg"))
}
