//! Schematic documents.
//!
//! A schematic is a netlist with two kinds of comment lines understood by the
//! editor: a `; nodes={...}` line recording where each node was drawn, and a
//! trailing `; key=value, ...` line carrying drawing preferences.
//!
//! ```text
//! # Created by schemcap V0.1.0
//! ; nodes={1@(0, 0), 2@(2, 0), 0@(2, -2)}
//! R1 1 2; right
//! W 2 0; down, ground
//! ; draw_nodes=connections, label_nodes=none, style=american, label_ids=true
//! ```

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{format_number, join_attrs, parse_attrs, split_top_level, Attr, NetItem, NetlistError};

/// Number of decimals kept when writing node coordinates.
const POSITION_DECIMALS: i32 = 6;

/// Position of a named node, as written in the `; nodes={...}` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl NodePosition {
    pub fn new<S: Into<String>>(name: S, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }
}

impl fmt::Display for NodePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@({}, {})",
            self.name,
            format_number(self.x, POSITION_DECIMALS),
            format_number(self.y, POSITION_DECIMALS)
        )
    }
}

impl FromStr for NodePosition {
    type Err = NetlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NetlistError::InvalidNodePosition(s.trim().to_string());

        let (name, coords) = s.trim().split_once('@').ok_or_else(invalid)?;
        let coords = coords
            .trim()
            .strip_prefix('(')
            .and_then(|c| c.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let (x, y) = coords.split_once(',').ok_or_else(invalid)?;
        let x: f64 = x.trim().parse().map_err(|_| invalid())?;
        let y: f64 = y.trim().parse().map_err(|_| invalid())?;

        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(NodePosition::new(name, x, y))
    }
}

/// A netlist plus the editor's node positions and drawing options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schematic {
    /// Text of the leading `#` comment, without the `#`.
    pub header: Option<String>,
    pub nodes: Vec<NodePosition>,
    pub items: Vec<NetItem>,
    /// Options from `;` comment lines other than the node line.
    pub options: Vec<Attr>,
}

impl Schematic {
    pub fn parse(text: &str) -> Result<Self, NetlistError> {
        let mut schematic = Schematic::default();

        for (index, line) in text.lines().enumerate() {
            let at_line = |source: NetlistError| NetlistError::Line {
                line: index + 1,
                source: Box::new(source),
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix('#') {
                if schematic.header.is_none() && schematic.items.is_empty() {
                    schematic.header = Some(comment.trim().to_string());
                } else {
                    debug!("Ignoring comment on line {}", index + 1);
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix(';') {
                let rest = rest.trim();
                if let Some(nodes) = rest.strip_prefix("nodes=") {
                    schematic.nodes.extend(parse_node_list(nodes).map_err(at_line)?);
                } else {
                    schematic.options.extend(parse_attrs(rest).map_err(at_line)?);
                }
                continue;
            }

            schematic.items.push(NetItem::parse(line).map_err(at_line)?);
        }

        Ok(schematic)
    }

    /// Serialize the schematic to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Schematic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(header) = &self.header {
            writeln!(f, "# {header}")?;
        }
        if !self.nodes.is_empty() {
            let nodes: Vec<String> = self.nodes.iter().map(ToString::to_string).collect();
            writeln!(f, "; nodes={{{}}}", nodes.join(", "))?;
        }
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        if !self.options.is_empty() {
            writeln!(f, "; {}", join_attrs(&self.options))?;
        }
        Ok(())
    }
}

impl FromStr for Schematic {
    type Err = NetlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Schematic::parse(s)
    }
}

fn parse_node_list(s: &str) -> Result<Vec<NodePosition>, NetlistError> {
    let inner = s
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| NetlistError::InvalidNodePosition(s.trim().to_string()))?;

    split_top_level(inner, ',')?
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}
