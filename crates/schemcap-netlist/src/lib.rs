//! Netlist grammar shared with the circuit-analysis engine.
//!
//! A netlist is a sequence of lines, one per component:
//!
//! ```text
//! R1 1 2 10; right, color=blue
//! E1 3 4 opamp 1 2; right, mirror
//! ```
//!
//! Everything before the first `;` is the component name followed by its
//! fields (node names and positional arguments). Everything after it is a
//! comma separated attribute list. The analysis engine reading this format
//! is not under our control, so the `Display` impl of [`NetItem`] reproduces
//! a line exactly, attribute order included.
//!
//! [`Schematic`] wraps a list of net items together with the node positions
//! and preference comment lines written by the editor.

pub mod schematic;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use schematic::{NodePosition, Schematic};

/// Errors raised while reading netlist text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetlistError {
    #[error("Empty net item")]
    Empty,

    #[error("Invalid component name `{0}`")]
    InvalidName(String),

    #[error("Net item `{0}` has no fields")]
    MissingFields(String),

    #[error("Unbalanced delimiters in `{0}`")]
    Unbalanced(String),

    #[error("Invalid node position `{0}`")]
    InvalidNodePosition(String),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<NetlistError>,
    },
}

/// A single attribute from the list following the `;` of a net item.
///
/// Attributes are either bare flags (`mirror`, `ground`) or `key=value`
/// pairs (`color=blue`, `rotate=45`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attr {
    pub key: String,
    pub value: Option<String>,
}

impl Attr {
    pub fn flag<K: Into<String>>(key: K) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn pair<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn is_flag(&self) -> bool {
        self.value.is_none()
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => write!(f, "{}", self.key),
        }
    }
}

impl FromStr for Attr {
    type Err = NetlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NetlistError::Empty);
        }
        Ok(match s.split_once('=') {
            Some((key, value)) => Attr::pair(key.trim(), value.trim()),
            None => Attr::flag(s),
        })
    }
}

/// One netlist line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetItem {
    /// Component name, e.g. `R1`.
    pub name: String,
    /// Node names and positional arguments, in netlist order.
    pub fields: Vec<String>,
    /// Attributes, in netlist order.
    pub attrs: Vec<Attr>,
}

impl NetItem {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn field<S: Into<String>>(mut self, field: S) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Parse a single netlist line.
    pub fn parse(line: &str) -> Result<Self, NetlistError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(NetlistError::Empty);
        }

        let (head, tail) = match line.split_once(';') {
            Some((head, tail)) => (head, Some(tail)),
            None => (line, None),
        };

        let mut tokens = split_fields(head)?.into_iter();
        let name = tokens.next().ok_or(NetlistError::Empty)?;
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(NetlistError::InvalidName(name));
        }
        let fields: Vec<String> = tokens.collect();
        if fields.is_empty() {
            return Err(NetlistError::MissingFields(name));
        }

        let attrs = match tail {
            Some(tail) => parse_attrs(tail)?,
            None => Vec::new(),
        };

        Ok(Self {
            name,
            fields,
            attrs,
        })
    }

}

impl fmt::Display for NetItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for field in &self.fields {
            write!(f, " {field}")?;
        }
        if !self.attrs.is_empty() {
            write!(f, "; {}", join_attrs(&self.attrs))?;
        }
        Ok(())
    }
}

impl FromStr for NetItem {
    type Err = NetlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetItem::parse(s)
    }
}

/// Parse a comma separated attribute list. Commas nested inside braces,
/// parentheses or double quotes do not split.
pub fn parse_attrs(s: &str) -> Result<Vec<Attr>, NetlistError> {
    split_top_level(s, ',')?
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

pub fn join_attrs(attrs: &[Attr]) -> String {
    attrs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a number the way it appears in netlists: rounded to `decimals`
/// places with trailing zeros (and a trailing point) removed.
pub fn format_number(value: f64, decimals: i32) -> String {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Never print "-0".
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}

/// Split on `sep` outside of `{}`, `()` and `"..."`.
pub(crate) fn split_top_level(s: &str, sep: char) -> Result<Vec<&str>, NetlistError> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '{' | '(' if !quoted => depth += 1,
            '}' | ')' if !quoted => {
                depth -= 1;
                if depth < 0 {
                    return Err(NetlistError::Unbalanced(s.to_string()));
                }
            }
            c if c == sep && depth == 0 && !quoted => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if depth != 0 || quoted {
        return Err(NetlistError::Unbalanced(s.to_string()));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

/// Split the part of a net item before the `;` into whitespace separated
/// tokens, keeping braced expressions such as `{R * 2}` intact.
fn split_fields(s: &str) -> Result<Vec<String>, NetlistError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for c in s.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(NetlistError::Unbalanced(s.to_string()));
                }
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if depth != 0 {
        return Err(NetlistError::Unbalanced(s.to_string()));
    }
    if !current.is_empty() {
        fields.push(current);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_line() {
        let item = NetItem::parse("R1 1 2; right").unwrap();
        assert_eq!(item.name, "R1");
        assert_eq!(item.fields, vec!["1", "2"]);
        assert_eq!(item.attrs, vec![Attr::flag("right")]);
    }

    #[test]
    fn test_parse_attributes_with_values() {
        let item = NetItem::parse("C2 3 4 {1e-6}; down=1.5, color=blue, l={C_{load}, 1}").unwrap();
        assert_eq!(item.fields, vec!["3", "4", "{1e-6}"]);
        assert_eq!(
            item.attrs,
            vec![
                Attr::pair("down", "1.5"),
                Attr::pair("color", "blue"),
                Attr::pair("l", "{C_{load}, 1}"),
            ]
        );
    }

    #[test]
    fn test_braced_field_keeps_spaces() {
        let item = NetItem::parse("R1 1 2 {R * 2}; right").unwrap();
        assert_eq!(item.fields, vec!["1", "2", "{R * 2}"]);
    }

    #[test]
    fn test_line_without_attributes() {
        let item = NetItem::parse("W 1 0").unwrap();
        assert!(item.attrs.is_empty());
        assert_eq!(item.to_string(), "W 1 0");
    }

    #[test]
    fn test_display_reproduces_line() {
        let line = "M1 1 2 3 nmos; down, mirror, kind=nfet, style=british";
        assert_eq!(NetItem::parse(line).unwrap().to_string(), line);
    }

    #[test]
    fn test_flags() {
        let item = NetItem::parse("Q1 1 2 3 npn; up, mirror, invert").unwrap();
        assert_eq!(item.attrs[1], Attr::flag("mirror"));
        assert!(item.attrs.iter().all(Attr::is_flag));
    }

    #[test]
    fn test_errors() {
        assert_eq!(NetItem::parse("   "), Err(NetlistError::Empty));
        assert_eq!(
            NetItem::parse("R1; right"),
            Err(NetlistError::MissingFields("R1".to_string()))
        );
        assert!(matches!(
            NetItem::parse("1R 1 2"),
            Err(NetlistError::InvalidName(_))
        ));
        assert!(matches!(
            NetItem::parse("R1 1 2; l={x"),
            Err(NetlistError::Unbalanced(_))
        ));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0, 2), "2");
        assert_eq!(format_number(1.5, 2), "1.5");
        assert_eq!(format_number(0.1 + 0.2, 2), "0.3");
        assert_eq!(format_number(-0.001, 2), "0");
        assert_eq!(format_number(-45.0, 2), "-45");
        assert_eq!(format_number(33.333333, 2), "33.33");
    }
}
