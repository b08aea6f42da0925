//! The component registry.
//!
//! One registry is built at startup and handed to everything that needs to
//! create or recognise components. Construction validates every family's
//! pin tables, so a bad declaration fails loudly before the first
//! component is placed.

use log::debug;
use schemcap_netlist::NetItem;
use thiserror::Error;

use crate::family::{catalogue, Family, Shape, PLACEHOLDER_PIN};
use crate::kinds::Kind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown component type `{0}`")]
    UnknownType(String),

    #[error("Unknown kind `{kind}` for component type `{type_tag}`")]
    UnknownKind { type_tag: String, kind: String },

    #[error("Malformed pin table for `{type_tag}`: {reason}")]
    MalformedPinTable { type_tag: String, reason: String },

    #[error("Component type `{0}` is registered twice")]
    DuplicateType(String),

    #[error("Cannot read `{item}`: {reason}")]
    MalformedItem { item: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    families: Vec<Family>,
}

impl ComponentRegistry {
    /// Registry with the full family catalogue.
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_families(catalogue())
    }

    pub fn with_families(families: Vec<Family>) -> Result<Self, RegistryError> {
        let mut registry = Self {
            families: Vec::with_capacity(families.len()),
        };
        for family in families {
            registry.register(family)?;
        }
        debug!("Registered {} component families", registry.families.len());
        Ok(registry)
    }

    pub fn register(&mut self, family: Family) -> Result<(), RegistryError> {
        if self.families.iter().any(|f| f.type_tag == family.type_tag) {
            return Err(RegistryError::DuplicateType(family.type_tag.to_string()));
        }
        validate(&family)?;
        self.families.push(family);
        Ok(())
    }

    pub fn get(&self, type_tag: &str) -> Result<&Family, RegistryError> {
        self.families
            .iter()
            .find(|family| family.type_tag == type_tag)
            .ok_or_else(|| RegistryError::UnknownType(type_tag.to_string()))
    }

    pub fn families(&self) -> impl Iterator<Item = &Family> {
        self.families.iter()
    }

    /// Resolve `kind` (hyphenated, symbol-only or cpt-only form) for a
    /// family. An empty string selects the family default.
    pub fn kind(&self, family: &Family, kind: &str) -> Result<Kind, RegistryError> {
        if kind.trim().is_empty() {
            return Ok(family.default_kind());
        }
        Kind::parse(kind, family.kinds).ok_or_else(|| RegistryError::UnknownKind {
            type_tag: family.type_tag.to_string(),
            kind: kind.to_string(),
        })
    }

    /// Family of a parsed net item: amplifiers are recognised by their
    /// keyword, everything else by the longest matching name prefix.
    pub fn family_for_item(&self, item: &NetItem) -> Result<&Family, RegistryError> {
        if let Some(keyword) = item.fields.get(2) {
            if let Some(family) = self
                .families
                .iter()
                .find(|family| family.keyword == Some(keyword.as_str()))
            {
                return Ok(family);
            }
        }

        self.families
            .iter()
            .filter(|family| family.keyword.is_none() && family.shape != Shape::DynamicWire)
            .filter(|family| item.name.starts_with(family.name_prefix))
            .max_by_key(|family| family.name_prefix.len())
            .ok_or_else(|| RegistryError::UnknownType(item.name.clone()))
    }

    /// `<prefix><n>` with the smallest `n >= 1` not rejected by `taken`.
    pub fn choose_name<F: Fn(&str) -> bool>(&self, family: &Family, taken: F) -> String {
        (1..)
            .map(|n| format!("{}{}", family.name_prefix, n))
            .find(|name| !taken(name))
            .unwrap_or_else(|| family.name_prefix.to_string())
    }
}

fn validate(family: &Family) -> Result<(), RegistryError> {
    let malformed = |reason: String| RegistryError::MalformedPinTable {
        type_tag: family.type_tag.to_string(),
        reason,
    };

    if family.node_pinnames.len() < 2 {
        return Err(malformed("fewer than two nodes".to_string()));
    }
    if family.pinname1 == family.pinname2 {
        return Err(malformed(format!(
            "reference pins are both `{}`",
            family.pinname1
        )));
    }
    for reference in [family.pinname1, family.pinname2] {
        if !family.node_pinnames.contains(&reference) {
            return Err(malformed(format!("reference pin `{reference}` is not a node")));
        }
    }
    if family.kinds.is_empty() {
        return Err(malformed("no kinds declared".to_string()));
    }
    if family.bbox_path.len() < 3 {
        return Err(malformed("bounding polygon has fewer than three points".to_string()));
    }

    for table in family.all_pin_tables() {
        let required = family
            .node_pinnames
            .iter()
            .chain([&family.pinname1, &family.pinname2])
            .filter(|name| **name != PLACEHOLDER_PIN);
        for name in required {
            if table.get(name).is_none() {
                return Err(malformed(format!("missing pin `{name}`")));
            }
        }

        let (Some(p1), Some(p2)) = (
            table.position(family.pinname1),
            table.position(family.pinname2),
        ) else {
            return Err(malformed("reference pins missing".to_string()));
        };
        if p1.distance(p2) < 1e-9 {
            return Err(malformed(format!(
                "reference pins `{}` and `{}` coincide",
                family.pinname1, family.pinname2
            )));
        }
    }

    Ok(())
}
