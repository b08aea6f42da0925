//! Placed components.
//!
//! [`Component`] is the editor-side record of one circuit element: its
//! name, kind, node names and drawing attributes. It does not know where its
//! nodes are; the circuit owns node positions. Geometry questions are asked
//! through [`PlacedComponent`], which pairs a component with its family and
//! the current positions of its nodes.
//!
//! All geometry is derived from a [`TF`] fitted to the two reference pins,
//! so adding a symbol only needs a pin table (see [`crate::family`]).

use log::warn;
use schemcap_netlist::{format_number, Attr, NetItem};

use crate::family::{Family, PLACEHOLDER_PIN};
use crate::geometry::{point_in_polygon, GeometryError, Position};
use crate::kinds::{Connection, Kind, SymbolStyle};
use crate::pins::PinTable;
use crate::registry::RegistryError;
use crate::tf::TF;

/// Hit-test polygons are shrunk by this factor so neighbouring symbols
/// sharing a node do not both claim a click on the junction.
pub const BBOX_SHRINK: f64 = 0.9;

/// Anchors closer than this are rejected before any transform is fitted.
pub const MIN_ANCHOR_SEPARATION: f64 = 0.2;

/// Grid distance drawn as a component of size 1.
pub const DEFAULT_NODE_SPACING: f64 = 2.0;

const VOLTAGE_KEYS: &[&str] = &["v", "v_", "v^", "v_>", "v_<", "v^>", "v^<", "v<", "v>"];
const CURRENT_KEYS: &[&str] = &[
    "i", "i_", "i^", "i_>", "i_<", "i^>", "i^<", "i>_", "i<_", "i>^", "i<^", "i>", "i<", "ir",
];
const FLOW_KEYS: &[&str] = &[
    "f", "f_", "f^", "f_>", "f_<", "f^>", "f^<", "f>_", "f<_", "f>^", "f<^", "f>", "f<",
];
const LABEL_KEYS: &[&str] = &["l", "l_", "l^"];
/// Recomputed from node positions on every save.
const DIRECTION_KEYS: &[&str] = &["left", "right", "up", "down", "size", "rotate"];

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub type_tag: &'static str,
    pub kind: Kind,
    /// Overrides the document style for this symbol.
    pub style: Option<SymbolStyle>,
    /// Node names, one per entry of the family's `node_pinnames`.
    pub nodes: Vec<String>,
    /// Control nodes or controlling source name.
    pub control: Vec<String>,
    pub value: Option<String>,
    pub label: Option<String>,
    pub voltage_label: Option<String>,
    pub current_label: Option<String>,
    pub flow_label: Option<String>,
    pub color: Option<String>,
    /// Scales the symbol but not the distance between its nodes.
    pub scale: Option<String>,
    pub mirror: bool,
    pub invert: bool,
    /// User attributes passed through untouched, e.g. `thick`.
    pub attrs: Vec<Attr>,
}

impl Component {
    pub fn new<S: Into<String>>(name: S, family: &Family, kind: Kind) -> Self {
        Self {
            name: name.into(),
            type_tag: family.type_tag,
            kind,
            style: None,
            nodes: Vec::new(),
            control: Vec::new(),
            value: None,
            label: None,
            voltage_label: None,
            current_label: None,
            flow_label: None,
            color: None,
            scale: None,
            mirror: false,
            invert: false,
            attrs: Vec::new(),
        }
    }

    /// The pin table selected by this component's kind and flags.
    pub fn pins<'f>(&self, family: &'f Family) -> &'f PinTable {
        family.pins_for(self.kind, self.mirror, self.invert)
    }

    /// Node positions for a component whose reference pins are dragged to
    /// `(x1, y1)` and `(x2, y2)`. Placeholder nodes have no position.
    pub fn assign_positions(
        &self,
        family: &Family,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Result<Vec<Option<Position>>, GeometryError> {
        let a1 = Position::new(x1, y1);
        let a2 = Position::new(x2, y2);

        let distance = a1.distance(a2);
        if distance < MIN_ANCHOR_SEPARATION {
            return Err(GeometryError::AnchorsTooClose {
                distance,
                minimum: MIN_ANCHOR_SEPARATION,
            });
        }

        if family.node_count() == 2 {
            return Ok(vec![Some(a1), Some(a2)]);
        }

        let pins = self.pins(family);
        let tf = TF::from_points_pair(
            reference_pin(pins, family.pinname1)?,
            a1,
            reference_pin(pins, family.pinname2)?,
            a2,
        )?;

        Ok(family
            .node_pinnames
            .iter()
            .map(|&name| {
                if name == PLACEHOLDER_PIN {
                    None
                } else {
                    pins.position(name).map(|p| tf.transform(p))
                }
            })
            .collect())
    }

    /// Cache key of the symbol glyph: `type-cpt_kind-symbol_kind-style`
    /// with hyphens trimmed from both ends only, so `C--polar` keeps its
    /// empty cpt kind. The style part is the component's own override; the
    /// library style only picks the directory.
    pub fn sketch_key(&self) -> String {
        let style = self.style.map(|style| style.as_str()).unwrap_or_default();
        format!(
            "{}-{}-{}-{}",
            self.type_tag,
            self.kind.cpt_kind(),
            self.kind.symbol_kind(),
            style
        )
        .trim_matches('-')
        .to_string()
    }

    /// Smallest netlist drawing this component's symbol on its own, used to
    /// ask the drawing engine for a missing glyph.
    pub fn sketch_net(&self, family: &Family) -> NetItem {
        let node_names: Vec<String> = (1..=family.node_count()).map(|n| n.to_string()).collect();
        let mut item = NetItem {
            name: family.name_prefix.to_string(),
            fields: netlist_nodes(family, &node_names),
            attrs: vec![Attr::flag("right")],
        };
        if !self.kind.cpt_kind().is_empty() {
            item.fields.push(self.kind.cpt_kind().to_string());
        }
        item.attrs.extend(kind_attr(self.kind));
        item
    }

    /// Rebuild a component from a netlist line.
    pub fn from_net_item(item: &NetItem, family: &Family) -> Result<Self, RegistryError> {
        let malformed = |reason: &str| RegistryError::MalformedItem {
            item: item.to_string(),
            reason: reason.to_string(),
        };

        let node_count = family.node_count();
        let mut fields = item.fields.iter().cloned();
        let mut nodes = Vec::with_capacity(node_count);
        for index in 0..node_count {
            if index == 2 {
                if let Some(keyword) = family.keyword {
                    if fields.next().as_deref() != Some(keyword) {
                        return Err(malformed("missing keyword"));
                    }
                }
            }
            nodes.push(fields.next().ok_or_else(|| malformed("missing node"))?);
        }

        let mut rest: Vec<String> = fields.collect();
        let control_count = family.control_args.min(rest.len());
        let control: Vec<String> = rest.drain(..control_count).collect();

        let mut cpt_kind = String::new();
        if let Some(first) = rest.first() {
            if family
                .kinds
                .iter()
                .any(|kind| !kind.cpt_kind().is_empty() && kind.cpt_kind() == first)
            {
                cpt_kind = rest.remove(0);
            }
        }
        let value = (!rest.is_empty()).then(|| rest.join(" "));

        let mut component = Component::new(item.name.clone(), family, family.default_kind());
        component.nodes = nodes;
        component.control = control;
        component.value = value;

        let mut symbol_kind = String::new();
        let mut connection: Option<Connection> = None;
        for attr in &item.attrs {
            let key = attr.key.as_str();
            let value = attr.value.clone();
            if DIRECTION_KEYS.contains(&key) {
                continue;
            }
            if attr.is_flag() {
                if let Some(found) = Connection::from_keyword(key).filter(|_| family.is_wire()) {
                    match connection {
                        Some(existing) => warn!(
                            "{}: ignoring connection `{}`, already `{}`",
                            item.name,
                            key,
                            existing.keyword()
                        ),
                        None => connection = Some(found),
                    }
                    continue;
                }
                if family.has_mirror() && key == "mirror" {
                    component.mirror = true;
                    continue;
                }
                if family.has_mirror() && key == "invert" {
                    component.invert = true;
                    continue;
                }
            }
            match key {
                "color" | "colour" => component.color = value,
                "scale" => component.scale = value,
                "kind" => symbol_kind = value.unwrap_or_default(),
                "style" => {
                    let style = value.unwrap_or_default();
                    component.style = Some(style.parse().map_err(|_| malformed("unknown style"))?);
                }
                k if VOLTAGE_KEYS.contains(&k) => component.voltage_label = value,
                k if CURRENT_KEYS.contains(&k) => component.current_label = value,
                k if FLOW_KEYS.contains(&k) => component.flow_label = value,
                k if LABEL_KEYS.contains(&k) => component.label = value,
                _ => component.attrs.push(attr.clone()),
            }
        }

        component.kind = match connection {
            Some(connection) => Kind::Connection(connection),
            None => Kind::from_parts(&cpt_kind, &symbol_kind, family.kinds).ok_or_else(|| {
                RegistryError::UnknownKind {
                    type_tag: family.type_tag.to_string(),
                    kind: if symbol_kind.is_empty() {
                        cpt_kind.clone()
                    } else {
                        format!("{cpt_kind}-{symbol_kind}")
                    },
                }
            })?,
        };

        Ok(component)
    }
}

fn reference_pin(pins: &PinTable, name: &str) -> Result<Position, GeometryError> {
    pins.position(name)
        .ok_or_else(|| GeometryError::Unplaced(name.to_string()))
}

/// Node fields of a net item, with an amplifier keyword after the first two.
fn netlist_nodes(family: &Family, nodes: &[String]) -> Vec<String> {
    let mut fields = Vec::with_capacity(nodes.len() + 1);
    for (index, node) in nodes.iter().enumerate() {
        if index == 2 {
            if let Some(keyword) = family.keyword {
                fields.push(keyword.to_string());
            }
        }
        fields.push(node.clone());
    }
    fields
}

/// `kind=...` for symbol variants, the bare keyword for wire connections.
fn kind_attr(kind: Kind) -> Option<Attr> {
    if let Some(connection) = kind.connection() {
        return Some(Attr::flag(connection.keyword()));
    }
    let symbol_kind = kind.symbol_kind();
    (!symbol_kind.is_empty()).then(|| Attr::pair("kind", symbol_kind))
}

/// A component together with its family and current node positions.
#[derive(Debug, Clone)]
pub struct PlacedComponent<'a> {
    pub component: &'a Component,
    pub family: &'a Family,
    /// Position of each node, `None` for placeholders.
    pub positions: Vec<Option<Position>>,
}

impl<'a> PlacedComponent<'a> {
    pub fn new(
        component: &'a Component,
        family: &'a Family,
        positions: Vec<Option<Position>>,
    ) -> Self {
        Self {
            component,
            family,
            positions,
        }
    }

    fn node_position(&self, pinname: &str) -> Result<Position, GeometryError> {
        self.family
            .node_pinnames
            .iter()
            .position(|&name| name == pinname)
            .and_then(|index| self.positions.get(index).copied().flatten())
            .ok_or_else(|| GeometryError::Unplaced(pinname.to_string()))
    }

    /// Positions of the nodes at the two reference pins.
    pub fn anchors(&self) -> Result<(Position, Position), GeometryError> {
        Ok((
            self.node_position(self.family.pinname1)?,
            self.node_position(self.family.pinname2)?,
        ))
    }

    pub fn tf(&self) -> Result<TF, GeometryError> {
        let (a1, a2) = self.anchors()?;
        let pins = self.component.pins(self.family);
        TF::from_points_pair(
            reference_pin(pins, self.family.pinname1)?,
            a1,
            reference_pin(pins, self.family.pinname2)?,
            a2,
        )
    }

    pub fn length(&self) -> Result<f64, GeometryError> {
        Ok(self.tf()?.scale_factor())
    }

    pub fn angle(&self) -> Result<f64, GeometryError> {
        Ok(self.tf()?.angle_deg())
    }

    pub fn midpoint(&self) -> Result<Position, GeometryError> {
        Ok(self.tf()?.transform(Position::default()))
    }

    /// True when the reference nodes are further apart in y than in x.
    pub fn vertical(&self) -> Result<bool, GeometryError> {
        let (a1, a2) = self.anchors()?;
        Ok((a2.y - a1.y).abs() > (a2.x - a1.x).abs())
    }

    pub fn label_position(&self) -> Result<Position, GeometryError> {
        let midpoint = self.midpoint()?;
        let offset = self.family.label_offset;
        Ok(if self.vertical()? {
            midpoint + Position::new(offset, 0.0)
        } else {
            midpoint + Position::new(0.0, offset)
        })
    }

    /// Where to draw the `+` and `-` of a voltage annotation.
    pub fn voltage_annotation_positions(&self) -> Result<(Position, Position), GeometryError> {
        let mut placed = self.positions.iter().flatten();
        match (placed.next(), placed.next()) {
            (Some(&plus), Some(&minus)) => Ok((plus, minus)),
            _ => Err(GeometryError::Unplaced(self.component.name.clone())),
        }
    }

    /// World-space outline of the declared bounding polygon.
    pub fn outline(&self) -> Result<Vec<Position>, GeometryError> {
        Ok(self.tf()?.transform_all(self.family.bbox_path))
    }

    /// Hit test. The point is mapped into the local frame and tested against
    /// the bounding polygon shrunk by [`BBOX_SHRINK`].
    pub fn is_within_bbox(&self, x: f64, y: f64) -> bool {
        let Ok(inverse) = self.tf().and_then(|tf| tf.inverted()) else {
            return false;
        };
        let local = inverse.transform(Position::new(x, y));
        let polygon: Vec<Position> = self
            .family
            .bbox_path
            .iter()
            .map(|&p| p * BBOX_SHRINK)
            .collect();
        point_in_polygon(local.x, local.y, &polygon)
    }

    /// `right`, `up=1.5`, `rotate=45` and so on.
    /// Coincident nodes give `down=0`.
    pub fn direction_attr(&self, node_spacing: f64) -> Result<Attr, GeometryError> {
        let tf = match self.tf() {
            Err(GeometryError::ZeroLengthWorld) => return Ok(Attr::pair("down", "0")),
            tf => tf?,
        };
        let size = round2(tf.scale_factor() / node_spacing);
        let angle = round2(tf.angle_deg() + self.family.angle_offset);

        if size == 0.0 {
            return Ok(Attr::pair("down", "0"));
        }

        let direction = if angle == 0.0 {
            "right"
        } else if angle == 90.0 || angle == -270.0 {
            "up"
        } else if angle == 180.0 || angle == -180.0 {
            "left"
        } else if angle == 270.0 || angle == -90.0 {
            "down"
        } else {
            return Ok(Attr::pair("rotate", format_number(angle, 2)));
        };

        Ok(if size == 1.0 {
            Attr::flag(direction)
        } else {
            Attr::pair(direction, format_number(size, 2))
        })
    }

    /// Attribute list in netlist order: direction, scale, color, labels,
    /// mirror and invert, user attributes, kind, style.
    pub fn attrs(&self, node_spacing: f64) -> Result<Vec<Attr>, GeometryError> {
        let cpt = self.component;
        let mut attrs = vec![self.direction_attr(node_spacing)?];

        if let Some(scale) = cpt.scale.as_ref().filter(|s| s.as_str() != "1") {
            attrs.push(Attr::pair("scale", scale));
        }
        let labelled = [
            ("color", &cpt.color),
            ("v", &cpt.voltage_label),
            ("i", &cpt.current_label),
            ("f", &cpt.flow_label),
            ("l", &cpt.label),
        ];
        for (key, value) in labelled {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                attrs.push(Attr::pair(key, value));
            }
        }
        if cpt.mirror {
            attrs.push(Attr::flag("mirror"));
        }
        if cpt.invert {
            attrs.push(Attr::flag("invert"));
        }
        attrs.extend(cpt.attrs.iter().cloned());
        attrs.extend(kind_attr(cpt.kind));
        if let Some(style) = cpt.style {
            attrs.push(Attr::pair("style", style.as_str()));
        }
        Ok(attrs)
    }

    pub fn attr_string(&self, node_spacing: f64) -> Result<String, GeometryError> {
        Ok(schemcap_netlist::join_attrs(&self.attrs(node_spacing)?))
    }

    /// The netlist line for this component, e.g. `R1 1 2 10; right`.
    pub fn netitem(&self, node_spacing: f64) -> Result<NetItem, GeometryError> {
        let cpt = self.component;
        let mut fields = netlist_nodes(self.family, &cpt.nodes);
        fields.extend(cpt.control.iter().cloned());
        if !cpt.kind.cpt_kind().is_empty() {
            fields.push(cpt.kind.cpt_kind().to_string());
        }
        if let Some(value) = cpt.value.as_ref().filter(|v| !v.is_empty()) {
            fields.push(value.clone());
        }
        Ok(NetItem {
            name: cpt.name.clone(),
            fields,
            attrs: self.attrs(node_spacing)?,
        })
    }
}

fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{Gate, MosfetKind, Polarity};
    use crate::registry::ComponentRegistry;

    const TOL: f64 = 1e-9;

    fn registry() -> ComponentRegistry {
        ComponentRegistry::new().unwrap()
    }

    fn placed_at<'a>(
        component: &'a mut Component,
        family: &'a Family,
        anchors: (f64, f64, f64, f64),
    ) -> PlacedComponent<'a> {
        let (x1, y1, x2, y2) = anchors;
        let positions = component.assign_positions(family, x1, y1, x2, y2).unwrap();
        component.nodes = (1..=positions.len()).map(|n| n.to_string()).collect();
        PlacedComponent::new(component, family, positions)
    }

    fn line(type_tag: &str, anchors: (f64, f64, f64, f64)) -> String {
        let registry = registry();
        let family = registry.get(type_tag).unwrap();
        let mut cpt = Component::new(format!("{}1", family.name_prefix), family, family.default_kind());
        let placed = placed_at(&mut cpt, family, anchors);
        let item = placed.netitem(DEFAULT_NODE_SPACING).unwrap();
        item.to_string()
    }

    #[test]
    fn test_bipole_directions() {
        assert_eq!(line("R", (0.0, 0.0, 2.0, 0.0)), "R1 1 2; right");
        assert_eq!(line("R", (0.0, 2.0, 0.0, 0.0)), "R1 1 2; down");
        assert_eq!(line("R", (2.0, 0.0, 0.0, 0.0)), "R1 1 2; left");
        assert_eq!(line("R", (0.0, 0.0, 0.0, 2.0)), "R1 1 2; up");
        assert_eq!(line("R", (0.0, 0.0, 3.0, 0.0)), "R1 1 2; right=1.5");
        assert_eq!(line("C", (0.0, 0.0, 2.0, 2.0)), "C1 1 2; rotate=45");
        assert_eq!(line("L", (0.0, 0.0, -2.0, -2.0)), "L1 1 2; rotate=-135");
    }

    #[test]
    fn test_source_kind_field() {
        assert_eq!(line("V", (0.0, 2.0, 0.0, 0.0)), "V1 1 2 dc; down");
        assert_eq!(line("SW", (0.0, 0.0, 2.0, 0.0)), "SW1 1 2 no; right");
    }

    #[test]
    fn test_transistor_direction_follows_drain_to_source() {
        assert_eq!(line("M", (0.0, 2.0, 0.0, 0.0)), "M1 1 2 3 nmos; down, kind=nfet");
        assert_eq!(line("Q", (0.0, 0.0, 0.0, 2.0)), "Q1 1 2 3 npn; up");
    }

    #[test]
    fn test_two_node_positions_are_anchors() {
        let registry = registry();
        let family = registry.get("R").unwrap();
        let cpt = Component::new("R1", family, Kind::Default);
        let positions = cpt.assign_positions(family, 1.0, 2.0, 3.0, 2.0).unwrap();
        assert_eq!(
            positions,
            vec![Some(Position::new(1.0, 2.0)), Some(Position::new(3.0, 2.0))]
        );
    }

    #[test]
    fn test_coincident_anchors_rejected() {
        let registry = registry();
        let family = registry.get("R").unwrap();
        let cpt = Component::new("R1", family, Kind::Default);
        assert!(matches!(
            cpt.assign_positions(family, 2.0, 2.0, 2.0, 2.0),
            Err(GeometryError::AnchorsTooClose { .. })
        ));
        assert!(matches!(
            cpt.assign_positions(family, 2.0, 2.0, 2.1, 2.0),
            Err(GeometryError::AnchorsTooClose { .. })
        ));
    }

    #[test]
    fn test_opamp_positions_and_placeholder() {
        let registry = registry();
        let family = registry.get("opamp").unwrap();
        let cpt = Component::new("E1", family, Kind::Default);
        // in+ at (0, 1), in- at (0, -1): scale 2, no rotation.
        let positions = cpt.assign_positions(family, 0.0, 1.0, 0.0, -1.0).unwrap();
        assert_eq!(positions.len(), 4);
        let out = positions[0].unwrap();
        assert!(out.is_close(Position::new(5.0, 0.0), TOL), "{out:?}");
        assert!(positions[1].is_none());
        assert!(positions[2].unwrap().is_close(Position::new(0.0, 1.0), TOL));
        assert!(positions[3].unwrap().is_close(Position::new(0.0, -1.0), TOL));
    }

    #[test]
    fn test_opamp_netitem_keyword() {
        let registry = registry();
        let family = registry.get("opamp").unwrap();
        let mut cpt = Component::new("E1", family, Kind::Default);
        let placed = placed_at(&mut cpt, family, (0.0, 1.0, 0.0, -1.0));
        assert_eq!(
            placed.netitem(DEFAULT_NODE_SPACING).unwrap().to_string(),
            "E1 1 2 opamp 3 4; right"
        );
    }

    #[test]
    fn test_mosfet_mirror_reflects_pins() {
        let registry = registry();
        let family = registry.get("M").unwrap();
        let plain = Component::new("M1", family, family.default_kind());
        let mut mirrored = plain.clone();
        mirrored.mirror = true;

        let p = plain.assign_positions(family, 0.0, 2.0, 0.0, 0.0).unwrap();
        let m = mirrored.assign_positions(family, 0.0, 2.0, 0.0, 0.0).unwrap();

        // Drain and source stay on the anchors, the gate moves across the
        // drain-source axis.
        assert_eq!(p[0], m[0]);
        assert_eq!(p[2], m[2]);
        assert!(p[1].unwrap().is_close(Position::new(-1.1, 1.0), TOL));
        assert!(m[1].unwrap().is_close(Position::new(1.1, 1.0), TOL));
    }

    #[test]
    fn test_pmos_uses_mirrored_table() {
        let registry = registry();
        let family = registry.get("M").unwrap();
        let pmos = Kind::Mosfet(MosfetKind {
            polarity: Polarity::P,
            gate: Gate::Enhancement,
            body_diode: false,
        });
        let mut nmos_mirrored = Component::new("M1", family, family.default_kind());
        nmos_mirrored.mirror = true;
        let pmos = Component::new("M2", family, pmos);
        assert_eq!(
            pmos.assign_positions(family, 0.0, 2.0, 0.0, 0.0).unwrap(),
            nmos_mirrored.assign_positions(family, 0.0, 2.0, 0.0, 0.0).unwrap()
        );
    }

    #[test]
    fn test_bbox_contains_centre_not_far_points() {
        let registry = registry();
        for tag in ["R", "Q", "opamp", "fdopamp", "inamp", "TF"] {
            let family = registry.get(tag).unwrap();
            let mut cpt = Component::new("X1", family, family.default_kind());
            let placed = placed_at(&mut cpt, family, (1.0, 3.0, 1.0, 1.0));
            let centre = placed.midpoint().unwrap();
            assert!(placed.is_within_bbox(centre.x, centre.y), "{tag} centre");
            assert!(!placed.is_within_bbox(centre.x + 100.0, centre.y), "{tag} far");
            assert!(!placed.is_within_bbox(centre.x, centre.y - 250.0), "{tag} far");
        }
    }

    #[test]
    fn test_bbox_shrink_excludes_node_ends() {
        let registry = registry();
        let family = registry.get("R").unwrap();
        let mut cpt = Component::new("R1", family, Kind::Default);
        let placed = placed_at(&mut cpt, family, (0.0, 0.0, 2.0, 0.0));
        assert!(placed.is_within_bbox(1.85, 0.0));
        assert!(!placed.is_within_bbox(1.95, 0.0));
    }

    #[test]
    fn test_derived_geometry() {
        let registry = registry();
        let family = registry.get("R").unwrap();
        let mut cpt = Component::new("R1", family, Kind::Default);
        let placed = placed_at(&mut cpt, family, (0.0, 0.0, 0.0, 4.0));
        assert!((placed.length().unwrap() - 4.0).abs() < TOL);
        assert!((placed.angle().unwrap() - 90.0).abs() < TOL);
        assert!(placed.midpoint().unwrap().is_close(Position::new(0.0, 2.0), TOL));
        assert!(placed.vertical().unwrap());
        assert!(placed
            .label_position()
            .unwrap()
            .is_close(Position::new(0.6, 2.0), TOL));
    }

    #[test]
    fn test_attribute_order() {
        let registry = registry();
        let family = registry.get("Q").unwrap();
        let mut cpt = Component::new("Q1", family, Kind::parse("npn-nigbt", family.kinds).unwrap());
        cpt.scale = Some("0.5".to_string());
        cpt.color = Some("blue".to_string());
        cpt.voltage_label = Some("V_ce".to_string());
        cpt.label = Some("T1".to_string());
        cpt.invert = true;
        cpt.attrs.push(Attr::flag("thick"));
        cpt.style = Some(SymbolStyle::British);
        let placed = placed_at(&mut cpt, family, (0.0, 2.0, 0.0, 0.0));
        assert_eq!(
            placed.attr_string(DEFAULT_NODE_SPACING).unwrap(),
            "down, scale=0.5, color=blue, v=V_ce, l=T1, invert, thick, kind=nigbt, style=british"
        );
    }

    #[test]
    fn test_wire_connection_keyword() {
        let registry = registry();
        let family = registry.get("W").unwrap();
        let mut cpt = Component::new("W1", family, Kind::Connection(Connection::Ground));
        let placed = placed_at(&mut cpt, family, (0.0, 0.0, 0.0, -2.0));
        assert_eq!(
            placed.netitem(DEFAULT_NODE_SPACING).unwrap().to_string(),
            "W1 1 2; down, ground"
        );
    }

    #[test]
    fn test_sketch_key() {
        let registry = registry();
        let m = registry.get("M").unwrap();
        let mut cpt = Component::new(
            "M1",
            m,
            Kind::parse("nmos-nfet-bodydiode", m.kinds).unwrap(),
        );
        assert_eq!(cpt.sketch_key(), "M-nmos-nfet-bodydiode");
        cpt.style = Some(SymbolStyle::European);
        assert_eq!(cpt.sketch_key(), "M-nmos-nfet-bodydiode-european");

        let r = registry.get("R").unwrap();
        assert_eq!(Component::new("R1", r, Kind::Default).sketch_key(), "R");

        // Empty middle parts keep their separators.
        let c = registry.get("C").unwrap();
        let mut cpt = Component::new("C1", c, Kind::parse("polar", c.kinds).unwrap());
        assert_eq!(cpt.sketch_key(), "C--polar");
        cpt.style = Some(SymbolStyle::British);
        assert_eq!(cpt.sketch_key(), "C--polar-british");

        let v = registry.get("V").unwrap();
        let cpt = Component::new("V1", v, Kind::parse("dc", v.kinds).unwrap());
        assert_eq!(cpt.sketch_key(), "V-dc");
    }

    #[test]
    fn test_sketch_net() {
        let registry = registry();
        let inamp = registry.get("inamp").unwrap();
        let cpt = Component::new("E1", inamp, Kind::Default);
        assert_eq!(cpt.sketch_net(inamp).to_string(), "E 1 2 inamp 3 4 5 6; right");

        let c = registry.get("C").unwrap();
        let cpt = Component::new("C1", c, Kind::parse("polar", c.kinds).unwrap());
        assert_eq!(cpt.sketch_net(c).to_string(), "C 1 2; right, kind=polar");
    }

    #[test]
    fn test_from_net_item() {
        let registry = registry();
        let item = NetItem::parse("M3 d g s pmos; up, mirror, color=red, thick, kind=pfet-bodydiode").unwrap();
        let family = registry.family_for_item(&item).unwrap();
        let cpt = Component::from_net_item(&item, family).unwrap();
        assert_eq!(cpt.nodes, vec!["d", "g", "s"]);
        assert_eq!(cpt.kind.to_string(), "pmos-pfet-bodydiode");
        assert!(cpt.mirror);
        assert_eq!(cpt.color.as_deref(), Some("red"));
        assert_eq!(cpt.attrs, vec![Attr::flag("thick")]);
        assert!(cpt.value.is_none());
    }

    #[test]
    fn test_from_net_item_controlled_source_and_value() {
        let registry = registry();
        let item = NetItem::parse("E2 1 2 3 4 {A}; down").unwrap();
        let family = registry.family_for_item(&item).unwrap();
        let cpt = Component::from_net_item(&item, family).unwrap();
        assert_eq!(cpt.nodes, vec!["1", "2"]);
        assert_eq!(cpt.control, vec!["3", "4"]);
        assert_eq!(cpt.value.as_deref(), Some("{A}"));
    }

    #[test]
    fn test_from_net_item_wire_and_amplifier() {
        let registry = registry();
        let wire = NetItem::parse("W 3 0; down, implicit").unwrap();
        let cpt = Component::from_net_item(&wire, registry.family_for_item(&wire).unwrap()).unwrap();
        assert_eq!(cpt.kind, Kind::Connection(Connection::Ground));

        let opamp = NetItem::parse("E1 3 0 opamp 1 2; right, mirror").unwrap();
        let cpt = Component::from_net_item(&opamp, registry.family_for_item(&opamp).unwrap()).unwrap();
        assert_eq!(cpt.nodes, vec!["3", "0", "1", "2"]);
        assert!(cpt.mirror);
        assert!(cpt.value.is_none());
    }

    #[test]
    fn test_from_net_item_bare_transistors() {
        let registry = registry();
        for text in ["Q1 1 2 3; right", "J1 1 2 3; right", "M1 1 2 3; right"] {
            let item = NetItem::parse(text).unwrap();
            let family = registry.family_for_item(&item).unwrap();
            let cpt = Component::from_net_item(&item, family).unwrap();
            assert_eq!(cpt.kind, Kind::Default, "{text}");
            assert_eq!(cpt.nodes, vec!["1", "2", "3"]);
            assert!(cpt.value.is_none());
        }

        // Unnamed kinds never displace the family default.
        let q = registry.get("Q").unwrap();
        assert_eq!(q.default_kind().cpt_kind(), "npn");
    }

    #[test]
    fn test_from_net_item_rejects_unknown_kind() {
        let registry = registry();
        let item = NetItem::parse("D1 1 2; right, kind=laser").unwrap();
        let family = registry.family_for_item(&item).unwrap();
        assert_eq!(
            Component::from_net_item(&item, family).unwrap_err(),
            RegistryError::UnknownKind {
                type_tag: "D".to_string(),
                kind: "-laser".to_string(),
            }
        );
    }

    #[test]
    fn test_zero_length_direction() {
        let registry = registry();
        let family = registry.get("R").unwrap();
        let cpt = Component::new("R1", family, Kind::Default);
        let placed = PlacedComponent::new(
            &cpt,
            family,
            vec![Some(Position::new(0.0, 0.0)), Some(Position::new(0.001, 0.0))],
        );
        assert_eq!(placed.direction_attr(DEFAULT_NODE_SPACING).unwrap(), Attr::pair("down", "0"));
    }

    #[test]
    fn test_coincident_nodes_direction() {
        let registry = registry();
        let family = registry.get("R").unwrap();
        let cpt = Component::new("R1", family, Kind::Default);
        let placed = PlacedComponent::new(
            &cpt,
            family,
            vec![Some(Position::new(2.0, 0.0)), Some(Position::new(2.0, 0.0))],
        );
        assert_eq!(placed.tf(), Err(GeometryError::ZeroLengthWorld));
        assert_eq!(placed.direction_attr(DEFAULT_NODE_SPACING).unwrap(), Attr::pair("down", "0"));
        assert_eq!(placed.attr_string(DEFAULT_NODE_SPACING).unwrap(), "down=0");
        assert!(!placed.is_within_bbox(2.0, 0.0));
    }
}
