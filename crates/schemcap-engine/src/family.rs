//! Component family declarations.
//!
//! A family is pure data: its pin tables in the local unit frame, the two
//! reference pins the user drags, the order in which pins become netlist
//! nodes, and a hit-test polygon. Placement code never special-cases a
//! family; adding a symbol means adding a declaration here.

use crate::geometry::Position;
use crate::kinds::{self, Kind};
use crate::pins::{Pin, PinSide, PinTable, PinVariants};

/// Node pin name marking a netlist node with no drawn pin.
pub const PLACEHOLDER_PIN: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Bipole,
    Wire,
    DynamicWire,
    Transistor,
    Opamp,
    FdOpamp,
    Inamp,
    Transformer,
}

#[derive(Debug, Clone)]
pub struct Family {
    /// Tag used to create components, e.g. `R` or `opamp`.
    pub type_tag: &'static str,
    /// Prefix of component names in the netlist, e.g. `E` for opamps.
    pub name_prefix: &'static str,
    pub description: &'static str,
    pub shape: Shape,
    pub pins: PinVariants,
    /// Pin tables for insulated-gate kinds.
    pub insulated_gate_pins: Option<PinVariants>,
    /// Pin name of each netlist node, in netlist order.
    pub node_pinnames: &'static [&'static str],
    pub pinname1: &'static str,
    pub pinname2: &'static str,
    pub can_stretch: bool,
    pub label_offset: f64,
    /// Added to the transform angle when choosing the direction attribute.
    pub angle_offset: f64,
    /// Hit-test polygon in the local frame.
    pub bbox_path: &'static [Position],
    pub has_value: bool,
    /// Allowed kinds; the first one is the default.
    pub kinds: &'static [Kind],
    /// Keyword placed after the first two nodes, e.g. `opamp`.
    pub keyword: Option<&'static str>,
    /// Positional control fields after the nodes: two control nodes for
    /// voltage controlled sources, a controlling source name for current
    /// controlled ones.
    pub control_args: usize,
}

impl Family {
    pub fn default_kind(&self) -> Kind {
        self.kinds.first().copied().unwrap_or_default()
    }

    pub fn supports(&self, kind: Kind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn has_mirror(&self) -> bool {
        matches!(
            self.shape,
            Shape::Transistor | Shape::Opamp | Shape::FdOpamp | Shape::Inamp
        )
    }

    pub fn is_wire(&self) -> bool {
        matches!(self.shape, Shape::Wire | Shape::DynamicWire)
    }

    /// Pin table used for a given kind and flags. P-type transistors are
    /// drawn mirrored relative to their n-type counterpart, so they read
    /// the table of the opposite mirror flag.
    pub fn pins_for(&self, kind: Kind, mirror: bool, invert: bool) -> &PinTable {
        let variants = match &self.insulated_gate_pins {
            Some(pins) if kind.is_insulated_gate() => pins,
            _ => &self.pins,
        };
        variants.select(mirror ^ kind.is_p_type(), invert)
    }

    /// Every pin table this family can select.
    pub fn all_pin_tables(&self) -> impl Iterator<Item = &PinTable> {
        self.pins
            .iter()
            .chain(self.insulated_gate_pins.iter().flat_map(PinVariants::iter))
            .map(|(_, table)| table)
    }

    pub fn node_count(&self) -> usize {
        self.node_pinnames.len()
    }
}

const BIPOLE_BBOX: &[Position] = &[
    Position::new(-0.5, -0.15),
    Position::new(0.5, -0.15),
    Position::new(0.5, 0.15),
    Position::new(-0.5, 0.15),
];

const TRANSISTOR_BBOX: &[Position] = &[
    Position::new(-0.25, -0.25),
    Position::new(0.25, -0.25),
    Position::new(0.25, 0.25),
    Position::new(-0.25, 0.25),
];

const OPAMP_BBOX: &[Position] = &[
    Position::new(-0.85, -0.75),
    Position::new(-0.85, 0.75),
    Position::new(0.85, 0.0),
];

const FDOPAMP_BBOX: &[Position] = &[
    Position::new(-0.85, -0.85),
    Position::new(-0.85, 0.85),
    Position::new(0.85, 0.0),
];

const INAMP_BBOX: &[Position] = &[
    Position::new(-0.5, -0.365),
    Position::new(-0.5, 0.365),
    Position::new(0.5, 0.0),
];

const TRANSFORMER_HALF_WIDTH: f64 = 0.32;

const TRANSFORMER_BBOX: &[Position] = &[
    Position::new(-TRANSFORMER_HALF_WIDTH, -0.5),
    Position::new(TRANSFORMER_HALF_WIDTH, -0.5),
    Position::new(TRANSFORMER_HALF_WIDTH, 0.5),
    Position::new(-TRANSFORMER_HALF_WIDTH, 0.5),
];

fn bipole_pins() -> PinVariants {
    PinVariants::fixed(PinTable::new(&[
        Pin::new("+", PinSide::Left, -0.5, 0.0),
        Pin::new("-", PinSide::Right, 0.5, 0.0),
    ]))
}

fn bipole(type_tag: &'static str, description: &'static str, kinds: &'static [Kind]) -> Family {
    Family {
        type_tag,
        name_prefix: type_tag,
        description,
        shape: Shape::Bipole,
        pins: bipole_pins(),
        insulated_gate_pins: None,
        node_pinnames: &["+", "-"],
        pinname1: "+",
        pinname2: "-",
        can_stretch: true,
        label_offset: 0.6,
        angle_offset: 0.0,
        bbox_path: BIPOLE_BBOX,
        has_value: true,
        kinds,
        keyword: None,
        control_args: 0,
    }
}

fn valueless(family: Family) -> Family {
    Family {
        has_value: false,
        ..family
    }
}

/// Canonical transistor table: the controlling pin on the left, the two
/// channel pins on the right with the first one on top.
fn transistor_pins(top: &'static str, control: &'static str, bottom: &'static str, control_y: f64) -> PinTable {
    PinTable::new(&[
        Pin::new(top, PinSide::Top, 0.275, 0.5),
        Pin::new(control, PinSide::Left, -0.275, control_y),
        Pin::new(bottom, PinSide::Bottom, 0.275, -0.5),
    ])
}

fn transistor(
    type_tag: &'static str,
    description: &'static str,
    pinnames: &'static [&'static str; 3],
    kinds: &'static [Kind],
) -> Family {
    let [top, control, bottom] = *pinnames;
    Family {
        type_tag,
        name_prefix: type_tag,
        description,
        shape: Shape::Transistor,
        pins: PinVariants::reflected(transistor_pins(top, control, bottom, 0.0)),
        insulated_gate_pins: None,
        node_pinnames: pinnames,
        pinname1: top,
        pinname2: bottom,
        can_stretch: true,
        label_offset: 0.6,
        angle_offset: -90.0,
        bbox_path: TRANSISTOR_BBOX,
        has_value: false,
        kinds,
        keyword: None,
        control_args: 0,
    }
}

fn opamp() -> Family {
    let pins = PinTable::new(&[
        Pin::new("out", PinSide::RightExternal, 1.25, 0.0),
        Pin::new("in+", PinSide::LeftExternal, -1.25, 0.5),
        Pin::new("in-", PinSide::LeftExternal, -1.25, -0.5),
        Pin::new("vdd", PinSide::Top, 0.0, 0.5),
        Pin::new("vdd2", PinSide::Top, -0.45, 0.755),
        Pin::new("vss2", PinSide::Bottom, -0.45, -0.755),
        Pin::new("vss", PinSide::Bottom, 0.0, -0.5),
        Pin::new("ref", PinSide::Bottom, 0.45, -0.245),
        Pin::new("r+", PinSide::Left, -0.85, 0.25),
        Pin::new("r-", PinSide::Left, -0.85, -0.25),
    ]);
    Family {
        type_tag: "opamp",
        name_prefix: "E",
        description: "Opamp",
        shape: Shape::Opamp,
        pins: PinVariants::swapped(pins, &[("in+", "in-"), ("r+", "r-")]),
        insulated_gate_pins: None,
        node_pinnames: &["out", PLACEHOLDER_PIN, "in+", "in-"],
        pinname1: "in+",
        pinname2: "in-",
        can_stretch: false,
        label_offset: 0.6,
        angle_offset: 0.0,
        bbox_path: OPAMP_BBOX,
        has_value: true,
        kinds: kinds::PLAIN_KINDS,
        keyword: Some("opamp"),
        control_args: 0,
    }
}

fn fdopamp() -> Family {
    let pins = PinTable::new(&[
        Pin::new("out+", PinSide::Right, 0.85, -0.5),
        Pin::new("out-", PinSide::Right, 0.85, 0.5),
        Pin::new("in+", PinSide::Left, -1.25, 0.5),
        Pin::new("ocm", PinSide::Left, -0.85, 0.0),
        Pin::new("in-", PinSide::Left, -1.25, -0.5),
        Pin::new("vdd", PinSide::Top, -0.25, 0.645),
        Pin::new("vss", PinSide::Bottom, -0.25, -0.645),
        Pin::new("r+", PinSide::Left, -0.85, 0.25),
        Pin::new("r-", PinSide::Left, -0.85, -0.25),
    ]);
    Family {
        type_tag: "fdopamp",
        name_prefix: "E",
        description: "Fully differential opamp",
        shape: Shape::FdOpamp,
        pins: PinVariants::swapped(
            pins,
            &[("out+", "out-"), ("in+", "in-"), ("r+", "r-")],
        ),
        insulated_gate_pins: None,
        node_pinnames: &["out+", "out-", "in+", "in-", "ocm"],
        pinname1: "in+",
        pinname2: "in-",
        can_stretch: false,
        label_offset: -1.0,
        angle_offset: 0.0,
        bbox_path: FDOPAMP_BBOX,
        has_value: true,
        kinds: kinds::PLAIN_KINDS,
        keyword: Some("fdopamp"),
        control_args: 0,
    }
}

fn inamp() -> Family {
    let pins = PinTable::new(&[
        Pin::new("out", PinSide::Right, 0.5, 0.0),
        Pin::new("in+", PinSide::Left, -0.5, 0.3),
        Pin::new("in-", PinSide::Left, -0.5, -0.3),
        Pin::new("vdd", PinSide::Top, 0.0, 0.25),
        Pin::new("vdd2", PinSide::Top, -0.225, 0.365),
        Pin::new("vss2", PinSide::Bottom, -0.225, -0.365),
        Pin::new("vss", PinSide::Bottom, 0.0, -0.25),
        Pin::new("ref", PinSide::Bottom, 0.225, -0.135),
        Pin::new("r+", PinSide::Left, -0.5, 0.2),
        Pin::new("r-", PinSide::Left, -0.5, -0.2),
    ]);
    Family {
        type_tag: "inamp",
        name_prefix: "E",
        description: "Instrumentation amplifier",
        shape: Shape::Inamp,
        pins: PinVariants::swapped(pins, &[("in+", "in-"), ("r+", "r-")]),
        insulated_gate_pins: None,
        node_pinnames: &["out", "ref", "in+", "in-", "r+", "r-"],
        pinname1: "in+",
        pinname2: "in-",
        can_stretch: false,
        label_offset: -1.0,
        angle_offset: 0.0,
        bbox_path: INAMP_BBOX,
        has_value: true,
        kinds: kinds::PLAIN_KINDS,
        keyword: Some("inamp"),
        control_args: 0,
    }
}

fn transformer() -> Family {
    let hw = TRANSFORMER_HALF_WIDTH;
    Family {
        type_tag: "TF",
        name_prefix: "TF",
        description: "Transformer",
        shape: Shape::Transformer,
        pins: PinVariants::fixed(PinTable::new(&[
            Pin::new("s+", PinSide::RightExternal, hw, 0.5),
            Pin::new("s-", PinSide::RightExternal, hw, -0.5),
            Pin::new("p+", PinSide::LeftExternal, -hw, 0.5),
            Pin::new("p-", PinSide::LeftExternal, -hw, -0.5),
        ])),
        insulated_gate_pins: None,
        node_pinnames: &["s+", "s-", "p+", "p-"],
        pinname1: "p+",
        pinname2: "p-",
        can_stretch: true,
        label_offset: 0.6,
        angle_offset: 0.0,
        bbox_path: TRANSFORMER_BBOX,
        has_value: true,
        kinds: kinds::TRANSFORMER_KINDS,
        keyword: None,
        control_args: 0,
    }
}

/// Every family known to the editor.
pub fn catalogue() -> Vec<Family> {
    let controlled = |type_tag, description, control_args| Family {
        control_args,
        ..bipole(type_tag, description, kinds::PLAIN_KINDS)
    };

    let mosfet = Family {
        insulated_gate_pins: Some(PinVariants::reflected(transistor_pins(
            "d", "g", "s", -0.25,
        ))),
        ..transistor("M", "MOSFET", &["d", "g", "s"], kinds::MOSFET_KINDS)
    };

    vec![
        bipole("R", "Resistor", kinds::RESISTOR_KINDS),
        bipole("C", "Capacitor", kinds::CAPACITOR_KINDS),
        bipole("L", "Inductor", kinds::INDUCTOR_KINDS),
        valueless(bipole("D", "Diode", kinds::DIODE_KINDS)),
        bipole("V", "Voltage source", kinds::VOLTAGE_SOURCE_KINDS),
        bipole("I", "Current source", kinds::CURRENT_SOURCE_KINDS),
        bipole("Y", "Admittance", kinds::PLAIN_KINDS),
        bipole("Z", "Impedance", kinds::PLAIN_KINDS),
        bipole("CPE", "Constant phase element", kinds::PLAIN_KINDS),
        bipole("FB", "Ferrite bead", kinds::PLAIN_KINDS),
        valueless(bipole("O", "Open circuit", kinds::PLAIN_KINDS)),
        valueless(bipole("P", "Port", kinds::PLAIN_KINDS)),
        valueless(bipole("SW", "Switch", kinds::SWITCH_KINDS)),
        controlled("E", "Voltage controlled voltage source", 2),
        controlled("F", "Current controlled current source", 1),
        controlled("G", "Voltage controlled current source", 2),
        controlled("H", "Current controlled voltage source", 1),
        Family {
            shape: Shape::Wire,
            ..valueless(bipole("W", "Wire", kinds::WIRE_KINDS))
        },
        Family {
            type_tag: "DW",
            name_prefix: "W",
            shape: Shape::DynamicWire,
            ..valueless(bipole("DW", "Dynamic wire", kinds::PLAIN_KINDS))
        },
        transistor("Q", "BJT", &["c", "b", "e"], kinds::BJT_KINDS),
        transistor("J", "JFET", &["d", "g", "s"], kinds::JFET_KINDS),
        mosfet,
        opamp(),
        fdopamp(),
        inamp(),
        transformer(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{Gate, MosfetKind, Polarity};

    fn find(tag: &str) -> Family {
        catalogue()
            .into_iter()
            .find(|family| family.type_tag == tag)
            .unwrap()
    }

    #[test]
    fn test_tags_are_unique() {
        let families = catalogue();
        for (i, family) in families.iter().enumerate() {
            assert!(
                families[i + 1..]
                    .iter()
                    .all(|other| other.type_tag != family.type_tag),
                "duplicate tag {}",
                family.type_tag
            );
        }
    }

    #[test]
    fn test_p_type_reads_opposite_mirror_table() {
        let q = find("Q");
        let npn = q.kinds[0];
        let pnp = q.kinds[1];
        assert!(pnp.is_p_type());
        assert_eq!(q.pins_for(pnp, false, false), q.pins_for(npn, true, false));
        assert_eq!(q.pins_for(pnp, true, true), q.pins_for(npn, false, true));
    }

    #[test]
    fn test_insulated_gate_table() {
        let m = find("M");
        let nigfete = Kind::Mosfet(MosfetKind {
            polarity: Polarity::N,
            gate: Gate::InsulatedEnhancement,
            body_diode: false,
        });
        assert_eq!(
            m.pins_for(nigfete, false, false).position("g"),
            Some(Position::new(-0.275, -0.25))
        );
        assert_eq!(
            m.pins_for(m.default_kind(), false, false).position("g"),
            Some(Position::new(-0.275, 0.0))
        );
        assert_eq!(m.all_pin_tables().count(), 8);
    }

    #[test]
    fn test_opamp_mirror_swaps_inputs() {
        let opamp = find("opamp");
        let normal = opamp.pins_for(Kind::Default, false, false);
        let mirrored = opamp.pins_for(Kind::Default, true, false);
        assert_eq!(normal.position("in+"), mirrored.position("in-"));
        assert_eq!(normal.position("out"), mirrored.position("out"));
    }

    #[test]
    fn test_dynamic_wire_uses_wire_prefix() {
        let dw = find("DW");
        assert_eq!(dw.name_prefix, "W");
        assert!(dw.is_wire());
        assert!(!dw.has_value);
    }
}
