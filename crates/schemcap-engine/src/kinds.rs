//! Symbol kinds and drawing styles.
//!
//! Netlists spell a kind as a hyphenated string `cpt_kind-symbol_kind`:
//! `nmos-nfet-bodydiode` is an n-channel MOSFET (`nmos` goes into the net
//! item fields) drawn with the `nfet-bodydiode` symbol (`kind=` attribute).
//! Inside the engine kinds are plain enums; the string form only exists at
//! the netlist and sketch-file boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Symbol drawing convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolStyle {
    #[default]
    American,
    British,
    European,
}

impl SymbolStyle {
    pub const ALL: [SymbolStyle; 3] = [
        SymbolStyle::American,
        SymbolStyle::British,
        SymbolStyle::European,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolStyle::American => "american",
            SymbolStyle::British => "british",
            SymbolStyle::European => "european",
        }
    }
}

impl fmt::Display for SymbolStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymbolStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| format!("unknown symbol style `{s}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    N,
    P,
}

impl Polarity {
    fn prefix(&self) -> &'static str {
        match self {
            Polarity::N => "n",
            Polarity::P => "p",
        }
    }
}

/// Alternative symbols for two-terminal parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Variable,
    Tunable,
    Electrolytic,
    Polar,
    Curved,
    Sensor,
    Choke,
    TwoLinesChoke,
    Led,
    Photo,
    Schottky,
    Zener,
    Tunnel,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Variable => "variable",
            Variant::Tunable => "tunable",
            Variant::Electrolytic => "electrolytic",
            Variant::Polar => "polar",
            Variant::Curved => "curved",
            Variant::Sensor => "sensor",
            Variant::Choke => "choke",
            Variant::TwoLinesChoke => "twolineschoke",
            Variant::Led => "led",
            Variant::Photo => "photo",
            Variant::Schottky => "schottky",
            Variant::Zener => "zener",
            Variant::Tunnel => "tunnel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Dc,
    Ac,
    Step,
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchKind {
    NormallyOpen,
    NormallyClosed,
    Push,
}

/// Implicit connections drawn by wires: grounds, supply rails and ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connection {
    Ground,
    SignalGround,
    RailGround,
    ChassisGround,
    ZeroVolt,
    Vcc,
    Vdd,
    Vee,
    Vss,
    Input,
    Output,
    Bidir,
}

impl Connection {
    pub const ALL: [Connection; 12] = [
        Connection::Ground,
        Connection::SignalGround,
        Connection::RailGround,
        Connection::ChassisGround,
        Connection::ZeroVolt,
        Connection::Vcc,
        Connection::Vdd,
        Connection::Vee,
        Connection::Vss,
        Connection::Input,
        Connection::Output,
        Connection::Bidir,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Connection::Ground => "ground",
            Connection::SignalGround => "sground",
            Connection::RailGround => "rground",
            Connection::ChassisGround => "cground",
            Connection::ZeroVolt => "0V",
            Connection::Vcc => "vcc",
            Connection::Vdd => "vdd",
            Connection::Vee => "vee",
            Connection::Vss => "vss",
            Connection::Input => "input",
            Connection::Output => "output",
            Connection::Bidir => "bidir",
        }
    }

    /// `implicit` is the legacy spelling of `ground`.
    pub fn from_keyword(keyword: &str) -> Option<Connection> {
        if keyword == "implicit" {
            return Some(Connection::Ground);
        }
        Connection::ALL
            .into_iter()
            .find(|connection| connection.keyword() == keyword)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BjtKind {
    pub polarity: Polarity,
    pub igbt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// `mos`
    Simple,
    /// `mosd`
    SimpleDepletion,
    /// `fet`
    Enhancement,
    /// `fetd`
    Depletion,
    /// `igfete`
    InsulatedEnhancement,
    /// `igfetd`
    InsulatedDepletion,
}

impl Gate {
    fn suffix(&self) -> &'static str {
        match self {
            Gate::Simple => "mos",
            Gate::SimpleDepletion => "mosd",
            Gate::Enhancement => "fet",
            Gate::Depletion => "fetd",
            Gate::InsulatedEnhancement => "igfete",
            Gate::InsulatedDepletion => "igfetd",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MosfetKind {
    pub polarity: Polarity,
    pub gate: Gate,
    pub body_diode: bool,
}

/// The kind of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Kind {
    #[default]
    Default,
    Variant(Variant),
    Source(SourceKind),
    Switch(SwitchKind),
    Connection(Connection),
    Bjt(BjtKind),
    Jfet(Polarity),
    Mosfet(MosfetKind),
    /// Transformer with a core.
    Core,
}

impl Kind {
    /// The part written into the net item fields, e.g. `npn` or `dc`.
    pub fn cpt_kind(&self) -> &'static str {
        match self {
            Kind::Source(SourceKind::Dc) => "dc",
            Kind::Source(SourceKind::Ac) => "ac",
            Kind::Source(SourceKind::Step) => "step",
            Kind::Source(SourceKind::Noise) => "noise",
            Kind::Switch(SwitchKind::NormallyOpen) => "no",
            Kind::Switch(SwitchKind::NormallyClosed) => "nc",
            Kind::Switch(SwitchKind::Push) => "push",
            Kind::Bjt(BjtKind { polarity: Polarity::N, .. }) => "npn",
            Kind::Bjt(BjtKind { polarity: Polarity::P, .. }) => "pnp",
            Kind::Jfet(Polarity::N) => "njf",
            Kind::Jfet(Polarity::P) => "pjf",
            Kind::Mosfet(MosfetKind { polarity: Polarity::N, .. }) => "nmos",
            Kind::Mosfet(MosfetKind { polarity: Polarity::P, .. }) => "pmos",
            Kind::Core => "core",
            Kind::Default | Kind::Variant(_) | Kind::Connection(_) => "",
        }
    }

    /// The part written as the `kind=` attribute (or the bare connection
    /// keyword for wires), e.g. `nfet-bodydiode`.
    pub fn symbol_kind(&self) -> String {
        match self {
            Kind::Variant(variant) => variant.as_str().to_string(),
            Kind::Connection(connection) => connection.keyword().to_string(),
            Kind::Bjt(BjtKind {
                polarity,
                igbt: true,
            }) => format!("{}igbt", polarity.prefix()),
            Kind::Mosfet(MosfetKind {
                polarity,
                gate,
                body_diode,
            }) => {
                let mut s = format!("{}{}", polarity.prefix(), gate.suffix());
                if *body_diode {
                    s.push_str("-bodydiode");
                }
                s
            }
            _ => String::new(),
        }
    }

    pub fn is_p_type(&self) -> bool {
        matches!(
            self,
            Kind::Bjt(BjtKind {
                polarity: Polarity::P,
                ..
            }) | Kind::Jfet(Polarity::P)
                | Kind::Mosfet(MosfetKind {
                    polarity: Polarity::P,
                    ..
                })
        )
    }

    pub fn is_insulated_gate(&self) -> bool {
        matches!(
            self,
            Kind::Mosfet(MosfetKind {
                gate: Gate::InsulatedEnhancement | Gate::InsulatedDepletion,
                ..
            })
        )
    }

    pub fn has_body_diode(&self) -> bool {
        matches!(
            self,
            Kind::Mosfet(MosfetKind {
                body_diode: true,
                ..
            })
        )
    }

    pub fn connection(&self) -> Option<Connection> {
        match self {
            Kind::Connection(connection) => Some(*connection),
            _ => None,
        }
    }

    /// Look up `s` among `allowed`. The full hyphenated form wins, then a
    /// bare symbol kind, then a bare cpt kind, each taking the first match
    /// in `allowed` order.
    pub fn parse(s: &str, allowed: &[Kind]) -> Option<Kind> {
        let s = s.trim();
        allowed
            .iter()
            .find(|kind| kind.to_string() == s)
            .or_else(|| {
                allowed
                    .iter()
                    .find(|kind| !s.is_empty() && kind.symbol_kind() == s)
            })
            .or_else(|| {
                allowed
                    .iter()
                    .find(|kind| !s.is_empty() && kind.cpt_kind() == s)
            })
            .copied()
    }

    /// Rebuild a kind from its two netlist halves.
    pub fn from_parts(cpt_kind: &str, symbol_kind: &str, allowed: &[Kind]) -> Option<Kind> {
        let joined = if symbol_kind.is_empty() {
            cpt_kind.to_string()
        } else {
            format!("{cpt_kind}-{symbol_kind}")
        };
        allowed
            .iter()
            .find(|kind| kind.to_string() == joined)
            .copied()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol_kind();
        if symbol.is_empty() {
            f.write_str(self.cpt_kind())
        } else {
            write!(f, "{}-{}", self.cpt_kind(), symbol)
        }
    }
}

const fn mosfet(polarity: Polarity, gate: Gate, body_diode: bool) -> Kind {
    Kind::Mosfet(MosfetKind {
        polarity,
        gate,
        body_diode,
    })
}

const fn bjt(polarity: Polarity, igbt: bool) -> Kind {
    Kind::Bjt(BjtKind { polarity, igbt })
}

pub const PLAIN_KINDS: &[Kind] = &[Kind::Default];

pub const RESISTOR_KINDS: &[Kind] = &[
    Kind::Default,
    Kind::Variant(Variant::Variable),
    Kind::Variant(Variant::Tunable),
];

pub const CAPACITOR_KINDS: &[Kind] = &[
    Kind::Default,
    Kind::Variant(Variant::Electrolytic),
    Kind::Variant(Variant::Polar),
    Kind::Variant(Variant::Variable),
    Kind::Variant(Variant::Curved),
    Kind::Variant(Variant::Sensor),
    Kind::Variant(Variant::Tunable),
];

pub const INDUCTOR_KINDS: &[Kind] = &[
    Kind::Default,
    Kind::Variant(Variant::Variable),
    Kind::Variant(Variant::Choke),
    Kind::Variant(Variant::TwoLinesChoke),
    Kind::Variant(Variant::Sensor),
    Kind::Variant(Variant::Tunable),
];

pub const DIODE_KINDS: &[Kind] = &[
    Kind::Default,
    Kind::Variant(Variant::Led),
    Kind::Variant(Variant::Photo),
    Kind::Variant(Variant::Schottky),
    Kind::Variant(Variant::Zener),
    Kind::Variant(Variant::Tunnel),
];

pub const VOLTAGE_SOURCE_KINDS: &[Kind] = &[
    Kind::Source(SourceKind::Dc),
    Kind::Source(SourceKind::Ac),
    Kind::Source(SourceKind::Step),
    Kind::Default,
];

pub const CURRENT_SOURCE_KINDS: &[Kind] = &[
    Kind::Default,
    Kind::Source(SourceKind::Dc),
    Kind::Source(SourceKind::Ac),
    Kind::Source(SourceKind::Step),
    Kind::Source(SourceKind::Noise),
];

pub const SWITCH_KINDS: &[Kind] = &[
    Kind::Switch(SwitchKind::NormallyOpen),
    Kind::Switch(SwitchKind::NormallyClosed),
    Kind::Switch(SwitchKind::Push),
];

pub const WIRE_KINDS: &[Kind] = &[
    Kind::Default,
    Kind::Connection(Connection::Ground),
    Kind::Connection(Connection::SignalGround),
    Kind::Connection(Connection::RailGround),
    Kind::Connection(Connection::ChassisGround),
    Kind::Connection(Connection::ZeroVolt),
    Kind::Connection(Connection::Vcc),
    Kind::Connection(Connection::Vdd),
    Kind::Connection(Connection::Vee),
    Kind::Connection(Connection::Vss),
    Kind::Connection(Connection::Input),
    Kind::Connection(Connection::Output),
    Kind::Connection(Connection::Bidir),
];

pub const BJT_KINDS: &[Kind] = &[
    bjt(Polarity::N, false),
    bjt(Polarity::P, false),
    bjt(Polarity::N, true),
    bjt(Polarity::P, true),
    // Bare `Q1 c b e`, drawn as npn.
    Kind::Default,
];

pub const JFET_KINDS: &[Kind] = &[Kind::Jfet(Polarity::N), Kind::Jfet(Polarity::P), Kind::Default];

pub const MOSFET_KINDS: &[Kind] = &[
    mosfet(Polarity::N, Gate::Enhancement, false),
    mosfet(Polarity::P, Gate::Enhancement, false),
    mosfet(Polarity::N, Gate::Simple, false),
    mosfet(Polarity::P, Gate::Simple, false),
    mosfet(Polarity::N, Gate::SimpleDepletion, false),
    mosfet(Polarity::P, Gate::SimpleDepletion, false),
    mosfet(Polarity::N, Gate::Enhancement, true),
    mosfet(Polarity::P, Gate::Enhancement, true),
    mosfet(Polarity::N, Gate::Depletion, false),
    mosfet(Polarity::P, Gate::Depletion, false),
    mosfet(Polarity::N, Gate::Depletion, true),
    mosfet(Polarity::P, Gate::Depletion, true),
    mosfet(Polarity::N, Gate::InsulatedDepletion, false),
    mosfet(Polarity::P, Gate::InsulatedDepletion, false),
    mosfet(Polarity::N, Gate::InsulatedEnhancement, false),
    mosfet(Polarity::P, Gate::InsulatedEnhancement, false),
    Kind::Default,
];

pub const TRANSFORMER_KINDS: &[Kind] = &[Kind::Default, Kind::Core];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphenated_form() {
        assert_eq!(Kind::Default.to_string(), "");
        assert_eq!(Kind::Variant(Variant::Variable).to_string(), "-variable");
        assert_eq!(Kind::Connection(Connection::Ground).to_string(), "-ground");
        assert_eq!(Kind::Source(SourceKind::Dc).to_string(), "dc");
        assert_eq!(bjt(Polarity::P, true).to_string(), "pnp-pigbt");
        assert_eq!(
            mosfet(Polarity::N, Gate::Enhancement, true).to_string(),
            "nmos-nfet-bodydiode"
        );
        assert_eq!(Kind::Jfet(Polarity::N).to_string(), "njf");
    }

    #[test]
    fn test_every_kind_string_is_unique_within_family() {
        for family in [
            RESISTOR_KINDS,
            CAPACITOR_KINDS,
            INDUCTOR_KINDS,
            DIODE_KINDS,
            VOLTAGE_SOURCE_KINDS,
            CURRENT_SOURCE_KINDS,
            SWITCH_KINDS,
            WIRE_KINDS,
            BJT_KINDS,
            JFET_KINDS,
            MOSFET_KINDS,
            TRANSFORMER_KINDS,
        ] {
            for kind in family {
                assert_eq!(Kind::parse(&kind.to_string(), family), Some(*kind));
            }
        }
    }

    #[test]
    fn test_parse_short_forms() {
        assert_eq!(
            Kind::parse("led", DIODE_KINDS),
            Some(Kind::Variant(Variant::Led))
        );
        assert_eq!(
            Kind::parse("pfet", MOSFET_KINDS),
            Some(mosfet(Polarity::P, Gate::Enhancement, false))
        );
        assert_eq!(Kind::parse("pjf", JFET_KINDS), Some(Kind::Jfet(Polarity::P)));
        assert_eq!(Kind::parse("bogus", MOSFET_KINDS), None);
        assert_eq!(
            Kind::from_parts("nmos", "nigfete", MOSFET_KINDS),
            Some(mosfet(Polarity::N, Gate::InsulatedEnhancement, false))
        );
    }

    #[test]
    fn test_predicates() {
        let pfet_diode = mosfet(Polarity::P, Gate::Enhancement, true);
        assert!(pfet_diode.is_p_type());
        assert!(pfet_diode.has_body_diode());
        assert!(!pfet_diode.is_insulated_gate());
        assert!(mosfet(Polarity::N, Gate::InsulatedDepletion, false).is_insulated_gate());
        assert!(!Kind::Jfet(Polarity::N).is_p_type());
    }

    #[test]
    fn test_connection_keywords() {
        assert_eq!(Connection::from_keyword("implicit"), Some(Connection::Ground));
        assert_eq!(Connection::from_keyword("0V"), Some(Connection::ZeroVolt));
        assert_eq!(Connection::from_keyword("right"), None);
    }

    #[test]
    fn test_style_round_trip() {
        for style in SymbolStyle::ALL {
            assert_eq!(style.as_str().parse::<SymbolStyle>(), Ok(style));
        }
        assert!("gothic".parse::<SymbolStyle>().is_err());
    }
}
