//! Pin tables.
//!
//! Every component family declares its pins once, in a local unit frame.
//! Mirrored and inverted symbols use tables derived from that canonical
//! table rather than hand-written copies, see [`PinVariants`].

use crate::geometry::Position;

/// Which side of the symbol a pin attaches to. Only used to place pin
/// labels; the transform math ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinSide {
    Left,
    Right,
    Top,
    Bottom,
    /// Left side, drawn outside the symbol body.
    LeftExternal,
    /// Right side, drawn outside the symbol body.
    RightExternal,
}

impl PinSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinSide::Left => "l",
            PinSide::Right => "r",
            PinSide::Top => "t",
            PinSide::Bottom => "b",
            PinSide::LeftExternal => "lx",
            PinSide::RightExternal => "rx",
        }
    }

    fn flip_horizontal(self) -> Self {
        match self {
            PinSide::Left => PinSide::Right,
            PinSide::Right => PinSide::Left,
            PinSide::LeftExternal => PinSide::RightExternal,
            PinSide::RightExternal => PinSide::LeftExternal,
            other => other,
        }
    }

    fn flip_vertical(self) -> Self {
        match self {
            PinSide::Top => PinSide::Bottom,
            PinSide::Bottom => PinSide::Top,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pin {
    pub name: &'static str,
    pub side: PinSide,
    pub position: Position,
}

impl Pin {
    pub const fn new(name: &'static str, side: PinSide, x: f64, y: f64) -> Self {
        Self {
            name,
            side,
            position: Position::new(x, y),
        }
    }
}

/// An ordered set of pins, looked up by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PinTable {
    pins: Vec<Pin>,
}

impl PinTable {
    pub fn new(pins: &[Pin]) -> Self {
        Self {
            pins: pins.to_vec(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Pin> {
        self.pins.iter().find(|pin| pin.name == name)
    }

    pub fn position(&self, name: &str) -> Option<Position> {
        self.get(name).map(|pin| pin.position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Reflect about the x axis (y -> -y).
    pub fn mirrored(&self) -> PinTable {
        self.map(|pin| Pin {
            side: pin.side.flip_vertical(),
            position: Position::new(pin.position.x, -pin.position.y),
            ..*pin
        })
    }

    /// Reflect about the y axis (x -> -x).
    pub fn inverted(&self) -> PinTable {
        self.map(|pin| Pin {
            side: pin.side.flip_horizontal(),
            position: Position::new(-pin.position.x, pin.position.y),
            ..*pin
        })
    }

    /// Exchange the positions of each named pair, e.g. the inputs of an
    /// opamp.
    pub fn swapped(&self, pairs: &[(&str, &str)]) -> PinTable {
        self.map(|pin| {
            let partner = pairs.iter().find_map(|&(a, b)| {
                if pin.name == a {
                    Some(b)
                } else if pin.name == b {
                    Some(a)
                } else {
                    None
                }
            });
            match partner.and_then(|name| self.get(name)) {
                Some(other) => Pin {
                    side: other.side,
                    position: other.position,
                    ..*pin
                },
                None => *pin,
            }
        })
    }

    fn map<F: Fn(&Pin) -> Pin>(&self, f: F) -> PinTable {
        PinTable {
            pins: self.pins.iter().map(f).collect(),
        }
    }
}

/// The four pin tables of a family, indexed by `[mirror][invert]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PinVariants {
    tables: [[PinTable; 2]; 2],
}

impl PinVariants {
    /// The same table regardless of the flags.
    pub fn fixed(table: PinTable) -> Self {
        Self {
            tables: [
                [table.clone(), table.clone()],
                [table.clone(), table],
            ],
        }
    }

    /// Mirror reflects y, invert reflects x.
    pub fn reflected(canonical: PinTable) -> Self {
        let inverted = canonical.inverted();
        let mirrored = canonical.mirrored();
        let both = mirrored.inverted();
        Self {
            tables: [[canonical, inverted], [mirrored, both]],
        }
    }

    /// Mirror exchanges each pair of pins; invert is ignored.
    pub fn swapped(canonical: PinTable, pairs: &[(&str, &str)]) -> Self {
        let swapped = canonical.swapped(pairs);
        Self {
            tables: [
                [canonical.clone(), canonical],
                [swapped.clone(), swapped],
            ],
        }
    }

    pub fn select(&self, mirror: bool, invert: bool) -> &PinTable {
        &self.tables[usize::from(mirror)][usize::from(invert)]
    }

    pub fn canonical(&self) -> &PinTable {
        self.select(false, false)
    }

    /// All four tables with their `(mirror, invert)` flags.
    pub fn iter(&self) -> impl Iterator<Item = ((bool, bool), &PinTable)> {
        [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .map(move |(m, i)| ((m, i), self.select(m, i)))
    }
}
