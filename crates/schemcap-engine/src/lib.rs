//! # schemcap-engine
//!
//! Geometric core of the schemcap schematic editor. Components are declared
//! in a unit local frame and placed by fitting a similarity transform to the
//! two points the user clicked; the same transform drives hit testing, node
//! positions and the direction attribute written to the netlist.
//!
//! The crate is organised bottom-up:
//!
//! * [`tf`] and [`geometry`]: transforms, points and polygons.
//! * [`pins`], [`kinds`], [`family`], [`registry`]: the component catalogue.
//! * [`component`]: placement of a single component.
//! * [`router`]: the A* wire solver used by dynamic wires.
//! * [`circuit`] and [`history`]: the editable circuit with undo and redo.
//! * [`sketch`], [`render`], [`preferences`]: drawing and user settings.

pub mod circuit;
pub mod component;
pub mod family;
pub mod geometry;
pub mod history;
pub mod kinds;
pub mod pins;
pub mod preferences;
pub mod registry;
pub mod render;
pub mod router;
pub mod sketch;
pub mod tf;

pub use circuit::{Circuit, CircuitConfig, EditorError};
pub use component::{Component, PlacedComponent};
pub use family::{Family, Shape};
pub use geometry::{Bounds, GeometryError, Position};
pub use kinds::{Kind, SymbolStyle};
pub use preferences::Preferences;
pub use registry::{ComponentRegistry, RegistryError};
pub use router::{simplify_path, GridCell, RouteError, WireSolver};
pub use tf::TF;
