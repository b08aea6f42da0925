//! The circuit editor model.
//!
//! A [`Circuit`] owns the nodes and components of one schematic and is the
//! only thing that mutates them. Every edit is computed on a copy of the
//! current state and committed only when it fully succeeds, so a failed
//! operation never leaves half-placed components or history behind.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};
use schemcap_netlist::{NetlistError, NodePosition, Schematic};
use thiserror::Error;

use crate::component::{Component, PlacedComponent, DEFAULT_NODE_SPACING};
use crate::family::{Family, Shape};
use crate::geometry::{snap_to_grid, Bounds, GeometryError, Position};
use crate::history::{History, HistoryEvent, Node, NodeMove, Placement, Reroute};
use crate::preferences::Preferences;
use crate::registry::{ComponentRegistry, RegistryError};
use crate::router::{simplify_path, GridCell, RouteError, RouterConfig, WireSolver};

/// Nodes closer than this are the same node.
pub const NODE_TOLERANCE: f64 = 1e-6;
/// Search radius of [`Circuit::closest_node`].
pub const SNAP_RADIUS: f64 = 0.3;
pub const GROUND_NODE: &str = "0";
/// Name written in the header of saved schematics.
pub const GENERATOR: &str = "schemcap";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Netlist(#[from] NetlistError),

    #[error("Unknown component `{0}`")]
    UnknownComponent(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

#[derive(Debug, Clone)]
pub struct CircuitConfig {
    pub node_spacing: f64,
    pub grid_spacing: f64,
    pub snap_grid: bool,
    pub router: RouterConfig,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            node_spacing: DEFAULT_NODE_SPACING,
            grid_spacing: 0.5,
            snap_grid: true,
            router: RouterConfig::default(),
        }
    }
}

impl From<&Preferences> for CircuitConfig {
    fn from(preferences: &Preferences) -> Self {
        Self {
            node_spacing: preferences.node_spacing,
            grid_spacing: preferences.grid_spacing,
            snap_grid: preferences.snap_grid,
            ..Default::default()
        }
    }
}

/// Numeric node names sort numerically and before the others.
fn node_order(name: &str) -> (bool, u64, &str) {
    match name.parse::<u64>() {
        Ok(n) => (false, n, name),
        Err(_) => (true, 0, name),
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    /// Sorted by [`node_order`].
    nodes: Vec<Node>,
    components: Vec<Component>,
    /// Corner waypoints of each dynamic wire.
    routes: BTreeMap<String, Vec<Position>>,
}

impl State {
    fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.name == name)
    }

    fn node_at(&self, position: Position) -> Option<&Node> {
        self.nodes.iter().find(|node| {
            node.position
                .is_some_and(|p| p.is_close(position, NODE_TOLERANCE))
        })
    }

    fn insert_node(&mut self, node: Node) {
        match self
            .nodes
            .binary_search_by(|other| node_order(&other.name).cmp(&node_order(&node.name)))
        {
            Ok(index) => self.nodes[index] = node,
            Err(index) => self.nodes.insert(index, node),
        }
    }

    fn remove_node(&mut self, name: &str) {
        self.nodes.retain(|node| node.name != name);
    }

    /// Smallest positive integer not used as a node name.
    fn next_node_name(&self) -> String {
        let mut n = 1u64;
        loop {
            let name = n.to_string();
            if self.node(&name).is_none() {
                return name;
            }
            n += 1;
        }
    }

    fn component_index(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|cpt| cpt.name == name)
    }

    /// Number of components connected to a node.
    fn users(&self, node: &str) -> usize {
        self.components
            .iter()
            .filter(|cpt| cpt.nodes.iter().any(|name| name == node))
            .count()
    }

    fn positions(&self, component: &Component) -> Vec<Option<Position>> {
        component
            .nodes
            .iter()
            .map(|name| self.node(name).and_then(|node| node.position))
            .collect()
    }

    /// Remove a component together with its orphaned nodes and route.
    fn detach(&mut self, index: usize) -> Placement {
        let component = self.components.remove(index);
        let route = self.routes.remove(&component.name);

        let mut orphans: Vec<Node> = Vec::new();
        for name in &component.nodes {
            if self.users(name) > 0 || orphans.iter().any(|node| &node.name == name) {
                continue;
            }
            if let Some(node) = self.node(name).cloned() {
                self.remove_node(name);
                orphans.push(node);
            }
        }

        Placement {
            component,
            index,
            nodes: orphans,
            route,
        }
    }

    /// Undo [`State::detach`] or replay an add.
    fn restore(&mut self, placement: &Placement) {
        for node in &placement.nodes {
            self.insert_node(node.clone());
        }
        let index = placement.index.min(self.components.len());
        self.components.insert(index, placement.component.clone());
        if let Some(route) = &placement.route {
            self.routes
                .insert(placement.component.name.clone(), route.clone());
        }
    }

    /// Undo [`State::restore`].
    fn remove(&mut self, placement: &Placement) {
        let name = &placement.component.name;
        self.components.retain(|cpt| &cpt.name != name);
        self.routes.remove(name);
        for node in &placement.nodes {
            self.remove_node(&node.name);
        }
    }

    fn apply(&mut self, event: &HistoryEvent) {
        match event {
            HistoryEvent::Add(placement) => self.restore(placement),
            HistoryEvent::Delete(placement) => self.remove(placement),
            HistoryEvent::Move { nodes, reroutes } => {
                for moved in nodes {
                    self.set_position(&moved.name, moved.to);
                }
                for reroute in reroutes {
                    self.routes.insert(reroute.wire.clone(), reroute.to.clone());
                }
            }
            HistoryEvent::Replace { before, after } => {
                self.remove(before);
                self.restore(after);
            }
        }
    }

    fn revert(&mut self, event: &HistoryEvent) {
        match event {
            HistoryEvent::Add(placement) => self.remove(placement),
            HistoryEvent::Delete(placement) => self.restore(placement),
            HistoryEvent::Move { nodes, reroutes } => {
                for moved in nodes {
                    self.set_position(&moved.name, moved.from);
                }
                for reroute in reroutes {
                    self.routes
                        .insert(reroute.wire.clone(), reroute.from.clone());
                }
            }
            HistoryEvent::Replace { before, after } => {
                self.remove(after);
                self.restore(before);
            }
        }
    }

    fn set_position(&mut self, name: &str, position: Position) {
        if let Some(node) = self.node_mut(name) {
            node.position = Some(position);
        }
    }
}

/// A schematic being edited.
#[derive(Debug, Clone)]
pub struct Circuit<'r> {
    registry: &'r ComponentRegistry,
    config: CircuitConfig,
    state: State,
    history: History,
}

impl<'r> Circuit<'r> {
    pub fn new(registry: &'r ComponentRegistry, config: CircuitConfig) -> Self {
        Self {
            registry,
            config,
            state: State::default(),
            history: History::default(),
        }
    }

    pub fn registry(&self) -> &'r ComponentRegistry {
        self.registry
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    pub fn components(&self) -> &[Component] {
        &self.state.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.state
            .component_index(name)
            .map(|index| &self.state.components[index])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.state.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.state.node(name)
    }

    pub fn ground_node(&self) -> Option<&Node> {
        self.state.node(GROUND_NODE)
    }

    /// Number of components connected to `node`.
    pub fn node_users(&self, node: &str) -> usize {
        self.state.users(node)
    }

    /// Corner waypoints of a dynamic wire, excluding its end nodes.
    pub fn route(&self, wire: &str) -> Option<&[Position]> {
        self.state.routes.get(wire).map(Vec::as_slice)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn family(&self, component: &Component) -> Result<&'r Family, RegistryError> {
        self.registry.get(component.type_tag)
    }

    /// Geometry view of one of this circuit's components.
    pub fn placed<'c>(&'c self, component: &'c Component) -> Result<PlacedComponent<'c>, EditorError> {
        let family = self.family(component)?;
        Ok(PlacedComponent::new(
            component,
            family,
            self.state.positions(component),
        ))
    }

    /// Create a component whose reference pins land on `(x1, y1)` and
    /// `(x2, y2)`. Returns the new component's name.
    pub fn create(
        &mut self,
        type_tag: &str,
        kind: &str,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Result<String, EditorError> {
        let family = self.registry.get(type_tag)?;
        let kind = self.registry.kind(family, kind)?;
        let name = self
            .registry
            .choose_name(family, |name| self.state.component_index(name).is_some());

        let mut state = self.state.clone();
        let index = state.components.len();
        let placement = self.place(
            &mut state,
            Component::new(name.clone(), family, kind),
            family,
            (Position::new(x1, y1), Position::new(x2, y2)),
            index,
        )?;

        info!("Created {} at ({x1}, {y1}) -> ({x2}, {y2})", name);
        self.commit(state, HistoryEvent::Add(placement));
        Ok(name)
    }

    pub fn delete(&mut self, name: &str) -> Result<(), EditorError> {
        let index = self.index_of(name)?;
        let mut state = self.state.clone();
        let placement = state.detach(index);
        info!("Deleted {name}");
        self.commit(state, HistoryEvent::Delete(placement));
        Ok(())
    }

    /// Shift a component by `(dx, dy)`.
    ///
    /// A component that shares no node with another one, or any component
    /// when `move_nodes` is set, drags its nodes along. Otherwise the
    /// component is detached from its shared nodes and recreated at the
    /// shifted position. Dynamic wires attached to moved nodes are rerouted;
    /// if any of them cannot be, nothing moves.
    pub fn move_component(
        &mut self,
        name: &str,
        dx: f64,
        dy: f64,
        move_nodes: bool,
    ) -> Result<(), EditorError> {
        let index = self.index_of(name)?;
        let component = self.state.components[index].clone();
        let family = self.family(&component)?;
        let delta = Position::new(dx, dy);
        let shared = component
            .nodes
            .iter()
            .any(|node| self.state.users(node) > 1);

        let mut state = self.state.clone();
        let event = if move_nodes || !shared {
            let mut moves = Vec::new();
            for node_name in &component.nodes {
                if moves.iter().any(|m: &NodeMove| &m.name == node_name) {
                    continue;
                }
                if let Some(node) = state.node_mut(node_name) {
                    if let Some(from) = node.position {
                        let to = from + delta;
                        node.position = Some(to);
                        moves.push(NodeMove {
                            name: node_name.clone(),
                            from,
                            to,
                        });
                    }
                }
            }
            let moved: HashSet<&str> = moves.iter().map(|m| m.name.as_str()).collect();
            self.check_stretched(&state, &moved)?;
            let reroutes = self.reroute_attached(&mut state, &moved)?;
            HistoryEvent::Move {
                nodes: moves,
                reroutes,
            }
        } else {
            let placed = PlacedComponent::new(&component, family, state.positions(&component));
            let (a1, a2) = placed.anchors()?;
            let before = state.detach(index);
            let after = self.place(
                &mut state,
                before.component.clone(),
                family,
                (a1 + delta, a2 + delta),
                index,
            )?;
            HistoryEvent::Replace { before, after }
        };

        debug!("Moved {name} by ({dx}, {dy})");
        self.commit(state, event);
        Ok(())
    }

    pub fn undo(&mut self) -> Result<(), EditorError> {
        let event = self.history.pop_undo().ok_or(EditorError::NothingToUndo)?;
        debug!("Undo {}", event.code());
        self.state.revert(&event);
        self.history.push_undone(event);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), EditorError> {
        let event = self.history.pop_redo().ok_or(EditorError::NothingToRedo)?;
        debug!("Redo {}", event.code());
        self.state.apply(&event);
        self.history.push_redone(event);
        Ok(())
    }

    /// First component whose hit-test polygon contains the point.
    pub fn component_at(&self, x: f64, y: f64) -> Option<&Component> {
        self.state.components.iter().find(|component| {
            self.placed(component)
                .is_ok_and(|placed| placed.is_within_bbox(x, y))
        })
    }

    /// Closest positioned node within [`SNAP_RADIUS`].
    pub fn closest_node(&self, x: f64, y: f64) -> Option<&Node> {
        let target = Position::new(x, y);
        self.state
            .nodes
            .iter()
            .filter_map(|node| node.position.map(|p| (node, p.distance(target))))
            .filter(|(_, distance)| *distance < SNAP_RADIUS)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(node, _)| node)
    }

    /// Snap to the closest node, else to the grid when grid snapping is on.
    pub fn snap(&self, x: f64, y: f64) -> Position {
        if let Some(position) = self.closest_node(x, y).and_then(|node| node.position) {
            return position;
        }
        if self.config.snap_grid {
            let spacing = self.config.grid_spacing;
            return Position::new(snap_to_grid(x, spacing), snap_to_grid(y, spacing));
        }
        Position::new(x, y)
    }

    /// Bounds of every node and wire waypoint.
    pub fn bounding_box(&self) -> Option<Bounds> {
        Bounds::from_points(
            self.state
                .nodes
                .iter()
                .filter_map(|node| node.position)
                .chain(self.state.routes.values().flatten().copied()),
        )
    }

    /// The saveable document.
    pub fn schematic(&self, preferences: &Preferences) -> Result<Schematic, EditorError> {
        let nodes = self
            .state
            .nodes
            .iter()
            .filter_map(|node| {
                node.position
                    .map(|p| NodePosition::new(node.name.clone(), p.x, p.y))
            })
            .collect();

        let items = self
            .state
            .components
            .iter()
            .map(|component| {
                Ok(self
                    .placed(component)?
                    .netitem(self.config.node_spacing)?)
            })
            .collect::<Result<Vec<_>, EditorError>>()?;

        Ok(Schematic {
            header: Some(format!(
                "Created by {} V{}",
                GENERATOR,
                env!("CARGO_PKG_VERSION")
            )),
            nodes,
            items,
            options: preferences.schematic_options(),
        })
    }

    /// Rebuild a circuit from schematic text. Node positions come from the
    /// `; nodes={...}` line; nodes missing from it have no position.
    pub fn from_schematic(
        text: &str,
        registry: &'r ComponentRegistry,
        config: CircuitConfig,
    ) -> Result<Self, EditorError> {
        let schematic = Schematic::parse(text)?;
        let mut circuit = Circuit::new(registry, config);
        let state = &mut circuit.state;

        for node in &schematic.nodes {
            state.insert_node(Node::new(
                node.name.clone(),
                Some(Position::new(node.x, node.y)),
            ));
        }

        for item in &schematic.items {
            let family = registry.family_for_item(item)?;
            let mut component = Component::from_net_item(item, family)?;

            // Anonymous wires (`W 1 2`) and duplicates get a fresh name.
            if component.name == family.name_prefix
                || state.component_index(&component.name).is_some()
            {
                let name = registry.choose_name(family, |name| state.component_index(name).is_some());
                debug!("Renaming {} to {}", component.name, name);
                component.name = name;
            }

            for name in &component.nodes {
                if state.node(name).is_none() {
                    if family.node_pinnames.len() == 2 {
                        warn!("Node {} of {} has no position", name, component.name);
                    }
                    state.insert_node(Node::new(name.clone(), None));
                }
            }
            state.components.push(component);
        }

        info!(
            "Loaded {} components and {} nodes",
            circuit.state.components.len(),
            circuit.state.nodes.len()
        );
        Ok(circuit)
    }

    fn index_of(&self, name: &str) -> Result<usize, EditorError> {
        self.state
            .component_index(name)
            .ok_or_else(|| EditorError::UnknownComponent(name.to_string()))
    }

    /// A move may not bring the two reference nodes of any component it
    /// stretches onto the same point.
    fn check_stretched(&self, state: &State, moved: &HashSet<&str>) -> Result<(), EditorError> {
        for cpt in &state.components {
            if !cpt.nodes.iter().any(|node| moved.contains(node.as_str())) {
                continue;
            }
            let family = self.family(cpt)?;
            let placed = PlacedComponent::new(cpt, family, state.positions(cpt));
            if let Err(GeometryError::ZeroLengthWorld) = placed.tf() {
                warn!("Move would collapse {}", cpt.name);
                return Err(GeometryError::ZeroLengthWorld.into());
            }
        }
        Ok(())
    }

    fn commit(&mut self, state: State, event: HistoryEvent) {
        self.state = state;
        self.history.record(event);
    }

    /// Assign nodes to `component` at the given anchors, reusing nodes that
    /// already sit at a pin position, and insert it into `state`.
    fn place(
        &self,
        state: &mut State,
        mut component: Component,
        family: &Family,
        anchors: (Position, Position),
        index: usize,
    ) -> Result<Placement, EditorError> {
        let (a1, a2) = anchors;
        let positions = component.assign_positions(family, a1.x, a1.y, a2.x, a2.y)?;

        let mut created = Vec::new();
        let mut names = Vec::with_capacity(positions.len());
        for position in positions {
            let existing = position
                .and_then(|p| state.node_at(p))
                .map(|node| node.name.clone());
            let name = match existing {
                Some(name) => name,
                None => {
                    let node = Node::new(state.next_node_name(), position);
                    state.insert_node(node.clone());
                    let name = node.name.clone();
                    created.push(node);
                    name
                }
            };
            names.push(name);
        }

        // Voltage controlled sources repeat their own nodes as control nodes
        // until the user edits them.
        if family.control_args == 2 {
            let repeats = component.control.is_empty()
                || (component.nodes.len() >= 2 && component.control[..] == component.nodes[..2]);
            if repeats {
                component.control = names[..2].to_vec();
            }
        }
        component.nodes = names;

        let route = if family.shape == Shape::DynamicWire {
            let route = self.route_wire(state, &component)?;
            state.routes.insert(component.name.clone(), route.clone());
            Some(route)
        } else {
            None
        };

        state.components.insert(index, component.clone());
        Ok(Placement {
            component,
            index,
            nodes: created,
            route,
        })
    }

    /// Route a dynamic wire around every node except its own two.
    fn route_wire(&self, state: &State, wire: &Component) -> Result<Vec<Position>, EditorError> {
        let ends: Vec<Position> = state.positions(wire).into_iter().flatten().collect();
        if ends.len() != 2 {
            return Err(GeometryError::Unplaced(wire.name.clone()).into());
        }
        let (start, end) = (ends[0], ends[1]);

        let mut solver = WireSolver::new(self.config.router.clone());
        solver.occupy(
            state
                .nodes
                .iter()
                .filter(|node| !wire.nodes.contains(&node.name))
                .filter_map(|node| node.position),
        );

        let path = solver.solve(GridCell::nearest(start), GridCell::nearest(end))?;
        let corners = simplify_path(&path);
        Ok(corners
            .iter()
            .skip(1)
            .take(corners.len().saturating_sub(2))
            .map(GridCell::position)
            .collect())
    }

    /// Reroute every dynamic wire touching a moved node.
    fn reroute_attached(
        &self,
        state: &mut State,
        moved: &HashSet<&str>,
    ) -> Result<Vec<Reroute>, EditorError> {
        let wires: Vec<Component> = state
            .components
            .iter()
            .filter(|cpt| {
                self.registry
                    .get(cpt.type_tag)
                    .is_ok_and(|family| family.shape == Shape::DynamicWire)
            })
            .filter(|cpt| cpt.nodes.iter().any(|node| moved.contains(node.as_str())))
            .cloned()
            .collect();

        let mut reroutes = Vec::with_capacity(wires.len());
        for wire in wires {
            let to = self.route_wire(state, &wire)?;
            let from = state
                .routes
                .insert(wire.name.clone(), to.clone())
                .unwrap_or_default();
            reroutes.push(Reroute {
                wire: wire.name,
                from,
                to,
            });
        }
        Ok(reroutes)
    }
}
