//! Undo history.
//!
//! Every successful edit records one [`HistoryEvent`] holding enough of the
//! previous state (component records, node positions, wire routes) to be
//! reverted and replayed exactly.

use crate::component::Component;
use crate::geometry::Position;

/// A circuit node. Placeholder nodes have no position.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub position: Option<Position>,
}

impl Node {
    pub fn new<S: Into<String>>(name: S, position: Option<Position>) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// A component as it sits in the circuit, with the nodes that exist only
/// because of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub component: Component,
    /// Position in the component list.
    pub index: usize,
    /// Nodes created with the component, or orphaned by its removal.
    pub nodes: Vec<Node>,
    /// Corner waypoints of a dynamic wire.
    pub route: Option<Vec<Position>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeMove {
    pub name: String,
    pub from: Position,
    pub to: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reroute {
    pub wire: String,
    pub from: Vec<Position>,
    pub to: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    Add(Placement),
    Delete(Placement),
    /// Nodes shifted in place.
    Move {
        nodes: Vec<NodeMove>,
        reroutes: Vec<Reroute>,
    },
    /// A component detached from shared nodes and recreated elsewhere.
    Replace { before: Placement, after: Placement },
}

impl HistoryEvent {
    /// Single-letter code: `A`dd, `D`elete, `M`ove, `R`eplace.
    pub fn code(&self) -> char {
        match self {
            HistoryEvent::Add(_) => 'A',
            HistoryEvent::Delete(_) => 'D',
            HistoryEvent::Move { .. } => 'M',
            HistoryEvent::Replace { .. } => 'R',
        }
    }

    /// Code of the event that undoes this one.
    pub fn inverse_code(&self) -> char {
        match self {
            HistoryEvent::Add(_) => 'D',
            HistoryEvent::Delete(_) => 'A',
            HistoryEvent::Move { .. } => 'M',
            HistoryEvent::Replace { .. } => 'R',
        }
    }

    /// Name of the component the event is about, if any.
    pub fn component_name(&self) -> Option<&str> {
        match self {
            HistoryEvent::Add(placement) | HistoryEvent::Delete(placement) => {
                Some(&placement.component.name)
            }
            HistoryEvent::Replace { after, .. } => Some(&after.component.name),
            HistoryEvent::Move { .. } => None,
        }
    }
}

/// Undo and redo stacks. Recording a new event clears the redo stack.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<HistoryEvent>,
    redo: Vec<HistoryEvent>,
}

impl History {
    pub fn record(&mut self, event: HistoryEvent) {
        self.undo.push(event);
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.undo
    }

    pub(crate) fn pop_undo(&mut self) -> Option<HistoryEvent> {
        self.undo.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<HistoryEvent> {
        self.redo.pop()
    }

    pub(crate) fn push_undone(&mut self, event: HistoryEvent) {
        self.redo.push(event);
    }

    pub(crate) fn push_redone(&mut self, event: HistoryEvent) {
        self.undo.push(event);
    }
}
