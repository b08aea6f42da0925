//! Points, polygons and snapping in schematic-grid units.

use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Geometric failures. All of them are detected before any transform is
/// fitted, so they never leave partially placed state behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Local reference segment has zero length")]
    ZeroLengthLocal,

    #[error("World reference segment has zero length")]
    ZeroLengthWorld,

    #[error("Anchor points are too close ({distance:.3} < {minimum})")]
    AnchorsTooClose { distance: f64, minimum: f64 },

    #[error("Transform is singular and cannot be inverted")]
    Singular,

    #[error("Node {0} has no position")]
    Unplaced(String),
}

/// A point in schematic-grid units. The y axis points up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: Position) -> f64 {
        (*self - other).norm()
    }

    pub fn is_close(&self, other: Position, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Position::new(x, y)
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Position {
    type Output = Position;

    fn mul(self, rhs: f64) -> Position {
        Position::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Position {
    type Output = Position;

    fn div(self, rhs: f64) -> Position {
        Position::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Position {
    type Output = Position;

    fn neg(self) -> Position {
        Position::new(-self.x, -self.y)
    }
}

/// Axis-aligned bounds of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn from_points<I: IntoIterator<Item = Position>>(points: I) -> Option<Bounds> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(
            Bounds {
                min: first,
                max: first,
            },
            |bounds, p| Bounds {
                min: Position::new(bounds.min.x.min(p.x), bounds.min.y.min(p.y)),
                max: Position::new(bounds.max.x.max(p.x), bounds.max.y.max(p.y)),
            },
        ))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn expand(&self, margin: f64) -> Bounds {
        Bounds {
            min: Position::new(self.min.x - margin, self.min.y - margin),
            max: Position::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

/// Ray-crossing point-in-polygon test.
///
/// A horizontal ray is cast towards +x and edges are counted with a
/// half-open rule: an edge spans `[min_y, max_y)` and a crossing counts only
/// when it lies strictly to the right of the point. Points on a left or
/// bottom edge are therefore inside, points on a right or top edge outside.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[Position]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > y) != (pj.y > y) {
            let x_cross = pi.x + (y - pi.y) * (pj.x - pi.x) / (pj.y - pi.y);
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Round `value` to the nearest multiple of `spacing`, halves rounding up.
pub fn snap_to_grid(value: f64, spacing: f64) -> f64 {
    ((value + 0.5 * spacing) / spacing).floor() * spacing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Position> {
        vec![
            Position::new(-1.0, -1.0),
            Position::new(1.0, -1.0),
            Position::new(1.0, 1.0),
            Position::new(-1.0, 1.0),
        ]
    }

    #[test]
    fn test_position_arithmetic() {
        let a = Position::new(1.0, 2.0);
        let b = Position::new(3.0, -1.0);
        assert_eq!(a + b, Position::new(4.0, 1.0));
        assert_eq!(b - a, Position::new(2.0, -3.0));
        assert_eq!(a * 2.0, Position::new(2.0, 4.0));
        assert_eq!(b / 2.0, Position::new(1.5, -0.5));
        assert_eq!(-a, Position::new(-1.0, -2.0));
        assert_eq!(Position::new(3.0, 4.0).norm(), 5.0);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = square();
        assert!(point_in_polygon(0.0, 0.0, &square));
        assert!(point_in_polygon(0.99, -0.99, &square));
        assert!(!point_in_polygon(1.5, 0.0, &square));
        assert!(!point_in_polygon(0.0, 100.0, &square));
    }

    #[test]
    fn test_edge_tie_break() {
        let square = square();
        assert!(point_in_polygon(-1.0, 0.0, &square), "left edge is inside");
        assert!(point_in_polygon(0.0, -1.0, &square), "bottom edge is inside");
        assert!(!point_in_polygon(1.0, 0.0, &square), "right edge is outside");
        assert!(!point_in_polygon(0.0, 1.0, &square), "top edge is outside");
    }

    #[test]
    fn test_triangle() {
        let triangle = [
            Position::new(-0.85, -0.75),
            Position::new(-0.85, 0.75),
            Position::new(0.85, 0.0),
        ];
        assert!(point_in_polygon(0.0, 0.0, &triangle));
        assert!(!point_in_polygon(0.8, 0.5, &triangle));
    }

    #[test]
    fn test_degenerate_polygon() {
        assert!(!point_in_polygon(0.0, 0.0, &[Position::new(0.0, 0.0)]));
    }

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid(0.2, 0.5), 0.0);
        assert_eq!(snap_to_grid(0.25, 0.5), 0.5);
        assert_eq!(snap_to_grid(1.74, 0.5), 1.5);
        assert_eq!(snap_to_grid(-0.3, 0.5), -0.5);
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds::from_points(square()).unwrap();
        assert_eq!(bounds.width(), 2.0);
        assert_eq!(bounds.height(), 2.0);
        assert!(Bounds::from_points(Vec::new()).is_none());
        assert_eq!(bounds.expand(1.0).min, Position::new(-2.0, -2.0));
    }
}
