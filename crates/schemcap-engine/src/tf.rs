//! 2D similarity transforms.
//!
//! A [`TF`] is a rotation combined with a uniform scale and a translation.
//! It is stored as the complex multiplier `a + ib` and an offset, so a point
//! maps as
//!
//! ```text
//! x' = a x - b y + tx
//! y' = b x + a y + ty
//! ```
//!
//! Builder operations (`rotate_deg`, `scale`, `translate`) apply *after* the
//! existing transform, in world coordinates: `tf.rotate_deg(90).translate(1, 0)`
//! first maps through `tf`, then rotates about the origin, then shifts.

use crate::geometry::{GeometryError, Position};

/// Below this squared length a segment or scale is treated as zero.
const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TF {
    a: f64,
    b: f64,
    tx: f64,
    ty: f64,
}

impl Default for TF {
    fn default() -> Self {
        Self::identity()
    }
}

impl TF {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Rotate by `angle` degrees, then scale by `scale`, then translate.
    pub fn new(angle_deg: f64, scale: f64, translation: Position) -> Self {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        Self {
            a: scale * cos,
            b: scale * sin,
            tx: translation.x,
            ty: translation.y,
        }
    }

    pub fn rotate_deg(&self, angle: f64) -> TF {
        self.compose(&TF::new(angle, 1.0, Position::default()))
    }

    pub fn scale(&self, factor: f64) -> TF {
        self.compose(&TF::new(0.0, factor, Position::default()))
    }

    pub fn translate(&self, dx: f64, dy: f64) -> TF {
        self.compose(&TF::new(0.0, 1.0, Position::new(dx, dy)))
    }

    /// The transform applying `self` first and `other` second.
    pub fn compose(&self, other: &TF) -> TF {
        let translated = other.rotate_scale(Position::new(self.tx, self.ty));
        TF {
            a: other.a * self.a - other.b * self.b,
            b: other.a * self.b + other.b * self.a,
            tx: translated.x + other.tx,
            ty: translated.y + other.ty,
        }
    }

    pub fn transform(&self, p: Position) -> Position {
        let r = self.rotate_scale(p);
        Position::new(r.x + self.tx, r.y + self.ty)
    }

    pub fn transform_all(&self, points: &[Position]) -> Vec<Position> {
        points.iter().map(|&p| self.transform(p)).collect()
    }

    pub fn inverted(&self) -> Result<TF, GeometryError> {
        let det = self.a * self.a + self.b * self.b;
        if det < EPSILON {
            return Err(GeometryError::Singular);
        }
        let a = self.a / det;
        let b = -self.b / det;
        let partial = TF { a, b, tx: 0.0, ty: 0.0 };
        let t = partial.rotate_scale(Position::new(self.tx, self.ty));
        Ok(TF {
            a,
            b,
            tx: -t.x,
            ty: -t.y,
        })
    }

    /// Fit the unique similarity mapping `local_a` to `world_a` and `local_b`
    /// to `world_b`.
    pub fn from_points_pair(
        local_a: Position,
        world_a: Position,
        local_b: Position,
        world_b: Position,
    ) -> Result<TF, GeometryError> {
        let dl = local_b - local_a;
        let dw = world_b - world_a;

        let len2 = dl.x * dl.x + dl.y * dl.y;
        if len2 < EPSILON {
            return Err(GeometryError::ZeroLengthLocal);
        }
        if dw.x * dw.x + dw.y * dw.y < EPSILON {
            return Err(GeometryError::ZeroLengthWorld);
        }

        // dw / dl as complex numbers.
        let a = (dw.x * dl.x + dw.y * dl.y) / len2;
        let b = (dw.y * dl.x - dw.x * dl.y) / len2;

        let rotated = TF { a, b, tx: 0.0, ty: 0.0 }.rotate_scale(local_a);
        Ok(TF {
            a,
            b,
            tx: world_a.x - rotated.x,
            ty: world_a.y - rotated.y,
        })
    }

    /// Rotation in degrees, in `(-180, 180]`.
    pub fn angle_deg(&self) -> f64 {
        self.b.atan2(self.a).to_degrees()
    }

    pub fn scale_factor(&self) -> f64 {
        self.a.hypot(self.b)
    }

    pub fn translation(&self) -> Position {
        Position::new(self.tx, self.ty)
    }

    /// Coefficients `[a, b, c, d, e, f]` of the equivalent SVG matrix.
    pub fn matrix(&self) -> [f64; 6] {
        [self.a, self.b, 0.0 - self.b, self.a, self.tx, self.ty]
    }

    /// SVG `transform` attribute value for this mapping.
    pub fn to_svg_transform(&self) -> String {
        let [a, b, c, d, e, f] = self.matrix();
        format!("matrix({a} {b} {c} {d} {e} {f})")
    }

    fn rotate_scale(&self, p: Position) -> Position {
        Position::new(self.a * p.x - self.b * p.y, self.b * p.x + self.a * p.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn assert_close(a: Position, b: Position) {
        assert!(a.is_close(b, TOL), "{a:?} != {b:?}");
    }

    fn samples() -> Vec<TF> {
        vec![
            TF::identity(),
            TF::new(30.0, 2.0, Position::new(1.0, -3.0)),
            TF::new(-135.0, 0.25, Position::new(-7.5, 2.0)),
            TF::new(90.0, 1.0, Position::default()).translate(4.0, 4.0),
        ]
    }

    #[test]
    fn test_round_trip() {
        let points = [
            Position::new(0.0, 0.0),
            Position::new(1.0, 2.0),
            Position::new(-3.5, 0.25),
        ];
        for tf in samples() {
            let inverse = tf.inverted().unwrap();
            for &p in &points {
                assert_close(inverse.transform(tf.transform(p)), p);
                assert_close(tf.transform(inverse.transform(p)), p);
            }
        }
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        for tf in samples() {
            let identity = tf.compose(&tf.inverted().unwrap());
            assert!((identity.scale_factor() - 1.0).abs() < TOL);
            assert!(identity.angle_deg().abs() < TOL);
            assert_close(identity.translation(), Position::default());
        }
    }

    #[test]
    fn test_compose_is_associative() {
        let tfs = samples();
        let (t1, t2, t3) = (tfs[1], tfs[2], tfs[3]);
        let p = Position::new(0.5, -1.5);
        let left = t1.compose(&t2).compose(&t3);
        let right = t1.compose(&t2.compose(&t3));
        assert_close(left.transform(p), right.transform(p));
    }

    #[test]
    fn test_operations_apply_after() {
        // Translate then rotate: the translation is rotated too.
        let tf = TF::identity().translate(1.0, 0.0).rotate_deg(90.0);
        assert_close(tf.transform(Position::default()), Position::new(0.0, 1.0));

        // Rotate then translate: the translation is applied as given.
        let tf = TF::identity().rotate_deg(90.0).translate(1.0, 0.0);
        assert_close(tf.transform(Position::default()), Position::new(1.0, 0.0));
        assert_close(tf.transform(Position::new(1.0, 0.0)), Position::new(1.0, 1.0));
    }

    #[test]
    fn test_from_points_pair_is_exact() {
        let cases = [
            ((-0.5, 0.0), (0.0, 0.0), (0.5, 0.0), (2.0, 0.0)),
            ((-0.5, 0.0), (3.0, 1.0), (0.5, 0.0), (3.0, 5.0)),
            ((0.275, 0.5), (1.0, 1.0), (0.275, -0.5), (-2.0, 5.0)),
            ((-1.25, 0.5), (0.0, 0.0), (-1.25, -0.5), (0.0, -2.0)),
        ];
        for (la, wa, lb, wb) in cases {
            let tf = TF::from_points_pair(la.into(), wa.into(), lb.into(), wb.into()).unwrap();
            assert_close(tf.transform(la.into()), wa.into());
            assert_close(tf.transform(lb.into()), wb.into());
        }
    }

    #[test]
    fn test_angle_and_scale() {
        let tf = TF::from_points_pair(
            Position::new(-0.5, 0.0),
            Position::new(0.0, 0.0),
            Position::new(0.5, 0.0),
            Position::new(0.0, 2.0),
        )
        .unwrap();
        assert!((tf.angle_deg() - 90.0).abs() < TOL);
        assert!((tf.scale_factor() - 2.0).abs() < TOL);
        assert_close(tf.transform(Position::default()), Position::new(0.0, 1.0));
    }

    #[test]
    fn test_degenerate_fits() {
        let p = Position::new(1.0, 1.0);
        let q = Position::new(2.0, 3.0);
        assert_eq!(
            TF::from_points_pair(p, p, p, q),
            Err(GeometryError::ZeroLengthLocal)
        );
        assert_eq!(
            TF::from_points_pair(p, q, q, q),
            Err(GeometryError::ZeroLengthWorld)
        );
    }

    #[test]
    fn test_singular_inverse() {
        let tf = TF::identity().scale(0.0);
        assert_eq!(tf.inverted(), Err(GeometryError::Singular));
    }

    #[test]
    fn test_svg_transform() {
        let tf = TF::identity().translate(2.0, 3.0);
        assert_eq!(tf.to_svg_transform(), "matrix(1 0 0 1 2 3)");
    }
}
