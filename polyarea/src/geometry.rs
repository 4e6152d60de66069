//! Ray-casting point-in-polygon predicate.
//!
//! All comparisons are exact floating point comparisons. A cross product that
//! is not exactly zero is never treated as colinear, so points that sit on an
//! edge only up to rounding error may be classified either way.

/// A point in the plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// X coordinate of the far end of the ray cast from every test point.
///
/// The ray only reaches polygon edges to the left of this bound, so every
/// vertex of a polygon handed to [`point_in_polygon`] must have `x < EXTREME_X`.
pub const EXTREME_X: f64 = 2.5;

/// Turn direction of an ordered triplet of points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Colinear,
    Clockwise,
    CounterClockwise,
}

/// Orientation of the ordered triplet `(p, q, r)`.
#[inline]
pub fn orientation(p: Point, q: Point, r: Point) -> Orientation {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);

    if val == 0.0 {
        Orientation::Colinear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// Whether `q` lies inside the bounding box of segment `pr`.
///
/// Only meaningful once `p`, `q` and `r` are known to be colinear.
#[inline]
pub fn on_segment(p: Point, q: Point, r: Point) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Whether segments `p1q1` and `p2q2` share at least one point.
pub fn segments_intersect(p1: Point, q1: Point, p2: Point, q2: Point) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Colinear && on_segment(p1, p2, q1))
        || (o2 == Orientation::Colinear && on_segment(p1, q2, q1))
        || (o3 == Orientation::Colinear && on_segment(p2, p1, q2))
        || (o4 == Orientation::Colinear && on_segment(p2, q1, q2))
}

/// Whether `p` lies inside the closed ring `vertices`.
///
/// Casts a ray from `p` to `(EXTREME_X, p.y)` and counts the edges it crosses,
/// walking the ring once from index 0. If an edge the ray touches is colinear
/// with `p`, the answer is whether `p` lies on that edge, and the walk stops.
/// Points on the boundary are therefore inside.
///
/// Rings with fewer than three vertices contain nothing.
pub fn point_in_polygon(vertices: &[Point], p: Point) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    let extreme = Point::new(EXTREME_X, p.y);
    let mut crossings = 0usize;

    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];

        if segments_intersect(a, b, p, extreme) {
            if orientation(a, p, b) == Orientation::Colinear {
                return on_segment(a, p, b);
            }
            crossings += 1;
        }
    }

    crossings % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(-1.0, -1.0),
            Point::new(1.0, -1.0),
            Point::new(1.0, 1.0),
            Point::new(-1.0, 1.0),
        ]
    }

    fn hexagon() -> Vec<Point> {
        vec![
            Point::new(0.866, 0.5),
            Point::new(0.0, 1.0),
            Point::new(-0.866, 0.5),
            Point::new(-0.866, -0.5),
            Point::new(0.0, -1.0),
            Point::new(0.866, -0.5),
        ]
    }

    #[test]
    fn test_orientation() {
        let o = Point::new(0.0, 0.0);
        let a = Point::new(1.0, 0.0);

        assert_eq!(orientation(o, a, Point::new(2.0, 0.0)), Orientation::Colinear);
        assert_eq!(orientation(o, a, Point::new(1.0, -1.0)), Orientation::Clockwise);
        assert_eq!(
            orientation(o, a, Point::new(1.0, 1.0)),
            Orientation::CounterClockwise
        );
    }

    #[test]
    fn test_on_segment_is_inclusive() {
        let p = Point::new(0.0, 0.0);
        let r = Point::new(2.0, 2.0);

        assert!(on_segment(p, Point::new(1.0, 1.0), r));
        assert!(on_segment(p, p, r));
        assert!(on_segment(p, r, r));
        assert!(!on_segment(p, Point::new(3.0, 3.0), r));
    }

    #[test]
    fn test_segments_intersect() {
        let p = |x, y| Point::new(x, y);

        // proper crossing
        assert!(segments_intersect(p(0.0, 0.0), p(2.0, 2.0), p(0.0, 2.0), p(2.0, 0.0)));
        // parallel
        assert!(!segments_intersect(p(0.0, 0.0), p(2.0, 0.0), p(0.0, 1.0), p(2.0, 1.0)));
        // shared endpoint
        assert!(segments_intersect(p(0.0, 0.0), p(1.0, 1.0), p(1.0, 1.0), p(2.0, 0.0)));
        // colinear and overlapping
        assert!(segments_intersect(p(0.0, 0.0), p(2.0, 0.0), p(1.0, 0.0), p(3.0, 0.0)));
        // colinear and disjoint
        assert!(!segments_intersect(p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)));
    }

    #[test]
    fn test_square_inside_and_outside() {
        let ring = square();

        assert!(point_in_polygon(&ring, Point::new(0.0, 0.0)));
        assert!(point_in_polygon(&ring, Point::new(0.5, -0.25)));
        assert!(point_in_polygon(&ring, Point::new(-0.99, 0.99)));

        assert!(!point_in_polygon(&ring, Point::new(-5.0, 0.0)));
        assert!(!point_in_polygon(&ring, Point::new(0.0, 5.0)));
        assert!(!point_in_polygon(&ring, Point::new(2.0, 0.3)));
        assert!(!point_in_polygon(&ring, Point::new(3.0, 0.0)));
    }

    #[test]
    fn test_boundary_point_is_inside() {
        let ring = square();

        assert!(point_in_polygon(&ring, Point::new(1.0, 0.0)));
        assert!(point_in_polygon(&ring, Point::new(-1.0, 0.5)));
    }

    #[test]
    fn test_concave_polygon() {
        // L shape, notch in the top right quadrant
        let ring = vec![
            Point::new(-1.0, -1.0),
            Point::new(1.0, -1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(-1.0, 1.0),
        ];

        assert!(point_in_polygon(&ring, Point::new(-0.5, 0.5)));
        assert!(point_in_polygon(&ring, Point::new(0.5, -0.5)));
        assert!(!point_in_polygon(&ring, Point::new(0.5, 0.5)));
    }

    #[test]
    fn test_degenerate_ring_contains_nothing() {
        let ring = vec![Point::new(-1.0, -1.0), Point::new(1.0, 1.0)];
        assert!(!point_in_polygon(&ring, Point::new(0.0, 0.0)));
        assert!(!point_in_polygon(&[], Point::new(0.0, 0.0)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Points inside the hexagon's inscribed circle are inside.
        #[test]
        fn prop_inner_disc_is_inside(r in 0.0f64..0.8, theta in 0.0f64..std::f64::consts::TAU) {
            let p = Point::new(r * theta.cos(), r * theta.sin());
            prop_assert!(point_in_polygon(&hexagon(), p));
        }

        /// Points far outside the bounding box are outside.
        #[test]
        fn prop_far_points_are_outside(x in -100.0f64..-2.0, y in -100.0f64..100.0) {
            prop_assert!(!point_in_polygon(&hexagon(), Point::new(x, y)));
            prop_assert!(!point_in_polygon(&hexagon(), Point::new(y / 100.0, 2.0 + y.abs())));
        }

        /// Starting the ring at another vertex never changes the answer.
        #[test]
        fn prop_rotation_invariant(
            x in -1.5f64..1.5,
            y in -1.5f64..1.5,
            shift in 0usize..6,
        ) {
            let ring = hexagon();
            let mut rotated = ring.clone();
            rotated.rotate_left(shift);

            let p = Point::new(x, y);
            prop_assert_eq!(point_in_polygon(&ring, p), point_in_polygon(&rotated, p));
        }
    }
}
