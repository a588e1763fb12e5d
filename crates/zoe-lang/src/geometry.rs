//! Points and toroidal distance/bearing.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;

/// Wraps an angle into `(-π, π]`.
#[must_use]
pub fn wrap_signed_angle(mut angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    angle = angle.rem_euclid(TAU);
    if angle > PI {
        angle -= TAU;
    }
    angle
}

/// Wraps an angle into `[0, 2π)`.
#[must_use]
pub fn wrap_unsigned_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Immutable location in world units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Moves `distance` along `heading` (radians, 0 is +x).
    #[must_use]
    pub fn offset(self, heading: f64, distance: f64) -> Self {
        Self::new(
            self.x + heading.cos() * distance,
            self.y + heading.sin() * distance,
        )
    }

    /// Parses the canonical `{ x=1.000, y=2.000 }` text form used by the
    /// location registers.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let inner = text.trim().strip_prefix('{')?.strip_suffix('}')?;
        let mut parts = inner.split(',');
        let x = parts.next()?.trim().strip_prefix("x=")?.trim().parse().ok()?;
        let y = parts.next()?.trim().strip_prefix("y=")?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(x, y))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ x={:.3}, y={:.3} }}", self.x, self.y)
    }
}

/// Dimensions of the wrap-around arena.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Torus {
    pub width: f64,
    pub height: f64,
}

impl Torus {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Wraps a point into `[0, width) × [0, height)`.
    #[must_use]
    pub fn wrap(&self, point: Point) -> Point {
        Point::new(
            wrap_axis(point.x, self.width),
            wrap_axis(point.y, self.height),
        )
    }

    /// Shortest displacement from `from` to `to`.
    ///
    /// Considers the direct path plus the paths across the horizontal edge,
    /// the vertical edge and both corners, which is the same as wrapping
    /// each axis delta into half the arena.
    #[must_use]
    pub fn delta(&self, from: Point, to: Point) -> (f64, f64) {
        (
            shortest_axis_delta(to.x - from.x, self.width),
            shortest_axis_delta(to.y - from.y, self.height),
        )
    }

    /// Toroidal distance between two points.
    #[must_use]
    pub fn range(&self, from: Point, to: Point) -> f64 {
        let (dx, dy) = self.delta(from, to);
        dx.hypot(dy)
    }

    /// Direction of the shortest path from `from` to `to`, in `[0, 2π)`.
    #[must_use]
    pub fn bearing(&self, from: Point, to: Point) -> f64 {
        let (dx, dy) = self.delta(from, to);
        wrap_unsigned_angle(dy.atan2(dx))
    }

    /// Centre of the arena.
    #[must_use]
    pub fn midpoint(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

fn wrap_axis(value: f64, extent: f64) -> f64 {
    if extent <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    if wrapped >= extent { 0.0 } else { wrapped }
}

fn shortest_axis_delta(delta: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return delta;
    }
    let half = extent / 2.0;
    let mut d = delta.rem_euclid(extent);
    if d > half {
        d -= extent;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::SmallRng};

    #[test]
    fn range_is_symmetric_and_bounded_by_half_diagonal() {
        let torus = Torus::new(100.0, 60.0);
        let mut rng = SmallRng::seed_from_u64(0xABCD);
        let bound = (50.0f64).hypot(30.0) + 1e-9;
        for _ in 0..500 {
            let a = Point::new(rng.random_range(0.0..100.0), rng.random_range(0.0..60.0));
            let b = Point::new(rng.random_range(0.0..100.0), rng.random_range(0.0..60.0));
            let ab = torus.range(a, b);
            let ba = torus.range(b, a);
            assert!((ab - ba).abs() < 1e-9);
            assert!(ab <= bound);
            let naive = (b.x - a.x).hypot(b.y - a.y);
            assert!(ab <= naive + 1e-9);
        }
    }

    #[test]
    fn range_takes_wraparound_paths() {
        let torus = Torus::new(100.0, 100.0);
        let a = Point::new(2.0, 50.0);
        let b = Point::new(98.0, 50.0);
        assert!((torus.range(a, b) - 4.0).abs() < 1e-9);
        let corner_a = Point::new(1.0, 1.0);
        let corner_b = Point::new(99.0, 99.0);
        assert!((torus.range(corner_a, corner_b) - 8.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn bearing_follows_shortest_path() {
        let torus = Torus::new(100.0, 100.0);
        let west_edge = Point::new(2.0, 50.0);
        let east_edge = Point::new(98.0, 50.0);
        // going west across the seam is shorter
        assert!((torus.bearing(west_edge, east_edge) - PI).abs() < 1e-9);
        assert!(torus.bearing(east_edge, west_edge).abs() < 1e-9);
        let below = Point::new(50.0, 60.0);
        assert!((torus.bearing(Point::new(50.0, 50.0), below) - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn wrap_keeps_points_inside() {
        let torus = Torus::new(10.0, 20.0);
        let p = torus.wrap(Point::new(-1.0, 41.0));
        assert!((p.x - 9.0).abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn point_text_parses_back() {
        let p = Point::new(12.5, 3.0);
        let text = p.to_string();
        assert_eq!(text, "{ x=12.500, y=3.000 }");
        assert_eq!(Point::parse(&text), Some(p));
        assert_eq!(Point::parse("12"), None);
    }

    #[test]
    fn angles_wrap() {
        assert!((wrap_signed_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-9);
        assert!((wrap_unsigned_angle(-PI / 2.0) - 3.0 * PI / 2.0).abs() < 1e-9);
    }
}
