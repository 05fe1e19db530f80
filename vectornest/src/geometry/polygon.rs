use serde::{Deserialize, Serialize};

use crate::geometry::bounds::Bounds;
use crate::geometry::kernel;
use crate::geometry::point::Point;

/// Identity of the bin polygon in NFP cache keys.
pub const BIN_ID: i64 = -1;

/// A closed polygon with up to one level of holes.
///
/// Outer boundaries carry negative signed area, holes positive area
/// (see [`kernel::signed_area`]). `id` is stable across rotations and
/// generations; `source` points back to the originating input shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
    #[serde(default)]
    pub holes: Vec<Polygon>,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub source: Option<usize>,
    #[serde(default)]
    pub rotation: f64,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Polygon {
            points,
            ..Polygon::default()
        }
    }

    pub fn signed_area(&self) -> f64 {
        kernel::signed_area(&self.points)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of_points(&self.points)
    }

    /// Translate the outer boundary and all holes in place.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            *p = p.translated(dx, dy);
        }
        for hole in &mut self.holes {
            hole.translate(dx, dy);
        }
    }

    /// A copy rotated about the origin by `degrees`, holes included.
    /// The copy records the rotation; no recentering is performed.
    pub fn rotated(&self, degrees: f64) -> Polygon {
        Polygon {
            points: kernel::rotate_points(&self.points, degrees),
            holes: self.holes.iter().map(|h| h.rotated(degrees)).collect(),
            id: self.id,
            source: self.source,
            rotation: degrees,
        }
    }

    /// Force the outer boundary to negative area and holes to positive area.
    pub fn normalize_winding(&mut self) {
        if self.signed_area() > 0.0 {
            self.points.reverse();
        }
        for hole in &mut self.holes {
            if hole.signed_area() < 0.0 {
                hole.points.reverse();
            }
        }
    }

    /// Drop a duplicated closing point, if present.
    pub fn dedup_endpoints(&mut self) {
        while self.points.len() > 1 {
            let first = self.points[0];
            let last = *self.points.last().unwrap();
            if kernel::almost_equal(first.0, last.0) && kernel::almost_equal(first.1, last.1) {
                self.points.pop();
            } else {
                break;
            }
        }
        for hole in &mut self.holes {
            hole.dedup_endpoints();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![
            Point(0.0, 0.0),
            Point(size, 0.0),
            Point(size, size),
            Point(0.0, size),
        ])
    }

    #[test]
    fn rotation_roundtrip_restores_points() {
        let p = square(7.0);
        let back = p.rotated(37.0).rotated(-37.0);
        for (a, b) in p.points.iter().zip(back.points.iter()) {
            assert!(approx_eq!(f64, a.0, b.0, epsilon = 1e-9));
            assert!(approx_eq!(f64, a.1, b.1, epsilon = 1e-9));
        }
        assert!(approx_eq!(f64, p.area(), back.area(), epsilon = 1e-9));
    }

    #[test]
    fn winding_normalization() {
        let mut p = square(2.0);
        p.points.reverse(); // clockwise outer
        let mut hole = square(1.0);
        hole.translate(0.5, 0.5);
        p.holes.push(hole);

        p.normalize_winding();
        assert!(p.signed_area() < 0.0);
        assert!(p.holes[0].signed_area() > 0.0);
    }

    #[test]
    fn dedup_removes_closing_point() {
        let mut p = square(1.0);
        p.points.push(Point(0.0, 0.0));
        p.dedup_endpoints();
        assert_eq!(p.points.len(), 4);
    }
}
