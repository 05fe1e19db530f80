//! Boundary to the polygon-clipping stack (`geo`, `geo-buffer`).
//!
//! The engine works on bare contour lists ([`Vec<Point>`] rings, outer rings
//! at negative area, holes at positive area). This module converts between
//! that representation and `geo` multipolygons, and wraps the boolean,
//! simplification and offsetting operations the placement pipeline needs.

use geo::algorithm::orient::{Direction, Orient};
use geo::{BooleanOps, Simplify};
use geo_types::{Coord, LineString, MultiPolygon, Polygon as GeoPolygon};

use crate::geometry::Point;
use crate::geometry::kernel;

/// A single closed ring.
pub type Contour = Vec<Point>;

fn ring(points: &[Point]) -> LineString<f64> {
    LineString::new(points.iter().map(|p| Coord { x: p.0, y: p.1 }).collect())
}

fn ring_to_contour(ls: &LineString<f64>) -> Contour {
    let mut points: Vec<Point> = ls.coords().map(|c| Point(c.x, c.y)).collect();
    // geo rings carry an explicit closing coordinate
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Assemble loose contours into a multipolygon, nesting positive-area
/// contours as holes of the negative-area contour that contains them.
/// Degenerate contours (< 3 points) are dropped.
pub fn contours_to_multipolygon(contours: &[Contour]) -> MultiPolygon<f64> {
    let mut outers: Vec<(Contour, Vec<Contour>)> = vec![];
    let mut holes: Vec<&Contour> = vec![];

    for contour in contours.iter().filter(|c| c.len() >= 3) {
        if kernel::signed_area(contour) <= 0.0 {
            outers.push((contour.clone(), vec![]));
        } else {
            holes.push(contour);
        }
    }

    for hole in holes {
        let inside = outers
            .iter_mut()
            .find(|(outer, _)| kernel::point_in_polygon(&hole[0], outer) == Some(true));
        if let Some((_, outer_holes)) = inside {
            outer_holes.push(hole.clone());
        }
        // a positive contour outside every outer ring has nothing to punch
    }

    MultiPolygon::new(
        outers
            .into_iter()
            .map(|(outer, holes)| {
                GeoPolygon::new(ring(&outer), holes.iter().map(|h| ring(h)).collect())
                    .orient(Direction::Default)
            })
            .collect(),
    )
}

/// Flatten a multipolygon back to contours: exteriors at negative area,
/// interiors at positive area.
pub fn multipolygon_to_contours(mp: &MultiPolygon<f64>) -> Vec<Contour> {
    let mut contours = vec![];
    for poly in mp.iter() {
        let mut exterior = ring_to_contour(poly.exterior());
        if exterior.len() < 3 {
            continue;
        }
        if kernel::signed_area(&exterior) > 0.0 {
            exterior.reverse();
        }
        contours.push(exterior);

        for interior in poly.interiors() {
            let mut hole = ring_to_contour(interior);
            if hole.len() < 3 {
                continue;
            }
            if kernel::signed_area(&hole) < 0.0 {
                hole.reverse();
            }
            contours.push(hole);
        }
    }
    contours
}

/// Union of a set of contour groups.
pub fn union(groups: &[Vec<Contour>]) -> MultiPolygon<f64> {
    let mut result: Option<MultiPolygon<f64>> = None;
    for group in groups {
        let mp = contours_to_multipolygon(group);
        if mp.0.is_empty() {
            continue;
        }
        result = Some(match result {
            None => mp,
            Some(acc) => acc.union(&mp),
        });
    }
    result.unwrap_or_else(|| MultiPolygon::new(vec![]))
}

/// `a` minus `b`.
pub fn difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if b.0.is_empty() {
        return a.clone();
    }
    a.difference(b)
}

/// Ramer-Douglas-Peucker simplification of a single contour.
pub fn simplify_contour(points: &[Point], tolerance: f64) -> Contour {
    if points.len() < 4 {
        return points.to_vec();
    }
    let poly = GeoPolygon::new(ring(points), vec![]);
    let simplified = poly.simplify(&tolerance);
    let contour = ring_to_contour(simplified.exterior());
    if contour.len() < 3 { points.to_vec() } else { contour }
}

/// Offset a contour outwards (`delta > 0`) or inwards (`delta < 0`).
/// Of possibly several resulting rings, the largest is kept.
/// `None` when the contour vanishes entirely.
pub fn offset_contour(points: &[Point], delta: f64) -> Option<Contour> {
    if points.len() < 3 {
        return None;
    }
    let poly = GeoPolygon::new(ring(points), vec![]).orient(Direction::Default);
    let buffered = geo_buffer::buffer_polygon(&poly, delta);

    buffered
        .iter()
        .map(|p| ring_to_contour(p.exterior()))
        .filter(|c| c.len() >= 3)
        .max_by(|a, b| {
            kernel::signed_area(a)
                .abs()
                .partial_cmp(&kernel::signed_area(b).abs())
                .expect("NaN ring area")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64, dx: f64, dy: f64) -> Contour {
        vec![
            Point(dx, dy),
            Point(dx + size, dy),
            Point(dx + size, dy + size),
            Point(dx, dy + size),
        ]
    }

    fn total_area(contours: &[Contour]) -> f64 {
        contours.iter().map(|c| kernel::signed_area(c)).sum::<f64>().abs()
    }

    #[test]
    fn union_of_overlapping_squares() {
        let groups = vec![vec![square(10.0, 0.0, 0.0)], vec![square(10.0, 5.0, 0.0)]];
        let contours = multipolygon_to_contours(&union(&groups));
        assert_eq!(contours.len(), 1);
        assert!((total_area(&contours) - 150.0).abs() < 1e-6);
    }

    #[test]
    fn difference_carves_hole() {
        let outer = contours_to_multipolygon(&[square(10.0, 0.0, 0.0)]);
        let inner = contours_to_multipolygon(&[square(2.0, 4.0, 4.0)]);
        let contours = multipolygon_to_contours(&difference(&outer, &inner));
        // one exterior and one interior ring
        assert_eq!(contours.len(), 2);
        assert!((total_area(&contours) - (100.0 + 4.0)).abs() < 1e-6);
        assert!(contours.iter().any(|c| kernel::signed_area(c) > 0.0));
    }

    #[test]
    fn hole_contour_subtracts_in_union() {
        let mut group = vec![square(10.0, 0.0, 0.0)];
        let mut hole = square(4.0, 3.0, 3.0);
        hole.reverse(); // positive winding marks it as a hole
        assert!(kernel::signed_area(&hole) > 0.0);
        group.push(hole);
        let mp = union(&[group]);
        let contours = multipolygon_to_contours(&mp);
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn offset_grows_square() {
        let offset = offset_contour(&square(10.0, 0.0, 0.0), 1.0).unwrap();
        let b = crate::geometry::Bounds::of_points(&offset).unwrap();
        assert!(b.width >= 11.9 && b.height >= 11.9);
    }
}
