//! Pure geometric predicates and measures over point sequences.
//!
//! Winding convention: the shoelace sum is taken so that counter-clockwise
//! rings have a *negative* signed area. Outer boundaries are kept at negative
//! area, holes at positive area, everywhere in this crate.

use crate::geometry::point::Point;

/// Absolute tolerance for coordinate comparisons.
pub const TOL: f64 = 1e-9;

pub fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < TOL
}

pub fn almost_equal_tol(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

pub fn within_distance(p: &Point, q: &Point, distance: f64) -> bool {
    p.sq_distance(q) < distance * distance
}

pub fn normalize_vector(v: Point) -> Point {
    let sq_len = v.0 * v.0 + v.1 * v.1;
    if almost_equal(sq_len, 1.0) {
        return v;
    }
    let inv_len = 1.0 / sq_len.sqrt();
    Point(v.0 * inv_len, v.1 * inv_len)
}

/// Shoelace signed area. Counter-clockwise rings yield a negative value.
pub fn signed_area(points: &[Point]) -> f64 {
    let mut sigma = 0.0;
    let mut j = points.len().wrapping_sub(1);
    for i in 0..points.len() {
        sigma += (points[j].0 + points[i].0) * (points[j].1 - points[i].1);
        j = i;
    }
    0.5 * sigma
}

/// Is `p` strictly between the endpoints of segment `a`-`b`?
/// Endpoints themselves do not count.
pub fn on_segment(a: &Point, b: &Point, p: &Point) -> bool {
    // vertical
    if almost_equal(a.0, b.0) && almost_equal(p.0, a.0) {
        if !almost_equal(p.1, b.1)
            && !almost_equal(p.1, a.1)
            && p.1 < b.1.max(a.1)
            && p.1 > b.1.min(a.1)
        {
            return true;
        }
        return false;
    }

    // horizontal
    if almost_equal(a.1, b.1) && almost_equal(p.1, a.1) {
        if !almost_equal(p.0, b.0)
            && !almost_equal(p.0, a.0)
            && p.0 < b.0.max(a.0)
            && p.0 > b.0.min(a.0)
        {
            return true;
        }
        return false;
    }

    // range check
    if (p.0 < a.0 && p.0 < b.0) || (p.0 > a.0 && p.0 > b.0) || (p.1 < a.1 && p.1 < b.1) || (p.1 > a.1 && p.1 > b.1) {
        return false;
    }

    // exclude endpoints
    if (almost_equal(p.0, a.0) && almost_equal(p.1, a.1))
        || (almost_equal(p.0, b.0) && almost_equal(p.1, b.1))
    {
        return false;
    }

    let cross = (p.1 - a.1) * (b.0 - a.0) - (p.0 - a.0) * (b.1 - a.1);
    if cross.abs() > TOL {
        return false;
    }

    let dot = (p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1);
    if dot < 0.0 || almost_equal(dot, 0.0) {
        return false;
    }

    let len2 = (b.0 - a.0).powi(2) + (b.1 - a.1).powi(2);
    if dot > len2 || almost_equal(dot, len2) {
        return false;
    }

    true
}

/// Intersection of segments `a`-`b` and `e`-`f`.
/// When `infinite` is set, both segments are treated as infinite lines.
/// Intersections at an endpoint are reported as `None`.
pub fn line_intersect(a: &Point, b: &Point, e: &Point, f: &Point, infinite: bool) -> Option<Point> {
    let a1 = b.1 - a.1;
    let b1 = a.0 - b.0;
    let c1 = b.0 * a.1 - a.0 * b.1;
    let a2 = f.1 - e.1;
    let b2 = e.0 - f.0;
    let c2 = f.0 * e.1 - e.0 * f.1;

    let denom = a1 * b2 - a2 * b1;

    let x = (b1 * c2 - b2 * c1) / denom;
    let y = (a2 * c1 - a1 * c2) / denom;

    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    if !infinite {
        // coincident points do not count as intersecting
        if (a.0 - b.0).abs() > TOL && if a.0 < b.0 { x < a.0 || x > b.0 } else { x > a.0 || x < b.0 } {
            return None;
        }
        if (a.1 - b.1).abs() > TOL && if a.1 < b.1 { y < a.1 || y > b.1 } else { y > a.1 || y < b.1 } {
            return None;
        }
        if (e.0 - f.0).abs() > TOL && if e.0 < f.0 { x < e.0 || x > f.0 } else { x > e.0 || x < f.0 } {
            return None;
        }
        if (e.1 - f.1).abs() > TOL && if e.1 < f.1 { y < e.1 || y > f.1 } else { y > e.1 || y < f.1 } {
            return None;
        }
    }

    Some(Point(x, y))
}

/// Ray-casting point-in-polygon test.
/// Returns `None` when the point lies on the boundary (within [`TOL`]);
/// callers must treat that case explicitly.
pub fn point_in_polygon(point: &Point, polygon: &[Point]) -> Option<bool> {
    if polygon.len() < 3 {
        return None;
    }

    let mut inside = false;
    let n = polygon.len();
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];

        if almost_equal(pi.0, point.0) && almost_equal(pi.1, point.1) {
            return None; // on a vertex
        }

        if on_segment(&pi, &pj, point) {
            return None; // on an edge
        }

        if almost_equal(pi.0, pj.0) && almost_equal(pi.1, pj.1) {
            j = i;
            continue; // degenerate edge
        }

        if (pi.1 > point.1) != (pj.1 > point.1)
            && point.0 < (pj.0 - pi.0) * (point.1 - pi.1) / (pj.1 - pi.1) + pi.0
        {
            inside = !inside;
        }
        j = i;
    }

    Some(inside)
}

/// Is the ring an axis-aligned rectangle, within `tolerance`?
pub fn is_rectangle(points: &[Point], tolerance: f64) -> bool {
    let Some(bounds) = super::Bounds::of_points(points) else {
        return false;
    };

    points.iter().all(|p| {
        (almost_equal_tol(p.0, bounds.x, tolerance) || almost_equal_tol(p.0, bounds.x_max(), tolerance))
            && (almost_equal_tol(p.1, bounds.y, tolerance)
                || almost_equal_tol(p.1, bounds.y_max(), tolerance))
    })
}

/// Rotate points about the origin by an angle in degrees.
pub fn rotate_points(points: &[Point], degrees: f64) -> Vec<Point> {
    let angle = degrees * std::f64::consts::PI / 180.0;
    let (sin, cos) = angle.sin_cos();
    points
        .iter()
        .map(|p| Point(p.0 * cos - p.1 * sin, p.0 * sin + p.1 * cos))
        .collect()
}

/// Distance the point `p` can travel along `normal` before hitting the line
/// through `s1`-`s2`, measured against the segment unless `infinite` is set.
/// Negative values mean `p` is on the far side already.
pub fn point_distance(p: &Point, s1: &Point, s2: &Point, normal: Point, infinite: bool) -> Option<f64> {
    let normal = normalize_vector(normal);
    let dir = Point(normal.1, -normal.0);

    let pdot = p.0 * dir.0 + p.1 * dir.1;
    let s1dot = s1.0 * dir.0 + s1.1 * dir.1;
    let s2dot = s2.0 * dir.0 + s2.1 * dir.1;

    let pdotnorm = p.0 * normal.0 + p.1 * normal.1;
    let s1dotnorm = s1.0 * normal.0 + s1.1 * normal.1;
    let s2dotnorm = s2.0 * normal.0 + s2.1 * normal.1;

    if !infinite {
        if ((pdot < s1dot || almost_equal(pdot, s1dot)) && (pdot < s2dot || almost_equal(pdot, s2dot)))
            || ((pdot > s1dot || almost_equal(pdot, s1dot))
                && (pdot > s2dot || almost_equal(pdot, s2dot)))
        {
            // point doesn't collide with segment, or lies directly on the vertex
            return None;
        }
        if almost_equal(pdot, s1dot) && almost_equal(pdot, s2dot) {
            if pdotnorm > s1dotnorm && pdotnorm > s2dotnorm {
                return Some((pdotnorm - s1dotnorm).min(pdotnorm - s2dotnorm));
            }
            if pdotnorm < s1dotnorm && pdotnorm < s2dotnorm {
                return Some(-(s1dotnorm - pdotnorm).min(s2dotnorm - pdotnorm));
            }
        }
    }

    Some(-(pdotnorm - s1dotnorm + (s1dotnorm - s2dotnorm) * (s1dot - pdot) / (s1dot - s2dot)))
}

/// Distance segment `e`-`f` can slide along `direction` before touching
/// segment `a`-`b`, or `None` when their sweeps never meet.
pub fn segment_distance(a: &Point, b: &Point, e: &Point, f: &Point, direction: Point) -> Option<f64> {
    let normal = Point(direction.1, -direction.0);
    let reverse = Point(-direction.0, -direction.1);

    let dot_a = a.0 * normal.0 + a.1 * normal.1;
    let dot_b = b.0 * normal.0 + b.1 * normal.1;
    let dot_e = e.0 * normal.0 + e.1 * normal.1;
    let dot_f = f.0 * normal.0 + f.1 * normal.1;

    let cross_a = a.0 * direction.0 + a.1 * direction.1;
    let cross_b = b.0 * direction.0 + b.1 * direction.1;
    let cross_e = e.0 * direction.0 + e.1 * direction.1;
    let cross_f = f.0 * direction.0 + f.1 * direction.1;

    let ab_min = dot_a.min(dot_b);
    let ab_max = dot_a.max(dot_b);
    let ef_min = dot_e.min(dot_f);
    let ef_max = dot_e.max(dot_f);

    // segments that will merely touch at one point
    if almost_equal(ab_max, ef_min) || almost_equal(ab_min, ef_max) {
        return None;
    }
    // segments miss each other completely
    if ab_max < ef_min || ab_min > ef_max {
        return None;
    }

    let overlap = if (ab_max > ef_max && ab_min < ef_min) || (ef_max > ab_max && ef_min < ab_min) {
        1.0
    } else {
        let min_max = ab_max.min(ef_max);
        let max_min = ab_min.max(ef_min);
        let max_max = ab_max.max(ef_max);
        let min_min = ab_min.min(ef_min);
        (min_max - max_min) / (max_max - min_min)
    };

    let cross_abe = (e.1 - a.1) * (b.0 - a.0) - (e.0 - a.0) * (b.1 - a.1);
    let cross_abf = (f.1 - a.1) * (b.0 - a.0) - (f.0 - a.0) * (b.1 - a.1);

    // segments are colinear
    if almost_equal(cross_abe, 0.0) && almost_equal(cross_abf, 0.0) {
        let ab_norm = normalize_vector(Point(b.1 - a.1, a.0 - b.0));
        let ef_norm = normalize_vector(Point(f.1 - e.1, e.0 - f.0));

        // segment normals must point in opposite directions
        if (ab_norm.1 * ef_norm.0 - ab_norm.0 * ef_norm.1).abs() < TOL
            && ab_norm.1 * ef_norm.1 + ab_norm.0 * ef_norm.0 < 0.0
        {
            // normal of AB segment must point in same direction as the slide
            let norm_dot = ab_norm.1 * direction.1 + ab_norm.0 * direction.0;
            if almost_equal(norm_dot, 0.0) {
                // the segments merely slide along each other
                return None;
            }
            if norm_dot < 0.0 {
                return Some(0.0);
            }
        }
        return None;
    }

    let mut distances: Vec<f64> = vec![];

    // coincident points
    if almost_equal(dot_a, dot_e) {
        distances.push(cross_a - cross_e);
    } else if almost_equal(dot_a, dot_f) {
        distances.push(cross_a - cross_f);
    } else if dot_a > ef_min && dot_a < ef_max {
        let mut d = point_distance(a, e, f, reverse, false);
        if let Some(dist) = d {
            if almost_equal(dist, 0.0) {
                // A currently touches EF, but AB is moving away from EF
                let db = point_distance(b, e, f, reverse, true);
                if db.is_some_and(|db| db < 0.0 || almost_equal(db * overlap, 0.0)) {
                    d = None;
                }
            }
        }
        if let Some(d) = d {
            distances.push(d);
        }
    }

    if almost_equal(dot_b, dot_e) {
        distances.push(cross_b - cross_e);
    } else if almost_equal(dot_b, dot_f) {
        distances.push(cross_b - cross_f);
    } else if dot_b > ef_min && dot_b < ef_max {
        let mut d = point_distance(b, e, f, reverse, false);
        if let Some(dist) = d {
            if almost_equal(dist, 0.0) {
                let da = point_distance(a, e, f, reverse, true);
                if da.is_some_and(|da| da < 0.0 || almost_equal(da * overlap, 0.0)) {
                    d = None;
                }
            }
        }
        if let Some(d) = d {
            distances.push(d);
        }
    }

    if dot_e > ab_min && dot_e < ab_max {
        let mut d = point_distance(e, a, b, direction, false);
        if let Some(dist) = d {
            if almost_equal(dist, 0.0) {
                let df = point_distance(f, a, b, direction, true);
                if df.is_some_and(|df| df < 0.0 || almost_equal(df * overlap, 0.0)) {
                    d = None;
                }
            }
        }
        if let Some(d) = d {
            distances.push(d);
        }
    }

    if dot_f > ab_min && dot_f < ab_max {
        let mut d = point_distance(f, a, b, direction, false);
        if let Some(dist) = d {
            if almost_equal(dist, 0.0) {
                let de = point_distance(e, a, b, direction, true);
                if de.is_some_and(|de| de < 0.0 || almost_equal(de * overlap, 0.0)) {
                    d = None;
                }
            }
        }
        if let Some(d) = d {
            distances.push(d);
        }
    }

    distances
        .into_iter()
        .min_by(|a, b| a.partial_cmp(b).expect("NaN slide distance"))
}

/// Maximum distance polygon B (at offset `b_offset`) can slide along
/// `direction` before colliding with polygon A (at offset `a_offset`).
pub fn polygon_slide_distance(
    a: &[Point],
    a_offset: Point,
    b: &[Point],
    b_offset: Point,
    direction: Point,
) -> Option<f64> {
    let dir = normalize_vector(direction);
    let mut distance: Option<f64> = None;

    let n_a = a.len();
    let n_b = b.len();

    for i in 0..n_b {
        let b1 = b[i].translated(b_offset.0, b_offset.1);
        let b2 = b[(i + 1) % n_b].translated(b_offset.0, b_offset.1);
        if almost_equal(b1.0, b2.0) && almost_equal(b1.1, b2.1) {
            continue;
        }
        for j in 0..n_a {
            let a1 = a[j].translated(a_offset.0, a_offset.1);
            let a2 = a[(j + 1) % n_a].translated(a_offset.0, a_offset.1);
            if almost_equal(a1.0, a2.0) && almost_equal(a1.1, a2.1) {
                continue;
            }

            if let Some(d) = segment_distance(&a1, &a2, &b1, &b2, dir) {
                if (distance.is_none() || d < distance.unwrap()) && (d > 0.0 || almost_equal(d, 0.0))
                {
                    distance = Some(d);
                }
            }
        }
    }

    distance
}

/// Distance polygon B must be projected along `direction` to touch polygon A,
/// taking the worst case over B's vertices.
pub fn polygon_projection_distance(
    a: &[Point],
    a_offset: Point,
    b: &[Point],
    b_offset: Point,
    direction: Point,
) -> Option<f64> {
    let mut distance: Option<f64> = None;

    let n_a = a.len();
    for bp in b {
        let p = bp.translated(b_offset.0, b_offset.1);

        // the shortest/most negative projection of this vertex onto A
        let mut min_projection: Option<f64> = None;
        for j in 0..n_a {
            let s1 = a[j].translated(a_offset.0, a_offset.1);
            let s2 = a[(j + 1) % n_a].translated(a_offset.0, a_offset.1);

            if ((s2.1 - s1.1) * direction.0 - (s2.0 - s1.0) * direction.1).abs() < TOL {
                continue; // edge is parallel to the direction of travel
            }

            if let Some(d) = point_distance(&p, &s1, &s2, direction, false) {
                if min_projection.is_none() || d < min_projection.unwrap() {
                    min_projection = Some(d);
                }
            }
        }

        if let Some(mp) = min_projection {
            if distance.is_none() || mp > distance.unwrap() {
                distance = Some(mp);
            }
        }
    }

    distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point(0.0, 0.0),
            Point(size, 0.0),
            Point(size, size),
            Point(0.0, size),
        ]
    }

    #[test]
    fn signed_area_sign_follows_winding() {
        let ccw = square(1.0);
        let cw: Vec<Point> = ccw.iter().rev().cloned().collect();
        assert!(signed_area(&ccw) < 0.0);
        assert!(signed_area(&cw) > 0.0);
        assert_eq!(signed_area(&ccw).abs(), 1.0);
    }

    #[test_case(Point(0.5, 0.5), Some(true); "interior")]
    #[test_case(Point(1.5, 0.5), Some(false); "exterior")]
    #[test_case(Point(0.5, 0.0), None; "on edge")]
    #[test_case(Point(0.0, 0.0), None; "on vertex")]
    fn point_in_polygon_cases(p: Point, expected: Option<bool>) {
        assert_eq!(point_in_polygon(&p, &square(1.0)), expected);
    }

    #[test_case(&[Point(0.0, 0.0), Point(4.0, 0.0), Point(4.0, 2.0), Point(0.0, 2.0)], true; "axis aligned")]
    #[test_case(&[Point(0.0, 0.0), Point(4.0, 1.0), Point(4.0, 2.0), Point(0.0, 2.0)], false; "skewed")]
    fn rectangle_detection(points: &[Point], expected: bool) {
        assert_eq!(is_rectangle(points, 1e-3), expected);
    }

    #[test]
    fn on_segment_excludes_endpoints() {
        let a = Point(0.0, 0.0);
        let b = Point(2.0, 2.0);
        assert!(on_segment(&a, &b, &Point(1.0, 1.0)));
        assert!(!on_segment(&a, &b, &a));
        assert!(!on_segment(&a, &b, &b));
        assert!(!on_segment(&a, &b, &Point(1.0, 1.5)));
    }

    #[test]
    fn slide_distance_between_facing_squares() {
        // B sits 5 units to the left of A, sliding right
        let a = square(10.0);
        let b = square(10.0);
        let d = polygon_slide_distance(&a, Point(0.0, 0.0), &b, Point(-15.0, 0.0), Point(1.0, 0.0));
        assert!(d.is_some());
        assert!((d.unwrap() - 5.0).abs() < 1e-9);
    }
}
