//! Outer NFP via the Minkowski difference `A ⊕ (-B)`.
//!
//! The clipping stack has no Minkowski primitive, so the difference is
//! assembled from convex pieces: both operands are decomposed (ear
//! clipping), the pairwise convex Minkowski sums are computed by the
//! classic edge-vector merge, and the pieces are unioned back together.
//! Of the union only the largest boundary is kept, re-centered by B's
//! first vertex so the result is in reference-point coordinates.

use itertools::iproduct;

use crate::clip::{self, Contour};
use crate::geometry::{Point, Polygon, kernel};

pub fn minkowski_nfp(a: &Polygon, b: &Polygon) -> Option<Vec<Contour>> {
    if a.points.len() < 3 || b.points.len() < 3 {
        return None;
    }

    let b0 = b.points[0];

    let mut a_ring = a.points.clone();
    ensure_ccw(&mut a_ring);
    let mut b_ring: Vec<Point> = b.points.iter().map(|p| Point(-p.0, -p.1)).collect();
    ensure_ccw(&mut b_ring);

    let a_pieces = decompose(&a_ring);
    let b_pieces = decompose(&b_ring);
    if a_pieces.is_empty() || b_pieces.is_empty() {
        return None;
    }

    let mut sums: Vec<Vec<Contour>> = vec![];
    for (pa, pb) in iproduct!(&a_pieces, &b_pieces) {
        let sum = convex_sum(pa, pb);
        if sum.len() >= 3 {
            sums.push(vec![sum]);
        }
    }

    let merged = clip::union(&sums);
    let mut best = clip::multipolygon_to_contours(&merged)
        .into_iter()
        .filter(|c| kernel::signed_area(c) < 0.0)
        .max_by(|a, b| {
            kernel::signed_area(a)
                .abs()
                .partial_cmp(&kernel::signed_area(b).abs())
                .expect("NaN ring area")
        })?;

    for p in &mut best {
        *p = p.translated(b0.0, b0.1);
    }

    Some(vec![best])
}

/// Counter-clockwise in the crate convention (negative shoelace sum).
fn ensure_ccw(points: &mut [Point]) {
    if kernel::signed_area(points) > 0.0 {
        points.reverse();
    }
}

fn decompose(points: &[Point]) -> Vec<Vec<Point>> {
    if is_convex(points) {
        vec![points.to_vec()]
    } else {
        triangulate(points)
            .into_iter()
            .map(|t| t.to_vec())
            .collect()
    }
}

fn is_convex(points: &[Point]) -> bool {
    let n = points.len();
    (0..n).all(|i| corner_cross(&points[(i + n - 1) % n], &points[i], &points[(i + 1) % n]) >= 0.0)
}

fn corner_cross(prev: &Point, cur: &Point, next: &Point) -> f64 {
    (cur.0 - prev.0) * (next.1 - cur.1) - (cur.1 - prev.1) * (next.0 - cur.0)
}

/// Ear-clipping triangulation of a counter-clockwise simple polygon.
fn triangulate(points: &[Point]) -> Vec<[Point; 3]> {
    let mut idx: Vec<usize> = (0..points.len()).collect();
    let mut triangles = vec![];

    'clip: while idx.len() > 3 {
        let n = idx.len();
        for k in 0..n {
            let i_prev = idx[(k + n - 1) % n];
            let i_cur = idx[k];
            let i_next = idx[(k + 1) % n];
            let (prev, cur, next) = (points[i_prev], points[i_cur], points[i_next]);

            if corner_cross(&prev, &cur, &next) <= 0.0 {
                continue; // reflex corner, not an ear
            }

            let blocked = idx.iter().any(|&other| {
                other != i_prev
                    && other != i_cur
                    && other != i_next
                    && point_in_triangle(&points[other], &prev, &cur, &next)
            });
            if blocked {
                continue;
            }

            triangles.push([prev, cur, next]);
            idx.remove(k);
            continue 'clip;
        }
        // no ear found: numerically degenerate input
        return vec![];
    }

    if idx.len() == 3 {
        triangles.push([points[idx[0]], points[idx[1]], points[idx[2]]]);
    }
    triangles
}

fn point_in_triangle(p: &Point, a: &Point, b: &Point, c: &Point) -> bool {
    let d1 = corner_cross(a, b, p);
    let d2 = corner_cross(b, c, p);
    let d3 = corner_cross(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Minkowski sum of two convex counter-clockwise polygons via the sorted
/// edge-vector merge, starting from the bottom-most vertex of each.
fn convex_sum(p: &[Point], q: &[Point]) -> Vec<Point> {
    let bottom = |poly: &[Point]| -> usize {
        (0..poly.len())
            .min_by(|&i, &j| {
                (poly[i].1, poly[i].0)
                    .partial_cmp(&(poly[j].1, poly[j].0))
                    .expect("NaN coordinate")
            })
            .unwrap()
    };

    let (n, m) = (p.len(), q.len());
    let (sp, sq) = (bottom(p), bottom(q));

    let mut result = vec![];
    let (mut i, mut j) = (0usize, 0usize);
    while i < n || j < m {
        let pv = p[(sp + i) % n];
        let qv = q[(sq + j) % m];
        result.push(Point(pv.0 + qv.0, pv.1 + qv.1));

        if i >= n {
            j += 1;
            continue;
        }
        if j >= m {
            i += 1;
            continue;
        }

        let e1 = edge(p, sp + i);
        let e2 = edge(q, sq + j);
        let cross = e1.cross(&e2);
        if cross > kernel::TOL {
            i += 1;
        } else if cross < -kernel::TOL {
            j += 1;
        } else {
            i += 1;
            j += 1;
        }
    }
    result
}

fn edge(poly: &[Point], i: usize) -> Point {
    let n = poly.len();
    let a = poly[i % n];
    let b = poly[(i + 1) % n];
    Point(b.0 - a.0, b.1 - a.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point(0.0, 0.0),
            Point(size, 0.0),
            Point(size, size),
            Point(0.0, size),
        ]
    }

    #[test]
    fn convex_sum_of_squares_is_square() {
        let s = convex_sum(&square(1.0), &square(2.0));
        let b = Bounds::of_points(&s).unwrap();
        assert!((b.width - 3.0).abs() < 1e-9);
        assert!((b.height - 3.0).abs() < 1e-9);
    }

    #[test]
    fn triangulation_covers_the_polygon() {
        // L-shaped hexagon
        let l = vec![
            Point(0.0, 0.0),
            Point(4.0, 0.0),
            Point(4.0, 1.0),
            Point(1.0, 1.0),
            Point(1.0, 3.0),
            Point(0.0, 3.0),
        ];
        let tris = triangulate(&l);
        assert_eq!(tris.len(), 4);
        let covered: f64 = tris
            .iter()
            .map(|t| kernel::signed_area(t).abs())
            .sum();
        assert!((covered - kernel::signed_area(&l).abs()).abs() < 1e-9);
    }

    #[test]
    fn nfp_of_concave_part() {
        let l = Polygon::new(vec![
            Point(0.0, 0.0),
            Point(4.0, 0.0),
            Point(4.0, 1.0),
            Point(1.0, 1.0),
            Point(1.0, 3.0),
            Point(0.0, 3.0),
        ]);
        let b = Polygon::new(square(1.0));
        let nfp = minkowski_nfp(&l, &b).unwrap();
        let bounds = Bounds::of_points(&nfp[0]).unwrap();
        // NFP spans the L inflated by the unit square in every direction
        assert!((bounds.width - 5.0).abs() < 1e-6);
        assert!((bounds.height - 4.0).abs() < 1e-6);
        assert!(kernel::signed_area(&nfp[0]).abs() >= l.area());
    }
}
