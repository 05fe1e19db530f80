//! No-fit polygon engine.
//!
//! For an ordered pair (A, B), computes the locus of reference-point
//! positions of B such that B touches but does not overlap A (the "outside"
//! relation), or lies entirely within A (the "inside" relation, an IFP).
//!
//! A `None` result is not an error: it means B cannot be placed relative to
//! A at these rotations, and is cached as such.

pub mod minkowski;
pub mod orbit;

use log::{debug, warn};

use crate::clip::Contour;
use crate::geometry::{Bounds, Point, Polygon, kernel};

/// Tolerance for treating an inner-NFP subject as an axis-aligned rectangle.
const RECT_TOLERANCE: f64 = 1e-3;

/// Closed-form inner NFP for an axis-aligned rectangular container.
/// `None` when B does not fit in either dimension.
pub fn no_fit_polygon_rectangle(a: &Polygon, b: &Polygon) -> Option<Vec<Contour>> {
    let ba = a.bounds()?;
    let bb = b.bounds()?;

    if bb.width > ba.width || bb.height > ba.height {
        return None;
    }

    let b0 = b.points[0];
    let min = Point(ba.x - bb.x + b0.0, ba.y - bb.y + b0.1);
    let max = Point(
        ba.x_max() - bb.x_max() + b0.0,
        ba.y_max() - bb.y_max() + b0.1,
    );

    Some(vec![vec![
        Point(min.0, min.1),
        Point(max.0, min.1),
        Point(max.0, max.1),
        Point(min.0, max.1),
    ]])
}

/// Full NFP computation for one cache pair. `a` and `b` must already be
/// rotated to the pair's angles.
pub fn pair_nfp(
    a: &Polygon,
    b: &Polygon,
    inside: bool,
    explore_concave: bool,
    use_holes: bool,
) -> Option<Vec<Contour>> {
    if a.points.len() < 3 || b.points.len() < 3 {
        return None;
    }

    if inside {
        let mut nfp = if kernel::is_rectangle(&a.points, RECT_TOLERANCE) {
            no_fit_polygon_rectangle(a, b)
        } else {
            orbit::no_fit_polygon(&a.points, &b.points, true, explore_concave)
        }?;

        if nfp.is_empty() {
            debug!("[NFP] empty inner NFP for pair ({}, {})", a.id, b.id);
            return None;
        }

        // interior NFPs all share the outer winding direction
        for loop_points in &mut nfp {
            if kernel::signed_area(loop_points) > 0.0 {
                loop_points.reverse();
            }
        }

        return Some(nfp);
    }

    let mut nfp = if explore_concave {
        orbit::no_fit_polygon(&a.points, &b.points, false, true)
    } else {
        minkowski::minkowski_nfp(a, b)
    }?;

    if nfp.is_empty() {
        warn!("[NFP] no outer NFP for pair ({}, {})", a.id, b.id);
        return None;
    }

    // sanity check: the outer loop must at least enclose A itself.
    // with concave exploration only the first loop is guaranteed to pass.
    let a_area = a.area();
    for (i, loop_points) in nfp.iter().enumerate() {
        if explore_concave && i > 0 {
            continue;
        }
        if kernel::signed_area(loop_points).abs() < a_area {
            warn!(
                "[NFP] area sanity check failed for pair ({}, {}), discarding",
                a.id, b.id
            );
            return None;
        }
    }

    // the first loop is the largest; subsequent loops lying inside it are holes
    for i in 0..nfp.len() {
        if kernel::signed_area(&nfp[i]) > 0.0 {
            nfp[i].reverse();
        }
        if i > 0
            && kernel::point_in_polygon(&nfp[i][0], &nfp[0]) == Some(true)
            && kernel::signed_area(&nfp[i]) < 0.0
        {
            nfp[i].reverse();
        }
    }

    // nest B into A's holes that are large enough to possibly admit it
    if use_holes && !a.holes.is_empty() {
        if let Some(b_bounds) = b.bounds() {
            for hole in &a.holes {
                let Some(hole_bounds) = Bounds::of_points(&hole.points) else {
                    continue;
                };
                if !hole_bounds.exceeds(&b_bounds) {
                    continue;
                }
                if let Some(hole_nfp) =
                    orbit::no_fit_polygon(&hole.points, &b.points, true, explore_concave)
                {
                    for mut loop_points in hole_nfp {
                        // hole NFPs act as holes of the outer NFP
                        if kernel::signed_area(&loop_points) < 0.0 {
                            loop_points.reverse();
                        }
                        nfp.push(loop_points);
                    }
                }
            }
        }
    }

    Some(nfp)
}
