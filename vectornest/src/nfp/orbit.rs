//! General orbital (sliding) NFP search.
//!
//! B is placed touching A and slid along the contact, tracing the path of
//! its reference point (the first vertex). Contacts between the two
//! boundaries generate candidate translation vectors; the vector allowing
//! the longest feasible slide wins, the slide is trimmed to the first
//! collision, and the loop closes when the reference point returns to its
//! start. With `search_edges`, further start points are probed after each
//! closed loop so that concave regions produce additional loops.

use crate::clip::Contour;
use crate::geometry::{Point, kernel};

/// Candidate translation derived from one touching contact.
/// `start_a`/`end_a` name the A-vertices backing the vector, when any;
/// those get marked as visited once the vector is chosen.
#[derive(Clone, Copy, Debug)]
struct SlideVector {
    x: f64,
    y: f64,
    start_a: Option<usize>,
    end_a: Option<usize>,
}

impl SlideVector {
    fn new(x: f64, y: f64) -> Self {
        SlideVector {
            x,
            y,
            start_a: None,
            end_a: None,
        }
    }

    fn from_a(x: f64, y: f64, start_a: usize, end_a: usize) -> Self {
        SlideVector {
            x,
            y,
            start_a: Some(start_a),
            end_a: Some(end_a),
        }
    }
}

/// One contact between the boundaries at the current offset.
/// `kind` 0: vertex on vertex. 1: B-vertex on an A-edge (a names the edge
/// end). 2: A-vertex on a B-edge (b names the edge end).
#[derive(Clone, Copy, Debug)]
struct Touching {
    kind: u8,
    a: usize,
    b: usize,
}

/// Orbital NFP of B around (or inside) A. Both rings are used as-is; the
/// caller is responsible for rotations. Returns the traced loops; an empty
/// result means no valid start position exists.
pub fn no_fit_polygon(
    a: &[Point],
    b: &[Point],
    inside: bool,
    search_edges: bool,
) -> Option<Vec<Contour>> {
    if a.len() < 3 || b.len() < 3 {
        return None;
    }

    let mut marked_a = vec![false; a.len()];

    // heuristic start: B's top-most vertex on A's bottom-most vertex
    // guarantees a non-overlapping touching position for outer NFPs
    let min_a_idx = (0..a.len())
        .min_by(|&i, &j| a[i].1.partial_cmp(&a[j].1).expect("NaN coordinate"))
        .unwrap();
    let max_b_idx = (0..b.len())
        .max_by(|&i, &j| b[i].1.partial_cmp(&b[j].1).expect("NaN coordinate"))
        .unwrap();

    let mut start = if !inside {
        Some(Point(
            a[min_a_idx].0 - b[max_b_idx].0,
            a[min_a_idx].1 - b[max_b_idx].1,
        ))
    } else {
        search_start_point(a, b, true, &[], &mut marked_a)
    };

    let mut nfp_list: Vec<Contour> = vec![];

    while let Some(start_point) = start {
        let mut offset = start_point;
        let mut prev_vector: Option<SlideVector> = None;

        let mut reference = Point(b[0].0 + offset.0, b[0].1 + offset.1);
        let loop_start = reference;
        let mut nfp: Option<Contour> = Some(vec![reference]);

        let mut counter = 0;
        while counter < 10 * (a.len() + b.len()) {
            let touching = find_touching(a, b, offset);

            let mut vectors: Vec<SlideVector> = vec![];
            for t in &touching {
                marked_a[t.a] = true;

                let prev_a_idx = (t.a + a.len() - 1) % a.len();
                let next_a_idx = (t.a + 1) % a.len();
                let vertex_a = a[t.a];
                let prev_a = a[prev_a_idx];
                let next_a = a[next_a_idx];

                let prev_b_idx = (t.b + b.len() - 1) % b.len();
                let next_b_idx = (t.b + 1) % b.len();
                let vertex_b = b[t.b];
                let prev_b = b[prev_b_idx];
                let next_b = b[next_b_idx];

                match t.kind {
                    0 => {
                        vectors.push(SlideVector::from_a(
                            prev_a.0 - vertex_a.0,
                            prev_a.1 - vertex_a.1,
                            t.a,
                            prev_a_idx,
                        ));
                        vectors.push(SlideVector::from_a(
                            next_a.0 - vertex_a.0,
                            next_a.1 - vertex_a.1,
                            t.a,
                            next_a_idx,
                        ));
                        // B vectors flip sign, B is the one moving
                        vectors.push(SlideVector::new(
                            vertex_b.0 - prev_b.0,
                            vertex_b.1 - prev_b.1,
                        ));
                        vectors.push(SlideVector::new(
                            vertex_b.0 - next_b.0,
                            vertex_b.1 - next_b.1,
                        ));
                    }
                    1 => {
                        vectors.push(SlideVector::from_a(
                            vertex_a.0 - (vertex_b.0 + offset.0),
                            vertex_a.1 - (vertex_b.1 + offset.1),
                            prev_a_idx,
                            t.a,
                        ));
                        vectors.push(SlideVector::from_a(
                            prev_a.0 - (vertex_b.0 + offset.0),
                            prev_a.1 - (vertex_b.1 + offset.1),
                            t.a,
                            prev_a_idx,
                        ));
                    }
                    _ => {
                        vectors.push(SlideVector::new(
                            vertex_a.0 - (vertex_b.0 + offset.0),
                            vertex_a.1 - (vertex_b.1 + offset.1),
                        ));
                        vectors.push(SlideVector::new(
                            vertex_a.0 - (prev_b.0 + offset.0),
                            vertex_a.1 - (prev_b.1 + offset.1),
                        ));
                    }
                }
            }

            let mut translate: Option<SlideVector> = None;
            let mut max_d = 0.0;

            for v in &vectors {
                if v.x == 0.0 && v.y == 0.0 {
                    continue;
                }

                // never reverse direction onto the previous vector
                if let Some(prev) = &prev_vector {
                    if v.y * prev.y + v.x * prev.x < 0.0 {
                        let unit_v = kernel::normalize_vector(Point(v.x, v.y));
                        let unit_prev = kernel::normalize_vector(Point(prev.x, prev.y));
                        if (unit_v.1 * unit_prev.0 - unit_v.0 * unit_prev.1).abs() < 0.0001 {
                            continue;
                        }
                    }
                }

                let slide =
                    kernel::polygon_slide_distance(a, Point(0.0, 0.0), b, offset, Point(v.x, v.y));
                let vec_d2 = v.x * v.x + v.y * v.y;

                let d = match slide {
                    Some(d) if d * d <= vec_d2 => d,
                    _ => vec_d2.sqrt(),
                };

                if d > max_d {
                    max_d = d;
                    translate = Some(*v);
                }
            }

            let Some(mut chosen) = translate else {
                // no slide possible: B is jammed
                nfp = None;
                break;
            };
            if kernel::almost_equal(max_d, 0.0) {
                nfp = None;
                break;
            }

            if let Some(i) = chosen.start_a {
                marked_a[i] = true;
            }
            if let Some(i) = chosen.end_a {
                marked_a[i] = true;
            }

            // trim the slide to the collision distance
            let v_len2 = chosen.x * chosen.x + chosen.y * chosen.y;
            if max_d * max_d < v_len2 && !kernel::almost_equal(max_d * max_d, v_len2) {
                let scale = ((max_d * max_d) / v_len2).sqrt();
                chosen.x *= scale;
                chosen.y *= scale;
            }
            prev_vector = Some(chosen);

            reference = Point(reference.0 + chosen.x, reference.1 + chosen.y);

            if kernel::almost_equal(reference.0, loop_start.0)
                && kernel::almost_equal(reference.1, loop_start.1)
            {
                break; // loop closed
            }

            // degenerate closures revisit an interior point instead of the start
            let looped = nfp.as_ref().is_some_and(|points| {
                points.len() > 1
                    && points[..points.len() - 1].iter().any(|p| {
                        kernel::almost_equal(reference.0, p.0)
                            && kernel::almost_equal(reference.1, p.1)
                    })
            });
            if looped {
                break;
            }

            if let Some(points) = nfp.as_mut() {
                points.push(reference);
            }
            offset = Point(offset.0 + chosen.x, offset.1 + chosen.y);

            counter += 1;
        }

        if let Some(points) = nfp {
            if !points.is_empty() {
                nfp_list.push(points);
            }
        }

        if !search_edges {
            // only the outer loop (or first inner loop) is requested
            break;
        }

        start = search_start_point(a, b, inside, &nfp_list, &mut marked_a);
    }

    Some(nfp_list)
}

fn find_touching(a: &[Point], b: &[Point], offset: Point) -> Vec<Touching> {
    let mut touching = vec![];
    for i in 0..a.len() {
        let next_i = (i + 1) % a.len();
        for j in 0..b.len() {
            let next_j = (j + 1) % b.len();

            let bj = b[j].translated(offset.0, offset.1);
            let bnj = b[next_j].translated(offset.0, offset.1);

            if kernel::almost_equal(a[i].0, bj.0) && kernel::almost_equal(a[i].1, bj.1) {
                touching.push(Touching { kind: 0, a: i, b: j });
            } else if kernel::on_segment(&a[i], &a[next_i], &bj) {
                touching.push(Touching {
                    kind: 1,
                    a: next_i,
                    b: j,
                });
            } else if kernel::on_segment(&bj, &bnj, &a[i]) {
                touching.push(Touching {
                    kind: 2,
                    a: i,
                    b: next_j,
                });
            }
        }
    }
    touching
}

/// Probe for a position of B touching an unvisited A-vertex that satisfies
/// the requested containment relation without boundary crossings and is not
/// already part of a traced loop.
fn search_start_point(
    a: &[Point],
    b: &[Point],
    inside: bool,
    existing: &[Contour],
    marked_a: &mut [bool],
) -> Option<Point> {
    for i in 0..a.len() - 1 {
        if marked_a[i] {
            continue;
        }
        marked_a[i] = true;

        for j in 0..b.len() {
            let mut offset = Point(a[i].0 - b[j].0, a[i].1 - b[j].1);

            for pass in 0..2 {
                if pass == 1 {
                    // slide B along the edge leaving A[i], far enough to
                    // clear the overlap but no further than the edge itself
                    let mut v = Point(a[i + 1].0 - a[i].0, a[i + 1].1 - a[i].1);
                    let d1 = kernel::polygon_projection_distance(a, Point(0.0, 0.0), b, offset, v);
                    let d2 = kernel::polygon_projection_distance(
                        b,
                        offset,
                        a,
                        Point(0.0, 0.0),
                        Point(-v.0, -v.1),
                    );

                    let d = match (d1, d2) {
                        (None, None) => None,
                        (Some(d1), None) => Some(d1),
                        (None, Some(d2)) => Some(d2),
                        (Some(d1), Some(d2)) => Some(d1.min(d2)),
                    };

                    // only slide until no longer negative
                    let Some(d) = d else { continue };
                    if kernel::almost_equal(d, 0.0) || d <= 0.0 {
                        continue;
                    }

                    let vd2 = v.0 * v.0 + v.1 * v.1;
                    if d * d < vd2 && !kernel::almost_equal(d * d, vd2) {
                        let vd = vd2.sqrt();
                        v = Point(v.0 * d / vd, v.1 * d / vd);
                    }
                    offset = Point(offset.0 + v.0, offset.1 + v.1);
                }

                let mut b_inside: Option<bool> = None;
                for bk in b {
                    let p = bk.translated(offset.0, offset.1);
                    if let Some(r) = kernel::point_in_polygon(&p, a) {
                        b_inside = Some(r);
                        break;
                    }
                }

                // every B vertex on A's boundary: A and B are identical
                let b_inside = b_inside?;

                if b_inside == inside
                    && !intersect(a, b, offset)
                    && !in_existing_nfp(&offset, existing)
                {
                    return Some(offset);
                }
            }
        }
    }

    None
}

fn in_existing_nfp(p: &Point, nfp: &[Contour]) -> bool {
    nfp.iter().any(|contour| {
        contour
            .iter()
            .any(|v| kernel::almost_equal(p.0, v.0) && kernel::almost_equal(p.1, v.1))
    })
}

/// Do the boundaries of A and B (B at `offset`) cross?
/// Touching without crossing does not count; a touch point is a crossing
/// only when its neighbours lie on opposite sides of the other polygon.
fn intersect(a: &[Point], b: &[Point], offset: Point) -> bool {
    let shifted_b: Vec<Point> = b.iter().map(|p| p.translated(offset.0, offset.1)).collect();

    for i in 0..a.len() - 1 {
        for j in 0..shifted_b.len() - 1 {
            let a1 = a[i];
            let a2 = a[i + 1];
            let b1 = shifted_b[j];
            let b2 = shifted_b[j + 1];

            let mut prev_b = if j == 0 { b.len() - 1 } else { j - 1 };
            let mut prev_a = if i == 0 { a.len() - 1 } else { i - 1 };
            let mut next_b = if j + 1 == b.len() - 1 { 0 } else { j + 2 };
            let mut next_a = if i + 1 == a.len() - 1 { 0 } else { i + 2 };

            // step past coincident neighbours at loop seams
            if points_equal(&shifted_b[prev_b], &b1) {
                prev_b = if prev_b == 0 { b.len() - 1 } else { prev_b - 1 };
            }
            if points_equal(&shifted_b[next_b], &b2) {
                next_b = if next_b == b.len() - 1 { 0 } else { next_b + 1 };
            }
            if points_equal(&a[prev_a], &a1) {
                prev_a = if prev_a == 0 { a.len() - 1 } else { prev_a - 1 };
            }
            if points_equal(&a[next_a], &a2) {
                next_a = if next_a == a.len() - 1 { 0 } else { next_a + 1 };
            }

            let a0 = a[prev_a];
            let a3 = a[next_a];
            let b0 = shifted_b[prev_b];
            let b3 = shifted_b[next_b];

            if kernel::on_segment(&a1, &a2, &b1) || points_equal(&a1, &b1) {
                let b0in = kernel::point_in_polygon(&b0, a);
                let b2in = kernel::point_in_polygon(&b2, a);
                if opposite_sides(b0in, b2in) {
                    return true;
                }
                continue;
            }

            if kernel::on_segment(&a1, &a2, &b2) || points_equal(&a2, &b2) {
                let b1in = kernel::point_in_polygon(&b1, a);
                let b3in = kernel::point_in_polygon(&b3, a);
                if opposite_sides(b1in, b3in) {
                    return true;
                }
                continue;
            }

            if kernel::on_segment(&b1, &b2, &a1) || points_equal(&a1, &b2) {
                let a0in = kernel::point_in_polygon(&a0, &shifted_b);
                let a2in = kernel::point_in_polygon(&a2, &shifted_b);
                if opposite_sides(a0in, a2in) {
                    return true;
                }
                continue;
            }

            if kernel::on_segment(&b1, &b2, &a2) || points_equal(&a2, &b1) {
                let a1in = kernel::point_in_polygon(&a1, &shifted_b);
                let a3in = kernel::point_in_polygon(&a3, &shifted_b);
                if opposite_sides(a1in, a3in) {
                    return true;
                }
                continue;
            }

            if kernel::line_intersect(&b1, &b2, &a1, &a2, false).is_some() {
                return true;
            }
        }
    }

    false
}

fn points_equal(p: &Point, q: &Point) -> bool {
    kernel::almost_equal(p.0, q.0) && kernel::almost_equal(p.1, q.1)
}

fn opposite_sides(p: Option<bool>, q: Option<bool>) -> bool {
    matches!((p, q), (Some(a), Some(b)) if a != b)
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
    fn outer_nfp_of_two_squares() {
        let nfp = no_fit_polygon(&square(10.0), &square(10.0), false, false).unwrap();
        assert_eq!(nfp.len(), 1);
        let b = Bounds::of_points(&nfp[0]).unwrap();
        assert!((b.x - -10.0).abs() < 1e-6);
        assert!((b.y - -10.0).abs() < 1e-6);
        assert!((b.width - 20.0).abs() < 1e-6);
        assert!((b.height - 20.0).abs() < 1e-6);
    }

    #[test]
    fn inner_nfp_of_square_in_square() {
        let nfp = no_fit_polygon(&square(50.0), &square(10.0), true, false).unwrap();
        assert_eq!(nfp.len(), 1);
        let b = Bounds::of_points(&nfp[0]).unwrap();
        assert!(b.x >= -1e-6 && b.y >= -1e-6);
        assert!((b.width - 40.0).abs() < 1e-6);
        assert!((b.height - 40.0).abs() < 1e-6);
    }

    #[test]
    fn oversized_orbiter_has_no_inner_nfp() {
        let nfp = no_fit_polygon(&square(10.0), &square(50.0), true, false).unwrap();
        assert!(nfp.is_empty());
    }

    #[test]
    fn intersect_detects_overlap_and_allows_touch() {
        let a = square(10.0);
        let b = square(10.0);
        assert!(intersect(&a, &b, Point(5.0, 5.0)));
        assert!(!intersect(&a, &b, Point(10.0, 0.0)));
        assert!(!intersect(&a, &b, Point(25.0, 0.0)));
    }
}
