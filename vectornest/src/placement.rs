//! Greedy placement of an ordered, pre-rotated part list into bin instances.
//!
//! Entirely deterministic: the same ordering, rotations and NFP cache always
//! produce the same plan. Parts that fit nowhere in the current bin are
//! deferred to the next bin-opening pass; a pass that places nothing ends
//! the run and the leftovers are penalized.

use serde::{Deserialize, Serialize};

use crate::clip::{self, Contour};
use crate::eval::{NfpCache, NfpKey};
use crate::geometry::{BIN_ID, Bounds, Point, Polygon, kernel};

/// Rings thinner than this (in squared nest units) are clipper debris.
const SLIVER_AREA: f64 = 0.1;
/// Candidate regions below this area cannot hold anything meaningful.
const MIN_REGION_AREA: f64 = 2.0;
/// Cleanup epsilon applied after boolean operations.
const CLEAN_TOLERANCE: f64 = 1e-4;

/// Chosen translation and rotation for one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

/// The outcome of one evaluation: per-bin placements, the scalar fitness
/// (lower is better) and the parts that never fit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlacementPlan {
    pub bins: Vec<Vec<Placement>>,
    pub fitness: f64,
    pub unplaced: Vec<i64>,
}

/// Place `paths` (already rotated per the individual) into as many bin
/// instances as needed, driven by the NFPs in `cache`.
pub fn place_parts(bin: &Polygon, paths: &[Polygon], cache: &NfpCache) -> PlacementPlan {
    let bin_area = bin.area();
    let mut remaining: Vec<&Polygon> = paths.iter().collect();

    let mut all_placements: Vec<Vec<Placement>> = vec![];
    let mut fitness = 0.0;

    while !remaining.is_empty() {
        let mut placed: Vec<&Polygon> = vec![];
        let mut placements: Vec<Placement> = vec![];

        // one more bin instance
        fitness += 1.0;
        let mut min_width: Option<f64> = None;

        for path in &remaining {
            let bin_key = NfpKey::inside(BIN_ID, path.id, 0.0, path.rotation);
            let Some(Some(bin_nfp)) = cache.get(&bin_key) else {
                continue; // no way into this bin at this rotation
            };
            if bin_nfp.is_empty() {
                continue;
            }

            // all pair NFPs with already-placed parts must have resolved
            let missing_pair = placed.iter().any(|other| {
                !matches!(
                    cache.get(&NfpKey::outside(
                        other.id,
                        path.id,
                        other.rotation,
                        path.rotation
                    )),
                    Some(Some(_))
                )
            });
            if missing_pair {
                continue;
            }

            if placed.is_empty() {
                // first part lands on the leftmost inner-NFP vertex
                let mut position: Option<Placement> = None;
                for contour in bin_nfp {
                    for v in contour {
                        let candidate_x = v.0 - path.points[0].0;
                        if position.as_ref().is_none_or(|p| candidate_x < p.x) {
                            position = Some(Placement {
                                id: path.id,
                                x: candidate_x,
                                y: v.1 - path.points[0].1,
                                rotation: path.rotation,
                            });
                        }
                    }
                }
                if let Some(position) = position {
                    placements.push(position);
                    placed.push(*path);
                }
                continue;
            }

            // feasible region: bin inner-NFP minus the union of pair NFPs
            // translated to each placed part's position
            let mut blocked_groups: Vec<Vec<Contour>> = vec![];
            for (other, placement) in placed.iter().zip(&placements) {
                let key =
                    NfpKey::outside(other.id, path.id, other.rotation, path.rotation);
                let Some(Some(pair_nfp)) = cache.get(&key) else {
                    continue;
                };
                let group: Vec<Contour> = pair_nfp
                    .iter()
                    .map(|contour| {
                        let translated: Contour = contour
                            .iter()
                            .map(|p| p.translated(placement.x, placement.y))
                            .collect();
                        clip::simplify_contour(&translated, CLEAN_TOLERANCE)
                    })
                    .filter(|c| c.len() >= 3 && kernel::signed_area(c).abs() > SLIVER_AREA)
                    .collect();
                if !group.is_empty() {
                    blocked_groups.push(group);
                }
            }

            let blocked = clip::union(&blocked_groups);
            let feasible = clip::difference(&clip::contours_to_multipolygon(bin_nfp), &blocked);

            let final_nfp: Vec<Contour> = clip::multipolygon_to_contours(&feasible)
                .iter()
                .map(|c| clip::simplify_contour(c, CLEAN_TOLERANCE))
                .filter(|c| c.len() >= 3 && kernel::signed_area(c).abs() > SLIVER_AREA)
                .collect();
            if final_nfp.is_empty() {
                continue;
            }

            // pick the vertex that keeps the overall packing narrow
            let placed_points: Vec<Point> = placed
                .iter()
                .zip(&placements)
                .flat_map(|(other, pl)| {
                    other.points.iter().map(move |p| p.translated(pl.x, pl.y))
                })
                .collect();

            let mut position: Option<Placement> = None;
            let mut min_area: Option<f64> = None;
            let mut min_x: Option<f64> = None;

            for contour in &final_nfp {
                if kernel::signed_area(contour).abs() < MIN_REGION_AREA {
                    continue;
                }
                for v in contour {
                    let shift = Point(v.0 - path.points[0].0, v.1 - path.points[0].1);

                    let mut all_points = placed_points.clone();
                    all_points.extend(path.points.iter().map(|p| p.translated(shift.0, shift.1)));
                    let Some(rect) = Bounds::of_points(&all_points) else {
                        continue;
                    };

                    // weigh width more heavily to pack against the left edge
                    let area = rect.width * 2.0 + rect.height;

                    let better = match min_area {
                        None => true,
                        Some(ma) => {
                            area < ma
                                || (kernel::almost_equal(area, ma)
                                    && min_x.is_none_or(|mx| shift.0 < mx))
                        }
                    };
                    if better {
                        min_area = Some(area);
                        min_width = Some(rect.width);
                        min_x = Some(shift.0);
                        position = Some(Placement {
                            id: path.id,
                            x: shift.0,
                            y: shift.1,
                            rotation: path.rotation,
                        });
                    }
                }
            }

            if let Some(position) = position {
                placements.push(position);
                placed.push(*path);
            }
        }

        if let Some(width) = min_width {
            fitness += width / bin_area;
        }

        remaining.retain(|path| !placed.iter().any(|p| p.id == path.id));

        if placements.is_empty() {
            break; // nothing fit, stop opening bins
        }
        all_placements.push(placements);
    }

    // hard penalty for every part that never fit
    fitness += 2.0 * remaining.len() as f64;

    PlacementPlan {
        bins: all_placements,
        fitness,
        unplaced: remaining.iter().map(|p| p.id).collect(),
    }
}
