//! Evaluation of a single individual: resolve the NFPs its ordering needs,
//! in parallel, then run the sequential placement stage.
//!
//! The NFP cache lives for exactly one evaluation cycle. Keys the next
//! individual still needs are carried over, everything else is dropped,
//! keeping memory bounded and results immune to stale part/rotation state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::clip::Contour;
use crate::config::NestConfig;
use crate::geometry::{BIN_ID, Polygon};
use crate::nfp;
use crate::placement::{self, PlacementPlan};

/// Composite cache key for one NFP pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NfpKey {
    pub a: i64,
    pub b: i64,
    pub inside: bool,
    pub a_rotation: OrderedFloat<f64>,
    pub b_rotation: OrderedFloat<f64>,
}

impl NfpKey {
    pub fn inside(a: i64, b: i64, a_rotation: f64, b_rotation: f64) -> Self {
        NfpKey {
            a,
            b,
            inside: true,
            a_rotation: OrderedFloat(a_rotation),
            b_rotation: OrderedFloat(b_rotation),
        }
    }

    pub fn outside(a: i64, b: i64, a_rotation: f64, b_rotation: f64) -> Self {
        NfpKey {
            a,
            b,
            inside: false,
            a_rotation: OrderedFloat(a_rotation),
            b_rotation: OrderedFloat(b_rotation),
        }
    }
}

/// `None` is a legitimate cached value: the pair is unplaceable at these
/// rotations (or its computation was discarded by a sanity check).
pub type NfpCache = HashMap<NfpKey, Option<Vec<Contour>>>;

/// Everything one evaluation needs, moved onto the evaluation thread.
pub struct EvalJob {
    pub bin: Polygon,
    pub parts: Vec<Polygon>,
    pub order: Vec<usize>,
    pub rotations: Vec<f64>,
    pub index: usize,
    pub cache: NfpCache,
    pub config: NestConfig,
}

/// Result handed back to the controller.
pub struct Evaluation {
    pub index: usize,
    pub plan: PlacementPlan,
    pub cache: NfpCache,
}

/// NFP-stage progress, shared with the controller for reporting.
#[derive(Default)]
pub struct EvalProgress {
    pub completed: AtomicUsize,
    pub total: AtomicUsize,
}

impl EvalProgress {
    pub fn fraction(&self) -> f64 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.completed.load(Ordering::Relaxed) as f64 / total as f64
    }

    fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }
}

pub fn evaluate(job: EvalJob, progress: &EvalProgress) -> Evaluation {
    let EvalJob {
        bin,
        parts,
        order,
        rotations,
        index,
        cache,
        config,
    } = job;

    // working copies rotated per the individual, in placement order
    let placelist: Vec<Polygon> = order
        .iter()
        .zip(&rotations)
        .map(|(&part_idx, &rotation)| parts[part_idx].rotated(rotation))
        .collect();

    // the keys this ordering needs: a bin inner-NFP per part and an outer
    // NFP against every part placed before it
    let mut missing: Vec<NfpKey> = vec![];
    let mut fresh = NfpCache::new();

    let require = |key: NfpKey, fresh: &mut NfpCache, missing: &mut Vec<NfpKey>| {
        if let Some(entry) = cache.get(&key) {
            fresh.insert(key, entry.clone());
        } else if !missing.contains(&key) {
            missing.push(key);
        }
    };

    for (i, path) in placelist.iter().enumerate() {
        require(
            NfpKey::inside(BIN_ID, path.id, 0.0, path.rotation),
            &mut fresh,
            &mut missing,
        );
        for other in &placelist[..i] {
            require(
                NfpKey::outside(other.id, path.id, other.rotation, path.rotation),
                &mut fresh,
                &mut missing,
            );
        }
    }

    progress.reset(missing.len());
    debug!(
        "[EVAL] individual {}: {} cached, {} to compute",
        index,
        fresh.len(),
        missing.len()
    );

    let by_id: HashMap<i64, &Polygon> = std::iter::once((BIN_ID, &bin))
        .chain(parts.iter().map(|p| (p.id, p)))
        .collect();

    // pure, disjoint tasks: each owns exactly one cache key
    let computed: Vec<(NfpKey, Option<Vec<Contour>>)> = missing
        .par_iter()
        .map(|key| {
            let a = by_id[&key.a].rotated(key.a_rotation.into_inner());
            let b = by_id[&key.b].rotated(key.b_rotation.into_inner());
            let result = nfp::pair_nfp(
                &a,
                &b,
                key.inside,
                config.explore_concave,
                config.use_holes,
            );
            progress.completed.fetch_add(1, Ordering::Relaxed);
            (key.clone(), result)
        })
        .collect();

    fresh.extend(computed);

    let plan = placement::place_parts(&bin, &placelist, &fresh);

    Evaluation {
        index,
        plan,
        cache: fresh,
    }
}
