//! Nesting session: input preprocessing, the controller thread and the
//! evaluation pipeline tying the optimizer to the placement engine.
//!
//! The controller keeps a single evaluation in flight at a time. The NFP
//! stage inside an evaluation fans out over the rayon pool; the controller
//! itself only ticks, forwards progress and collects results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::clip;
use crate::config::NestConfig;
use crate::eval::{self, EvalJob, EvalProgress, NfpCache};
use crate::ga::GeneticAlgorithm;
use crate::geometry::{BIN_ID, Polygon};
use crate::placement::PlacementPlan;

/// How often the controller wakes up to report NFP progress while an
/// evaluation is running.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshot pushed to the display callback when a new best plan is found.
#[derive(Debug, Clone)]
pub struct DisplayUpdate {
    pub plan: PlacementPlan,
    /// Total part area over total area of the bins in use.
    pub utilization: f64,
    pub placed: usize,
    pub total: usize,
}

pub struct NestingSession {
    bin: Polygon,
    parts: Vec<Polygon>,
    config: NestConfig,
    stop_flag: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    best: Arc<Mutex<Option<PlacementPlan>>>,
    progress: Arc<EvalProgress>,
    handle: Option<JoinHandle<()>>,
}

impl NestingSession {
    pub fn new(bin: Polygon, parts: Vec<Polygon>, config: NestConfig) -> Result<Self> {
        config.validate()?;
        Ok(NestingSession {
            bin,
            parts,
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            best: Arc::new(Mutex::new(None)),
            progress: Arc::new(EvalProgress::default()),
            handle: None,
        })
    }

    /// Swap in new inputs or settings. Rejected while a run is active;
    /// clears the previous best plan.
    pub fn configure(
        &mut self,
        bin: Polygon,
        parts: Vec<Polygon>,
        config: NestConfig,
    ) -> Result<()> {
        if self.is_running() {
            bail!("cannot reconfigure a running session");
        }
        config.validate()?;
        self.bin = bin;
        self.parts = parts;
        self.config = config;
        *self.best.lock().expect("poisoned best plan lock") = None;
        Ok(())
    }

    /// Launch the controller thread. `progress_cb` receives the NFP-stage
    /// completion fraction; `display_cb` receives `Some` whenever a new best
    /// plan is available and `None` after evaluations that did not improve.
    pub fn start<P, D>(&mut self, progress_cb: P, display_cb: D) -> Result<()>
    where
        P: Fn(f64) + Send + 'static,
        D: Fn(Option<DisplayUpdate>) + Send + 'static,
    {
        if self.is_running() {
            bail!("session already running");
        }

        let (bin, parts) = preprocess(&self.bin, &self.parts, &self.config);
        if parts.is_empty() {
            bail!("no usable parts after preprocessing");
        }

        self.stop_flag.store(false, Ordering::Relaxed);
        self.running.store(true, Ordering::Relaxed);

        let config = self.config;
        let stop_flag = Arc::clone(&self.stop_flag);
        let running = Arc::clone(&self.running);
        let best = Arc::clone(&self.best);
        let progress = Arc::clone(&self.progress);

        let handle = thread::Builder::new()
            .name("nest-controller".into())
            .spawn(move || {
                run_controller(
                    bin, parts, config, stop_flag, best, progress, progress_cb, display_cb,
                );
                running.store(false, Ordering::Relaxed);
            })
            .context("failed to spawn controller thread")?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Request the run to end. Idempotent; the in-flight evaluation is
    /// discarded rather than awaited.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Block until the controller thread exits.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn best_plan(&self) -> Option<PlacementPlan> {
        self.best.lock().expect("poisoned best plan lock").clone()
    }
}

#[allow(clippy::too_many_arguments)]
fn run_controller<P, D>(
    bin: Polygon,
    parts: Vec<Polygon>,
    config: NestConfig,
    stop_flag: Arc<AtomicBool>,
    best: Arc<Mutex<Option<PlacementPlan>>>,
    progress: Arc<EvalProgress>,
    progress_cb: P,
    display_cb: D,
) where
    P: Fn(f64) + Send + 'static,
    D: Fn(Option<DisplayUpdate>) + Send + 'static,
{
    let rng = match config.prng_seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let bin_bounds = bin
        .bounds()
        .expect("preprocessed bin has valid bounds");
    let bin_area = bin.area();
    let total_parts = parts.len();

    let mut ga = GeneticAlgorithm::new(&parts, bin_bounds, &config, rng);
    let mut cache = NfpCache::new();
    let mut generation = 0usize;

    info!(
        "[SESSION] starting: {} parts, {} generations of {}",
        total_parts, config.generations, config.population_size
    );

    'run: loop {
        if stop_flag.load(Ordering::Relaxed) {
            break;
        }

        let Some(idx) = ga.population.iter().position(|i| i.fitness.is_none()) else {
            generation += 1;
            if generation >= config.generations {
                info!("[SESSION] generation budget exhausted");
                break;
            }
            ga.generation();
            continue;
        };

        let job = EvalJob {
            bin: bin.clone(),
            parts: parts.clone(),
            order: ga.population[idx].order.clone(),
            rotations: ga.population[idx].rotations.clone(),
            index: idx,
            cache: std::mem::take(&mut cache),
            config,
        };

        let (tx, rx) = mpsc::channel();
        let worker_progress = Arc::clone(&progress);
        thread::Builder::new()
            .name("nest-eval".into())
            .spawn(move || {
                let _ = tx.send(eval::evaluate(job, &worker_progress));
            })
            .expect("failed to spawn evaluation thread");

        // tick until the evaluation lands, reporting NFP progress
        let evaluation = loop {
            match rx.recv_timeout(TICK_INTERVAL) {
                Ok(ev) => break ev,
                Err(RecvTimeoutError::Timeout) => {
                    if stop_flag.load(Ordering::Relaxed) {
                        debug!("[SESSION] stop requested, discarding in-flight evaluation");
                        break 'run;
                    }
                    progress_cb(progress.fraction());
                }
                Err(RecvTimeoutError::Disconnected) => break 'run,
            }
        };

        cache = evaluation.cache;
        let plan = evaluation.plan;
        ga.population[evaluation.index].fitness = Some(plan.fitness);
        debug!(
            "[SESSION] generation {} individual {}: fitness {:.4}",
            generation, evaluation.index, plan.fitness
        );

        let mut best_guard = best.lock().expect("poisoned best plan lock");
        let improved = best_guard
            .as_ref()
            .is_none_or(|b| plan.fitness < b.fitness);
        if improved {
            let placed = plan.bins.iter().map(Vec::len).sum();
            let placed_area: f64 = plan
                .bins
                .iter()
                .flatten()
                .map(|pl| {
                    parts
                        .iter()
                        .find(|p| p.id == pl.id)
                        .map_or(0.0, Polygon::area)
                })
                .sum();
            let utilization = if plan.bins.is_empty() {
                0.0
            } else {
                placed_area / (bin_area * plan.bins.len() as f64)
            };

            info!(
                "[SESSION] new best: fitness {:.4}, {}/{} placed, utilization {:.1}%",
                plan.fitness,
                placed,
                total_parts,
                utilization * 100.0
            );
            *best_guard = Some(plan.clone());
            drop(best_guard);
            display_cb(Some(DisplayUpdate {
                plan,
                utilization,
                placed,
                total: total_parts,
            }));
        } else {
            drop(best_guard);
            display_cb(None);
        }
    }
    info!("[SESSION] finished");
}

/// Clean raw input outlines into the form the engine works on: simplified,
/// deduplicated, winding-normalized, spacing-inflated and id-tagged, with
/// the bin anchored at the origin.
fn preprocess(bin: &Polygon, parts: &[Polygon], config: &NestConfig) -> (Polygon, Vec<Polygon>) {
    let half_spacing = config.spacing / 2.0;
    let min_area = config.curve_tolerance * config.curve_tolerance;

    let mut cleaned: Vec<Polygon> = vec![];
    for (source, part) in parts.iter().enumerate() {
        let Some(mut poly) = clean_contour(&part.points, config.curve_tolerance) else {
            debug!("[SESSION] dropping degenerate part {source}");
            continue;
        };
        if poly.area() <= min_area {
            debug!("[SESSION] dropping sliver part {source}");
            continue;
        }
        if half_spacing > 0.0
            && let Some(grown) = clip::offset_contour(&poly.points, half_spacing)
        {
            poly.points = grown;
        }
        for hole in &part.holes {
            let Some(mut cleaned_hole) = clean_contour(&hole.points, config.curve_tolerance) else {
                continue;
            };
            if half_spacing > 0.0
                && let Some(shrunk) = clip::offset_contour(&cleaned_hole.points, -half_spacing)
            {
                cleaned_hole.points = shrunk;
            }
            cleaned_hole.points.reverse(); // holes carry the opposite winding
            poly.holes.push(cleaned_hole);
        }
        poly.id = cleaned.len() as i64;
        poly.source = Some(source);
        cleaned.push(poly);
    }

    let mut bin = clean_contour(&bin.points, config.curve_tolerance)
        .unwrap_or_else(|| bin.clone());
    if half_spacing > 0.0
        && let Some(shrunk) = clip::offset_contour(&bin.points, -half_spacing)
    {
        bin.points = shrunk;
    }
    if let Some(b) = bin.bounds() {
        bin.translate(-b.x, -b.y);
    }
    bin.id = BIN_ID;

    (bin, cleaned)
}

fn clean_contour(points: &[crate::geometry::Point], tolerance: f64) -> Option<Polygon> {
    let simplified = clip::simplify_contour(points, tolerance);
    let mut poly = Polygon::new(simplified);
    poly.dedup_endpoints();
    if poly.points.len() < 3 {
        return None;
    }
    poly.normalize_winding();
    Some(poly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![
            Point(0.0, 0.0),
            Point(size, 0.0),
            Point(size, size),
            Point(0.0, size),
        ])
    }

    #[test]
    fn preprocess_anchors_bin_and_tags_parts() {
        let mut bin = square(100.0);
        bin.translate(25.0, 40.0);
        let parts = vec![square(10.0), square(20.0)];

        let (bin, parts) = preprocess(&bin, &parts, &NestConfig::default());
        let b = bin.bounds().unwrap();
        assert_eq!((b.x, b.y), (0.0, 0.0));
        assert_eq!(bin.id, BIN_ID);
        assert_eq!(parts[0].id, 0);
        assert_eq!(parts[1].id, 1);
        assert_eq!(parts[1].source, Some(1));
    }

    #[test]
    fn preprocess_drops_degenerate_parts() {
        let bin = square(100.0);
        let line = Polygon::new(vec![Point(0.0, 0.0), Point(5.0, 0.0)]);
        let sliver = Polygon::new(vec![
            Point(0.0, 0.0),
            Point(0.2, 0.0),
            Point(0.2, 0.2),
            Point(0.0, 0.2),
        ]);
        let keeper = square(10.0);

        let (_, parts) = preprocess(&bin, &[line, sliver, keeper], &NestConfig::default());
        assert_eq!(parts.len(), 1);
        assert!((parts[0].area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn preprocess_applies_spacing_offsets() {
        let bin = square(100.0);
        let parts = vec![square(10.0)];
        let config = NestConfig {
            spacing: 2.0,
            ..NestConfig::default()
        };

        let (bin, parts) = preprocess(&bin, &parts, &config);
        let bb = bin.bounds().unwrap();
        let pb = parts[0].bounds().unwrap();
        assert!(bb.width < 100.0 - 1e-6);
        assert!(pb.width > 10.0 + 1e-6);
    }

    #[test]
    fn session_runs_to_completion_and_reports_a_plan() {
        let bin = square(100.0);
        let parts = vec![square(10.0), square(10.0)];
        let config = NestConfig {
            population_size: 3,
            generations: 2,
            prng_seed: Some(1),
            ..NestConfig::default()
        };

        let mut session = NestingSession::new(bin, parts, config).unwrap();
        session.start(|_| {}, |_| {}).unwrap();
        session.join();

        assert!(!session.is_running());
        let plan = session.best_plan().expect("no plan produced");
        assert_eq!(plan.bins.len(), 1);
        assert!(plan.unplaced.is_empty());
    }

    #[test]
    fn stop_is_idempotent_and_reconfigure_needs_an_idle_session() {
        let bin = square(100.0);
        let parts = vec![square(10.0)];
        let mut session =
            NestingSession::new(bin.clone(), parts.clone(), NestConfig::default()).unwrap();

        session.stop();
        session.stop();
        assert!(!session.is_running());
        assert!(session.configure(bin, parts, NestConfig::default()).is_ok());
    }
}
