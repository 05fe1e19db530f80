use float_cmp::approx_eq;
use test_case::test_case;

use vectornest::config::NestConfig;
use vectornest::geometry::{Bounds, Point, Polygon, kernel};
use vectornest::nfp;
use vectornest::session::NestingSession;

fn square(size: f64) -> Polygon {
    Polygon::new(vec![
        Point(0.0, 0.0),
        Point(size, 0.0),
        Point(size, size),
        Point(0.0, size),
    ])
}

fn run_session(bin: Polygon, parts: Vec<Polygon>, config: NestConfig) -> NestingSession {
    let mut session = NestingSession::new(bin, parts, config).unwrap();
    session.start(|_| {}, |_| {}).unwrap();
    session.join();
    session
}

fn quick_config() -> NestConfig {
    NestConfig {
        population_size: 3,
        generations: 2,
        prng_seed: Some(7),
        ..NestConfig::default()
    }
}

#[test]
fn two_small_squares_share_one_bin() {
    let session = run_session(square(100.0), vec![square(10.0), square(10.0)], quick_config());
    let plan = session.best_plan().unwrap();

    assert_eq!(plan.bins.len(), 1);
    assert_eq!(plan.bins[0].len(), 2);
    assert!(plan.unplaced.is_empty());
    assert!(plan.fitness < 2.0);
}

#[test]
fn oversized_part_is_reported_unplaced() {
    let session = run_session(square(50.0), vec![square(100.0)], quick_config());
    let plan = session.best_plan().unwrap();

    assert!(plan.bins.is_empty());
    assert_eq!(plan.unplaced.len(), 1);
    // one bin opened plus the flat penalty for the unplaced part
    assert!(approx_eq!(f64, plan.fitness, 3.0, epsilon = 1e-9));
}

#[test]
fn container_hole_admits_a_small_part() {
    // 40x40 container with a centered 10x10 hole, 5x5 orbiter
    let mut container = square(40.0);
    let mut hole = square(10.0);
    hole.translate(15.0, 15.0);
    hole.points.reverse();
    container.holes.push(hole);
    let part = square(5.0);

    let nfp = nfp::pair_nfp(&container, &part, false, false, true).unwrap();
    let hole_loop = nfp[1..]
        .iter()
        .find(|c| {
            Bounds::of_points(c)
                .is_some_and(|b| b.x >= 15.0 - 1e-6 && b.x_max() <= 25.0 + 1e-6)
        })
        .expect("no placement locus inside the hole");
    assert!(kernel::signed_area(hole_loop) > 0.0);

    // without hole nesting the locus disappears
    let plain = nfp::pair_nfp(&container, &part, false, false, false).unwrap();
    assert_eq!(plain.len(), 1);
}

#[test]
fn seeded_run_uses_only_configured_rotation_steps() {
    let config = NestConfig {
        rotations: 4,
        ..quick_config()
    };
    // non-square parts so rotation actually matters
    let tall = Polygon::new(vec![
        Point(0.0, 0.0),
        Point(5.0, 0.0),
        Point(5.0, 30.0),
        Point(0.0, 30.0),
    ]);
    let session = run_session(square(100.0), vec![tall.clone(), tall], config);
    let plan = session.best_plan().unwrap();

    for placement in plan.bins.iter().flatten() {
        assert!(
            [0.0, 90.0, 180.0, 270.0].contains(&placement.rotation),
            "rotation {} is off-step",
            placement.rotation
        );
    }
}

#[test_case(90.0; "quarter turn")]
#[test_case(180.0; "half turn")]
#[test_case(270.0; "three quarters")]
fn rotation_roundtrip_restores_vertices(angle: f64) {
    let part = Polygon::new(vec![
        Point(1.0, 2.0),
        Point(7.0, 2.5),
        Point(5.0, 8.0),
    ]);
    let back = part.rotated(angle).rotated(360.0 - angle);
    for (a, b) in part.points.iter().zip(&back.points) {
        assert!(approx_eq!(f64, a.0, b.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, a.1, b.1, epsilon = 1e-9));
    }
}

#[test]
fn inner_nfp_keeps_the_part_inside_the_bin() {
    let bin = square(100.0);
    let part = Polygon::new(vec![
        Point(0.0, 0.0),
        Point(20.0, 0.0),
        Point(20.0, 15.0),
        Point(0.0, 15.0),
    ]);
    let ifp = nfp::pair_nfp(&bin, &part, true, false, false).unwrap();
    let bin_bounds = bin.bounds().unwrap();

    for contour in &ifp {
        for v in contour {
            // placing the reference point at v keeps every vertex inside
            let shifted = part.points.iter().map(|p| {
                Point(p.0 + v.0 - part.points[0].0, p.1 + v.1 - part.points[0].1)
            });
            for p in shifted {
                assert!(p.0 >= bin_bounds.x - 1e-6 && p.0 <= bin_bounds.x_max() + 1e-6);
                assert!(p.1 >= bin_bounds.y - 1e-6 && p.1 <= bin_bounds.y_max() + 1e-6);
            }
        }
    }
}

#[test]
fn identical_seeds_give_identical_plans() {
    let parts = || vec![square(10.0), square(12.0), square(8.0)];
    let a = run_session(square(100.0), parts(), quick_config())
        .best_plan()
        .unwrap();
    let b = run_session(square(100.0), parts(), quick_config())
        .best_plan()
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn spacing_keeps_parts_apart() {
    let config = NestConfig {
        spacing: 4.0,
        rotations: 1,
        ..quick_config()
    };
    let session = run_session(square(100.0), vec![square(10.0), square(10.0)], config);
    let plan = session.best_plan().unwrap();
    assert!(plan.unplaced.is_empty());

    let placements = &plan.bins[0];
    let dx = (placements[0].x - placements[1].x).abs();
    let dy = (placements[0].y - placements[1].y).abs();
    // inflated outlines cannot leave the originals closer than the gap
    assert!(
        dx >= 10.0 + 4.0 - 1e-6 || dy >= 10.0 + 4.0 - 1e-6,
        "parts {dx}x{dy} apart"
    );
}

#[test]
fn stop_request_ends_the_run() {
    let config = NestConfig {
        population_size: 5,
        generations: 50,
        prng_seed: Some(3),
        ..NestConfig::default()
    };
    let parts: Vec<Polygon> = (0..6).map(|_| square(10.0)).collect();
    let mut session = NestingSession::new(square(100.0), parts, config).unwrap();
    session.start(|_| {}, |_| {}).unwrap();

    session.stop();
    session.join();
    assert!(!session.is_running());
}
