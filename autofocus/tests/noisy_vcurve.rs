//! Focus runs against a noisy synthetic V-curve with dropouts far from focus.

use autofocus::{from_fn, FocusConfig, FocusSearchEngine, Sample};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const TRUE_FOCUS: i32 = 6230;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// FWHM grows 1 px per 500 steps of defocus; beyond 1200 steps the star is too
/// diffuse for detection and every frame is a dropout.
fn noisy_measurement(rng: &mut ChaCha8Rng, position: i32) -> Sample {
    let defocus = (position - TRUE_FOCUS).abs();
    if defocus > 1200 {
        return Sample::no_signal(position);
    }
    let noise = rng.random_range(-0.05..0.05);
    Sample::measured(position, 2.0 + f64::from(defocus) / 500.0 + noise)
}

#[test]
fn test_standard_run_converges_near_true_focus() {
    init_logging();

    for seed in 0..20 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut source = from_fn(|p| Ok(noisy_measurement(&mut rng, p)));
        let mut engine = FocusSearchEngine::new(FocusConfig::default()).unwrap();

        let report = engine.focus_at_point(6000, &mut source).unwrap();

        assert!(
            (report.optimum - TRUE_FOCUS).abs() <= 100,
            "seed {seed}: optimum {} too far from {TRUE_FOCUS}",
            report.optimum
        );
        // 7 coarse positions plus at most 2 new ones in each refinement pass
        assert!(report.rows.len() <= 11, "seed {seed}: {} rows", report.rows.len());

        let dropouts: Vec<i32> = report
            .rows
            .iter()
            .filter(|r| r.invalid_count == r.sample_count)
            .map(|r| r.focus_position)
            .collect();
        assert_eq!(dropouts, vec![4500, 5000, 7500], "seed {seed}");
        assert_ne!(report.optimum, 4500);
    }
}

#[test]
fn test_engine_is_reusable_across_runs() {
    init_logging();

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut source = from_fn(|p| Ok(noisy_measurement(&mut rng, p)));
    let mut engine = FocusSearchEngine::new(FocusConfig::default()).unwrap();

    let first = engine.focus_at_point(6000, &mut source).unwrap();
    let second = engine.focus_at_point(first.optimum, &mut source).unwrap();

    // second run starts fresh: its coarse grid is centred on the first optimum
    assert_eq!(second.rows[0].focus_position, first.optimum - 1500);
    assert!((second.optimum - TRUE_FOCUS).abs() <= 100);
}
