use approx::assert_relative_eq;
use fitcurves::{AggregateCurve, Field, RaggedPolicy, ReportError, RunRecord, SeriesCollection, bin_sum};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn trace(rng: &mut StdRng, tags: u64) -> Vec<RunRecord> {
    let mut best = 100.0f64;
    (0..tags)
        .map(|tag| {
            let challenger = rng.random_range(0.0..100.0);
            best = best.min(challenger);
            RunRecord {
                label: tag.to_string(),
                tag: tag * 10,
                running_best: best,
                challenger,
            }
        })
        .collect()
}

#[test]
fn binning_keeps_bucket_count_and_total() {
    let mut rng = seeded_rng(0xC0FFEE);
    for (n, buckets) in [(100usize, 10usize), (300, 100), (12, 4), (7, 7), (8, 1)] {
        let values: Vec<f64> = (0..n).map(|_| rng.random_range(-5.0..5.0)).collect();
        let binned = bin_sum(&values, buckets).unwrap();
        assert_eq!(binned.len(), buckets, "n={n} buckets={buckets}");

        let width = n / buckets;
        for (i, bucket) in binned.iter().enumerate() {
            let expected: f64 = values[i * width..(i + 1) * width].iter().sum();
            assert_relative_eq!(*bucket, expected, epsilon = 1e-12);
        }

        let total_in: f64 = values.iter().sum();
        let total_out: f64 = binned.iter().sum();
        assert_relative_eq!(total_in, total_out, epsilon = 1e-9);
    }
}

#[test]
fn uneven_bucket_count_is_an_error() {
    let err = bin_sum(&[1.0; 250], 100).unwrap_err();
    assert!(matches!(err, ReportError::UnevenBins { len: 250, buckets: 100 }));
}

#[test]
fn insertion_order_does_not_change_binned_curve() {
    let mut rng = seeded_rng(0xC0FFEE + 1);
    let runs: Vec<Vec<RunRecord>> = (0..3).map(|_| trace(&mut rng, 200)).collect();

    let mut ascending = SeriesCollection::new();
    let mut shuffled = SeriesCollection::new();
    for run in &runs {
        ascending.add_run(run);
        let mut scrambled = run.clone();
        scrambled.shuffle(&mut rng);
        shuffled.add_run(&scrambled);
    }

    let curve_a = AggregateCurve::from_series(&ascending, Field::RunningBest, RaggedPolicy::Reject)
        .unwrap()
        .binned(20)
        .unwrap();
    let curve_b = AggregateCurve::from_series(&shuffled, Field::RunningBest, RaggedPolicy::Reject)
        .unwrap()
        .binned(20)
        .unwrap();
    assert_eq!(curve_a, curve_b);
    assert_eq!(curve_a.len(), 20);

    // First bucket covers tags 0..100 step 10.
    assert_relative_eq!(curve_a.points[0].x, (0..10).map(|t| t as f64 * 10.0).sum::<f64>());
}

#[test]
fn binned_mean_total_matches_raw_mean_total() {
    let mut rng = seeded_rng(0xC0FFEE + 2);
    let mut series = SeriesCollection::new();
    for _ in 0..4 {
        series.add_run(&trace(&mut rng, 120));
    }

    let raw = AggregateCurve::from_series(&series, Field::Challenger, RaggedPolicy::Reject).unwrap();
    let binned = raw.binned(12).unwrap();

    let raw_total: f64 = raw.points.iter().map(|p| p.mean).sum();
    let binned_total: f64 = binned.points.iter().map(|p| p.mean).sum();
    assert_relative_eq!(raw_total, binned_total, epsilon = 1e-9);
    assert!(binned.points.iter().all(|p| p.runs == 4));
}
