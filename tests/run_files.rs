use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use fitcurves::aggregate::{AggregateCurve, RaggedPolicy};
use fitcurves::error::ReportError;
use fitcurves::series::{Field, SeriesCollection, matching_files};

fn unique_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "fitcurves_run_files_{}_{}",
        name,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write run file");
}

#[test]
fn two_run_fixture_aggregates_per_tag() {
    let dir = unique_dir("fixture");
    write(&dir, "output_b_r1.csv", "0,0,1.0,1.0\n1,1,0.5,0.6\n");
    write(&dir, "output_b_r2.csv", "0,0,1.2,1.1\n1,1,0.4,0.5\n");

    let series = SeriesCollection::load(&dir, "output_b_r?.csv").unwrap();
    assert_eq!(series.shape(), (2, 2));

    let curve = AggregateCurve::from_series(&series, Field::RunningBest, RaggedPolicy::Reject)
        .unwrap();
    assert_eq!(curve.len(), 2);
    assert_relative_eq!(curve.points[0].x, 0.0);
    assert_relative_eq!(curve.points[0].mean, 1.1, epsilon = 1e-12);
    assert_relative_eq!(curve.points[0].std, 0.1, epsilon = 1e-12);
    assert_relative_eq!(curve.points[1].x, 1.0);
    assert_relative_eq!(curve.points[1].mean, 0.45, epsilon = 1e-12);
    assert_relative_eq!(curve.points[1].std, 0.05, epsilon = 1e-12);
    assert_eq!(curve.points[1].runs, 2);

    let challenger =
        AggregateCurve::from_series(&series, Field::Challenger, RaggedPolicy::Reject).unwrap();
    assert_relative_eq!(challenger.points[0].mean, 1.05, epsilon = 1e-12);
    assert_relative_eq!(challenger.points[1].mean, 0.55, epsilon = 1e-12);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn runs_follow_sorted_file_names() {
    let dir = unique_dir("order");
    write(&dir, "output_b_r2.csv", "0,0,2.0,2.0\n");
    write(&dir, "output_b_r1.csv", "0,0,1.0,1.0\n");

    let series = SeriesCollection::load(&dir, "output_b_r?.csv").unwrap();
    let runs = series.per_run(Field::RunningBest);
    assert_eq!(runs, vec![vec![(0, 1.0)], vec![(0, 2.0)]]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn pattern_selects_only_its_file_family() {
    let dir = unique_dir("glob");
    for name in [
        "output_b_r1.csv",
        "output_b_r2.csv",
        "output_b_r10.csv",
        "output_g_r1.csv",
        "output_b_h1.csv",
        "notes.txt",
    ] {
        write(&dir, name, "0,0,1.0,1.0\n");
    }
    fs::create_dir_all(dir.join("output_b_r3.csv")).unwrap();

    let names: Vec<String> = matching_files(&dir, "output_b_r?.csv")
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["output_b_r1.csv", "output_b_r2.csv"]);

    let all_bronze = matching_files(&dir, "output_b_*.csv").unwrap();
    assert_eq!(all_bronze.len(), 4);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn zero_matching_files_gives_empty_collection() {
    let dir = unique_dir("empty");
    write(&dir, "output_b_r1.csv", "0,0,1.0,1.0\n");

    let series = SeriesCollection::load(&dir, "output_g_e?.csv").unwrap();
    assert!(series.is_empty());
    assert_eq!(series.shape(), (0, 0));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn blank_line_ends_each_file() {
    let dir = unique_dir("sentinel");
    write(
        &dir,
        "output_b_h1.csv",
        "0, 0, 3.0, 3.0, (x)\n1, 1, 2.0, 2.5, (x + 1)\n\nnot,a,data,row\n",
    );

    let series = SeriesCollection::load(&dir, "output_b_h?.csv").unwrap();
    assert_eq!(series.tags().collect::<Vec<_>>(), vec![0, 1]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn malformed_row_names_the_file() {
    let dir = unique_dir("malformed");
    write(&dir, "output_b_e1.csv", "0,0,1.0,1.0\n1,1,fast,0.5\n");

    let err = SeriesCollection::load(&dir, "output_b_e?.csv").unwrap_err();
    match &err {
        ReportError::Malformed { path, line, .. } => {
            assert!(path.ends_with("output_b_e1.csv"));
            assert_eq!(*line, 2);
        }
        other => panic!("expected Malformed, got {other:?}"),
    }
    assert!(err.to_string().contains("running_best \"fast\""));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invalid_pattern_is_reported() {
    let dir = unique_dir("pattern");
    let err = SeriesCollection::load(&dir, "output_[b.csv").unwrap_err();
    assert!(matches!(err, ReportError::Pattern { .. }), "{err:?}");
    let _ = fs::remove_dir_all(&dir);
}
