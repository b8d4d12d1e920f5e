use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use tempfile::TempDir;

use wavecal::app::pipeline::{calibrate_lists, run_calibration, write_outputs};
use wavecal::domain::{CalibrateConfig, CalibrationParams, HeaderCorrections, Line, LineFields, LineList};
use wavecal::fit::match_lines;
use wavecal::io::{CsvLineLoader, LineListLoader, read_report_json};
use wavecal::report::LineRole;

const EPS_TRUE: f64 = -4.0e-7;

/// Standard lines every ~37 cm^-1 and a measured list scaled by `1 / (1 + EPS_TRUE)`,
/// with a few unmatched lines on both sides and one gross outlier.
fn synthetic_csv(seed: u64) -> (String, String) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 2.0e-4).unwrap();

    let mut standard = String::from("index,wavenumber\n");
    let mut measured = String::from("# wavenumber_correction = 0\nindex,wavenumber,peak,width\n");
    let mut m_index = 1;

    for i in 0..60 {
        let s = 14000.0 + 37.0 * i as f64 + rng.gen_range(0.0..5.0);
        writeln!(standard, "{},{s:.6}", i + 1).unwrap();
        if i % 15 == 7 {
            // In the standard only.
            continue;
        }
        let mut m = s / (1.0 + EPS_TRUE) + noise.sample(&mut rng);
        if i == 31 {
            m += 0.03;
        }
        let peak = if i % 10 == 3 { 12.0 } else { rng.gen_range(80.0..900.0) };
        writeln!(measured, "{m_index},{m:.6},{peak:.1},{:.1}", rng.gen_range(60.0..120.0)).unwrap();
        m_index += 1;

        if i % 20 == 11 {
            // In the experiment only, halfway to the next standard line.
            writeln!(measured, "{m_index},{:.6},300.0,90.0", m + 18.0).unwrap();
            m_index += 1;
        }
    }
    (measured, standard)
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn config(dir: &Path, list: PathBuf, standard: PathBuf) -> CalibrateConfig {
    CalibrateConfig {
        list_path: list,
        standard_path: standard,
        output: dir.join("fe.run"),
        params: CalibrationParams::default(),
        dry_run: false,
    }
}

#[test]
fn calibrates_files_and_writes_outputs() {
    let dir = TempDir::new().unwrap();
    let (measured, standard) = synthetic_csv(11);
    let list_path = write(dir.path(), "fe.csv", &measured);
    let std_path = write(dir.path(), "std.csv", &standard);
    let config = config(dir.path(), list_path, std_path);

    let run = run_calibration(&CsvLineLoader, &config).unwrap();
    let report = &run.report;

    assert!((report.epsilon - EPS_TRUE).abs() < 3.0e-8, "epsilon = {}", report.epsilon);
    assert!(report.uncertainty > 0.0 && report.uncertainty < 1.0e-7);
    assert_eq!(report.lines.len(), run.session.list().len());
    assert!(report.fitted >= 2);
    assert!(report.discarded >= 1);
    assert_eq!(report.history.last().unwrap().lines_removed, 0);
    assert!(
        report
            .discarded_lines()
            .any(|l| l.residual.is_some_and(|r| r.abs() > 1.0e-6)),
        "the shifted line should be rejected"
    );
    assert!(report.lines.iter().any(|l| l.role == LineRole::Unmatched));
    assert!(report.lines.iter().any(|l| l.role == LineRole::Weak));

    let paths = write_outputs(&run, &config.output).unwrap();
    assert!(paths.list.ends_with("fe.run.cal.csv"));

    let reloaded = CsvLineLoader.load_uncalibrated(&paths.list).unwrap();
    assert_eq!(reloaded.len(), run.calibrated.len());
    assert!((reloaded.corrections().wavenumber - report.wavenumber_correction).abs() < 1e-12);

    let json = read_report_json(&paths.report).unwrap();
    assert_eq!(json.lines.len(), report.lines.len());
    assert_eq!(json.fitted, report.fitted);
    assert_eq!(json.history.len(), report.history.len());
    assert!((json.epsilon - report.epsilon).abs() <= 1e-12 * report.epsilon.abs());
}

#[test]
fn recalibrating_a_calibrated_list_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let (measured, standard) = synthetic_csv(5);
    let list_path = write(dir.path(), "fe.csv", &measured);
    let std_path = write(dir.path(), "std.csv", &standard);
    let config = config(dir.path(), list_path, std_path.clone());

    let first = run_calibration(&CsvLineLoader, &config).unwrap();
    let paths = write_outputs(&first, &config.output).unwrap();

    let second_config = CalibrateConfig {
        list_path: paths.list,
        ..self::config(dir.path(), PathBuf::new(), std_path)
    };
    let second = run_calibration(&CsvLineLoader, &second_config).unwrap();

    // Left over: rounding of the written wavenumbers and any change in the rejected set.
    assert!(second.report.epsilon.abs() < 2.0e-8, "epsilon = {}", second.report.epsilon);
    assert!(
        (second.report.wavenumber_correction - first.report.wavenumber_correction).abs() < 2.0e-8
    );
}

#[test]
fn invalid_parameters_fail_before_loading() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path(), dir.path().join("missing.csv"), dir.path().join("missing_std.csv"));
    config.params.discard_multiplier = -1.0;

    let err = run_calibration(&CsvLineLoader, &config).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn missing_input_is_a_load_failure() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), dir.path().join("missing.csv"), dir.path().join("missing_std.csv"));
    assert_eq!(run_calibration(&CsvLineLoader, &config).unwrap_err().exit_code(), 3);
}

#[test]
fn disjoint_lists_are_a_calibration_failure() {
    let dir = TempDir::new().unwrap();
    let list_path = write(dir.path(), "a.csv", "index,wavenumber,peak\n1,100.0,500\n2,200.0,500\n");
    let std_path = write(dir.path(), "b.csv", "index,wavenumber\n1,300.0\n2,400.0\n");
    let config = config(dir.path(), list_path, std_path);

    let err = run_calibration(&CsvLineLoader, &config).unwrap_err();
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("overlap"));
}

fn random_list(rng: &mut StdRng, n: usize, name: &str) -> LineList {
    let mut w = 1000.0;
    let lines = (0..n)
        .map(|i| {
            w += rng.gen_range(0.01..0.5);
            Line::new(
                LineFields {
                    index: i as i32 + 1,
                    wavenumber: w,
                    peak: 100.0,
                    width: 80.0,
                    ..Default::default()
                },
                HeaderCorrections::default(),
                name,
            )
            .unwrap()
        })
        .collect();
    LineList::new(name, HeaderCorrections::default(), lines)
}

#[test]
fn matcher_pairs_are_ordered_unique_and_within_tolerance() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..50 {
        let a = random_list(&mut rng, 40, "a");
        let b = random_list(&mut rng, 35, "b");
        let tolerance = rng.gen_range(0.01..0.2);

        let Ok(pairs) = match_lines(a.lines(), b.lines(), tolerance) else {
            continue;
        };
        for w in pairs.windows(2) {
            assert!(w[0].list < w[1].list);
            assert!(w[0].standard < w[1].standard);
        }
        for p in &pairs {
            let d = a.lines()[p.list].wavenumber() - b.lines()[p.standard].wavenumber();
            assert!(d.abs() < tolerance);
        }
    }
}

#[test]
fn in_memory_lists_calibrate_without_files() {
    let standard: Vec<(f64, f64)> = (0..12).map(|i| (20000.0 + 50.0 * i as f64, 400.0)).collect();
    let build = |name: &str, scale: f64, jittered: bool| {
        let lines = standard
            .iter()
            .enumerate()
            .map(|(i, &(w, peak))| {
                // Alternate a small offset so the residual scatter is non-zero.
                let jitter = match (jittered, i % 2) {
                    (false, _) => 0.0,
                    (true, 0) => 1.0e-4,
                    (true, _) => -1.0e-4,
                };
                Line::new(
                    LineFields {
                        index: i as i32 + 1,
                        wavenumber: w * scale + jitter,
                        peak,
                        width: 75.0,
                        ..Default::default()
                    },
                    HeaderCorrections::default(),
                    name,
                )
                .unwrap()
            })
            .collect();
        LineList::new(name, HeaderCorrections::default(), lines)
    };

    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), PathBuf::new(), PathBuf::new());
    let run = calibrate_lists(build("m", 1.0 / (1.0 + 1.0e-6), true), build("s", 1.0, false), &config).unwrap();
    assert!((run.report.epsilon - 1.0e-6).abs() < 1.0e-8);
    assert_eq!(run.report.matched, 12);
}
