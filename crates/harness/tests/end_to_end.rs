use approx::assert_abs_diff_eq;
use spectrabench_harness::config::HarnessConfig;
use spectrabench_harness::report::{load_json, write_json};
use spectrabench_harness::session::BenchSession;
use spectrabench_kernels::config::Domain;
use spectrabench_timing::clock::ClockKind;
use spectrabench_timing::measurement::Metric;
use spectrabench_verifier::report::CaseOutcome;

fn config(domain: Domain, n: usize) -> HarnessConfig {
    HarnessConfig {
        time_budget_secs: 0.15,
        calibration_probe_secs: 0.05,
        calibration_size: 512,
        domains: vec![domain],
        validation_sizes: vec![n],
        sizes: vec![n],
        clock: ClockKind::Monotonic,
        ..HarnessConfig::default()
    }
}

#[test]
fn complex_1024_is_validated_then_measured() {
    let session = BenchSession::new(config(Domain::Complex, 1024)).unwrap();
    let validated = session.validate().unwrap();

    let cases: Vec<_> = validated.validation().cases_for(Domain::Complex).collect();
    assert_eq!(cases.len(), session.registry().len());
    assert!(cases
        .iter()
        .all(|case| matches!(case.outcome, CaseOutcome::Passed { .. })));

    let report = validated.benchmark().unwrap();
    assert_eq!(report.calibrations.len(), 1);
    assert_eq!(report.calibrations[0].probe_size, 512);
    assert!(report.calibrations[0].throughput > 0.0);

    for backend in session.registry().names() {
        let measurement = report
            .results
            .measurement(Domain::Complex, 1024, backend)
            .unwrap();
        let metrics = measurement.metrics().unwrap();
        assert!(metrics.iterations > 0, "{backend}");
        assert!(metrics.duration_ns_per_op > 0.0, "{backend}");
        assert!(metrics.mflops > 0.0, "{backend}");
        assert!(metrics.relative_to_fastest.unwrap() >= 1.0, "{backend}");
        assert!(metrics.relative_to_reference.is_some(), "{backend}");
    }
    let reference = report
        .results
        .get(Domain::Complex, 1024, Metric::RelativeToReference, "radix2")
        .unwrap();
    assert_abs_diff_eq!(reference, 1.0);
}

#[test]
fn real_16_is_skipped_without_rows() {
    let session = BenchSession::new(config(Domain::Real, 16)).unwrap();
    let report = session.run().unwrap();

    // Validation sweeps both domains: complex 16 is checked and passes,
    // real 16 is below the real minimum and never becomes a case.
    assert_eq!(report.validation.cases_for(Domain::Real).count(), 0);
    let complex: Vec<_> = report.validation.cases_for(Domain::Complex).collect();
    assert_eq!(complex.len(), session.registry().len());
    assert!(complex.iter().all(|case| case.size.n == 16 && case.passed()));
    assert!(report.results.sizes(Domain::Real).is_empty());
    assert!(report.results.is_empty());
    for backend in session.registry().names() {
        assert!(report.results.measurement(Domain::Real, 16, backend).is_none());
    }
}

#[test]
fn json_report_roundtrips() {
    let session = BenchSession::new(HarnessConfig {
        time_budget_secs: 0.01,
        ..config(Domain::Real, 64)
    })
    .unwrap();
    let report = session.run().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    write_json(&report, &path).unwrap();
    let loaded = load_json(&path).unwrap();
    assert_eq!(loaded.results.sizes(Domain::Real), vec![64]);
    assert_eq!(loaded.results.backends(), report.results.backends());
    assert_eq!(loaded.validation.passed(), report.validation.passed());
    for backend in session.registry().names() {
        assert_eq!(
            loaded.results.get(Domain::Real, 64, Metric::Iterations, backend),
            report.results.get(Domain::Real, 64, Metric::Iterations, backend),
        );
    }
}
