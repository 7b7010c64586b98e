//! Presentation: console tables, CSV export and JSON dumps.

use crate::aggregate::ResultTable;
use crate::session::SessionReport;
use anyhow::{Context, Result};
use spectrabench_kernels::config::{Domain, SizeSet};
use spectrabench_timing::measurement::Metric;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const CELL_WIDTH: usize = 14;

/// MFlops table with one row per size and one column per (domain, backend).
pub fn render_table(table: &ResultTable, domains: &[Domain]) -> String {
    let mut out = String::new();
    let columns: Vec<(Domain, &str)> = domains
        .iter()
        .flat_map(|&domain| table.backends().iter().map(move |b| (domain, b.as_str())))
        .collect();

    out.push_str("| input len ");
    for (domain, backend) in &columns {
        let _ = write!(out, "|{:^width$}", format!("{} {}", domain, backend), width = CELL_WIDTH);
    }
    out.push_str("|\n|----------");
    for _ in &columns {
        let _ = write!(out, ":|{}", "-".repeat(CELL_WIDTH - 1));
    }
    out.push_str(":|\n");

    let mut sizes: Vec<usize> = domains.iter().flat_map(|&d| table.sizes(d)).collect();
    sizes.sort_unstable();
    sizes.dedup();
    for n in sizes {
        let _ = write!(out, "|{:>9}  ", n);
        for (domain, backend) in &columns {
            match table.get(*domain, n, Metric::Mflops, backend) {
                Some(mflops) => {
                    let _ = write!(out, "|{:>11.0}   ", mflops);
                }
                None => out.push_str("|      n/a     "),
            }
        }
        out.push_str("|\n");
    }
    out.push_str(" (numbers are given in MFlops)\n");
    out
}

/// One line per measured cell, for `--no-tab`.
pub fn render_rows(table: &ResultTable, domain: Domain) -> String {
    let mut out = String::new();
    for measurement in table.rows(domain) {
        let Some(metrics) = measurement.metrics() else {
            continue;
        };
        let _ = write!(
            out,
            "N={:>7}, {} {:>10} : {:>8.0} MFlops [t={:>8.0} ns, {} runs, prep {:.3} ms",
            measurement.size.n,
            domain,
            measurement.backend,
            metrics.mflops,
            metrics.duration_ns_per_op,
            metrics.iterations,
            metrics.prep_time_ms,
        );
        if let Some(rel) = metrics.relative_to_fastest {
            let _ = write!(out, ", {rel:.2}x fastest");
        }
        if let Some(rel) = metrics.relative_to_reference {
            let _ = write!(out, ", {rel:.2}x reference");
        }
        out.push_str("]\n");
    }
    out
}

pub fn csv_file_name(domain: Domain, size_set: SizeSet, metric: Metric) -> String {
    format!("{}-{}-{}.csv", domain.label(), size_set.label(), metric.label())
}

/// CSV for one `(domain, metric)`: `size, log2, <backends…>`. Not-applicable
/// cells are left empty.
pub fn render_csv(table: &ResultTable, domain: Domain, metric: Metric) -> String {
    let mut out = String::from("size, log2");
    for backend in table.backends() {
        let _ = write!(out, ", {backend}");
    }
    out.push('\n');
    for n in table.sizes(domain) {
        let _ = write!(out, "{}, {:.3}", n, (n as f64).log2());
        for backend in table.backends() {
            match table.get(domain, n, metric, backend) {
                Some(value) => {
                    let _ = write!(out, ", {value:.6}");
                }
                None => out.push_str(", "),
            }
        }
        out.push('\n');
    }
    out
}

/// Write every exported metric for every measured domain into `dir`.
pub fn write_csv_files(
    table: &ResultTable,
    size_set: SizeSet,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = Vec::new();
    for domain in table.domains() {
        for metric in Metric::EXPORTED {
            let path = dir.join(csv_file_name(domain, size_set, metric));
            fs::write(&path, render_csv(table, domain, metric))
                .with_context(|| format!("writing {}", path.display()))?;
            written.push(path);
        }
    }
    Ok(written)
}

pub fn write_table_file(
    table: &ResultTable,
    domains: &[Domain],
    size_set: SizeSet,
    dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("bench-fft-table-{}.txt", size_set.label()));
    fs::write(&path, render_table(table, domains))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn write_json(report: &SessionReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_json(path: &Path) -> Result<SessionReport> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectrabench_kernels::config::ProblemSize;
    use spectrabench_timing::measurement::{Measurement, Metrics};

    fn sample_table() -> ResultTable {
        let mut table = ResultTable::new(["rustfft", "radix2"]);
        table.insert(Measurement::measured(
            "rustfft",
            ProblemSize::complex(1024),
            Metrics {
                prep_time_ms: 0.25,
                duration_ns_per_op: 2000.0,
                iterations: 75,
                mflops: 25600.0,
                total_duration_sec: 0.3,
                relative_to_fastest: Some(1.0),
                relative_to_reference: Some(0.5),
            },
        ));
        table.insert(Measurement::not_applicable(
            "radix2",
            ProblemSize::complex(1024),
            "disabled",
        ));
        table
    }

    #[test]
    fn table_marks_missing_cells() {
        let text = render_table(&sample_table(), &[Domain::Complex]);
        assert!(text.contains("|     1024  "));
        assert!(text.contains("|      25600   "));
        assert!(text.contains("|      n/a     "));
    }

    #[test]
    fn rows_skip_not_applicable_cells() {
        let text = render_rows(&sample_table(), Domain::Complex);
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("rustfft"));
        assert!(text.contains("0.50x reference"));
    }

    #[test]
    fn csv_has_size_log2_and_backend_columns() {
        let csv = render_csv(&sample_table(), Domain::Complex, Metric::Iterations);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "size, log2, rustfft, radix2");
        assert_eq!(lines[1], "1024, 10.000, 75.000000, ");
        assert_eq!(
            csv_file_name(Domain::Real, SizeSet::Composite, Metric::PrepTimeMs),
            "real-non2-prep.csv"
        );
    }

    #[test]
    fn csv_files_land_in_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_csv_files(&sample_table(), SizeSet::PowerOfTwo, dir.path()).unwrap();
        assert_eq!(written.len(), Metric::EXPORTED.len());
        assert!(dir.path().join("cplx-pow2-mflops.csv").exists());
        let table = write_table_file(
            &sample_table(),
            &[Domain::Complex],
            SizeSet::PowerOfTwo,
            dir.path(),
        )
        .unwrap();
        assert!(table.ends_with("bench-fft-table-pow2.txt"));
    }
}
