//! Result table indexed by `[domain][size][metric][backend]`.

use serde::{Deserialize, Serialize};
use spectrabench_kernels::config::Domain;
use spectrabench_timing::measurement::{Measurement, Metric};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    backends: Vec<String>,
    cells: BTreeMap<Domain, BTreeMap<usize, Vec<Measurement>>>,
}

impl ResultTable {
    /// An empty table whose backend axis follows `backends`.
    pub fn new(backends: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            backends: backends.into_iter().map(Into::into).collect(),
            cells: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, measurement: Measurement) {
        if !self.backends.contains(&measurement.backend) {
            self.backends.push(measurement.backend.clone());
        }
        let row = self
            .cells
            .entry(measurement.size.domain)
            .or_default()
            .entry(measurement.size.n)
            .or_default();
        match row.iter_mut().find(|m| m.backend == measurement.backend) {
            Some(existing) => *existing = measurement,
            None => row.push(measurement),
        }
    }

    pub fn extend(&mut self, measurements: impl IntoIterator<Item = Measurement>) {
        for measurement in measurements {
            self.insert(measurement);
        }
    }

    pub fn backends(&self) -> &[String] {
        &self.backends
    }

    pub fn domains(&self) -> impl Iterator<Item = Domain> + '_ {
        self.cells.keys().copied()
    }

    pub fn sizes(&self, domain: Domain) -> Vec<usize> {
        self.cells
            .get(&domain)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn measurement(&self, domain: Domain, n: usize, backend: &str) -> Option<&Measurement> {
        self.cells
            .get(&domain)?
            .get(&n)?
            .iter()
            .find(|m| m.backend == backend)
    }

    /// `None` for a missing or not-applicable cell.
    pub fn get(&self, domain: Domain, n: usize, metric: Metric, backend: &str) -> Option<f64> {
        self.measurement(domain, n, backend)?.value(metric)
    }

    /// Measurements for `domain`, ascending by size, backend-axis order
    /// within a size.
    pub fn rows(&self, domain: Domain) -> Vec<&Measurement> {
        let Some(rows) = self.cells.get(&domain) else {
            return Vec::new();
        };
        rows.values()
            .flat_map(|row| {
                self.backends
                    .iter()
                    .filter_map(move |name| row.iter().find(|m| &m.backend == name))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells
            .values()
            .flat_map(|rows| rows.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectrabench_kernels::config::ProblemSize;
    use spectrabench_timing::measurement::Metrics;

    fn measured(backend: &str, size: ProblemSize, mflops: f64) -> Measurement {
        Measurement::measured(
            backend,
            size,
            Metrics {
                prep_time_ms: 0.0,
                duration_ns_per_op: 1.0,
                iterations: 1,
                mflops,
                total_duration_sec: 0.1,
                relative_to_fastest: Some(1.0),
                relative_to_reference: None,
            },
        )
    }

    #[test]
    fn lookup_by_domain_size_metric_backend() {
        let mut table = ResultTable::new(["scalar", "radix2"]);
        table.insert(measured("radix2", ProblemSize::complex(64), 900.0));
        table.insert(measured("scalar", ProblemSize::complex(64), 100.0));
        table.insert(Measurement::not_applicable(
            "radix2",
            ProblemSize::complex(96),
            "not a power of two",
        ));

        assert_eq!(table.get(Domain::Complex, 64, Metric::Mflops, "radix2"), Some(900.0));
        assert_eq!(table.get(Domain::Complex, 96, Metric::Mflops, "radix2"), None);
        assert_eq!(table.get(Domain::Real, 64, Metric::Mflops, "radix2"), None);
        assert_eq!(table.sizes(Domain::Complex), vec![64, 96]);

        let order: Vec<_> = table
            .rows(Domain::Complex)
            .iter()
            .map(|m| m.backend.as_str())
            .collect();
        assert_eq!(order, vec!["scalar", "radix2", "radix2"]);
    }

    #[test]
    fn reinserting_a_cell_replaces_it() {
        let mut table = ResultTable::default();
        table.insert(measured("rustfft", ProblemSize::real(32), 1.0));
        table.insert(measured("rustfft", ProblemSize::real(32), 2.0));
        assert_eq!(table.len(), 1);
        assert_eq!(table.backends(), &["rustfft".to_string()]);
        assert_eq!(table.get(Domain::Real, 32, Metric::Mflops, "rustfft"), Some(2.0));
    }
}
