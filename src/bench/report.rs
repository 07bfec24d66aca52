//! Benchmark aggregation.
//!
//! Workers produce one `GalaxyOutcome` per galaxy; a single coordinator folds
//! them into a `BenchmarkBuilder`, and `finish()` turns the builder into an
//! immutable `BenchmarkReport`. Results are keyed by galaxy name and every
//! aggregate is computed from name-ordered (or value-sorted) data, so the
//! report does not depend on the order galaxies were fed in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::bench::relation::{RelationPoint, RelationStats, summarize};
use crate::domain::{AccelerationLaw, FitResult, MorphologyGroup};
use crate::error::ModelError;
use crate::fit::FitOptions;
use crate::math::median;
use crate::models::{DensityEstimate, DensityPhase};

/// Benchmark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub fit: FitOptions,
    /// Count galaxies with fitted rms strictly below each threshold (km/s).
    pub rms_thresholds: Vec<f64>,
    /// Count galaxies with R^2 strictly above this value.
    pub r2_threshold: f64,
    /// Also evaluate the other acceleration laws at the starting M/L.
    pub comparisons: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            fit: FitOptions {
                min_points: 3,
                ..FitOptions::default()
            },
            rms_thresholds: vec![5.0, 10.0],
            r2_threshold: 0.9,
            comparisons: true,
        }
    }
}

/// rms of a law evaluated without fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LawRms {
    pub law: AccelerationLaw,
    pub rms: f64,
    pub r_squared: Option<f64>,
}

/// Per-galaxy benchmark entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalaxyResult {
    pub name: String,
    pub hubble_type: Option<u8>,
    pub group: MorphologyGroup,
    pub n_points: usize,
    /// Outermost radius (kpc).
    pub r_max: f64,
    /// Mean of the outermost observed velocities (km/s).
    pub v_flat: f64,
    /// `V_flat^2 / a0` (kpc).
    pub r_halo: f64,
    /// Configured law at the starting M/L, no fitting.
    pub fixed: LawRms,
    pub fit: FitResult,
    /// Other laws at the starting M/L (empty unless comparisons are enabled).
    pub comparisons: Vec<LawRms>,
    /// Surface density from the fitted baryonic mass inside `r_max`; `None`
    /// when the baryonic velocity there vanishes.
    pub density: Option<DensityEstimate>,
}

/// A galaxy that could not be benchmarked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalaxyFailure {
    pub name: String,
    #[serde(serialize_with = "display_error")]
    pub error: ModelError,
}

fn display_error<S: Serializer>(err: &ModelError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// What a worker hands back for one galaxy.
#[derive(Debug, Clone)]
pub enum GalaxyOutcome {
    Success {
        result: GalaxyResult,
        relation: Vec<RelationPoint>,
    },
    Failure(GalaxyFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCount {
    pub threshold: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: MorphologyGroup,
    pub n_galaxies: usize,
    pub median_rms: Option<f64>,
    pub median_ml_disk: Option<f64>,
    pub n_r2_above: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: DensityPhase,
    pub n_galaxies: usize,
    pub median_sigma: Option<f64>,
    pub median_rms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawMedian {
    pub law: AccelerationLaw,
    pub n_galaxies: usize,
    pub median_rms: Option<f64>,
}

/// Immutable benchmark output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub law: AccelerationLaw,
    pub results: BTreeMap<String, GalaxyResult>,
    /// Sorted by galaxy name.
    pub failures: Vec<GalaxyFailure>,
    pub median_rms: Option<f64>,
    /// Median rms of the configured law at the starting M/L.
    pub median_rms_fixed: Option<f64>,
    pub rms_below: Vec<ThresholdCount>,
    pub r2_threshold: f64,
    pub n_r2_above: usize,
    pub n_r2_undefined: usize,
    pub median_ml_disk: Option<f64>,
    pub median_ml_bul: Option<f64>,
    pub n_capped: usize,
    pub groups: Vec<GroupSummary>,
    pub comparisons: Vec<LawMedian>,
    pub relation: RelationStats,
    /// Populated density phases, in phase order.
    pub phases: Vec<PhaseSummary>,
    pub n_density_undefined: usize,
}

impl BenchmarkReport {
    pub fn n_success(&self) -> usize {
        self.results.len()
    }

    pub fn n_failed(&self) -> usize {
        self.failures.len()
    }

    pub fn n_total(&self) -> usize {
        self.n_success() + self.n_failed()
    }
}

/// Accumulates galaxy outcomes.
#[derive(Debug, Clone)]
pub struct BenchmarkBuilder {
    law: AccelerationLaw,
    a0: f64,
    rms_thresholds: Vec<f64>,
    r2_threshold: f64,
    successes: BTreeMap<String, Vec<(GalaxyResult, Vec<RelationPoint>)>>,
    failures: Vec<GalaxyFailure>,
}

impl BenchmarkBuilder {
    pub fn new(config: &BenchmarkConfig) -> Self {
        Self {
            law: config.fit.law,
            a0: config.fit.initial.a0,
            rms_thresholds: config.rms_thresholds.clone(),
            r2_threshold: config.r2_threshold,
            successes: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: GalaxyOutcome) {
        match outcome {
            GalaxyOutcome::Success { result, relation } => self.push_success(result, relation),
            GalaxyOutcome::Failure(f) => self.push_failure(f.name, f.error),
        }
    }

    /// Record a successful galaxy. Name clashes are resolved in `finish`.
    pub fn push_success(&mut self, result: GalaxyResult, relation: Vec<RelationPoint>) {
        self.successes
            .entry(result.name.clone())
            .or_default()
            .push((result, relation));
    }

    pub fn push_failure(&mut self, name: String, error: ModelError) {
        self.failures.push(GalaxyFailure { name, error });
    }

    /// Build the report.
    ///
    /// A name seen more than once (successes and failures together) is
    /// ambiguous: every occurrence becomes a `DuplicateGalaxy` failure and
    /// none of them contributes to the aggregates. Failures are sorted by
    /// name, then error text.
    pub fn finish(self) -> BenchmarkReport {
        let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
        for (name, entries) in &self.successes {
            *occurrences.entry(name.as_str()).or_default() += entries.len();
        }
        for f in &self.failures {
            *occurrences.entry(f.name.as_str()).or_default() += 1;
        }
        let duplicated: Vec<(String, usize)> = occurrences
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(name, n)| (name.to_string(), n))
            .collect();

        let mut failures: Vec<GalaxyFailure> = self
            .failures
            .into_iter()
            .filter(|f| !duplicated.iter().any(|(name, _)| *name == f.name))
            .collect();
        for (name, n) in &duplicated {
            for _ in 0..*n {
                failures.push(GalaxyFailure {
                    name: name.clone(),
                    error: ModelError::DuplicateGalaxy(name.clone()),
                });
            }
        }
        failures.sort_by_cached_key(|f| (f.name.clone(), f.error.to_string()));

        let mut results: BTreeMap<String, GalaxyResult> = BTreeMap::new();
        let mut relation: BTreeMap<String, Vec<RelationPoint>> = BTreeMap::new();
        for (name, mut entries) in self.successes {
            if entries.len() != 1 || duplicated.iter().any(|(d, _)| *d == name) {
                continue;
            }
            if let Some((result, points)) = entries.pop() {
                relation.insert(name.clone(), points);
                results.insert(name, result);
            }
        }

        let rms: Vec<f64> = results.values().map(|r| r.fit.rms).collect();
        let rms_fixed: Vec<f64> = results.values().map(|r| r.fixed.rms).collect();
        let ml_disk: Vec<f64> = results.values().map(|r| r.fit.ml_disk).collect();
        let ml_bul: Vec<f64> = results.values().map(|r| r.fit.ml_bul).collect();

        let rms_below = self
            .rms_thresholds
            .iter()
            .map(|&threshold| ThresholdCount {
                threshold,
                count: rms.iter().filter(|&&v| v < threshold).count(),
            })
            .collect();

        let r2_threshold = self.r2_threshold;
        let n_r2_above = results
            .values()
            .filter(|r| r.fit.r_squared.is_some_and(|v| v > r2_threshold))
            .count();
        let n_r2_undefined = results.values().filter(|r| r.fit.r_squared.is_none()).count();
        let n_capped = results.values().filter(|r| r.fit.is_capped()).count();

        let mut by_group: BTreeMap<MorphologyGroup, Vec<&GalaxyResult>> = BTreeMap::new();
        for r in results.values() {
            by_group.entry(r.group).or_default().push(r);
        }
        let groups = by_group
            .into_iter()
            .map(|(group, members)| {
                let rms: Vec<f64> = members.iter().map(|r| r.fit.rms).collect();
                let ml: Vec<f64> = members.iter().map(|r| r.fit.ml_disk).collect();
                GroupSummary {
                    group,
                    n_galaxies: members.len(),
                    median_rms: median(&rms),
                    median_ml_disk: median(&ml),
                    n_r2_above: members
                        .iter()
                        .filter(|r| r.fit.r_squared.is_some_and(|v| v > r2_threshold))
                        .count(),
                }
            })
            .collect();

        let mut by_law: BTreeMap<AccelerationLaw, Vec<f64>> = BTreeMap::new();
        for r in results.values() {
            for c in &r.comparisons {
                by_law.entry(c.law).or_default().push(c.rms);
            }
        }
        let comparisons = by_law
            .into_iter()
            .map(|(law, values)| LawMedian {
                law,
                n_galaxies: values.len(),
                median_rms: median(&values),
            })
            .collect();

        let relation = summarize(relation.values().flatten(), self.a0);

        let mut by_phase: BTreeMap<DensityPhase, Vec<(f64, f64)>> = BTreeMap::new();
        for r in results.values() {
            if let Some(d) = &r.density {
                by_phase.entry(d.phase).or_default().push((d.sigma, r.fit.rms));
            }
        }
        let n_density_undefined = results.values().filter(|r| r.density.is_none()).count();
        let phases = by_phase
            .into_iter()
            .map(|(phase, members)| {
                let (sigma, rms): (Vec<f64>, Vec<f64>) = members.into_iter().unzip();
                PhaseSummary {
                    phase,
                    n_galaxies: sigma.len(),
                    median_sigma: median(&sigma),
                    median_rms: median(&rms),
                }
            })
            .collect();

        BenchmarkReport {
            law: self.law,
            median_rms: median(&rms),
            median_rms_fixed: median(&rms_fixed),
            rms_below,
            r2_threshold,
            n_r2_above,
            n_r2_undefined,
            median_ml_disk: median(&ml_disk),
            median_ml_bul: median(&ml_bul),
            n_capped,
            groups,
            comparisons,
            relation,
            phases,
            n_density_undefined,
            results,
            failures,
        }
    }
}
