//! Scenario registry, selection, and batch execution.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use regex::Regex;
use serde::Serialize;

use crate::core::config::{Config, FilterConfig};
use crate::core::errors::{HarnessError, Result};
use crate::harness::combinatorial::{Combination, Dimension, combinations};
use crate::harness::scenario::{Scenario, ScenarioBuilder, expanded_name};
use crate::harness::sequencer::{ScenarioReport, Sequencer};
use crate::logger::sink::ResultSink;

/// Adds steps to a pre-filled builder and builds the scenario.
///
/// Called once per run (and per variation), so every run gets fresh step
/// state.
pub type ScenarioFactory = Box<dyn Fn(ScenarioBuilder) -> Scenario>;

/// One expansion of a registration.
struct Variant {
    label: String,
    combination: Option<Combination>,
}

struct Registration {
    name: String,
    area: String,
    priority: u32,
    variants: Vec<Variant>,
    factory: ScenarioFactory,
}

impl Registration {
    fn info(&self, variant: Option<&Variant>) -> ScenarioInfo {
        let label = variant.map(|v| v.label.as_str());
        ScenarioInfo {
            name: expanded_name(&self.name, label),
            base_name: self.name.clone(),
            area: self.area.clone(),
            priority: self.priority,
            variation: label.map(str::to_string),
        }
    }

    fn expand(&self) -> Vec<(Option<&Variant>, ScenarioInfo)> {
        if self.variants.is_empty() {
            vec![(None, self.info(None))]
        } else {
            self.variants
                .iter()
                .map(|v| (Some(v), self.info(Some(v))))
                .collect()
        }
    }

    fn instantiate(&self, variant: Option<&Variant>) -> Scenario {
        let builder = Scenario::builder(&self.name)
            .area(&self.area)
            .priority(self.priority)
            .variation(variant.map(|v| v.label.clone()))
            .combination(variant.and_then(|v| v.combination.clone()));
        (self.factory)(builder)
    }
}

/// Listing entry for one runnable scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub base_name: String,
    pub area: String,
    pub priority: u32,
    pub variation: Option<String>,
}

// ──────────────────── filter ────────────────────

/// Priority, area, and name selection.
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    pub max_priority: Option<u32>,
    pub area: Option<String>,
    pub name: Option<Regex>,
}

impl ScenarioFilter {
    pub fn from_config(cfg: &FilterConfig) -> Result<Self> {
        let name = cfg
            .name_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| HarnessError::InvalidConfig {
                    details: format!("filter.name_pattern: {e}"),
                })
            })
            .transpose()?;
        Ok(Self {
            max_priority: cfg.max_priority,
            area: cfg.area.clone(),
            name,
        })
    }

    #[must_use]
    pub fn matches(&self, info: &ScenarioInfo) -> bool {
        if self.max_priority.is_some_and(|max| info.priority > max) {
            return false;
        }
        if let Some(area) = &self.area
            && !info.area.starts_with(area.as_str())
        {
            return false;
        }
        self.name.as_ref().is_none_or(|re| re.is_match(&info.name))
    }
}

// ──────────────────── report ────────────────────

/// Outcome of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub config_hash: String,
    pub selected: usize,
    pub passed: usize,
    pub failed: usize,
    /// Interrupted before every selected scenario ran.
    pub cancelled: bool,
    /// Stopped after a failure because `continue_after_failure` is off.
    pub stopped_early: bool,
    pub duration_ms: u64,
    pub results: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// True when every selected scenario ran and passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.passed == self.selected
    }
}

// ──────────────────── suite ────────────────────

/// Ordered collection of scenario registrations.
#[derive(Default)]
pub struct Suite {
    registrations: Vec<Registration>,
}

impl Suite {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scenario without variations.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        area: impl Into<String>,
        priority: u32,
        factory: impl Fn(ScenarioBuilder) -> Scenario + 'static,
    ) {
        self.register_variations(name, area, priority, Vec::<String>::new(), factory);
    }

    /// Register a scenario expanded once per variation as `name(variation)`.
    pub fn register_variations<I, S>(
        &mut self,
        name: impl Into<String>,
        area: impl Into<String>,
        priority: u32,
        variations: I,
        factory: impl Fn(ScenarioBuilder) -> Scenario + 'static,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants = variations
            .into_iter()
            .map(|v| Variant {
                label: v.into(),
                combination: None,
            })
            .collect();
        self.push(name.into(), area.into(), priority, variants, Box::new(factory));
    }

    /// Register a scenario expanded once per combination of `dimensions`,
    /// named `name(v1,v2,...)`.
    ///
    /// Dimensions without values produce no scenarios.
    pub fn register_combinations(
        &mut self,
        name: impl Into<String>,
        area: impl Into<String>,
        priority: u32,
        dimensions: &[Dimension],
        factory: impl Fn(ScenarioBuilder) -> Scenario + 'static,
    ) {
        let variants = combinations(dimensions)
            .into_iter()
            .map(|c| Variant {
                label: c.label(),
                combination: Some(c),
            })
            .collect::<Vec<_>>();
        if variants.is_empty() {
            return;
        }
        self.push(name.into(), area.into(), priority, variants, Box::new(factory));
    }

    fn push(
        &mut self,
        name: String,
        area: String,
        priority: u32,
        variants: Vec<Variant>,
        factory: ScenarioFactory,
    ) {
        self.registrations.push(Registration {
            name,
            area,
            priority,
            variants,
            factory,
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Expanded scenarios accepted by `filter`, in registration order.
    #[must_use]
    pub fn list(&self, filter: &ScenarioFilter) -> Vec<ScenarioInfo> {
        self.selected(filter)
            .into_iter()
            .map(|(_, _, info)| info)
            .collect()
    }

    fn selected(
        &self,
        filter: &ScenarioFilter,
    ) -> Vec<(&Registration, Option<&Variant>, ScenarioInfo)> {
        self.registrations
            .iter()
            .flat_map(|reg| {
                reg.expand()
                    .into_iter()
                    .map(move |(variant, info)| (reg, variant, info))
            })
            .filter(|(_, _, info)| filter.matches(info))
            .collect()
    }

    /// Run every scenario selected by `config.filter`.
    ///
    /// `cancel` is polled between scenarios; a scenario already in progress
    /// always finishes.
    pub fn run(
        &self,
        config: &Config,
        sink: &mut dyn ResultSink,
        cancel: Option<&AtomicBool>,
    ) -> Result<SuiteReport> {
        let filter = ScenarioFilter::from_config(&config.filter)?;
        let selected = self.selected(&filter);
        let config_hash = config.stable_hash()?;
        let sequencer = Sequencer::new(config);

        sink.begin_batch(&config_hash, selected.len());
        let started = Instant::now();
        let mut report = SuiteReport {
            config_hash,
            selected: selected.len(),
            passed: 0,
            failed: 0,
            cancelled: false,
            stopped_early: false,
            duration_ms: 0,
            results: Vec::with_capacity(selected.len()),
        };

        for (reg, variant, _) in selected {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                report.cancelled = true;
                break;
            }
            let mut scenario = reg.instantiate(variant);
            let result = sequencer.execute(&mut scenario, sink)?;
            let passed = result.passed();
            if passed {
                report.passed += 1;
            } else {
                report.failed += 1;
            }
            report.results.push(result);
            if !passed && !config.runner.continue_after_failure {
                report.stopped_early = true;
                break;
            }
        }

        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        sink.end_batch(report.passed, report.failed);
        Ok(report)
    }
}
