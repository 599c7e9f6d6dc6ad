//! Declarative scenario manifests (TOML).
//!
//! ```toml
//! [[scenario]]
//! name = "RectangleFill"
//! area = "Shapes.Rectangle"
//! priority = 1
//! variations = [
//!     { name = "Red", properties = { Fill = { color = "Red" } } },
//!     "Plain",
//! ]
//! properties = { Fill = { color = "White" } }
//!
//! [[scenario.steps]]
//! name = "Animate"
//! action = "post"
//! after_ms = 20
//! signal = "AnimationDone"
//!
//! [[scenario.steps]]
//! name = "Wait"
//! action = "wait"
//! key = "AnimationDone"
//!
//! [[scenario.steps]]
//! name = "Verify"
//! action = "verify"
//! property = "Fill"
//! expected = { color = "Red" }
//! ```
//!
//! Instead of `variations`, a scenario may list `dimensions`; it then runs
//! once per combination of dimension values, and each value is written to the
//! dimension's property (the dimension name unless `property` is given):
//!
//! ```toml
//! dimensions = [
//!     { name = "Fill", values = [{ color = "Red" }, { color = "Blue" }] },
//!     { name = "Size", property = "Width", values = [80, 320] },
//! ]
//! ```
//!
//! Each scenario instance (each variation or combination) gets a fresh
//! [`PropertyBag`] seeded with `properties`, then the variation's overrides
//! or the combination's values, then `Variation = "<label>"`.
//!
//! Unknown keys are rejected everywhere so a misspelt field cannot silently
//! fall back to its default.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::adapters::{InputEvent, InputSimulator, PropertyBag, PropertySource};
use crate::core::errors::{HarnessError, Result};
use crate::harness::combinatorial::{Combination, Dimension, combinations};
use crate::harness::context::ScenarioContext;
use crate::harness::outcome::{StepOutcome, StepResult, TestResult};
use crate::harness::scenario::{ScenarioBuilder, Step, StepPhase, expanded_name};
use crate::harness::suite::Suite;
use crate::harness::value::{Tolerance, Value};
use crate::harness::verify::ExpectationTable;

// ──────────────────── schema ────────────────────

/// Parsed manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "scenario", default)]
    pub scenarios: Vec<ScenarioDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDef {
    pub name: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub variations: Vec<VariationDef>,
    #[serde(default)]
    pub dimensions: Vec<DimensionDef>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

/// A bare variation name or a name with property overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariationDef {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        properties: BTreeMap<String, Value>,
    },
}

impl VariationDef {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Full { name, .. } => name,
        }
    }

    fn properties(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Name(_) => None,
            Self::Full { properties, .. } => Some(properties),
        }
    }
}

/// One combinatorial axis; each value is written to `property`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionDef {
    pub name: String,
    /// Target property; defaults to the dimension name.
    pub property: Option<String>,
    pub values: Vec<Value>,
}

impl DimensionDef {
    fn property(&self) -> &str {
        self.property.as_deref().unwrap_or(&self.name)
    }

    fn value_for(&self, label: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.to_string() == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDef {
    pub name: String,
    pub phase: StepPhase,
    #[serde(flatten)]
    pub action: Action,
}

impl<'de> Deserialize<'de> for StepDef {
    // `deny_unknown_fields` does not combine with `flatten`, so the action
    // keys are collected first and then parsed strictly.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawStep {
            name: String,
            #[serde(default)]
            phase: StepPhase,
            #[serde(flatten)]
            rest: toml::Table,
        }

        let raw = RawStep::deserialize(deserializer)?;
        let action = Action::deserialize(toml::Value::Table(raw.rest))
            .map_err(|e| serde::de::Error::custom(format!("step {}: {e}", raw.name)))?;
        Ok(Self {
            name: raw.name,
            phase: raw.phase,
            action,
        })
    }
}

const fn default_result() -> TestResult {
    TestResult::Pass
}

/// What a declarative step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    /// Append a status line.
    Status { text: String },
    /// Set a property immediately.
    Set { property: String, value: Value },
    /// Send synthesized input to the element.
    Input { event: InputEvent },
    /// Schedule a callback that updates properties and/or signals a key.
    Post {
        #[serde(default)]
        after_ms: u64,
        #[serde(default)]
        set: BTreeMap<String, Value>,
        signal: Option<String>,
        #[serde(default = "default_result")]
        result: TestResult,
    },
    /// Wait for a signal; `expect` pins the required value.
    Wait {
        key: String,
        timeout_ms: Option<u64>,
        expect: Option<TestResult>,
    },
    /// Compare one property.
    Verify {
        property: String,
        expected: Value,
        #[serde(default)]
        message: String,
        /// Float and geometry tolerance override.
        tolerance: Option<f64>,
        color_tolerance: Option<u8>,
        /// A missing property raises an error instead of failing the check.
        #[serde(default)]
        required: bool,
    },
    /// Require one property to differ from `unexpected`.
    VerifyDifferent {
        property: String,
        unexpected: Value,
        #[serde(default)]
        message: String,
    },
    /// Compare several properties.
    VerifyTable {
        expect: ExpectationTable,
        #[serde(default)]
        message: String,
    },
    /// Signal `key` with the running verification result.
    SignalVerdict { key: String },
    Fail { reason: String },
    Skip { reason: String },
}

// ──────────────────── loading ────────────────────

impl Manifest {
    /// Read and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::parse(&raw, path)
    }

    /// Parse and validate manifest text; `origin` is used in error messages.
    pub fn parse(raw: &str, origin: &Path) -> Result<Self> {
        let manifest: Self = toml::from_str(raw).map_err(|e| invalid(origin, e.to_string()))?;
        manifest.validate(origin)?;
        Ok(manifest)
    }

    /// Load every file in order, rejecting duplicate scenario names across files.
    pub fn load_all(paths: &[PathBuf]) -> Result<Vec<Self>> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let manifest = Self::load(path)?;
            for name in manifest.expanded_names() {
                if !seen.insert(name.clone()) {
                    return Err(invalid(path, format!("duplicate scenario {name}")));
                }
            }
            out.push(manifest);
        }
        Ok(out)
    }

    fn expanded_names(&self) -> Vec<String> {
        self.scenarios
            .iter()
            .flat_map(|def| {
                def.labels()
                    .into_iter()
                    .map(|label| expanded_name(&def.name, label.as_deref()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn validate(&self, origin: &Path) -> Result<()> {
        let mut seen = BTreeSet::new();
        for def in &self.scenarios {
            if def.name.trim().is_empty() {
                return Err(invalid(origin, "scenario name must not be empty"));
            }
            validate_dimensions(def, origin)?;
            for step in &def.steps {
                let ctx = format!("{}/{}", def.name, step.name);
                if step.name.trim().is_empty() {
                    return Err(invalid(origin, format!("{}: step name must not be empty", def.name)));
                }
                match &step.action {
                    Action::Wait { key, .. } | Action::SignalVerdict { key } if key.is_empty() => {
                        return Err(invalid(origin, format!("{ctx}: signal key must not be empty")));
                    }
                    Action::Post { set, signal, .. } if set.is_empty() && signal.is_none() => {
                        return Err(invalid(
                            origin,
                            format!("{ctx}: post needs `set` or `signal`"),
                        ));
                    }
                    Action::VerifyTable { expect, .. } if expect.is_empty() => {
                        return Err(invalid(origin, format!("{ctx}: verify_table needs rows")));
                    }
                    Action::Verify {
                        tolerance: Some(t), ..
                    } if !t.is_finite() || *t < 0.0 => {
                        return Err(invalid(origin, format!("{ctx}: tolerance must be >= 0")));
                    }
                    _ => {}
                }
            }
        }
        for name in self.expanded_names() {
            if !seen.insert(name.clone()) {
                return Err(invalid(origin, format!("duplicate scenario {name}")));
            }
        }
        Ok(())
    }

    /// Register every scenario with `suite`.
    pub fn register(&self, suite: &mut Suite) {
        for def in &self.scenarios {
            let shared = def.clone();
            let factory = move |mut builder: ScenarioBuilder| {
                let bag =
                    shared.seed_bag(builder.current_variation(), builder.current_combination());
                for step in &shared.steps {
                    builder = builder.push(step.to_step(&bag));
                }
                builder.build()
            };
            if def.dimensions.is_empty() {
                let variations: Vec<String> =
                    def.variations.iter().map(|v| v.name().to_string()).collect();
                suite.register_variations(
                    def.name.clone(),
                    def.area.clone(),
                    def.priority,
                    variations,
                    factory,
                );
            } else {
                suite.register_combinations(
                    def.name.clone(),
                    def.area.clone(),
                    def.priority,
                    &def.axes(),
                    factory,
                );
            }
        }
    }
}

impl ScenarioDef {
    /// Dimensions with their values rendered as labels.
    fn axes(&self) -> Vec<Dimension> {
        self.dimensions
            .iter()
            .map(|d| Dimension::new(d.name.clone(), d.values.iter().map(ToString::to_string)))
            .collect()
    }

    /// Variation labels in run order; `None` for a plain scenario.
    fn labels(&self) -> Vec<Option<String>> {
        if !self.dimensions.is_empty() {
            combinations(&self.axes())
                .iter()
                .map(|c| Some(c.label()))
                .collect()
        } else if self.variations.is_empty() {
            vec![None]
        } else {
            self.variations
                .iter()
                .map(|v| Some(v.name().to_string()))
                .collect()
        }
    }

    fn seed_bag(&self, variation: Option<&str>, combination: Option<&Combination>) -> PropertyBag {
        let bag = PropertyBag::with_values(self.properties.clone());
        if let Some(combination) = combination {
            for (dimension, label) in combination.iter() {
                let def = self.dimensions.iter().find(|d| d.name == dimension);
                if let Some((def, value)) = def.and_then(|d| d.value_for(label).map(|v| (d, v))) {
                    bag.set_value(def.property(), value.clone());
                }
            }
        } else if let Some(name) = variation {
            let overrides = self
                .variations
                .iter()
                .find(|v| v.name() == name)
                .and_then(VariationDef::properties);
            for (k, v) in overrides.into_iter().flatten() {
                bag.set_value(k.clone(), v.clone());
            }
        }
        if let Some(name) = variation {
            bag.set_value("Variation", name);
        }
        bag
    }
}

fn validate_dimensions(def: &ScenarioDef, origin: &Path) -> Result<()> {
    if def.dimensions.is_empty() {
        return Ok(());
    }
    if !def.variations.is_empty() {
        return Err(invalid(
            origin,
            format!("{}: use either `variations` or `dimensions`, not both", def.name),
        ));
    }
    let mut names = BTreeSet::new();
    for dim in &def.dimensions {
        let ctx = format!("{}/{}", def.name, dim.name);
        if dim.name.trim().is_empty() {
            return Err(invalid(origin, format!("{}: dimension name must not be empty", def.name)));
        }
        if !names.insert(dim.name.as_str()) {
            return Err(invalid(origin, format!("{}: duplicate dimension {}", def.name, dim.name)));
        }
        if dim.values.is_empty() {
            return Err(invalid(origin, format!("{ctx}: dimension needs values")));
        }
        let mut labels = BTreeSet::new();
        for value in &dim.values {
            if !labels.insert(value.to_string()) {
                return Err(invalid(origin, format!("{ctx}: duplicate value {value}")));
            }
        }
    }
    Ok(())
}

impl StepDef {
    fn to_step(&self, bag: &PropertyBag) -> Step {
        let action = self.action.clone();
        let bag = bag.clone();
        Step::new(self.name.clone(), self.phase, move |ctx| {
            run_action(&action, &bag, ctx)
        })
    }
}

fn invalid(path: &Path, details: impl Into<String>) -> HarnessError {
    HarnessError::InvalidManifest {
        path: path.to_path_buf(),
        details: details.into(),
    }
}

// ──────────────────── execution ────────────────────

fn run_action(action: &Action, bag: &PropertyBag, ctx: &mut ScenarioContext) -> StepResult {
    match action {
        Action::Status { text } => ctx.status(text.clone()),
        Action::Set { property, value } => {
            ctx.debug(format!("set {property} = {value}"));
            bag.set_value(property.clone(), value.clone());
        }
        Action::Input { event } => {
            ctx.debug(format!("input {event:?}"));
            bag.send_input(event.clone());
        }
        Action::Post {
            after_ms,
            set,
            signal,
            result,
        } => {
            let (target, handle) = (bag.clone(), ctx.handle());
            let (set, signal, result) = (set.clone(), signal.clone(), *result);
            ctx.debug(format!("post callback in {after_ms}ms"));
            ctx.post_after(Duration::from_millis(*after_ms), move || {
                for (k, v) in set {
                    target.set_value(k, v);
                }
                if let Some(key) = signal {
                    handle.signal(key, result);
                }
            });
        }
        Action::Wait {
            key,
            timeout_ms,
            expect,
        } => {
            let timeout = timeout_ms.map_or(ctx.settings().default_wait, Duration::from_millis);
            let got = ctx.wait(key, timeout)?;
            return Ok(match expect {
                Some(want) => StepOutcome::check(
                    got == *want,
                    format!("signal {key} reported {got}, expected {want}"),
                ),
                None => StepOutcome::from_signal(key, got),
            });
        }
        Action::Verify {
            property,
            expected,
            message,
            tolerance,
            color_tolerance,
            required,
        } => {
            if *required {
                bag.require(property)?;
            }
            let base = ctx.settings().tolerance;
            let tol = Tolerance {
                float: tolerance.unwrap_or(base.float),
                geometry: tolerance.unwrap_or(base.geometry),
                color: color_tolerance.unwrap_or(base.color),
            };
            ctx.verify_property_with(bag, property, expected.clone(), tol, message);
        }
        Action::VerifyDifferent {
            property,
            unexpected,
            message,
        } => {
            ctx.verify_property_different(bag, property, unexpected.clone(), message);
        }
        Action::VerifyTable { expect, message } => {
            ctx.verify_table(bag, expect, message);
        }
        Action::SignalVerdict { key } => ctx.signal_verdict(key.clone()),
        Action::Fail { reason } => return Ok(StepOutcome::fail(reason.clone())),
        Action::Skip { reason } => return Ok(StepOutcome::skip(reason.clone())),
    }
    Ok(StepOutcome::Pass)
}
