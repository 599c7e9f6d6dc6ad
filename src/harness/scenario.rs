//! Scenario and step definitions.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::harness::combinatorial::Combination;
use crate::harness::context::ScenarioContext;
use crate::harness::outcome::{ScenarioStatus, StepResult};

/// Step group. All `Initialize` steps run before any `Run` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    Initialize,
    #[default]
    Run,
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initialize => "Initialize",
            Self::Run => "Run",
        })
    }
}

/// Boxed step body.
pub type StepAction = Box<dyn FnMut(&mut ScenarioContext) -> StepResult>;

/// One named unit of work.
pub struct Step {
    name: String,
    phase: StepPhase,
    action: StepAction,
}

impl Step {
    pub fn new(
        name: impl Into<String>,
        phase: StepPhase,
        action: impl FnMut(&mut ScenarioContext) -> StepResult + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            phase,
            action: Box::new(action),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub(crate) fn invoke(&mut self, ctx: &mut ScenarioContext) -> StepResult {
        (self.action)(ctx)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Ordered steps plus selection metadata.
#[derive(Debug)]
pub struct Scenario {
    base_name: String,
    name: String,
    area: String,
    priority: u32,
    variation: Option<String>,
    combination: Option<Combination>,
    steps: Vec<Step>,
    pub(crate) status: ScenarioStatus,
}

impl Scenario {
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder::new(name)
    }

    /// Expanded name: `base(variation)` for variations, else the base name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    #[must_use]
    pub fn area(&self) -> &str {
        &self.area
    }

    #[must_use]
    pub fn priority(&self) -> u32 {
        self.priority
    }

    #[must_use]
    pub fn variation(&self) -> Option<&str> {
        self.variation.as_deref()
    }

    /// Dimension values when expanded from a combinatorial registration.
    #[must_use]
    pub fn combination(&self) -> Option<&Combination> {
        self.combination.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> ScenarioStatus {
        self.status
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub(crate) fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }
}

/// Expanded display name for a scenario variation.
#[must_use]
pub fn expanded_name(base: &str, variation: Option<&str>) -> String {
    match variation {
        Some(v) => format!("{base}({v})"),
        None => base.to_string(),
    }
}

/// Fluent scenario construction.
///
/// Steps keep declaration order within their phase; `build` places every
/// `Initialize` step ahead of every `Run` step.
#[derive(Debug)]
pub struct ScenarioBuilder {
    name: String,
    area: String,
    priority: u32,
    variation: Option<String>,
    combination: Option<Combination>,
    initialize: Vec<Step>,
    run: Vec<Step>,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            area: String::new(),
            priority: 0,
            variation: None,
            combination: None,
            initialize: Vec::new(),
            run: Vec::new(),
        }
    }

    #[must_use]
    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.area = area.into();
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn variation(mut self, variation: Option<impl Into<String>>) -> Self {
        self.variation = variation.map(Into::into);
        self
    }

    /// Build for one combination; its label becomes the variation.
    #[must_use]
    pub fn combination(mut self, combination: Option<Combination>) -> Self {
        if let Some(c) = &combination {
            self.variation = Some(c.label());
        }
        self.combination = combination;
        self
    }

    /// Variation this scenario is being built for, if any.
    #[must_use]
    pub fn current_variation(&self) -> Option<&str> {
        self.variation.as_deref()
    }

    #[must_use]
    pub fn current_combination(&self) -> Option<&Combination> {
        self.combination.as_ref()
    }

    #[must_use]
    pub fn initialize(
        self,
        name: impl Into<String>,
        action: impl FnMut(&mut ScenarioContext) -> StepResult + 'static,
    ) -> Self {
        self.push(Step::new(name, StepPhase::Initialize, action))
    }

    #[must_use]
    pub fn step(
        self,
        name: impl Into<String>,
        action: impl FnMut(&mut ScenarioContext) -> StepResult + 'static,
    ) -> Self {
        self.push(Step::new(name, StepPhase::Run, action))
    }

    #[must_use]
    pub fn push(mut self, step: Step) -> Self {
        match step.phase {
            StepPhase::Initialize => self.initialize.push(step),
            StepPhase::Run => self.run.push(step),
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Scenario {
        let mut steps = self.initialize;
        steps.extend(self.run);
        Scenario {
            name: expanded_name(&self.name, self.variation.as_deref()),
            base_name: self.name,
            area: self.area,
            priority: self.priority,
            variation: self.variation,
            combination: self.combination,
            steps,
            status: ScenarioStatus::NotRun,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::outcome::StepOutcome;

    #[test]
    fn initialize_steps_precede_run_steps() {
        let scenario = Scenario::builder("Order")
            .step("run-1", |_| Ok(StepOutcome::Pass))
            .initialize("init-1", |_| Ok(StepOutcome::Pass))
            .step("run-2", |_| Ok(StepOutcome::Pass))
            .initialize("init-2", |_| Ok(StepOutcome::Pass))
            .build();
        let names: Vec<&str> = scenario.steps().iter().map(Step::name).collect();
        assert_eq!(names, vec!["init-1", "init-2", "run-1", "run-2"]);
        assert_eq!(scenario.status(), ScenarioStatus::NotRun);
    }

    #[test]
    fn variation_expands_name() {
        let scenario = Scenario::builder("Fill")
            .area("Shapes")
            .priority(1)
            .variation(Some("Red"))
            .build();
        assert_eq!(scenario.name(), "Fill(Red)");
        assert_eq!(scenario.base_name(), "Fill");
        assert_eq!(scenario.variation(), Some("Red"));
        assert_eq!(scenario.area(), "Shapes");
        assert_eq!(scenario.priority(), 1);
    }

    #[test]
    fn combination_sets_variation_label() {
        use crate::harness::combinatorial::{Dimension, combinations};
        let combo = combinations(&[
            Dimension::new("Fill", ["Red"]),
            Dimension::new("Size", ["Wide"]),
        ])
        .pop();
        let builder = Scenario::builder("Fill").combination(combo);
        assert_eq!(builder.current_combination().and_then(|c| c.get("Size")), Some("Wide"));
        let scenario = builder.build();
        assert_eq!(scenario.name(), "Fill(Red,Wide)");
        assert_eq!(scenario.variation(), Some("Red,Wide"));
        assert_eq!(scenario.combination().map(Combination::len), Some(2));
    }

    #[test]
    fn plain_scenario_keeps_base_name() {
        let scenario = Scenario::builder("Plain").variation(None::<String>).build();
        assert_eq!(scenario.name(), "Plain");
    }
}
