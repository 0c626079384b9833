//! Conformance requirements and the runner that evaluates them
//!
//! Each family has its own [`RequirementRegistry`]: an ordered list of
//! requirements, each a plain function from a record to an [`Outcome`].
//! The runner evaluates every requirement, isolating faults and panics, and
//! folds the outcomes into a [`ConformanceReport`]. One failed requirement
//! makes the whole record non-conformant, but evaluation never stops early.

pub mod wcmp1;
pub mod wcmp2;

use crate::documents::{Family, ParsedDocument};
use crate::environment::Environment;
use crate::error::{Error, Fault, Result};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Source position attached to a failure, for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// 1-based line in the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Path or JSON pointer in the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl SourceLocation {
    /// A line in an XML record
    pub fn line(line: u32) -> Self {
        Self {
            line: Some(line),
            path: None,
        }
    }

    /// A path in the record
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            line: None,
            path: Some(path.into()),
        }
    }
}

/// Result of evaluating one requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code")]
pub enum Outcome {
    /// The requirement holds
    #[serde(rename = "PASSED")]
    Pass,
    /// The requirement does not hold
    #[serde(rename = "FAILED")]
    Fail {
        /// Why, in terms a record author can act on
        #[serde(rename = "message")]
        reason: String,
        /// Where the problem was found
        #[serde(skip_serializing_if = "Vec::is_empty")]
        locations: Vec<SourceLocation>,
    },
    /// The requirement does not apply to this record
    #[serde(rename = "SKIPPED")]
    Skipped {
        /// Why it was not evaluated
        #[serde(rename = "message")]
        reason: String,
    },
}

impl Outcome {
    /// A failure without location
    pub fn fail(reason: impl Into<String>) -> Self {
        Outcome::Fail {
            reason: reason.into(),
            locations: Vec::new(),
        }
    }

    /// A failure at some lines
    pub fn fail_at(reason: impl Into<String>, lines: impl IntoIterator<Item = u32>) -> Self {
        Outcome::Fail {
            reason: reason.into(),
            locations: lines.into_iter().map(SourceLocation::line).collect(),
        }
    }

    /// A requirement that does not apply
    pub fn skipped(reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            reason: reason.into(),
        }
    }

    /// `Pass` when `holds`, else a failure built lazily
    pub fn check(holds: bool, failure: impl FnOnce() -> Outcome) -> Self {
        if holds {
            Outcome::Pass
        } else {
            failure()
        }
    }

    /// Whether the requirement holds
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }

    /// Whether the requirement failed
    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail { .. })
    }

    /// Whether the requirement was skipped
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    /// Failure or skip reason
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Pass => None,
            Outcome::Fail { reason, .. } | Outcome::Skipped { reason } => Some(reason),
        }
    }
}

/// What a requirement checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    /// Validation against the published schema
    SchemaValidation,
    /// A profile rule
    Rule,
}

/// Check function of a requirement
pub type Evaluate<D> = fn(&D, &Environment) -> std::result::Result<Outcome, Fault>;

/// A named conformance requirement
pub struct Requirement<D> {
    /// Requirement URI
    pub id: String,
    /// Short label such as `8.1.1`
    pub label: &'static str,
    /// Requirement text
    pub description: &'static str,
    /// What the requirement checks
    pub kind: RequirementKind,
    /// The check
    pub evaluate: Evaluate<D>,
}

impl<D> Requirement<D> {
    /// A profile rule
    pub fn rule(
        id: impl Into<String>,
        label: &'static str,
        description: &'static str,
        evaluate: Evaluate<D>,
    ) -> Self {
        Self {
            id: id.into(),
            label,
            description,
            kind: RequirementKind::Rule,
            evaluate,
        }
    }

    /// A schema validation requirement
    pub fn schema_validation(
        id: impl Into<String>,
        label: &'static str,
        description: &'static str,
        evaluate: Evaluate<D>,
    ) -> Self {
        Self {
            kind: RequirementKind::SchemaValidation,
            ..Self::rule(id, label, description, evaluate)
        }
    }
}

impl<D> std::fmt::Debug for Requirement<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requirement")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Options for a conformance run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip the remaining requirements once schema validation fails, for
    /// registries that carry a schema gate
    pub fail_on_schema_validation: bool,
}

impl RunOptions {
    /// Set whether a schema failure skips the remaining requirements
    pub fn with_fail_on_schema_validation(mut self, stop: bool) -> Self {
        self.fail_on_schema_validation = stop;
        self
    }
}

/// Outcome of one requirement in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementResult {
    /// Requirement URI
    pub id: String,
    /// The outcome
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Ordered requirements of one family
#[derive(Debug)]
pub struct RequirementRegistry<D> {
    family: Family,
    requirements: Vec<Requirement<D>>,
    schema_gate: bool,
}

impl<D> RequirementRegistry<D> {
    /// An empty registry
    pub fn new(family: Family) -> Self {
        Self {
            family,
            requirements: Vec::new(),
            schema_gate: false,
        }
    }

    /// Let a schema validation failure skip the remaining requirements when
    /// [`RunOptions::fail_on_schema_validation`] is set
    pub fn with_schema_gate(mut self) -> Self {
        self.schema_gate = true;
        self
    }

    /// Whether a schema validation failure can skip later requirements
    pub fn has_schema_gate(&self) -> bool {
        self.schema_gate
    }

    /// Append a requirement; identifiers must be unique
    pub fn register(&mut self, requirement: Requirement<D>) -> Result<()> {
        if self.get(&requirement.id).is_some() {
            return Err(Error::DuplicateCheck(requirement.id));
        }
        self.requirements.push(requirement);
        Ok(())
    }

    /// Builder form of [`RequirementRegistry::register`]
    pub fn with(mut self, requirement: Requirement<D>) -> Result<Self> {
        self.register(requirement)?;
        Ok(self)
    }

    /// Family the requirements apply to
    pub fn family(&self) -> Family {
        self.family
    }

    /// A requirement by id
    pub fn get(&self, id: &str) -> Option<&Requirement<D>> {
        self.requirements.iter().find(|r| r.id == id)
    }

    /// Requirements in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &Requirement<D>> {
        self.requirements.iter()
    }

    /// Number of requirements
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Evaluate every requirement against a record, in order
    pub fn run(&self, document: &D, env: &Environment, options: &RunOptions) -> Vec<RequirementResult> {
        info!("Running {} conformance tests", self.family);
        let mut schema_failed = false;
        let mut results = Vec::with_capacity(self.requirements.len());

        for requirement in &self.requirements {
            let outcome = if schema_failed {
                Outcome::skipped("not evaluated: record fails schema validation")
            } else {
                evaluate(requirement, document, env)
            };

            if self.schema_gate
                && options.fail_on_schema_validation
                && requirement.kind == RequirementKind::SchemaValidation
                && outcome.is_fail()
            {
                warn!("Record fails {} schema validation", self.family);
                schema_failed = true;
            }
            results.push(RequirementResult {
                id: requirement.id.clone(),
                outcome,
            });
        }
        results
    }
}

/// Evaluate one requirement, turning faults and panics into failures
fn evaluate<D>(requirement: &Requirement<D>, document: &D, env: &Environment) -> Outcome {
    debug!("Testing requirement {}", requirement.id);
    let result = panic::catch_unwind(AssertUnwindSafe(|| (requirement.evaluate)(document, env)));
    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(fault)) => {
            warn!("Requirement {} raised a fault: {}", requirement.id, fault);
            Outcome::fail(format!("fault: {}", fault))
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("Requirement {} panicked: {}", requirement.id, message);
            Outcome::fail(format!("fault: {}", message))
        }
    };
    if let Outcome::Fail { reason, .. } = &outcome {
        info!("Requirement {} failed: {}", requirement.label, reason);
    }
    outcome
}

/// Outcome counts of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Requirements that hold
    #[serde(rename = "PASSED")]
    pub passed: usize,
    /// Requirements that failed
    #[serde(rename = "FAILED")]
    pub failed: usize,
    /// Requirements that were not evaluated
    #[serde(rename = "SKIPPED")]
    pub skipped: usize,
}

/// Conformance results for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConformanceReport {
    /// Record identifier, when the record has one
    pub record_id: Option<String>,
    /// Record family
    pub family: Family,
    /// Outcomes in declared order
    #[serde(rename = "ets-report")]
    pub results: Vec<RequirementResult>,
    /// Outcome counts
    pub summary: Summary,
}

impl ConformanceReport {
    /// Build a report from ordered results
    pub fn new(record_id: Option<String>, family: Family, results: Vec<RequirementResult>) -> Self {
        let summary = results.iter().fold(Summary::default(), |mut summary, r| {
            match r.outcome {
                Outcome::Pass => summary.passed += 1,
                Outcome::Fail { .. } => summary.failed += 1,
                Outcome::Skipped { .. } => summary.skipped += 1,
            }
            summary
        });
        Self {
            record_id,
            family,
            results,
            summary,
        }
    }

    /// Number of failed requirements
    pub fn failed_count(&self) -> usize {
        self.summary.failed
    }

    /// Number of passed requirements
    pub fn passed_count(&self) -> usize {
        self.summary.passed
    }

    /// Number of skipped requirements
    pub fn skipped_count(&self) -> usize {
        self.summary.skipped
    }

    /// Whether no requirement failed
    pub fn is_conformant(&self) -> bool {
        self.summary.failed == 0
    }

    /// Failed requirements with their outcomes
    pub fn failures(&self) -> impl Iterator<Item = &RequirementResult> {
        self.results.iter().filter(|r| r.outcome.is_fail())
    }

    /// Outcome of a requirement by id
    pub fn outcome(&self, id: &str) -> Option<&Outcome> {
        self.results.iter().find(|r| r.id == id).map(|r| &r.outcome)
    }
}

/// Run the requirement set of the record's family
pub fn run_conformance(
    document: &ParsedDocument,
    env: &Environment,
    options: &RunOptions,
) -> Result<ConformanceReport> {
    let results = match document {
        ParsedDocument::Xml(doc) => wcmp1::registry()?.run(doc, env, options),
        ParsedDocument::Json(record) => wcmp2::registry()?.run(record, env, options),
    };
    Ok(ConformanceReport::new(
        document.record_id(),
        document.family(),
        results,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pass(_: &u32, _: &Environment) -> std::result::Result<Outcome, Fault> {
        Ok(Outcome::Pass)
    }

    fn odd(value: &u32, _: &Environment) -> std::result::Result<Outcome, Fault> {
        Ok(Outcome::check(value % 2 == 1, || Outcome::fail_at("value is even", [3])))
    }

    fn faulty(_: &u32, _: &Environment) -> std::result::Result<Outcome, Fault> {
        Err(Fault::new("missing field"))
    }

    fn panicking(_: &u32, _: &Environment) -> std::result::Result<Outcome, Fault> {
        panic!("boom")
    }

    fn registry() -> RequirementRegistry<u32> {
        RequirementRegistry::new(Family::Wcmp2)
            .with_schema_gate()
            .with(Requirement::schema_validation("schema", "1", "schema", odd))
            .and_then(|r| r.with(Requirement::rule("a", "2", "a", pass)))
            .and_then(|r| r.with(Requirement::rule("b", "3", "b", faulty)))
            .and_then(|r| r.with(Requirement::rule("c", "4", "c", panicking)))
            .unwrap()
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = RequirementRegistry::<u32>::new(Family::Wcmp1)
            .with(Requirement::rule("a", "1", "a", pass))
            .and_then(|r| r.with(Requirement::rule("a", "2", "a", pass)));
        assert!(matches!(result, Err(Error::DuplicateCheck(id)) if id == "a"));
    }

    #[test]
    fn test_faults_and_panics_become_failures() {
        let results = registry().run(&1, &Environment::new(), &RunOptions::default());
        let report = ConformanceReport::new(None, Family::Wcmp1, results);
        assert_eq!(report.passed_count(), 2);
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.outcome("b"), Some(&Outcome::fail("fault: missing field")));
        assert_eq!(report.outcome("c"), Some(&Outcome::fail("fault: boom")));
        assert!(!report.is_conformant());
    }

    #[test]
    fn test_schema_failure_gates_remaining() {
        let gated = RunOptions::default().with_fail_on_schema_validation(true);
        let results = registry().run(&2, &Environment::new(), &gated);
        let report = ConformanceReport::new(None, Family::Wcmp2, results);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 3);

        let results = registry().run(&2, &Environment::new(), &RunOptions::default());
        let report = ConformanceReport::new(None, Family::Wcmp2, results);
        assert_eq!(report.failed_count(), 3);
    }

    #[test]
    fn test_registry_without_gate_ignores_option() {
        let ungated = RequirementRegistry::new(Family::Wcmp1)
            .with(Requirement::schema_validation("schema", "1", "schema", odd))
            .and_then(|r| r.with(Requirement::rule("b", "2", "b", faulty)))
            .unwrap();
        assert!(!ungated.has_schema_gate());

        let gated = RunOptions::default().with_fail_on_schema_validation(true);
        let results = ungated.run(&2, &Environment::new(), &gated);
        assert!(results.iter().all(|r| r.outcome.is_fail()));
    }

    #[test]
    fn test_report_serialization() {
        let report = ConformanceReport::new(
            Some("urn:x-wmo:md:can:eccc-msc:x".to_string()),
            Family::Wcmp2,
            vec![
                RequirementResult {
                    id: "a".to_string(),
                    outcome: Outcome::Pass,
                },
                RequirementResult {
                    id: "b".to_string(),
                    outcome: Outcome::fail_at("bad", [7]),
                },
            ],
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "record_id": "urn:x-wmo:md:can:eccc-msc:x",
                "family": "wcmp2",
                "ets-report": [
                    {"id": "a", "code": "PASSED"},
                    {"id": "b", "code": "FAILED", "message": "bad", "locations": [{"line": 7}]}
                ],
                "summary": {"PASSED": 1, "FAILED": 1, "SKIPPED": 0}
            })
        );
    }
}
