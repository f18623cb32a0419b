//! Core types for condition events and evaluation results.

use crate::analyzer::EvaluationError;
use crate::model::Element;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Verdict of a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The condition holds.
    Satisfied,
    /// The condition is violated.
    Violated,
}

impl Outcome {
    /// Returns the opposite outcome.
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::Satisfied => Self::Violated,
            Self::Violated => Self::Satisfied,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfied => write!(f, "satisfied"),
            Self::Violated => write!(f, "violated"),
        }
    }
}

/// One verdict emitted by a condition.
///
/// Events are immutable; [`ConditionEvent::invert`] produces a new event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionEvent {
    element: Option<Element>,
    outcome: Outcome,
    message: String,
}

impl ConditionEvent {
    /// Creates a satisfied event.
    #[must_use]
    pub fn satisfied(element: impl Into<Option<Element>>, message: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            outcome: Outcome::Satisfied,
            message: message.into(),
        }
    }

    /// Creates a violated event.
    #[must_use]
    pub fn violated(element: impl Into<Option<Element>>, message: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            outcome: Outcome::Violated,
            message: message.into(),
        }
    }

    /// Returns the same event with the opposite outcome.
    #[must_use]
    pub fn invert(self) -> Self {
        Self {
            outcome: self.outcome.inverted(),
            ..self
        }
    }

    /// Returns the element the event is about, if any.
    #[must_use]
    pub fn element(&self) -> Option<&Element> {
        self.element.as_ref()
    }

    /// Returns the outcome.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this event is a violation.
    #[must_use]
    pub fn is_violation(&self) -> bool {
        self.outcome == Outcome::Violated
    }
}

/// Ordered collection of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionEvents(Vec<ConditionEvent>);

impl ConditionEvents {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn add(&mut self, event: ConditionEvent) {
        self.0.push(event);
    }

    /// Appends all events of another collection, keeping their order.
    pub fn extend(&mut self, other: ConditionEvents) {
        self.0.extend(other.0);
    }

    /// Whether any event is a violation.
    #[must_use]
    pub fn contains_violation(&self) -> bool {
        self.0.iter().any(ConditionEvent::is_violation)
    }

    /// Iterates over the violations.
    pub fn violations(&self) -> impl Iterator<Item = &ConditionEvent> {
        self.0.iter().filter(|e| e.is_violation())
    }

    /// Iterates over all events.
    pub fn iter(&self) -> impl Iterator<Item = &ConditionEvent> {
        self.0.iter()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns every event inverted.
    #[must_use]
    pub fn inverted(self) -> Self {
        Self(self.0.into_iter().map(ConditionEvent::invert).collect())
    }

    /// Consumes the collection.
    #[must_use]
    pub fn into_vec(self) -> Vec<ConditionEvent> {
        self.0
    }
}

impl IntoIterator for ConditionEvents {
    type Item = ConditionEvent;
    type IntoIter = std::vec::IntoIter<ConditionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Rule name.
    pub rule: String,
    /// Full rule description.
    pub description: String,
    /// Events in scope order, followed by finish events.
    pub events: Vec<ConditionEvent>,
}

impl Report {
    /// Creates a report.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        description: impl Into<String>,
        events: ConditionEvents,
    ) -> Self {
        Self {
            rule: rule.into(),
            description: description.into(),
            events: events.into_vec(),
        }
    }

    /// Returns the violations.
    #[must_use]
    pub fn violations(&self) -> Vec<&ConditionEvent> {
        self.events.iter().filter(|e| e.is_violation()).collect()
    }

    /// Returns the satisfied events.
    #[must_use]
    pub fn satisfactions(&self) -> Vec<&ConditionEvent> {
        self.events.iter().filter(|e| !e.is_violation()).collect()
    }

    /// Returns true if there are any violations.
    #[must_use]
    pub fn has_violations(&self) -> bool {
        self.events.iter().any(ConditionEvent::is_violation)
    }

    /// Formats the violations as a failure report.
    #[must_use]
    pub fn failure_report(&self) -> String {
        let violations = self.violations();
        let mut report = String::new();
        let _ = writeln!(
            report,
            "Rule '{}' was violated ({} times):",
            self.description,
            violations.len()
        );
        for v in violations {
            let _ = writeln!(report, "{}", v.message());
        }
        report
    }
}

/// Outcome of one rule within an [`EvaluationSummary`].
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    /// Rule name.
    pub name: String,
    /// The report, or the error that aborted the rule.
    pub result: Result<Report, EvaluationError>,
}

impl RuleOutcome {
    /// Whether the rule failed, by violation or by error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.result.as_ref().map_or(true, Report::has_violations)
    }
}

/// Result of evaluating a set of rules.
#[derive(Debug, Clone, Default)]
pub struct EvaluationSummary {
    /// Per-rule outcomes in registration order.
    pub outcomes: Vec<RuleOutcome>,
    /// Names of rules skipped because they are disabled.
    pub skipped: Vec<String>,
}

impl EvaluationSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any rule has violations or failed to evaluate.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(RuleOutcome::is_failure)
    }

    /// Counts violations across all reports.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.violations().len())
            .sum()
    }

    /// Returns the outcome of a rule by name.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Formats failing rules as a test failure report.
    ///
    /// Produces a human-readable multi-line report suitable for `panic!()`
    /// messages in `cargo test` integration.
    #[must_use]
    pub fn format_test_report(&self) -> String {
        let failing: Vec<&RuleOutcome> = self.outcomes.iter().filter(|o| o.is_failure()).collect();

        let mut report = String::new();
        let _ = writeln!(
            report,
            "\n=== arch-conform: {} failing rule(s) ===\n",
            failing.len()
        );

        for outcome in &failing {
            match &outcome.result {
                Ok(r) => {
                    let _ = writeln!(report, "[{}] {}", outcome.name, r.failure_report());
                }
                Err(e) => {
                    let _ = writeln!(report, "[{}] could not be evaluated: {e}\n", outcome.name);
                }
            }
        }

        let _ = writeln!(
            report,
            "Total: {} violation(s) in {} rule(s), {} skipped",
            self.violation_count(),
            self.outcomes.len(),
            self.skipped.len()
        );

        report
    }
}
