//! Keyword intent planner.

use crate::types::QueryPlan;

pub const PENALTY_LOOKUP: &str = "penalty_lookup";
pub const DEADLINE_LOOKUP: &str = "deadline_lookup";
pub const GENERAL_LOOKUP: &str = "general_lookup";

/// Predicate over the lower-cased question.
pub type IntentPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// One (predicate, label) rule.
pub struct IntentRule {
    predicate: IntentPredicate,
    label: String,
}

impl IntentRule {
    pub fn new(label: impl Into<String>, predicate: IntentPredicate) -> Self {
        Self {
            predicate,
            label: label.into(),
        }
    }

    /// Matches when the question contains any of `keywords`.
    pub fn keywords(label: impl Into<String>, keywords: &[&str]) -> Self {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        Self::new(
            label,
            Box::new(move |question: &str| keywords.iter().any(|k| question.contains(k.as_str()))),
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for IntentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRule").field("label", &self.label).finish()
    }
}

/// Classifies a question by ordered rules; the first match wins and
/// `general_lookup` is the default. Advisory only.
#[derive(Debug)]
pub struct IntentPlanner {
    rules: Vec<IntentRule>,
    default_label: String,
}

impl Default for IntentPlanner {
    fn default() -> Self {
        Self {
            rules: vec![
                IntentRule::keywords(PENALTY_LOOKUP, &["penalty", "penalties", "fine"]),
                IntentRule::keywords(DEADLINE_LOOKUP, &["deadline", "due date", "when is"]),
            ],
            default_label: GENERAL_LOOKUP.to_string(),
        }
    }
}

impl IntentPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule after the existing ones, ahead of the default.
    pub fn with_rule(mut self, rule: IntentRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn plan(&self, question: &str) -> QueryPlan {
        let lowered = question.to_lowercase();

        let intent = self
            .rules
            .iter()
            .find(|rule| (rule.predicate)(lowered.as_str()))
            .map(|rule| rule.label.clone())
            .unwrap_or_else(|| self.default_label.clone());

        tracing::debug!(intent = %intent, "Planned query");

        QueryPlan { intent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_lookup() {
        let planner = IntentPlanner::new();
        assert_eq!(
            planner.plan("What is the penalty for late filing?").intent,
            PENALTY_LOOKUP
        );
        assert_eq!(planner.plan("Any FINES under SEBI?").intent, PENALTY_LOOKUP);
    }

    #[test]
    fn test_deadline_lookup() {
        let planner = IntentPlanner::new();
        assert_eq!(planner.plan("When is the due date?").intent, DEADLINE_LOOKUP);
        assert_eq!(planner.plan("Form 8 deadline").intent, DEADLINE_LOOKUP);
    }

    #[test]
    fn test_general_lookup() {
        let planner = IntentPlanner::new();
        assert_eq!(planner.plan("Tell me about GDPR").intent, GENERAL_LOOKUP);
    }

    #[test]
    fn test_first_match_wins() {
        let planner = IntentPlanner::new();
        assert_eq!(
            planner.plan("When is the penalty deadline?").intent,
            PENALTY_LOOKUP
        );
    }

    #[test]
    fn test_custom_rule_before_default() {
        let planner = IntentPlanner::new()
            .with_rule(IntentRule::keywords("disclosure_lookup", &["disclose"]));

        assert_eq!(
            planner.plan("What must listed companies disclose?").intent,
            "disclosure_lookup"
        );
        assert_eq!(planner.plan("Tell me about GDPR").intent, GENERAL_LOOKUP);
    }
}
