//! Outcome types of engine passes.

use std::fmt;

/// Totals of a full-repository [`validate`](super::DerivedDataEngine::validate) pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Derived nodes visited
    pub total: usize,
    /// Nodes whose derived values or dependencies changed
    pub changed: usize,
    /// Nodes whose computation failed (logged and skipped)
    pub failed: usize,
}

impl ValidationReport {
    /// Whether every node computed without error.
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} node(s) validated, {} changed, {} failed", self.total, self.changed, self.failed)
    }
}

/// Why a [`save`](super::DerivedDataEngine::save) pass did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The function definition folder does not exist
    NoConfiguration,
    /// A function applies to a node type the repository does not know
    UnknownNodeType(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConfiguration => f.write_str("no derived-data configuration"),
            Self::UnknownNodeType(name) => write!(f, "unknown node type {name}"),
        }
    }
}

/// Result of a [`save`](super::DerivedDataEngine::save) pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing was computed
    Skipped(SkipReason),
    /// `nodes` were computed, `changed` of them changed
    Computed { nodes: usize, changed: usize },
}

impl SaveOutcome {
    /// Number of nodes that changed.
    pub const fn changed(&self) -> usize {
        match self {
            Self::Skipped(_) => 0,
            Self::Computed {
                changed,
                ..
            } => *changed,
        }
    }
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Computed {
                nodes,
                changed,
            } => write!(f, "{nodes} node(s) computed, {changed} changed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let report = ValidationReport {
            total: 3,
            changed: 1,
            failed: 0,
        };
        assert_eq!(report.to_string(), "3 node(s) validated, 1 changed, 0 failed");
        assert!(report.is_clean());

        let outcome = SaveOutcome::Skipped(SkipReason::UnknownNodeType("my:type".to_string()));
        assert_eq!(outcome.to_string(), "skipped (unknown node type my:type)");
        assert_eq!(outcome.changed(), 0);
    }
}
