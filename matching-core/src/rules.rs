//! Per-field comparison rules
//!
//! Matching walks the fields of a leg in a fixed order and applies one
//! comparator per field. Known fields get domain comparators; anything a
//! deployment adds on top falls back to exact equality.

use serde::{Deserialize, Serialize};

/// Default timestamp tolerance: one minute. Deployments override this in
/// config; observed values range from one minute to two hours.
pub const DEFAULT_TIMESTAMP_TOLERANCE_MS: i64 = 60_000;

/// How a single field of two legs is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    /// Absolute timestamp difference must not exceed the tolerance (ms)
    TimestampWithin(i64),

    /// Buy must pair with Sell and vice versa
    InvertedSide,

    /// A's counterparty reference must name B's own identity and
    /// symmetrically, not literal equality
    CrossReference,

    /// Exact value equality
    Exact,
}

/// Ordered field → comparator table, resolved at configuration time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRules {
    rules: Vec<(String, Comparator)>,
}

impl MatchRules {
    /// Rules for the current schema with the given timestamp tolerance
    pub fn with_tolerance(tolerance_ms: i64) -> Self {
        Self {
            rules: vec![
                ("timestamp".to_string(), Comparator::TimestampWithin(tolerance_ms)),
                ("side".to_string(), Comparator::InvertedSide),
                ("counterparty".to_string(), Comparator::CrossReference),
            ],
        }
    }

    /// Comparator for a field; unrecognized fields compare exactly
    pub fn comparator_for(&self, field: &str) -> Comparator {
        self.rules
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, cmp)| *cmp)
            .unwrap_or(Comparator::Exact)
    }

    /// Override or add a comparator for a field
    pub fn set(&mut self, field: impl Into<String>, comparator: Comparator) {
        let field = field.into();
        if let Some(entry) = self.rules.iter_mut().find(|(name, _)| *name == field) {
            entry.1 = comparator;
        } else {
            self.rules.push((field, comparator));
        }
    }
}

impl Default for MatchRules {
    fn default() -> Self {
        Self::with_tolerance(DEFAULT_TIMESTAMP_TOLERANCE_MS)
    }
}
