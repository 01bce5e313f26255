//! Analyzer configuration

use serde::{Deserialize, Serialize};

/// Options recognized by the analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Retire borrows after their last use instead of at scope exit
    ///
    /// The lexical model is the conformance baseline; precise extents are an
    /// opt-in refinement matching how borrows behave in practice.
    pub precise_borrow_extents: bool,

    /// Reject units with more statements than this before analyzing
    ///
    /// `None` leaves unit size unrestricted.
    pub max_statements: Option<usize>,
}

impl AnalyzerConfig {
    /// Baseline configuration with precise borrow extents enabled
    pub fn precise() -> Self {
        Self {
            precise_borrow_extents: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str("{}").expect("empty config must deserialize");
        assert_eq!(config, AnalyzerConfig::default());
        assert!(!config.precise_borrow_extents);
        assert!(config.max_statements.is_none());
    }
}
