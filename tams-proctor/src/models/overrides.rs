//! Eligibility override flags
//!
//! Scoped to the insufficient-candidates dialog; only used to re-issue the
//! eligible-candidates fetch with relaxed rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Eligibility rule the backend can be asked to relax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideRule {
    AcademicLevel,
    ConsecutiveProctoring,
}

impl fmt::Display for OverrideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideRule::AcademicLevel => f.write_str("academic level"),
            OverrideRule::ConsecutiveProctoring => f.write_str("consecutive proctoring"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideFlags {
    pub academic_level: bool,
    pub consecutive_proctoring: bool,
}

impl OverrideFlags {
    pub fn is_set(&self, rule: OverrideRule) -> bool {
        match rule {
            OverrideRule::AcademicLevel => self.academic_level,
            OverrideRule::ConsecutiveProctoring => self.consecutive_proctoring,
        }
    }

    /// Flip one flag; returns its new value
    pub fn toggle(&mut self, rule: OverrideRule) -> bool {
        let flag = match rule {
            OverrideRule::AcademicLevel => &mut self.academic_level,
            OverrideRule::ConsecutiveProctoring => &mut self.consecutive_proctoring,
        };
        *flag = !*flag;
        *flag
    }

    pub fn any(&self) -> bool {
        self.academic_level || self.consecutive_proctoring
    }

    /// Query parameters for the eligible-proctors request
    ///
    /// Unset flags are omitted so the backend applies its default rules.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if self.academic_level {
            query.push(("override_academic_level", "true".to_string()));
        }
        if self.consecutive_proctoring {
            query.push(("override_consecutive_proctoring", "true".to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_is_independent_per_rule() {
        let mut flags = OverrideFlags::default();
        assert!(!flags.any());

        assert!(flags.toggle(OverrideRule::AcademicLevel));
        assert!(flags.is_set(OverrideRule::AcademicLevel));
        assert!(!flags.is_set(OverrideRule::ConsecutiveProctoring));

        assert!(!flags.toggle(OverrideRule::AcademicLevel));
        assert!(!flags.any());
    }

    #[test]
    fn test_query_omits_unset_flags() {
        let mut flags = OverrideFlags::default();
        assert!(flags.to_query().is_empty());

        flags.toggle(OverrideRule::ConsecutiveProctoring);
        assert_eq!(
            flags.to_query(),
            vec![("override_consecutive_proctoring", "true".to_string())]
        );
    }
}
