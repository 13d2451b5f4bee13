//! Declarative table-classification rules.
//!
//! The keyword sets are data, not code: new markup variants are handled by
//! editing configuration, never the classifier.

use serde::{Deserialize, Serialize};

use crate::domain::TableKind;

/// Header-keyword rule table deciding which evaluation table a structure is.
///
/// A header string satisfies a rule when it contains every keyword as a
/// substring; evaluation short-circuits on the first miss. When one table
/// satisfies both rules, the technical rule claims it and the table is not
/// reused for the financial role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRules {
    pub technical_keywords: Vec<String>,
    pub financial_keywords: Vec<String>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            technical_keywords: ["seller", "offered", "participated", "mse", "status"]
                .map(String::from)
                .to_vec(),
            financial_keywords: ["seller", "offered", "price", "rank"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ClassificationRules {
    /// Classify one normalized header string, given which kinds have already
    /// claimed a table in this document.
    pub fn kind_for(
        &self,
        header_text: &str,
        technical_taken: bool,
        financial_taken: bool,
    ) -> Option<TableKind> {
        if !technical_taken && contains_all(header_text, &self.technical_keywords) {
            return Some(TableKind::Technical);
        }
        if !financial_taken && contains_all(header_text, &self.financial_keywords) {
            return Some(TableKind::Financial);
        }
        None
    }
}

fn contains_all(haystack: &str, keywords: &[String]) -> bool {
    keywords.iter().all(|keyword| haystack.contains(keyword.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technical_requires_every_keyword() {
        let rules = ClassificationRules::default();
        let header = "seller name offered item participated mse status";
        assert_eq!(rules.kind_for(header, false, false), Some(TableKind::Technical));
        // Missing "mse".
        let header = "seller name offered item participated status";
        assert_eq!(rules.kind_for(header, false, false), None);
    }

    #[test]
    fn financial_matches_its_own_set() {
        let rules = ClassificationRules::default();
        let header = "seller offered price rank";
        assert_eq!(rules.kind_for(header, false, false), Some(TableKind::Financial));
    }

    #[test]
    fn technical_takes_precedence_and_claimed_kinds_step_aside() {
        let rules = ClassificationRules::default();
        // All eight keywords: both rules match this header.
        let header = "seller offered participated mse status price rank";
        assert_eq!(rules.kind_for(header, false, false), Some(TableKind::Technical));
        // With technical already claimed, the same header can serve financial.
        assert_eq!(rules.kind_for(header, true, false), Some(TableKind::Financial));
        assert_eq!(rules.kind_for(header, true, true), None);
    }
}
