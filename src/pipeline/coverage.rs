//! Coverage scanning.
//!
//! Summarization quietly drops case facts; the scanner finds which of the
//! must-keep facts (acronyms, named events, key dates) actually occur in the
//! source so later stages can be told to retain them. Rules live in an
//! embedded JSON resource rather than code, so adding coverage terms or
//! corrections for a new document domain is a data change.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;

/// Coverage tokens fed to a prompt are capped to keep it small.
const MAX_TOKENS: usize = 10;

/// One scan rule: a pattern to look for and the token naming it.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageRule {
    pub pattern: String,
    pub token: String,
}

/// One literal replacement applied by the output sanitizer.
#[derive(Debug, Clone, Deserialize)]
pub struct Correction {
    pub find: String,
    pub replace: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RuleFileData {
    coverage: Vec<CoverageRule>,
    corrections: Vec<Correction>,
}

#[derive(Error, Debug)]
pub enum RuleLoadError {
    #[error("rule file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid coverage pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled rule set: coverage patterns plus sanitizer corrections.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<(Regex, String)>,
    corrections: Vec<Correction>,
}

impl RuleSet {
    /// Compile a rule set from JSON. Patterns match case-insensitively.
    pub fn from_json(json: &str) -> Result<Self, RuleLoadError> {
        let data: RuleFileData = serde_json::from_str(json)?;
        let mut rules = Vec::with_capacity(data.coverage.len());
        for rule in data.coverage {
            let regex = RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| RuleLoadError::Pattern {
                    pattern: rule.pattern.clone(),
                    source: e,
                })?;
            rules.push((regex, rule.token));
        }
        Ok(Self {
            rules,
            corrections: data.corrections,
        })
    }

    /// The rule set embedded at compile time.
    pub fn embedded() -> &'static Self {
        static EMBEDDED: LazyLock<RuleSet> = LazyLock::new(|| {
            RuleSet::from_json(include_str!("../../resources/coverage_rules.json"))
                .expect("embedded coverage rules are valid")
        });
        &EMBEDDED
    }

    /// Scan `text` for coverage tokens: rule order, deduplicated, at most
    /// ten. Earlier rules win ties; empty input yields an empty list.
    pub fn scan(&self, text: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        for (regex, token) in &self.rules {
            if tokens.len() >= MAX_TOKENS {
                break;
            }
            if regex.is_match(text) && !tokens.iter().any(|t| t == token) {
                tokens.push(token.clone());
            }
        }
        tokens
    }

    pub fn corrections(&self) -> &[Correction] {
        &self.corrections
    }
}

/// Scan with the embedded rule set.
pub fn scan_coverage(text: &str) -> Vec<String> {
    RuleSet::embedded().scan(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_tokens_in_rule_order() {
        let tokens = scan_coverage(
            "The Los Angeles Times covered the X-47B carrier trials after the PEO briefing.",
        );
        assert_eq!(tokens, vec!["X-47B", "PEO", "carrier", "Los Angeles Times"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let tokens = scan_coverage("the ucas-d program and its snubber");
        assert_eq!(tokens, vec!["UCAS-D", "snubber"]);
    }

    #[test]
    fn spaced_acronym_variants_match() {
        assert_eq!(scan_coverage("UCAS D overview"), vec!["UCAS-D"]);
        assert_eq!(scan_coverage("the X 47B aircraft"), vec!["X-47B"]);
    }

    #[test]
    fn date_pattern_matches_specific_days() {
        let tokens = scan_coverage("Arrested landing on February 4, 2013 aboard the carrier.");
        assert!(tokens.contains(&"February 2013".to_string()));
        assert!(tokens.contains(&"carrier".to_string()));
    }

    #[test]
    fn hook_and_hookpoint_share_one_token() {
        let tokens = scan_coverage("The hook engaged; the hookpoint was inspected.");
        assert_eq!(tokens, vec!["hookpoint"]);
    }

    #[test]
    fn empty_input_yields_empty() {
        assert!(scan_coverage("").is_empty());
    }

    #[test]
    fn no_match_yields_empty() {
        assert!(scan_coverage("Nothing relevant here at all.").is_empty());
    }

    #[test]
    fn caps_at_ten_unique_tokens() {
        // All thirteen rules match this text; only the first ten survive.
        let text = "UCAS-D X-47B UFO on the Beltway PAO PEO CPI SPI hook \
                    snubber carrier Los Angeles Times February 4, 2013 June 2013";
        let tokens = scan_coverage(text);
        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens[0], "UCAS-D");
        assert_eq!(tokens[9], "carrier");
        assert!(!tokens.contains(&"Los Angeles Times".to_string()));

        let unique: std::collections::HashSet<_> = tokens.iter().collect();
        assert_eq!(unique.len(), tokens.len());
    }

    #[test]
    fn embedded_rules_carry_the_timeline_correction() {
        let corrections = RuleSet::embedded().corrections();
        assert!(corrections
            .iter()
            .any(|c| c.find == "January 2010: First flight"));
    }

    #[test]
    fn custom_rule_set_loads() {
        let rules = RuleSet::from_json(
            r#"{
                "coverage": [{"pattern": "\\bAlpha\\b", "token": "Alpha"}],
                "corrections": []
            }"#,
        )
        .unwrap();
        assert_eq!(rules.scan("alpha test"), vec!["Alpha"]);
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let err = RuleSet::from_json(
            r#"{
                "coverage": [{"pattern": "(unclosed", "token": "broken"}],
                "corrections": []
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleLoadError::Pattern { .. }));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = RuleSet::from_json("not json").unwrap_err();
        assert!(matches!(err, RuleLoadError::Json(_)));
    }
}
