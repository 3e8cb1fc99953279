//! Stage classification rules
//!
//! Rules are data, not code: the built-in table is a YAML document embedded at
//! compile time and parsed once. A replacement table can be loaded with
//! [`Ruleset::from_yaml_str`] or [`Ruleset::from_path`].
//!
//! ```rust
//! use school_core::ruleset::Ruleset;
//! use school_core::models::Stage;
//!
//! let rules = Ruleset::builtin();
//! assert_eq!(rules.stage_rules()[0].stage, Stage::Primary);
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Result, SchoolError};
use crate::models::{Stage, StageSet};

// =============================================================================
// Embedded YAML Data
// =============================================================================

/// Built-in ruleset (compile-time embedded)
pub const STAGE_RULES_YAML: &str = include_str!("../data/stage_rules.yaml");

static BUILTIN_RULESET: OnceLock<Ruleset> = OnceLock::new();

// =============================================================================
// Matchers
// =============================================================================

/// A single test against a school name.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Substring test.
    Literal(String),
    /// Unanchored regular expression search.
    Pattern(Regex),
}

impl Matcher {
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Matcher::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Literal(literal) => text.contains(literal.as_str()),
            Matcher::Pattern(regex) => regex.is_match(text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageRule {
    pub stage: Stage,
    pub matchers: Vec<Matcher>,
}

impl StageRule {
    pub fn matches(&self, text: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(text))
    }
}

/// A matcher that implies several stages at once (e.g. a trailing `中`).
#[derive(Debug, Clone)]
pub struct AliasRule {
    pub matcher: Matcher,
    pub stages: Vec<Stage>,
}

// =============================================================================
// YAML Shape
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MatcherSpec {
    Literal(String),
    Pattern { pattern: String },
}

#[derive(Debug, Deserialize)]
struct StageRuleSpec {
    stage: String,
    #[serde(default)]
    matchers: Vec<MatcherSpec>,
}

#[derive(Debug, Deserialize)]
struct AliasRuleSpec {
    matcher: MatcherSpec,
    stages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RulesetSpec {
    affiliation_marker: Option<String>,
    stages: Vec<StageRuleSpec>,
    #[serde(default)]
    aliases: Vec<AliasRuleSpec>,
}

impl MatcherSpec {
    fn compile(self) -> Result<Matcher> {
        match self {
            MatcherSpec::Literal(literal) if literal.is_empty() => Err(
                SchoolError::InvalidRuleset("empty literal matcher".to_string()),
            ),
            MatcherSpec::Literal(literal) => Ok(Matcher::Literal(literal)),
            MatcherSpec::Pattern { pattern } => Matcher::pattern(&pattern),
        }
    }
}

// =============================================================================
// Ruleset
// =============================================================================

/// Ordered stage rules plus alias rules. Immutable once built.
#[derive(Debug, Clone)]
pub struct Ruleset {
    affiliation_marker: Option<Regex>,
    stages: Vec<StageRule>,
    aliases: Vec<AliasRule>,
}

impl Ruleset {
    /// The embedded table, parsed on first use.
    ///
    /// # Panics
    ///
    /// Panics if the embedded YAML is invalid, which the unit tests rule out.
    pub fn builtin() -> &'static Ruleset {
        BUILTIN_RULESET.get_or_init(|| {
            Ruleset::from_yaml_str(STAGE_RULES_YAML).expect("Failed to parse stage_rules.yaml")
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let spec: RulesetSpec = serde_yaml::from_str(yaml)?;

        let affiliation_marker = match spec.affiliation_marker.as_deref() {
            Some("") | None => None,
            Some(marker) => Some(Regex::new(marker)?),
        };

        let mut stages = Vec::with_capacity(spec.stages.len());
        for rule in spec.stages {
            let stage: Stage = rule.stage.parse()?;
            if stages.iter().any(|r: &StageRule| r.stage == stage) {
                return Err(SchoolError::InvalidRuleset(format!(
                    "stage '{}' listed twice",
                    stage
                )));
            }
            let matchers = rule
                .matchers
                .into_iter()
                .map(MatcherSpec::compile)
                .collect::<Result<Vec<_>>>()?;
            stages.push(StageRule { stage, matchers });
        }

        let aliases = spec
            .aliases
            .into_iter()
            .map(|alias| {
                let stages = alias
                    .stages
                    .iter()
                    .map(|s| s.parse())
                    .collect::<Result<Vec<Stage>>>()?;
                if stages.is_empty() {
                    return Err(SchoolError::InvalidRuleset(
                        "alias rule without stages".to_string(),
                    ));
                }
                Ok(AliasRule {
                    matcher: alias.matcher.compile()?,
                    stages,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            affiliation_marker,
            stages,
            aliases,
        })
    }

    pub fn stage_rules(&self) -> &[StageRule] {
        &self.stages
    }

    pub fn alias_rules(&self) -> &[AliasRule] {
        &self.aliases
    }

    /// Text the rules are evaluated on: the trimmed name, or whatever follows
    /// the first affiliation marker when the name has one. A name ending in
    /// the marker normalizes to the empty string.
    pub fn normalize<'a>(&self, name: &'a str) -> &'a str {
        let name = name.trim();
        let Some(marker) = &self.affiliation_marker else {
            return name;
        };
        match marker.find(name) {
            Some(m) => &name[m.end()..],
            None => name,
        }
    }

    /// Stages implied by the rules for one name, without the unknown fallback.
    pub fn matched_stages(&self, name: &str) -> StageSet {
        let text = self.normalize(name);
        let mut stages = StageSet::new();

        for rule in &self.stages {
            if rule.matches(text) {
                stages.insert(rule.stage);
            }
        }

        for alias in &self.aliases {
            if alias.matcher.matches(text) {
                for stage in &alias.stages {
                    stages.insert(*stage);
                }
            }
        }

        stages
    }
}
