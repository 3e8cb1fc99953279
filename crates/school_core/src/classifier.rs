//! Stage classifier
//!
//! Maps free-text school names to stage sets using a [`Ruleset`]. A name the
//! rules say nothing about is classified as [`Stage::Unknown`] and reported
//! at warn level; that is the designed fallback, not an error.

use tracing::warn;

use crate::models::{SchoolRecord, Stage, StageSet};
use crate::ruleset::Ruleset;

#[derive(Debug, Clone, Copy)]
pub struct Classifier<'r> {
    ruleset: &'r Ruleset,
}

impl Classifier<'static> {
    /// Classifier over the embedded ruleset.
    pub fn builtin() -> Self {
        Self::new(Ruleset::builtin())
    }
}

impl<'r> Classifier<'r> {
    pub fn new(ruleset: &'r Ruleset) -> Self {
        Self { ruleset }
    }

    pub fn ruleset(&self) -> &'r Ruleset {
        self.ruleset
    }

    /// Stages of a single name, `[unknown]` when nothing matches.
    pub fn classify(&self, name: &str) -> StageSet {
        let stages = self.ruleset.matched_stages(name);
        if stages.is_empty() {
            warn!(school = name, "unknown school stage: {}", name);
            return StageSet::unknown();
        }
        stages
    }

    /// Union of the stages of every name of `record`.
    ///
    /// Falls back to `[unknown]` only when no name matched; `raw_line` is what
    /// gets reported for manual follow-up. The reclassifier passes the line
    /// re-rendered by [`SchoolRecord::to_line`], so fields appear trimmed and
    /// not byte-for-byte as they were read.
    pub fn classify_record(&self, record: &SchoolRecord, raw_line: &str) -> Classification {
        let mut stages = StageSet::new();
        for name in record.names() {
            stages.union_with(&self.ruleset.matched_stages(name));
        }

        if stages.is_empty() {
            warn!(line = raw_line, "unknown school stage: {}", raw_line);
            return Classification {
                stages: StageSet::unknown(),
                fallback: true,
            };
        }

        Classification {
            stages,
            fallback: false,
        }
    }
}

/// Result of classifying a whole record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub stages: StageSet,
    /// `true` when `stages` is the unknown fallback.
    pub fallback: bool,
}

impl Classification {
    pub fn is_unknown(&self) -> bool {
        self.fallback || self.stages.as_slice() == [Stage::Unknown]
    }
}
