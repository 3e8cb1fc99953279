//! School stage labels
//!
//! `Stage::ALL` fixes the canonical order used whenever a school carries more
//! than one stage. Rule evaluation order is a property of the ruleset and is
//! independent of this ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchoolError;

/// Separator between stage labels in the staged database column.
pub const STAGE_SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Stage {
    Primary,
    Middle,
    High,
    University,
    Unknown,
    Institution,
    Individual,
}

impl Stage {
    /// Canonical order.
    pub const ALL: [Stage; 7] = [
        Stage::Primary,
        Stage::Middle,
        Stage::High,
        Stage::University,
        Stage::Unknown,
        Stage::Institution,
        Stage::Individual,
    ];

    /// Position in [`Stage::ALL`].
    pub fn rank(self) -> usize {
        Self::ALL
            .iter()
            .position(|stage| *stage == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Label used in the database files.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Primary => "小学",
            Stage::Middle => "初中",
            Stage::High => "高中",
            Stage::University => "大学",
            Stage::Unknown => "未知",
            Stage::Institution => "机构",
            Stage::Individual => "个人",
        }
    }

    pub fn name_en(self) -> &'static str {
        match self {
            Stage::Primary => "primary",
            Stage::Middle => "middle",
            Stage::High => "high",
            Stage::University => "university",
            Stage::Unknown => "unknown",
            Stage::Institution => "institution",
            Stage::Individual => "individual",
        }
    }
}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = SchoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.label() == s || stage.name_en().eq_ignore_ascii_case(s))
            .ok_or_else(|| SchoolError::UnknownStage(s.to_string()))
    }
}

impl TryFrom<String> for Stage {
    type Error = SchoolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.label().to_string()
    }
}

/// Deduplicated set of stages kept in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageSet(Vec<Stage>);

impl StageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fallback result of a classification that matched nothing.
    pub fn unknown() -> Self {
        Self(vec![Stage::Unknown])
    }

    pub fn insert(&mut self, stage: Stage) {
        if let Err(pos) = self.0.binary_search_by_key(&stage.rank(), |s| s.rank()) {
            self.0.insert(pos, stage);
        }
    }

    pub fn union_with(&mut self, other: &StageSet) {
        for stage in other.iter() {
            self.insert(stage);
        }
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Stage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the staged column, e.g. `初中/高中`.
    pub fn parse_column(column: &str) -> Result<Self, SchoolError> {
        let mut set = StageSet::new();
        for label in column.split(STAGE_SEPARATOR).filter(|l| !l.trim().is_empty()) {
            set.insert(label.parse()?);
        }
        Ok(set)
    }

    pub fn to_column(&self) -> String {
        self.0
            .iter()
            .map(|stage| stage.label())
            .collect::<Vec<_>>()
            .join(&STAGE_SEPARATOR.to_string())
    }
}

impl FromIterator<Stage> for StageSet {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        let mut set = StageSet::new();
        for stage in iter {
            set.insert(stage);
        }
        set
    }
}

impl fmt::Display for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_column())
    }
}
