//! # school_core - School Registry Engine
//!
//! Keeps the flat school database (`province,city,name[,alias...]`) and the
//! two batch workflows over it:
//!
//! - stage classification of school names with an ordered, data-driven ruleset
//! - reviewed merge commands (bind alias, promote, create, split)
//!
//! ```rust
//! use school_core::{Classifier, DatabaseFormat, MergeScript, SchoolStore, Stage};
//!
//! let mut store = SchoolStore::load("北京,海淀,一中\n", DatabaseFormat::Plain).unwrap();
//! let script = MergeScript::parse("b 一中附中 一中").unwrap();
//! school_core::merge::apply(&script, &mut store).unwrap();
//! assert_eq!(store.dump(), "北京,海淀,一中,一中附中\n");
//!
//! let stages = Classifier::builtin().classify("一中附中");
//! assert_eq!(stages.as_slice(), &[Stage::Middle, Stage::High]);
//! ```

pub mod classifier;
pub mod error;
pub mod merge;
pub mod models;
pub mod reclassify;
pub mod ruleset;
pub mod store;

pub use classifier::{Classification, Classifier};
pub use error::{Result, SchoolError};
pub use merge::{MergeCommand, MergeScript, MergeSummary};
pub use models::{ClassifiedSchool, DatabaseFormat, SchoolRecord, Stage, StageSet};
pub use reclassify::{reclassify, ReclassifyReport};
pub use ruleset::{Matcher, Ruleset};
pub use store::{LoadStats, SchoolStore};
