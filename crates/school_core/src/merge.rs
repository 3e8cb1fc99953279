//! Merge command interpreter
//!
//! Applies reviewed merge instructions to a [`SchoolStore`]. One command per
//! line, space separated:
//!
//! | line                         | effect                                             |
//! |------------------------------|----------------------------------------------------|
//! | `b <name> <origin>`          | add `name` as trailing alias of `origin`           |
//! | `f <name> <origin>`          | insert `name` right after the first name of `origin` |
//! | `c <province> <city> <name>` | create a new school                                |
//! | `s <name> <origin>`          | move `name` out of `origin` into a new school      |
//!
//! Commands run in file order on a working copy of the store. The copy only
//! replaces the caller's store once every command has succeeded, so a failing
//! script leaves the input untouched.

use std::fmt;

use tracing::{debug, info};

use crate::error::{Result, SchoolError};
use crate::models::record::FIELD_DELIMITER;
use crate::models::SchoolRecord;
use crate::store::SchoolStore;

/// Position of a promoted name inside the name list.
pub const PROMOTE_POSITION: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeCommand {
    BindAlias { name: String, origin: String },
    Promote { name: String, origin: String },
    Create { province: String, city: String, name: String },
    Split { name: String, origin: String },
}

impl MergeCommand {
    /// Parse one command line. Blank and `#` lines yield `Ok(None)`.
    pub fn parse(line: &str, line_no: usize) -> Result<Option<Self>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let malformed = |reason: String| SchoolError::MalformedLine {
            line: line_no,
            content: trimmed.to_string(),
            reason,
        };

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let (opcode, args) = (parts[0], &parts[1..]);
        let expected = match opcode {
            "b" | "f" | "s" => 2,
            "c" => 3,
            other => return Err(malformed(format!("unknown command '{}'", other))),
        };
        if args.len() != expected {
            return Err(malformed(format!(
                "'{}' takes {} arguments, found {}",
                opcode,
                expected,
                args.len()
            )));
        }

        if let Some(bad) = args.iter().find(|a| a.contains(FIELD_DELIMITER)) {
            return Err(malformed(format!(
                "'{}' contains the field delimiter '{}'",
                bad, FIELD_DELIMITER
            )));
        }
        // a leading '#' would turn the dumped row into a comment
        if opcode == "c" && args[0].starts_with('#') {
            return Err(malformed(format!("province '{}' starts with '#'", args[0])));
        }

        let arg = |i: usize| args[i].to_string();
        let command = match opcode {
            "b" => MergeCommand::BindAlias { name: arg(0), origin: arg(1) },
            "f" => MergeCommand::Promote { name: arg(0), origin: arg(1) },
            "s" => MergeCommand::Split { name: arg(0), origin: arg(1) },
            _ => MergeCommand::Create { province: arg(0), city: arg(1), name: arg(2) },
        };
        Ok(Some(command))
    }

    pub fn opcode(&self) -> char {
        match self {
            MergeCommand::BindAlias { .. } => 'b',
            MergeCommand::Promote { .. } => 'f',
            MergeCommand::Create { .. } => 'c',
            MergeCommand::Split { .. } => 's',
        }
    }
}

impl fmt::Display for MergeCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MergeCommand::BindAlias { name, origin }
            | MergeCommand::Promote { name, origin }
            | MergeCommand::Split { name, origin } => {
                write!(f, "{} {} {}", self.opcode(), name, origin)
            }
            MergeCommand::Create { province, city, name } => {
                write!(f, "c {} {} {}", province, city, name)
            }
        }
    }
}

/// A command together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub line: usize,
    pub command: MergeCommand,
}

/// A parsed command file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeScript {
    pub lines: Vec<ScriptLine>,
}

impl MergeScript {
    /// Parse every line; the first malformed line aborts.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            if let Some(command) = MergeCommand::parse(raw, idx + 1)? {
                lines.push(ScriptLine { line: idx + 1, command });
            }
        }
        Ok(Self { lines })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Counts of applied commands by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub bound: usize,
    pub promoted: usize,
    pub created: usize,
    pub split: usize,
}

impl MergeSummary {
    pub fn total(&self) -> usize {
        self.bound + self.promoted + self.created + self.split
    }
}

/// Apply `script` to `store`.
///
/// On error `store` is left exactly as it was and the error names the
/// offending command line.
pub fn apply(script: &MergeScript, store: &mut SchoolStore) -> Result<MergeSummary> {
    let mut staged = store.clone();
    let mut summary = MergeSummary::default();

    for entry in &script.lines {
        apply_command(&mut staged, entry, &mut summary)?;
    }

    *store = staged;
    info!(
        bound = summary.bound,
        promoted = summary.promoted,
        created = summary.created,
        split = summary.split,
        "merge commands applied"
    );
    Ok(summary)
}

fn apply_command(store: &mut SchoolStore, entry: &ScriptLine, summary: &mut MergeSummary) -> Result<()> {
    let line = entry.line;
    let content = entry.command.to_string();

    let resolve = |store: &SchoolStore, origin: &str| {
        store.lookup(origin).ok_or_else(|| SchoolError::UnknownOrigin {
            line,
            origin: origin.to_string(),
            content: content.clone(),
        })
    };

    match &entry.command {
        MergeCommand::BindAlias { name, origin } => {
            let id = resolve(store, origin)?;
            store.append_name(id, name, line, &content)?;
            summary.bound += 1;
        }
        MergeCommand::Promote { name, origin } => {
            let id = resolve(store, origin)?;
            store.insert_name(id, PROMOTE_POSITION, name, line, &content)?;
            summary.promoted += 1;
        }
        MergeCommand::Create { province, city, name } => {
            let record = SchoolRecord::new(province.as_str(), city.as_str(), name.as_str());
            store.push_record(record, line, &content)?;
            summary.created += 1;
        }
        MergeCommand::Split { name, origin } => {
            let id = resolve(store, origin)?;
            store.split_name(id, name, line, &content)?;
            summary.split += 1;
        }
    }

    debug!(line, command = %content, "applied merge command");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatabaseFormat;

    fn store(text: &str) -> SchoolStore {
        SchoolStore::load(text, DatabaseFormat::Plain).unwrap()
    }

    fn names(store: &SchoolStore, id: usize) -> Vec<&str> {
        store.records()[id].names().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(MergeCommand::parse("  ", 1).unwrap(), None);
        assert_eq!(MergeCommand::parse("# b x y", 1).unwrap(), None);
        assert_eq!(
            MergeCommand::parse("b 一中附中 一中", 1).unwrap(),
            Some(MergeCommand::BindAlias {
                name: "一中附中".to_string(),
                origin: "一中".to_string()
            })
        );
        assert_eq!(
            MergeCommand::parse("c 北京 海淀 示例学校附中", 1).unwrap().unwrap().to_string(),
            "c 北京 海淀 示例学校附中"
        );
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        let err = MergeCommand::parse("x 一中 二中", 4).unwrap_err();
        assert_eq!(err.line(), Some(4));
        assert!(MergeCommand::parse("b 一中", 1).is_err());
        assert!(MergeCommand::parse("c 北京 海淀", 1).is_err());
        assert!(MergeCommand::parse("s a b c", 1).is_err());
        assert!(MergeCommand::parse("c #北京 海淀 一中", 1).is_err());
    }

    #[test]
    fn test_delimiter_in_argument_is_rejected() {
        let lines = [
            "b 甲,二中 一中",
            "f 甲 一,中",
            "c 北京,海淀 海淀 一中",
            "c 北京 海,淀 一中",
            "s 甲,乙 一中",
        ];
        for line in lines {
            let err = MergeCommand::parse(line, 2).unwrap_err();
            assert!(matches!(err, SchoolError::MalformedLine { line: 2, .. }), "{line}");
        }
    }

    #[test]
    fn test_merged_store_reloads() {
        let mut store = store("北京,海淀,一中\n北京,海淀,二中\n");
        assert!(MergeScript::parse("b 甲,二中 一中").is_err());

        let script = MergeScript::parse("b 甲 一中\nf 乙 二中\nc 上海 徐汇 丙\ns 甲 一中\n").unwrap();
        apply(&script, &mut store).unwrap();
        let reloaded = SchoolStore::load(&store.dump(), DatabaseFormat::Plain).unwrap();
        assert_eq!(reloaded.dump(), store.dump());
        assert!(reloaded.is_consistent());
    }

    #[test]
    fn test_script_keeps_line_numbers() {
        let script = MergeScript::parse("# header\n\nb 一中附中 一中\nf 新名 旧名\n").unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script.lines[0].line, 3);
        assert_eq!(script.lines[1].line, 4);
    }

    #[test]
    fn test_bind_alias() {
        let mut store = store("北京,海淀,一中\n");
        let script = MergeScript::parse("b 一中附中 一中").unwrap();
        let summary = apply(&script, &mut store).unwrap();
        assert_eq!(summary.bound, 1);
        assert_eq!(names(&store, 0), vec!["一中", "一中附中"]);
        assert_eq!(store.lookup("一中附中"), Some(0));
    }

    #[test]
    fn test_promote_inserts_at_second_position() {
        let mut store = store("北京,海淀,旧名,已知别名\n");
        let script = MergeScript::parse("f 新名 旧名").unwrap();
        apply(&script, &mut store).unwrap();
        assert_eq!(names(&store, 0), vec!["旧名", "新名", "已知别名"]);
        assert_eq!(store.lookup("新名"), Some(0));
    }

    #[test]
    fn test_promote_resolves_through_alias() {
        let mut store = store("北京,海淀,旧名,已知别名\n");
        let script = MergeScript::parse("f 新名 已知别名").unwrap();
        apply(&script, &mut store).unwrap();
        assert_eq!(names(&store, 0), vec!["旧名", "新名", "已知别名"]);
    }

    #[test]
    fn test_create_then_split() {
        let mut store = store("北京,朝阳,八十中\n");
        let script = MergeScript::parse(
            "c 北京 海淀 示例学校附中\nb 示例学校附中学 示例学校附中\ns 示例学校附中学 示例学校附中\n",
        )
        .unwrap();
        let summary = apply(&script, &mut store).unwrap();
        assert_eq!(summary.total(), 3);
        assert_eq!(store.len(), 3);
        assert_eq!(names(&store, 1), vec!["示例学校附中"]);
        assert_eq!(names(&store, 2), vec!["示例学校附中学"]);
        assert_eq!(store.records()[2].city, "海淀");
        assert_eq!(store.lookup("示例学校附中学"), Some(2));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_self_split_of_only_name_is_rejected() {
        let mut store = store("北京,朝阳,八十中\n");
        let script =
            MergeScript::parse("c 北京 海淀 示例学校附中\ns 示例学校附中 示例学校附中\n").unwrap();
        let err = apply(&script, &mut store).unwrap_err();
        assert!(matches!(err, SchoolError::EmptyOrigin { line: 2, .. }));
        assert!(err.is_fatal());
        // nothing from the failed run is kept
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("示例学校附中"), None);
    }

    #[test]
    fn test_split_of_canonical_name() {
        let mut store = store("北京,海淀,甲校,乙校\n");
        let script = MergeScript::parse("s 甲校 甲校").unwrap();
        apply(&script, &mut store).unwrap();
        assert_eq!(names(&store, 0), vec!["乙校"]);
        assert_eq!(names(&store, 1), vec!["甲校"]);
        assert_eq!(store.lookup("甲校"), Some(1));
    }

    #[test]
    fn test_missing_origin_is_fatal() {
        let mut store = store("北京,海淀,一中\n");
        let script = MergeScript::parse("b 甲 一中\nb 乙 不存在\n").unwrap();
        let err = apply(&script, &mut store).unwrap_err();
        match &err {
            SchoolError::UnknownOrigin { line, origin, content } => {
                assert_eq!(*line, 2);
                assert_eq!(origin, "不存在");
                assert_eq!(content, "b 乙 不存在");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(names(&store, 0), vec!["一中"]);
    }

    #[test]
    fn test_split_requires_name_in_origin() {
        let mut store = store("北京,海淀,甲校,乙校\n北京,朝阳,丙校\n");
        let script = MergeScript::parse("s 丙校 甲校").unwrap();
        assert!(matches!(
            apply(&script, &mut store),
            Err(SchoolError::NameNotInOrigin { .. })
        ));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut store = store("北京,海淀,一中\n北京,朝阳,二中\n");
        for line in ["c 北京 西城 一中", "b 二中 一中", "f 二中 一中"] {
            let script = MergeScript::parse(line).unwrap();
            assert!(matches!(
                apply(&script, &mut store),
                Err(SchoolError::DuplicateName { .. })
            ));
        }
        assert!(store.is_consistent());
    }

    #[test]
    fn test_later_commands_see_earlier_ones() {
        let mut store = store("北京,海淀,一中\n");
        let script = MergeScript::parse("b 甲 一中\nb 乙 甲\nf 丙 乙\n").unwrap();
        apply(&script, &mut store).unwrap();
        assert_eq!(names(&store, 0), vec!["一中", "丙", "甲", "乙"]);
        assert!(store.is_consistent());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        const NAMES: [&str; 6] = ["一中", "二中", "甲", "乙", "丙", "丁"];

        fn command_line() -> impl Strategy<Value = String> {
            (0usize..4, 0..NAMES.len(), 0..NAMES.len(), 0usize..2).prop_map(|(op, a, b, p)| {
                let (name, origin) = (NAMES[a], NAMES[b]);
                match op {
                    0 => format!("b {} {}", name, origin),
                    1 => format!("f {} {}", name, origin),
                    2 => format!("c {} 某市 {}", ["北京", "上海"][p], name),
                    _ => format!("s {} {}", name, origin),
                }
            })
        }

        proptest! {
            /// Property: accepted commands keep names unique and the dump loadable
            #[test]
            fn prop_merges_keep_names_unique(lines in proptest::collection::vec(command_line(), 0..16)) {
                let mut store = store("北京,海淀,一中\n北京,海淀,二中\n");
                for line in &lines {
                    let script = MergeScript::parse(line).unwrap();
                    // rejected commands leave the store as it was
                    let _ = apply(&script, &mut store);
                    prop_assert!(store.is_consistent());
                }

                let reloaded = SchoolStore::load(&store.dump(), DatabaseFormat::Plain);
                prop_assert!(reloaded.is_ok());
                let reloaded = reloaded.unwrap();
                prop_assert_eq!(reloaded.dump(), store.dump());
                prop_assert_eq!(reloaded.name_count(), store.name_count());
            }
        }
    }
}
