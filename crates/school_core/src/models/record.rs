//! One school row of the flat database.

use serde::{Deserialize, Serialize};

use super::stage::StageSet;
use crate::error::{Result, SchoolError};

/// Field delimiter of the database files.
pub const FIELD_DELIMITER: char = ',';

/// Column layout of a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseFormat {
    /// `province,city,name1[,name2,...]`
    #[default]
    Plain,
    /// `province,city,stage1/stage2,name1[,name2,...]`
    Staged,
}

impl DatabaseFormat {
    /// Number of columns before the first name.
    pub fn leading_columns(self) -> usize {
        match self {
            DatabaseFormat::Plain => 2,
            DatabaseFormat::Staged => 3,
        }
    }
}

/// A school: its region and every name it is known by.
///
/// `names[0]` is the canonical name, the rest are aliases in the order they
/// were accepted. The name list can only be changed through
/// [`crate::store::SchoolStore`], which keeps the name index in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolRecord {
    pub province: String,
    pub city: String,
    pub stages: StageSet,
    names: Vec<String>,
}

impl SchoolRecord {
    pub fn new(province: impl Into<String>, city: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            province: province.into(),
            city: city.into(),
            stages: StageSet::new(),
            names: vec![name.into()],
        }
    }

    /// Build a record from already split fields of line `line`.
    pub fn from_fields(fields: &[&str], format: DatabaseFormat, line: usize) -> Result<Self> {
        let malformed = |reason: &str| SchoolError::MalformedLine {
            line,
            content: fields.join(","),
            reason: reason.to_string(),
        };

        let leading = format.leading_columns();
        if fields.len() <= leading {
            return Err(malformed("expected at least one school name"));
        }

        let stages = match format {
            DatabaseFormat::Plain => StageSet::new(),
            DatabaseFormat::Staged => {
                StageSet::parse_column(fields[2]).map_err(|e| malformed(&e.to_string()))?
            }
        };

        let names: Vec<String> = fields[leading..].iter().map(|n| n.to_string()).collect();
        if names.iter().any(|n| n.is_empty()) {
            return Err(malformed("empty school name"));
        }

        Ok(Self {
            province: fields[0].to_string(),
            city: fields[1].to_string(),
            stages,
            names,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First name of the list, `None` only for a record emptied by a split.
    pub fn canonical_name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn aliases(&self) -> &[String] {
        self.names.get(1..).unwrap_or(&[])
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub(crate) fn push_name(&mut self, name: String) {
        self.names.push(name);
    }

    pub(crate) fn insert_name(&mut self, position: usize, name: String) {
        let position = position.min(self.names.len());
        self.names.insert(position, name);
    }

    pub(crate) fn remove_name(&mut self, name: &str) {
        self.names.retain(|n| n != name);
    }

    /// Serialize as one database line (no trailing newline).
    pub fn to_line(&self, format: DatabaseFormat) -> String {
        let mut fields: Vec<&str> = vec![self.province.as_str(), self.city.as_str()];
        let stages = self.stages.to_column();
        if format == DatabaseFormat::Staged {
            fields.push(&stages);
        }
        fields.extend(self.names.iter().map(String::as_str));
        fields.join(&FIELD_DELIMITER.to_string())
    }
}

/// Export shape of a classified school, consumed by the static bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSchool {
    pub name: String,
    pub province: String,
    pub city: String,
    pub stages: StageSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl From<&SchoolRecord> for ClassifiedSchool {
    fn from(record: &SchoolRecord) -> Self {
        Self {
            name: record.canonical_name().unwrap_or_default().to_string(),
            province: record.province.clone(),
            city: record.city.clone(),
            stages: record.stages.clone(),
            aliases: record.aliases().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    #[test]
    fn test_plain_fields() {
        let record =
            SchoolRecord::from_fields(&["北京", "海淀", "人大附中", "人民大学附中"], DatabaseFormat::Plain, 1)
                .unwrap();
        assert_eq!(record.canonical_name(), Some("人大附中"));
        assert_eq!(record.aliases(), &["人民大学附中".to_string()]);
        assert!(record.stages.is_empty());
        assert_eq!(record.to_line(DatabaseFormat::Plain), "北京,海淀,人大附中,人民大学附中");
    }

    #[test]
    fn test_staged_fields() {
        let record = SchoolRecord::from_fields(
            &["浙江", "杭州", "初中/高中", "杭州二中"],
            DatabaseFormat::Staged,
            7,
        )
        .unwrap();
        assert_eq!(record.stages.as_slice(), &[Stage::Middle, Stage::High]);
        assert_eq!(record.to_line(DatabaseFormat::Staged), "浙江,杭州,初中/高中,杭州二中");
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let err = SchoolRecord::from_fields(&["北京", "海淀"], DatabaseFormat::Plain, 4).unwrap_err();
        assert_eq!(err.line(), Some(4));

        let err =
            SchoolRecord::from_fields(&["北京", "海淀", "学前"], DatabaseFormat::Staged, 5).unwrap_err();
        assert!(matches!(err, SchoolError::MalformedLine { .. }));
    }

    #[test]
    fn test_classified_school_json() {
        let mut record = SchoolRecord::new("江苏", "南京", "南师附中");
        record.stages.insert(Stage::High);
        record.stages.insert(Stage::Middle);
        let json = serde_json::to_value(ClassifiedSchool::from(&record)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "南师附中",
                "province": "江苏",
                "city": "南京",
                "stages": ["初中", "高中"]
            })
        );
    }
}
