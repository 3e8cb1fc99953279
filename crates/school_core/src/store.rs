//! In-memory school database
//!
//! Ordered records plus a name index covering every canonical name and alias.
//! All name mutations go through [`SchoolStore`] so the index can never point
//! at a stale or duplicated name.

use csv::{ReaderBuilder, StringRecord, Trim};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{Result, SchoolError};
use crate::models::record::FIELD_DELIMITER;
use crate::models::{is_known_province, DatabaseFormat, SchoolRecord};

/// Position of a record inside the store.
pub type RecordId = usize;

/// Statistics collected while loading a database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub total_lines: usize,
    pub records: usize,
    pub skipped: usize,
    pub unknown_provinces: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SchoolStore {
    records: Vec<SchoolRecord>,
    index: FxHashMap<String, RecordId>,
    format: DatabaseFormat,
}

impl SchoolStore {
    pub fn new(format: DatabaseFormat) -> Self {
        Self {
            records: Vec::new(),
            index: FxHashMap::default(),
            format,
        }
    }

    /// Parse a whole database.
    ///
    /// Blank lines and lines starting with `#` or `,` are skipped. A name that
    /// appears twice anywhere in the file is a fatal [`SchoolError::DuplicateName`].
    pub fn load(text: &str, format: DatabaseFormat) -> Result<Self> {
        Self::load_with_stats(text, format).map(|(store, _)| store)
    }

    pub fn load_with_stats(text: &str, format: DatabaseFormat) -> Result<(Self, LoadStats)> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(FIELD_DELIMITER as u8)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut store = Self::new(format);
        let mut stats = LoadStats {
            total_lines: text.lines().count(),
            ..LoadStats::default()
        };

        let mut row = StringRecord::new();
        while reader.read_record(&mut row)? {
            let line = row.position().map(|p| p.line() as usize).unwrap_or(0);

            // blank, ",..." placeholder and indented '#' comment lines
            if row.get(0).map_or(true, |f| f.is_empty() || f.starts_with('#')) {
                continue;
            }

            let fields: Vec<&str> = row.iter().collect();
            let record = SchoolRecord::from_fields(&fields, format, line)?;

            if !is_known_province(&record.province) {
                stats.unknown_provinces += 1;
                warn!(line, "unknown province '{}': {}", record.province, fields.join(","));
            }

            store.push_record(record, line, &fields.join(","))?;
        }

        stats.records = store.len();
        // comments and blank lines never reach the loop, so count by difference
        stats.skipped = stats.total_lines.saturating_sub(stats.records);
        debug!(records = stats.records, skipped = stats.skipped, "school database loaded");

        Ok((store, stats))
    }

    /// One line per record, trailing newline.
    pub fn dump(&self) -> String {
        self.dump_as(self.format)
    }

    pub fn dump_as(&self, format: DatabaseFormat) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_line(format));
            out.push('\n');
        }
        out
    }

    pub fn format(&self) -> DatabaseFormat {
        self.format
    }

    pub fn set_format(&mut self, format: DatabaseFormat) {
        self.format = format;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SchoolRecord] {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&SchoolRecord> {
        self.records.get(id)
    }

    /// Record owning `name`, canonical or alias.
    pub fn lookup(&self, name: &str) -> Option<RecordId> {
        self.index.get(name).copied()
    }

    pub fn find(&self, name: &str) -> Option<&SchoolRecord> {
        self.lookup(name).and_then(|id| self.records.get(id))
    }

    pub fn name_count(&self) -> usize {
        self.index.len()
    }

    /// Mutable access to everything but the name list.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut SchoolRecord> {
        self.records.iter_mut()
    }

    // =========================================================================
    // Index-maintaining mutations
    // =========================================================================

    /// Append a record, registering all of its names.
    ///
    /// `line`/`content` only feed the error message.
    pub fn push_record(&mut self, record: SchoolRecord, line: usize, content: &str) -> Result<RecordId> {
        for (pos, name) in record.names().iter().enumerate() {
            let repeated_in_record = record.names()[..pos].contains(name);
            if repeated_in_record || self.index.contains_key(name) {
                return Err(SchoolError::DuplicateName {
                    line,
                    name: name.clone(),
                    content: content.to_string(),
                });
            }
        }

        let id = self.records.len();
        for name in record.names() {
            self.index.insert(name.clone(), id);
        }
        self.records.push(record);
        Ok(id)
    }

    /// Add `name` as trailing alias of record `id`.
    pub fn append_name(&mut self, id: RecordId, name: &str, line: usize, content: &str) -> Result<()> {
        self.insert_name(id, usize::MAX, name, line, content)
    }

    /// Insert `name` at `position` of record `id`'s name list (clamped to the end).
    pub fn insert_name(
        &mut self,
        id: RecordId,
        position: usize,
        name: &str,
        line: usize,
        content: &str,
    ) -> Result<()> {
        self.ensure_unused(name, line, content)?;
        let record = self.record_mut(id, line, content)?;
        record.insert_name(position, name.to_string());
        self.index.insert(name.to_string(), id);
        Ok(())
    }

    /// Move `name` out of record `origin` into a new record with the same region.
    ///
    /// Returns the id of the new record.
    pub fn split_name(&mut self, origin: RecordId, name: &str, line: usize, content: &str) -> Result<RecordId> {
        let record = self.record_mut(origin, line, content)?;
        let origin_name = record.canonical_name().unwrap_or_default().to_string();

        if !record.has_name(name) {
            return Err(SchoolError::NameNotInOrigin {
                line,
                name: name.to_string(),
                origin: origin_name,
                content: content.to_string(),
            });
        }
        if record.names().len() == 1 {
            return Err(SchoolError::EmptyOrigin {
                line,
                name: name.to_string(),
                origin: origin_name,
                content: content.to_string(),
            });
        }

        record.remove_name(name);
        let split = SchoolRecord::new(record.province.clone(), record.city.clone(), name);

        let id = self.records.len();
        self.records.push(split);
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    fn ensure_unused(&self, name: &str, line: usize, content: &str) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(SchoolError::DuplicateName {
                line,
                name: name.to_string(),
                content: content.to_string(),
            });
        }
        Ok(())
    }

    fn record_mut(&mut self, id: RecordId, line: usize, content: &str) -> Result<&mut SchoolRecord> {
        self.records.get_mut(id).ok_or_else(|| SchoolError::UnknownOrigin {
            line,
            origin: format!("#{}", id),
            content: content.to_string(),
        })
    }

    /// Check that the index covers exactly the names of the records.
    pub fn is_consistent(&self) -> bool {
        let total: usize = self.records.iter().map(|r| r.names().len()).sum();
        total == self.index.len()
            && self.records.iter().enumerate().all(|(id, record)| {
                record
                    .names()
                    .iter()
                    .all(|name| self.index.get(name) == Some(&id))
            })
    }
}
