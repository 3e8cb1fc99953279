//! Batch reclassification of a whole store.

use tracing::info;

use crate::classifier::Classifier;
use crate::models::{DatabaseFormat, Stage};
use crate::store::SchoolStore;

/// Per-run statistics of [`reclassify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclassifyReport {
    pub records: usize,
    pub changed: usize,
    /// Lines that fell back to the unknown stage. They are re-rendered from
    /// the record in the input format, so fields appear trimmed.
    pub unknown: Vec<String>,
    /// Records whose province is not in the province table. Counted while
    /// loading, so [`reclassify`] leaves it at zero for the caller to fill.
    pub unknown_provinces: usize,
    /// Number of records carrying each stage, in canonical order.
    pub stage_counts: Vec<(Stage, usize)>,
}

/// Recompute the stages of every record from all of its names.
///
/// Stages read from a staged database are discarded first. The store's
/// format becomes [`DatabaseFormat::Staged`] so a following dump writes the
/// stage column.
pub fn reclassify(store: &mut SchoolStore, classifier: &Classifier<'_>) -> ReclassifyReport {
    let source_format = store.format();
    let mut report = ReclassifyReport {
        records: store.len(),
        ..ReclassifyReport::default()
    };
    let mut counts = [0usize; Stage::ALL.len()];

    for record in store.records_mut() {
        let raw_line = record.to_line(source_format);
        let result = classifier.classify_record(record, &raw_line);

        if result.stages != record.stages {
            report.changed += 1;
        }
        record.stages = result.stages;

        for stage in record.stages.iter() {
            counts[stage.rank()] += 1;
        }
        if result.fallback {
            report.unknown.push(raw_line);
        }
    }

    store.set_format(DatabaseFormat::Staged);

    report.stage_counts = Stage::ALL.iter().copied().zip(counts).collect();
    info!(
        records = report.records,
        changed = report.changed,
        unknown = report.unknown.len(),
        "reclassification finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = "\
北京,海淀,人大附中,人民大学附属中学
北京,海淀,中关村一小
上海,黄浦,某某村庄
北京,朝阳,某某编程俱乐部,某某初级学校
";

    #[test]
    fn test_reclassify_plain_database() {
        let mut store = SchoolStore::load(PLAIN, DatabaseFormat::Plain).unwrap();
        let report = reclassify(&mut store, &Classifier::builtin());

        assert_eq!(report.records, 4);
        assert_eq!(report.changed, 4);
        assert_eq!(report.unknown, vec!["上海,黄浦,某某村庄".to_string()]);
        assert_eq!(
            store.dump(),
            "\
北京,海淀,初中/高中,人大附中,人民大学附属中学
北京,海淀,小学,中关村一小
上海,黄浦,未知,某某村庄
北京,朝阳,初中/机构,某某编程俱乐部,某某初级学校
"
        );
    }

    #[test]
    fn test_stage_counts() {
        let mut store = SchoolStore::load(PLAIN, DatabaseFormat::Plain).unwrap();
        let report = reclassify(&mut store, &Classifier::builtin());
        let count = |stage: Stage| {
            report
                .stage_counts
                .iter()
                .find(|(s, _)| *s == stage)
                .map(|(_, n)| *n)
                .unwrap()
        };
        assert_eq!(count(Stage::Middle), 2);
        assert_eq!(count(Stage::High), 1);
        assert_eq!(count(Stage::Primary), 1);
        assert_eq!(count(Stage::Unknown), 1);
        assert_eq!(count(Stage::University), 0);
    }

    #[test]
    fn test_reclassify_staged_database_replaces_stages() {
        let staged = "北京,海淀,大学,人大附中\n北京,海淀,小学,中关村一小\n";
        let mut store = SchoolStore::load(staged, DatabaseFormat::Staged).unwrap();
        let report = reclassify(&mut store, &Classifier::builtin());
        assert_eq!(report.changed, 1);
        assert!(report.unknown.is_empty());
        assert_eq!(
            store.dump(),
            "北京,海淀,初中/高中,人大附中\n北京,海淀,小学,中关村一小\n"
        );
    }
}
