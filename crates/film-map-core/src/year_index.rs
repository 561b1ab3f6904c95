use crate::extract::FilmRecord;
use log::info;
use std::collections::BTreeMap;

/// Region → title for a single release year.
///
/// Regions that appear more than once keep the title seen last.
pub type YearIndex = BTreeMap<String, String>;

pub fn index_by_year(records: &[FilmRecord], year: u32) -> YearIndex {
    let mut index = YearIndex::new();
    for record in records {
        if record.year_value() == Some(year) {
            index.insert(record.region.clone(), record.title.clone());
        }
    }
    info!(
        "Built year index — year={} records={} regions={}",
        year,
        records.len(),
        index.len()
    );
    index
}
