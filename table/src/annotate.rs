use std::{fs::File, io::ErrorKind, path::Path};

use indexmap::IndexMap;
use taxo_resolve::{MatchLevel, ResolutionRecord};
use tracing::warn;

use crate::dataset::{FoodTable, TableError};

/// Columns appended to the dataset, in output order.
pub const ANNOTATION_COLUMNS: [&str; 8] = [
    "Primary Matched Name",
    "Synonyms",
    "OTT ID",
    "Rank",
    "Match Query",
    "Match Level",
    "Approximate Match",
    "Is Synonym Input",
];

/// The original dataset with the annotation columns appended to every row.
#[derive(Debug)]
pub struct AnnotatedTable {
    headers: csv::StringRecord,
    units: Option<csv::StringRecord>,
    rows: Vec<csv::StringRecord>,
    level_index: usize,
}

/// Left-joins the resolution map onto every row of the table by its name
/// cell. Rows sharing a name receive identical annotation fields; rows
/// without a usable name receive blank ones. A usable name absent from the
/// map (which the cascade should prevent) is flagged as a processing error.
#[must_use]
pub fn annotate(
    table: &FoodTable,
    records: &IndexMap<String, ResolutionRecord>,
) -> AnnotatedTable {
    let base_width = table.headers().len();
    let mut headers = pad(table.headers(), base_width);
    for column in ANNOTATION_COLUMNS {
        headers.push_field(column);
    }
    let units = table.units().map(|units| {
        let mut padded = pad(units, base_width);
        for _ in ANNOTATION_COLUMNS {
            padded.push_field("");
        }
        padded
    });
    let mut rows = Vec::with_capacity(table.row_count());
    for row in table.rows() {
        let mut out = pad(row, base_width);
        match table.name_of(row) {
            Some(name) => match records.get(name) {
                Some(record) => push_record_fields(&mut out, record),
                None => {
                    warn!(name, "name missing from resolution map");
                    push_error_fields(&mut out);
                }
            },
            None => {
                for _ in ANNOTATION_COLUMNS {
                    out.push_field("");
                }
            }
        }
        rows.push(out);
    }
    AnnotatedTable {
        headers,
        units,
        rows,
        level_index: base_width + 5,
    }
}

impl AnnotatedTable {
    /// Writes the annotated dataset as CSV, preserving row order and
    /// re-emitting the units row.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| {
            if err.kind() == ErrorKind::PermissionDenied {
                TableError::PermissionDenied {
                    path: path.to_path_buf(),
                }
            } else {
                TableError::Io(err)
            }
        })?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(&self.headers)?;
        if let Some(units) = &self.units {
            writer.write_record(units)?;
        }
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Number of data rows; always equal to the source table's.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Annotated rows, in source order.
    #[must_use]
    pub fn rows(&self) -> &[csv::StringRecord] {
        &self.rows
    }

    /// Header row including the annotation columns.
    #[must_use]
    pub const fn headers(&self) -> &csv::StringRecord {
        &self.headers
    }

    /// Frequency of data rows by match level, descending by count.
    #[must_use]
    pub fn summary(&self) -> MatchSummary {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for row in &self.rows {
            let label = match row.get(self.level_index) {
                Some(level) if !level.is_empty() => level.to_string(),
                _ => "(none)".to_string(),
            };
            *counts.entry(label).or_insert(0) += 1;
        }
        let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        MatchSummary { entries }
    }
}

/// Row counts per match level, for the end-of-run report.
#[derive(Debug, Clone)]
pub struct MatchSummary {
    entries: Vec<(String, usize)>,
}

impl MatchSummary {
    /// Label/count pairs, most frequent first.
    #[must_use]
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }
}

fn pad(record: &csv::StringRecord, width: usize) -> csv::StringRecord {
    let mut out = csv::StringRecord::new();
    for field in record {
        out.push_field(field);
    }
    for _ in record.len()..width {
        out.push_field("");
    }
    out
}

fn push_record_fields(out: &mut csv::StringRecord, record: &ResolutionRecord) {
    out.push_field(record.matched_name.as_deref().unwrap_or(""));
    out.push_field(&record.joined_synonyms());
    out.push_field(&record.taxon_id.map(|id| id.to_string()).unwrap_or_default());
    out.push_field(record.rank.as_deref().unwrap_or(""));
    out.push_field(&record.match_query);
    out.push_field(record.match_level.label());
    out.push_field(&record.is_approximate.to_string());
    out.push_field(&record.is_synonym_input.to_string());
}

fn push_error_fields(out: &mut csv::StringRecord) {
    for _ in 0..5 {
        out.push_field("");
    }
    out.push_field(MatchLevel::ProcessingError.label());
    out.push_field("false");
    out.push_field("false");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
Food Code,Scientific Name
,unit-row
R001,Oryza sativa L.
R002,Oryza sativa L.
M001,Mangifera indica
X001,
";

    fn sample_table() -> (tempfile::TempDir, FoodTable) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foods.csv");
        fs::write(&path, SAMPLE).unwrap();
        let table = FoodTable::load(&path, "Scientific Name").unwrap();
        (dir, table)
    }

    fn resolved(name: &str, id: u64) -> ResolutionRecord {
        ResolutionRecord {
            matched_name: Some(name.to_string()),
            synonyms: vec!["Alt one".into(), "Alt two".into()],
            taxon_id: Some(id),
            rank: Some("species".into()),
            match_query: name.to_string(),
            match_level: MatchLevel::SpeciesOriginal,
            is_approximate: false,
            is_synonym_input: true,
        }
    }

    #[test]
    fn join_preserves_row_count_and_order() {
        let (_dir, table) = sample_table();
        let mut records = IndexMap::new();
        records.insert("Oryza sativa L.".to_string(), resolved("Oryza sativa", 1));
        let annotated = annotate(&table, &records);
        assert_eq!(annotated.row_count(), table.row_count());
        assert_eq!(annotated.rows()[0].get(0), Some("R001"));
        assert_eq!(annotated.rows()[3].get(0), Some("X001"));
    }

    #[test]
    fn rows_sharing_a_name_get_identical_annotations() {
        let (_dir, table) = sample_table();
        let mut records = IndexMap::new();
        records.insert("Oryza sativa L.".to_string(), resolved("Oryza sativa", 1));
        let annotated = annotate(&table, &records);
        let first: Vec<&str> = annotated.rows()[0].iter().skip(2).collect();
        let second: Vec<&str> = annotated.rows()[1].iter().skip(2).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "Oryza sativa");
        assert_eq!(first[1], "Alt one; Alt two");
        assert_eq!(first[2], "1");
        assert_eq!(first[7], "true");
    }

    #[test]
    fn blank_names_get_blank_annotations() {
        let (_dir, table) = sample_table();
        let annotated = annotate(&table, &IndexMap::new());
        let blank_row = &annotated.rows()[3];
        assert!(blank_row.iter().skip(2).all(str::is_empty));
    }

    #[test]
    fn unmapped_name_is_flagged_as_processing_error() {
        let (_dir, table) = sample_table();
        let mut records = IndexMap::new();
        records.insert("Oryza sativa L.".to_string(), resolved("Oryza sativa", 1));
        let annotated = annotate(&table, &records);
        let mango = &annotated.rows()[2];
        assert_eq!(mango.get(7), Some("Processing Error"));
    }

    #[test]
    fn save_round_trips_with_units_row() {
        let (dir, table) = sample_table();
        let mut records = IndexMap::new();
        records.insert("Oryza sativa L.".to_string(), resolved("Oryza sativa", 1));
        records.insert(
            "Mangifera indica".to_string(),
            resolved("Mangifera indica", 2),
        );
        let annotated = annotate(&table, &records);
        let out_path = dir.path().join("out.csv");
        annotated.save(&out_path).unwrap();

        let written = fs::read_to_string(&out_path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        // Header + units + four data rows: identical to the input line count.
        assert_eq!(lines.len(), SAMPLE.lines().count());
        assert!(lines[0].ends_with("Approximate Match,Is Synonym Input"));
        assert!(lines[1].starts_with(",unit-row"));
    }

    #[test]
    fn summary_counts_by_level_descending() {
        let (_dir, table) = sample_table();
        let mut records = IndexMap::new();
        records.insert("Oryza sativa L.".to_string(), resolved("Oryza sativa", 1));
        records.insert(
            "Mangifera indica".to_string(),
            ResolutionRecord::placeholder("Mangifera indica", MatchLevel::NoMatchFinal),
        );
        let annotated = annotate(&table, &records);
        let summary = annotated.summary();
        assert_eq!(
            summary.entries()[0],
            ("Species - Original".to_string(), 2)
        );
        assert!(summary
            .entries()
            .contains(&("No Match Final".to_string(), 1)));
        assert!(summary.entries().contains(&("(none)".to_string(), 1)));
    }
}
