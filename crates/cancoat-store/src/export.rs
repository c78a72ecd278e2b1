//! Delimited-file export of retrieved and classified patents.

use std::fs::{self, File};
use std::path::Path;

use cancoat_core::{ClassifiedPatent, PatentRecord};
use tracing::info;

use crate::StoreError;

pub const CPC_SEPARATOR: &str = "; ";

const BASE_COLUMNS: [&str; 10] = [
    "publication_number",
    "publication_date",
    "title",
    "abstract",
    "assignee",
    "cpc_codes",
    "description",
    "first_claim",
    "coating_type",
    "classification_confidence",
];
const ERA_COLUMN: &str = "era";

/// Header row for an export, with or without the era column.
pub fn columns(include_era: bool) -> Vec<&'static str> {
    let mut cols = BASE_COLUMNS.to_vec();
    if include_era {
        cols.push(ERA_COLUMN);
    }
    cols
}

/// Write records as they came from retrieval. Classification cells are empty
/// and there is never an era column.
pub fn write_raw(path: &Path, records: &[PatentRecord]) -> Result<(), StoreError> {
    let mut writer = open(path, false)?;
    for record in records {
        writer.write_record(record_cells(record, None, None))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "wrote raw export");
    Ok(())
}

/// Write classified records, appending the era column when `include_era`.
pub fn write_classified(
    path: &Path,
    patents: &[ClassifiedPatent],
    include_era: bool,
) -> Result<(), StoreError> {
    let mut writer = open(path, include_era)?;
    for patent in patents {
        let c = &patent.classification;
        let mut cells = record_cells(
            &patent.record,
            c.coating_type.clone(),
            c.confidence.map(|v| v.to_string()),
        );
        if include_era {
            cells.push(c.era.map(|e| e.as_str().to_string()).unwrap_or_default());
        }
        writer.write_record(cells)?;
    }
    writer.flush()?;
    info!(
        path = %path.display(),
        rows = patents.len(),
        include_era,
        "wrote classified export"
    );
    Ok(())
}

fn open(path: &Path, include_era: bool) -> Result<csv::Writer<File>, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(columns(include_era))?;
    Ok(writer)
}

fn record_cells(
    record: &PatentRecord,
    coating_type: Option<String>,
    confidence: Option<String>,
) -> Vec<String> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    vec![
        record.publication_number.clone(),
        text(&record.publication_date),
        text(&record.title),
        text(&record.abstract_text),
        text(&record.assignee),
        record.cpc_codes.join(CPC_SEPARATOR),
        text(&record.description),
        text(&record.first_claim),
        coating_type.unwrap_or_default(),
        confidence.unwrap_or_default(),
    ]
}
