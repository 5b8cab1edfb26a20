//! Highlight import and export
//!
//! JSON round-trips the full highlight record, serialized range
//! included. CSV is the flat interchange form with a fixed column order
//! (`id,text,pageNumber,x,y,width,height,color,timestamp`); ranges do
//! not survive a CSV round trip, so re-imported rows keep their position
//! rectangle but can no longer re-anchor into the text layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::NormalizedRect;

use super::types::Highlight;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not valid UTF-8")]
    CsvEncoding,
}

pub fn export_json(highlights: &[Highlight]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(highlights)?)
}

pub fn import_json(data: &str) -> Result<Vec<Highlight>, ExportError> {
    Ok(serde_json::from_str(data)?)
}

/// Flat CSV row; field order here is the column order on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    id: String,
    text: String,
    #[serde(rename = "pageNumber")]
    page_number: usize,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    color: String,
    timestamp: i64,
}

impl From<&Highlight> for CsvRow {
    fn from(highlight: &Highlight) -> Self {
        Self {
            id: highlight.id.clone(),
            text: highlight.text.clone(),
            page_number: highlight.page_number,
            x: highlight.position.x,
            y: highlight.position.y,
            width: highlight.position.width,
            height: highlight.position.height,
            color: highlight.color.clone(),
            timestamp: highlight.timestamp,
        }
    }
}

impl From<CsvRow> for Highlight {
    fn from(row: CsvRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            color: row.color,
            position: NormalizedRect {
                x: row.x,
                y: row.y,
                width: row.width,
                height: row.height,
            },
            page_number: row.page_number,
            timestamp: row.timestamp,
            serialized_range: None,
        }
    }
}

pub fn export_csv(highlights: &[Highlight]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for highlight in highlights {
        writer.serialize(CsvRow::from(highlight))?;
    }
    let bytes = writer.into_inner().map_err(|_| ExportError::CsvEncoding)?;
    String::from_utf8(bytes).map_err(|_| ExportError::CsvEncoding)
}

pub fn import_csv(data: &str) -> Result<Vec<Highlight>, ExportError> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut highlights = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        highlights.push(row?.into());
    }
    Ok(highlights)
}
