//! Spreadsheet export connector.
//!
//! Reads case-manager exports: an Excel/ODS workbook whose first row holds
//! the column headers, or a `.json` file holding an array of row objects.
//! The file is re-read on every fetch so edits to the export are picked
//! up without a restart.
//!
//! # Configuration
//!
//! ```toml
//! [sources.spreadsheet]
//! path = "ExcelFiles/row_1.xlsx"
//! # sheet = "Sheet1"     # defaults to the first worksheet
//! ```
//!
//! Rows are filtered in process after header normalization: names match
//! trimmed and case-insensitively, identifiers match trimmed and exactly.

use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::SpreadsheetSourceConfig;
use crate::error::{Error, Result};
use crate::models::{value_text, RawRecord, SourceKind, SourceQuery};
use crate::normalize::normalize_record;
use crate::traits::RecordSource;

/// A spreadsheet export adapter implementing [`RecordSource`].
pub struct SpreadsheetSource {
    config: SpreadsheetSourceConfig,
}

impl SpreadsheetSource {
    pub fn new(config: SpreadsheetSourceConfig) -> Self {
        Self { config }
    }

    async fn load(&self) -> Result<Vec<RawRecord>> {
        let path = self.config.path.clone();
        let sheet = self.config.sheet.clone();
        tokio::task::spawn_blocking(move || read_rows(&path, sheet.as_deref()))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl RecordSource for SpreadsheetSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Spreadsheet
    }

    fn description(&self) -> &str {
        "Case-manager spreadsheet export"
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawRecord>> {
        let filter = query
            .filter()
            .ok_or_else(|| Error::InvalidInput("query needs a name or identifier".to_string()))?;

        let rows = self.load().await?;
        Ok(rows
            .into_iter()
            .filter(|row| filter.matches(&normalize_record(row.clone())))
            .collect())
    }

    async fn health_check(&self) -> Result<String> {
        let rows = self.load().await?;
        Ok(format!(
            "{} rows in {}",
            rows.len(),
            self.config.path.display()
        ))
    }
}

/// Reads every data row of the export, keyed by its header spelling.
pub fn read_rows(path: &Path, sheet: Option<&str>) -> Result<Vec<RawRecord>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => read_json_rows(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_rows(path, sheet),
        other => Err(Error::Config(format!(
            "unsupported spreadsheet format '{}': {}",
            other,
            path.display()
        ))),
    }
}

fn read_json_rows(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path)?;
    let rows: Vec<RawRecord> = serde_json::from_str(&content)?;
    Ok(rows)
}

fn read_workbook_rows(path: &Path, sheet: Option<&str>) -> Result<Vec<RawRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match sheet {
        Some(name) => workbook.worksheet_range(name)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| no_sheets(path.to_path_buf()))??,
    };

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header
        .iter()
        .map(|cell| match cell_value(cell) {
            Value::String(s) => s.trim().to_string(),
            other => value_text(&other),
        })
        .collect();

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell_value(cell)))
            .collect();
        records.push(record);
    }

    Ok(records)
}

fn no_sheets(path: PathBuf) -> Error {
    Error::Config(format!("workbook has no worksheets: {}", path.display()))
}

/// Converts a workbook cell into a JSON scalar.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.num_seconds_from_midnight() == 0 => {
                Value::String(ts.date().format("%Y-%m-%d").to_string())
            }
            Some(ts) => Value::String(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Value::from(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => {
            debug!(error = ?e, "spreadsheet cell holds an error value");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::CanonicalField;
    use serde_json::json;
    use tempfile::TempDir;

    fn export(tmp: &TempDir, rows: Value) -> PathBuf {
        let path = tmp.path().join("rows.json");
        std::fs::write(&path, serde_json::to_string(&rows).unwrap()).unwrap();
        path
    }

    fn source(path: PathBuf) -> SpreadsheetSource {
        SpreadsheetSource::new(SpreadsheetSourceConfig { path, sheet: None })
    }

    fn inline(cell: &str, text: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#, cell, text)
    }

    fn sheet_xml(rows: &[(u32, String)]) -> String {
        let body: String = rows
            .iter()
            .map(|(r, cells)| format!(r#"<row r="{}">{}</row>"#, r, cells))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            body
        )
    }

    /// Two-sheet workbook shaped like the intake export: padded headers,
    /// a blank header column, an empty row and a date-formatted cell.
    fn intake_workbook(tmp: &TempDir) -> PathBuf {
        use std::io::Write;

        let intake = sheet_xml(&[
            (
                1,
                [
                    inline("A1", "  Name of the youth "),
                    inline("B1", "Medical ID Number"),
                    inline("C1", "Date of Birth"),
                    inline("E1", "Housing"),
                ]
                .concat(),
            ),
            (
                2,
                [
                    inline("A2", "John Doe"),
                    r#"<c r="B2"><v>5952280034</v></c>"#.to_string(),
                    r#"<c r="C2" s="1"><v>36526</v></c>"#.to_string(),
                    inline("D2", "stray"),
                    inline("E2", "Shelter"),
                ]
                .concat(),
            ),
            (
                4,
                [
                    inline("A4", "Jane Smith"),
                    inline("B4", "222"),
                    inline("E4", "Apartment"),
                ]
                .concat(),
            ),
        ]);
        let archive = sheet_xml(&[
            (1, inline("A1", "Name of the youth")),
            (2, inline("A2", "Old Record")),
        ]);

        let files = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#.to_string(),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Intake" sheetId="1" r:id="rId1"/><sheet name="Archive" sheetId="2" r:id="rId2"/></sheets></workbook>"#.to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#.to_string(),
            ),
            (
                "xl/styles.xml",
                r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#.to_string(),
            ),
            ("xl/worksheets/sheet1.xml", intake),
            ("xl/worksheets/sheet2.xml", archive),
        ];

        let path = tmp.path().join("row_1.xlsx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in files {
            zip.start_file(name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[tokio::test]
    async fn test_fetch_by_name_matches_trimmed_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        let path = export(
            &tmp,
            json!([
                {"Name of the youth": " john doe ", "Medical ID Number": 5952280034.0_f64},
                {"Name of the youth": "Johnny Doe", "Medical ID Number": "111"},
                {"Name of the youth": "Jane Smith", "Medical ID Number": "222"}
            ]),
        );

        let rows = source(path)
            .fetch(&SourceQuery::by_name("John Doe"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Medical ID Number"], json!(5952280034.0_f64));
    }

    #[tokio::test]
    async fn test_fetch_by_identifier_wins_over_name() {
        let tmp = TempDir::new().unwrap();
        let path = export(
            &tmp,
            json!([
                {"Name": "John Doe", "Medical ID": "111"},
                {"Name": "John Doe", "Medical ID": "222"}
            ]),
        );

        let query = SourceQuery {
            name: Some("John Doe".to_string()),
            identifier: Some("222".to_string()),
        };
        let rows = source(path).fetch(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Medical ID"], json!("222"));
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let tmp = TempDir::new().unwrap();
        let path = export(&tmp, json!([{"Name of the youth": "Jane Smith"}]));
        let rows = source(path)
            .fetch(&SourceQuery::by_name("Nonexistent Person"))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = source(tmp.path().join("missing.json"))
            .fetch(&SourceQuery::by_name("John Doe"))
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_workbook_rows_from_first_sheet() {
        let tmp = TempDir::new().unwrap();
        let path = intake_workbook(&tmp);

        let rows = read_rows(&path, None).unwrap();
        assert_eq!(rows.len(), 2);

        let john = &rows[0];
        assert_eq!(john["Name of the youth"], json!("John Doe"));
        assert_eq!(john["Medical ID Number"], json!(5952280034.0_f64));
        assert_eq!(john["Date of Birth"], json!("2000-01-01"));
        assert_eq!(john["Housing"], json!("Shelter"));
        assert!(!john.contains_key(""));
        assert!(!john.values().any(|v| v == &json!("stray")));

        assert_eq!(rows[1]["Name of the youth"], json!("Jane Smith"));
        assert_eq!(rows[1]["Date of Birth"], Value::Null);
    }

    #[test]
    fn test_workbook_named_sheet() {
        let tmp = TempDir::new().unwrap();
        let path = intake_workbook(&tmp);

        let rows = read_rows(&path, Some("Archive")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Name of the youth"], json!("Old Record"));
        assert!(read_rows(&path, Some("Missing")).is_err());
    }

    #[tokio::test]
    async fn test_fetch_from_workbook_by_identifier() {
        let tmp = TempDir::new().unwrap();
        let path = intake_workbook(&tmp);

        let rows = source(path)
            .fetch(&SourceQuery::by_identifier("5952280034"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let record = normalize_record(rows[0].clone());
        assert_eq!(record[CanonicalField::YouthName.as_str()], json!("John Doe"));
        assert_eq!(record["Housing"], json!("Shelter"));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = read_rows(Path::new("export.txt"), None);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::Int(4)), json!(4));
        assert_eq!(cell_value(&Data::Bool(true)), json!(true));
        assert_eq!(
            cell_value(&Data::String("Shelter".to_string())),
            json!("Shelter")
        );
    }
}
