//! BOM File Parser
//!
//! Multi-format parser turning CSV, Excel and XML bill of materials files
//! into ordered, level-indexed sheets of [`BomRecord`]s.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

use lci_models::{BomRecord, BomSheet, BomTable};

use crate::validation::validate_model;

/// Supported BOM file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomFormat {
    Csv,
    Excel, // XLSX
    Xml,
}

impl BomFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Excel),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Excel => "Excel",
            Self::Xml => "XML",
        }
    }
}

/// Complete parsed BOM source with its sheets in reading order
#[derive(Debug, Clone)]
pub struct ParsedBom {
    pub source_id: String,
    pub filename: String,
    pub format: BomFormat,
    pub sheets: Vec<BomSheet>,
    pub parse_warnings: Vec<String>,
}

impl ParsedBom {
    pub fn total_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.len()).sum()
    }

    /// Appends every sheet to `table` in order
    pub fn append_to(&self, table: &mut BomTable) {
        for sheet in &self.sheets {
            table.append_sheet(sheet);
        }
    }
}

/// Main BOM parser
pub struct BomParser {
    /// Column name candidates, in normalized form
    level_columns: Vec<String>,
    part_number_columns: Vec<String>,
    part_name_columns: Vec<String>,
    quantity_columns: Vec<String>,
    next_assembly_columns: Vec<String>,
    max_sheets: Option<usize>,
}

impl Default for BomParser {
    fn default() -> Self {
        Self {
            level_columns: vec!["level".to_string(), "lvl".to_string()],
            part_number_columns: vec![
                "part number".to_string(),
                "part no".to_string(),
                "pn".to_string(),
            ],
            part_name_columns: vec![
                "part name".to_string(),
                "name".to_string(),
                "description".to_string(),
            ],
            quantity_columns: vec![
                "qna".to_string(),
                "qty".to_string(),
                "quantity".to_string(),
                "quantity per parent".to_string(),
            ],
            next_assembly_columns: vec![
                "next assembly".to_string(),
                "next assembly part number".to_string(),
                "parent".to_string(),
                "parent part number".to_string(),
            ],
            max_sheets: None,
        }
    }
}

impl BomParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only read the first `max_sheets` sheets of a workbook
    pub fn with_max_sheets(mut self, max_sheets: Option<usize>) -> Self {
        self.max_sheets = max_sheets;
        self
    }

    /// Read and parse a BOM file from disk
    pub fn parse_file(&self, path: &Path, source_id: &str) -> Result<ParsedBom> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read BOM file {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.parse_bytes(source_id, &filename, &data, None)
    }

    /// Parse BOM file from bytes
    pub fn parse_bytes(
        &self,
        source_id: &str,
        filename: &str,
        data: &[u8],
        format: Option<BomFormat>,
    ) -> Result<ParsedBom> {
        if source_id.trim().is_empty() {
            bail!("BOM source {} has no source identifier", filename);
        }

        let format = format
            .or_else(|| BomFormat::from_extension(Path::new(filename)))
            .context("Could not determine file format")?;

        let mut parsed = ParsedBom {
            source_id: source_id.to_string(),
            filename: filename.to_string(),
            format,
            sheets: Vec::new(),
            parse_warnings: Vec::new(),
        };

        match format {
            BomFormat::Csv => self.parse_csv(&mut parsed, data)?,
            BomFormat::Excel => self.parse_excel(&mut parsed, data)?,
            BomFormat::Xml => self.parse_xml(&mut parsed, data)?,
        }

        Ok(parsed)
    }

    /// Parse CSV format as a single sheet
    fn parse_csv(&self, parsed: &mut ParsedBom, data: &[u8]) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(normalize_header)
            .collect();

        let mut sheet = BomSheet::new(&parsed.source_id, sheet_name_of(&parsed.filename));

        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 2;
            match result {
                Ok(record) => {
                    let raw_data: HashMap<String, String> = headers
                        .iter()
                        .enumerate()
                        .filter_map(|(i, h)| record.get(i).map(|v| (h.clone(), v.to_string())))
                        .collect();

                    self.push_row(parsed, &mut sheet, row_number, &raw_data);
                }
                Err(e) => {
                    parsed
                        .parse_warnings
                        .push(format!("Row {}: Parse error - {}", row_number, e));
                }
            }
        }

        parsed.sheets.push(sheet);
        Ok(())
    }

    /// Parse every sheet of an XLSX workbook
    fn parse_excel(&self, parsed: &mut ParsedBom, data: &[u8]) -> Result<()> {
        use calamine::{open_workbook_from_rs, DataType, Reader, Xlsx};

        let cursor = std::io::Cursor::new(data);
        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            bail!("No sheets found in workbook {}", parsed.filename);
        }
        let limit = self.max_sheets.unwrap_or(sheet_names.len());

        for sheet_name in sheet_names.into_iter().take(limit) {
            let range = workbook
                .worksheet_range(&sheet_name)
                .with_context(|| format!("Worksheet {} not found", sheet_name))?
                .with_context(|| format!("Failed to read worksheet {}", sheet_name))?;

            let mut rows_iter = range.rows();

            // First row is headers
            let headers: Vec<String> = match rows_iter.next() {
                Some(row) => row
                    .iter()
                    .map(|cell: &DataType| normalize_header(&cell.to_string()))
                    .collect(),
                None => {
                    parsed
                        .parse_warnings
                        .push(format!("Sheet {}: empty worksheet, skipped", sheet_name));
                    continue;
                }
            };

            let mut sheet = BomSheet::new(&parsed.source_id, &sheet_name);

            for (idx, row) in rows_iter.enumerate() {
                let raw_data: HashMap<String, String> = headers
                    .iter()
                    .enumerate()
                    .filter_map(|(i, h)| row.get(i).map(|v: &DataType| (h.clone(), v.to_string())))
                    .collect();

                self.push_row(parsed, &mut sheet, idx + 2, &raw_data);
            }

            parsed.sheets.push(sheet);
        }

        Ok(())
    }

    /// Parse XML format as a single sheet of row elements
    fn parse_xml(&self, parsed: &mut ParsedBom, data: &[u8]) -> Result<()> {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_reader(data);
        reader.trim_text(true);

        let mut sheet = BomSheet::new(&parsed.source_id, sheet_name_of(&parsed.filename));
        let mut current_row: Option<HashMap<String, String>> = None;
        let mut current_element = String::new();
        let mut row_number = 0;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    // Common XML BOM element names
                    if is_row_element(&tag_name) {
                        current_row = Some(HashMap::new());
                        row_number += 1;
                    } else if current_row.is_some() {
                        current_element = normalize_header(&tag_name);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(ref mut row) = current_row {
                        if !current_element.is_empty() {
                            row.insert(
                                current_element.clone(),
                                e.unescape().unwrap_or_default().to_string(),
                            );
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if is_row_element(&tag_name) {
                        if let Some(raw_data) = current_row.take() {
                            self.push_row(parsed, &mut sheet, row_number, &raw_data);
                        }
                    }
                    current_element.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    parsed.parse_warnings.push(format!("XML parse error: {}", e));
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        parsed.sheets.push(sheet);
        Ok(())
    }

    fn push_row(
        &self,
        parsed: &mut ParsedBom,
        sheet: &mut BomSheet,
        row_number: usize,
        raw_data: &HashMap<String, String>,
    ) {
        let (record, warning) = self.map_row(&parsed.source_id, &sheet.name, row_number, raw_data);
        if let Some(warning) = warning {
            parsed
                .parse_warnings
                .push(format!("Sheet {} row {}: {}", sheet.name, row_number, warning));
        }
        sheet.records.push(record);
    }

    /// Map raw data to a structured BomRecord. Every row is kept: rows
    /// without a part number (blank ones included) are end markers, and a
    /// part whose level cannot be read keeps its parent link with a warning.
    fn map_row(
        &self,
        source_id: &str,
        sheet: &str,
        row_number: usize,
        raw_data: &HashMap<String, String>,
    ) -> (BomRecord, Option<String>) {
        let part_number = self
            .find_value(&self.part_number_columns, raw_data)
            .unwrap_or_default();
        let level_text = self.find_value(&self.level_columns, raw_data);

        let mut warning = None;
        let level = match level_text.as_deref().and_then(parse_level) {
            Some(level) => Some(level),
            // Rows without a part number only mark the end of a sheet
            None if part_number.is_empty() => Some(0),
            None => {
                warning = Some(format!(
                    "part {} has no usable level ({})",
                    part_number,
                    level_text.unwrap_or_default()
                ));
                None
            }
        };

        let mut record = BomRecord {
            row_number,
            level,
            part_number,
            part_name: self
                .find_value(&self.part_name_columns, raw_data)
                .unwrap_or_default(),
            quantity_per_parent: self
                .find_value(&self.quantity_columns, raw_data)
                .and_then(|q| parse_quantity(&q)),
            next_assembly_part_number: self
                .find_value(&self.next_assembly_columns, raw_data)
                .unwrap_or_default(),
            source_id: source_id.to_string(),
            sheet: sheet.to_string(),
        };

        if let Err(e) = validate_model(&record) {
            tracing::warn!(
                source_id,
                sheet,
                row = row_number,
                error = %e,
                "Invalid BOM row, quantity ignored"
            );
            record.quantity_per_parent = None;
        }

        (record, warning)
    }

    /// Find value by checking multiple possible column names
    fn find_value(&self, candidates: &[String], data: &HashMap<String, String>) -> Option<String> {
        for candidate in candidates {
            if let Some(value) = data.get(candidate) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        None
    }
}

/// Lowercases a header and folds underscores and runs of whitespace into
/// single spaces, so `Part_Number` and `part  number` match `part number`.
fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_row_element(tag_name: &str) -> bool {
    matches!(tag_name, "row" | "item" | "component" | "entry" | "record")
}

fn sheet_name_of(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string())
}

/// Levels are whole, non-negative numbers; spreadsheets often store them as `1.0`.
fn parse_level(text: &str) -> Option<u32> {
    let value: f64 = text.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value as u32)
}

/// Unparseable quantities are coerced to absent.
fn parse_quantity(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}
