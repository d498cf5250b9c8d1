//! Bill of materials domain models.
//!
//! A BOM arrives as one or more flat, level-indexed sheets. Rows within a
//! sheet are in depth-first preorder: the ancestors of a row at every level
//! above it are the most recently seen rows at those levels.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One row of a source BOM table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BomRecord {
    /// Row index in the source sheet, used when citing diagnostics
    pub row_number: usize,
    /// Depth in the assembly, 0 being the top assembly. `None` when the
    /// source cell held no usable level.
    pub level: Option<u32>,
    pub part_number: String,
    pub part_name: String,
    #[validate(range(min = 0.0, message = "Quantity per parent must not be negative"))]
    pub quantity_per_parent: Option<f64>,
    /// Part number of the parent assembly; empty for top-level rows
    pub next_assembly_part_number: String,
    #[validate(length(min = 1, message = "Source identifier must not be empty"))]
    pub source_id: String,
    pub sheet: String,
}

impl BomRecord {
    pub fn new(
        level: u32,
        part_number: impl Into<String>,
        part_name: impl Into<String>,
        quantity_per_parent: Option<f64>,
        next_assembly_part_number: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            row_number: 0,
            level: Some(level),
            part_number: part_number.into(),
            part_name: part_name.into(),
            quantity_per_parent,
            next_assembly_part_number: next_assembly_part_number.into(),
            source_id: source_id.into(),
            sheet: String::new(),
        }
    }

    pub fn with_row(mut self, row_number: usize) -> Self {
        self.row_number = row_number;
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = sheet.into();
        self
    }

    pub fn with_level(mut self, level: Option<u32>) -> Self {
        self.level = level;
        self
    }

    /// Composite key shared by the process built for this part and by the
    /// flow that references it from a parent.
    pub fn process_key(&self) -> String {
        process_key(&self.part_name, &self.part_number)
    }

    /// An empty part number marks the end of the meaningful rows of a sheet.
    pub fn is_end_marker(&self) -> bool {
        self.part_number.trim().is_empty()
    }

    pub fn has_parent(&self) -> bool {
        !self.next_assembly_part_number.trim().is_empty()
    }
}

/// Builds the `partName-partNumber` key used for processes and product flows.
pub fn process_key(part_name: &str, part_number: &str) -> String {
    format!("{}-{}", part_name.trim(), part_number.trim())
}

/// One ordered sheet from a source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BomSheet {
    pub source_id: String,
    pub name: String,
    pub records: Vec<BomRecord>,
}

impl BomSheet {
    pub fn new(source_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            name: name.into(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// All records of a run, merged across sheets and sources in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BomTable {
    records: Vec<BomRecord>,
}

impl BomTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: BomRecord) {
        self.records.push(record);
    }

    /// Appends a sheet's records, preserving their order.
    pub fn append_sheet(&mut self, sheet: &BomSheet) {
        self.records.extend(sheet.records.iter().cloned());
    }

    pub fn records(&self) -> &[BomRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct source identifiers in first-seen order.
    pub fn sources(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.source_id.as_str()) {
                seen.push(&record.source_id);
            }
        }
        seen
    }
}

impl FromIterator<BomRecord> for BomTable {
    fn from_iter<I: IntoIterator<Item = BomRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<BomRecord> for BomTable {
    fn extend<I: IntoIterator<Item = BomRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}
