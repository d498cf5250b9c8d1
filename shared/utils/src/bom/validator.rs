//! BOM Hierarchy Validator
//!
//! Checks that each row's declared parent matches the positional ancestor
//! implied by its level. Rows must be in depth-first preorder; the validator
//! never reorders or repairs them, it only reports.

use lci_models::{BomRecord, BomSheet};

use super::parser::ParsedBom;

/// Kind of hierarchy inconsistency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Declared parent differs from the positional ancestor
    ParentMismatch,
    /// No row was seen at the level directly above this one
    MissingAncestor,
    /// The level cell could not be read
    UnknownLevel,
}

/// Single hierarchy diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub source_id: String,
    pub sheet: String,
    pub row: usize,
    pub level: Option<u32>,
    pub part_number: String,
    pub declared_parent: String,
    /// `None` when no ancestor exists at `level - 1`
    pub expected_parent: Option<String>,
}

impl ValidationIssue {
    pub fn message(&self) -> String {
        match self.kind {
            IssueKind::ParentMismatch => format!(
                "row {} next={} but parent={}",
                self.row,
                self.declared_parent,
                self.expected_parent.as_deref().unwrap_or_default()
            ),
            IssueKind::MissingAncestor => format!(
                "row {} next={} but no ancestor at level {}",
                self.row,
                self.declared_parent,
                self.level.unwrap_or(0).saturating_sub(1)
            ),
            IssueKind::UnknownLevel => format!(
                "row {} part={} has no usable level",
                self.row, self.part_number
            ),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}: {}", self.source_id, self.sheet, self.message())
    }
}

/// Validation result for one sheet
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub source_id: String,
    pub sheet: String,
    pub rows_checked: usize,
    /// Row of the end-of-sheet marker, if one stopped the scan
    pub stopped_at: Option<usize>,
    pub issues: Vec<ValidationIssue>,
}

/// Hierarchy validator
#[derive(Debug, Clone, Copy, Default)]
pub struct BomValidator;

impl BomValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate every sheet of a parsed source
    pub fn validate(&self, bom: &ParsedBom) -> Vec<ValidationResult> {
        bom.sheets.iter().map(|s| self.validate_sheet(s)).collect()
    }

    pub fn validate_sheet(&self, sheet: &BomSheet) -> ValidationResult {
        self.validate_rows(&sheet.source_id, &sheet.name, &sheet.records)
    }

    /// Single linear pass over one sheet's rows
    pub fn validate_rows(&self, source_id: &str, sheet: &str, rows: &[BomRecord]) -> ValidationResult {
        let mut stack: Vec<&str> = Vec::new();
        let mut issues = Vec::new();
        let mut rows_checked = 0;
        let mut stopped_at = None;

        for row in rows {
            if row.is_end_marker() {
                stopped_at = Some(row.row_number);
                break;
            }
            rows_checked += 1;

            let part = row.part_number.trim();
            let declared = row.next_assembly_part_number.trim();
            let issue = |kind, expected: Option<&str>| ValidationIssue {
                kind,
                source_id: source_id.to_string(),
                sheet: sheet.to_string(),
                row: row.row_number,
                level: row.level,
                part_number: part.to_string(),
                declared_parent: declared.to_string(),
                expected_parent: expected.map(str::to_string),
            };

            let Some(level) = row.level.map(|l| l as usize) else {
                issues.push(issue(IssueKind::UnknownLevel, None));
                // Re-anchor under the declared parent so the row's children still check
                if declared.is_empty() {
                    stack.clear();
                    stack.push(part);
                } else if let Some(pos) = stack.iter().rposition(|p| *p == declared) {
                    stack.truncate(pos + 1);
                    stack.push(part);
                }
                continue;
            };
            stack.truncate(level);

            if level > 0 {
                match stack.get(level - 1) {
                    Some(expected) if *expected == declared => {}
                    Some(expected) => issues.push(issue(IssueKind::ParentMismatch, Some(*expected))),
                    None => issues.push(issue(IssueKind::MissingAncestor, None)),
                }
            }

            stack.push(part);
        }

        ValidationResult {
            is_valid: issues.is_empty(),
            source_id: source_id.to_string(),
            sheet: sheet.to_string(),
            rows_checked,
            stopped_at,
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(idx: usize, level: u32, part: &str, parent: &str) -> BomRecord {
        BomRecord::new(level, part, format!("Part {}", part), Some(1.0), parent, "BOM_1").with_row(idx)
    }

    fn validate(rows: &[BomRecord]) -> ValidationResult {
        BomValidator::new().validate_rows("BOM_1", "Sheet1", rows)
    }

    #[test]
    fn test_valid_preorder_table() {
        let rows = vec![
            row(1, 0, "P1", ""),
            row(2, 1, "P2", "P1"),
            row(3, 2, "P4", "P2"),
            row(4, 2, "P5", "P2"),
            row(5, 1, "P3", "P1"),
            row(6, 2, "P6", "P3"),
        ];
        let result = validate(&rows);
        assert!(result.is_valid);
        assert_eq!(result.rows_checked, 6);
        assert_eq!(result.stopped_at, None);
    }

    #[test]
    fn test_wrong_parent_is_reported_once() {
        let rows = vec![
            row(1, 0, "P1", ""),
            row(2, 1, "P2", "P1"),
            row(3, 2, "P4", "P3"),
            row(4, 1, "P3", "P1"),
        ];
        let result = validate(&rows);
        assert_eq!(result.issues.len(), 1);

        let issue = &result.issues[0];
        assert_eq!(issue.kind, IssueKind::ParentMismatch);
        assert_eq!(issue.row, 3);
        assert_eq!(issue.declared_parent, "P3");
        assert_eq!(issue.expected_parent.as_deref(), Some("P2"));
        assert_eq!(issue.message(), "row 3 next=P3 but parent=P2");
    }

    #[test]
    fn test_top_level_rows_need_no_parent() {
        let rows = vec![row(1, 0, "P1", "anything"), row(2, 0, "P9", "")];
        assert!(validate(&rows).is_valid);
    }

    #[test]
    fn test_missing_ancestor_is_reported_not_panicking() {
        let rows = vec![row(1, 2, "P4", "")];
        let result = validate(&rows);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::MissingAncestor);
        assert_eq!(result.issues[0].expected_parent, None);
    }

    #[test]
    fn test_level_two_with_empty_parent_after_ancestor() {
        let rows = vec![row(1, 0, "P1", ""), row(2, 1, "P2", "P1"), row(3, 2, "P4", "")];
        let result = validate(&rows);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::ParentMismatch);
        assert_eq!(result.issues[0].expected_parent.as_deref(), Some("P2"));
    }

    #[test]
    fn test_end_marker_stops_the_scan() {
        let rows = vec![
            row(1, 0, "P1", ""),
            row(2, 1, "P2", "P1"),
            row(3, 0, "", ""),
            row(4, 1, "P7", "nonsense"),
        ];
        let result = validate(&rows);
        assert!(result.is_valid);
        assert_eq!(result.rows_checked, 2);
        assert_eq!(result.stopped_at, Some(3));
    }

    #[test]
    fn test_unknown_level_is_reported_once() {
        let rows = vec![
            row(1, 0, "P1", ""),
            row(2, 0, "P2", "P1").with_level(None),
            row(3, 2, "P3", "P2"),
            row(4, 1, "P4", "P1"),
        ];
        let result = validate(&rows);
        assert_eq!(result.rows_checked, 4);
        assert_eq!(result.issues.len(), 1);

        let issue = &result.issues[0];
        assert_eq!(issue.kind, IssueKind::UnknownLevel);
        assert_eq!(issue.row, 2);
        assert_eq!(issue.level, None);
        assert_eq!(issue.message(), "row 2 part=P2 has no usable level");
    }

    #[test]
    fn test_unknown_level_under_unseen_parent() {
        let rows = vec![
            row(1, 0, "P1", ""),
            row(2, 0, "P2", "Q9").with_level(None),
            row(3, 1, "P3", "P1"),
        ];
        let result = validate(&rows);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::UnknownLevel);
    }

    #[test]
    fn test_disorder_keeps_reporting() {
        // A child listed before its parent yields a diagnostic, and the scan continues
        let rows = vec![
            row(1, 0, "P1", ""),
            row(2, 2, "P4", "P2"),
            row(3, 1, "P2", "P1"),
            row(4, 1, "P3", "P9"),
        ];
        let result = validate(&rows);
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.issues[0].row, 2);
        assert_eq!(result.issues[1].row, 4);
    }

    #[test]
    fn test_validate_parsed_source() {
        let mut first = BomSheet::new("BOM_1", "Sheet1");
        first.records = vec![row(1, 0, "P1", ""), row(2, 1, "P2", "P1")];
        let mut second = BomSheet::new("BOM_1", "Sheet2");
        second.records = vec![row(1, 0, "Q1", ""), row(2, 1, "Q2", "P1")];

        let parsed = ParsedBom {
            source_id: "BOM_1".to_string(),
            filename: "BOM_1.xlsx".to_string(),
            format: super::super::parser::BomFormat::Excel,
            sheets: vec![first, second],
            parse_warnings: vec![],
        };

        let results = BomValidator::new().validate(&parsed);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_valid);
        assert!(!results[1].is_valid);
        assert_eq!(results[1].issues[0].sheet, "Sheet2");
        assert_eq!(results[1].issues[0].to_string(), "BOM_1/Sheet2: row 2 next=P1 but parent=Q1");
    }

    /// Generates a preorder table from a list of depth deltas: each row goes at
    /// most one level deeper than the previous one.
    fn preorder_table(steps: &[u32]) -> Vec<BomRecord> {
        let mut rows = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut level: u32 = 0;
        for (i, step) in steps.iter().enumerate() {
            if i > 0 {
                level = (*step).min(level + 1);
            }
            stack.truncate(level as usize);
            let part = format!("P{}", i);
            let parent = if level == 0 {
                String::new()
            } else {
                stack[level as usize - 1].clone()
            };
            rows.push(row(i + 1, level, &part, &parent));
            stack.push(part);
        }
        rows
    }

    proptest! {
        #[test]
        fn prop_valid_preorder_has_no_diagnostics(steps in prop::collection::vec(0u32..6, 1..40)) {
            let rows = preorder_table(&steps);
            let result = validate(&rows);
            prop_assert!(result.is_valid);
            prop_assert_eq!(result.rows_checked, rows.len());
        }

        #[test]
        fn prop_one_altered_parent_gives_one_diagnostic(
            steps in prop::collection::vec(0u32..6, 2..40),
            pick in any::<prop::sample::Index>(),
        ) {
            let mut rows = preorder_table(&steps);
            let candidates: Vec<usize> = rows.iter()
                .enumerate()
                .filter(|(_, r)| r.level.is_some_and(|l| l > 0))
                .map(|(i, _)| i)
                .collect();
            prop_assume!(!candidates.is_empty());

            let target = candidates[pick.index(candidates.len())];
            rows[target].next_assembly_part_number = "WRONG".to_string();

            let result = validate(&rows);
            prop_assert_eq!(result.issues.len(), 1);
            prop_assert_eq!(result.issues[0].row, target + 1);
        }
    }
}
