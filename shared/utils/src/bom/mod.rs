//! BOM (Bill of Materials) Processing Module
//!
//! Reads level-indexed BOM sheets from CSV, Excel (XLSX) and XML files,
//! checks their hierarchy, builds the process graph and summarizes it.

pub mod graph;
pub mod parser;
pub mod summary;
pub mod validator;

pub use graph::{GraphBuilder, KeyCollision, KeyScope, ProcessDefaults, ProcessGraph};
pub use parser::{BomFormat, BomParser, ParsedBom};
pub use summary::ProcessSummarizer;
pub use validator::{BomValidator, IssueKind, ValidationIssue, ValidationResult};
