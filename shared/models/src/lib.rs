//! # Foreground LCI Domain Models
//!
//! Core data structures shared by the BOM ingestion, graph building and
//! archive writing stages.
//!
//! ## Key Models
//!
//! - **BomRecord**: One row of a level-indexed bill of materials
//! - **BomTable**: All records of a run, merged across sheets and sources
//! - **ProcessNode**: A part with children, with one reference exchange and one input per child
//! - **Exchange**: A flow quantity attached to a process
//! - **UnitTable**: Unit name to unit/flow-property identifier lookup
//! - **ProcessMetadata**: Documentation block copied into every process
//!
//! ## Validation
//!
//! BOM records derive `validator::Validate`: quantities must not be negative
//! and every record must name its source.

pub mod bom;
pub mod process;
pub mod documentation;
pub mod units;
pub mod summary;


pub use bom::*;
pub use process::*;
pub use documentation::*;
pub use units::*;
pub use summary::*;
