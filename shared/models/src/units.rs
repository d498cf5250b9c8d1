//! Unit reference table.
//!
//! Maps unit names to the identifiers of the unit and of the flow property
//! (quantity kind) it measures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReference {
    #[serde(rename = "Unit")]
    pub unit_name: String,
    #[serde(rename = "Unit UUID")]
    pub unit_id: String,
    #[serde(rename = "Flow Property")]
    pub flow_property_name: String,
    #[serde(rename = "Flow Property UUID")]
    pub flow_property_id: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitTableError {
    #[error("Unit name must not be empty")]
    EmptyName,

    #[error("Unit {name} is already mapped to a different reference")]
    Conflict { name: String },
}

/// Immutable lookup from unit name to its references
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitTable {
    entries: HashMap<String, UnitReference>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. Re-adding an identical entry is a no-op; mapping a
    /// known name to different identifiers is rejected.
    pub fn insert(&mut self, reference: UnitReference) -> Result<(), UnitTableError> {
        let name = reference.unit_name.trim().to_string();
        if name.is_empty() {
            return Err(UnitTableError::EmptyName);
        }
        match self.entries.get(&name) {
            Some(existing) if existing != &reference => Err(UnitTableError::Conflict { name }),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(name, reference);
                Ok(())
            }
        }
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = UnitReference>,
    ) -> Result<Self, UnitTableError> {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry)?;
        }
        Ok(table)
    }

    /// Exact-name lookup
    pub fn resolve(&self, unit_name: &str) -> Option<&UnitReference> {
        self.entries.get(unit_name.trim())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
