//! Process documentation metadata.
//!
//! The same documentation block is shared by every process of a run. It is
//! loaded once from the process metadata template and handed to the graph
//! builder as an immutable input.

use serde::{Deserialize, Serialize};

/// Descriptive metadata copied into each process's documentation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetadata {
    pub time_description: Option<String>,
    pub technology_description: Option<String>,
    pub geography_description: Option<String>,
    pub data_collection_description: Option<String>,
    pub completeness_description: Option<String>,
    pub data_selection_description: Option<String>,
    pub review_details: Option<String>,
    pub data_treatment_description: Option<String>,
    pub inventory_method_description: Option<String>,
    pub modeling_constants_description: Option<String>,
    pub sampling_description: Option<String>,
    pub restrictions_description: Option<String>,
    pub intended_application: Option<String>,
    pub project_description: Option<String>,
    pub copyright: Option<bool>,
    /// Raw `month/day/year` text as found in the template
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    /// Actor names
    pub reviewer: Option<String>,
    pub data_documentor: Option<String>,
    pub data_generator: Option<String>,
    pub data_set_owner: Option<String>,
    /// Source name
    pub publication: Option<String>,
}

impl ProcessMetadata {
    /// Actor names referenced by this block, paired with their role
    pub fn actors(&self) -> Vec<(&'static str, &str)> {
        [
            ("reviewer", self.reviewer.as_deref()),
            ("dataDocumentor", self.data_documentor.as_deref()),
            ("dataGenerator", self.data_generator.as_deref()),
            ("dataSetOwner", self.data_set_owner.as_deref()),
        ]
        .into_iter()
        .filter_map(|(role, name)| name.filter(|n| !n.trim().is_empty()).map(|n| (role, n)))
        .collect()
    }
}

/// Reference to a data quality system by identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DqSystemRef {
    pub id: String,
    pub name: String,
}

impl DqSystemRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// US EPA flow pedigree matrix, used for exchange data quality
    pub fn flow_pedigree() -> Self {
        Self::new(
            "d13b2bc4-5e84-4cc8-a6be-9101ebb252ff",
            "US EPA - Flow Pedigree Matrix",
        )
    }

    /// US EPA process pedigree matrix, used for process data quality
    pub fn process_pedigree() -> Self {
        Self::new(
            "70bf370f-9912-4ec1-baa3-fbd4eaf85a10",
            "US EPA - Process Pedigree Matrix",
        )
    }
}
