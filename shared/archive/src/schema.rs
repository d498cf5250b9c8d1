//! JSON-LD records written to the archive.
//!
//! Field names follow the olca-schema camelCase convention. Absent optional
//! fields are left out of the serialized record.

use serde::{Deserialize, Serialize};

use crate::identity::ModelType;

/// Reference to another record by identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ref {
    #[serde(rename = "@type")]
    pub schema_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_path: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
}

impl Ref {
    pub fn new(schema_type: impl Into<String>, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema_type: schema_type.into(),
            id: id.into(),
            name: Some(name.into()),
            category_path: None,
            location: None,
            process_type: None,
        }
    }

    pub fn of(model_type: ModelType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(model_type.json_type(), id, name)
    }

    pub fn with_category_path(mut self, path: Vec<String>) -> Self {
        if !path.is_empty() {
            self.category_path = Some(path);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "@type")]
    pub schema_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub model_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Ref>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "@type")]
    pub schema_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub code: String,
}

/// Actor, source, flow property and DQ system records carry only a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    #[serde(rename = "@type")]
    pub schema_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
}

impl NamedEntity {
    pub fn new(model_type: ModelType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema_type: model_type.json_type().to_string(),
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPropertyFactor {
    #[serde(rename = "@type")]
    pub schema_type: String,
    pub conversion_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_property: Option<Ref>,
    pub reference_flow_property: bool,
}

impl FlowPropertyFactor {
    /// The single reference factor of a flow
    pub fn reference(flow_property: Option<Ref>) -> Self {
        Self {
            schema_type: "FlowPropertyFactor".to_string(),
            conversion_factor: 1.0,
            flow_property,
            reference_flow_property: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    #[serde(rename = "@type")]
    pub schema_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Ref>,
    pub flow_type: String,
    pub flow_properties: Vec<FlowPropertyFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uncertainty {
    #[serde(rename = "@type")]
    pub schema_type: String,
    pub distribution_type: String,
    pub geom_mean: f64,
    pub geom_sd: f64,
}

impl Uncertainty {
    pub fn log_normal(geom_mean: f64, geom_sd: f64) -> Self {
        Self {
            schema_type: "Uncertainty".to_string(),
            distribution_type: "LOG_NORMAL_DISTRIBUTION".to_string(),
            geom_mean,
            geom_sd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    #[serde(rename = "@type")]
    pub schema_type: String,
    pub internal_id: u32,
    pub avoided_product: bool,
    pub input: bool,
    pub quantitative_reference: bool,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_property: Option<Ref>,
    pub flow: Ref,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq_entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<Uncertainty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDocumentation {
    pub creation_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geography_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completeness_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_selection_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_treatment_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_method_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modeling_constants_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrictions_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_documentor: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_generator: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_set_owner: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication: Option<Ref>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    #[serde(rename = "@type")]
    pub schema_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Ref>,
    pub process_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Ref>,
    pub process_documentation: ProcessDocumentation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq_entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq_system: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_dq_system: Option<Ref>,
    pub exchanges: Vec<Exchange>,
}

pub const UNIT_PROCESS: &str = "UNIT_PROCESS";
