//! Process graph models.
//!
//! A process is a unit of production with one reference output and any
//! number of inputs. Processes are built from BOM parts that have children;
//! a part without children is only ever referenced as a flow.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::documentation::{DqSystemRef, ProcessMetadata};

/// Kind of flow an exchange moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowType {
    ElementaryFlow,
    #[default]
    ProductFlow,
    WasteFlow,
}

impl FlowType {
    /// Category a flow of this type is filed under when none is given.
    /// Product flows use the configured product category instead.
    pub fn default_category<'a>(&self, product_category: &'a str) -> &'a str {
        match self {
            Self::ElementaryFlow => "Elementary flows",
            Self::ProductFlow => product_category,
            Self::WasteFlow => "Waste flows",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElementaryFlow => "ELEMENTARY_FLOW",
            Self::ProductFlow => "PRODUCT_FLOW",
            Self::WasteFlow => "WASTE_FLOW",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ELEMENTARY_FLOW" | "ELEMENTARY" => Some(Self::ElementaryFlow),
            "PRODUCT_FLOW" | "PRODUCT" => Some(Self::ProductFlow),
            "WASTE_FLOW" | "WASTE" => Some(Self::WasteFlow),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flow referenced by an exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSpec {
    pub name: String,
    /// Slash separated category path, e.g. `"Elementary flows/air"`
    pub category: String,
    pub flow_type: FlowType,
    /// Identifier of a flow that already exists downstream. Such flows are
    /// referenced but never written.
    pub id: Option<String>,
}

impl FlowSpec {
    pub fn new(name: impl Into<String>, flow_type: FlowType, product_category: &str) -> Self {
        Self {
            name: name.into(),
            category: flow_type.default_category(product_category).to_string(),
            flow_type,
            id: None,
        }
    }

    pub fn product(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            flow_type: FlowType::ProductFlow,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Location by code, optionally with a pre-assigned identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSpec {
    pub name: String,
    pub id: Option<String>,
}

impl LocationSpec {
    pub fn code(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

/// Default provider of an input, identified the same way processes are
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub category_path: Vec<String>,
    pub location: String,
}

/// Numeric parameter that may arrive as text from a spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Declared uncertainty of an exchange amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintySpec {
    pub distribution_type: String,
    pub geom_mean: Option<Numeric>,
    pub geom_sd: Option<Numeric>,
}

/// One input or output flow quantity of a process
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub flow: FlowSpec,
    pub amount: f64,
    pub unit: String,
    pub is_input: bool,
    pub is_reference: bool,
    pub avoided_product: bool,
    pub provider: Option<ProviderSpec>,
    pub uncertainty: Option<UncertaintySpec>,
    pub dq_entry: Option<String>,
    pub comment: Option<String>,
}

impl Exchange {
    /// The process's own output: amount 1, never an input.
    pub fn reference(flow: FlowSpec, unit: impl Into<String>) -> Self {
        Self {
            flow,
            amount: 1.0,
            unit: unit.into(),
            is_input: false,
            is_reference: true,
            avoided_product: false,
            provider: None,
            uncertainty: None,
            dq_entry: None,
            comment: None,
        }
    }

    pub fn input(flow: FlowSpec, amount: f64, unit: impl Into<String>) -> Self {
        Self {
            flow,
            amount,
            unit: unit.into(),
            is_input: true,
            is_reference: false,
            avoided_product: false,
            provider: None,
            uncertainty: None,
            dq_entry: None,
            comment: None,
        }
    }

    pub fn with_provider(mut self, provider: ProviderSpec) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_uncertainty(mut self, uncertainty: UncertaintySpec) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }
}

/// A node of the process graph, built from a BOM part with children
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessNode {
    /// `partName-partNumber`; also the process name
    pub key: String,
    pub description: Option<String>,
    /// Slash separated category path
    pub category: String,
    pub location: Option<LocationSpec>,
    pub exchanges: Vec<Exchange>,
    pub documentation: Option<Arc<ProcessMetadata>>,
    pub dq_entry: Option<String>,
    pub dq_system: Option<DqSystemRef>,
    pub exchange_dq_system: Option<DqSystemRef>,
    /// Source the node was built from
    pub source_id: String,
}

impl ProcessNode {
    pub fn new(key: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: None,
            category: category.into(),
            location: None,
            exchanges: Vec::new(),
            documentation: None,
            dq_entry: None,
            dq_system: None,
            exchange_dq_system: None,
            source_id: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.key
    }

    pub fn location_code(&self) -> &str {
        self.location.as_ref().map(|l| l.name.as_str()).unwrap_or("")
    }

    pub fn reference_exchange(&self) -> Option<&Exchange> {
        self.exchanges.iter().find(|e| e.is_reference)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter().filter(|e| e.is_input)
    }

    pub fn input_count(&self) -> usize {
        self.inputs().count()
    }
}
