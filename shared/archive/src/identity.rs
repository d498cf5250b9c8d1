//! Content-derived identifiers.
//!
//! An identifier is the name-based (v3) UUID of a slash-joined, lower-cased
//! path of trimmed parts. The same content always gives the same identifier,
//! independent of the order in which entities are met.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of records held in an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Process,
    Flow,
    Category,
    Location,
    Actor,
    Source,
    FlowProperty,
    DqSystem,
}

impl ModelType {
    pub const ALL: [ModelType; 8] = [
        Self::Process,
        Self::Flow,
        Self::Category,
        Self::Location,
        Self::Actor,
        Self::Source,
        Self::FlowProperty,
        Self::DqSystem,
    ];

    /// Leading part of every identifier path of this type
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Flow => "flow",
            Self::Category => "category",
            Self::Location => "location",
            Self::Actor => "actor",
            Self::Source => "source",
            Self::FlowProperty => "flow_property",
            Self::DqSystem => "dq_system",
        }
    }

    /// Archive folder holding records of this type
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Process => "processes",
            Self::Flow => "flows",
            Self::Category => "categories",
            Self::Location => "locations",
            Self::Actor => "actors",
            Self::Source => "sources",
            Self::FlowProperty => "flow_properties",
            Self::DqSystem => "dq_systems",
        }
    }

    /// JSON-LD `@type`
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::Process => "Process",
            Self::Flow => "Flow",
            Self::Category => "Category",
            Self::Location => "Location",
            Self::Actor => "Actor",
            Self::Source => "Source",
            Self::FlowProperty => "FlowProperty",
            Self::DqSystem => "DQSystem",
        }
    }

    /// Value of a category's `modelType` field
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::Process => "PROCESS",
            Self::Flow => "FLOW",
            Self::Category => "CATEGORY",
            Self::Location => "LOCATION",
            Self::Actor => "ACTOR",
            Self::Source => "SOURCE",
            Self::FlowProperty => "FLOW_PROPERTY",
            Self::DqSystem => "DQ_SYSTEM",
        }
    }

    pub fn entry_name(&self, id: &str) -> String {
        format!("{}/{}.json", self.folder(), id)
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Identifier of a content path
pub fn content_id<I, S>(parts: I) -> Uuid
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let path = parts
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .collect::<Vec<_>>()
        .join("/")
        .to_lowercase();
    Uuid::new_v3(&Uuid::NAMESPACE_OID, path.as_bytes())
}

/// Trimmed, non-empty segments of a slash separated category path
pub fn category_segments(path: &str) -> Vec<String> {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Category path with empty segments removed, e.g. `"A/B/"` becomes `"A/B"`
pub fn normalize_category_path(path: &str) -> String {
    category_segments(path).join("/")
}

pub fn process_id(category_path: &str, location: &str, name: &str) -> Uuid {
    let category = normalize_category_path(category_path);
    content_id([ModelType::Process.tag(), category.as_str(), location, name])
}

pub fn flow_id(category_path: &str, name: &str) -> Uuid {
    let category = normalize_category_path(category_path);
    content_id([ModelType::Flow.tag(), category.as_str(), name])
}

pub fn location_id(code: &str) -> Uuid {
    content_id([ModelType::Location.tag(), code])
}

pub fn actor_id(name: &str) -> Uuid {
    content_id([ModelType::Actor.tag(), name])
}

pub fn source_id(name: &str) -> Uuid {
    content_id([ModelType::Source.tag(), name])
}

/// Identifier of the category for a prefix of path segments, for content of
/// the given model type
pub fn category_id(content_type: ModelType, segments: &[String]) -> Uuid {
    let head = [ModelType::Category.tag(), content_type.tag()];
    content_id(head.iter().copied().chain(segments.iter().map(String::as_str)))
}
