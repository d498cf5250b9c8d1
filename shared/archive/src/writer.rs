//! Deduplicating Archive Writer
//!
//! Writes one record per process plus exactly one record per distinct shared
//! entity it references. Shared entities get content-derived identifiers, so
//! a single set of already written identifiers is enough to skip repeats.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, error, info, info_span, warn};

use lci_models::{
    DqSystemRef, Exchange as ExchangeSpec, FlowSpec, LocationSpec, ProcessMetadata, ProcessNode,
    ProviderSpec, UnitReference, UnitTable,
};

use crate::identity::{self, ModelType};
use crate::normalize::Normalizer;
use crate::schema::{
    Category, Exchange, Flow, FlowPropertyFactor, Location, NamedEntity, Process,
    ProcessDocumentation, Ref, UNIT_PROCESS,
};
use crate::sink::{ArchiveSink, ZipSink};

/// Outcome of one writing pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    pub entries: usize,
    pub counts: BTreeMap<ModelType, usize>,
    /// Distinct unit names missing from the unit table
    pub unresolved_units: Vec<String>,
    /// SHA-256 over entry names and bytes, in write order
    pub digest: String,
}

impl ArchiveReport {
    pub fn count(&self, model_type: ModelType) -> usize {
        self.counts.get(&model_type).copied().unwrap_or(0)
    }
}

pub struct ArchiveWriter<'u, S: ArchiveSink> {
    sink: S,
    units: &'u UnitTable,
    created_at: DateTime<Utc>,
    normalizer: Normalizer,
    created_ids: HashSet<String>,
    counts: BTreeMap<ModelType, usize>,
    unresolved_units: BTreeSet<String>,
    hasher: Sha256,
    entries: usize,
}

impl<'u, S: ArchiveSink> ArchiveWriter<'u, S> {
    /// `created_at` becomes the creation date of every process documentation
    pub fn new(sink: S, units: &'u UnitTable, created_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            sink,
            units,
            created_at,
            normalizer: Normalizer::new()?,
            created_ids: HashSet::new(),
            counts: BTreeMap::new(),
            unresolved_units: BTreeSet::new(),
            hasher: Sha256::new(),
            entries: 0,
        })
    }

    pub fn write_processes<'p, I>(&mut self, processes: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'p ProcessNode>,
    {
        let mut written = 0;
        for node in processes {
            self.write_process(node)
                .with_context(|| format!("Failed to write process {}", node.key))?;
            written += 1;
        }
        Ok(written)
    }

    pub fn write_process(&mut self, node: &ProcessNode) -> Result<Ref> {
        let name = node.name();
        let location_code = node.location_code();
        let id = identity::process_id(&node.category, location_code, name).to_string();
        let process_ref = Ref::of(ModelType::Process, &id, name);

        if !self.created_ids.insert(id.clone()) {
            warn!(process = name, id = %id, "Process already written; skipping");
            return Ok(process_ref);
        }

        let category = self.category(&node.category, ModelType::Process)?;
        let location = self.location(node.location.as_ref())?;
        let process_documentation = self.documentation(node.documentation.as_deref())?;
        let dq_system = node.dq_system.as_ref().map(|dq| self.dq_system(dq)).transpose()?;
        let exchange_dq_system = node
            .exchange_dq_system
            .as_ref()
            .map(|dq| self.dq_system(dq))
            .transpose()?;

        let mut exchanges = Vec::with_capacity(node.exchanges.len());
        for (idx, exchange) in node.exchanges.iter().enumerate() {
            exchanges.push(self.exchange(name, idx as u32 + 1, exchange)?);
        }

        let process = Process {
            schema_type: ModelType::Process.json_type().to_string(),
            id: id.clone(),
            name: name.to_string(),
            description: node.description.clone().filter(|d| !d.trim().is_empty()),
            category,
            process_type: UNIT_PROCESS.to_string(),
            location,
            process_documentation,
            dq_entry: node.dq_entry.as_deref().and_then(|e| self.normalizer.dq_entry(e)),
            dq_system,
            exchange_dq_system,
            exchanges,
        };
        self.put(ModelType::Process, &id, &process)?;

        Ok(process_ref)
    }

    fn exchange(&mut self, process: &str, internal_id: u32, spec: &ExchangeSpec) -> Result<Exchange> {
        let units = self.units;
        let (unit, flow_property) = match units.resolve(&spec.unit) {
            Some(reference) => {
                let flow_property = self.flow_property(reference)?;
                let unit = Ref::new("Unit", reference.unit_id.trim(), reference.unit_name.trim());
                (Some(unit), Some(flow_property))
            }
            None => {
                error!(unit = %spec.unit, process, "Unknown unit; no unit or flow property reference");
                self.unresolved_units.insert(spec.unit.trim().to_string());
                (None, None)
            }
        };

        let flow = self.flow(&spec.flow, flow_property.clone())?;

        Ok(Exchange {
            schema_type: "Exchange".to_string(),
            internal_id,
            avoided_product: spec.avoided_product,
            input: spec.is_input,
            quantitative_reference: spec.is_reference,
            amount: spec.amount,
            unit,
            flow_property,
            flow,
            default_provider: spec.provider.as_ref().map(provider_ref),
            dq_entry: spec.dq_entry.as_deref().and_then(|e| self.normalizer.dq_entry(e)),
            uncertainty: spec.uncertainty.as_ref().and_then(|u| self.normalizer.uncertainty(u)),
            description: spec.comment.clone().filter(|c| !c.trim().is_empty()),
        })
    }

    /// Writes every missing prefix of `path` and returns the deepest one
    fn category(&mut self, path: &str, content_type: ModelType) -> Result<Option<Ref>> {
        let segments = identity::category_segments(path);
        let mut parent: Option<Ref> = None;

        for depth in 1..=segments.len() {
            let name = &segments[depth - 1];
            let id = identity::category_id(content_type, &segments[..depth]).to_string();

            if self.created_ids.insert(id.clone()) {
                let category = Category {
                    schema_type: ModelType::Category.json_type().to_string(),
                    id: id.clone(),
                    name: name.clone(),
                    model_type: content_type.schema_name().to_string(),
                    category: parent.take(),
                };
                self.put(ModelType::Category, &id, &category)?;
            } else {
                debug!(category = %name, depth, "Category already written");
            }

            parent = Some(
                Ref::of(ModelType::Category, id, name)
                    .with_category_path(segments[..depth - 1].to_vec()),
            );
        }

        Ok(parent)
    }

    fn flow(&mut self, spec: &FlowSpec, flow_property: Option<Ref>) -> Result<Ref> {
        if let Some(id) = spec.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            return Ok(Ref::of(ModelType::Flow, id, &spec.name));
        }

        let id = identity::flow_id(&spec.category, &spec.name).to_string();
        if self.created_ids.insert(id.clone()) {
            let category = self.category(&spec.category, ModelType::Flow)?;
            let flow = Flow {
                schema_type: ModelType::Flow.json_type().to_string(),
                id: id.clone(),
                name: spec.name.clone(),
                category,
                flow_type: spec.flow_type.as_str().to_string(),
                flow_properties: vec![FlowPropertyFactor::reference(flow_property)],
            };
            self.put(ModelType::Flow, &id, &flow)?;
        } else {
            debug!(flow = %spec.name, "Flow already written");
        }

        Ok(Ref::of(ModelType::Flow, id, &spec.name)
            .with_category_path(identity::category_segments(&spec.category)))
    }

    fn location(&mut self, spec: Option<&LocationSpec>) -> Result<Option<Ref>> {
        let Some(spec) = spec else {
            return Ok(None);
        };
        let code = spec.name.trim();
        if code.is_empty() {
            return Ok(None);
        }
        if let Some(id) = spec.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            return Ok(Some(Ref::of(ModelType::Location, id, code)));
        }

        let id = identity::location_id(code).to_string();
        if self.created_ids.insert(id.clone()) {
            let location = Location {
                schema_type: ModelType::Location.json_type().to_string(),
                id: id.clone(),
                name: code.to_string(),
                code: code.to_string(),
            };
            self.put(ModelType::Location, &id, &location)?;
        }

        Ok(Some(Ref::of(ModelType::Location, id, code)))
    }

    fn documentation(&mut self, metadata: Option<&ProcessMetadata>) -> Result<ProcessDocumentation> {
        let mut doc = ProcessDocumentation {
            creation_date: self.created_at.to_rfc3339(),
            ..Default::default()
        };
        let Some(meta) = metadata else {
            return Ok(doc);
        };

        doc.time_description = meta.time_description.clone();
        doc.technology_description = meta.technology_description.clone();
        doc.geography_description = meta.geography_description.clone();
        doc.data_collection_description = meta.data_collection_description.clone();
        doc.completeness_description = meta.completeness_description.clone();
        doc.data_selection_description = meta.data_selection_description.clone();
        doc.review_details = meta.review_details.clone();
        doc.data_treatment_description = meta.data_treatment_description.clone();
        doc.inventory_method_description = meta.inventory_method_description.clone();
        doc.modeling_constants_description = meta.modeling_constants_description.clone();
        doc.sampling_description = meta.sampling_description.clone();
        doc.restrictions_description = meta.restrictions_description.clone();
        doc.intended_application = meta.intended_application.clone();
        doc.project_description = meta.project_description.clone();
        doc.copyright = meta.copyright;

        doc.valid_from = meta.valid_from.as_deref().and_then(|d| self.normalizer.date(d));
        doc.valid_until = meta.valid_until.as_deref().and_then(|d| self.normalizer.date(d));

        doc.reviewer = self.actor(meta.reviewer.as_deref())?;
        doc.data_documentor = self.actor(meta.data_documentor.as_deref())?;
        doc.data_generator = self.actor(meta.data_generator.as_deref())?;
        doc.data_set_owner = self.actor(meta.data_set_owner.as_deref())?;
        doc.publication = self.source(meta.publication.as_deref())?;

        Ok(doc)
    }

    fn actor(&mut self, name: Option<&str>) -> Result<Option<Ref>> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let id = identity::actor_id(name).to_string();
        self.named(ModelType::Actor, id, name).map(Some)
    }

    fn source(&mut self, name: Option<&str>) -> Result<Option<Ref>> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let id = identity::source_id(name).to_string();
        self.named(ModelType::Source, id, name).map(Some)
    }

    fn flow_property(&mut self, reference: &UnitReference) -> Result<Ref> {
        self.named(
            ModelType::FlowProperty,
            reference.flow_property_id.trim().to_string(),
            reference.flow_property_name.trim(),
        )
    }

    fn dq_system(&mut self, dq_system: &DqSystemRef) -> Result<Ref> {
        self.named(ModelType::DqSystem, dq_system.id.trim().to_string(), &dq_system.name)
    }

    fn named(&mut self, model_type: ModelType, id: String, name: &str) -> Result<Ref> {
        if self.created_ids.insert(id.clone()) {
            self.put(model_type, &id, &NamedEntity::new(model_type, &id, name))?;
        } else {
            debug!(model_type = %model_type, id = %id, "Record already written");
        }
        Ok(Ref::of(model_type, id, name))
    }

    fn put<T: Serialize>(&mut self, model_type: ModelType, id: &str, record: &T) -> Result<()> {
        let bytes = serde_json::to_vec(record)
            .with_context(|| format!("Failed to serialize {} {}", model_type, id))?;
        let name = model_type.entry_name(id);

        digest_entry(&mut self.hasher, &name, &bytes);
        self.sink.put(&name, &bytes)?;

        *self.counts.entry(model_type).or_insert(0) += 1;
        self.entries += 1;
        debug!(entry = %name, bytes = bytes.len(), "Archive record written");
        Ok(())
    }

    /// Completes the container and reports what was written
    pub fn finish(mut self) -> Result<ArchiveReport> {
        self.sink.finish()?;

        let report = ArchiveReport {
            entries: self.entries,
            counts: self.counts,
            unresolved_units: self.unresolved_units.into_iter().collect(),
            digest: hex::encode(self.hasher.finalize()),
        };
        info!(
            entries = report.entries,
            unresolved_units = report.unresolved_units.len(),
            digest = %report.digest,
            "Archive finished"
        );
        Ok(report)
    }
}

/// Feeds one entry into the digest, each part prefixed with its length
fn digest_entry(hasher: &mut Sha256, name: &str, bytes: &[u8]) {
    hasher.update((name.len() as u64).to_le_bytes());
    hasher.update(name.as_bytes());
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Default provider reference, identified like the provider process itself
fn provider_ref(provider: &ProviderSpec) -> Ref {
    let category_path = provider.category_path.join("/");
    let id = identity::process_id(&category_path, &provider.location, &provider.name);

    let mut reference = Ref::of(ModelType::Process, id.to_string(), &provider.name)
        .with_category_path(identity::category_segments(&category_path));
    if !provider.location.trim().is_empty() {
        reference.location = Some(provider.location.trim().to_string());
    }
    reference.process_type = Some(UNIT_PROCESS.to_string());
    reference
}

/// Writes `processes` into a new zip archive at `path`
pub fn write_archive<'p, I>(
    path: &Path,
    processes: I,
    units: &UnitTable,
    created_at: DateTime<Utc>,
) -> Result<ArchiveReport>
where
    I: IntoIterator<Item = &'p ProcessNode>,
{
    let _span = info_span!("write_archive", path = %path.display()).entered();

    let sink = ZipSink::create(path)?;
    let mut writer = ArchiveWriter::new(sink, units, created_at)?;
    let processes = writer.write_processes(processes)?;
    let report = writer
        .finish()
        .with_context(|| format!("Failed to finish archive {}", path.display()))?;

    info!(processes, entries = report.entries, "Archive written");
    Ok(report)
}
