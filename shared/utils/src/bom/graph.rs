//! Process Graph Builder
//!
//! Turns the merged BOM records of a run into process nodes. Every part with
//! at least one child becomes a process whose reference output is the part
//! itself and whose inputs are its immediate children scaled by quantity.
//! Children are indexed by parent part number up front, so construction is a
//! single pass over the records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use lci_models::{
    BomRecord, DqSystemRef, Exchange, FlowSpec, LocationSpec, ProcessMetadata, ProcessNode,
    ProviderSpec,
};

use crate::config::ProcessConfig;

/// How children are matched to their parent part number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    /// Only records from the same source can be children of a part
    #[default]
    PerSource,
    /// Any record naming the part number as its parent is a child
    Global,
}

/// Attributes every built process receives
#[derive(Debug, Clone)]
pub struct ProcessDefaults {
    pub location: String,
    pub category: String,
    pub product_flow_category: String,
    pub unit_name: String,
    pub metadata: Option<Arc<ProcessMetadata>>,
    pub dq_system: Option<DqSystemRef>,
    pub exchange_dq_system: Option<DqSystemRef>,
}

impl ProcessDefaults {
    pub fn with_metadata(mut self, metadata: ProcessMetadata) -> Self {
        self.metadata = Some(Arc::new(metadata));
        self
    }

    /// Category path as segments, for provider references
    pub fn category_segments(&self) -> Vec<String> {
        self.category
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl From<&ProcessConfig> for ProcessDefaults {
    fn from(config: &ProcessConfig) -> Self {
        Self {
            location: config.default_location.clone(),
            category: config.category.clone(),
            product_flow_category: config.product_flow_category.clone(),
            unit_name: config.default_unit.clone(),
            metadata: None,
            dq_system: config.dq_system.clone(),
            exchange_dq_system: config.exchange_dq_system.clone(),
        }
    }
}

impl Default for ProcessDefaults {
    fn default() -> Self {
        Self::from(&ProcessConfig::default())
    }
}

/// Two different parts that produced the same process key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: String,
    pub kept_source: String,
    pub kept_inputs: Vec<String>,
    pub dropped_source: String,
    pub dropped_row: usize,
    pub dropped_inputs: Vec<String>,
}

/// Built processes keyed by `partName-partNumber`, in key order
#[derive(Debug, Clone, Default)]
pub struct ProcessGraph {
    nodes: BTreeMap<String, ProcessNode>,
    collisions: Vec<KeyCollision>,
}

impl ProcessGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ProcessNode> {
        self.nodes.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProcessNode)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessNode> {
        self.nodes.values()
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }

    /// Inserts a node, replacing any node with the same key
    pub fn insert(&mut self, node: ProcessNode) -> Option<ProcessNode> {
        self.nodes.insert(node.key.clone(), node)
    }
}

impl FromIterator<ProcessNode> for ProcessGraph {
    fn from_iter<I: IntoIterator<Item = ProcessNode>>(iter: I) -> Self {
        let mut graph = Self::default();
        for node in iter {
            graph.insert(node);
        }
        graph
    }
}

type ChildIndex<'a> = HashMap<(Option<&'a str>, &'a str), Vec<&'a BomRecord>>;

/// Process graph builder
pub struct GraphBuilder {
    defaults: ProcessDefaults,
    scope: KeyScope,
}

impl GraphBuilder {
    pub fn new(defaults: ProcessDefaults, scope: KeyScope) -> Self {
        Self { defaults, scope }
    }

    pub fn defaults(&self) -> &ProcessDefaults {
        &self.defaults
    }

    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    fn scope_of<'a>(&self, record: &'a BomRecord) -> Option<&'a str> {
        match self.scope {
            KeyScope::PerSource => Some(record.source_id.as_str()),
            KeyScope::Global => None,
        }
    }

    fn index_children<'a>(&self, records: &'a [BomRecord]) -> ChildIndex<'a> {
        let mut index: ChildIndex<'a> = HashMap::new();
        for record in records {
            let parent = record.next_assembly_part_number.trim();
            if record.is_end_marker() || parent.is_empty() {
                continue;
            }
            index
                .entry((self.scope_of(record), parent))
                .or_default()
                .push(record);
        }
        index
    }

    /// Builds the process graph from every record of a run, in reading order
    pub fn build(&self, records: &[BomRecord]) -> ProcessGraph {
        let index = self.index_children(records);
        let mut graph = ProcessGraph::default();
        let mut origins: HashMap<String, (Option<&str>, &str)> = HashMap::new();

        for record in records {
            if record.is_end_marker() {
                continue;
            }
            let origin = (self.scope_of(record), record.part_number.trim());
            let Some(children) = index.get(&origin).filter(|c| !c.is_empty()) else {
                continue;
            };

            let node = self.build_node(record, children, &index);
            match origins.get(&node.key) {
                None => {
                    origins.insert(node.key.clone(), origin);
                    graph.insert(node);
                }
                Some(existing) if *existing == origin => {
                    debug!(key = %node.key, row = record.row_number, "Repeated assembly occurrence skipped");
                }
                Some(_) => {
                    let Some(kept) = graph.get(&node.key) else {
                        continue;
                    };
                    let kept_source = kept.source_id.clone();
                    let kept_inputs = input_names(kept);
                    let dropped_inputs = input_names(&node);
                    if kept_inputs != dropped_inputs {
                        warn!(
                            key = %node.key,
                            kept_source = %kept_source,
                            dropped_source = %record.source_id,
                            row = record.row_number,
                            "Process key produced by unrelated parts; keeping the first"
                        );
                        graph.collisions.push(KeyCollision {
                            key: node.key.clone(),
                            kept_source,
                            kept_inputs,
                            dropped_source: record.source_id.clone(),
                            dropped_row: record.row_number,
                            dropped_inputs,
                        });
                    }
                }
            }
        }

        info!(
            records = records.len(),
            processes = graph.len(),
            collisions = graph.collisions.len(),
            "Process graph built"
        );
        graph
    }

    fn build_node(
        &self,
        record: &BomRecord,
        children: &[&BomRecord],
        index: &ChildIndex<'_>,
    ) -> ProcessNode {
        let defaults = &self.defaults;
        let key = record.process_key();

        let mut node = ProcessNode::new(key.clone(), defaults.category.clone());
        node.location = Some(LocationSpec::code(defaults.location.clone()));
        node.documentation = defaults.metadata.clone();
        node.dq_system = defaults.dq_system.clone();
        node.exchange_dq_system = defaults.exchange_dq_system.clone();
        node.source_id = record.source_id.clone();

        node.exchanges.push(Exchange::reference(
            FlowSpec::product(key, defaults.product_flow_category.clone()),
            defaults.unit_name.clone(),
        ));

        for child in children {
            let amount = child.quantity_per_parent.unwrap_or_else(|| {
                warn!(
                    source_id = %child.source_id,
                    row = child.row_number,
                    part_number = %child.part_number,
                    "Missing quantity per parent, using 0"
                );
                0.0
            });
            let child_key = child.process_key();
            let mut exchange = Exchange::input(
                FlowSpec::product(child_key.clone(), defaults.product_flow_category.clone()),
                amount,
                defaults.unit_name.clone(),
            );

            // Sub-assemblies are produced by their own process
            let child_origin = (self.scope_of(child), child.part_number.trim());
            if index.get(&child_origin).is_some_and(|c| !c.is_empty()) {
                exchange = exchange.with_provider(ProviderSpec {
                    name: child_key,
                    category_path: defaults.category_segments(),
                    location: defaults.location.clone(),
                });
            }
            node.exchanges.push(exchange);
        }

        node
    }
}

fn input_names(node: &ProcessNode) -> Vec<String> {
    node.inputs().map(|e| e.flow.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(level: u32, part: &str, name: &str, qty: Option<f64>, parent: &str, source: &str) -> BomRecord {
        BomRecord::new(level, part, name, qty, parent, source)
    }

    fn builder(scope: KeyScope) -> GraphBuilder {
        GraphBuilder::new(ProcessDefaults::default(), scope)
    }

    #[test]
    fn test_three_row_example() {
        let records = vec![
            rec(0, "P1", "Wing", Some(1.0), "", "BOM_1"),
            rec(1, "P2", "Spar", Some(2.0), "P1", "BOM_1"),
            rec(1, "P3", "Rib", Some(12.0), "P1", "BOM_1"),
        ];
        let graph = builder(KeyScope::PerSource).build(&records);

        assert_eq!(graph.len(), 1);
        let node = graph.get("Wing-P1").unwrap();
        assert_eq!(node.exchanges.len(), 3);

        let reference = node.reference_exchange().unwrap();
        assert_eq!(reference.amount, 1.0);
        assert!(!reference.is_input);
        assert_eq!(reference.flow.name, "Wing-P1");
        assert_eq!(reference.unit, "Item(s)");

        let inputs: Vec<_> = node.inputs().collect();
        assert_eq!(inputs[0].flow.name, "Spar-P2");
        assert_eq!(inputs[0].amount, 2.0);
        assert_eq!(inputs[1].flow.name, "Rib-P3");
        assert_eq!(inputs[1].amount, 12.0);
        assert!(inputs.iter().all(|e| e.provider.is_none()));

        assert!(!graph.contains_key("Spar-P2"));
        assert!(!graph.contains_key("Rib-P3"));
    }

    #[test]
    fn test_defaults_applied_to_nodes() {
        let records = vec![
            rec(0, "P1", "Wing", Some(1.0), "", "BOM_1"),
            rec(1, "P2", "Spar", Some(2.0), "P1", "BOM_1"),
        ];
        let defaults = ProcessDefaults::default().with_metadata(ProcessMetadata {
            reviewer: Some("Jane Analyst".to_string()),
            ..Default::default()
        });
        let graph = GraphBuilder::new(defaults, KeyScope::PerSource).build(&records);
        let node = graph.get("Wing-P1").unwrap();

        assert_eq!(node.location_code(), "US");
        assert_eq!(
            node.category,
            "31-33: Manufacturing/3364: Aerospace Product and Parts Manufacturing"
        );
        assert_eq!(node.source_id, "BOM_1");
        assert_eq!(node.dq_system, Some(DqSystemRef::process_pedigree()));
        assert_eq!(node.exchange_dq_system, Some(DqSystemRef::flow_pedigree()));
        assert_eq!(
            node.documentation.as_ref().and_then(|m| m.reviewer.as_deref()),
            Some("Jane Analyst")
        );
    }

    #[test]
    fn test_sub_assembly_inputs_get_provider() {
        let records = vec![
            rec(0, "P1", "Wing", Some(1.0), "", "BOM_1"),
            rec(1, "P2", "Spar", Some(2.0), "P1", "BOM_1"),
            rec(2, "P4", "Cap", Some(4.0), "P2", "BOM_1"),
            rec(1, "P3", "Rib", Some(12.0), "P1", "BOM_1"),
        ];
        let graph = builder(KeyScope::PerSource).build(&records);
        assert_eq!(graph.keys().collect::<Vec<_>>(), vec!["Spar-P2", "Wing-P1"]);

        let wing = graph.get("Wing-P1").unwrap();
        let inputs: Vec<_> = wing.inputs().collect();
        let provider = inputs[0].provider.as_ref().unwrap();
        assert_eq!(provider.name, "Spar-P2");
        assert_eq!(provider.location, "US");
        assert_eq!(provider.category_path.len(), 2);
        assert!(inputs[1].provider.is_none());
    }

    #[test]
    fn test_missing_quantity_becomes_zero() {
        let records = vec![
            rec(0, "P1", "Wing", Some(1.0), "", "BOM_1"),
            rec(1, "P2", "Spar", None, "P1", "BOM_1"),
        ];
        let graph = builder(KeyScope::PerSource).build(&records);
        let node = graph.get("Wing-P1").unwrap();
        assert_eq!(node.inputs().next().unwrap().amount, 0.0);
    }

    #[test]
    fn test_end_markers_are_never_parents_or_children() {
        let records = vec![
            rec(0, "P1", "Wing", Some(1.0), "", "BOM_1"),
            rec(1, "P2", "Spar", Some(1.0), "P1", "BOM_1"),
            rec(0, "", "notes", None, "", "BOM_1"),
            rec(0, "", "stray", None, "P1", "BOM_1"),
        ];
        let graph = builder(KeyScope::PerSource).build(&records);
        assert_eq!(graph.get("Wing-P1").unwrap().input_count(), 1);
    }

    #[test]
    fn test_per_source_scope_keeps_subtrees_apart() {
        let records = vec![
            rec(0, "A1", "Frame", Some(1.0), "", "BOM_1"),
            rec(1, "100", "Bracket", Some(2.0), "A1", "BOM_1"),
            rec(2, "X1", "Rivet", Some(8.0), "100", "BOM_1"),
            rec(0, "B1", "Door", Some(1.0), "", "BOM_2"),
            rec(1, "100", "Hinge", Some(3.0), "B1", "BOM_2"),
            rec(2, "Y1", "Pin", Some(1.0), "100", "BOM_2"),
        ];

        let scoped = builder(KeyScope::PerSource).build(&records);
        assert_eq!(scoped.get("Bracket-100").unwrap().input_count(), 1);
        assert_eq!(scoped.get("Hinge-100").unwrap().input_count(), 1);
        assert!(scoped.collisions().is_empty());

        // Without scoping both parts named "100" pick up both children
        let global = builder(KeyScope::Global).build(&records);
        assert_eq!(global.get("Bracket-100").unwrap().input_count(), 2);
        assert_eq!(global.get("Hinge-100").unwrap().input_count(), 2);
    }

    #[test]
    fn test_same_key_from_different_sources_is_a_collision() {
        let records = vec![
            rec(0, "100", "Bracket", Some(1.0), "", "BOM_1"),
            rec(1, "X1", "Rivet", Some(8.0), "100", "BOM_1"),
            rec(0, "100", "Bracket", Some(1.0), "", "BOM_2"),
            rec(1, "Y1", "Screw", Some(4.0), "100", "BOM_2").with_row(3),
        ];
        let graph = builder(KeyScope::PerSource).build(&records);

        assert_eq!(graph.len(), 1);
        let node = graph.get("Bracket-100").unwrap();
        assert_eq!(node.source_id, "BOM_1");
        assert_eq!(node.inputs().next().unwrap().flow.name, "Rivet-X1");

        let collisions = graph.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].key, "Bracket-100");
        assert_eq!(collisions[0].kept_source, "BOM_1");
        assert_eq!(collisions[0].dropped_source, "BOM_2");
        assert_eq!(collisions[0].dropped_inputs, vec!["Screw-Y1".to_string()]);
    }

    #[test]
    fn test_identical_assembly_in_two_sources_is_not_a_collision() {
        let records = vec![
            rec(0, "100", "Bracket", Some(1.0), "", "BOM_1"),
            rec(1, "X1", "Rivet", Some(8.0), "100", "BOM_1"),
            rec(0, "100", "Bracket", Some(1.0), "", "BOM_2"),
            rec(1, "X1", "Rivet", Some(8.0), "100", "BOM_2"),
        ];
        let graph = builder(KeyScope::PerSource).build(&records);
        assert_eq!(graph.len(), 1);
        assert!(graph.collisions().is_empty());
    }

    #[test]
    fn test_repeated_occurrence_in_same_source_is_skipped() {
        // The same sub-assembly used under two parents
        let records = vec![
            rec(0, "P1", "Wing", Some(1.0), "", "BOM_1"),
            rec(1, "S1", "Stringer", Some(2.0), "P1", "BOM_1"),
            rec(0, "P2", "Tail", Some(1.0), "", "BOM_1"),
            rec(1, "S1", "Stringer", Some(1.0), "P2", "BOM_1"),
            rec(2, "R1", "Rivet", Some(6.0), "S1", "BOM_1"),
        ];
        let graph = builder(KeyScope::PerSource).build(&records);
        assert_eq!(graph.len(), 3);
        assert!(graph.collisions().is_empty());
        assert_eq!(graph.get("Stringer-S1").unwrap().input_count(), 1);
    }

    #[test]
    fn test_empty_input_builds_empty_graph() {
        let graph = builder(KeyScope::PerSource).build(&[]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_key_scope_serde_names() {
        assert_eq!(serde_json::to_string(&KeyScope::PerSource).unwrap(), "\"per_source\"");
        let scope: KeyScope = serde_json::from_str("\"global\"").unwrap();
        assert_eq!(scope, KeyScope::Global);
    }

    /// Preorder table built from depth steps, with unique part numbers
    fn preorder_table(steps: &[(u32, u8)]) -> Vec<BomRecord> {
        let mut rows = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut level: u32 = 0;
        for (i, (step, qty)) in steps.iter().enumerate() {
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
            rows.push(rec(level, &part, "Part", Some(*qty as f64), &parent, "BOM_1").with_row(i + 1));
            stack.push(part);
        }
        rows
    }

    proptest! {
        #[test]
        fn prop_each_node_has_one_reference_and_all_children(
            steps in prop::collection::vec((0u32..5, 0u8..20), 1..60),
        ) {
            let records = preorder_table(&steps);
            let graph = builder(KeyScope::PerSource).build(&records);

            for node in graph.processes() {
                let references = node.exchanges.iter().filter(|e| e.is_reference).count();
                prop_assert_eq!(references, 1);

                let part = node.key.trim_start_matches("Part-");
                let children = records
                    .iter()
                    .filter(|r| r.next_assembly_part_number == part)
                    .count();
                prop_assert_eq!(node.input_count(), children);
            }

            let parents = records
                .iter()
                .filter(|r| records.iter().any(|c| c.next_assembly_part_number == r.part_number))
                .count();
            prop_assert_eq!(graph.len(), parents);
        }
    }
}
