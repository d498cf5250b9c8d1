//! Process summaries for human review of the built graph.

use anyhow::{Context, Result};
use std::io::Write;

use lci_models::{ProcessNode, ProcessSummary, SummaryTotals};

use super::graph::ProcessGraph;

/// Read-only fold over a process graph
pub struct ProcessSummarizer;

impl ProcessSummarizer {
    /// One row per process, in graph key order
    pub fn summarize(graph: &ProcessGraph) -> Vec<ProcessSummary> {
        graph
            .processes()
            .map(|node| ProcessSummary {
                process_name: node.key.clone(),
                num_exchanges: node.exchanges.len(),
                cutoffs: Self::cutoffs(graph, node),
            })
            .collect()
    }

    /// Inputs whose flow has no process of its own
    pub fn cutoffs(graph: &ProcessGraph, node: &ProcessNode) -> usize {
        node.inputs()
            .filter(|e| !graph.contains_key(&e.flow.name))
            .count()
    }

    pub fn totals(graph: &ProcessGraph) -> SummaryTotals {
        graph
            .processes()
            .fold(SummaryTotals::default(), |mut totals, node| {
                totals.processes += 1;
                totals.exchanges += node.exchanges.len();
                totals.inputs += node.input_count();
                totals.cutoffs += Self::cutoffs(graph, node);
                totals
            })
    }

    /// Writes `ProcessName,NumExchanges,Cutoffs` rows
    pub fn write_csv<W: Write>(summaries: &[ProcessSummary], writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for summary in summaries {
            csv_writer
                .serialize(summary)
                .with_context(|| format!("Failed to write summary for {}", summary.process_name))?;
        }
        csv_writer.flush().context("Failed to flush process summary")?;
        Ok(())
    }
}
