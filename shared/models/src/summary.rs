use serde::{Deserialize, Serialize};

/// Per-process summary row for human review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    #[serde(rename = "ProcessName")]
    pub process_name: String,
    #[serde(rename = "NumExchanges")]
    pub num_exchanges: usize,
    /// Inputs referencing a part with no process of its own
    #[serde(rename = "Cutoffs")]
    pub cutoffs: usize,
}

/// Totals over all summary rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub processes: usize,
    pub exchanges: usize,
    pub inputs: usize,
    pub cutoffs: usize,
}

impl SummaryTotals {
    /// Inputs that resolve to a process in the graph
    pub fn linked_inputs(&self) -> usize {
        self.inputs - self.cutoffs
    }
}
