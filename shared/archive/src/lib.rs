//! Deduplicating JSON-LD archive output for process graphs.
//!
//! Every shared entity (category, flow, location, actor, source, flow
//! property, DQ system) is written at most once per archive, under an
//! identifier derived from its content.

pub mod identity;
pub mod normalize;
pub mod schema;
pub mod sink;
pub mod writer;

pub use identity::{content_id, ModelType};
pub use normalize::Normalizer;
pub use sink::{ArchiveSink, MemorySink, SinkError, ZipSink};
pub use writer::{write_archive, ArchiveReport, ArchiveWriter};
