//! # Graphport Core
//!
//! Schema inference and import model construction for property graph exports.
//!
//! Decides which property identifies each label's rows, discovers which
//! (source, type, target) relationship patterns occur in live data, streams
//! rows into tabular files and renders the importer model document.

pub mod discover;
pub mod error;
pub mod export;
pub mod extract;
pub mod introspect;
pub mod model;
pub mod package;
pub mod resolve;
pub mod schema;
pub mod source;

#[cfg(test)]
mod testing;

pub use error::{ExportError, ExportResult};
pub use export::{plan_export, run_export, ExportOutcome, ExportPlan};
pub use extract::{FileStats, RowSink};
pub use model::{ExportFacts, FormatVersion, ImportModel, MODEL_FILE_NAME};
pub use package::CsvPackager;
pub use schema::{
    ConstraintInfo, EntityType, GraphSchema, IdentifierChoice, IndexInfo, LabelSchema,
    RelationshipPattern, ResolutionMethod,
};
pub use source::{GraphSource, NodeRecord, PropertyStats, RelationshipRecord};
