#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command runners shared by the `simord` binary.
pub mod apps;
/// Dataset assembly, count validation and split output.
pub mod assemble;
/// Resolved pipeline settings.
pub mod config;
/// Centralized constants for origins, layout, and collaborators.
pub mod constants;
/// Origin records and output rows.
pub mod data;
/// Structured identifier parsing.
pub mod ids;
/// Reallocation engine and the persisted map.
pub mod reallocation;
/// Origin registry.
pub mod registry;
/// Console summaries.
pub mod report;
/// Transcript collaborators.
pub mod source;
/// Bucket classification and target splits.
pub mod splits;
/// Input transports (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;
/// Independent allocation verifier.
pub mod verify;

mod errors;

pub use assemble::{AssembledSplits, AssemblyStats, CountValidation, OrdersIndex, assemble};
pub use config::PipelineConfig;
pub use data::{OriginRecord, OriginSet, OutputRow};
pub use errors::SimordError;
pub use ids::{AciBenchId, ConsultationKey, EncounterKey};
pub use reallocation::{Allocation, ReallocationMap, SplitCounts, SplitDelta, reallocate};
pub use registry::Origin;
pub use source::aci_bench::{AciBenchConfig, AciBenchLoader};
pub use source::primock::{PrimockClient, PrimockConfig};
pub use source::{
    ConsultationTranscripts, EncounterIndex, EncounterTranscripts, InMemoryConsultations,
};
pub use splits::{Bucket, TargetSplit, classify};
pub use types::{EncounterId, ExampleId, OrderAnnotation, RowId, SourceId, SubsetName, Transcript};
pub use verify::{Discrepancy, VerificationReport, verify};
