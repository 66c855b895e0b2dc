//! # atlas-adapter
//!
//! Shapes reference brain atlas data into renderable actors.
//!
//! The adapter answers one kind of question:
//!
//! > Given regions, neurons, experiments or points, what should the
//! > renderer draw, and in which color?
//!
//! ## Core Contract
//!
//! 1. Load the structure ontology, structure sets and annotation volume once,
//!    at construction
//! 2. Resolve caller color and selection arguments into one concrete value per
//!    entity, failing fast on malformed arguments
//! 3. Fetch and cache meshes, spatial searches and streamlines on demand;
//!    a failed item is logged and skipped, never fatal for its batch
//!
//! ## Architecture
//!
//! ```text
//! caller descriptors → resolve::* → Actor values → renderer
//!                          ↓
//!                    AtlasAdapter ─ StructureTree, AnnotationVolume, MeshCache
//!                          ↓
//!                    AtlasProvider (in-memory, local directory, or remote)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Batched lookups preserve input positions
//! - Structure listings are sorted by acronym
//! - Identical connectivity queries share one cache file (xxh64 fingerprint)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod error;
pub mod config;
pub mod tree;
pub mod volume;
pub mod canonical;
pub mod cache;
pub mod provider;
pub mod resolve;
pub mod adapter;

// Re-exports
pub use types::{
    Actor, Shape, MeshData, Point3, Rgb, Colormap, Structure, StructureId, RegionRef,
    Hemisphere, NeuronDescriptor, NeuronParts, NeuronActors, Morphology, TractographyRecord,
    ExperimentSummary, ExperimentId, MouseLine, SpatialSearchParams, SourceSearchParams,
    StreamlineFile,
};
pub use error::{AdapterError, AdapterResult, BatchOutcome};
pub use config::{
    AdapterConfig, RegionDefaults, TractographyDefaults, StreamlineStyle,
    SUMMARY_STRUCTURE_SET_ID, MESH_STRUCTURE_SET,
};
pub use tree::StructureTree;
pub use volume::{AnnotationVolume, AnnotationVolumeFile, hemisphere_of, mirror_point};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use cache::{CachePaths, CacheManifest, MeshCache, CacheStats};
pub use provider::{AtlasProvider, InMemoryProvider, LocalProvider};
pub use resolve::{
    AtlasLookup, RegionColors, RegionStyle, ResolvedRegionColor, NeuronColorSpec, NeuronColor,
    PartColors, NeuronOptions, NeuronOutput, TractColorBy, ManualColors, InjectionRegionCheck,
    TractographyOptions, TractActors, StreamlineColoring,
};
pub use adapter::{AtlasAdapter, RegionActor};
