//! Core types for the atlas adapter.

pub mod color;
pub mod region;
pub mod geometry;
pub mod neuron;
pub mod connectivity;

pub use color::{Rgb, Colormap, random_colors};
pub use region::{Structure, StructureId, RegionRef, StructureSetInfo, Hemisphere};
pub use geometry::{Actor, Shape, MeshData, Point3, DEPTH_AXIS};
pub use neuron::{
    Morphology, SwcNode, NeuriteType, NeuronParts, NeuronDescriptor, NeuronActors,
    NEURITE_TUBE_RESOLUTION,
};
pub use connectivity::{
    TractographyRecord, InjectionStructure, PathPoint, ExperimentSummary, ExperimentId,
    MouseLine, SpatialSearchParams, SourceSearchParams, StreamlineFile, StreamlinePoint,
};
