//! Neuron reconstructions: SWC morphologies and per-part actors.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::geometry::{Actor, Point3};
use crate::error::{AdapterError, AdapterResult};

/// Sides of the neurite tubes built from a morphology.
pub const NEURITE_TUBE_RESOLUTION: u32 = 8;

/// Soma radius used when the SWC soma nodes carry no radius.
pub const DEFAULT_SOMA_RADIUS: f64 = 10.0;

/// SWC structure type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeuriteType {
    /// Type 1.
    Soma,
    /// Type 2.
    Axon,
    /// Type 3.
    BasalDendrite,
    /// Type 4.
    ApicalDendrite,
    /// Any other (custom) type code.
    Other(u8),
}

impl NeuriteType {
    /// Map an SWC type code.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Soma,
            2 => Self::Axon,
            3 => Self::BasalDendrite,
            4 => Self::ApicalDendrite,
            other => Self::Other(other),
        }
    }
}

/// One sample point of an SWC reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct SwcNode {
    /// Sample id.
    pub id: i64,
    /// Structure type.
    pub kind: NeuriteType,
    /// Position.
    pub position: Point3,
    /// Radius at this sample.
    pub radius: f64,
    /// Parent sample id, `-1` for roots.
    pub parent: i64,
}

/// A parsed neuron morphology.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Morphology {
    nodes: Vec<SwcNode>,
    index: HashMap<i64, usize>,
}

impl Morphology {
    /// Build a morphology from nodes. Later duplicates of an id win.
    pub fn from_nodes(nodes: Vec<SwcNode>) -> Self {
        let index = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        Self { nodes, index }
    }

    /// Parse SWC text (`id type x y z radius parent`, `#` comments).
    pub fn from_swc(text: &str, source: &Path) -> AdapterResult<Self> {
        let mut nodes = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 7 {
                return Err(AdapterError::parse(
                    source,
                    format!("line {}: expected 7 fields, got {}", lineno + 1, fields.len()),
                ));
            }
            let bad = |e: &dyn std::fmt::Display| AdapterError::parse(source, format!("line {}: {e}", lineno + 1));
            let num = |s: &str| s.parse::<f64>().map_err(|e| bad(&e));
            nodes.push(SwcNode {
                id: fields[0].parse().map_err(|e| bad(&e))?,
                kind: NeuriteType::from_code(fields[1].parse().map_err(|e| bad(&e))?),
                position: [num(fields[2])?, num(fields[3])?, num(fields[4])?],
                radius: num(fields[5])?,
                parent: fields[6].parse().map_err(|e| bad(&e))?,
            });
        }
        Ok(Self::from_nodes(nodes))
    }

    /// Read and parse an SWC file.
    pub fn load_swc(path: &Path) -> AdapterResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_swc(&text, path)
    }

    /// All nodes, in file order.
    pub fn nodes(&self) -> &[SwcNode] {
        &self.nodes
    }

    /// Soma centre (mean of soma samples) and radius (largest soma sample).
    pub fn soma(&self) -> Option<(Point3, f64)> {
        let soma: Vec<&SwcNode> = self.nodes.iter().filter(|n| n.kind == NeuriteType::Soma).collect();
        if soma.is_empty() {
            return None;
        }
        let n = soma.len() as f64;
        let mut centre = [0.0; 3];
        for node in &soma {
            for (c, p) in centre.iter_mut().zip(node.position) {
                *c += p / n;
            }
        }
        let radius = soma.iter().map(|n| n.radius).fold(0.0, f64::max);
        Some((centre, if radius > 0.0 { radius } else { DEFAULT_SOMA_RADIUS }))
    }

    /// Parent→child segments whose child sample has type `kind`.
    pub fn segments(&self, kind: NeuriteType) -> Vec<(Point3, Point3, f64)> {
        self.nodes
            .iter()
            .filter(|n| n.kind == kind)
            .filter_map(|n| {
                let parent = self.nodes.get(*self.index.get(&n.parent)?)?;
                Some((parent.position, n.position, n.radius))
            })
            .collect()
    }

    /// Build per-part actors: a soma sphere and one tube per segment.
    ///
    /// `neurite_radius` overrides the per-sample SWC radius.
    pub fn to_parts(&self, neurite_radius: Option<f64>) -> NeuronParts {
        let neurite = |kind| {
            Actor::merge_all(self.segments(kind).into_iter().map(|(a, b, r)| {
                Actor::tube(vec![a, b], neurite_radius.unwrap_or(r), NEURITE_TUBE_RESOLUTION)
            }))
        };
        NeuronParts {
            soma: self.soma().map(|(centre, r)| Actor::sphere(centre, r)),
            axon: neurite(NeuriteType::Axon),
            dendrites: None,
            apical_dendrites: neurite(NeuriteType::ApicalDendrite),
            basal_dendrites: neurite(NeuriteType::BasalDendrite),
        }
    }
}

/// Named parts of a neuron, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NeuronParts {
    /// Cell body.
    pub soma: Option<Actor>,
    /// Axon.
    pub axon: Option<Actor>,
    /// All dendrites, when not split into apical/basal.
    pub dendrites: Option<Actor>,
    /// Apical dendrites.
    pub apical_dendrites: Option<Actor>,
    /// Basal dendrites.
    pub basal_dendrites: Option<Actor>,
}

impl NeuronParts {
    /// Build from a name → actor map.
    ///
    /// Accepted keys: `soma`, `axon`, `dendrites`, `apical_dendrites`,
    /// `basal_dendrites`. Anything else is an argument error.
    pub fn from_map(map: BTreeMap<String, Actor>) -> AdapterResult<Self> {
        let mut parts = Self::default();
        for (key, actor) in map {
            let slot = match key.as_str() {
                "soma" => &mut parts.soma,
                "axon" => &mut parts.axon,
                "dendrites" => &mut parts.dendrites,
                "apical_dendrites" => &mut parts.apical_dendrites,
                "basal_dendrites" => &mut parts.basal_dendrites,
                other => {
                    return Err(AdapterError::argument(format!(
                        "unrecognised neuron part {other:?}"
                    )))
                }
            };
            *slot = Some(actor);
        }
        Ok(parts)
    }
}

/// A neuron in any of the accepted input forms.
#[derive(Debug, Clone, PartialEq)]
pub enum NeuronDescriptor {
    /// Path to a reconstruction file (`.swc` only).
    File(PathBuf),
    /// A single actor for the whole neuron; stored as the soma.
    Whole(Actor),
    /// Named part actors.
    Parts(NeuronParts),
    /// A parsed morphology.
    Morphology(Morphology),
}

impl From<PathBuf> for NeuronDescriptor {
    fn from(p: PathBuf) -> Self {
        Self::File(p)
    }
}

impl From<Actor> for NeuronDescriptor {
    fn from(a: Actor) -> Self {
        Self::Whole(a)
    }
}

impl From<NeuronParts> for NeuronDescriptor {
    fn from(p: NeuronParts) -> Self {
        Self::Parts(p)
    }
}

impl From<Morphology> for NeuronDescriptor {
    fn from(m: Morphology) -> Self {
        Self::Morphology(m)
    }
}

/// A normalised neuron: soma, axon and dendrites, each optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NeuronActors {
    /// Cell body.
    pub soma: Option<Actor>,
    /// Axon.
    pub axon: Option<Actor>,
    /// Dendrites (apical and basal merged).
    pub dendrites: Option<Actor>,
}

impl NeuronActors {
    /// Iterate over the present parts.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        [&self.soma, &self.axon, &self.dendrites].into_iter().flatten()
    }
}
