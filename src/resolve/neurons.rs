//! Neuron normalization and coloring.
//!
//! A neuron arrives as a file, a single actor, a map of parts or a parsed
//! morphology. [`normalize_neuron`] reduces all of them to
//! [`NeuronActors`]; [`resolve_neuron_colors`] turns a
//! [`NeuronColorSpec`] into one palette per neuron.

use rand::Rng;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AdapterError, AdapterResult};
use crate::types::{Colormap, Morphology, NeuronActors, NeuronDescriptor, NeuronParts, Rgb};

/// Per-part colors. `soma` is required; the others default to it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartColors {
    /// Soma color.
    pub soma: Option<Rgb>,
    /// Axon color.
    pub axon: Option<Rgb>,
    /// Dendrite color.
    pub dendrites: Option<Rgb>,
}

impl PartColors {
    /// All parts colored alike.
    pub fn uniform(color: Rgb) -> Self {
        Self {
            soma: Some(color),
            axon: None,
            dendrites: None,
        }
    }

    fn palette(&self) -> AdapterResult<NeuronPalette> {
        let soma = self.soma.ok_or_else(|| {
            AdapterError::argument(format!(
                "part colors must include a soma color, got {self:?}"
            ))
        })?;
        Ok(NeuronPalette {
            soma,
            axon: self.axon.unwrap_or(soma),
            dendrites: self.dendrites.unwrap_or(soma),
        })
    }
}

/// One entry of a per-neuron color list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeuronColor {
    /// Every part of the neuron in one color.
    Plain(Rgb),
    /// Separate part colors.
    Parts(PartColors),
}

/// How neurons are colored.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NeuronColorSpec {
    /// A random color per neuron.
    #[default]
    Random,
    /// Colormap sampled by neuron index.
    Colormap(Colormap),
    /// One color for every neuron.
    Single(Rgb),
    /// The same part colors for every neuron.
    Parts(PartColors),
    /// One entry per neuron; all entries must be the same kind.
    PerNeuron(Vec<NeuronColor>),
}

impl FromStr for NeuronColorSpec {
    type Err = AdapterError;

    /// A colormap name, otherwise a single color.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Colormap::from_name(s) {
            Some(cmap) => Ok(Self::Colormap(cmap)),
            None => Rgb::parse(s).map(Self::Single),
        }
    }
}

/// Resolved colors of one neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronPalette {
    /// Soma color.
    pub soma: Rgb,
    /// Axon color.
    pub axon: Rgb,
    /// Dendrite color.
    pub dendrites: Rgb,
}

impl NeuronPalette {
    /// Same color for every part.
    pub fn uniform(color: Rgb) -> Self {
        Self {
            soma: color,
            axon: color,
            dendrites: color,
        }
    }

    /// Color the parts of a neuron. Missing parts are left alone.
    pub fn apply(&self, neuron: &mut NeuronActors) {
        if let Some(soma) = neuron.soma.as_mut() {
            soma.set_color(self.soma);
        }
        if let Some(axon) = neuron.axon.as_mut() {
            axon.set_color(self.axon);
        }
        if let Some(dendrites) = neuron.dendrites.as_mut() {
            dendrites.set_color(self.dendrites);
        }
    }
}

/// Resolve one palette per neuron.
pub fn resolve_neuron_colors<R: Rng + ?Sized>(
    spec: &NeuronColorSpec,
    n: usize,
    rng: &mut R,
) -> AdapterResult<Vec<NeuronPalette>> {
    match spec {
        NeuronColorSpec::Random => Ok(crate::types::random_colors(n, rng)
            .into_iter()
            .map(NeuronPalette::uniform)
            .collect()),
        NeuronColorSpec::Colormap(cmap) => {
            let vmax = n as f64 + 2.0;
            Ok((0..n)
                .map(|i| NeuronPalette::uniform(cmap.map(i as f64, -2.0, vmax)))
                .collect())
        }
        NeuronColorSpec::Single(color) => Ok(vec![NeuronPalette::uniform(*color); n]),
        NeuronColorSpec::Parts(parts) => Ok(vec![parts.palette()?; n]),
        NeuronColorSpec::PerNeuron(list) => {
            if list.len() != n {
                return Err(AdapterError::argument(format!(
                    "color list length ({}) should match the number of neurons ({n})",
                    list.len()
                )));
            }
            let plain = list.iter().filter(|c| matches!(c, NeuronColor::Plain(_))).count();
            if plain != 0 && plain != list.len() {
                return Err(AdapterError::argument(
                    "color list mixes plain colors and part colors",
                ));
            }
            list.iter()
                .map(|c| match c {
                    NeuronColor::Plain(color) => Ok(NeuronPalette::uniform(*color)),
                    NeuronColor::Parts(parts) => parts.palette(),
                })
                .collect()
        }
    }
}

/// Options of a neuron batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuronOptions {
    /// Coloring.
    pub color: NeuronColorSpec,
    /// Keep the axon.
    pub display_axon: bool,
    /// Keep the dendrites.
    pub display_dendrites: bool,
    /// Opacity of every part.
    pub alpha: f32,
    /// Tube radius for neurites built from a morphology.
    pub neurite_radius: Option<f64>,
}

impl Default for NeuronOptions {
    fn default() -> Self {
        Self {
            color: NeuronColorSpec::Random,
            display_axon: true,
            display_dendrites: true,
            alpha: 1.0,
            neurite_radius: None,
        }
    }
}

/// Normalize, filter and color a batch of neurons.
///
/// Colors are resolved before any file is read, so a bad color argument
/// fails without touching the filesystem.
pub fn resolve_neurons<R: Rng + ?Sized>(
    descriptors: Vec<NeuronDescriptor>,
    options: &NeuronOptions,
    rng: &mut R,
) -> AdapterResult<NeuronOutput> {
    let palettes = resolve_neuron_colors(&options.color, descriptors.len(), rng)?;

    let mut neurons = Vec::with_capacity(descriptors.len());
    for (descriptor, palette) in descriptors.into_iter().zip(palettes) {
        let mut neuron = normalize_neuron(descriptor, options.neurite_radius)?;
        if !options.display_axon {
            neuron.axon = None;
        }
        if !options.display_dendrites {
            neuron.dendrites = None;
        }
        palette.apply(&mut neuron);
        for part in [&mut neuron.soma, &mut neuron.axon, &mut neuron.dendrites] {
            if let Some(actor) = part.as_mut() {
                actor.alpha = options.alpha.clamp(0.0, 1.0);
            }
        }
        neurons.push(neuron);
    }

    tracing::debug!(count = neurons.len(), "neurons normalized");
    Ok(NeuronOutput::from_vec(neurons))
}

/// Normalize one neuron descriptor into soma, axon and dendrites.
pub fn normalize_neuron(
    descriptor: NeuronDescriptor,
    neurite_radius: Option<f64>,
) -> AdapterResult<NeuronActors> {
    match descriptor {
        NeuronDescriptor::File(path) => load_neuron_file(&path, neurite_radius),
        NeuronDescriptor::Whole(actor) => Ok(NeuronActors {
            soma: Some(actor),
            ..Default::default()
        }),
        NeuronDescriptor::Parts(parts) => Ok(from_parts(parts)),
        NeuronDescriptor::Morphology(morphology) => {
            Ok(from_parts(morphology.to_parts(neurite_radius)))
        }
    }
}

fn load_neuron_file(path: &Path, neurite_radius: Option<f64>) -> AdapterResult<NeuronActors> {
    if !path.is_file() {
        return Err(AdapterError::argument(format!(
            "neuron file {} does not exist",
            path.display()
        )));
    }
    let is_swc = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("swc"));
    if !is_swc {
        return Err(AdapterError::NotSupported(format!(
            "cannot parse {}: only .swc reconstructions are supported",
            path.display()
        )));
    }
    let morphology = Morphology::load_swc(path)?;
    Ok(from_parts(morphology.to_parts(neurite_radius)))
}

/// Apical and basal dendrites are merged when both exist.
fn from_parts(parts: NeuronParts) -> NeuronActors {
    let dendrites = match (parts.apical_dendrites, parts.basal_dendrites) {
        (Some(apical), Some(basal)) => Some(apical.merge(basal)),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => parts.dendrites,
    };
    NeuronActors {
        soma: parts.soma,
        axon: parts.axon,
        dendrites,
    }
}

/// Result of a neuron batch: nothing, one neuron, or several.
#[derive(Debug, Clone, PartialEq)]
pub enum NeuronOutput {
    /// No neuron was given.
    None,
    /// Exactly one neuron was given.
    Single(NeuronActors),
    /// Two or more neurons.
    Many(Vec<NeuronActors>),
}

impl NeuronOutput {
    /// Wrap a list according to its length.
    pub fn from_vec(mut neurons: Vec<NeuronActors>) -> Self {
        match neurons.len() {
            0 => Self::None,
            1 => neurons.pop().map_or(Self::None, Self::Single),
            _ => Self::Many(neurons),
        }
    }

    /// Number of neurons.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(_) => 1,
            Self::Many(list) => list.len(),
        }
    }

    /// True for [`NeuronOutput::None`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Flatten into a list.
    pub fn into_vec(self) -> Vec<NeuronActors> {
        match self {
            Self::None => Vec::new(),
            Self::Single(n) => vec![n],
            Self::Many(list) => list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Actor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const RED: Rgb = Rgb::from_unit(1.0, 0.0, 0.0);
    const BLUE: Rgb = Rgb::from_unit(0.0, 0.0, 1.0);

    fn tube(z: f64) -> Actor {
        Actor::tube(vec![[0.0, 0.0, z], [1.0, 0.0, z]], 1.0, 8)
    }

    #[test]
    fn test_single_dendrite_part_used_unchanged() {
        let parts = NeuronParts {
            apical_dendrites: Some(tube(1.0)),
            ..Default::default()
        };
        let neuron = normalize_neuron(parts.into(), None).unwrap();
        assert_eq!(neuron.dendrites, Some(tube(1.0)));
    }

    #[test]
    fn test_apical_and_basal_are_merged() {
        let parts = NeuronParts {
            apical_dendrites: Some(tube(1.0)),
            basal_dendrites: Some(tube(2.0)),
            dendrites: Some(tube(3.0)),
            ..Default::default()
        };
        let neuron = normalize_neuron(parts.into(), None).unwrap();
        assert_eq!(neuron.dendrites, Some(tube(1.0).merge(tube(2.0))));
    }

    #[test]
    fn test_whole_actor_becomes_soma() {
        let neuron = normalize_neuron(Actor::sphere([0.0; 3], 5.0).into(), None).unwrap();
        assert!(neuron.soma.is_some());
        assert!(neuron.axon.is_none() && neuron.dendrites.is_none());
    }

    #[test]
    fn test_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.swc");
        assert!(normalize_neuron(missing.into(), None).unwrap_err().is_argument());

        let json = dir.path().join("neuron.json");
        std::fs::write(&json, "{}").unwrap();
        assert!(matches!(
            normalize_neuron(json.into(), None),
            Err(AdapterError::NotSupported(_))
        ));
    }

    #[test]
    fn test_swc_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cell.SWC");
        std::fs::write(&path, "1 1 0 0 0 5 -1\n2 2 0 0 10 1 1\n3 3 0 10 0 1 1\n").unwrap();
        let neuron = normalize_neuron(path.into(), Some(2.0)).unwrap();
        assert!(neuron.soma.is_some());
        assert!(neuron.axon.is_some());
        assert!(neuron.dendrites.is_some());
    }

    #[test]
    fn test_colormap_uses_padded_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let spec = NeuronColorSpec::Colormap(Colormap::Viridis);
        let palettes = resolve_neuron_colors(&spec, 3, &mut rng).unwrap();
        assert_eq!(palettes.len(), 3);
        assert_eq!(palettes[0].soma, Colormap::Viridis.map(0.0, -2.0, 5.0));
        assert_eq!(palettes[2].axon, Colormap::Viridis.map(2.0, -2.0, 5.0));
    }

    #[test]
    fn test_part_colors_default_to_soma() {
        let mut rng = StdRng::seed_from_u64(1);
        let spec = NeuronColorSpec::Parts(PartColors {
            soma: Some(RED),
            axon: Some(BLUE),
            dendrites: None,
        });
        let palettes = resolve_neuron_colors(&spec, 2, &mut rng).unwrap();
        assert_eq!(palettes[1], NeuronPalette { soma: RED, axon: BLUE, dendrites: RED });

        let no_soma = NeuronColorSpec::Parts(PartColors { axon: Some(BLUE), ..Default::default() });
        assert!(resolve_neuron_colors(&no_soma, 1, &mut rng).unwrap_err().is_argument());
    }

    #[test]
    fn test_per_neuron_list_checks() {
        let mut rng = StdRng::seed_from_u64(1);
        let short = NeuronColorSpec::PerNeuron(vec![NeuronColor::Plain(RED)]);
        assert!(resolve_neuron_colors(&short, 2, &mut rng).unwrap_err().is_argument());

        let mixed = NeuronColorSpec::PerNeuron(vec![
            NeuronColor::Plain(RED),
            NeuronColor::Parts(PartColors::uniform(BLUE)),
        ]);
        assert!(resolve_neuron_colors(&mixed, 2, &mut rng).unwrap_err().is_argument());

        let plain = NeuronColorSpec::PerNeuron(vec![NeuronColor::Plain(RED), NeuronColor::Plain(BLUE)]);
        let palettes = resolve_neuron_colors(&plain, 2, &mut rng).unwrap();
        assert_eq!(palettes[1], NeuronPalette::uniform(BLUE));
    }

    #[test]
    fn test_spec_from_str() {
        assert_eq!("viridis".parse::<NeuronColorSpec>().unwrap(), NeuronColorSpec::Colormap(Colormap::Viridis));
        assert_eq!("red".parse::<NeuronColorSpec>().unwrap(), NeuronColorSpec::Single(RED));
        assert!("not-a-color".parse::<NeuronColorSpec>().is_err());
    }

    #[test]
    fn test_soma_only_neuron_is_unwrapped() {
        let mut rng = StdRng::seed_from_u64(9);
        let parts = NeuronParts {
            soma: Some(Actor::sphere([0.0; 3], 5.0)),
            axon: Some(tube(1.0)),
            ..Default::default()
        };
        let options = NeuronOptions {
            color: NeuronColorSpec::Single(RED),
            display_axon: false,
            display_dendrites: false,
            alpha: 0.5,
            ..Default::default()
        };
        let out = resolve_neurons(vec![parts.into()], &options, &mut rng).unwrap();
        let NeuronOutput::Single(neuron) = out else {
            panic!("expected a single neuron");
        };
        let soma = neuron.soma.unwrap();
        assert_eq!(soma.color, Some(RED));
        assert_eq!(soma.alpha, 0.5);
        assert!(neuron.axon.is_none());
        assert!(neuron.dendrites.is_none());
    }

    #[test]
    fn test_empty_batch_is_none() {
        let mut rng = StdRng::seed_from_u64(9);
        let out = resolve_neurons(Vec::new(), &NeuronOptions::default(), &mut rng).unwrap();
        assert_eq!(out, NeuronOutput::None);
    }

    #[test]
    fn test_output_wrapping() {
        assert!(NeuronOutput::from_vec(Vec::new()).is_empty());
        assert!(matches!(NeuronOutput::from_vec(vec![NeuronActors::default()]), NeuronOutput::Single(_)));
        assert_eq!(NeuronOutput::from_vec(vec![NeuronActors::default(); 3]).len(), 3);
    }
}
