//! Streamline coloring and geometry.

use rand::Rng;

use super::AtlasLookup;
use crate::config::StreamlineStyle;
use crate::error::{AdapterError, AdapterResult};
use crate::types::{random_colors, Actor, Point3, Rgb, StreamlineFile};

/// How streamline files are colored.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StreamlineColoring {
    /// The style color.
    #[default]
    Default,
    /// Canonical color of a region, for every file.
    Region(String),
    /// One color for every file.
    Fixed(Rgb),
    /// A different shade of one color per file.
    EachShadeOf(Rgb),
    /// A random color per file.
    EachRandom,
}

/// One color per streamline file.
pub fn resolve_streamline_colors<L, R>(
    coloring: &StreamlineColoring,
    n_files: usize,
    style: &StreamlineStyle,
    lookup: &L,
    rng: &mut R,
) -> AdapterResult<Vec<Rgb>>
where
    L: AtlasLookup,
    R: Rng + ?Sized,
{
    Ok(match coloring {
        StreamlineColoring::Default => vec![style.color; n_files],
        StreamlineColoring::Region(acronym) => {
            let color = lookup.region_color(acronym).ok_or_else(|| {
                AdapterError::argument(format!("could not extract color for region {acronym}"))
            })?;
            vec![color; n_files]
        }
        StreamlineColoring::Fixed(color) => vec![*color; n_files],
        StreamlineColoring::EachShadeOf(color) => color.shades(n_files),
        StreamlineColoring::EachRandom => random_colors(n_files, rng),
    })
}

/// Merge every line and injection site of a file into one actor.
///
/// Injection sites are spheres three times the tube radius. Returns `None`
/// for a file with no geometry.
pub fn streamline_actor(
    file: &StreamlineFile,
    color: Rgb,
    style: &StreamlineStyle,
) -> Option<Actor> {
    let tubes = file.lines.iter().filter(|line| line.len() >= 2).map(|line| {
        let points: Vec<Point3> = line.iter().copied().map(Point3::from).collect();
        Actor::tube(points, style.radius, style.resolution)
    });
    let sites = file
        .injection_sites
        .iter()
        .filter(|_| style.show_injection_site)
        .map(|p| Actor::sphere(Point3::from(*p), style.radius * 3.0));

    Actor::merge_all(tubes.chain(sites)).map(|actor| actor.with_color(color).with_alpha(style.alpha))
}
