//! Tractography selection and coloring.

use std::collections::BTreeSet;

use super::AtlasLookup;
use crate::config::TractographyDefaults;
use crate::error::{AdapterError, AdapterResult};
use crate::types::{Actor, ExperimentId, Rgb, TractographyRecord};

/// Explicit tract colors.
#[derive(Debug, Clone, PartialEq)]
pub enum ManualColors {
    /// One color for every record.
    Single(Rgb),
    /// One color per record, in input order.
    PerRecord(Vec<Rgb>),
}

/// How tracts are colored.
#[derive(Debug, Clone, PartialEq)]
pub enum TractColorBy {
    /// Explicit colors; `None` uses the configured tract color.
    Manual(Option<ManualColors>),
    /// Canonical color of each record's source structure.
    Region,
    /// VIP records in one color, the rest in `others_color`.
    ///
    /// Without a `vip_color`, VIP records use the canonical color of their
    /// source structure.
    TargetRegion {
        /// Color of VIP records.
        vip_color: Option<Rgb>,
        /// Color of every other record.
        others_color: Rgb,
    },
}

impl Default for TractColorBy {
    fn default() -> Self {
        Self::Manual(None)
    }
}

/// Where a record's injection structure comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InjectionRegionCheck {
    /// Trust the experiment metadata.
    #[default]
    Metadata,
    /// Look the injection coordinates up in the annotation volume.
    FromCoordinates,
    /// As `FromCoordinates`, keeping only records injected into one of
    /// these structures.
    FromCoordinatesRestricted(Vec<String>),
}

/// Options of [`resolve_tractography`].
#[derive(Debug, Clone, PartialEq)]
pub struct TractographyOptions {
    /// Coloring strategy.
    pub color_by: TractColorBy,
    /// Opacity of non-VIP records under `TargetRegion`. Zero hides them.
    pub others_alpha: f32,
    /// Structures receiving VIP treatment.
    pub vip_regions: Vec<String>,
    /// Match VIP regions against every injection structure instead of the
    /// primary one.
    pub include_all_inj_regions: bool,
    /// Source of the injection structure.
    pub injection_check: InjectionRegionCheck,
    /// Add a sphere at each injection site.
    pub display_injection_volume: bool,
}

impl Default for TractographyOptions {
    fn default() -> Self {
        Self {
            color_by: TractColorBy::default(),
            others_alpha: 1.0,
            vip_regions: Vec::new(),
            include_all_inj_regions: false,
            injection_check: InjectionRegionCheck::Metadata,
            display_injection_volume: true,
        }
    }
}

/// Geometry produced for one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct TractActors {
    /// Experiment id.
    pub experiment: ExperimentId,
    /// Injection site sphere.
    pub injection: Option<Actor>,
    /// Tube along the path.
    pub tract: Actor,
}

impl TractActors {
    /// Flatten a batch into plain actors.
    pub fn into_actors(batch: Vec<TractActors>) -> Vec<Actor> {
        batch
            .into_iter()
            .flat_map(|t| t.injection.into_iter().chain(std::iter::once(t.tract)))
            .collect()
    }
}

fn resolve_colors<L: AtlasLookup>(
    records: &[TractographyRecord],
    options: &TractographyOptions,
    defaults: &TractographyDefaults,
    lookup: &L,
) -> AdapterResult<Vec<Rgb>> {
    let canonical = |acronym: &str| {
        lookup.region_color(acronym).unwrap_or_else(|| {
            tracing::warn!(region = acronym, "no canonical color, using tract color");
            defaults.default_color
        })
    };

    Ok(match &options.color_by {
        TractColorBy::Manual(None) => vec![defaults.default_color; records.len()],
        TractColorBy::Manual(Some(ManualColors::Single(c))) => vec![*c; records.len()],
        TractColorBy::Manual(Some(ManualColors::PerRecord(colors))) => {
            if colors.len() != records.len() {
                return Err(AdapterError::argument(format!(
                    "got {} colors for {} tractography records",
                    colors.len(),
                    records.len()
                )));
            }
            colors.clone()
        }
        TractColorBy::Region => records.iter().map(|r| canonical(&r.structure_abbrev)).collect(),
        TractColorBy::TargetRegion {
            vip_color: Some(vip),
            others_color,
        } => records
            .iter()
            .map(|r| {
                let is_vip = if options.include_all_inj_regions {
                    r.injection_structures
                        .iter()
                        .any(|s| options.vip_regions.contains(&s.abbreviation))
                } else {
                    options.vip_regions.contains(&r.structure_abbrev)
                };
                if is_vip {
                    *vip
                } else {
                    *others_color
                }
            })
            .collect(),
        TractColorBy::TargetRegion {
            vip_color: None,
            others_color,
        } => records
            .iter()
            .map(|r| {
                if options.vip_regions.contains(&r.structure_abbrev) {
                    canonical(&r.structure_abbrev)
                } else {
                    *others_color
                }
            })
            .collect(),
    })
}

/// Build tract and injection actors, one entry per surviving record.
///
/// Records whose opacity resolves to zero, whose injection point has no
/// region, or whose region is outside the allow-list are dropped.
pub fn resolve_tractography<L: AtlasLookup>(
    records: &[TractographyRecord],
    options: &TractographyOptions,
    defaults: &TractographyDefaults,
    lookup: &L,
) -> AdapterResult<Vec<TractActors>> {
    let colors = resolve_colors(records, options, defaults, lookup)?;
    let summary_parent =
        |acronym: &str| lookup.summary_parent(acronym).unwrap_or_else(|| acronym.to_string());
    let is_vip = |structures: &[String]| structures.iter().any(|s| options.vip_regions.contains(s));

    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(records.len());

    for (record, color) in records.iter().zip(colors) {
        let mut inj_structures = if options.include_all_inj_regions {
            record.injection_acronyms()
        } else {
            vec![summary_parent(&record.structure_abbrev)]
        };

        if seen.insert(record.structure_abbrev.clone()) {
            tracing::info!(structure = %record.structure_abbrev, "structure projecting to target");
        }

        let alpha = match options.color_by {
            TractColorBy::TargetRegion { .. } if !is_vip(&inj_structures) => options.others_alpha,
            _ => defaults.alpha,
        };
        if alpha <= 0.0 {
            tracing::debug!(experiment = record.id, "transparent tract dropped");
            continue;
        }

        match &options.injection_check {
            InjectionRegionCheck::Metadata => {}
            check => {
                let Some(region) = lookup.region_at(record.injection_coordinates) else {
                    tracing::debug!(experiment = record.id, "injection site outside annotated volume");
                    continue;
                };
                inj_structures = vec![summary_parent(&region)];
                if let InjectionRegionCheck::FromCoordinatesRestricted(allowed) = check {
                    if !inj_structures.iter().any(|s| allowed.contains(s)) {
                        continue;
                    }
                }
            }
        }

        let injection = options.display_injection_volume.then(|| {
            Actor::sphere(
                record.injection_coordinates,
                defaults.injection_volume_size * record.injection_volume,
            )
            .with_color(color)
            .with_alpha(defaults.alpha)
        });
        let tract = Actor::tube(record.path_points(), defaults.radius, defaults.resolution)
            .with_color(color)
            .with_alpha(alpha)
            .with_name(record.id.to_string());

        out.push(TractActors {
            experiment: record.id,
            injection,
            tract,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::fixtures::MapLookup;
    use crate::types::{InjectionStructure, PathPoint, Shape};

    const RED: Rgb = Rgb::from_unit(1.0, 0.0, 0.0);
    const BLUE: Rgb = Rgb::from_unit(0.0, 0.0, 1.0);
    const WHITE: Rgb = Rgb::from_unit(1.0, 1.0, 1.0);

    fn make_record(id: ExperimentId, acronym: &str, z: f64) -> TractographyRecord {
        TractographyRecord {
            id,
            injection_coordinates: [100.0, 200.0, z],
            injection_volume: 0.5,
            structure_abbrev: acronym.to_string(),
            structure_name: None,
            injection_structures: vec![InjectionStructure {
                abbreviation: acronym.to_string(),
                id: None,
                name: None,
            }],
            path: vec![
                PathPoint { coord: [100.0, 200.0, z], density: None, intensity: None },
                PathPoint { coord: [500.0, 600.0, z], density: None, intensity: None },
            ],
            transgenic_line: None,
        }
    }

    fn lookup() -> MapLookup {
        let mut l = MapLookup::default();
        l.colors.insert("MOs".into(), BLUE);
        l.parents.insert("MOs5".into(), "MOs".into());
        l.regions_by_z.push((3000.0, "MOs5".into()));
        l
    }

    #[test]
    fn test_manual_default_color_and_sphere_size() {
        let defaults = TractographyDefaults::default();
        let out = resolve_tractography(&[make_record(1, "MOs", 0.0)], &TractographyOptions::default(), &defaults, &lookup())
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tract.color, Some(defaults.default_color));
        let injection = out[0].injection.as_ref().unwrap();
        assert_eq!(injection.shape, Shape::Sphere { center: [100.0, 200.0, 0.0], radius: 60.0 });
    }

    #[test]
    fn test_per_record_length_checked() {
        let options = TractographyOptions {
            color_by: TractColorBy::Manual(Some(ManualColors::PerRecord(vec![RED]))),
            ..Default::default()
        };
        let records = [make_record(1, "MOs", 0.0), make_record(2, "CA1", 0.0)];
        let err = resolve_tractography(&records, &options, &TractographyDefaults::default(), &lookup()).unwrap_err();
        assert!(err.is_argument());
    }

    #[test]
    fn test_transparent_records_are_absent() {
        let options = TractographyOptions {
            color_by: TractColorBy::TargetRegion { vip_color: Some(RED), others_color: WHITE },
            vip_regions: vec!["MOs".into()],
            others_alpha: 0.0,
            ..Default::default()
        };
        let records = [make_record(1, "MOs", 0.0), make_record(2, "CA1", 0.0)];
        let out = resolve_tractography(&records, &options, &TractographyDefaults::default(), &lookup()).unwrap();
        assert_eq!(out.iter().map(|t| t.experiment).collect::<Vec<_>>(), vec![1]);
        assert_eq!(out[0].tract.color, Some(RED));
    }

    #[test]
    fn test_target_region_without_vip_color_uses_canonical() {
        let options = TractographyOptions {
            color_by: TractColorBy::TargetRegion { vip_color: None, others_color: WHITE },
            vip_regions: vec!["MOs".into()],
            ..Default::default()
        };
        let records = [make_record(1, "MOs", 0.0), make_record(2, "CA1", 0.0)];
        let out = resolve_tractography(&records, &options, &TractographyDefaults::default(), &lookup()).unwrap();
        assert_eq!(out[0].tract.color, Some(BLUE));
        assert_eq!(out[1].tract.color, Some(WHITE));
    }

    #[test]
    fn test_coordinates_check_with_allow_list() {
        let records = [make_record(1, "CA1", 3000.0), make_record(2, "CA1", 1.0)];
        let options = TractographyOptions {
            injection_check: InjectionRegionCheck::FromCoordinates,
            display_injection_volume: false,
            ..Default::default()
        };
        let out = resolve_tractography(&records, &options, &TractographyDefaults::default(), &lookup()).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].injection.is_none());

        let restricted = TractographyOptions {
            injection_check: InjectionRegionCheck::FromCoordinatesRestricted(vec!["SSp".into()]),
            ..Default::default()
        };
        let out = resolve_tractography(&records, &restricted, &TractographyDefaults::default(), &lookup()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_into_actors_flattens() {
        let out = resolve_tractography(
            &[make_record(1, "MOs", 0.0)],
            &TractographyOptions::default(),
            &TractographyDefaults::default(),
            &lookup(),
        )
        .unwrap();
        assert_eq!(TractActors::into_actors(out).len(), 2);
    }

    #[test]
    fn test_region_mode_uses_canonical_colors_in_order() {
        let mut l = lookup();
        l.colors.insert("CA1".into(), RED);
        let options = TractographyOptions {
            color_by: TractColorBy::Region,
            ..Default::default()
        };
        let defaults = TractographyDefaults::default();
        let records = [make_record(1, "CA1", 0.0), make_record(2, "MOs", 0.0), make_record(3, "XX", 0.0)];
        let out = resolve_tractography(&records, &options, &defaults, &l).unwrap();
        let colors: Vec<_> = out.iter().map(|t| t.tract.color).collect();
        assert_eq!(colors, vec![Some(RED), Some(BLUE), Some(defaults.default_color)]);
        assert_eq!(out[1].injection.as_ref().unwrap().color, Some(BLUE));
    }

    #[test]
    fn test_secondary_injection_structure_counts_when_all_included() {
        let mut record = make_record(1, "CA1", 0.0);
        record.injection_structures.push(InjectionStructure {
            abbreviation: "MOs".into(),
            id: None,
            name: None,
        });
        let mut options = TractographyOptions {
            color_by: TractColorBy::TargetRegion { vip_color: Some(RED), others_color: WHITE },
            vip_regions: vec!["MOs".into()],
            others_alpha: 0.2,
            include_all_inj_regions: true,
            ..Default::default()
        };
        let defaults = TractographyDefaults::default();

        let out = resolve_tractography(std::slice::from_ref(&record), &options, &defaults, &lookup()).unwrap();
        assert_eq!(out[0].tract.color, Some(RED));
        assert_eq!(out[0].tract.alpha, defaults.alpha);

        options.include_all_inj_regions = false;
        let out = resolve_tractography(std::slice::from_ref(&record), &options, &defaults, &lookup()).unwrap();
        assert_eq!(out[0].tract.color, Some(WHITE));
        assert_eq!(out[0].tract.alpha, 0.2);
    }
}
