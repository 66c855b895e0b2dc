//! Region color and opacity resolution.

use crate::config::RegionDefaults;
use crate::error::{AdapterError, AdapterResult};
use crate::types::Rgb;

/// How regions are colored.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RegionColors {
    /// Each region's color from the structure tree.
    Canonical,
    /// The configured default structure color.
    #[default]
    Default,
    /// One color for every region.
    Single(Rgb),
    /// One color per region, in input order.
    PerRegion(Vec<Rgb>),
}

/// Coloring request for a batch of regions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionStyle {
    /// Color mode.
    pub colors: RegionColors,
    /// Opacity of non-VIP regions; `None` uses the configured default.
    pub alpha: Option<f32>,
    /// Regions drawn with the VIP color at full opacity.
    pub vip_regions: Vec<String>,
    /// VIP color; `None` uses the configured one.
    pub vip_color: Option<Rgb>,
}

impl RegionStyle {
    /// Style with a color mode and defaults for the rest.
    pub fn new(colors: RegionColors) -> Self {
        Self {
            colors,
            ..Self::default()
        }
    }

    /// Set the opacity of non-VIP regions.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Mark regions as VIP.
    pub fn with_vip<I, S>(mut self, regions: I, color: Option<Rgb>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vip_regions = regions.into_iter().map(Into::into).collect();
        self.vip_color = color;
        self
    }
}

/// Color and opacity decided for one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRegionColor {
    /// Fill color.
    pub color: Rgb,
    /// Opacity.
    pub alpha: f32,
}

/// Resolve one color and opacity per region, positions preserved.
///
/// Canonical mode keeps the canonical color for VIP regions and only
/// raises their opacity; the other modes replace it with the VIP color.
/// A style without VIP regions uses the configured default list.
/// Regions without a canonical color get the default structure color.
pub fn resolve_region_colors<F>(
    regions: &[String],
    style: &RegionStyle,
    defaults: &RegionDefaults,
    canonical: F,
) -> AdapterResult<Vec<ResolvedRegionColor>>
where
    F: Fn(&str) -> Option<Rgb>,
{
    if let RegionColors::PerRegion(colors) = &style.colors {
        if colors.len() != regions.len() {
            return Err(AdapterError::argument(format!(
                "got {} colors for {} regions; a color list must have one color per region",
                colors.len(),
                regions.len()
            )));
        }
    }

    let vip_color = style.vip_color.unwrap_or(defaults.vip_color);
    let alpha = style.alpha.unwrap_or(defaults.structure_alpha);
    let vip_regions = if style.vip_regions.is_empty() {
        &defaults.vip_regions
    } else {
        &style.vip_regions
    };

    Ok(regions
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let is_vip = vip_regions.iter().any(|v| v == region);
            let color = match &style.colors {
                RegionColors::Canonical => canonical(region).unwrap_or(defaults.structure_color),
                _ if is_vip => vip_color,
                RegionColors::Default => defaults.structure_color,
                RegionColors::Single(c) => *c,
                RegionColors::PerRegion(colors) => colors[i],
            };
            ResolvedRegionColor {
                color,
                alpha: if is_vip { 1.0 } else { alpha },
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_canonical(_: &str) -> Option<Rgb> {
        None
    }

    const RED: Rgb = Rgb::from_unit(1.0, 0.0, 0.0);
    const BLUE: Rgb = Rgb::from_unit(0.0, 0.0, 1.0);

    #[test]
    fn test_per_region_colors_keep_order() {
        let style = RegionStyle::new(RegionColors::PerRegion(vec![RED, BLUE]));
        let out = resolve_region_colors(&names(&["CA1", "MOs"]), &style, &RegionDefaults::default(), no_canonical)
            .unwrap();
        assert_eq!(out[0].color, RED);
        assert_eq!(out[1].color, BLUE);
    }

    #[test]
    fn test_length_mismatch_is_argument_error() {
        let style = RegionStyle::new(RegionColors::PerRegion(vec![RED]));
        let err = resolve_region_colors(&names(&["CA1", "MOs"]), &style, &RegionDefaults::default(), no_canonical)
            .unwrap_err();
        assert!(err.is_argument());
    }

    #[test]
    fn test_vip_overrides_color_and_alpha() {
        let defaults = RegionDefaults::default();
        let style = RegionStyle::new(RegionColors::Single(BLUE))
            .with_alpha(0.3)
            .with_vip(["CA1"], None);
        let out = resolve_region_colors(&names(&["CA1", "MOs"]), &style, &defaults, no_canonical).unwrap();
        assert_eq!(out[0], ResolvedRegionColor { color: defaults.vip_color, alpha: 1.0 });
        assert_eq!(out[1], ResolvedRegionColor { color: BLUE, alpha: 0.3 });
    }

    #[test]
    fn test_canonical_mode_keeps_vip_color() {
        let defaults = RegionDefaults::default();
        let style = RegionStyle::new(RegionColors::Canonical).with_vip(["CA1"], Some(RED));
        let canonical = |acr: &str| (acr == "CA1").then_some(BLUE);
        let out = resolve_region_colors(&names(&["CA1", "XX"]), &style, &defaults, canonical).unwrap();
        assert_eq!(out[0], ResolvedRegionColor { color: BLUE, alpha: 1.0 });
        assert_eq!(out[1].color, defaults.structure_color);
        assert_eq!(out[1].alpha, defaults.structure_alpha);
    }

    #[test]
    fn test_default_vip_regions_apply_without_style_list() {
        let defaults = RegionDefaults {
            vip_regions: vec!["MOs".into()],
            structure_alpha: 0.3,
            ..RegionDefaults::default()
        };
        let style = RegionStyle::new(RegionColors::Default);
        let out = resolve_region_colors(&names(&["MOs", "CA1"]), &style, &defaults, no_canonical).unwrap();
        assert_eq!(out[0], ResolvedRegionColor { color: Rgb::from_unit(0.8, 0.2, 0.2), alpha: 1.0 });
        assert_eq!(out[1], ResolvedRegionColor { color: defaults.structure_color, alpha: 0.3 });

        let style = style.with_vip(["CA1"], None);
        let out = resolve_region_colors(&names(&["MOs", "CA1"]), &style, &defaults, no_canonical).unwrap();
        assert_eq!(out[0].alpha, 0.3);
        assert_eq!(out[1].alpha, 1.0);
    }
}
