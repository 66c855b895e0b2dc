//! Property tests for color resolution and coordinate lookups.

use atlas_adapter::resolve::resolve_region_colors;
use atlas_adapter::types::random_colors;
use atlas_adapter::{
    hemisphere_of, mirror_point, AnnotationVolume, RegionColors, RegionDefaults, RegionStyle, Rgb,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn rgb_strategy() -> impl Strategy<Value = Rgb> {
    (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| Rgb::from_u8_triplet([r, g, b]))
}

fn regions_and_colors() -> impl Strategy<Value = (Vec<String>, Vec<Rgb>)> {
    (1usize..12).prop_flat_map(|n| {
        (
            prop::collection::vec("[A-Z][a-z0-9]{0,4}", n),
            prop::collection::vec(rgb_strategy(), n),
        )
    })
}

fn volume_strategy() -> impl Strategy<Value = AnnotationVolume> {
    (1usize..4, 1usize..4, 1usize..4).prop_flat_map(|(x, y, z)| {
        prop::collection::vec(0u32..5, x * y * z)
            .prop_map(move |data| AnnotationVolume::from_flat([x, y, z], data, 25.0).unwrap())
    })
}

proptest! {
    #[test]
    fn test_color_list_maps_by_position((regions, colors) in regions_and_colors()) {
        let style = RegionStyle::new(RegionColors::PerRegion(colors.clone()));
        let resolved = resolve_region_colors(&regions, &style, &RegionDefaults::default(), |_| None).unwrap();
        prop_assert_eq!(resolved.len(), regions.len());
        for (r, c) in resolved.iter().zip(&colors) {
            prop_assert_eq!(r.color, *c);
        }
    }

    #[test]
    fn test_color_list_length_mismatch_is_rejected(
        (regions, mut colors) in regions_and_colors(),
        extra in rgb_strategy(),
    ) {
        colors.push(extra);
        let style = RegionStyle::new(RegionColors::PerRegion(colors));
        let err = resolve_region_colors(&regions, &style, &RegionDefaults::default(), |_| None).unwrap_err();
        prop_assert!(err.is_argument());
    }

    #[test]
    fn test_vip_regions_are_opaque((regions, colors) in regions_and_colors(), alpha in 0.0f32..1.0) {
        let style = RegionStyle::new(RegionColors::PerRegion(colors))
            .with_alpha(alpha)
            .with_vip([regions[0].clone()], None);
        let resolved = resolve_region_colors(&regions, &style, &RegionDefaults::default(), |_| None).unwrap();
        prop_assert_eq!(resolved[0].alpha, 1.0);
    }

    #[test]
    fn test_mirror_twice_is_identity(
        x in -1.0e4f64..1.0e4,
        y in -1.0e4f64..1.0e4,
        z in -1.0e4f64..2.0e4,
        midline in 0.0f64..1.2e4,
    ) {
        let p = [x, y, z];
        let back = mirror_point(mirror_point(p, midline), midline);
        prop_assert_eq!(back[0], x);
        prop_assert_eq!(back[1], y);
        prop_assert!((back[2] - z).abs() < 1e-6);
    }

    #[test]
    fn test_mirror_flips_hemisphere(z in 0.0f64..1.2e4, midline in 0.0f64..1.2e4) {
        prop_assume!((z - midline).abs() > 1e-3);
        let p = [0.0, 0.0, z];
        prop_assert_ne!(hemisphere_of(p, midline), hemisphere_of(mirror_point(p, midline), midline));
    }

    #[test]
    fn test_batched_lookup_matches_single(
        volume in volume_strategy(),
        points in prop::collection::vec(
            (-30.0f64..120.0, -30.0f64..120.0, -30.0f64..120.0).prop_map(|(x, y, z)| [x, y, z]),
            0..20,
        ),
    ) {
        let batched = volume.lookup_many(&points);
        prop_assert_eq!(batched.len(), points.len());
        for (p, id) in points.iter().zip(&batched) {
            prop_assert_eq!(volume.lookup(*p), *id);
            prop_assert_ne!(*id, Some(0));
        }
    }

    #[test]
    fn test_random_colors_are_in_range(n in 0usize..50, seed in any::<u64>()) {
        let colors = random_colors(n, &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(colors.len(), n);
        for c in colors {
            prop_assert!((0.0..=1.0).contains(&c.r));
            prop_assert!((0.0..=1.0).contains(&c.g));
            prop_assert!((0.0..=1.0).contains(&c.b));
        }
    }
}
