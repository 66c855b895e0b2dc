//! Colors, named palettes and colormaps.

use rand::Rng;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{AdapterError, AdapterResult};

/// An RGB color with unit-range components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    /// Red in `[0, 1]`.
    pub r: f32,
    /// Green in `[0, 1]`.
    pub g: f32,
    /// Blue in `[0, 1]`.
    pub b: f32,
}

impl Rgb {
    /// Create a color, rejecting components outside `[0, 1]`.
    pub fn new(r: f32, g: f32, b: f32) -> AdapterResult<Self> {
        let valid = |c: f32| c.is_finite() && (0.0..=1.0).contains(&c);
        if valid(r) && valid(g) && valid(b) {
            Ok(Self { r, g, b })
        } else {
            Err(AdapterError::argument(format!(
                "invalid color components ({r}, {g}, {b}): expected values in [0, 1]"
            )))
        }
    }

    /// Create a color from components already known to be in range.
    pub const fn from_unit(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from an 8-bit triplet (the atlas `rgb_triplet`).
    pub fn from_u8_triplet(rgb: [u8; 3]) -> Self {
        Self {
            r: rgb[0] as f32 / 255.0,
            g: rgb[1] as f32 / 255.0,
            b: rgb[2] as f32 / 255.0,
        }
    }

    /// Convert to an 8-bit triplet.
    pub fn to_u8_triplet(&self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Parse `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn from_hex(s: &str) -> AdapterResult<Self> {
        let digits = s.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(AdapterError::argument(format!("invalid hex color: {s}"))),
        };
        let bytes = hex::decode(&expanded)
            .map_err(|e| AdapterError::argument(format!("invalid hex color {s}: {e}")))?;
        Ok(Self::from_u8_triplet([bytes[0], bytes[1], bytes[2]]))
    }

    /// Look up a named color (case-insensitive, `grey`/`gray` both accepted).
    pub fn named(name: &str) -> Option<Self> {
        let key = name.trim().to_lowercase().replace("gray", "grey");
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(_, rgb)| Self::from_u8_triplet(*rgb))
    }

    /// Parse any accepted color string: a name, a hex string, or
    /// `rgb(r, g, b)` with either 0-255 integers or unit floats.
    pub fn parse(s: &str) -> AdapterResult<Self> {
        let trimmed = s.trim();
        if let Some(c) = Self::named(trimmed) {
            return Ok(c);
        }
        if let Some(caps) = rgb_regex().captures(trimmed) {
            let parts: Vec<f32> = (1..=3)
                .map(|i| caps[i].parse::<f32>())
                .collect::<Result<_, _>>()
                .map_err(|e| AdapterError::argument(format!("invalid color {s}: {e}")))?;
            let integral = (1..=3).all(|i| !caps[i].contains('.'));
            return if integral {
                if parts.iter().all(|c| *c <= 255.0) {
                    Ok(Self::from_u8_triplet([parts[0] as u8, parts[1] as u8, parts[2] as u8]))
                } else {
                    Err(AdapterError::argument(format!("invalid color {s}: channel above 255")))
                }
            } else {
                Self::new(parts[0], parts[1], parts[2])
            };
        }
        if trimmed.starts_with('#') || trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(trimmed);
        }
        Err(AdapterError::argument(format!("invalid color: {s}")))
    }

    /// `n` shades of this color, from darker to lighter.
    ///
    /// A single shade is the color itself.
    pub fn shades(&self, n: usize) -> Vec<Rgb> {
        if n <= 1 {
            return vec![*self; n];
        }
        (0..n)
            .map(|i| {
                let t = i as f32 / (n - 1) as f32;
                if t < 0.5 {
                    // darken down to 60%
                    let k = 0.6 + 0.8 * t;
                    Rgb::from_unit(self.r * k, self.g * k, self.b * k)
                } else {
                    // blend up to 40% white
                    let k = (t - 0.5) * 0.8;
                    Rgb::from_unit(
                        self.r + (1.0 - self.r) * k,
                        self.g + (1.0 - self.g) * k,
                        self.b + (1.0 - self.b) * k,
                    )
                }
            })
            .collect()
    }

    /// Linear interpolation towards `other`.
    pub fn lerp(&self, other: &Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        Rgb::from_unit(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }
}

impl FromStr for Rgb {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(rgb: [u8; 3]) -> Self {
        Self::from_u8_triplet(rgb)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_u8_triplet();
        write!(f, "#{}", hex::encode([r, g, b]))
    }
}

fn rgb_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^rgb\(\s*([0-9]*\.?[0-9]+)\s*,\s*([0-9]*\.?[0-9]+)\s*,\s*([0-9]*\.?[0-9]+)\s*\)$")
            .expect("static regex is valid")
    })
}

/// Named colors accepted by [`Rgb::named`].
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("white", [255, 255, 255]),
    ("black", [0, 0, 0]),
    ("grey", [128, 128, 128]),
    ("lightgrey", [211, 211, 211]),
    ("darkgrey", [169, 169, 169]),
    ("silver", [192, 192, 192]),
    ("ivory", [255, 255, 240]),
    ("beige", [245, 245, 220]),
    ("wheat", [245, 222, 179]),
    ("khaki", [240, 230, 140]),
    ("red", [255, 0, 0]),
    ("darkred", [139, 0, 0]),
    ("firebrick", [178, 34, 34]),
    ("crimson", [220, 20, 60]),
    ("tomato", [255, 99, 71]),
    ("salmon", [250, 128, 114]),
    ("coral", [255, 127, 80]),
    ("orangered", [255, 69, 0]),
    ("orange", [255, 165, 0]),
    ("gold", [255, 215, 0]),
    ("yellow", [255, 255, 0]),
    ("olive", [128, 128, 0]),
    ("lime", [0, 255, 0]),
    ("green", [0, 128, 0]),
    ("darkgreen", [0, 100, 0]),
    ("seagreen", [46, 139, 87]),
    ("teal", [0, 128, 128]),
    ("turquoise", [64, 224, 208]),
    ("cyan", [0, 255, 255]),
    ("skyblue", [135, 206, 235]),
    ("steelblue", [70, 130, 180]),
    ("blue", [0, 0, 255]),
    ("darkblue", [0, 0, 139]),
    ("navy", [0, 0, 128]),
    ("indigo", [75, 0, 130]),
    ("purple", [128, 0, 128]),
    ("violet", [238, 130, 238]),
    ("orchid", [218, 112, 214]),
    ("plum", [221, 160, 221]),
    ("lavender", [230, 230, 250]),
    ("magenta", [255, 0, 255]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
];

/// Pick `n` colors at random from the named palette.
pub fn random_colors<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Rgb> {
    (0..n)
        .map(|_| {
            let (_, rgb) = NAMED_COLORS[rng.random_range(0..NAMED_COLORS.len())];
            Rgb::from_u8_triplet(rgb)
        })
        .collect()
}

/// Named colormaps, sampled by linear interpolation between anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    /// Perceptually uniform blue → yellow.
    Viridis,
    /// Perceptually uniform purple → yellow.
    Plasma,
    /// Black → yellow through red.
    Inferno,
    /// Black → cream through magenta.
    Magma,
    /// White → black.
    Greys,
    /// Light → dark red.
    Reds,
    /// Light → dark blue.
    Blues,
    /// Light → dark green.
    Greens,
    /// Classic rainbow.
    Jet,
    /// Diverging blue → red.
    Coolwarm,
}

impl Colormap {
    /// All colormaps, for name listing.
    pub const ALL: [Colormap; 10] = [
        Self::Viridis,
        Self::Plasma,
        Self::Inferno,
        Self::Magma,
        Self::Greys,
        Self::Reds,
        Self::Blues,
        Self::Greens,
        Self::Jet,
        Self::Coolwarm,
    ];

    /// Parse a colormap from its name. Reversed maps (`_r`) are not supported.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "viridis" => Some(Self::Viridis),
            "plasma" => Some(Self::Plasma),
            "inferno" => Some(Self::Inferno),
            "magma" => Some(Self::Magma),
            "greys" | "grays" => Some(Self::Greys),
            "reds" => Some(Self::Reds),
            "blues" => Some(Self::Blues),
            "greens" => Some(Self::Greens),
            "jet" => Some(Self::Jet),
            "coolwarm" => Some(Self::Coolwarm),
            _ => None,
        }
    }

    /// Name of the colormap.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Viridis => "viridis",
            Self::Plasma => "plasma",
            Self::Inferno => "inferno",
            Self::Magma => "magma",
            Self::Greys => "greys",
            Self::Reds => "reds",
            Self::Blues => "blues",
            Self::Greens => "greens",
            Self::Jet => "jet",
            Self::Coolwarm => "coolwarm",
        }
    }

    fn anchors(&self) -> &'static [[u8; 3]] {
        match self {
            Self::Viridis => &[[68, 1, 84], [59, 82, 139], [33, 145, 140], [94, 201, 98], [253, 231, 37]],
            Self::Plasma => &[[13, 8, 135], [126, 3, 168], [204, 71, 120], [248, 149, 64], [240, 249, 33]],
            Self::Inferno => &[[0, 0, 4], [87, 16, 110], [188, 55, 84], [249, 142, 9], [252, 255, 164]],
            Self::Magma => &[[0, 0, 4], [81, 18, 124], [183, 55, 121], [252, 137, 97], [252, 253, 191]],
            Self::Greys => &[[255, 255, 255], [0, 0, 0]],
            Self::Reds => &[[255, 245, 240], [103, 0, 13]],
            Self::Blues => &[[247, 251, 255], [8, 48, 107]],
            Self::Greens => &[[247, 252, 245], [0, 68, 27]],
            Self::Jet => &[
                [0, 0, 127], [0, 0, 255], [0, 127, 255], [0, 255, 255], [127, 255, 127],
                [255, 255, 0], [255, 127, 0], [255, 0, 0], [127, 0, 0],
            ],
            Self::Coolwarm => &[[59, 76, 192], [221, 221, 221], [180, 4, 38]],
        }
    }

    /// Sample the colormap at `t` in `[0, 1]` (clamped).
    pub fn sample(&self, t: f64) -> Rgb {
        let anchors = self.anchors();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let scaled = t * (anchors.len() - 1) as f64;
        let lo = scaled.floor() as usize;
        let hi = (lo + 1).min(anchors.len() - 1);
        let frac = (scaled - lo as f64) as f32;
        Rgb::from_u8_triplet(anchors[lo]).lerp(&Rgb::from_u8_triplet(anchors[hi]), frac)
    }

    /// Map `value` in `[vmin, vmax]` onto the colormap.
    pub fn map(&self, value: f64, vmin: f64, vmax: f64) -> Rgb {
        if vmax <= vmin {
            return self.sample(0.0);
        }
        self.sample((value - vmin) / (vmax - vmin))
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Rgb::parse("salmon").unwrap().to_u8_triplet(), [250, 128, 114]);
        assert_eq!(Rgb::parse("Gray").unwrap().to_u8_triplet(), [128, 128, 128]);
        assert_eq!(Rgb::parse("#ff8000").unwrap().to_u8_triplet(), [255, 128, 0]);
        assert_eq!(Rgb::parse("#f00").unwrap().to_u8_triplet(), [255, 0, 0]);
        assert_eq!(Rgb::parse("rgb(10, 20, 30)").unwrap().to_u8_triplet(), [10, 20, 30]);
        assert_eq!(Rgb::parse("rgb(1.0, 0.5, 0)").unwrap().r, 1.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Rgb::parse("not-a-color").unwrap_err().is_argument());
        assert!(Rgb::parse("rgb(300, 0, 0)").is_err());
        assert!(Rgb::parse("rgb(1.5, 0.0, 0.0)").is_err());
        assert!(Rgb::parse("#12345").is_err());
        assert!(Rgb::new(-0.1, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(Rgb::from_u8_triplet([255, 0, 16]).to_string(), "#ff0010");
    }

    #[test]
    fn test_colormap_endpoints() {
        let cmap = Colormap::from_name("Viridis").unwrap();
        assert_eq!(cmap.sample(0.0).to_u8_triplet(), [68, 1, 84]);
        assert_eq!(cmap.sample(1.0).to_u8_triplet(), [253, 231, 37]);
        assert_eq!(cmap.map(-10.0, 0.0, 1.0), cmap.sample(0.0));
        assert!(Colormap::from_name("salmon").is_none());
    }

    #[test]
    fn test_shades() {
        let base = Rgb::from_unit(0.5, 0.5, 0.5);
        assert_eq!(base.shades(1), vec![base]);
        let shades = base.shades(4);
        assert_eq!(shades.len(), 4);
        assert!(shades[0].r < shades[3].r);
    }

    #[test]
    fn test_random_colors_seeded() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(random_colors(5, &mut a), random_colors(5, &mut b));
    }
}
