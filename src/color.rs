use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Named qualitative palettes
// ---------------------------------------------------------------------------

const PLOTLY: &[&str] = &[
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];
const D3: &[&str] = &[
    "#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B", "#E377C2", "#7F7F7F",
    "#BCBD22", "#17BECF",
];
const G10: &[&str] = &[
    "#3366CC", "#DC3912", "#FF9900", "#109618", "#990099", "#0099C6", "#DD4477", "#66AA00",
    "#B82E2E", "#316395",
];
const T10: &[&str] = &[
    "#4C78A8", "#F58518", "#E45756", "#72B7B2", "#54A24B", "#EECA3B", "#B279A2", "#FF9DA6",
    "#9D755D", "#BAB0AC",
];
const SET1: &[&str] = &[
    "#E41A1C", "#377EB8", "#4DAF4A", "#984EA3", "#FF7F00", "#FFFF33", "#A65628", "#F781BF",
    "#999999",
];
const SET2: &[&str] = &[
    "#66C2A5", "#FC8D62", "#8DA0CB", "#E78AC3", "#A6D854", "#FFD92F", "#E5C494", "#B3B3B3",
];
const SET3: &[&str] = &[
    "#8DD3C7", "#FFFFB3", "#BEBADA", "#FB8072", "#80B1D3", "#FDB462", "#B3DE69", "#FCCDE5",
    "#D9D9D9", "#BC80BD", "#CCEBC5", "#FFED6F",
];
const PASTEL1: &[&str] = &[
    "#FBB4AE", "#B3CDE3", "#CCEBC5", "#DECBE4", "#FED9A6", "#FFFFCC", "#E5D8BD", "#FDDAEC",
    "#F2F2F2",
];
const PASTEL2: &[&str] = &[
    "#B3E2CD", "#FDCDAC", "#CBD5E8", "#F4CAE4", "#E6F5C9", "#FFF2AE", "#F1E2CC", "#CCCCCC",
];
const DARK2: &[&str] = &[
    "#1B9E77", "#D95F02", "#7570B3", "#E7298A", "#66A61E", "#E6AB02", "#A6761D", "#666666",
];

/// Number of hues generated for the `Rainbow` palette.
const RAINBOW_SIZE: usize = 10;

/// Palette names accepted by `plot_colors.main_palette`.
pub const PALETTE_NAMES: &[&str] = &[
    "Plotly", "D3", "G10", "T10", "Set1", "Set2", "Set3", "Pastel1", "Pastel2", "Dark2", "Rainbow",
];

/// Resolve a palette name (case-insensitive) to its colour sequence as
/// `#RRGGBB` strings. Returns `None` for an unknown name.
pub fn named_palette(name: &str) -> Option<Vec<String>> {
    let fixed = match name.to_ascii_lowercase().as_str() {
        "plotly" => PLOTLY,
        "d3" => D3,
        "g10" => G10,
        "t10" => T10,
        "set1" => SET1,
        "set2" => SET2,
        "set3" => SET3,
        "pastel1" => PASTEL1,
        "pastel2" => PASTEL2,
        "dark2" => DARK2,
        "rainbow" => return Some(generate_palette(RAINBOW_SIZE)),
        _ => return None,
    };
    Some(fixed.iter().map(|c| c.to_string()).collect())
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            to_hex(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Colour parsing
// ---------------------------------------------------------------------------

/// Parse a colour given as `#RRGGBB`, `#RGB` or a CSS colour name.
pub fn parse_color(text: &str) -> Option<Srgb<u8>> {
    let text = text.trim();
    if text.starts_with('#') {
        return Srgb::<u8>::from_str(text).ok();
    }
    palette::named::from_str(&text.to_ascii_lowercase())
}

/// Format a colour as `#RRGGBB`.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", color.red, color.green, color.blue)
}

// ---------------------------------------------------------------------------
// Color mapping: group value → colour
// ---------------------------------------------------------------------------

/// Maps the distinct values of the grouping column to palette colours.
///
/// Values are assigned in ascending order and the palette is cycled, so the
/// same program keeps its colour whatever subset is currently visible.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, String>,
    default_color: String,
}

impl ColorMap {
    /// Build a colour map from the grouping column's unique values.
    pub fn new(palette: &[String], unique_values: &BTreeSet<String>) -> Self {
        let mapping = if palette.is_empty() {
            BTreeMap::new()
        } else {
            unique_values
                .iter()
                .zip(palette.iter().cycle())
                .map(|(v, c)| (v.clone(), c.clone()))
                .collect()
        };

        ColorMap {
            mapping,
            default_color: "#808080".to_string(),
        }
    }

    /// Look up the colour for a given group value.
    pub fn color_for(&self, value: &str) -> &str {
        self.mapping
            .get(value)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }
}
