use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::{BheId, Vault};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Vault palettes: blues for V1, browns for V2, greens for V3
// ---------------------------------------------------------------------------

const BLUES: [&str; 13] = [
    "#4169E1", "#0047AB", "#89CFF0", "#0000FF", "#7393B3", "#0096FF", "#00FFFF", "#6495ED",
    "#6F8FAF", "#6082B6", "#5D3FD3", "#ADD8E6", "#191970",
];

const BROWNS: [&str; 18] = [
    "#E1C16E", "#CD7F32", "#A52A2A", "#F5DEB3", "#DAA06D", "#800020", "#6E260E", "#C19A6B",
    "#D27D2D", "#E97451", "#6F4E37", "#5C4033", "#988558", "#C2B280", "#C19A6B", "#C04000",
    "#A95C68", "#483C32",
];

const GREENS: [&str; 16] = [
    "#097969", "#AFE1AF", "#E4D00A", "#50C878", "#5F8575", "#4F7942", "#228B22", "#7CFC00",
    "#008000", "#355E3B", "#00A36C", "#90EE90", "#32CD32", "#8A9A5B", "#98FB98", "#93C572",
];

fn vault_palette(vault: Vault) -> &'static [&'static str] {
    match vault {
        Vault::West => &BLUES,
        Vault::South => &BROWNS,
        Vault::East => &GREENS,
    }
}

/// Parse `#RRGGBB` (leading `#` optional).
pub fn parse_hex_color(hex: &str) -> Option<Color32> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

// ---------------------------------------------------------------------------
// Color mapping: exchanger → Color32
// ---------------------------------------------------------------------------

/// Colour per exchanger: the n-th member of a vault gets the n-th colour of
/// the vault's palette.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<BheId, Color32>,
    default_color: Color32,
}

impl Default for ColorMap {
    fn default() -> Self {
        let mut mapping = BTreeMap::new();
        for vault in Vault::ALL {
            let palette = vault_palette(vault);
            for (bhe, hex) in vault.members().into_iter().zip(palette.iter()) {
                if let Some(c) = parse_hex_color(hex) {
                    mapping.insert(bhe, c);
                }
            }
        }
        ColorMap {
            mapping,
            default_color: Color32::BLACK,
        }
    }
}

impl ColorMap {
    /// Look up the colour for a given exchanger.
    pub fn color_for(&self, bhe: BheId) -> Color32 {
        self.mapping
            .get(&bhe)
            .copied()
            .unwrap_or(self.default_color)
    }
}
