//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark defaults: seven flowers, then bg, grid, text, title, hint, selection.
const ONEDARK: [&str; 13] = [
    "#E06C75", "#E5C07B", "#98C379", "#56B6C2", "#61AFEF", "#C678DD", "#D19A66",
    "#282C34", "#3F444F", "#ABB2BF", "#E5C07B", "#5C6370", "#3E4452",
];

/// Flower and board colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Flower colours, one per type (0..7).
    pub flowers: [Color; 7],
    /// Board background.
    pub bg: Color,
    /// Grid lines / borders.
    pub div_line: Color,
    /// Text (score, preview labels).
    pub main_fg: Color,
    pub title: Color,
    /// Reachable-cell hints and secondary text.
    pub inactive_fg: Color,
    /// Background of the selected flower and the cursor.
    pub selected_bg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

/// Parse one of the hardcoded palette entries; they are all valid.
fn builtin(hex: &str) -> Color {
    parse_hex(hex).unwrap_or(Color::Reset)
}

impl Theme {
    pub fn onedark_default() -> Self {
        let c = ONEDARK.map(builtin);
        Self {
            flowers: [c[0], c[1], c[2], c[3], c[4], c[5], c[6]],
            bg: c[7],
            div_line: c[8],
            main_fg: c[9],
            title: c[10],
            inactive_fg: c[11],
            selected_bg: c[12],
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override flower colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        let hex: [&str; 7] = match palette {
            crate::Palette::Normal => return,
            crate::Palette::HighContrast => [
                "#FF0000", "#FFFF00", "#00FF00", "#00FFFF", "#0088FF", "#FF00FF", "#FFFFFF",
            ],
            // Okabe-Ito: distinguishable under the common colour-vision deficiencies.
            crate::Palette::Colorblind => [
                "#D55E00", "#F0E442", "#009E73", "#56B4E9", "#0072B2", "#CC79A7", "#E69F00",
            ],
        };
        self.flowers = hex.map(builtin);
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::onedark_default();
        // Flower slots borrow btop's gradient/box colours so stock themes look right.
        let flower_keys: [(&str, &str); 7] = [
            ("cpu_end", "temp_end"),
            ("title", "cpu_mid"),
            ("mem_box", "cpu_start"),
            ("hi_fg", "proc_misc"),
            ("cpu_box", "cpu_box"),
            ("net_box", "net_box"),
            ("proc_box", "used_end"),
        ];
        let mut flowers = d.flowers;
        for (slot, (primary, fallback)) in flowers.iter_mut().zip(flower_keys) {
            if let Some(c) = get(primary).or_else(|| get(fallback)) {
                *slot = c;
            }
        }
        Self {
            flowers,
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
            selected_bg: get("selected_bg").unwrap_or(d.selected_bg),
        }
    }

    /// Colour for flower type (0..7).
    #[inline]
    pub fn flower_color(&self, index: u8) -> Color {
        self.flowers[(index as usize) % self.flowers.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'').trim();
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(|v| v * scale)
            .ok_or_else(bad)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?)),
        3 => Ok(Color::Rgb(channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?)),
        _ => Err(bad()),
    }
}
