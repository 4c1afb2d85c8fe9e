//! Choropleth shading: map a value onto the `ColorScale` ramp.
//!
//! Colours are interpolated linearly in RGB between `min` and `max`. Missing
//! values get no fill so the renderer can draw its own "no data" pattern.

use crate::models::{ColorScale, MapDataEntry};
use crate::stats::summarize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Parse `#RRGGBB` or `#RGB` (leading `#` optional).
pub fn parse_hex(s: &str) -> Option<Rgb8> {
    let h = s.trim().trim_start_matches('#');
    let digits: String = match h.len() {
        6 => h.to_string(),
        3 => h.chars().flat_map(|c| [c, c]).collect(),
        _ => return None,
    };
    let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(Rgb8 {
        r: byte(0)?,
        g: byte(2)?,
        b: byte(4)?,
    })
}

pub fn rgb_to_hex(c: Rgb8) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8
}

impl ColorScale {
    /// Colour at position `t` in `0..=1` (clamped). `None` if either stop is not a hex colour.
    pub fn interpolate(&self, t: f64) -> Option<String> {
        let lo = parse_hex(&self.min)?;
        let hi = parse_hex(&self.max)?;
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        Some(rgb_to_hex(Rgb8 {
            r: lerp(lo.r, hi.r, t),
            g: lerp(lo.g, hi.g, t),
            b: lerp(lo.b, hi.b, t),
        }))
    }

    /// Fill for `value` on the domain `lo..=hi`. A flat domain maps to the max colour.
    pub fn shade(&self, value: Option<f64>, lo: f64, hi: f64) -> Option<String> {
        let v = value.filter(|v| v.is_finite())?;
        let t = if hi > lo { (v - lo) / (hi - lo) } else { 1.0 };
        self.interpolate(t)
    }
}

/// Fill colour per row, using the table's own min/max as the domain.
pub fn fill_colors<'a>(
    entries: &'a [MapDataEntry],
    scale: &ColorScale,
) -> Vec<(&'a str, Option<String>)> {
    let summary = summarize(entries);
    let (lo, hi) = match (summary.min, summary.max) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => (0.0, 0.0),
    };
    entries
        .iter()
        .map(|e| (e.unit_code(), scale.shade(e.value, lo, hi)))
        .collect()
}
