//! Choropleth classification and the legend that describes it.
//!
//! An indicator is colored by exactly one [`ColorScheme`]:
//! - the donor/donee override for [`PARTNERSHIP_INDICATOR`],
//! - explicit breaks from the indicator config,
//! - otherwise uniform bins over `[min_value, max_value]` using the UI palette.
//!
//! `classify` and `legend` read the same scheme, so map colors and legend rows
//! cannot disagree.

use serde::Serialize;

use crate::format::NumberFormatter;
use crate::models::{ChoroplethBreak, Configs, DATA_NOT_AVAILABLE, Meta, PARTNERSHIP_INDICATOR};

pub const FRAGILE_STATE_LABEL: &str = "Fragile State";
pub const NO_DATA_COLOR: &str = "#eeeeee";
pub const DONOR_LABEL: &str = "Donor";
pub const DONEE_LABEL: &str = "Donee";
pub const DONOR_COLOR: &str = "#5c6bc0";
pub const DONEE_COLOR: &str = "#eeeeee";

/// How a legend row is painted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Swatch {
    /// Hatched "fragile state" pattern, styled by CSS.
    Fragile,
    Color(String),
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub swatch: Swatch,
    pub label: String,
}

impl LegendEntry {
    fn colored(color: &str, label: impl Into<String>) -> Self {
        Self {
            swatch: Swatch::Color(color.to_string()),
            label: label.into(),
        }
    }

    fn fragile() -> Self {
        Self {
            swatch: Swatch::Fragile,
            label: FRAGILE_STATE_LABEL.to_string(),
        }
    }
}

/// Classification rule in effect for one indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorScheme<'a> {
    DonorDonee,
    Breaks(&'a [ChoroplethBreak]),
    Uniform {
        min: Option<f64>,
        max: Option<f64>,
        palette: &'a [String],
    },
}

impl<'a> ColorScheme<'a> {
    /// Select the scheme for `indicator`. `None` when the indicator is not configured.
    pub fn for_indicator(indicator: &str, configs: &'a Configs, meta: &Meta) -> Option<Self> {
        if indicator == PARTNERSHIP_INDICATOR {
            return Some(ColorScheme::DonorDonee);
        }
        let config = configs.indicator(indicator)?;
        if let Some(breaks) = config.choropleth.as_deref() {
            return Some(ColorScheme::Breaks(breaks));
        }
        let bounds = meta.indicators.get(indicator).copied().unwrap_or_default();
        Some(ColorScheme::Uniform {
            min: bounds.min_value,
            max: bounds.max_value,
            palette: &configs.ui.choropleth,
        })
    }

    /// Color for `value`, or `None` when the configuration cannot classify it.
    pub fn classify(&self, value: f64) -> Option<&'a str> {
        match *self {
            ColorScheme::DonorDonee => Some(if value == 1.0 { DONOR_COLOR } else { DONEE_COLOR }),
            ColorScheme::Breaks(breaks) => breaks
                .iter()
                .find(|b| value > b.domain[0] && value < b.domain[1])
                .or_else(|| breaks.last())
                .map(|b| b.color.as_str()),
            ColorScheme::Uniform { min, max, palette } => {
                let index = bin_index(value, min?, max?, palette.len())?;
                palette.get(index).map(String::as_str)
            }
        }
    }

    /// Legend rows for this scheme, sentinels first.
    ///
    /// `None` when the bounds are unknown or the palette is empty, matching `classify`.
    pub fn legend(&self, formatter: &dyn NumberFormatter) -> Option<Vec<LegendEntry>> {
        match *self {
            ColorScheme::DonorDonee => Some(vec![
                LegendEntry::fragile(),
                LegendEntry::colored(DONOR_COLOR, DONOR_LABEL),
                LegendEntry::colored(DONEE_COLOR, DONEE_LABEL),
            ]),
            ColorScheme::Breaks(breaks) => {
                let mut entries = sentinel_entries();
                entries.extend(breaks.iter().map(|b| LegendEntry::colored(&b.color, &b.label)));
                Some(entries)
            }
            ColorScheme::Uniform { min, max, palette } => {
                let (min, max) = (min?, max?);
                let steps = palette.len();
                if steps == 0 {
                    return None;
                }
                let mut entries = sentinel_entries();
                let width = ((max - min) / steps as f64).floor();
                let mut from = min.floor();
                for color in palette {
                    let to = from + width;
                    let label = format!(
                        "{} \u{2013} {}",
                        formatter.format_abbreviated(from),
                        formatter.format_abbreviated(to)
                    );
                    entries.push(LegendEntry::colored(color, label));
                    from = to;
                }
                Some(entries)
            }
        }
    }
}

/// Bucket index for uniform binning: `round((value - min) / step)` clamped to the palette.
///
/// Halves round up. A degenerate range (`min == max`) puts `value == min` in the
/// first bucket.
fn bin_index(value: f64, min: f64, max: f64, steps: usize) -> Option<usize> {
    if steps == 0 {
        return None;
    }
    let step = (max - min) / steps as f64;
    let raw = ((value - min) / step + 0.5).floor();
    // NaN lands in the first bucket too
    if !(raw > 0.0) {
        return Some(0);
    }
    if raw >= steps as f64 {
        return Some(steps - 1);
    }
    Some(raw as usize)
}

fn sentinel_entries() -> Vec<LegendEntry> {
    vec![
        LegendEntry::fragile(),
        LegendEntry::colored(NO_DATA_COLOR, DATA_NOT_AVAILABLE),
    ]
}

/// Color of `value` under the indicator's scheme.
pub fn number_color<'a>(
    value: f64,
    configs: &'a Configs,
    meta: &Meta,
    indicator: &str,
) -> Option<&'a str> {
    ColorScheme::for_indicator(indicator, configs, meta)?.classify(value)
}

/// Legend rows for an indicator, or `None` when no legend is available.
pub fn legend_entries(
    configs: &Configs,
    meta: &Meta,
    indicator: &str,
    formatter: &dyn NumberFormatter,
) -> Option<Vec<LegendEntry>> {
    let entries = ColorScheme::for_indicator(indicator, configs, meta)?.legend(formatter);
    if entries.is_none() {
        log::debug!("no legend for {indicator}: value bounds or palette missing");
    }
    entries
}

/// Render legend rows as the map page's `legend-list` markup.
pub fn legend_html(entries: &[LegendEntry]) -> String {
    let items: String = entries
        .iter()
        .map(|entry| match &entry.swatch {
            Swatch::Fragile => {
                format!("<li><span class=\"swatch fragile\"></span>{}</li>", entry.label)
            }
            Swatch::Color(color) => format!(
                "<li><span class='swatch' style='background:{color}'></span>{}</li>",
                entry.label
            ),
        })
        .collect();
    format!("<ul class='legend-list'>{items}</ul>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_index_rounds_half_up_and_clamps() {
        // step = 25
        assert_eq!(bin_index(12.5, 0.0, 100.0, 4), Some(1));
        assert_eq!(bin_index(12.4, 0.0, 100.0, 4), Some(0));
        assert_eq!(bin_index(-50.0, 0.0, 100.0, 4), Some(0));
        assert_eq!(bin_index(100.0, 0.0, 100.0, 4), Some(3));
        assert_eq!(bin_index(1e9, 0.0, 100.0, 4), Some(3));
        assert_eq!(bin_index(50.0, 0.0, 100.0, 0), None);
    }

    #[test]
    fn degenerate_range() {
        assert_eq!(bin_index(5.0, 5.0, 5.0, 3), Some(0));
        assert_eq!(bin_index(6.0, 5.0, 5.0, 3), Some(2));
        assert_eq!(bin_index(4.0, 5.0, 5.0, 3), Some(0));
    }
}
