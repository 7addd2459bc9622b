//! Number formatting: numeral-style masks (`"0.0"`, `"0,0"`, `"0.0a"`, ...).
//!
//! The map only needs a handful of masks, so the grammar is small:
//! - `,` anywhere in the mask groups thousands,
//! - the count of `0` after `.` sets the decimal places,
//! - a trailing `a` abbreviates the magnitude (`k`, `m`, `b`, `t`).

use num_format::{Locale, ToFormattedString};

/// Mask used when an indicator has no recognised precision.
pub const GROUPED_MASK: &str = "0,0";

/// Mask used for legend range labels.
pub const ABBREVIATED_MASK: &str = "0.0a";

/// Formatting collaborator used by legends and tooltips.
pub trait NumberFormatter {
    /// Format `value` with a numeral-style `mask`.
    fn format(&self, value: f64, mask: &str) -> String;

    /// Short magnitude form, e.g. `1234.0` -> `"1.2k"`.
    fn format_abbreviated(&self, value: f64) -> String {
        self.format(value, ABBREVIATED_MASK)
    }
}

/// Pick the numeral mask for an indicator's configured precision.
pub fn format_from_precision(precision: i64) -> &'static str {
    match precision {
        1 => "0.0",
        2 => "0.00",
        3 => "0.000",
        _ => GROUPED_MASK,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MaskSpec {
    decimals: usize,
    grouped: bool,
    abbreviate: bool,
}

impl MaskSpec {
    fn parse(mask: &str) -> Self {
        let mask = mask.trim();
        let (body, abbreviate) = match mask.strip_suffix('a') {
            Some(rest) => (rest.trim_end(), true),
            None => (mask, false),
        };
        let decimals = body
            .split_once('.')
            .map_or(0, |(_, frac)| frac.chars().filter(|c| *c == '0').count());
        Self {
            decimals,
            grouped: body.contains(','),
            abbreviate,
        }
    }
}

const ABBREVIATIONS: [(f64, &str); 4] = [(1.0e12, "t"), (1.0e9, "b"), (1.0e6, "m"), (1.0e3, "k")];

/// Default formatter, rounding half away from zero like numeral.js.
#[derive(Debug, Clone, Copy)]
pub struct NumeralFormatter {
    locale: Locale,
}

impl NumeralFormatter {
    pub const fn new(locale: Locale) -> Self {
        Self { locale }
    }
}

impl Default for NumeralFormatter {
    fn default() -> Self {
        Self::new(Locale::en)
    }
}

impl NumberFormatter for NumeralFormatter {
    fn format(&self, value: f64, mask: &str) -> String {
        if !value.is_finite() {
            return if value.is_nan() {
                "NaN".to_string()
            } else if value > 0.0 {
                "Infinity".to_string()
            } else {
                "-Infinity".to_string()
            };
        }
        let spec = MaskSpec::parse(mask);

        let mut unit = if spec.abbreviate {
            ABBREVIATIONS.iter().position(|(size, _)| value.abs() >= *size)
        } else {
            None
        };
        let scale = |unit: Option<usize>| unit.map_or(1.0, |i| ABBREVIATIONS[i].0);
        let mut digits = rounded_digits(value / scale(unit), spec.decimals);
        // Rounding can carry into the next unit: 999.95k -> 1.0m.
        if let Some(i) = unit
            && i > 0
            && digits.len() - spec.decimals > 3
        {
            unit = Some(i - 1);
            digits = rounded_digits(value / scale(unit), spec.decimals);
        }
        let suffix = unit.map_or("", |i| ABBREVIATIONS[i].1);

        let (int_part, frac_part) = digits.split_at(digits.len() - spec.decimals);
        let int_text = match int_part.parse::<u64>() {
            Ok(n) if spec.grouped => n.to_formatted_string(&self.locale),
            _ => int_part.to_string(),
        };

        let mut out = String::with_capacity(digits.len() + 4);
        // no "-0.0"
        if value < 0.0 && digits.bytes().any(|b| b != b'0') {
            out.push('-');
        }
        out.push_str(&int_text);
        if !frac_part.is_empty() {
            out.push_str(self.locale.decimal());
            out.push_str(frac_part);
        }
        out.push_str(suffix);
        out
    }
}

/// Digits of `|value| * 10^decimals` rounded half away from zero, at least `decimals + 1` long.
///
/// The shift goes through the shortest decimal text of `value`, so `8.345` rounds as
/// written to `835` rather than as the binary `834.4999..`.
fn rounded_digits(value: f64, decimals: usize) -> String {
    let magnitude = value.abs();
    let shifted = format!("{magnitude}e{decimals}")
        .parse::<f64>()
        .unwrap_or(magnitude * 10f64.powi(decimals as i32));
    let digits = format!("{:.0}", shifted.round());
    format!("{digits:0>width$}", width = decimals + 1)
}
