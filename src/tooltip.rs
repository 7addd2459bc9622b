//! Tooltip resolution: from a hovered region to the text shown in the map popup.
//!
//! ### Flow
//! 1. ISO code of the hovered feature -> region key (first match in `meta.locations`)
//! 2. Region/indicator lookup in `data.locations`; gaps resolve to [`DATA_NOT_AVAILABLE`]
//! 3. Donor/donee override, year lookup, or plain value
//! 4. Number formatting per indicator precision, then the indicator's tooltip template
//! 5. Title + value handed to a [`TooltipSurface`]
//!
//! ```
//! use wbi_map::models::{Configs, Global};
//! use wbi_map::tooltip::TooltipResolver;
//!
//! let configs: Configs = serde_json::from_str(r#"{
//!     "indicators": {"literacy": {"precision": 1, "tooltip": "{{ currentIndicator }}%"}},
//!     "ui": {"choropleth": []}
//! }"#)?;
//! let global: Global = serde_json::from_str(r#"{
//!     "meta": {"indicators": {}, "locations": {"kenya": {"ISO": "KEN"}}},
//!     "data": {"locations": {"kenya": {"literacy": 78.73}}}
//! }"#)?;
//! let resolver = TooltipResolver::new(&configs, &global);
//! assert_eq!(resolver.resolve_value("KEN", "literacy", None), "78.7%");
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::classify::{ColorScheme, DONEE_LABEL, DONOR_LABEL, NO_DATA_COLOR};
use crate::format::{GROUPED_MASK, NumberFormatter, NumeralFormatter, format_from_precision};
use crate::models::{
    Configs, DATA_NOT_AVAILABLE, Global, IndicatorConfig, IndicatorValue, PARTNERSHIP_INDICATOR,
};
use crate::normalize::resolve_by_code;
use crate::template::{Context, DiagnosticSink, LogSink, Value, compile_template_with};

static DEFAULT_FORMATTER: NumeralFormatter = NumeralFormatter::new(num_format::Locale::en);

/// Geographic position of the popup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Bounding box of a region shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub fn center(&self) -> LatLng {
        LatLng {
            lat: (self.south_west.lat + self.north_east.lat) / 2.0,
            lng: (self.south_west.lng + self.north_east.lng) / 2.0,
        }
    }
}

/// The region shape the pointer is on, as carried by the map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFeature {
    pub iso: String,
    /// Name shown as the popup title.
    pub iso_name: String,
    pub bounds: Bounds,
}

/// Resolved popup content.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub text: String,
    pub position: LatLng,
}

/// The map popup and the layer it belongs to.
pub trait TooltipSurface {
    fn set_position(&mut self, position: LatLng);
    fn set_content(&mut self, markup: &str);
    /// Attach the popup to the map unless it is already open.
    fn open_if_detached(&mut self);
    fn bring_to_front(&mut self, feature: &RegionFeature);
}

/// What the rendering engine supports. Some engines break hover handling when
/// layers are reordered, so callers turn `layer_reordering` off for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub layer_reordering: bool,
}

impl Default for SurfaceCapabilities {
    fn default() -> Self {
        Self {
            layer_reordering: true,
        }
    }
}

/// Resolves tooltip text and fill colors for one loaded configuration.
pub struct TooltipResolver<'a> {
    configs: &'a Configs,
    global: &'a Global,
    formatter: &'a dyn NumberFormatter,
    diagnostics: &'a dyn DiagnosticSink,
    capabilities: SurfaceCapabilities,
}

impl<'a> TooltipResolver<'a> {
    pub fn new(configs: &'a Configs, global: &'a Global) -> Self {
        Self {
            configs,
            global,
            formatter: &DEFAULT_FORMATTER,
            diagnostics: &LogSink,
            capabilities: SurfaceCapabilities::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: &'a dyn NumberFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_diagnostics(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn with_capabilities(mut self, capabilities: SurfaceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Data key of the region with ISO code `iso`.
    pub fn region_key(&self, iso: &str) -> Option<&'a str> {
        resolve_by_code(iso, &self.global.meta)
    }

    fn region_value(&self, iso: &str, indicator: &str) -> Option<&'a IndicatorValue> {
        let key = self.region_key(iso)?;
        self.global.data.locations.get(key)?.get(indicator)
    }

    /// Tooltip value for a region, without the title.
    ///
    /// Never fails: data gaps and template failures fall back to
    /// [`DATA_NOT_AVAILABLE`] or the plain formatted value.
    pub fn resolve_value(&self, iso: &str, indicator: &str, year: Option<&str>) -> String {
        let Some(value) = self.region_value(iso, indicator) else {
            return DATA_NOT_AVAILABLE.to_string();
        };

        if indicator == PARTNERSHIP_INDICATOR {
            let donor = value.as_number() == Some(1.0);
            return if donor { DONOR_LABEL } else { DONEE_LABEL }.to_string();
        }

        let Some(config) = self.configs.indicator(indicator) else {
            log::warn!("indicator {indicator} has data but no configuration");
            return DATA_NOT_AVAILABLE.to_string();
        };
        let mask = config.precision.map_or(GROUPED_MASK, format_from_precision);

        let shown = if config.years {
            year.and_then(|y| value.year(y))
                .filter(|v| is_truthy(*v))
                .map(|v| Value::Str(self.formatter.format(v, mask)))
        } else {
            self.plain_value(value, mask)
        };

        match shown {
            Some(shown) => self.apply_template(config, shown),
            None => DATA_NOT_AVAILABLE.to_string(),
        }
    }

    /// Scalar value for indicators without years; integers pass through unformatted.
    fn plain_value(&self, value: &IndicatorValue, mask: &str) -> Option<Value> {
        match value {
            IndicatorValue::Number(n) if is_truthy(*n) => Some(if n.fract() != 0.0 {
                Value::Str(self.formatter.format(*n, mask))
            } else {
                Value::Number(*n)
            }),
            IndicatorValue::Text(s) if !s.is_empty() => Some(match s.trim().parse::<f64>() {
                Ok(n) if n.fract() != 0.0 => Value::Str(self.formatter.format(n, mask)),
                _ => Value::Str(s.clone()),
            }),
            _ => None,
        }
    }

    fn apply_template(&self, config: &IndicatorConfig, shown: Value) -> String {
        if config.tooltip.is_empty() {
            return shown.fragment();
        }
        let context = Context::new().with("currentIndicator", shown.clone());
        compile_template_with(&config.tooltip, &context, self.diagnostics)
            .unwrap_or_else(|| shown.fragment())
    }

    /// Popup markup: region title followed by the resolved value.
    pub fn markup(&self, feature: &RegionFeature, indicator: &str, year: Option<&str>) -> String {
        format!(
            "<div class=\"marker-title\">{}</div>{}",
            feature.iso_name,
            self.resolve_value(&feature.iso, indicator, year)
        )
    }

    /// Popup for a hover/click. Without an interaction point the popup sits at
    /// the center of the region's bounding box.
    pub fn tooltip(
        &self,
        feature: &RegionFeature,
        indicator: &str,
        year: Option<&str>,
        point: Option<LatLng>,
    ) -> Tooltip {
        Tooltip {
            text: self.markup(feature, indicator, year),
            position: point.unwrap_or_else(|| feature.bounds.center()),
        }
    }

    /// Resolve the popup and push it to `surface`.
    pub fn show(
        &self,
        surface: &mut dyn TooltipSurface,
        feature: &RegionFeature,
        indicator: &str,
        year: Option<&str>,
        point: Option<LatLng>,
    ) -> Tooltip {
        let tooltip = self.tooltip(feature, indicator, year, point);
        surface.set_position(tooltip.position);
        surface.set_content(&tooltip.text);
        surface.open_if_detached();
        if self.capabilities.layer_reordering {
            surface.bring_to_front(feature);
        }
        tooltip
    }

    /// Fill color for a region's layer. Regions the configuration cannot
    /// classify are painted with the "data not available" color.
    pub fn fill_color(&self, iso: &str, indicator: &str, year: Option<&str>) -> &'a str {
        self.classified_color(iso, indicator, year).unwrap_or(NO_DATA_COLOR)
    }

    fn classified_color(&self, iso: &str, indicator: &str, year: Option<&str>) -> Option<&'a str> {
        let value = self.region_value(iso, indicator)?;
        let scheme = ColorScheme::for_indicator(indicator, self.configs, &self.global.meta)?;
        let years = self.configs.indicator(indicator).is_some_and(|c| c.years);
        let n = if years {
            value.year(year?)?
        } else {
            value.as_number()?
        };
        scheme.classify(n)
    }
}

fn is_truthy(n: f64) -> bool {
    n != 0.0 && !n.is_nan()
}
