use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Indicator that is colored by donor/donee status instead of a numeric scale.
pub const PARTNERSHIP_INDICATOR: &str = "map_of_the_global_partnership_for_education";

/// Fallback text (and legend label) for regions without a value.
pub const DATA_NOT_AVAILABLE: &str = "Data not available";

/// One explicit classification rule: values strictly inside `domain` get `color`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoroplethBreak {
    pub domain: [f64; 2],
    pub color: String,
    #[serde(default)]
    pub label: String,
}

/// Per-indicator settings from the map configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndicatorConfig {
    /// Explicit breaks. When absent the indicator uses uniform binning.
    #[serde(default)]
    pub choropleth: Option<Vec<ChoroplethBreak>>,
    /// Config files carry either a flag or the list of available years.
    /// A non-empty list counts as enabled.
    #[serde(default, deserialize_with = "de_years_flag")]
    pub years: bool,
    /// Decimal places for tooltip values. Some configs store it as a string.
    #[serde(default, deserialize_with = "de_precision")]
    pub precision: Option<i64>,
    /// Tooltip template, e.g. `"{{ currentIndicator }}%"`.
    #[serde(default)]
    pub tooltip: String,
}

/// Settings shared by every indicator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    /// Palette for uniform binning, lowest bucket first.
    #[serde(default)]
    pub choropleth: Vec<String>,
}

/// The full map configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Configs {
    #[serde(default)]
    pub indicators: BTreeMap<String, IndicatorConfig>,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Configs {
    pub fn indicator(&self, id: &str) -> Option<&IndicatorConfig> {
        self.indicators.get(id)
    }
}

/// Value range of an indicator across all regions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct IndicatorMeta {
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

/// Region metadata. Only the ISO code is needed to resolve interaction events.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationMeta {
    #[serde(rename = "ISO", default)]
    pub iso: Option<String>,
}

/// Map that keeps the order entries had in the source document.
///
/// Region lookups by ISO code return the *first* match, so the order must
/// survive deserialization.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, V>()? {
                    entries.push((k, v));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// Indicator metadata section of the global document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Meta {
    #[serde(default)]
    pub indicators: BTreeMap<String, IndicatorMeta>,
    /// Region key -> region metadata, in document order.
    #[serde(default)]
    pub locations: OrderedMap<LocationMeta>,
}

/// A region's value for one indicator.
///
/// Exports are loose about types, so anything unrecognized is kept as [`IndicatorValue::Other`]
/// instead of failing the whole document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IndicatorValue {
    /// Year key (e.g. `"2015"`) -> value. Entries may be numbers, numeric strings or junk.
    Years {
        years: BTreeMap<String, serde_json::Value>,
    },
    Number(f64),
    /// Numbers that were exported as strings.
    Text(String),
    Null,
    Other(serde_json::Value),
}

impl IndicatorValue {
    /// Numeric reading of a scalar value. Year tables have none.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            IndicatorValue::Number(n) => Some(*n),
            IndicatorValue::Text(s) => parse_number(s),
            IndicatorValue::Years { .. } | IndicatorValue::Null | IndicatorValue::Other(_) => None,
        }
    }

    /// Value recorded for `year`, if this is a year table and the entry reads as a number.
    pub fn year(&self, year: &str) -> Option<f64> {
        match self {
            IndicatorValue::Years { years } => match years.get(year)? {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => parse_number(s),
                _ => None,
            },
            _ => None,
        }
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Indicator values of one region, keyed by indicator id.
pub type LocationRecord = BTreeMap<String, IndicatorValue>;

/// Data section of the global document, keyed by normalized region name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Data {
    #[serde(default)]
    pub locations: BTreeMap<String, LocationRecord>,
}

/// Everything loaded at startup besides the configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Global {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub data: Data,
}

/// Serde helper: `years` is either a boolean or a list of year keys.
fn de_years_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct YearsVisitor;

    impl<'de> Visitor<'de> for YearsVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a boolean or a list of years")
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(false)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(false)
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(!s.is_empty())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut any = false;
            while seq.next_element::<de::IgnoredAny>()?.is_some() {
                any = true;
            }
            Ok(any)
        }
    }

    deserializer.deserialize_any(YearsVisitor)
}

/// Serde helper: parse precision from a number or a string such as `"2"`.
///
/// Strings are read like a leading-integer parse (`"2 digits"` -> 2); text without
/// a leading integer yields `None`, which later selects the grouped integer mask.
fn de_precision<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PrecisionVisitor;

    impl<'de> Visitor<'de> for PrecisionVisitor {
        type Value = Option<i64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a string or number representing decimal places")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(i64::try_from(v).ok())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.is_finite().then(|| v.trunc() as i64))
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(parse_leading_int(s))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(PrecisionVisitor)
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let digits_start = usize::from(s.starts_with(['-', '+']));
    let end = s[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| i + digits_start);
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}
