use wbi_map::models::{Configs, Global, IndicatorConfig, IndicatorValue};
use wbi_map::normalize::resolve_by_code;

#[test]
fn precision_accepts_string_or_number() {
    let c: IndicatorConfig = serde_json::from_str(r#"{"precision": "2"}"#).unwrap();
    assert_eq!(c.precision, Some(2));
    let c: IndicatorConfig = serde_json::from_str(r#"{"precision": 3}"#).unwrap();
    assert_eq!(c.precision, Some(3));
    let c: IndicatorConfig = serde_json::from_str(r#"{"precision": null}"#).unwrap();
    assert_eq!(c.precision, None);
    let c: IndicatorConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(c.precision, None);
}

#[test]
fn years_accepts_flag_or_list() {
    let c: IndicatorConfig = serde_json::from_str(r#"{"years": true}"#).unwrap();
    assert!(c.years);
    let c: IndicatorConfig = serde_json::from_str(r#"{"years": ["2000", "2005"]}"#).unwrap();
    assert!(c.years);
    let c: IndicatorConfig = serde_json::from_str(r#"{"years": []}"#).unwrap();
    assert!(!c.years);
    let c: IndicatorConfig = serde_json::from_str("{}").unwrap();
    assert!(!c.years);
}

#[test]
fn break_labels_are_optional() {
    let c: Configs = serde_json::from_str(
        r##"{"indicators": {"x": {"choropleth": [{"domain": [0, 1.5], "color": "#123"}]}},
            "ui": {"choropleth": ["#1", "#2"]}}"##,
    )
    .unwrap();
    let breaks = c.indicator("x").unwrap().choropleth.as_ref().unwrap();
    assert_eq!(breaks[0].domain, [0.0, 1.5]);
    assert_eq!(breaks[0].label, "");
    assert_eq!(c.ui.choropleth.len(), 2);
}

#[test]
fn location_order_survives_parsing() {
    // keys deliberately out of alphabetical order
    let g: Global = serde_json::from_str(
        r#"{"meta": {"indicators": {}, "locations": {
              "zaire": {"ISO": "COD"},
              "congo_dem_rep": {"ISO": "COD"},
              "angola": {"ISO": "AGO"}
           }},
           "data": {"locations": {}}}"#,
    )
    .unwrap();
    let keys: Vec<&str> = g.meta.locations.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["zaire", "congo_dem_rep", "angola"]);
    assert_eq!(resolve_by_code("COD", &g.meta), Some("zaire"));
    assert_eq!(resolve_by_code("AGO", &g.meta), Some("angola"));
}

#[test]
fn locations_without_iso_never_match() {
    let g: Global =
        serde_json::from_str(r#"{"meta": {"locations": {"atlantis": {}}}}"#).unwrap();
    assert_eq!(g.meta.locations.get("atlantis").unwrap().iso, None);
    assert_eq!(resolve_by_code("", &g.meta), None);
}

#[test]
fn indicator_value_shapes() {
    let v: IndicatorValue = serde_json::from_str(r#"{"years": {"2010": 4.5, "2011": null}}"#).unwrap();
    assert_eq!(v.year("2010"), Some(4.5));
    assert_eq!(v.year("2011"), None);
    assert_eq!(v.as_number(), None);

    let v: IndicatorValue = serde_json::from_str("12").unwrap();
    assert_eq!(v, IndicatorValue::Number(12.0));
    assert_eq!(v.year("2010"), None);

    let v: IndicatorValue = serde_json::from_str(r#"" 7.25 ""#).unwrap();
    assert_eq!(v.as_number(), Some(7.25));

    let v: IndicatorValue = serde_json::from_str("null").unwrap();
    assert_eq!(v, IndicatorValue::Null);
}

#[test]
fn loose_year_entries_do_not_fail_the_document() {
    let g: Global = serde_json::from_str(
        r#"{"data": {"locations": {"kenya": {
            "literacy": {"years": {"2015": "78.73", "2016": true, "2017": [1], "2018": 80}},
            "flag": true
        }}}}"#,
    )
    .unwrap();
    let record = &g.data.locations["kenya"];
    let literacy = &record["literacy"];
    assert_eq!(literacy.year("2015"), Some(78.73));
    assert_eq!(literacy.year("2016"), None);
    assert_eq!(literacy.year("2017"), None);
    assert_eq!(literacy.year("2018"), Some(80.0));
    assert_eq!(record["flag"], IndicatorValue::Other(serde_json::Value::Bool(true)));
    assert_eq!(record["flag"].as_number(), None);
}
