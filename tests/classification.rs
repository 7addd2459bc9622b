use serde_json::json;
use wbi_map::classify::{
    ColorScheme, DONEE_COLOR, DONOR_COLOR, LegendEntry, NO_DATA_COLOR, Swatch, legend_entries,
    legend_html, number_color,
};
use wbi_map::models::{Configs, Meta, PARTNERSHIP_INDICATOR};
use wbi_map::{NumberFormatter, NumeralFormatter};

fn configs() -> Configs {
    serde_json::from_value(json!({
        "indicators": {
            "enrollment": {
                "choropleth": [
                    {"domain": [0, 50], "color": "#f00", "label": "Low"},
                    {"domain": [50, 80], "color": "#ff0", "label": "Mid"},
                    {"domain": [80, 100], "color": "#0f0", "label": "High"}
                ]
            },
            "spending": {"precision": 1},
            "unbounded": {},
            "empty_breaks": {"choropleth": []}
        },
        "ui": {"choropleth": ["#c1", "#c2", "#c3", "#c4"]}
    }))
    .unwrap()
}

fn meta() -> Meta {
    serde_json::from_value(json!({
        "indicators": {
            "spending": {"min_value": 0, "max_value": 100}
        },
        "locations": {}
    }))
    .unwrap()
}

#[test]
fn break_interior_values_get_break_color() {
    let (c, m) = (configs(), meta());
    assert_eq!(number_color(25.0, &c, &m, "enrollment"), Some("#f00"));
    assert_eq!(number_color(65.5, &c, &m, "enrollment"), Some("#ff0"));
    assert_eq!(number_color(99.9, &c, &m, "enrollment"), Some("#0f0"));
}

#[test]
fn break_boundaries_fall_through() {
    let (c, m) = (configs(), meta());
    // 50 is excluded from (0,50) and from (50,80); nothing matches, so the last break wins.
    assert_eq!(number_color(50.0, &c, &m, "enrollment"), Some("#0f0"));
    assert_eq!(number_color(0.0, &c, &m, "enrollment"), Some("#0f0"));
    assert_eq!(number_color(-5.0, &c, &m, "enrollment"), Some("#0f0"));
    assert_eq!(number_color(250.0, &c, &m, "enrollment"), Some("#0f0"));
}

#[test]
fn empty_breaks_classify_nothing() {
    let (c, m) = (configs(), meta());
    assert_eq!(number_color(10.0, &c, &m, "empty_breaks"), None);
}

#[test]
fn uniform_bins_clamp_at_both_ends() {
    let (c, m) = (configs(), meta());
    assert_eq!(number_color(-10.0, &c, &m, "spending"), Some("#c1"));
    assert_eq!(number_color(0.0, &c, &m, "spending"), Some("#c1"));
    assert_eq!(number_color(100.0, &c, &m, "spending"), Some("#c4"));
    assert_eq!(number_color(1e6, &c, &m, "spending"), Some("#c4"));
}

#[test]
fn uniform_bins_round_half_up() {
    let (c, m) = (configs(), meta());
    // step = 25
    assert_eq!(number_color(12.4, &c, &m, "spending"), Some("#c1"));
    assert_eq!(number_color(12.5, &c, &m, "spending"), Some("#c2"));
    assert_eq!(number_color(40.0, &c, &m, "spending"), Some("#c3"));
}

#[test]
fn uniform_bins_are_monotone() {
    let (c, m) = (configs(), meta());
    let palette = &c.ui.choropleth;
    let mut last = 0;
    for i in -20..=120 {
        let color = number_color(f64::from(i), &c, &m, "spending").unwrap();
        let idx = palette.iter().position(|p| p == color).unwrap();
        assert!(idx >= last, "bucket went down at {i}");
        last = idx;
    }
    assert_eq!(last, palette.len() - 1);
}

#[test]
fn missing_bounds_or_config_are_unavailable() {
    let (c, m) = (configs(), meta());
    assert_eq!(number_color(10.0, &c, &m, "unbounded"), None);
    assert_eq!(number_color(10.0, &c, &m, "not_configured"), None);
    let f = NumeralFormatter::default();
    assert_eq!(legend_entries(&c, &m, "unbounded", &f), None);
    assert_eq!(legend_entries(&c, &m, "not_configured", &f), None);
}

#[test]
fn empty_palette_has_neither_colors_nor_legend() {
    let mut c = configs();
    c.ui.choropleth.clear();
    let m = meta();
    assert_eq!(number_color(50.0, &c, &m, "spending"), None);
    assert_eq!(legend_entries(&c, &m, "spending", &NumeralFormatter::default()), None);
}

#[test]
fn partnership_indicator_is_categorical() {
    let (c, m) = (configs(), meta());
    assert_eq!(number_color(1.0, &c, &m, PARTNERSHIP_INDICATOR), Some(DONOR_COLOR));
    assert_eq!(number_color(0.0, &c, &m, PARTNERSHIP_INDICATOR), Some(DONEE_COLOR));

    let legend = legend_entries(&c, &m, PARTNERSHIP_INDICATOR, &NumeralFormatter::default())
        .unwrap();
    let labels: Vec<&str> = legend.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["Fragile State", "Donor", "Donee"]);
}

#[test]
fn break_legend_lists_sentinels_then_breaks() {
    let (c, m) = (configs(), meta());
    let legend = legend_entries(&c, &m, "enrollment", &NumeralFormatter::default()).unwrap();
    assert_eq!(legend[0].swatch, Swatch::Fragile);
    assert_eq!(legend[1].swatch, Swatch::Color(NO_DATA_COLOR.into()));
    assert_eq!(legend[1].label, "Data not available");
    let rest: Vec<(&Swatch, &str)> = legend[2..].iter().map(|e| (&e.swatch, e.label.as_str())).collect();
    assert_eq!(rest.len(), 3);
    assert_eq!(rest[0], (&Swatch::Color("#f00".into()), "Low"));
    assert_eq!(rest[2], (&Swatch::Color("#0f0".into()), "High"));
}

#[test]
fn uniform_legend_has_one_row_per_bucket() {
    let (c, m) = (configs(), meta());
    let legend = legend_entries(&c, &m, "spending", &NumeralFormatter::default()).unwrap();
    let labels: Vec<&str> = legend[2..].iter().map(|e| e.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["0.0 \u{2013} 25.0", "25.0 \u{2013} 50.0", "50.0 \u{2013} 75.0", "75.0 \u{2013} 100.0"]
    );
}

#[test]
fn legend_uses_the_injected_formatter() {
    struct Tagged;
    impl NumberFormatter for Tagged {
        fn format(&self, value: f64, _mask: &str) -> String {
            format!("<{value}>")
        }
    }

    let palette = vec!["#a".to_string(), "#b".to_string()];
    let scheme = ColorScheme::Uniform {
        min: Some(1000.0),
        max: Some(3000.0),
        palette: &palette,
    };
    let legend = scheme.legend(&Tagged).unwrap();
    assert_eq!(legend[2].label, "<1000> \u{2013} <2000>");
    assert_eq!(legend[3].label, "<2000> \u{2013} <3000>");
}

#[test]
fn legend_markup() {
    let entries = vec![
        LegendEntry {
            swatch: Swatch::Fragile,
            label: "Fragile State".into(),
        },
        LegendEntry {
            swatch: Swatch::Color("#eeeeee".into()),
            label: "Data not available".into(),
        },
    ];
    assert_eq!(
        legend_html(&entries),
        "<ul class='legend-list'>\
         <li><span class=\"swatch fragile\"></span>Fragile State</li>\
         <li><span class='swatch' style='background:#eeeeee'></span>Data not available</li>\
         </ul>"
    );
}
