//! Loading the two documents the map starts from: `configs` and `global`.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::models::{Configs, Global};

/// Parse the indicator configuration document.
pub fn configs_from_str(json: &str) -> Result<Configs> {
    let configs: Configs = serde_json::from_str(json).context("parse configs")?;
    for (id, config) in &configs.indicators {
        let reversed = config.choropleth.iter().flatten().filter(|b| b.domain[0] > b.domain[1]);
        for b in reversed {
            log::warn!(
                "indicator {id}: break domain [{}, {}] is reversed and will never match",
                b.domain[0],
                b.domain[1]
            );
        }
    }
    log::debug!("loaded {} indicator config(s)", configs.indicators.len());
    Ok(configs)
}

/// Parse the metadata + data document.
pub fn global_from_str(json: &str) -> Result<Global> {
    let global: Global = serde_json::from_str(json).context("parse global data")?;
    log::debug!(
        "loaded {} location(s) in meta, {} with data",
        global.meta.locations.len(),
        global.data.locations.len()
    );
    Ok(global)
}

pub fn read_configs<P: AsRef<Path>>(path: P) -> Result<Configs> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    configs_from_str(&text).with_context(|| format!("load {}", path.display()))
}

pub fn read_global<P: AsRef<Path>>(path: P) -> Result<Global> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    global_from_str(&text).with_context(|| format!("load {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::number_color;
    use crate::models::Meta;
    use tempfile::tempdir;

    #[test]
    fn read_both_documents() {
        let dir = tempdir().unwrap();
        let configs = dir.path().join("configs.json");
        let global = dir.path().join("global.json");
        fs::write(
            &configs,
            r##"{"indicators": {"x": {"choropleth": [{"domain": [0, 5], "color": "#fff"}]}},
                "ui": {"choropleth": ["#000"]}}"##,
        )
        .unwrap();
        fs::write(
            &global,
            r#"{"meta": {"indicators": {}, "locations": {"chad": {"ISO": "TCD"}}},
                "data": {"locations": {"chad": {"x": 3}}}}"#,
        )
        .unwrap();

        let c = read_configs(&configs).unwrap();
        let g = read_global(&global).unwrap();
        assert!(c.indicator("x").is_some());
        assert_eq!(g.meta.locations.len(), 1);
    }

    #[test]
    fn reversed_domain_loads_and_falls_through() {
        let configs = configs_from_str(
            r##"{"indicators": {"x": {"choropleth": [
                {"domain": [0, 5], "color": "#0a0"},
                {"domain": [9, 1], "color": "#bad"}
            ]}}}"##,
        )
        .unwrap();
        let meta = Meta::default();
        assert_eq!(number_color(3.0, &configs, &meta, "x"), Some("#0a0"));
        // Matches neither break, so the last one colors it.
        assert_eq!(number_color(7.0, &configs, &meta, "x"), Some("#bad"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_global("/nonexistent/global.json").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/global.json"));
    }
}
