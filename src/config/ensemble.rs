// src/config/ensemble.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_ENSEMBLE_CONFIG_PATH: &str = "ENSEMBLE_CONFIG_PATH";

/// One named sub-scorer and its share of the final score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentWeight {
    pub name: String,
    pub weight: f64,
}

impl ComponentWeight {
    pub fn new(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }
}

/// Built-in weighting used when no config file is present.
pub fn default_components() -> Vec<ComponentWeight> {
    vec![
        ComponentWeight::new("finbert", 0.5),
        ComponentWeight::new("llm", 0.3),
        ComponentWeight::new("lexicon", 0.2),
    ]
}

/// Load components from an explicit path. Supports TOML or JSON formats.
pub fn load_components_from(path: &Path) -> Result<Vec<ComponentWeight>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading ensemble weights from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_components(&content, ext.as_str())
}

/// Load components using env var + fallbacks:
/// 1) $ENSEMBLE_CONFIG_PATH
/// 2) config/ensemble.toml
/// 3) config/ensemble.json
/// 4) built-in defaults
pub fn load_components_default() -> Result<Vec<ComponentWeight>> {
    if let Ok(p) = std::env::var(ENV_ENSEMBLE_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_components_from(&pb);
        }
        return Err(anyhow!("ENSEMBLE_CONFIG_PATH points to non-existent path"));
    }
    for candidate in ["config/ensemble.toml", "config/ensemble.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_components_from(&p);
        }
    }
    Ok(default_components())
}

fn parse_components(s: &str, hint_ext: &str) -> Result<Vec<ComponentWeight>> {
    if hint_ext == "json" {
        return parse_json(s);
    }
    if let Ok(v) = parse_toml(s) {
        return Ok(v);
    }
    parse_json(s).map_err(|_| anyhow!("unsupported ensemble weights format"))
}

fn parse_toml(s: &str) -> Result<Vec<ComponentWeight>> {
    #[derive(Deserialize)]
    struct TomlEnsemble {
        component: Vec<ComponentWeight>,
    }
    let v: TomlEnsemble = toml::from_str(s)?;
    Ok(v.component)
}

fn parse_json(s: &str) -> Result<Vec<ComponentWeight>> {
    Ok(serde_json::from_str(s)?)
}
