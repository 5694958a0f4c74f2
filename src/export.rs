use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PrepError, Result};
use crate::model::ModelGraph;
use crate::prepare::{PreparedData, WindowConfig};
use crate::variants::{AdvantagePrior, Variant};

pub const BUNDLE_KEYS: [&str; 11] = [
    "pair_vals",
    "pair_ids",
    "is_game_home",
    "score_diffs",
    "is_cup",
    "no_obs",
    "no_pairs",
    "home_teams",
    "home_team_ids",
    "no_home_teams",
    "pair_priors",
];

#[derive(Debug, Serialize)]
pub struct ModelExport<'a> {
    pub generated_at: String,
    pub variant: Variant,
    pub window: &'a WindowConfig,
    pub advantage_prior: AdvantagePrior,
    pub pair_ids: Vec<String>,
    pub home_team_ids: &'a [u32],
    pub latent: Vec<&'a str>,
    pub graph: &'a ModelGraph<'a>,
}

impl<'a> ModelExport<'a> {
    pub fn new(
        variant: Variant,
        window: &'a WindowConfig,
        advantage_prior: AdvantagePrior,
        data: &'a PreparedData,
        graph: &'a ModelGraph<'a>,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            variant,
            window,
            advantage_prior,
            pair_ids: data.pair_ids.iter().map(ToString::to_string).collect(),
            home_team_ids: &data.home_team_ids,
            latent: graph.latent_names(),
            graph,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }
}

pub fn bundle_to_json(data: &PreparedData) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

/// Parses a bundle, checking key presence before structure and shapes after.
pub fn bundle_from_json(raw: &str) -> Result<PreparedData> {
    let value: Value = serde_json::from_str(raw.trim())?;
    let Some(object) = value.as_object() else {
        return Err(PrepError::MissingKey(BUNDLE_KEYS[0].to_string()));
    };
    if let Some(missing) = BUNDLE_KEYS.iter().find(|key| !object.contains_key(**key)) {
        return Err(PrepError::MissingKey(missing.to_string()));
    }
    let data: PreparedData = serde_json::from_value(value)?;
    data.validate()?;
    Ok(data)
}

pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
