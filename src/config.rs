use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::error::PrepError;
use crate::prepare::WindowConfig;
use crate::variants::{AdvantagePrior, Variant};

const ENV_PREFIX: &str = "PAIR_STRENGTH_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub db_path: PathBuf,
    pub window: WindowConfig,
    pub variant: Variant,
    pub advantage_prior: AdvantagePrior,
    pub out: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/games.sqlite"),
            window: WindowConfig::new(2020, 2),
            variant: Variant::GlobalAdvantage,
            advantage_prior: AdvantagePrior::default(),
            out: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
    }

    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| var(key).filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = var("DB") {
            self.db_path = PathBuf::from(raw.trim());
        }
        if let Some(raw) = var("START_YEAR") {
            self.window.start_year = parse_num(&raw, "START_YEAR")?;
        }
        if let Some(raw) = var("SEASON_WINDOW") {
            self.window.season_window = parse_num(&raw, "SEASON_WINDOW")?;
        }
        if let Some(raw) = var("PRIOR_LOOKBACK") {
            self.window.prior_lookback = raw
                .parse::<Lookback>()
                .with_context(|| format!("{ENV_PREFIX}PRIOR_LOOKBACK"))?
                .0;
        }
        if let Some(raw) = var("BY_SEASON") {
            self.window.group_by_season = parse_flag(&raw)
                .ok_or_else(|| anyhow!("{ENV_PREFIX}BY_SEASON: expected a boolean, got {raw:?}"))?;
        }
        if let Some(raw) = var("VARIANT") {
            self.variant = raw.parse()?;
        }
        if let Some(raw) = var("ADVANTAGE_MEAN") {
            self.advantage_prior.mean = parse_num(&raw, "ADVANTAGE_MEAN")?;
        }
        if let Some(raw) = var("ADVANTAGE_SCALE") {
            self.advantage_prior.scale = Some(parse_num(&raw, "ADVANTAGE_SCALE")?);
        }
        if let Some(raw) = var("OUT") {
            self.out = Some(PathBuf::from(raw.trim()));
        }
        Ok(self)
    }
}

/// A season count, or `none`/`off` to disable informative priors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback(pub Option<u32>);

impl FromStr for Lookback {
    type Err = PrepError;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Lookback(None)),
            other => other.parse().map(|n| Lookback(Some(n))).map_err(|_| {
                PrepError::Configuration(format!(
                    "prior lookback: expected a season count or none, got {raw:?}"
                ))
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WindowOverrides {
    pub start_year: Option<i32>,
    pub seasons: Option<u32>,
    pub prior_lookback: Option<Lookback>,
    pub by_season: Option<bool>,
}

impl WindowOverrides {
    pub fn apply(&self, mut window: WindowConfig) -> WindowConfig {
        if let Some(start_year) = self.start_year {
            window.start_year = start_year;
        }
        if let Some(seasons) = self.seasons {
            window.season_window = seasons;
        }
        if let Some(Lookback(lookback)) = self.prior_lookback {
            window.prior_lookback = lookback;
        }
        if let Some(by_season) = self.by_season {
            window.group_by_season = by_season;
        }
        window
    }
}

fn parse_num<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{ENV_PREFIX}{key}: invalid value {raw:?}"))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
