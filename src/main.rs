use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pair_strength::config::{Lookback, RunConfig, WindowOverrides};
use pair_strength::export::ModelExport;
use pair_strength::model::NodeKind;
use pair_strength::{Variant, games, prepare};

/// Prepares one season window and declares a pair-strength model over it.
#[derive(Debug, clap::Parser)]
struct Args {
    /// JSON run configuration, applied before environment variables and flags
    #[clap(long)]
    config: Option<PathBuf>,

    /// SQLite store holding the `games` and `seasons` tables
    #[clap(long)]
    db: Option<PathBuf>,

    /// first season of the window
    #[clap(long)]
    start_year: Option<i32>,

    /// number of consecutive seasons in the window
    #[clap(long)]
    seasons: Option<u32>,

    /// seasons before the window used for informative pair priors, or `none`
    #[clap(long)]
    prior_lookback: Option<Lookback>,

    /// estimate pair strengths separately for every season; `--by-season false` pools them
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    by_season: Option<bool>,

    /// model variant, e.g. global_advantage or team_advantage_flagged
    #[clap(short, long)]
    variant: Option<Variant>,

    /// prior mean of the global home advantage
    #[clap(long)]
    advantage_mean: Option<f64>,

    /// fixed prior scale of the global home advantage
    #[clap(long)]
    advantage_scale: Option<f64>,

    /// where to write the model export
    #[clap(short, long)]
    out: Option<PathBuf>,
}

impl Args {
    fn apply(self, mut cfg: RunConfig) -> RunConfig {
        if let Some(db) = self.db {
            cfg.db_path = db;
        }
        cfg.window = WindowOverrides {
            start_year: self.start_year,
            seasons: self.seasons,
            prior_lookback: self.prior_lookback,
            by_season: self.by_season,
        }
        .apply(cfg.window);
        if let Some(variant) = self.variant {
            cfg.variant = variant;
        }
        if let Some(mean) = self.advantage_mean {
            cfg.advantage_prior.mean = mean;
        }
        if self.advantage_scale.is_some() {
            cfg.advantage_prior.scale = self.advantage_scale;
        }
        if self.out.is_some() {
            cfg.out = self.out;
        }
        cfg
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    debug!("args: {args:?}");
    let base = match args.config.as_deref() {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let cfg = args.apply(base.with_env()?);
    cfg.window.validate()?;

    let conn = games::open_store(&cfg.db_path)
        .with_context(|| format!("open sqlite db {}", cfg.db_path.display()))?;
    let all_games = games::load_games(&conn).context("load games")?;
    info!("loaded {} games from {}", all_games.len(), cfg.db_path.display());

    let data = prepare(&all_games, &cfg.window)?;
    if data.no_obs == 0 {
        warn!(
            "no games in seasons {}..{}; the engine will receive empty arrays",
            cfg.window.start_year,
            cfg.window.end_year()
        );
    }

    let graph = cfg.variant.build(&data, cfg.advantage_prior)?;
    println!("Model: {}", cfg.variant);
    println!(
        "Window: {}..{} (lookback: {}, by season: {})",
        cfg.window.start_year,
        cfg.window.end_year(),
        cfg.window
            .prior_lookback
            .map(|n| n.to_string())
            .unwrap_or_else(|| "none".to_string()),
        cfg.window.group_by_season
    );
    println!(
        "Games: {}  Pairs: {}  Home teams: {}",
        data.no_obs, data.no_pairs, data.no_home_teams
    );
    for node in graph.nodes() {
        let detail = match &node.kind {
            NodeKind::Data { .. } => "data".to_string(),
            NodeKind::Latent { distribution } => format!("~ {distribution}"),
            NodeKind::Deterministic { expr } => format!("= {expr}"),
            NodeKind::Observed { distribution, .. } => format!("observed ~ {distribution}"),
        };
        println!("  {:<20} {:<10} {detail}", node.name, node.shape.to_string());
    }

    if let Some(out) = cfg.out.as_deref() {
        ModelExport::new(cfg.variant, &cfg.window, cfg.advantage_prior, &data, &graph)
            .write(out)
            .with_context(|| format!("write model export {}", out.display()))?;
        info!("wrote {}", out.display());
    }
    Ok(())
}
