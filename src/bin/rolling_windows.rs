use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pair_strength::config::{Lookback, RunConfig, WindowOverrides};
use pair_strength::export::ModelExport;
use pair_strength::prepare::season_windows;
use pair_strength::{GameRecord, Variant, WindowConfig, games, prepare};

/// Prepares and declares a model for every rolling window of a season range.
#[derive(Debug, clap::Parser)]
struct Args {
    /// SQLite store holding the `games` and `seasons` tables
    #[clap(long)]
    db: Option<PathBuf>,

    /// first window start; defaults to the earliest season in the store
    #[clap(long)]
    first_year: Option<i32>,

    /// last season any window may reach; defaults to the latest in the store
    #[clap(long)]
    last_year: Option<i32>,

    /// seasons per window
    #[clap(long)]
    seasons: Option<u32>,

    /// seasons before each window used for informative pair priors, or `none`
    #[clap(long)]
    prior_lookback: Option<Lookback>,

    /// estimate pair strengths separately for every season; `--by-season false` pools them
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    by_season: Option<bool>,

    #[clap(short, long)]
    variant: Option<Variant>,

    /// directory receiving one export per window
    #[clap(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Debug)]
struct WindowSummary {
    start_year: i32,
    games: usize,
    pairs: usize,
    home_teams: usize,
    latent: usize,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    debug!("args: {args:?}");
    let cfg = RunConfig::default().with_env()?;
    let db_path = args.db.clone().unwrap_or(cfg.db_path);
    let variant = args.variant.unwrap_or(cfg.variant);
    let template = WindowOverrides {
        start_year: None,
        seasons: args.seasons,
        prior_lookback: args.prior_lookback,
        by_season: args.by_season,
    }
    .apply(cfg.window);
    template.validate()?;
    let seasons = template.season_window;

    let conn = games::open_store(&db_path)
        .with_context(|| format!("open sqlite db {}", db_path.display()))?;
    let all_games = games::load_games(&conn).context("load games")?;
    let (Some(min_year), Some(max_year)) = (
        all_games.iter().map(|g| g.start_year).min(),
        all_games.iter().map(|g| g.start_year).max(),
    ) else {
        return Err(anyhow!("no games in {}", db_path.display()));
    };

    let first_year = args.first_year.unwrap_or(min_year);
    let last_year = args.last_year.unwrap_or(max_year);
    let starts = season_windows(first_year, last_year, seasons);
    if starts.is_empty() {
        return Err(anyhow!(
            "no {seasons}-season window fits in {first_year}..={last_year}"
        ));
    }
    info!("preparing {} windows with {variant}", starts.len());

    let results = starts
        .par_iter()
        .map(|start_year| {
            let window = WindowConfig {
                start_year: *start_year,
                ..template.clone()
            };
            run_window(&all_games, &window, variant, cfg.advantage_prior, &args)
                .map_err(|err| format!("window {start_year}: {err:#}"))
        })
        .collect::<Vec<_>>();

    let mut errors = Vec::new();
    println!("Variant: {variant}");
    for result in results {
        match result {
            Ok(s) => println!(
                "{}..{}: games={} pairs={} home_teams={} latent={}",
                s.start_year,
                s.start_year + seasons as i32,
                s.games,
                s.pairs,
                s.home_teams,
                s.latent
            ),
            Err(err) => errors.push(err),
        }
    }
    if !errors.is_empty() {
        warn!("{} windows failed", errors.len());
        for err in &errors {
            println!("   - {err}");
        }
        return Err(anyhow!("{} of {} windows failed", errors.len(), starts.len()));
    }
    Ok(())
}

fn run_window(
    all_games: &[GameRecord],
    window: &WindowConfig,
    variant: Variant,
    advantage_prior: pair_strength::AdvantagePrior,
    args: &Args,
) -> Result<WindowSummary> {
    let data = prepare(all_games, window)?;
    let graph = variant.build(&data, advantage_prior)?;
    if let Some(dir) = args.out_dir.as_deref() {
        let path = dir.join(format!("{variant}_{}.json", window.start_year));
        ModelExport::new(variant, window, advantage_prior, &data, &graph)
            .write(&path)
            .with_context(|| format!("write {}", path.display()))?;
    }
    Ok(WindowSummary {
        start_year: window.start_year,
        games: data.no_obs,
        pairs: data.no_pairs,
        home_teams: data.no_home_teams,
        latent: graph.latent_names().len(),
    })
}
