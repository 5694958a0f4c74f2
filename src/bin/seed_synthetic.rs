use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pair_strength::games;
use pair_strength::synthetic::{self, LeagueSpec};

/// Writes a reproducible synthetic league into a fresh SQLite store.
#[derive(Debug, clap::Parser)]
struct Args {
    /// path of the store to create
    db: PathBuf,

    #[clap(long, default_value_t = 12)]
    teams: u32,

    #[clap(long, default_value_t = 2015)]
    first_year: i32,

    #[clap(long, default_value_t = 8)]
    seasons: u32,

    /// cup games per season
    #[clap(long, default_value_t = 6)]
    cup_games: u32,

    #[clap(long, default_value_t = 4.0)]
    home_advantage: f64,

    #[clap(long, default_value_t = 7)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.db.exists() {
        return Err(anyhow!("{} already exists", args.db.display()));
    }

    let spec = LeagueSpec {
        teams: args.teams,
        first_year: args.first_year,
        seasons: args.seasons,
        cup_games: args.cup_games,
        home_advantage: args.home_advantage,
        seed: args.seed,
    };
    let mut conn = games::open_db(&args.db)
        .with_context(|| format!("open sqlite db {}", args.db.display()))?;
    let written = synthetic::seed(&mut conn, &spec).context("seed synthetic league")?;
    info!("wrote {written} games to {}", args.db.display());
    println!("Seasons: {}..{}", spec.first_year, spec.first_year + spec.seasons as i32);
    println!("Games: {written}");
    Ok(())
}
