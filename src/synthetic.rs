use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::games::{self, GameRecord, TeamId};

#[derive(Debug, Clone)]
pub struct LeagueSpec {
    pub teams: u32,
    pub first_year: i32,
    pub seasons: u32,
    pub cup_games: u32,
    pub home_advantage: f64,
    pub seed: u64,
}

impl Default for LeagueSpec {
    fn default() -> Self {
        Self {
            teams: 12,
            first_year: 2015,
            seasons: 8,
            cup_games: 6,
            home_advantage: 4.0,
            seed: 7,
        }
    }
}

/// Double round-robin regular seasons plus a short cup each year. Points come
/// from a fixed per-team rating, the home advantage and uniform noise.
pub fn generate(spec: &LeagueSpec) -> Vec<GameRecord> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let ratings = (0..spec.teams)
        .map(|_| rng.gen_range(-8.0..8.0))
        .collect::<Vec<f64>>();

    let mut out = Vec::new();
    let mut game_id = 0i64;
    for season in 0..spec.seasons {
        let start_year = spec.first_year + season as i32;
        let regular_id = i64::from(season) * 2 + 1;
        for home in 0..spec.teams {
            for away in 0..spec.teams {
                if home == away {
                    continue;
                }
                game_id += 1;
                out.push(play(&mut rng, spec, &ratings, game_id, regular_id, start_year, true, home, away));
            }
        }

        if spec.teams < 2 {
            continue;
        }
        for _ in 0..spec.cup_games {
            let home = rng.gen_range(0..spec.teams);
            let away = (home + rng.gen_range(1..spec.teams)) % spec.teams;
            game_id += 1;
            out.push(play(&mut rng, spec, &ratings, game_id, regular_id + 1, start_year, false, home, away));
        }
    }
    out
}

pub fn seed(conn: &mut Connection, spec: &LeagueSpec) -> Result<usize> {
    let league = generate(spec);
    let tx = conn.transaction()?;
    for season in 0..spec.seasons {
        let start_year = spec.first_year + season as i32;
        let regular_id = i64::from(season) * 2 + 1;
        games::insert_season(&tx, regular_id, &format!("League {start_year}"), start_year, true)?;
        games::insert_season(&tx, regular_id + 1, &format!("Cup {start_year}"), start_year, false)?;
    }
    for game in &league {
        games::insert_game(&tx, game)?;
    }
    tx.commit()?;
    debug!("seeded {} games over {} seasons", league.len(), spec.seasons);
    Ok(league.len())
}

fn play(
    rng: &mut StdRng,
    spec: &LeagueSpec,
    ratings: &[f64],
    game_id: i64,
    season_id: i64,
    start_year: i32,
    regular: bool,
    home: u32,
    away: u32,
) -> GameRecord {
    let margin = ratings[home as usize] - ratings[away as usize] + spec.home_advantage;
    let base = rng.gen_range(10.0..30.0_f64);
    let noise = rng.gen_range(-12.0..12.0_f64);
    let home_points = (base + (margin + noise) / 2.0).round().max(0.0);
    let away_points = (base - (margin + noise) / 2.0).round().max(0.0);
    GameRecord {
        game_id,
        season_id,
        home_team_id: team_id(home),
        away_team_id: team_id(away),
        home_points,
        away_points,
        start_year,
        regular,
    }
}

fn team_id(index: u32) -> TeamId {
    index + 1
}
