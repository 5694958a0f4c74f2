use std::path::Path;
use std::{fmt, io};

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PrepError, Result};

pub type TeamId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey(pub TeamId, pub TeamId);

impl PairKey {
    pub fn new(a: TeamId, b: TeamId) -> Self {
        PairKey(a.max(b), a.min(b))
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

/// `+1` when the home team carries the higher id, `-1` otherwise. The sign only
/// depends on the two ids, so every game of a pair is measured from the same side.
pub fn home_sign(home_team_id: TeamId, away_team_id: TeamId) -> i8 {
    if home_team_id > away_team_id { 1 } else { -1 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub game_id: i64,
    pub season_id: i64,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_points: f64,
    pub away_points: f64,
    pub start_year: i32,
    pub regular: bool,
}

impl GameRecord {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.home_team_id, self.away_team_id)
    }

    pub fn is_home(&self) -> i8 {
        home_sign(self.home_team_id, self.away_team_id)
    }

    pub fn score_diff(&self) -> f64 {
        (self.home_points - self.away_points) * f64::from(self.is_home())
    }

    pub fn is_cup(&self) -> bool {
        !self.regular
    }
}

/// Opens an existing store for loading. Never creates the file or touches the schema.
pub fn open_store(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(PrepError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no sqlite store at {}", path.display()),
        )));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS seasons (
            id INTEGER PRIMARY KEY,
            name TEXT NULL,
            `start-year` INTEGER NOT NULL,
            regular INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS games (
            `game-id` INTEGER PRIMARY KEY,
            season_id INTEGER NOT NULL REFERENCES seasons(id),
            `home-team-id` INTEGER NOT NULL,
            `away-team-id` INTEGER NOT NULL,
            `home-points` INTEGER NOT NULL,
            `away-points` INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_games_season ON games(season_id);
        "#,
    )?;
    Ok(())
}

pub fn insert_season(
    conn: &Connection,
    season_id: i64,
    name: &str,
    start_year: i32,
    regular: bool,
) -> Result<()> {
    conn.execute(
        "INSERT INTO seasons (id, name, `start-year`, regular) VALUES (?1, ?2, ?3, ?4)",
        params![season_id, name, start_year, i64::from(regular)],
    )?;
    Ok(())
}

pub fn insert_game(conn: &Connection, game: &GameRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO games (`game-id`, season_id, `home-team-id`, `away-team-id`, `home-points`, `away-points`)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            game.game_id,
            game.season_id,
            game.home_team_id,
            game.away_team_id,
            game.home_points,
            game.away_points,
        ],
    )?;
    Ok(())
}

pub fn load_games(conn: &Connection) -> Result<Vec<GameRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT
            games.`game-id`, games.season_id, `home-points`, `away-points`,
            `home-team-id`, `away-team-id`, `start-year`, regular
        FROM games
        JOIN seasons ON games.season_id = seasons.id
        ORDER BY games.`game-id`
        "#,
    )?;

    let rows = stmt.query_map([], |row| {
        Ok::<[Value; 8], rusqlite::Error>([
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ])
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(decode_game(row?)?);
    }
    debug!("loaded {} games", out.len());
    Ok(out)
}

fn decode_game(values: [Value; 8]) -> Result<GameRecord> {
    let [game_id, season_id, home_points, away_points, home_id, away_id, start_year, regular] =
        values;
    let game_id = coerce_int(&game_id, "game-id", 0)?;
    let start_year = coerce_int(&start_year, "start-year", game_id)?;
    Ok(GameRecord {
        game_id,
        season_id: coerce_int(&season_id, "season_id", game_id)?,
        home_team_id: coerce_team(&home_id, "home-team-id", game_id)?,
        away_team_id: coerce_team(&away_id, "away-team-id", game_id)?,
        home_points: coerce_number(&home_points, "home-points", game_id)?,
        away_points: coerce_number(&away_points, "away-points", game_id)?,
        start_year: i32::try_from(start_year).map_err(|_| PrepError::DataFormat {
            column: "start-year",
            game_id,
            found: start_year.to_string(),
        })?,
        regular: coerce_int(&regular, "regular", game_id)? != 0,
    })
}

fn coerce_team(value: &Value, column: &'static str, game_id: i64) -> Result<TeamId> {
    let id = coerce_int(value, column, game_id)?;
    TeamId::try_from(id).map_err(|_| PrepError::DataFormat {
        column,
        game_id,
        found: id.to_string(),
    })
}

// 2^63 is exactly representable; anything at or above it would saturate.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn coerce_int(value: &Value, column: &'static str, game_id: i64) -> Result<i64> {
    let parsed = match value {
        Value::Integer(n) => Some(*n),
        Value::Real(x) if x.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(x) => Some(*x as i64),
        Value::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| PrepError::DataFormat {
        column,
        game_id,
        found: describe(value),
    })
}

fn coerce_number(value: &Value, column: &'static str, game_id: i64) -> Result<f64> {
    let parsed = match value {
        Value::Integer(n) => Some(*n as f64),
        Value::Real(x) if x.is_finite() => Some(*x),
        Value::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    };
    parsed.ok_or_else(|| PrepError::DataFormat {
        column,
        game_id,
        found: describe(value),
    })
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Real(x) => x.to_string(),
        Value::Text(s) => format!("{s:?}"),
        Value::Blob(b) => format!("blob of {} bytes", b.len()),
    }
}
