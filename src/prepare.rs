use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PrepError, Result};
use crate::games::{GameRecord, PairKey, TeamId};
use crate::matrix::{Matrix, Shape, one_hot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub pair: PairKey,
    pub season: Option<i32>,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.season {
            Some(season) => write!(f, "{}@{}", self.pair, season),
            None => write!(f, "{}", self.pair),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start_year: i32,
    pub season_window: u32,
    #[serde(default)]
    pub prior_lookback: Option<u32>,
    #[serde(default)]
    pub group_by_season: bool,
}

impl WindowConfig {
    pub fn new(start_year: i32, season_window: u32) -> Self {
        Self {
            start_year,
            season_window,
            prior_lookback: None,
            group_by_season: false,
        }
    }

    pub fn with_prior_lookback(mut self, seasons: u32) -> Self {
        self.prior_lookback = Some(seasons);
        self
    }

    pub fn grouped_by_season(mut self) -> Self {
        self.group_by_season = true;
        self
    }

    pub fn end_year(&self) -> i32 {
        self.start_year.saturating_add_unsigned(self.season_window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.group_by_season && self.prior_lookback.is_some() {
            return Err(PrepError::Configuration(
                "informative priors cannot be combined with per-season grouping".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedData {
    pub pair_vals: Matrix,
    pub pair_ids: Vec<GroupKey>,
    pub is_game_home: Matrix,
    pub score_diffs: Matrix,
    pub is_cup: Matrix,
    pub no_obs: usize,
    pub no_pairs: usize,
    pub home_teams: Matrix,
    pub home_team_ids: Vec<TeamId>,
    pub no_home_teams: usize,
    pub pair_priors: Matrix,
}

impl PreparedData {
    pub fn validate(&self) -> Result<()> {
        let obs = self.no_obs;
        let matrices = [
            ("pair_vals", &self.pair_vals, Shape::new(obs, self.no_pairs)),
            (
                "home_teams",
                &self.home_teams,
                Shape::new(obs, self.no_home_teams),
            ),
            ("is_game_home", &self.is_game_home, Shape::column(obs)),
            ("score_diffs", &self.score_diffs, Shape::column(obs)),
            ("is_cup", &self.is_cup, Shape::column(obs)),
            ("pair_priors", &self.pair_priors, Shape::column(self.no_pairs)),
        ];
        for (what, matrix, expected) in matrices {
            if !matrix.is_consistent() || matrix.shape() != expected {
                return Err(PrepError::mismatch(what, expected, matrix.shape()));
            }
        }

        let labels = [
            ("pair_ids", self.pair_ids.len(), self.no_pairs),
            ("home_team_ids", self.home_team_ids.len(), self.no_home_teams),
        ];
        for (what, found, expected) in labels {
            if found != expected {
                return Err(PrepError::mismatch(
                    what,
                    Shape::column(expected),
                    Shape::column(found),
                ));
            }
        }
        Ok(())
    }

    pub fn prior_for(&self, key: &GroupKey) -> Option<f64> {
        let col = self.pair_ids.iter().position(|id| id == key)?;
        Some(self.pair_priors[(col, 0)])
    }
}

/// Builds the bundle for the seasons `[start_year, start_year + season_window)`.
pub fn prepare(games: &[GameRecord], cfg: &WindowConfig) -> Result<PreparedData> {
    cfg.validate()?;

    let end_year = cfg.end_year();
    let window = games
        .iter()
        .filter(|g| g.start_year >= cfg.start_year && g.start_year < end_year)
        .collect::<Vec<_>>();

    let groups = window
        .iter()
        .map(|g| group_key(g, cfg.group_by_season))
        .collect::<Vec<_>>();
    let (pair_vals, pair_ids) = one_hot(&groups);

    let home_ids = window.iter().map(|g| g.home_team_id).collect::<Vec<_>>();
    let (home_teams, home_team_ids) = one_hot(&home_ids);

    let is_game_home = Matrix::column(window.iter().map(|g| f64::from(g.is_home())).collect());
    let score_diffs = Matrix::column(window.iter().map(|g| g.score_diff()).collect());
    let is_cup = Matrix::column(
        window
            .iter()
            .map(|g| if g.is_cup() { 1.0 } else { 0.0 })
            .collect(),
    );

    let pair_priors = match cfg.prior_lookback {
        Some(lookback) => {
            let begin = cfg.start_year.saturating_sub_unsigned(lookback);
            let means = mean_score_diffs(
                games
                    .iter()
                    .filter(|g| g.start_year >= begin && g.start_year < cfg.start_year),
            );
            Matrix::column(
                pair_ids
                    .iter()
                    .map(|key| means.get(&key.pair).copied().unwrap_or(0.0))
                    .collect(),
            )
        }
        None => Matrix::column(vec![0.0; pair_ids.len()]),
    };

    let data = PreparedData {
        no_obs: window.len(),
        no_pairs: pair_ids.len(),
        no_home_teams: home_team_ids.len(),
        pair_vals,
        pair_ids,
        is_game_home,
        score_diffs,
        is_cup,
        home_teams,
        home_team_ids,
        pair_priors,
    };
    debug!(
        "prepared window {}..{}: {} games, {} pairs, {} home teams",
        cfg.start_year, end_year, data.no_obs, data.no_pairs, data.no_home_teams
    );
    Ok(data)
}

pub fn season_windows(first_year: i32, last_year: i32, season_window: u32) -> Vec<i32> {
    if season_window == 0 {
        return Vec::new();
    }
    let span = i64::from(season_window) - 1;
    (first_year..=last_year)
        .filter(|year| i64::from(*year) + span <= i64::from(last_year))
        .collect()
}

fn group_key(game: &GameRecord, by_season: bool) -> GroupKey {
    GroupKey {
        pair: game.pair(),
        season: by_season.then_some(game.start_year),
    }
}

fn mean_score_diffs<'a>(games: impl Iterator<Item = &'a GameRecord>) -> HashMap<PairKey, f64> {
    let mut sums: HashMap<PairKey, (f64, usize)> = HashMap::new();
    for game in games {
        let entry = sums.entry(game.pair()).or_insert((0.0, 0));
        entry.0 += game.score_diff();
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(pair, (sum, n))| (pair, sum / n as f64))
        .collect()
}
