use std::collections::HashMap;

use pair_strength::synthetic::{self, LeagueSpec};
use pair_strength::{GameRecord, GroupKey, PairKey, PrepError, WindowConfig, prepare};

fn game(game_id: i64, home: u32, away: u32, home_points: f64, away_points: f64, year: i32) -> GameRecord {
    GameRecord {
        game_id,
        season_id: i64::from(year),
        home_team_id: home,
        away_team_id: away,
        home_points,
        away_points,
        start_year: year,
        regular: true,
    }
}

fn pair(hi: u32, lo: u32) -> GroupKey {
    GroupKey {
        pair: PairKey(hi, lo),
        season: None,
    }
}

#[test]
fn three_game_example() {
    let games = [
        game(1, 2, 1, 20.0, 10.0, 2020),
        game(2, 2, 1, 15.0, 18.0, 2020),
        game(3, 2, 1, 30.0, 3.0, 2021),
    ];
    let data = prepare(&games, &WindowConfig::new(2020, 1)).unwrap();
    assert_eq!(2, data.no_obs);
    assert_eq!(1, data.no_pairs);
    assert_eq!(vec![0.0], data.pair_priors.as_slice());
    assert_eq!(vec![pair(2, 1)], data.pair_ids);
    assert_eq!(&[10.0, -3.0], data.score_diffs.as_slice());
    assert_eq!(&[1.0, 1.0], data.is_game_home.as_slice());
    assert_eq!(vec![2], data.home_team_ids);
    data.validate().unwrap();
}

#[test]
fn window_keeps_only_its_seasons() {
    let games = (2018..=2023)
        .map(|year| game(i64::from(year), 2, 1, 10.0, 0.0, year))
        .collect::<Vec<_>>();
    let data = prepare(&games, &WindowConfig::new(2020, 2)).unwrap();
    assert_eq!(2, data.no_obs);

    let kept = WindowConfig::new(2020, 2).grouped_by_season();
    let data = prepare(&games, &kept).unwrap();
    let seasons = data.pair_ids.iter().map(|k| k.season).collect::<Vec<_>>();
    assert_eq!(vec![Some(2020), Some(2021)], seasons);
}

#[test]
fn informative_priors_align_with_pair_columns() {
    let games = [
        // lookback seasons
        game(1, 2, 1, 14.0, 10.0, 2018),
        game(2, 1, 2, 10.0, 12.0, 2019),
        game(3, 5, 4, 30.0, 0.0, 2019),
        game(4, 3, 1, 9.0, 0.0, 2015),
        // window
        game(5, 3, 1, 3.0, 7.0, 2020),
        game(6, 2, 1, 1.0, 0.0, 2020),
        game(7, 1, 2, 0.0, 1.0, 2021),
    ];
    let cfg = WindowConfig::new(2020, 2).with_prior_lookback(2);
    let data = prepare(&games, &cfg).unwrap();

    assert_eq!(vec![pair(2, 1), pair(3, 1)], data.pair_ids);
    // (2,1): game 1 reads +4, game 2 reads +2 from team 2's side.
    assert_eq!(Some(3.0), data.prior_for(&pair(2, 1)));
    // (3,1) only played in 2015, outside the lookback.
    assert_eq!(Some(0.0), data.prior_for(&pair(3, 1)));
    assert_eq!(data.no_pairs, data.pair_priors.rows());
}

#[test]
fn lookback_never_reads_the_window_itself() {
    let games = [game(1, 2, 1, 50.0, 0.0, 2020)];
    let data = prepare(&games, &WindowConfig::new(2020, 1).with_prior_lookback(3)).unwrap();
    assert_eq!(&[0.0], data.pair_priors.as_slice());
}

#[test]
fn lookback_with_season_grouping_fails_before_preparing() {
    let cfg = WindowConfig::new(2020, 2)
        .with_prior_lookback(1)
        .grouped_by_season();
    assert!(matches!(prepare(&[], &cfg), Err(PrepError::Configuration(_))));
    let games = synthetic::generate(&LeagueSpec::default());
    assert!(matches!(prepare(&games, &cfg), Err(PrepError::Configuration(_))));
}

#[test]
fn empty_window_is_well_shaped() {
    let games = [game(1, 2, 1, 1.0, 0.0, 2010)];
    let data = prepare(&games, &WindowConfig::new(2020, 2).with_prior_lookback(2)).unwrap();
    assert_eq!(0, data.no_obs);
    assert_eq!(0, data.no_pairs);
    assert_eq!(0, data.no_home_teams);
    assert_eq!(0, data.pair_vals.rows());
    assert_eq!(0, data.score_diffs.rows());
    assert_eq!(1, data.score_diffs.cols());
    assert!(data.pair_priors.as_slice().is_empty());
    data.validate().unwrap();
}

#[test]
fn shapes_agree_on_a_synthetic_league() {
    let games = synthetic::generate(&LeagueSpec::default());
    for cfg in [
        WindowConfig::new(2017, 3),
        WindowConfig::new(2017, 3).with_prior_lookback(2),
        WindowConfig::new(2017, 3).grouped_by_season(),
    ] {
        let data = prepare(&games, &cfg).unwrap();
        let n = data.no_obs;
        assert!(n > 0);
        assert_eq!(n, data.pair_vals.rows());
        assert_eq!(n, data.home_teams.rows());
        assert_eq!(n, data.score_diffs.rows());
        assert_eq!(n, data.is_game_home.rows());
        assert_eq!(n, data.is_cup.rows());
        assert_eq!(data.no_pairs, data.pair_vals.cols());
        assert_eq!(data.no_pairs, data.pair_ids.len());
        assert_eq!(data.no_pairs, data.pair_priors.rows());
        assert_eq!(data.no_home_teams, data.home_teams.cols());
        assert_eq!(data.no_home_teams, data.home_team_ids.len());

        for row in 0..n {
            assert_eq!(1.0, data.pair_vals.row_slice(row).iter().sum::<f64>());
            assert_eq!(1.0, data.home_teams.row_slice(row).iter().sum::<f64>());
        }
        let mut sorted = data.pair_ids.clone();
        sorted.sort();
        assert_eq!(sorted, data.pair_ids);
    }
}

#[test]
fn season_grouping_splits_pairs_but_not_home_teams() {
    let games = synthetic::generate(&LeagueSpec {
        teams: 4,
        ..LeagueSpec::default()
    });
    let pooled = prepare(&games, &WindowConfig::new(2016, 2)).unwrap();
    let split = prepare(&games, &WindowConfig::new(2016, 2).grouped_by_season()).unwrap();
    assert_eq!(6, pooled.no_pairs);
    assert_eq!(12, split.no_pairs);
    assert_eq!(pooled.home_team_ids, split.home_team_ids);
}

#[test]
fn sign_is_stable_per_pair() {
    let games = synthetic::generate(&LeagueSpec::default());
    let data = prepare(&games, &WindowConfig::new(2015, 8)).unwrap();

    let mut seen: HashMap<(u32, u32), f64> = HashMap::new();
    let window = games.iter().filter(|g| (2015..2023).contains(&g.start_year));
    for (row, g) in window.enumerate() {
        let sign = data.is_game_home[(row, 0)];
        // The sign is fixed by which id the home team carries.
        let key = (g.home_team_id, g.away_team_id);
        let previous = seen.entry(key).or_insert(sign);
        assert_eq!(*previous, sign);
        let expected = if g.home_team_id > g.away_team_id { 1.0 } else { -1.0 };
        assert_eq!(expected, sign);
        assert_eq!(g.score_diff(), data.score_diffs[(row, 0)]);
    }
}

#[test]
fn cup_indicator_inverts_regular_flag() {
    let mut cup = game(2, 2, 1, 1.0, 0.0, 2020);
    cup.regular = false;
    let games = [game(1, 2, 1, 1.0, 0.0, 2020), cup];
    let data = prepare(&games, &WindowConfig::new(2020, 1)).unwrap();
    assert_eq!(&[0.0, 1.0], data.is_cup.as_slice());
}
