use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PrepError, Result};
use crate::matrix::Shape;
use crate::model::{Distribution, Expr, ModelGraph, Spread};
use crate::prepare::PreparedData;

const DIFFUSE_GAMMA: f64 = 0.001;
const DEFAULT_ADVANTAGE_MEAN: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HyperpriorFamily {
    /// Gamma(0.001, 0.001) on precisions, Normals take `tau`.
    GammaDiffuse,
    HalfCauchy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeAdvantage {
    Global,
    PerHomeTeam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    PairStrength,
    HomeAdvantage,
    TeamAdvantage,
    CupImpact,
    Error,
}

impl Effect {
    pub fn hyper_name(self) -> &'static str {
        match self {
            Effect::PairStrength => "pair_var",
            Effect::HomeAdvantage => "home_var",
            Effect::TeamAdvantage => "home_var_team",
            Effect::CupImpact => "cup_var",
            Effect::Error => "error_var",
        }
    }
}

impl HyperpriorFamily {
    pub fn hyperprior(self, effect: Effect) -> Distribution {
        match self {
            HyperpriorFamily::GammaDiffuse => Distribution::Gamma {
                alpha: DIFFUSE_GAMMA,
                beta: DIFFUSE_GAMMA,
            },
            HyperpriorFamily::HalfCauchy => {
                let beta = match effect {
                    Effect::PairStrength | Effect::Error => 5.0,
                    Effect::HomeAdvantage | Effect::TeamAdvantage | Effect::CupImpact => 2.0,
                };
                Distribution::HalfCauchy { beta }
            }
        }
    }

    pub fn spread(self, hyper: Expr) -> Spread {
        match self {
            HyperpriorFamily::GammaDiffuse => Spread::Tau(hyper),
            HyperpriorFamily::HalfCauchy => Spread::Sigma(hyper),
        }
    }
}

/// Prior on the global home advantage. Without a scale the spread is itself a
/// latent hyperparameter of the variant's family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvantagePrior {
    pub mean: f64,
    #[serde(default)]
    pub scale: Option<f64>,
}

impl Default for AdvantagePrior {
    fn default() -> Self {
        Self {
            mean: DEFAULT_ADVANTAGE_MEAN,
            scale: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub family: HyperpriorFamily,
    pub home_advantage: HomeAdvantage,
    pub net_sign_flag: bool,
    #[serde(default)]
    pub advantage_prior: AdvantagePrior,
}

impl VariantConfig {
    pub fn with_advantage_prior(mut self, prior: AdvantagePrior) -> Self {
        self.advantage_prior = prior;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    GlobalAdvantageGamma,
    GlobalAdvantageFlagged,
    GlobalAdvantage,
    TeamAdvantageGamma,
    TeamAdvantageFlagged,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::GlobalAdvantageGamma,
        Variant::GlobalAdvantageFlagged,
        Variant::GlobalAdvantage,
        Variant::TeamAdvantageGamma,
        Variant::TeamAdvantageFlagged,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variant::GlobalAdvantageGamma => "global_advantage_gamma",
            Variant::GlobalAdvantageFlagged => "global_advantage_flagged",
            Variant::GlobalAdvantage => "global_advantage",
            Variant::TeamAdvantageGamma => "team_advantage_gamma",
            Variant::TeamAdvantageFlagged => "team_advantage_flagged",
        }
    }

    pub fn config(self) -> VariantConfig {
        let (family, home_advantage, net_sign_flag) = match self {
            Variant::GlobalAdvantageGamma => {
                (HyperpriorFamily::GammaDiffuse, HomeAdvantage::Global, false)
            }
            Variant::GlobalAdvantageFlagged => {
                (HyperpriorFamily::HalfCauchy, HomeAdvantage::Global, true)
            }
            Variant::GlobalAdvantage => (HyperpriorFamily::HalfCauchy, HomeAdvantage::Global, false),
            Variant::TeamAdvantageGamma => (
                HyperpriorFamily::GammaDiffuse,
                HomeAdvantage::PerHomeTeam,
                false,
            ),
            Variant::TeamAdvantageFlagged => {
                (HyperpriorFamily::HalfCauchy, HomeAdvantage::PerHomeTeam, true)
            }
        };
        VariantConfig {
            family,
            home_advantage,
            net_sign_flag,
            advantage_prior: AdvantagePrior::default(),
        }
    }

    pub fn build<'a>(self, data: &'a PreparedData, prior: AdvantagePrior) -> Result<ModelGraph<'a>> {
        build_model(self.name(), data, &self.config().with_advantage_prior(prior))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == key)
            .ok_or_else(|| PrepError::Configuration(format!("unknown model variant {s:?}")))
    }
}

pub fn global_advantage_gamma(data: &PreparedData, prior: AdvantagePrior) -> Result<ModelGraph<'_>> {
    Variant::GlobalAdvantageGamma.build(data, prior)
}

pub fn global_advantage_flagged(
    data: &PreparedData,
    prior: AdvantagePrior,
) -> Result<ModelGraph<'_>> {
    Variant::GlobalAdvantageFlagged.build(data, prior)
}

pub fn global_advantage(data: &PreparedData, prior: AdvantagePrior) -> Result<ModelGraph<'_>> {
    Variant::GlobalAdvantage.build(data, prior)
}

pub fn team_advantage_gamma(data: &PreparedData, prior: AdvantagePrior) -> Result<ModelGraph<'_>> {
    Variant::TeamAdvantageGamma.build(data, prior)
}

pub fn team_advantage_flagged(
    data: &PreparedData,
    prior: AdvantagePrior,
) -> Result<ModelGraph<'_>> {
    Variant::TeamAdvantageFlagged.build(data, prior)
}

// full_score = dot(team_identifiers, pair_strength) + home_term * home_pos + home_pos * cup * cup_impact
pub fn build_model<'a>(
    name: &str,
    data: &'a PreparedData,
    cfg: &VariantConfig,
) -> Result<ModelGraph<'a>> {
    data.validate()?;
    let family = cfg.family;
    let mut graph = ModelGraph::new(name);

    let teams = graph.data("team_identifiers", &data.pair_vals)?;
    let scores = graph.data("scores", &data.score_diffs)?;
    let home_pos = graph.data("home_pos", &data.is_game_home)?;
    let priors = graph.data("priors", &data.pair_priors)?;
    let cup = graph.data("cup", &data.is_cup)?;

    let pair_var = hyper(&mut graph, family, Effect::PairStrength)?;
    let pair_strength = graph.latent(
        "pair_strength",
        Shape::column(data.no_pairs),
        Distribution::normal(priors, family.spread(pair_var)),
    )?;

    let home_spread = match cfg.advantage_prior.scale {
        Some(scale) => Spread::Sigma(Expr::Const(scale)),
        None => family.spread(hyper(&mut graph, family, Effect::HomeAdvantage)?),
    };
    let regular_advantage = graph.latent(
        "regular_advantage",
        Shape::SCALAR,
        Distribution::normal(Expr::Const(cfg.advantage_prior.mean), home_spread),
    )?;

    let home_term = match cfg.home_advantage {
        HomeAdvantage::Global => regular_advantage.clone(),
        HomeAdvantage::PerHomeTeam => {
            let home_team = graph.data("home_team", &data.home_teams)?;
            let team_var = hyper(&mut graph, family, Effect::TeamAdvantage)?;
            let team_advantage = graph.latent(
                "team_advantage",
                Shape::column(data.no_home_teams),
                Distribution::normal(regular_advantage.clone(), family.spread(team_var)),
            )?;
            Expr::dot(home_team, team_advantage)
        }
    };

    let cup_var = hyper(&mut graph, family, Effect::CupImpact)?;
    let cup_impact = graph.latent(
        "cup_impact",
        Shape::SCALAR,
        Distribution::normal(Expr::Const(0.0), family.spread(cup_var)),
    )?;

    let strength_score = Expr::dot(teams, pair_strength);
    let home_score = home_term
        .mul(home_pos.clone())
        .add(home_pos.mul(cup).mul(cup_impact.clone()));
    let full_score = graph.deterministic("full_score", strength_score.add(home_score))?;

    if cfg.net_sign_flag {
        graph.deterministic(
            "total_cup_advantage",
            regular_advantage.add(cup_impact).positive(),
        )?;
    }

    let error_var = hyper(&mut graph, family, Effect::Error)?;
    graph.observed(
        "observed",
        Distribution::normal(full_score, family.spread(error_var)),
        scores,
    )?;

    debug!(
        "built {name}: {} nodes, {} latent",
        graph.nodes().len(),
        graph.latent_names().len()
    );
    Ok(graph)
}

fn hyper(graph: &mut ModelGraph<'_>, family: HyperpriorFamily, effect: Effect) -> Result<Expr> {
    graph.latent(effect.hyper_name(), Shape::SCALAR, family.hyperprior(effect))
}
