#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod error;
pub mod export;
pub mod games;
pub mod matrix;
pub mod model;
pub mod prepare;
pub mod synthetic;
pub mod variants;

pub use error::{PrepError, Result};
pub use games::{GameRecord, PairKey, TeamId, load_games};
pub use prepare::{GroupKey, PreparedData, WindowConfig, prepare};
pub use variants::{AdvantagePrior, Variant};
