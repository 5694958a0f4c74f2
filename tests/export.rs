use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use pair_strength::export::{self, BUNDLE_KEYS, ModelExport};
use pair_strength::synthetic::{self, LeagueSpec};
use pair_strength::{AdvantagePrior, PrepError, Variant, WindowConfig, prepare};

fn scratch_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("pair_strength_{}_{name}", std::process::id()));
    path
}

#[test]
fn bundle_survives_json_and_is_revalidated() {
    let games = synthetic::generate(&LeagueSpec::default());
    let data = prepare(&games, &WindowConfig::new(2018, 2).with_prior_lookback(2)).unwrap();
    let raw = export::bundle_to_json(&data).unwrap();

    let back = export::bundle_from_json(&raw).unwrap();
    assert_eq!(data, back);

    let mut value: Value = serde_json::from_str(&raw).unwrap();
    for key in BUNDLE_KEYS {
        assert!(value.get(key).is_some(), "{key}");
    }
    value["no_pairs"] = Value::from(data.no_pairs + 1);
    assert!(matches!(
        export::bundle_from_json(&value.to_string()),
        Err(PrepError::DimensionMismatch { .. })
    ));

    value.as_object_mut().unwrap().remove("pair_priors");
    match export::bundle_from_json(&value.to_string()) {
        Err(PrepError::MissingKey(key)) => assert_eq!("pair_priors", key),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn model_export_is_written_whole() {
    let games = synthetic::generate(&LeagueSpec {
        teams: 4,
        ..LeagueSpec::default()
    });
    let window = WindowConfig::new(2019, 1);
    let data = prepare(&games, &window).unwrap();
    let prior = AdvantagePrior::default();
    let graph = Variant::TeamAdvantageFlagged.build(&data, prior).unwrap();

    let path = scratch_path("export.json");
    ModelExport::new(Variant::TeamAdvantageFlagged, &window, prior, &data, &graph)
        .write(&path)
        .unwrap();
    assert!(!path.with_extension("json.tmp").exists());

    let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!("team_advantage_flagged", value["variant"]);
    assert_eq!(2019, value["window"]["start_year"]);
    assert_eq!(6, value["pair_ids"].as_array().unwrap().len());
    assert_eq!("2-1", value["pair_ids"][0]);

    let nodes = value["graph"]["nodes"].as_array().unwrap();
    assert_eq!(graph.nodes().len(), nodes.len());
    let observed = nodes
        .iter()
        .find(|n| n["name"] == "observed")
        .expect("observed node");
    assert_eq!("observed", observed["kind"]);
    assert_eq!("normal", observed["distribution"]["family"]);
    assert_eq!(
        value["latent"].as_array().unwrap().len(),
        graph.latent_names().len()
    );
}
