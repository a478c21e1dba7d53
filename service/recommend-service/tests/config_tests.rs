use std::collections::HashMap;
use std::path::PathBuf;

use catalog_store::catalog::CatalogEncoding;
use catalog_store::VectorBackend;
use recommend_service::{ConfigError, EmbedderChoice, ServiceConfig};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_match_documented_values() {
    let cfg = ServiceConfig::default();
    assert_eq!(cfg.top_k, 5);
    assert_eq!(cfg.lexical_weight, 0.5);
    assert_eq!(cfg.dense_weight, 0.5);
    assert_eq!(cfg.catalog_path, PathBuf::from("data/products.csv"));
    assert_eq!(cfg.image_dir, PathBuf::from("images/products"));
    assert_eq!(cfg.log.dir, PathBuf::from("logs"));
    assert_eq!(cfg.log.file_name, "application.log");
    assert_eq!(cfg.embedder, EmbedderChoice::Onnx);
    assert_eq!(cfg.fallback_backend, VectorBackend::Flat);
}

#[test]
fn environment_overrides_defaults() {
    let cfg = ServiceConfig::from_lookup(lookup(&[
        ("RECOMMEND_CATALOG_PATH", "fixtures/items.csv"),
        ("RECOMMEND_CATALOG_ENCODING", "sjis"),
        ("RECOMMEND_TOP_K", "3"),
        ("RECOMMEND_LEXICAL_WEIGHT", "0.3"),
        ("RECOMMEND_DENSE_WEIGHT", "0.7"),
        ("RECOMMEND_EMBEDDER", "hashing"),
        ("RECOMMEND_EMBED_DIM", "64"),
        ("RECOMMEND_LOG_DIR", " /tmp/recommend-logs "),
    ]))
    .expect("valid configuration");
    assert_eq!(cfg.catalog_path, PathBuf::from("fixtures/items.csv"));
    assert_eq!(cfg.catalog_encoding, CatalogEncoding::ShiftJis);
    assert_eq!(cfg.top_k, 3);
    assert_eq!(cfg.lexical_weight, 0.3);
    assert_eq!(cfg.dense_weight, 0.7);
    assert_eq!(cfg.embedder, EmbedderChoice::Hashing);
    assert_eq!(cfg.hashing.dimension, 64);
    assert_eq!(cfg.onnx.dimension, 64);
    assert_eq!(cfg.log.dir, PathBuf::from("/tmp/recommend-logs"));
}

#[test]
fn blank_values_are_ignored() {
    let cfg = ServiceConfig::from_lookup(lookup(&[("RECOMMEND_TOP_K", "  ")])).expect("blank is unset");
    assert_eq!(cfg.top_k, 5);
}

#[test]
fn invalid_values_name_the_key() {
    let err = ServiceConfig::from_lookup(lookup(&[("RECOMMEND_TOP_K", "0")])).err().expect("zero K");
    assert_eq!(err, ConfigError::Invalid { key: "RECOMMEND_TOP_K", value: "0".into() });

    let err = ServiceConfig::from_lookup(lookup(&[("RECOMMEND_DENSE_WEIGHT", "-1")])).err().expect("negative weight");
    assert!(matches!(err, ConfigError::Invalid { key: "RECOMMEND_DENSE_WEIGHT", .. }));

    let err = ServiceConfig::from_lookup(lookup(&[("RECOMMEND_EMBEDDER", "openai")])).err().expect("unknown embedder");
    assert!(err.to_string().contains("RECOMMEND_EMBEDDER"));

    let err = ServiceConfig::from_lookup(lookup(&[("RECOMMEND_CATALOG_ENCODING", "latin1")])).err().expect("unknown encoding");
    assert!(matches!(err, ConfigError::Invalid { key: "RECOMMEND_CATALOG_ENCODING", .. }));
}

#[test]
fn disabled_embedder_builds_nothing() {
    let cfg = ServiceConfig { embedder: EmbedderChoice::None, ..ServiceConfig::default() };
    assert!(cfg.build_embedder().expect("no embedder to fail").is_none());
}
