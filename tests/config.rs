use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use tempfile::TempDir;

use pokedex_loader::admission::Admission;
use pokedex_loader::config::ConfigLoader;
use pokedex_loader::error::{CatalogError, ErrorKind};
use pokedex_loader::pokeapi::DEFAULT_BASE_URL;

fn write_config(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("pokedex-loader.json");
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn explicit_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "database": "/tmp/catalog.db",
            "source": { "timeout_secs": 5, "request_delay_ms": 0, "species_limit": 151 },
            "track_lineage": false,
            "exclude_forms": ["-gmax"],
            "image_remediations": []
        }"#,
    );

    let config = ConfigLoader::resolve(Some(&path)).unwrap();
    assert_eq!(config.database, Utf8PathBuf::from("/tmp/catalog.db"));
    assert_eq!(config.source.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.source.timeout, Duration::from_secs(5));
    assert_eq!(config.source.request_delay, Duration::ZERO);
    assert_eq!(config.source.species_limit, 151);
    assert_eq!(config.progress_every, 25);
    assert!(!config.track_lineage);

    let policy = config.policy();
    assert!(!policy.track_lineage);
    assert_eq!(policy.admission.exclusions(), ["-gmax".to_string()]);
    assert_matches!(
        policy.admission.decide(false, "charizard-gmax"),
        Admission::Excluded { .. }
    );
    assert!(policy.admission.decide(false, "pikachu-alola").is_accepted());
    assert_eq!(policy.remediations.image_donor("zygarde-10"), None);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_matches!(err, CatalogError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "source": { "species_limit": "many" } }"#);

    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, CatalogError::ConfigParse(_));
}

#[test]
fn empty_exclusion_pattern_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "database": "catalog.db", "exclude_forms": ["-totem", ""] }"#);

    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_matches!(err, CatalogError::ConfigParse(message) if message.contains("empty pattern"));
}
