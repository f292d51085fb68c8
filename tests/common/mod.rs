#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use pokedex_loader::error::CatalogError;
use pokedex_loader::ingest::{ProgressEvent, ProgressSink};
use pokedex_loader::pokeapi::{
    CatalogSource, EvolutionChain, SpeciesDetail, SpeciesRef, VariantDetail,
    extract_evolution_chain, extract_species_detail, extract_variant_detail,
};

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

#[derive(Clone)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn count(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

/// In-memory catalog source serving PokeAPI-shaped JSON fixtures.
#[derive(Default)]
pub struct MockCatalog {
    order: Vec<String>,
    species: HashMap<String, Value>,
    variants: HashMap<String, Value>,
    chains: HashMap<i64, Value>,
    unreachable: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_species(mut self, raw: Value) -> Self {
        let name = raw["name"].as_str().unwrap().to_string();
        self.order.push(name.clone());
        self.species.insert(name, raw);
        self
    }

    pub fn with_variant(mut self, raw: Value) -> Self {
        let name = raw["name"].as_str().unwrap().to_string();
        self.variants.insert(name, raw);
        self
    }

    pub fn with_chain(mut self, raw: Value) -> Self {
        let id = raw["id"].as_i64().unwrap();
        self.chains.insert(id, raw);
        self
    }

    /// Lists `name` but fails every detail request for it.
    pub fn with_unreachable(mut self, name: &str) -> Self {
        self.order.push(name.to_string());
        self.unreachable.insert(name.to_string());
        self
    }

    /// Shared handle on the request log; stays valid after the catalog is
    /// moved into an ingestor.
    pub fn call_log(&self) -> CallLog {
        CallLog(Arc::clone(&self.calls))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CatalogSource for MockCatalog {
    fn list_species(&self, limit: u32) -> Result<Vec<SpeciesRef>, CatalogError> {
        self.record(format!("list:{limit}"));
        Ok(self
            .order
            .iter()
            .take(limit as usize)
            .map(|name| SpeciesRef {
                name: name.clone(),
                url: None,
            })
            .collect())
    }

    fn species_detail(&self, name: &str) -> Result<SpeciesDetail, CatalogError> {
        self.record(format!("species:{name}"));
        if self.unreachable.contains(name) {
            return Err(CatalogError::SourceHttp(format!("connection reset for {name}")));
        }
        let raw = self.species.get(name).ok_or(CatalogError::SourceStatus {
            status: 404,
            message: "Not Found".to_string(),
        })?;
        extract_species_detail(raw)
    }

    fn variant_detail(&self, name: &str) -> Result<VariantDetail, CatalogError> {
        self.record(format!("variant:{name}"));
        let raw = self.variants.get(name).ok_or(CatalogError::SourceStatus {
            status: 404,
            message: "Not Found".to_string(),
        })?;
        extract_variant_detail(raw)
    }

    fn evolution_chain(&self, chain_id: i64) -> Result<EvolutionChain, CatalogError> {
        self.record(format!("chain:{chain_id}"));
        let raw = self.chains.get(&chain_id).ok_or(CatalogError::SourceStatus {
            status: 404,
            message: "Not Found".to_string(),
        })?;
        extract_evolution_chain(raw)
    }
}

pub fn species_json(
    id: i64,
    name: &str,
    generation: &str,
    chain_id: i64,
    varieties: &[(&str, bool)],
) -> Value {
    json!({
        "id": id,
        "name": name,
        "is_baby": false,
        "generation": { "name": generation, "url": "https://pokeapi.co/api/v2/generation/1/" },
        "evolution_chain": {
            "url": format!("https://pokeapi.co/api/v2/evolution-chain/{chain_id}/")
        },
        "varieties": varieties
            .iter()
            .map(|(variety, is_default)| json!({
                "is_default": is_default,
                "pokemon": { "name": variety, "url": "" }
            }))
            .collect::<Vec<_>>(),
    })
}

pub fn variant_json(id: i64, name: &str, types: &[&str], sprite: Option<&str>) -> Value {
    json!({
        "id": id,
        "name": name,
        "is_battle_only": false,
        "sprites": { "front_default": sprite },
        "types": types
            .iter()
            .enumerate()
            .map(|(index, type_name)| json!({
                "slot": index + 1,
                "type": { "name": type_name, "url": "" }
            }))
            .collect::<Vec<_>>(),
    })
}

pub fn chain_json(id: i64, root: Value) -> Value {
    json!({ "id": id, "chain": root })
}

pub fn link_json(name: &str, is_baby: bool, evolves_to: Vec<Value>) -> Value {
    json!({
        "is_baby": is_baby,
        "species": { "name": name, "url": "" },
        "evolves_to": evolves_to,
    })
}

/// Bulbasaur line plus a charizard species carrying one accepted and one
/// battle-only alternate form.
pub fn starter_catalog() -> MockCatalog {
    let mut mega = variant_json(10034, "charizard-mega-x", &["fire", "dragon"], Some("mega.png"));
    mega["is_battle_only"] = json!(true);

    MockCatalog::new()
        .with_species(species_json(1, "bulbasaur", "generation-i", 1, &[("bulbasaur", true)]))
        .with_species(species_json(2, "ivysaur", "generation-i", 1, &[("ivysaur", true)]))
        .with_species(species_json(
            6,
            "charizard",
            "generation-i",
            2,
            &[
                ("charizard", true),
                ("charizard-mega-x", false),
                ("charizard-gmax-alt", false),
            ],
        ))
        .with_variant(variant_json(1, "bulbasaur", &["grass", "poison"], Some("1.png")))
        .with_variant(variant_json(2, "ivysaur", &["grass", "poison"], Some("2.png")))
        .with_variant(variant_json(6, "charizard", &["fire", "flying"], Some("6.png")))
        .with_variant(mega)
        .with_variant(variant_json(
            10500,
            "charizard-gmax-alt",
            &["fire", "flying"],
            Some("alt.png"),
        ))
        .with_chain(chain_json(
            1,
            link_json(
                "bulbasaur",
                false,
                vec![link_json(
                    "ivysaur",
                    false,
                    vec![link_json("venusaur", false, Vec::new())],
                )],
            ),
        ))
        .with_chain(chain_json(
            2,
            link_json(
                "charmander",
                false,
                vec![link_json(
                    "charmeleon",
                    false,
                    vec![link_json("charizard", false, Vec::new())],
                )],
            ),
        ))
}
