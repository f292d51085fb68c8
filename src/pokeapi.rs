use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;

use crate::error::CatalogError;
use crate::evolution::ChainLink;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

static CHAIN_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/evolution-chain/(\d+)/?$").expect("evolution chain pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesRef {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variety {
    pub name: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesDetail {
    pub id: i64,
    pub name: String,
    /// Raw `generation.name`; parsed later so malformed values surface per species.
    pub generation_slug: Value,
    pub is_baby: bool,
    pub varieties: Vec<Variety>,
    pub evolution_chain_url: Option<String>,
}

impl SpeciesDetail {
    pub fn default_variety(&self) -> Option<&Variety> {
        self.varieties.iter().find(|variety| variety.is_default)
    }

    pub fn alternate_varieties(&self) -> impl Iterator<Item = &Variety> {
        self.varieties.iter().filter(|variety| !variety.is_default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDetail {
    pub id: i64,
    pub name: String,
    pub is_battle_only: bool,
    pub image_url: Option<String>,
    /// Type names in slot order; one or two entries.
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionChain {
    pub id: i64,
    pub root: ChainLink,
}

pub trait CatalogSource: Send + Sync {
    fn list_species(&self, limit: u32) -> Result<Vec<SpeciesRef>, CatalogError>;
    fn species_detail(&self, name: &str) -> Result<SpeciesDetail, CatalogError>;
    fn variant_detail(&self, name: &str) -> Result<VariantDetail, CatalogError>;
    fn evolution_chain(&self, chain_id: i64) -> Result<EvolutionChain, CatalogError>;
}

#[derive(Clone)]
pub struct PokeApiHttpClient {
    client: Client,
    base_url: String,
}

impl PokeApiHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pokedex-loader/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CatalogError::SourceHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| CatalogError::SourceHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, CatalogError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "PokeAPI request failed".to_string());
        Err(CatalogError::SourceStatus { status, message })
    }

    fn get_json(&self, url: &str) -> Result<Value, CatalogError> {
        tracing::debug!(url, "pokeapi.request");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| CatalogError::SourceHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| CatalogError::SourceDecode(err.to_string()))
    }
}

impl CatalogSource for PokeApiHttpClient {
    fn list_species(&self, limit: u32) -> Result<Vec<SpeciesRef>, CatalogError> {
        let url = format!("{}/pokemon-species?limit={limit}", self.base_url);
        extract_species_list(&self.get_json(&url)?)
    }

    fn species_detail(&self, name: &str) -> Result<SpeciesDetail, CatalogError> {
        let url = format!("{}/pokemon-species/{name}", self.base_url);
        extract_species_detail(&self.get_json(&url)?)
    }

    fn variant_detail(&self, name: &str) -> Result<VariantDetail, CatalogError> {
        let url = format!("{}/pokemon-form/{name}", self.base_url);
        extract_variant_detail(&self.get_json(&url)?)
    }

    fn evolution_chain(&self, chain_id: i64) -> Result<EvolutionChain, CatalogError> {
        let url = format!("{}/evolution-chain/{chain_id}", self.base_url);
        extract_evolution_chain(&self.get_json(&url)?)
    }
}

pub fn extract_species_list(raw: &Value) -> Result<Vec<SpeciesRef>, CatalogError> {
    let results = raw
        .get("results")
        .and_then(|value| value.as_array())
        .ok_or_else(|| CatalogError::MalformedPayload("species list without results".to_string()))?;
    results
        .iter()
        .map(|entry| {
            let name = str_field(entry, "name")
                .ok_or_else(|| CatalogError::MalformedPayload("species entry without name".to_string()))?;
            Ok(SpeciesRef {
                name,
                url: str_field(entry, "url"),
            })
        })
        .collect()
}

pub fn extract_species_detail(raw: &Value) -> Result<SpeciesDetail, CatalogError> {
    let name = str_field(raw, "name")
        .ok_or_else(|| CatalogError::MalformedPayload("species without name".to_string()))?;
    let id = raw
        .get("id")
        .and_then(|value| value.as_i64())
        .ok_or_else(|| CatalogError::MalformedPayload(format!("species {name} without id")))?;
    let generation_slug = raw
        .get("generation")
        .and_then(|value| value.get("name"))
        .cloned()
        .unwrap_or(Value::Null);
    let is_baby = raw
        .get("is_baby")
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    let varieties = raw
        .get("varieties")
        .and_then(|value| value.as_array())
        .map(|array| {
            array
                .iter()
                .filter_map(|variety| {
                    let name = variety
                        .get("pokemon")
                        .and_then(|pokemon| str_field(pokemon, "name"))?;
                    let is_default = variety
                        .get("is_default")
                        .and_then(|value| value.as_bool())
                        .unwrap_or(false);
                    Some(Variety { name, is_default })
                })
                .collect()
        })
        .unwrap_or_default();
    let evolution_chain_url = raw
        .get("evolution_chain")
        .and_then(|value| str_field(value, "url"));

    Ok(SpeciesDetail {
        id,
        name,
        generation_slug,
        is_baby,
        varieties,
        evolution_chain_url,
    })
}

pub fn extract_variant_detail(raw: &Value) -> Result<VariantDetail, CatalogError> {
    let name = str_field(raw, "name")
        .ok_or_else(|| CatalogError::MalformedPayload("variant without name".to_string()))?;
    let id = raw
        .get("id")
        .and_then(|value| value.as_i64())
        .ok_or_else(|| CatalogError::MalformedPayload(format!("variant {name} without id")))?;
    let is_battle_only = raw
        .get("is_battle_only")
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    let image_url = raw
        .get("sprites")
        .and_then(|value| str_field(value, "front_default"));

    let mut slotted = raw
        .get("types")
        .and_then(|value| value.as_array())
        .map(|array| {
            array
                .iter()
                .filter_map(|entry| {
                    let slot = entry.get("slot").and_then(|value| value.as_u64()).unwrap_or(0);
                    let type_name = entry.get("type").and_then(|value| str_field(value, "name"))?;
                    Some((slot, type_name))
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    slotted.sort_by_key(|(slot, _)| *slot);
    let types = slotted.into_iter().map(|(_, name)| name).collect::<Vec<_>>();
    if types.is_empty() {
        return Err(CatalogError::MalformedPayload(format!(
            "variant {name} has no types"
        )));
    }

    Ok(VariantDetail {
        id,
        name,
        is_battle_only,
        image_url,
        types,
    })
}

pub fn extract_evolution_chain(raw: &Value) -> Result<EvolutionChain, CatalogError> {
    let id = raw
        .get("id")
        .and_then(|value| value.as_i64())
        .ok_or_else(|| CatalogError::MalformedPayload("evolution chain without id".to_string()))?;
    let chain = raw
        .get("chain")
        .ok_or_else(|| CatalogError::MalformedPayload(format!("evolution chain {id} is empty")))?;
    Ok(EvolutionChain {
        id,
        root: extract_chain_link(chain)?,
    })
}

fn extract_chain_link(raw: &Value) -> Result<ChainLink, CatalogError> {
    let species_name = raw
        .get("species")
        .and_then(|value| str_field(value, "name"))
        .ok_or_else(|| CatalogError::MalformedPayload("chain link without species".to_string()))?;
    let is_baby = raw
        .get("is_baby")
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    let evolves_to = match raw.get("evolves_to").and_then(|value| value.as_array()) {
        Some(children) => children
            .iter()
            .map(extract_chain_link)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok(ChainLink {
        species_name,
        is_baby,
        evolves_to,
    })
}

/// Numeric chain id from a reference such as
/// `https://pokeapi.co/api/v2/evolution-chain/67/`.
pub fn evolution_chain_id(url: &str) -> Result<i64, CatalogError> {
    CHAIN_ID_RE
        .captures(url.trim())
        .and_then(|captures| captures.get(1))
        .and_then(|id| id.as_str().parse().ok())
        .ok_or_else(|| CatalogError::MissingEvolutionChainId(url.to_string()))
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}
