use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CatalogError;

pub const TYPE_NAMES: &[&str] = &[
    "normal", "fire", "water", "electric", "grass", "ice", "fighting", "poison", "ground",
    "flying", "psychic", "bug", "rock", "ghost", "dragon", "dark", "steel", "fairy",
];

pub const NATURE_NAMES: &[&str] = &[
    "adamant", "bashful", "bold", "brave", "calm", "careful", "docile", "gentle", "hardy",
    "hasty", "impish", "jolly", "lax", "lonely", "mild", "modest", "naive", "naughty", "quiet",
    "quirky", "rash", "relaxed", "sassy", "serious", "timid",
];

const ROMAN_NUMERALS: &[(&str, u8)] = &[
    ("i", 1),
    ("ii", 2),
    ("iii", 3),
    ("iv", 4),
    ("v", 5),
    ("vi", 6),
    ("vii", 7),
    ("viii", 8),
    ("ix", 9),
    ("x", 10),
];

/// Era tag of a species, parsed from slugs such as `generation-iii`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u8);

impl Generation {
    pub fn new(value: u8) -> Option<Self> {
        (1..=10).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Parses the raw `generation.name` field of a species payload.
    pub fn from_slug_value(value: &Value) -> Result<Self, CatalogError> {
        match value {
            Value::String(slug) => slug.parse(),
            other => Err(CatalogError::UnexpectedSlugType(json_type_name(other).to_string())),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Generation {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let roman = value
            .split('-')
            .nth(1)
            .map(str::to_lowercase)
            .ok_or_else(|| CatalogError::InvalidGenerationSlug(value.to_string()))?;
        ROMAN_NUMERALS
            .iter()
            .find(|(numeral, _)| *numeral == roman)
            .map(|(_, number)| Self(*number))
            .ok_or_else(|| CatalogError::InvalidGenerationSlug(value.to_string()))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionFamily {
    pub id: i64,
    pub name: String,
}

/// A catalog species row.
///
/// `name` is the species name (`deoxys`), not the name of its default
/// variety (`deoxys-normal`), so it lines up with evolution chain names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Species {
    pub id: i64,
    pub name: String,
    pub type_1_id: i64,
    pub type_2_id: Option<i64>,
    pub evolution_family_id: Option<i64>,
    pub generation: Generation,
    pub image_url: Option<String>,
}

/// A form row as written by the upserter; `id` is assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForm {
    pub species_id: i64,
    pub form_name: String,
    pub type_1_id: i64,
    pub type_2_id: Option<i64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Form {
    pub id: i64,
    pub species_id: i64,
    pub form_name: String,
    pub type_1_id: i64,
    pub type_2_id: Option<i64>,
    pub image_url: Option<String>,
}
