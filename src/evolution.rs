//! Evolution chain linearization and family naming.

use serde::{Deserialize, Serialize};

/// One node of an upstream evolution chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub species_name: String,
    #[serde(default)]
    pub is_baby: bool,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

impl ChainLink {
    pub fn new(species_name: impl Into<String>, evolves_to: Vec<ChainLink>) -> Self {
        Self {
            species_name: species_name.into(),
            is_baby: false,
            evolves_to,
        }
    }

    /// Species names in depth-first, parent-before-children order.
    pub fn linearize(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut stack = vec![self];
        while let Some(link) = stack.pop() {
            names.push(link.species_name.as_str());
            // reversed so the first child subtree is visited before its siblings
            stack.extend(link.evolves_to.iter().rev());
        }
        names
    }
}

/// The species whose chain is being resolved.
#[derive(Debug, Clone, Copy)]
pub struct KnownSpecies<'a> {
    pub name: &'a str,
    pub is_baby: bool,
}

/// Picks the canonical family name for `known` within `root`'s chain.
///
/// A non-baby species that appears in its own chain names the family.
/// Baby forms, and species missing from the chain, fall back to the root.
pub fn resolve_family_name(root: &ChainLink, known: KnownSpecies<'_>) -> String {
    let names = root.linearize();
    if !known.is_baby && names.contains(&known.name) {
        return known.name.to_string();
    }
    names
        .first()
        .map(|name| name.to_string())
        .unwrap_or_else(|| root.species_name.clone())
}
