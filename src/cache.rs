//! Read-through merge of species and form rows for faceted filtering.
//!
//! The merged list is loaded once per [`SpeciesCache`] and never refreshed.
//! Ingestion runs against the same database while a process holds a loaded
//! cache are not visible until that process restarts.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::domain::{Form, Generation, Species};
use crate::error::CatalogError;
use crate::store::Store;

/// One filterable appearance: a species' default look or one of its forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub species_id: i64,
    pub display_name: String,
    /// `None` for the species' default appearance.
    pub form_id: Option<i64>,
    pub type_1_id: i64,
    pub type_2_id: Option<i64>,
    pub image_url: Option<String>,
    pub generation: Generation,
}

impl CacheEntry {
    pub fn is_default(&self) -> bool {
        self.form_id.is_none()
    }

    pub fn has_type(&self, type_id: i64) -> bool {
        self.type_1_id == type_id || self.type_2_id == Some(type_id)
    }
}

/// Conjunctive filter; an empty criterion matches everything.
#[derive(Debug, Clone, Default)]
pub struct CacheFilter {
    pub type_ids: BTreeSet<i64>,
    pub generations: BTreeSet<u8>,
    pub name: String,
}

impl CacheFilter {
    pub fn matches(&self, entry: &CacheEntry) -> bool {
        let type_ok = self.type_ids.is_empty()
            || self.type_ids.contains(&entry.type_1_id)
            || entry
                .type_2_id
                .is_some_and(|type_id| self.type_ids.contains(&type_id));
        let generation_ok =
            self.generations.is_empty() || self.generations.contains(&entry.generation.get());
        let name_ok = self.name.is_empty()
            || entry
                .display_name
                .to_lowercase()
                .contains(&self.name.to_lowercase());
        type_ok && generation_ok && name_ok
    }
}

/// Merges species and forms into the cache ordering: species id ascending,
/// default entry first, then forms by id ascending.
pub fn merge_entries(species: &[Species], forms: &[Form]) -> Vec<CacheEntry> {
    let mut by_species: HashMap<i64, Vec<&Form>> = HashMap::new();
    for form in forms {
        by_species.entry(form.species_id).or_default().push(form);
    }

    let mut merged = species
        .iter()
        .flat_map(|species| {
            let default = CacheEntry {
                species_id: species.id,
                display_name: species.name.clone(),
                form_id: None,
                type_1_id: species.type_1_id,
                type_2_id: species.type_2_id,
                image_url: species.image_url.clone(),
                generation: species.generation,
            };
            let alternates = by_species
                .get(&species.id)
                .into_iter()
                .flatten()
                .map(move |form| CacheEntry {
                    species_id: species.id,
                    display_name: form.form_name.clone(),
                    form_id: Some(form.id),
                    type_1_id: form.type_1_id,
                    type_2_id: form.type_2_id,
                    image_url: form.image_url.clone(),
                    generation: species.generation,
                });
            std::iter::once(default).chain(alternates)
        })
        .collect::<Vec<_>>();

    // None sorts before Some, which puts the default entry first.
    merged.sort_by_key(|entry| (entry.species_id, entry.form_id));
    merged
}

pub struct SpeciesCache {
    store: Arc<Store>,
    entries: Mutex<Option<Arc<[CacheEntry]>>>,
}

impl SpeciesCache {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            entries: Mutex::new(None),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    /// Returns the memoized list, reading storage only on first use.
    ///
    /// The lock is held across the check and the read so concurrent first
    /// callers trigger a single load. A failed load leaves the cache empty.
    pub fn load(&self) -> Result<Arc<[CacheEntry]>, CatalogError> {
        let mut guard = self.lock();
        if let Some(entries) = guard.as_ref() {
            return Ok(Arc::clone(entries));
        }
        let species = self.store.all_species()?;
        let forms = self.store.all_forms()?;
        let entries: Arc<[CacheEntry]> = merge_entries(&species, &forms).into();
        tracing::info!(
            species = species.len(),
            forms = forms.len(),
            entries = entries.len(),
            "species cache loaded"
        );
        *guard = Some(Arc::clone(&entries));
        Ok(entries)
    }

    pub fn filter(&self, filter: &CacheFilter) -> Result<Vec<CacheEntry>, CatalogError> {
        let entries = self.load()?;
        Ok(entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<[CacheEntry]>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
