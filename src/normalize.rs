//! Maps raw catalog payloads onto catalog rows and writes them with
//! insert-if-absent semantics.

use serde::Serialize;

use crate::admission::AdmissionFilter;
use crate::domain::{EvolutionFamily, Generation, NewForm, Species};
use crate::error::{CatalogError, ErrorKind};
use crate::evolution::{KnownSpecies, resolve_family_name};
use crate::pokeapi::{CatalogSource, SpeciesDetail, VariantDetail, evolution_chain_id};
use crate::remediation::RemediationTable;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesUpsert {
    pub species_id: i64,
    pub generation: Generation,
    pub evolution_family_id: Option<i64>,
    /// False when the species already existed and was left untouched.
    pub inserted: bool,
    /// Set when lineage resolution failed and the species was written
    /// without a family.
    pub lineage_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FormOutcome {
    Inserted {
        name: String,
    },
    Existing {
        name: String,
    },
    Skipped {
        name: String,
        reason: String,
    },
    Failed {
        name: String,
        kind: ErrorKind,
        error: String,
    },
}

impl FormOutcome {
    pub fn name(&self) -> &str {
        match self {
            FormOutcome::Inserted { name }
            | FormOutcome::Existing { name }
            | FormOutcome::Skipped { name, .. }
            | FormOutcome::Failed { name, .. } => name,
        }
    }
}

pub struct Normalizer<'a, C: CatalogSource> {
    source: &'a C,
    store: &'a Store,
    admission: &'a AdmissionFilter,
    remediations: &'a RemediationTable,
    track_lineage: bool,
}

impl<'a, C: CatalogSource> Normalizer<'a, C> {
    pub fn new(
        source: &'a C,
        store: &'a Store,
        admission: &'a AdmissionFilter,
        remediations: &'a RemediationTable,
        track_lineage: bool,
    ) -> Self {
        Self {
            source,
            store,
            admission,
            remediations,
            track_lineage,
        }
    }

    pub fn upsert_species(&self, detail: &SpeciesDetail) -> Result<SpeciesUpsert, CatalogError> {
        let generation = Generation::from_slug_value(&detail.generation_slug)?;
        let default = detail
            .default_variety()
            .ok_or_else(|| CatalogError::MissingDefaultVariety(detail.name.clone()))?;
        let variant = self.source.variant_detail(&default.name)?;

        let (evolution_family_id, lineage_error) = if self.track_lineage {
            match self.resolve_family(detail) {
                Ok(family_id) => (family_id, None),
                Err(err) => {
                    tracing::warn!(
                        species = %detail.name,
                        error = %err,
                        "evolution family unresolved, continuing without lineage"
                    );
                    (None, Some(err.to_string()))
                }
            }
        } else {
            (None, None)
        };

        let (type_1_id, type_2_id) = self.resolve_types(&variant.types)?;
        let image_url = self.image_for(&variant)?;
        let species = Species {
            id: detail.id,
            name: detail.name.clone(),
            type_1_id,
            type_2_id,
            evolution_family_id,
            generation,
            image_url,
        };
        let inserted = self.store.insert_species(&species)?;
        if inserted {
            tracing::info!(species = %species.name, id = species.id, "inserted species");
        } else {
            tracing::debug!(species = %species.name, id = species.id, "species already present");
        }

        Ok(SpeciesUpsert {
            species_id: species.id,
            generation,
            evolution_family_id,
            inserted,
            lineage_error,
        })
    }

    /// Writes every admitted non-default variety of `detail`.
    ///
    /// Failures are isolated per form; the species itself is unaffected.
    pub fn populate_forms(&self, species_id: i64, detail: &SpeciesDetail) -> Vec<FormOutcome> {
        detail
            .alternate_varieties()
            .map(|variety| match self.upsert_form(species_id, &variety.name) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(
                        species = %detail.name,
                        form = %variety.name,
                        error = %err,
                        "failed to populate form"
                    );
                    FormOutcome::Failed {
                        name: variety.name.clone(),
                        kind: err.kind(),
                        error: err.to_string(),
                    }
                }
            })
            .collect()
    }

    fn upsert_form(&self, species_id: i64, variety: &str) -> Result<FormOutcome, CatalogError> {
        let variant = self.source.variant_detail(variety)?;
        let admission = self.admission.admit(&variant);
        if let Some(reason) = admission.reason() {
            tracing::info!(form = %variant.name, %reason, "skipping form");
            return Ok(FormOutcome::Skipped {
                name: variant.name,
                reason,
            });
        }

        let (type_1_id, type_2_id) = self.resolve_types(&variant.types)?;
        let form = NewForm {
            species_id,
            form_name: variant.name.clone(),
            type_1_id,
            type_2_id,
            image_url: self.image_for(&variant)?,
        };
        if self.store.insert_form(&form)? {
            tracing::info!(form = %form.form_name, species_id, "inserted form");
            Ok(FormOutcome::Inserted {
                name: form.form_name,
            })
        } else {
            Ok(FormOutcome::Existing {
                name: form.form_name,
            })
        }
    }

    fn resolve_family(&self, detail: &SpeciesDetail) -> Result<Option<i64>, CatalogError> {
        let Some(url) = detail.evolution_chain_url.as_deref() else {
            return Ok(None);
        };
        let chain_id = evolution_chain_id(url)?;
        if self.store.evolution_family(chain_id)?.is_some() {
            return Ok(Some(chain_id));
        }

        let chain = self.source.evolution_chain(chain_id)?;
        let name = resolve_family_name(
            &chain.root,
            KnownSpecies {
                name: &detail.name,
                is_baby: detail.is_baby,
            },
        );
        self.store.insert_evolution_family(&EvolutionFamily {
            id: chain_id,
            name,
        })?;
        Ok(Some(chain_id))
    }

    fn resolve_types(&self, types: &[String]) -> Result<(i64, Option<i64>), CatalogError> {
        let primary = types
            .first()
            .ok_or_else(|| CatalogError::MalformedPayload("variant has no types".to_string()))?;
        let type_1_id = self.store.type_id(primary)?;
        let type_2_id = types
            .get(1)
            .map(|name| self.store.type_id(name))
            .transpose()?;
        Ok((type_1_id, type_2_id))
    }

    fn image_for(&self, variant: &VariantDetail) -> Result<Option<String>, CatalogError> {
        if variant.image_url.is_some() {
            return Ok(variant.image_url.clone());
        }
        match self.remediations.image_donor(&variant.name) {
            Some(donor) => {
                tracing::info!(form = %variant.name, donor, "borrowing image from donor variant");
                Ok(self.source.variant_detail(donor)?.image_url)
            }
            None => Ok(None),
        }
    }
}
