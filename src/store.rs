use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::domain::{EvolutionFamily, Form, Generation, NewForm, Species, TypeRow};
use crate::error::CatalogError;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS natures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- id is the upstream evolution chain id
CREATE TABLE IF NOT EXISTS evolution_families (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

-- id is the upstream species id
CREATE TABLE IF NOT EXISTS pokemon_species (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    type_1_id INTEGER NOT NULL REFERENCES types(id),
    type_2_id INTEGER REFERENCES types(id),
    evolution_family_id INTEGER REFERENCES evolution_families(id),
    generation INTEGER NOT NULL,
    image_url TEXT
);

CREATE TABLE IF NOT EXISTS forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    species_id INTEGER NOT NULL REFERENCES pokemon_species(id) ON DELETE CASCADE,
    form_name TEXT NOT NULL,
    type_1_id INTEGER NOT NULL REFERENCES types(id),
    type_2_id INTEGER REFERENCES types(id),
    image_url TEXT,
    UNIQUE(species_id, form_name)
);
"#;

const TRUNCATE: &str = r#"
BEGIN;
DELETE FROM forms;
DELETE FROM pokemon_species;
DELETE FROM evolution_families;
DELETE FROM types;
DELETE FROM natures;
DELETE FROM sqlite_sequence WHERE name IN ('forms', 'types', 'natures');
COMMIT;
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub types: i64,
    pub natures: i64,
    pub evolution_families: i64,
    pub species: i64,
    pub forms: i64,
}

/// SQLite catalog owned by the ingestion pipeline.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, CatalogError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CatalogError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn initialize(&self) -> Result<(), CatalogError> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Empties every ingestion-owned table and resets generated ids.
    pub fn truncate(&self) -> Result<(), CatalogError> {
        let conn = self.conn();
        if let Err(err) = conn.execute_batch(TRUNCATE) {
            let _ = conn.execute_batch("ROLLBACK;");
            return Err(err.into());
        }
        Ok(())
    }

    pub fn insert_type(&self, name: &str) -> Result<bool, CatalogError> {
        let changed = self.conn().execute(
            "INSERT INTO types (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
            params![name.to_lowercase()],
        )?;
        Ok(changed > 0)
    }

    pub fn type_id(&self, name: &str) -> Result<i64, CatalogError> {
        let normalized = name.to_lowercase();
        self.conn()
            .query_row(
                "SELECT id FROM types WHERE name = ?1",
                params![normalized],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| CatalogError::UnknownType(normalized.clone()))
    }

    pub fn all_types(&self) -> Result<Vec<TypeRow>, CatalogError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM types ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(TypeRow {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert_nature(&self, name: &str) -> Result<bool, CatalogError> {
        let changed = self.conn().execute(
            "INSERT INTO natures (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
            params![name.to_lowercase()],
        )?;
        Ok(changed > 0)
    }

    pub fn insert_evolution_family(&self, family: &EvolutionFamily) -> Result<bool, CatalogError> {
        let changed = self.conn().execute(
            "INSERT INTO evolution_families (id, name) VALUES (?1, ?2)
             ON CONFLICT (id) DO NOTHING",
            params![family.id, family.name],
        )?;
        Ok(changed > 0)
    }

    pub fn evolution_family(&self, id: i64) -> Result<Option<EvolutionFamily>, CatalogError> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, name FROM evolution_families WHERE id = ?1",
                params![id],
                |row| {
                    Ok(EvolutionFamily {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    /// Inserts the species unless a row with the same id already exists.
    pub fn insert_species(&self, species: &Species) -> Result<bool, CatalogError> {
        let changed = self.conn().execute(
            "INSERT INTO pokemon_species
             (id, name, type_1_id, type_2_id, evolution_family_id, generation, image_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (id) DO NOTHING",
            params![
                species.id,
                species.name,
                species.type_1_id,
                species.type_2_id,
                species.evolution_family_id,
                species.generation.get(),
                species.image_url,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn insert_form(&self, form: &NewForm) -> Result<bool, CatalogError> {
        let changed = self.conn().execute(
            "INSERT INTO forms (species_id, form_name, type_1_id, type_2_id, image_url)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (species_id, form_name) DO NOTHING",
            params![
                form.species_id,
                form.form_name,
                form.type_1_id,
                form.type_2_id,
                form.image_url,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn all_species(&self) -> Result<Vec<Species>, CatalogError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, type_1_id, type_2_id, evolution_family_id, generation, image_url
             FROM pokemon_species ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let generation: u8 = row.get(5)?;
            Ok(Species {
                id: row.get(0)?,
                name: row.get(1)?,
                type_1_id: row.get(2)?,
                type_2_id: row.get(3)?,
                evolution_family_id: row.get(4)?,
                generation: Generation::new(generation).ok_or(
                    rusqlite::Error::IntegralValueOutOfRange(5, i64::from(generation)),
                )?,
                image_url: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn all_forms(&self) -> Result<Vec<Form>, CatalogError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, species_id, form_name, type_1_id, type_2_id, image_url
             FROM forms ORDER BY species_id, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Form {
                id: row.get(0)?,
                species_id: row.get(1)?,
                form_name: row.get(2)?,
                type_1_id: row.get(3)?,
                type_2_id: row.get(4)?,
                image_url: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn counts(&self) -> Result<TableCounts, CatalogError> {
        let conn = self.conn();
        let count = |table: &str| -> Result<i64, CatalogError> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
        };
        Ok(TableCounts {
            types: count("types")?,
            natures: count("natures")?,
            evolution_families: count("evolution_families")?,
            species: count("pokemon_species")?,
            forms: count("forms")?,
        })
    }
}
