mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pokedex_loader::cache::{CacheFilter, SpeciesCache, merge_entries};
use pokedex_loader::domain::{Form, Generation, NewForm, Species};
use pokedex_loader::ingest::{IngestOptions, IngestPolicy, Ingestor};
use pokedex_loader::store::Store;

use common::{NoopSink, starter_catalog};

fn species(id: i64, name: &str, generation: u8, types: (i64, Option<i64>)) -> Species {
    Species {
        id,
        name: name.to_string(),
        type_1_id: types.0,
        type_2_id: types.1,
        evolution_family_id: None,
        generation: Generation::new(generation).unwrap(),
        image_url: Some(format!("{id}.png")),
    }
}

fn form(id: i64, species_id: i64, name: &str, types: (i64, Option<i64>)) -> Form {
    Form {
        id,
        species_id,
        form_name: name.to_string(),
        type_1_id: types.0,
        type_2_id: types.1,
        image_url: None,
    }
}

/// Types: 1 grass, 2 poison, 3 fire, 4 flying, 5 water.
fn sample_entries() -> (Vec<Species>, Vec<Form>) {
    let species = vec![
        species(6, "charizard", 1, (3, Some(4))),
        species(1, "bulbasaur", 1, (1, Some(2))),
        species(906, "sprigatito", 9, (1, None)),
    ];
    let forms = vec![
        form(5, 6, "charizard-gmax", (3, Some(4))),
        form(3, 6, "charizard-mega-y", (3, Some(4))),
        form(4, 1, "bulbasaur-aqua", (5, Some(2))),
    ];
    (species, forms)
}

fn seeded_store() -> Arc<Store> {
    let store = Store::open_in_memory().unwrap();
    store.initialize().unwrap();
    for name in ["grass", "poison", "fire"] {
        store.insert_type(name).unwrap();
    }
    Arc::new(store)
}

#[test]
fn merge_orders_default_then_forms_by_id() {
    let (species, forms) = sample_entries();
    let entries = merge_entries(&species, &forms);

    let order = entries
        .iter()
        .map(|entry| (entry.species_id, entry.form_id))
        .collect::<Vec<_>>();
    assert_eq!(
        order,
        vec![
            (1, None),
            (1, Some(4)),
            (6, None),
            (6, Some(3)),
            (6, Some(5)),
            (906, None),
        ]
    );
    assert_eq!(entries[4].display_name, "charizard-gmax");
    assert_eq!(entries[4].generation.get(), 1);
    assert!(entries[2].is_default());
}

#[test]
fn type_filter_matches_either_slot() {
    let (species, forms) = sample_entries();
    let entries = merge_entries(&species, &forms);

    let poison = CacheFilter {
        type_ids: BTreeSet::from([2]),
        ..CacheFilter::default()
    };
    let names = entries
        .iter()
        .filter(|entry| poison.matches(entry))
        .map(|entry| entry.display_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["bulbasaur", "bulbasaur-aqua"]);

    let grass_or_water = CacheFilter {
        type_ids: BTreeSet::from([1, 5]),
        ..CacheFilter::default()
    };
    let names = entries
        .iter()
        .filter(|entry| grass_or_water.matches(entry))
        .map(|entry| entry.display_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["bulbasaur", "bulbasaur-aqua", "sprigatito"]);
}

#[test]
fn criteria_are_conjunctive() {
    let (species, forms) = sample_entries();
    let entries = merge_entries(&species, &forms);

    let filter = CacheFilter {
        type_ids: BTreeSet::from([1]),
        generations: BTreeSet::from([9]),
        name: String::new(),
    };
    let matched = entries
        .iter()
        .filter(|entry| filter.matches(entry))
        .collect::<Vec<_>>();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].species_id, 906);

    let filter = CacheFilter {
        generations: BTreeSet::from([1]),
        name: "MEGA".to_string(),
        ..CacheFilter::default()
    };
    let matched = entries
        .iter()
        .filter(|entry| filter.matches(entry))
        .collect::<Vec<_>>();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].form_id, Some(3));

    assert!(entries.iter().all(|entry| CacheFilter::default().matches(entry)));
}

#[test]
fn cache_is_memoized_after_first_load() {
    let store = seeded_store();
    store
        .insert_species(&species(1, "bulbasaur", 1, (1, Some(2))))
        .unwrap();
    let cache = SpeciesCache::new(Arc::clone(&store));
    assert!(!cache.is_loaded());

    let first = cache.load().unwrap();
    assert!(cache.is_loaded());
    assert_eq!(first.len(), 1);

    store
        .insert_species(&species(4, "charmander", 1, (3, None)))
        .unwrap();
    store
        .insert_form(&NewForm {
            species_id: 1,
            form_name: "bulbasaur-alt".to_string(),
            type_1_id: 1,
            type_2_id: None,
            image_url: None,
        })
        .unwrap();

    let second = cache.load().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.filter(&CacheFilter::default()).unwrap().len(), 1);

    let fresh = SpeciesCache::new(store);
    assert_eq!(fresh.load().unwrap().len(), 3);
}

#[test]
fn concurrent_first_loads_share_one_list() {
    let store = seeded_store();
    store
        .insert_species(&species(1, "bulbasaur", 1, (1, Some(2))))
        .unwrap();
    let cache = Arc::new(SpeciesCache::new(store));

    let handles = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.load().unwrap())
        })
        .collect::<Vec<_>>();
    let loaded = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();

    assert!(loaded.iter().all(|entries| Arc::ptr_eq(entries, &loaded[0])));
    assert_eq!(loaded[0].len(), 1);
}

#[test]
fn cache_reflects_ingested_catalog() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let ingestor = Ingestor::new(Arc::clone(&store), starter_catalog(), IngestPolicy::default());
    ingestor
        .run(
            &IngestOptions {
                delay: Duration::ZERO,
                ..IngestOptions::default()
            },
            &NoopSink,
        )
        .unwrap();

    let cache = SpeciesCache::new(Arc::clone(&store));
    let flying = store.type_id("flying").unwrap();
    let entries = cache
        .filter(&CacheFilter {
            type_ids: BTreeSet::from([flying]),
            ..CacheFilter::default()
        })
        .unwrap();
    let names = entries
        .iter()
        .map(|entry| entry.display_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["charizard", "charizard-gmax-alt"]);
    assert_eq!(entries[1].generation.get(), 1);
}
