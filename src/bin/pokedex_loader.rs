use std::collections::BTreeSet;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use pokedex_loader::cache::{CacheFilter, SpeciesCache};
use pokedex_loader::config::{ConfigLoader, ResolvedConfig};
use pokedex_loader::error::{CatalogError, ErrorKind};
use pokedex_loader::ingest::{IngestOptions, Ingestor, ItemOutcome, RunReport};
use pokedex_loader::output::{JsonOutput, TracingSink};
use pokedex_loader::pokeapi::PokeApiHttpClient;
use pokedex_loader::store::Store;

#[derive(Parser)]
#[command(name = "pokedex-loader")]
#[command(about = "Ingest PokeAPI species into a local SQLite catalog and query it")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create the catalog schema")]
    Init,
    #[command(about = "Ingest species, forms and evolution families")]
    Ingest(IngestArgs),
    #[command(about = "Filter the species cache")]
    Query(QueryArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Wipe all ingestion-owned tables before seeding.
    #[arg(long)]
    truncate: bool,

    /// Confirm --truncate.
    #[arg(long)]
    yes: bool,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    no_lineage: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long = "type")]
    types: Vec<String>,

    #[arg(long = "generation")]
    generations: Vec<u8>,

    #[arg(long, default_value = "")]
    name: String,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    match error.kind() {
        ErrorKind::Config => 2,
        ErrorKind::SourceFetch => 3,
        ErrorKind::Storage => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database.into();
    }
    let store = Arc::new(Store::open(config.database.as_std_path())?);

    match cli.command {
        Commands::Init => {
            store.initialize()?;
            println!("initialized {}", config.database);
            Ok(())
        }
        Commands::Ingest(args) => run_ingest(args, config, store),
        Commands::Query(args) => run_query(args, store),
    }
}

fn run_ingest(args: IngestArgs, mut config: ResolvedConfig, store: Arc<Store>) -> miette::Result<()> {
    if args.no_lineage {
        config.track_lineage = false;
    }
    let source = PokeApiHttpClient::new(&config.source.base_url, config.source.timeout)?;
    let ingestor = Ingestor::new(store, source, config.policy());
    let options = IngestOptions {
        truncate: args.truncate,
        confirmed: args.yes,
        limit: args.limit.unwrap_or(config.source.species_limit),
        delay: config.source.request_delay,
        progress_every: config.progress_every,
        ..IngestOptions::default()
    };

    if args.json {
        let report = ingestor.run(&options, &JsonOutput)?;
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        let report = ingestor.run(&options, &TracingSink)?;
        print_summary(&report);
    }
    println!("note: running processes keep their loaded species cache until restart");
    Ok(())
}

fn run_query(args: QueryArgs, store: Arc<Store>) -> miette::Result<()> {
    store.initialize()?;
    let type_ids = args
        .types
        .iter()
        .map(|name| store.type_id(name))
        .collect::<Result<BTreeSet<_>, _>>()?;
    let filter = CacheFilter {
        type_ids,
        generations: args.generations.into_iter().collect(),
        name: args.name,
    };

    let cache = SpeciesCache::new(store);
    let entries = cache.filter(&filter)?;
    if args.json {
        JsonOutput::print_entries(&entries).into_diagnostic()?;
        return Ok(());
    }
    for entry in &entries {
        let form = entry
            .form_id
            .map(|id| format!("form {id}"))
            .unwrap_or_else(|| "default".to_string());
        println!(
            "#{:<5} {:<32} gen {:<2} {}",
            entry.species_id,
            entry.display_name,
            entry.generation.get(),
            form
        );
    }
    println!("{} entries", entries.len());
    Ok(())
}

fn print_summary(report: &RunReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}pokedex-loader summary{reset}");
    if report.cancelled {
        println!("{yellow}run cancelled before all species were processed{reset}");
    }
    println!(
        "{green}species: {} succeeded, {} skipped, {} failed (of {}){reset}",
        report.succeeded, report.skipped, report.failed, report.species_total
    );
    println!(
        "{green}forms: {} inserted, {} existing, {} skipped, {} failed{reset}",
        report.forms_inserted, report.forms_existing, report.forms_skipped, report.forms_failed
    );

    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Skipped { reason } => {
                println!("{yellow}skipped {}: {reason}{reset}", item.name);
            }
            ItemOutcome::Failed { error, .. } => {
                println!("{red}failed {}: {error}{reset}", item.name);
            }
            ItemOutcome::Succeeded { .. } => {}
        }
        if let Some(error) = &item.lineage_error {
            println!("{yellow}no family for {}: {error}{reset}", item.name);
        }
    }
    println!(
        "{cyan}rows: {} species, {} forms, {} evolution families, {} types, {} natures{reset}",
        report.counts.species,
        report.counts.forms,
        report.counts.evolution_families,
        report.counts.types,
        report.counts.natures
    );
}
