//! Command-line front end for the kinship core.
//!
//! # Responsibility
//! - Load config, open the database and dispatch one read-mostly command.
//! - Print results as JSON on stdout; errors go to stderr with exit code 1.

use clap::{Args, Parser, Subcommand};
use kinship_core::{
    core_version, init_logging_from_config, open_db, BulkSelection, GraphService, KinshipConfig,
    OrphanService, PersonGraph, PersonService, RelationshipTypeService, SqliteRepository,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kinship_cli", about = "Inspect a kinship relationship graph")]
struct Cli {
    /// SQLite database file; overrides `storage.db_path`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display version information
    Version,

    /// Project the 1.5-hop graph around one person
    Graph(PersonArgs),

    /// List people orphaned by deleting one person
    Orphans(PersonArgs),

    /// List people orphaned by deleting several people
    BulkOrphans(BulkArgs),

    /// Create the starter relationship types for a user
    SeedTypes(UserArgs),

    /// Restore a deleted person within the retention window
    Restore(PersonArgs),
}

#[derive(Args)]
struct UserArgs {
    /// Account owner id
    #[arg(long)]
    user: Uuid,
}

#[derive(Args)]
struct PersonArgs {
    /// Account owner id
    #[arg(long)]
    user: Uuid,

    /// Person id
    #[arg(long)]
    person: Uuid,
}

#[derive(Args)]
struct BulkArgs {
    /// Account owner id
    #[arg(long)]
    user: Uuid,

    /// Person ids to delete (repeatable)
    #[arg(long = "person", required_unless_present = "all")]
    people: Vec<Uuid>,

    /// Select every active person of the user
    #[arg(long, conflicts_with = "people")]
    all: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Commands::Version = cli.command {
        println!("kinship_core version={}", core_version());
        return Ok(());
    }

    let mut config = match cli.config.as_deref() {
        Some(path) => KinshipConfig::load(path)?,
        None => KinshipConfig::default(),
    };
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }
    init_logging_from_config(&config.logging)?;

    let conn = open_db(&config.storage.db_path)?;
    let store = SqliteRepository::try_new(&conn)?;

    match cli.command {
        Commands::Version => {}
        Commands::Graph(args) => {
            let graph = GraphService::new(store).person_graph(args.user, args.person)?;
            print_json(&with_default_colors(graph, &config.types.default_color))?;
        }
        Commands::Orphans(args) => {
            let orphans = OrphanService::new(store).orphans_for_person(args.user, args.person)?;
            print_json(&orphans)?;
        }
        Commands::BulkOrphans(args) => {
            let selection = if args.all {
                BulkSelection::All
            } else {
                BulkSelection::People(args.people)
            };
            let orphans = OrphanService::new(store).orphans_for_bulk_delete(args.user, &selection)?;
            print_json(&orphans)?;
        }
        Commands::SeedTypes(args) => {
            let service = RelationshipTypeService::new(store);
            let types = if config.types.seed_defaults {
                service.seed_default_types(args.user)?
            } else {
                info!("event=cli_seed_types module=cli status=skipped reason=disabled");
                service.list_types(args.user)?
            };
            print_json(&types)?;
        }
        Commands::Restore(args) => {
            let person = PersonService::new(store)
                .with_restore_window_days(config.retention.restore_window_days)
                .restore_person(args.user, args.person)?;
            print_json(&person.summary())?;
        }
    }
    Ok(())
}

/// Fills edges without a type color with the configured neutral color.
fn with_default_colors(mut graph: PersonGraph, default_color: &str) -> PersonGraph {
    for edge in graph.edges.iter_mut().filter(|edge| edge.color.is_none()) {
        edge.color = Some(default_color.to_string());
    }
    graph
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
