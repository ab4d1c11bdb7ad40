use std::{
    fmt::Display,
    io::{BufRead, Write},
    path::PathBuf,
};

use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::{
    config::{Config, config_path, load_config, save_config},
    dispatch::Dispatcher,
    models::registry::Registry,
    services::{
        areas::{
            CreateAreaParameters, DeleteAreaParameters, UpdateAreaError, UpdateAreaParameters,
            create_area, delete_area, list_areas, update_area,
        },
        floors::{
            CreateFloorParameters, DeleteFloorError, DeleteFloorParameters, UpdateFloorParameters,
            create_floor, delete_floor, list_floors, update_floor,
        },
        names::name_key,
    },
    storage::{Storage, json::JsonFileStorage, memory::MemoryStorage},
};

mod config;
mod dispatch;
mod models;
mod services;
mod storage;
mod ui;

#[derive(Parser)]
#[command(
    name = "roomwright",
    version,
    about = "Manage the areas and floors of your home"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer JSON requests from stdin, one per line
    Serve {
        /// Keep the registry in memory only
        #[arg(long)]
        in_memory: bool,
    },

    /// Manage areas
    #[command(subcommand)]
    Area(AreaCommands),

    /// Manage floors
    #[command(subcommand)]
    Floor(FloorCommands),

    /// Create the configuration entry
    Setup {
        /// Name of the home profile
        #[arg(long)]
        profile_name: Option<String>,

        /// Enable advanced mode
        #[arg(long)]
        advanced: bool,
    },

    /// Change the configuration entry
    Options {
        /// Name of the home profile
        #[arg(long)]
        profile_name: Option<String>,

        /// Enable or disable advanced mode
        #[arg(long)]
        advanced: Option<bool>,
    },
}

impl Commands {
    /// Whether the command reads the config file. An in-memory server needs no data dir.
    fn uses_config(&self) -> bool {
        !matches!(self, Commands::Serve { in_memory: true })
    }
}

#[derive(Debug, Subcommand)]
enum AreaCommands {
    /// List all areas grouped by floor
    List,

    /// Create a new area
    New {
        name: String,

        /// Icon identifier (e.g. mdi:sofa)
        #[arg(long)]
        icon: Option<String>,

        /// Floor id or name
        #[arg(short, long)]
        floor: Option<String>,

        /// Add a label (can be used multiple times)
        #[arg(short, long, action = ArgAction::Append)]
        label: Vec<String>,

        /// Add an alias (can be used multiple times)
        #[arg(short, long, action = ArgAction::Append)]
        alias: Vec<String>,
    },

    /// Update an area; omitted options are left unchanged
    Update {
        /// Area id or name
        area: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long, conflicts_with = "clear_icon")]
        icon: Option<String>,

        #[arg(long)]
        clear_icon: bool,

        /// Floor id or name
        #[arg(short, long, conflicts_with = "no_floor")]
        floor: Option<String>,

        /// Remove the area from its floor
        #[arg(long)]
        no_floor: bool,

        /// Replace the labels (can be used multiple times)
        #[arg(short, long, action = ArgAction::Append)]
        label: Vec<String>,

        #[arg(long, conflicts_with = "label")]
        clear_labels: bool,

        /// Replace the aliases (can be used multiple times)
        #[arg(short, long, action = ArgAction::Append)]
        alias: Vec<String>,

        #[arg(long, conflicts_with = "alias")]
        clear_aliases: bool,
    },

    /// Delete an area
    Delete {
        /// Area id or name
        area: String,
    },
}

#[derive(Debug, Subcommand)]
enum FloorCommands {
    /// List all floors by level
    List,

    /// Create a new floor
    New {
        name: String,

        #[arg(long)]
        icon: Option<String>,

        /// Vertical position, 0 for the ground floor
        #[arg(short, long, allow_negative_numbers = true)]
        level: Option<i32>,

        /// Add an alias (can be used multiple times)
        #[arg(short, long, action = ArgAction::Append)]
        alias: Vec<String>,
    },

    /// Update a floor; omitted options are left unchanged
    Update {
        /// Floor id or name
        floor: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(long, conflicts_with = "clear_icon")]
        icon: Option<String>,

        #[arg(long)]
        clear_icon: bool,

        #[arg(short, long, allow_negative_numbers = true, conflicts_with = "clear_level")]
        level: Option<i32>,

        #[arg(long)]
        clear_level: bool,

        /// Replace the aliases (can be used multiple times)
        #[arg(short, long, action = ArgAction::Append)]
        alias: Vec<String>,

        #[arg(long, conflicts_with = "alias")]
        clear_aliases: bool,
    },

    /// Delete a floor that no area uses
    Delete {
        /// Floor id or name
        floor: String,
    },
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

/// `None` when neither a replacement nor a clear was requested.
fn replacement<T>(values: Vec<String>, clear: bool) -> Option<T>
where
    T: FromIterator<String>,
{
    if clear || !values.is_empty() {
        Some(values.into_iter().collect())
    } else {
        None
    }
}

/// `Some(None)` clears, `Some(Some(v))` sets, `None` leaves the field alone.
fn nullable_option<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

/// Accept either an id or a (case-insensitive) name. Unknown input is
/// passed through so the service reports it.
fn resolve_area_ref(registry: &Registry, input: &str) -> String {
    if Uuid::parse_str(input).is_ok() {
        return input.to_string();
    }
    registry
        .get_areas()
        .find(|a| name_key(&a.name) == name_key(input))
        .map(|a| a.id.to_string())
        .unwrap_or_else(|| input.to_string())
}

fn resolve_floor_ref(registry: &Registry, input: &str) -> String {
    if Uuid::parse_str(input).is_ok() {
        return input.to_string();
    }
    registry
        .get_floors()
        .find(|f| name_key(&f.name) == name_key(input))
        .map(|f| f.floor_id.to_string())
        .unwrap_or_else(|| input.to_string())
}

fn print_available_areas(registry: &Registry) {
    let areas: Vec<_> = list_areas(registry).collect();
    if !areas.is_empty() {
        eprintln!("\nAvailable areas:");
        for area in areas {
            eprintln!("  - {} ({})", area.name, area.id);
        }
    }
}

fn print_available_floors(registry: &Registry) {
    let floors = ui::sorted_floors(registry);
    if !floors.is_empty() {
        eprintln!("\nAvailable floors:");
        for floor in floors {
            eprintln!("  - {} ({})", floor.name, floor.floor_id);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_file = config_path();
    let mut config = if cli.command.uses_config() {
        load_config(&config_file)
            .unwrap_or_else(|e| fail(format!("Failed to load configuration: {}", e)))
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Setup {
            profile_name,
            advanced,
        } => {
            let entry = config
                .setup(profile_name, advanced)
                .unwrap_or_else(|e| fail(e))
                .clone();
            save_config(&config_file, &config).unwrap_or_else(|e| fail(e));
            println!("✓ Configured profile '{}'", entry.profile_name);
            if entry.enable_advanced {
                println!("  Advanced mode enabled");
            }
        }
        Commands::Options {
            profile_name,
            advanced,
        } => {
            let entry = config
                .update_options(profile_name, advanced)
                .unwrap_or_else(|e| fail(e))
                .clone();
            save_config(&config_file, &config).unwrap_or_else(|e| fail(e));
            println!(
                "✓ Profile '{}', advanced mode {}",
                entry.profile_name,
                if entry.enable_advanced { "on" } else { "off" }
            );
        }
        Commands::Serve { in_memory: true } => serve(&MemoryStorage::new()),
        Commands::Serve { in_memory: false } => serve(&open_storage(&config)),
        Commands::Area(command) => {
            let storage = open_storage(&config);
            let mut registry = load_registry(&storage);
            run_area_command(command, &mut registry, &storage);
        }
        Commands::Floor(command) => {
            let storage = open_storage(&config);
            let mut registry = load_registry(&storage);
            run_floor_command(command, &mut registry, &storage);
        }
    }
}

fn open_storage(config: &Config) -> JsonFileStorage {
    let storage_path: PathBuf = config.registry_path();

    // Create parent directory if it doesn't exist
    if let Some(parent) = storage_path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| fail(format!("Failed to create data directory: {}", e)));
    }

    tracing::info!(path = %storage_path.display(), "using registry file");
    JsonFileStorage::new(storage_path)
}

fn load_registry(storage: &impl Storage) -> Registry {
    storage
        .load()
        .unwrap_or_else(|e| fail(format!("Failed to load registry: {}", e)))
}

fn serve(storage: &impl Storage) {
    let mut registry = load_registry(storage);
    let mut dispatcher = Dispatcher::new(&mut registry, storage);

    tracing::info!("serving requests on stdin");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in std::io::stdin().lock().lines() {
        let line = line.unwrap_or_else(|e| fail(format!("Failed to read request: {}", e)));
        if line.trim().is_empty() {
            continue;
        }

        let response = dispatcher.handle_line(&line);
        match serde_json::to_string(&response) {
            Ok(encoded) => {
                if let Err(e) = writeln!(out, "{}", encoded).and_then(|_| out.flush()) {
                    tracing::error!(error = %e, "failed to write response, stopping");
                    return;
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to encode response"),
        }
    }
}

fn run_area_command(command: AreaCommands, registry: &mut Registry, storage: &impl Storage) {
    match command {
        AreaCommands::List => {
            let count = list_areas(registry).count();
            if count == 0 {
                println!("No areas found");
            } else {
                ui::render_view_header("AREAS", count, "area");
                ui::render_areas_by_floor(registry);
            }
        }
        AreaCommands::New {
            name,
            icon,
            floor,
            label,
            alias,
        } => {
            let params = CreateAreaParameters {
                name,
                icon,
                floor_id: floor.map(|f| resolve_floor_ref(registry, &f)),
                labels: label.into_iter().collect(),
                aliases: alias.into_iter().collect(),
            };
            match create_area(registry, storage, params) {
                Ok(area) => {
                    println!("✓ Area {} created", area.name.bold());
                    println!("  {}", area.id.to_string().dimmed());
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    if matches!(e, services::areas::CreateAreaError::InvalidFloor(_)) {
                        print_available_floors(registry);
                    }
                    std::process::exit(1);
                }
            }
        }
        AreaCommands::Update {
            area,
            name,
            icon,
            clear_icon,
            floor,
            no_floor,
            label,
            clear_labels,
            alias,
            clear_aliases,
        } => {
            let params = UpdateAreaParameters {
                area_id: resolve_area_ref(registry, &area),
                name,
                icon: nullable_option(icon, clear_icon),
                floor_id: nullable_option(floor.map(|f| resolve_floor_ref(registry, &f)), no_floor),
                labels: replacement(label, clear_labels),
                aliases: replacement(alias, clear_aliases),
            };
            match update_area(registry, storage, params) {
                Ok(area) => println!("✓ Area updated: {}", area.name.bold()),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    match e {
                        UpdateAreaError::NotFound(_) => print_available_areas(registry),
                        UpdateAreaError::InvalidFloor(_) => print_available_floors(registry),
                        _ => {}
                    }
                    std::process::exit(1);
                }
            }
        }
        AreaCommands::Delete { area } => {
            let params = DeleteAreaParameters {
                area_id: resolve_area_ref(registry, &area),
            };
            match delete_area(registry, storage, params) {
                Ok(area) => println!("✓ Area deleted: {}", area.name),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    print_available_areas(registry);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn run_floor_command(command: FloorCommands, registry: &mut Registry, storage: &impl Storage) {
    match command {
        FloorCommands::List => {
            let count = list_floors(registry).count();
            if count == 0 {
                println!("No floors found");
            } else {
                ui::render_view_header("FLOORS", count, "floor");
                for floor in ui::sorted_floors(registry) {
                    let area_count = registry.get_areas_on_floor(floor.floor_id).count();
                    ui::render_floor_line(floor, area_count);
                }
            }
        }
        FloorCommands::New {
            name,
            icon,
            level,
            alias,
        } => {
            let params = CreateFloorParameters {
                name,
                icon,
                level,
                aliases: alias.into_iter().collect(),
            };
            match create_floor(registry, storage, params) {
                Ok(floor) => {
                    println!("✓ Floor {} created", floor.name.bold());
                    println!("  {}", floor.floor_id.to_string().dimmed());
                }
                Err(e) => fail(e),
            }
        }
        FloorCommands::Update {
            floor,
            name,
            icon,
            clear_icon,
            level,
            clear_level,
            alias,
            clear_aliases,
        } => {
            let params = UpdateFloorParameters {
                floor_id: resolve_floor_ref(registry, &floor),
                name,
                icon: nullable_option(icon, clear_icon),
                level: nullable_option(level, clear_level),
                aliases: replacement(alias, clear_aliases),
            };
            match update_floor(registry, storage, params) {
                Ok(floor) => println!("✓ Floor updated: {}", floor.name.bold()),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    print_available_floors(registry);
                    std::process::exit(1);
                }
            }
        }
        FloorCommands::Delete { floor } => {
            let params = DeleteFloorParameters {
                floor_id: resolve_floor_ref(registry, &floor),
            };
            match delete_floor(registry, storage, params) {
                Ok(floor) => println!("✓ Floor deleted: {}", floor.name),
                Err(DeleteFloorError::FloorInUse { name, area_count }) => {
                    eprintln!(
                        "Error: Floor '{}' is still assigned to {} area(s)",
                        name, area_count
                    );
                    eprintln!("\nMove or delete these areas first:");
                    if let Ok(floor_id) = Uuid::parse_str(&resolve_floor_ref(registry, &floor)) {
                        for area in registry.get_areas_on_floor(floor_id) {
                            eprintln!("  - {}", area.name);
                        }
                    }
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    if matches!(e, DeleteFloorError::NotFound(_)) {
                        print_available_floors(registry);
                    }
                    std::process::exit(1);
                }
            }
        }
    }
}
