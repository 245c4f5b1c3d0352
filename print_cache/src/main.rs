//! Print Cache - Scryfall bulk-data maintenance and lookup CLI
//!
//! Refreshes the local Scryfall bulk files and answers print, oracle, rulings
//! and set queries against them. Results are printed as JSON.

use clap::{Parser, Subcommand};
use print_cache::{BulkClient, CacheConfig, PrintCache};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

/// MTG print cache - downloads Scryfall bulk data and resolves prints
#[derive(Parser, Debug)]
#[command(name = "print_cache")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the bulk files (default: $SCRYFALL_DATA_DIR or ~/.local/share/print_cache)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Path to the default_cards bulk file
    #[arg(long)]
    prints: Option<PathBuf>,

    /// Path to the rulings bulk file
    #[arg(long)]
    rulings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a bulk dataset if it changed and load it
    Refresh {
        /// Bulk dataset type
        #[arg(long, default_value = "default_cards")]
        kind: String,

        /// Ignore the stored ETag and download unconditionally
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Show the state of the bulk files and indexes
    Stats,
    /// Resolve a print by set code and collector number
    Lookup {
        set: String,
        number: String,

        /// Card name used as a fallback and tie-breaker
        #[arg(long)]
        name: Option<String>,

        /// Ask the Scryfall API when the local data has no match
        #[arg(long, default_value_t = false)]
        live: bool,
    },
    /// Resolve a card name to its oracle id and list its prints
    Oracle { name: String },
    /// Search print names
    Search {
        query: String,

        /// Restrict to one set code
        #[arg(long)]
        set: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Show rulings for an oracle id
    Rulings { oracle_id: String },
    /// List set codes with names and release dates
    Sets,
    /// Show image samples for a set
    Samples {
        code: String,

        #[arg(long, default_value_t = print_cache::set_meta::DEFAULT_IMAGE_SAMPLES)]
        count: usize,
    },
    /// Show colour and curve profiles for sets
    Profile {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Delete cached bulk files and drop the in-memory indexes
    Clear {
        /// Also delete the default_cards file
        #[arg(long, default_value_t = false)]
        include_prints: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args);
    log::debug!("Data directory: {}", config.data_dir().display());

    let cache = PrintCache::new(config);

    match args.command {
        Command::Refresh { kind, force } => {
            let client = build_client(&cache);
            match cache.refresh_dataset(&client, &kind, force).await {
                Ok(report) => print_json(&report),
                Err(e) => {
                    log::error!("Failed to refresh {}: {}", kind, e);
                    std::process::exit(1);
                }
            }
        }
        Command::Stats => {
            cache.ensure_loaded(false);
            cache.load_rulings(None);
            print_json(&cache.cache_stats());
        }
        Command::Lookup {
            set,
            number,
            name,
            live,
        } => {
            if !live {
                require_loaded(&cache);
            } else if !cache.ensure_loaded(false) {
                log::warn!("No local print data, asking Scryfall directly");
            }
            if let Some(bundle) = cache.resolve_print_bundle(&set, &number, name.as_deref()) {
                print_json(&bundle);
                return;
            }
            let live_print = if live {
                build_client(&cache)
                    .fetch_live_print(&set, &number, name.as_deref())
                    .await
            } else {
                None
            };
            match live_print {
                Some(print) => print_json(&print),
                None => {
                    log::error!("No print found for {} #{}", set, number);
                    std::process::exit(1);
                }
            }
        }
        Command::Oracle { name } => {
            require_loaded(&cache);
            let Some(oracle_id) = cache.unique_oracle_id_by_name(&name) else {
                log::error!("No card named {:?}", name);
                std::process::exit(1);
            };
            let prints: Vec<_> = cache
                .prints_for_oracle(&oracle_id)
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "set": p.set_code,
                        "collector_number": p.collector_number,
                        "name": p.display_name(),
                    })
                })
                .collect();
            print_json(&json!({ "name": name, "oracle_id": oracle_id, "prints": prints }));
        }
        Command::Search {
            query,
            set,
            limit,
            offset,
        } => {
            require_loaded(&cache);
            let (page, total) = cache.search_prints(Some(&query), set.as_deref(), limit, offset);
            print_json(&json!({ "total": total, "offset": offset, "prints": page }));
        }
        Command::Rulings { oracle_id } => {
            print_json(&cache.rulings_for(&oracle_id));
        }
        Command::Sets => {
            require_loaded(&cache);
            let sets: Vec<_> = cache
                .all_set_codes()
                .into_iter()
                .map(|code| {
                    json!({
                        "name": cache.set_display_name(&code),
                        "released_at": cache.set_release_date(&code),
                        "code": code,
                    })
                })
                .collect();
            print_json(&sets);
        }
        Command::Samples { code, count } => {
            require_loaded(&cache);
            print_json(&cache.set_image_samples(&code, count));
        }
        Command::Profile { codes } => {
            require_loaded(&cache);
            print_json(&cache.set_profiles(&codes[..]));
        }
        Command::Clear { include_prints } => {
            let removed = cache.clear_cache_files(include_prints);
            log::info!("Removed {} cache file(s)", removed);
            print_json(&json!({ "removed": removed }));
        }
    }
}

/// Environment configuration with command-line overrides applied
fn build_config(args: &Args) -> CacheConfig {
    let mut config = match &args.data_dir {
        Some(dir) => CacheConfig {
            http: print_cache::HttpConfig::from_env(),
            ..CacheConfig::with_data_dir(dir)
        },
        None => CacheConfig::from_env(),
    };
    if let Some(prints) = &args.prints {
        config.prints_path = prints.clone();
    }
    if let Some(rulings) = &args.rulings {
        config.rulings_path = rulings.clone();
    }
    config
}

fn build_client(cache: &PrintCache) -> BulkClient {
    match BulkClient::new(cache.config().http.clone()) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    }
}

fn require_loaded(cache: &PrintCache) {
    if !cache.ensure_loaded(false) {
        log::error!(
            "No print data at {} (run `print_cache refresh` first)",
            cache.config().prints_path.display()
        );
        std::process::exit(1);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            log::error!("Failed to serialize output: {}", e);
            std::process::exit(1);
        }
    }
}
