use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use where_to_watch::{
    Availability, FileStore, MediaKind, Offer, Preferences, ProgressEvent, Quality, REGIONS,
    Resolution, SERVICES, ServiceId, check_availability, clear_history, clear_preferences,
    export_saved, import_saved, load_preferences, push_history, recent_searches, remove_saved,
    save_preferences, saved_items, toggle_saved,
};

#[derive(Parser)]
#[command(
    name = "where-to-watch",
    version,
    about = "Find out where a movie or TV show streams across your subscriptions and region"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a title and check availability on your services
    Search {
        /// The movie or TV show title to look up
        query: String,

        /// Region code override (e.g. US, CA, UK)
        #[arg(long)]
        region: Option<String>,

        /// Comma-separated service overrides
        /// (netflix, prime, disney, hulu, appletv, max)
        #[arg(long, value_delimiter = ',')]
        services: Option<Vec<String>>,

        /// TMDB API read token override
        #[arg(long)]
        token: Option<String>,

        /// Print the resolution as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show or edit region, subscriptions and credential
    Prefs {
        #[command(subcommand)]
        action: Option<PrefsAction>,
    },

    /// Manage saved titles
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },

    /// Show recent searches
    History {
        /// Clear the search history
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Print the current preferences
    Show,
    /// Edit preferences interactively
    Edit,
    /// Reset preferences to defaults
    Clear,
}

#[derive(Subcommand)]
enum SavedAction {
    /// List saved titles
    List,
    /// Save a title, or remove it if already saved
    Toggle {
        id: u64,
        #[arg(value_parser = parse_kind)]
        kind: MediaKind,
        title: String,
        #[arg(long)]
        year: Option<u16>,
    },
    /// Remove a saved title
    Remove {
        id: u64,
        #[arg(value_parser = parse_kind)]
        kind: MediaKind,
    },
    /// Write the saved list to a backup file
    Export {
        #[arg(default_value = "where-to-watch-backup.json")]
        path: PathBuf,
    },
    /// Merge a backup file into the saved list
    Import { path: PathBuf },
}

fn parse_kind(s: &str) -> Result<MediaKind, String> {
    match s {
        "movie" => Ok(MediaKind::Movie),
        "tv" => Ok(MediaKind::Series),
        _ => Err(format!("unknown kind '{s}', expected 'movie' or 'tv'")),
    }
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Searching { query } => {
            println!("Searching for '{query}'...");
        }
        ProgressEvent::NoResults => {
            println!("No results found.");
        }
        ProgressEvent::PrimarySelected { title, kind } => {
            println!("Top match: {} ({})", title, kind.label());
        }
        ProgressEvent::CheckingProviders { .. } => {
            println!("  Checking providers...");
        }
        ProgressEvent::DirectHit { service_count } => {
            println!("  Streaming on {service_count} of your service(s)!");
        }
        ProgressEvent::AlternativeMatched { title } => {
            println!("  Found an alternative on your services: {title}");
        }
        ProgressEvent::FetchingSuggestions => {
            println!("  Looking for related titles...");
        }
        // Enrichment failures degrade silently to fewer suggestions
        ProgressEvent::SuggestionListingFailed { .. } => {}
        ProgressEvent::Complete { .. } => {
            println!();
        }
    }
}

fn format_offer(offer: &Offer) -> String {
    let quality = match offer.quality {
        Quality::Hd => "HD",
        Quality::Uhd => "4K",
    };
    format!("{} [{}] {}", offer.service, quality, offer.url)
}

fn format_title_line(title: &str, year: Option<u16>) -> String {
    match year {
        Some(year) => format!("{title} ({year})"),
        None => title.to_string(),
    }
}

fn print_resolution(resolution: &Resolution) {
    let head = format_title_line(&resolution.title.title, resolution.title.year);
    println!("=== {} ({}) ===\n", head, resolution.title.kind.label());

    match &resolution.availability {
        Availability::Available {
            offers,
            suggestions,
        } => {
            println!("Available on your services:");
            for offer in offers {
                println!("  {}", format_offer(offer));
            }

            if !suggestions.is_empty() {
                println!("\nYou might also like:");
                for s in suggestions {
                    print_suggestion_line(&s.title, s.year, &s.offers);
                }
            }
        }
        Availability::Unavailable {
            alternatives,
            other,
            suggestions,
        } => {
            println!("Not streaming on your selected services.");

            if !alternatives.is_empty() {
                println!("\nOn your services instead:");
                for alt in alternatives {
                    print_suggestion_line(&alt.title, alt.year, &alt.offers);
                }
            }

            if !other.is_empty() {
                println!("\nOther ways to watch:");
                print_offer_category("Other subscriptions", other.other_flatrate.as_deref());
                print_offer_category("Rent", other.rent.as_deref());
                print_offer_category("Buy", other.buy.as_deref());
                print_offer_category("Free", other.free.as_deref());
                print_offer_category("Free with ads", other.ads.as_deref());
            }

            if !suggestions.is_empty() {
                println!("\nYou might also like:");
                for s in suggestions {
                    print_suggestion_line(&s.title, s.year, &s.offers);
                }
            }
        }
    }
}

fn print_suggestion_line(title: &str, year: Option<u16>, offers: &[Offer]) {
    let services: Vec<String> = offers.iter().map(|o| o.service.to_string()).collect();
    if services.is_empty() {
        println!("  {}", format_title_line(title, year));
    } else {
        println!(
            "  {} on {}",
            format_title_line(title, year),
            services.join(", ")
        );
    }
}

fn print_offer_category(label: &str, offers: Option<&[Offer]>) {
    if let Some(offers) = offers {
        let services: Vec<String> = offers.iter().map(|o| o.service.to_string()).collect();
        println!("  {}: {}", label, services.join(", "));
    }
}

fn run_search(
    store: &FileStore,
    query: &str,
    region: Option<String>,
    services: Option<Vec<String>>,
    token: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let prefs = load_preferences(store)?;

    let region = region.unwrap_or(prefs.region);

    let selected: BTreeSet<ServiceId> = match services {
        Some(names) => {
            let mut set = BTreeSet::new();
            for name in &names {
                let id = ServiceId::parse(name)
                    .ok_or_else(|| format!("unknown service '{name}'"))?;
                set.insert(id);
            }
            set
        }
        None => prefs.services,
    };

    let credential = token
        .or_else(|| std::env::var("TMDB_TOKEN").ok())
        .unwrap_or(prefs.credential);

    let resolution = if json {
        check_availability(query, &region, &selected, &credential, |_| {})?
    } else {
        check_availability(query, &region, &selected, &credential, handle_progress_event)?
    };

    // History is the CLI's concern; the resolver never persists anything.
    let top_result = (resolution.title.id != 0)
        .then(|| (resolution.title.id, resolution.title.kind));
    push_history(store, query, top_result)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        print_resolution(&resolution);
    }
    Ok(())
}

fn run_prefs_edit(store: &FileStore) -> Result<(), Box<dyn std::error::Error>> {
    let current = load_preferences(store)?;

    let region_labels: Vec<String> = REGIONS
        .iter()
        .map(|r| format!("{} ({})", r.code, r.label))
        .collect();
    let default_region = REGIONS
        .iter()
        .position(|r| r.code == current.region)
        .unwrap_or(0);
    let region_index = dialoguer::Select::new()
        .with_prompt("Region")
        .items(&region_labels)
        .default(default_region)
        .interact()?;

    let service_names: Vec<&str> = SERVICES.iter().map(|s| s.name).collect();
    let defaults: Vec<bool> = SERVICES
        .iter()
        .map(|s| current.services.contains(&s.id))
        .collect();
    let picked = dialoguer::MultiSelect::new()
        .with_prompt("Your subscriptions (space to toggle)")
        .items(&service_names)
        .defaults(&defaults)
        .interact()?;

    let credential: String = dialoguer::Password::new()
        .with_prompt("TMDB API read token (leave empty to keep current)")
        .allow_empty_password(true)
        .interact()?;

    let prefs = Preferences {
        region: REGIONS[region_index].code.to_string(),
        services: picked.into_iter().map(|i| SERVICES[i].id).collect(),
        credential: if credential.is_empty() {
            current.credential
        } else {
            credential
        },
    };
    save_preferences(store, &prefs)?;
    println!("Preferences saved.");
    Ok(())
}

fn run_prefs_show(store: &FileStore) -> Result<(), Box<dyn std::error::Error>> {
    let prefs = load_preferences(store)?;
    println!("Region: {}", prefs.region);

    let names: Vec<String> = prefs.services.iter().map(|s| s.to_string()).collect();
    if names.is_empty() {
        println!("Subscriptions: (none)");
    } else {
        println!("Subscriptions: {}", names.join(", "));
    }

    if prefs.credential.is_empty() {
        println!("Credential: not configured");
    } else {
        println!("Credential: configured");
    }
    Ok(())
}

fn run_saved(store: &FileStore, action: SavedAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SavedAction::List => {
            let items = saved_items(store)?;
            if items.is_empty() {
                println!("No saved titles.");
                return Ok(());
            }
            for item in items {
                println!(
                    "  #{} {} ({})",
                    item.id,
                    format_title_line(&item.title, item.year),
                    item.kind.label()
                );
            }
        }
        SavedAction::Toggle {
            id,
            kind,
            title,
            year,
        } => {
            let outcome = toggle_saved(store, id, kind, &title, year, None)?;
            if outcome.saved {
                println!("Saved '{}'.", outcome.item.title);
            } else {
                println!("Removed '{}'.", outcome.item.title);
            }
        }
        SavedAction::Remove { id, kind } => match remove_saved(store, id, kind)? {
            Some(item) => println!("Removed '{}'.", item.title),
            None => println!("No saved title with id {id}."),
        },
        SavedAction::Export { path } => {
            let doc = export_saved(store)?;
            let count = doc.items.len();
            fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
            println!("Exported {} item(s) to {}", count, path.display());
        }
        SavedAction::Import { path } => {
            let content = fs::read_to_string(&path)?;
            let added = import_saved(store, &content)?;
            println!("Imported {added} new item(s).");
        }
    }
    Ok(())
}

fn run_history(store: &FileStore, clear: bool) -> Result<(), Box<dyn std::error::Error>> {
    if clear {
        clear_history(store)?;
        println!("Search history cleared.");
        return Ok(());
    }

    let entries = recent_searches(store)?;
    if entries.is_empty() {
        println!("No recent searches.");
        return Ok(());
    }
    for entry in entries {
        let when = chrono::DateTime::from_timestamp_millis(entry.at)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("  {}  {}", when, entry.query);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open()?;

    match cli.command {
        Command::Search {
            query,
            region,
            services,
            token,
            json,
        } => run_search(&store, &query, region, services, token, json),
        Command::Prefs { action } => match action.unwrap_or(PrefsAction::Show) {
            PrefsAction::Show => run_prefs_show(&store),
            PrefsAction::Edit => run_prefs_edit(&store),
            PrefsAction::Clear => {
                clear_preferences(&store)?;
                println!("Preferences cleared.");
                Ok(())
            }
        },
        Command::Saved { action } => run_saved(&store, action),
        Command::History { clear } => run_history(&store, clear),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("\nError: {e}");
        process::exit(1);
    }
}
