use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use showshelf::{PageLoad, Season, Show, ShowId, ShowShelf, StoreEvent, Theme, load_config};
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Wrong PIN entries before giving up
const UNLOCK_ATTEMPTS: usize = 3;

#[derive(Debug, Parser)]
#[command(version, about = "Browse TV shows and keep a shelf of favorites")]
struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log what is going on
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Page through the show index
    Browse {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Search shows by name
    Search { query: String },
    /// Show details of a single show
    Show { id: ShowId },
    /// List the episodes of a show by season
    Episodes { id: ShowId },
    /// List the cast of a show
    Cast { id: ShowId },
    /// Search people by name
    People { query: String },
    /// List the shows a person appeared in
    Credits { person_id: u32 },
    /// List favorite shows
    Favorites,
    /// Change a favorite
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
    /// Manage the PIN lock
    Pin {
        #[command(subcommand)]
        action: PinAction,
    },
}

#[derive(Debug, Subcommand)]
enum FavoriteAction {
    Add { id: ShowId },
    Remove { id: ShowId },
    Toggle { id: ShowId },
}

#[derive(Debug, Subcommand)]
enum ThemeAction {
    Set { theme: Theme },
}

#[derive(Debug, Subcommand)]
enum PinAction {
    /// Set a new PIN
    Set,
    /// Require the PIN before catalog commands
    Enable,
    /// Stop asking for the PIN
    Disable,
    /// Check a PIN against the stored one
    Check,
}

impl Command {
    fn needs_unlock(&self) -> bool {
        !matches!(
            self,
            Command::Theme { .. }
                | Command::Pin {
                    action: PinAction::Check | PinAction::Enable
                }
        )
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    let shelf = ShowShelf::open(&config)?;
    info!(data_dir = %shelf.data_dir().display(), "Opened shelf");

    if cli.command.needs_unlock() && shelf.lock.is_pin_enabled() {
        unlock(&shelf)?;
    }

    let result = execute(&shelf, cli.command).await;
    shelf.store.shutdown();
    result
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn prompt_pin(prompt: &str) -> Result<String> {
    Ok(Password::new().with_prompt(prompt).interact()?)
}

fn unlock(shelf: &ShowShelf) -> Result<()> {
    for attempt in 1..=UNLOCK_ATTEMPTS {
        let code = prompt_pin("PIN")?;
        if shelf.lock.pin_matches(&code)? {
            return Ok(());
        }
        if attempt < UNLOCK_ATTEMPTS {
            eprintln!("Wrong PIN, {} attempt(s) left", UNLOCK_ATTEMPTS - attempt);
        }
    }
    bail!("Too many wrong PIN entries")
}

async fn execute(shelf: &ShowShelf, command: Command) -> Result<()> {
    let store = &shelf.store;

    match command {
        Command::Browse { pages } => {
            let mut events = store.subscribe();
            for _ in 0..pages {
                match store.load_next_page().await {
                    PageLoad::Loaded { page, shows } => {
                        println!("=== Page {} ===", page);
                        for show in &shows {
                            print_show_line(shelf, show);
                        }
                        if shows.is_empty() {
                            println!("End of the catalog.");
                            break;
                        }
                    }
                    PageLoad::Failed { page } => {
                        bail!("Loading page {} failed", page);
                    }
                    PageLoad::Exhausted => {
                        println!("End of the catalog.");
                        break;
                    }
                    PageLoad::InFlight | PageLoad::Cancelled => break,
                }
            }
            while let Ok(event) = events.try_recv() {
                if let StoreEvent::PageLoaded { page, count } = event {
                    info!(page, count, "Page merged");
                }
            }
            println!("\n{} show(s) known", store.cached_shows().len());
        }
        Command::Search { query } => {
            let results = store.search_shows(&query).await;
            if results.is_empty() {
                println!("No shows found.");
            }
            for result in &results {
                print_show_line(shelf, &result.show);
            }
        }
        Command::Show { id } => {
            let show = require_show(shelf, id).await?;
            print_show_details(shelf, &show);
        }
        Command::Episodes { id } => {
            let seasons = store.seasons(id).await;
            if seasons.is_empty() {
                println!("No episodes found.");
            }
            for season in &seasons {
                print_season(season);
            }
        }
        Command::Cast { id } => {
            let cast = store.cast(id).await;
            if cast.is_empty() {
                println!("No cast found.");
            }
            for member in &cast {
                println!(
                    "{:>7}  {} as {}",
                    member.person.id, member.person.name, member.character
                );
            }
        }
        Command::People { query } => {
            let people = store.search_people(&query).await;
            if people.is_empty() {
                println!("No people found.");
            }
            for person in &people {
                println!("{:>7}  {}", person.id, person.name);
            }
        }
        Command::Credits { person_id } => {
            let shows = store.person_shows(person_id).await;
            if shows.is_empty() {
                println!("No shows found.");
            }
            for show in &shows {
                print_show_line(shelf, show);
            }
        }
        Command::Favorites => {
            let reconciliation = store.load_favorites().await;
            if !reconciliation.failed.is_empty() {
                eprintln!(
                    "Could not fetch {} favorite(s): {:?}",
                    reconciliation.failed.len(),
                    reconciliation.failed
                );
            }

            let favorites = store.favorite_shows();
            if favorites.is_empty() {
                println!("No favorites yet.");
            }
            for show in &favorites {
                print_show_line(shelf, show);
            }
        }
        Command::Favorite { action } => match action {
            FavoriteAction::Add { id } => {
                let show = require_show(shelf, id).await?;
                store.add_to_favorites(&show);
                println!("Added '{}' to favorites", show.name);
            }
            FavoriteAction::Remove { id } => {
                // Removal only needs the id, so no lookup for unknown shows
                let show = store.show(id).unwrap_or_else(|| Show::new(id, ""));
                store.remove_from_favorites(&show);
                println!("Removed {} from favorites", id);
            }
            FavoriteAction::Toggle { id } => {
                let show = require_show(shelf, id).await?;
                if store.toggle_favorite(&show) {
                    println!("Added '{}' to favorites", show.name);
                } else {
                    println!("Removed '{}' from favorites", show.name);
                }
            }
        },
        Command::Theme { action } => match action {
            None => {
                let current = shelf.preferences.theme();
                for theme in Theme::ALL {
                    let marker = if theme == current { "*" } else { " " };
                    println!("{} {:<7} {}", marker, theme.to_string(), theme.title());
                }
            }
            Some(ThemeAction::Set { theme }) => {
                shelf.preferences.set_theme(theme)?;
                println!("Theme set to {}", theme.title());
            }
        },
        Command::Pin { action } => match action {
            PinAction::Set => {
                let code = Password::new()
                    .with_prompt("New PIN")
                    .with_confirmation("Repeat PIN", "PINs do not match")
                    .interact()?;
                shelf.lock.save_pin(&code)?;
                println!("PIN saved");
            }
            PinAction::Enable => {
                shelf.lock.set_pin_enabled(true)?;
                println!("PIN lock enabled");
            }
            PinAction::Disable => {
                shelf.lock.set_pin_enabled(false)?;
                println!("PIN lock disabled");
            }
            PinAction::Check => {
                if !shelf.lock.has_pin()? {
                    bail!("No PIN has been set");
                }
                let code = prompt_pin("PIN")?;
                if shelf.lock.pin_matches(&code)? {
                    println!("PIN matches");
                } else {
                    bail!("PIN does not match");
                }
            }
        },
    }

    Ok(())
}

async fn require_show(shelf: &ShowShelf, id: ShowId) -> Result<Show> {
    match shelf.store.lookup_show(id).await {
        Some(show) => Ok(show),
        None => bail!("Show {} could not be found", id),
    }
}

fn print_show_line(shelf: &ShowShelf, show: &Show) {
    let star = if shelf.store.is_favorite(show) { "★" } else { " " };
    println!("{} {:>7}  {}", star, show.id, show.name);
}

fn print_show_details(shelf: &ShowShelf, show: &Show) {
    print_show_line(shelf, show);
    if let Some(genres) = show.genres.as_ref().filter(|g| !g.is_empty()) {
        println!("  Genres: {}", genres.join(", "));
    }
    if let Some(schedule) = show.schedule.as_ref().and_then(|s| s.display()) {
        println!("  Airs: {}", schedule);
    }
    if !show.url.is_empty() {
        println!("  Link: {}", show.url);
    }
    if let Some(summary) = show.summary_text() {
        println!("\n{}", summary);
    }
}

fn print_season(season: &Season) {
    println!("=== Season {} ===", season.number);
    for episode in &season.episodes {
        let number = episode
            .number
            .map(|n| format!("E{:02}", n))
            .unwrap_or_else(|| "Special".to_string());
        let airdate = episode.airdate.as_deref().unwrap_or("TBA");
        println!("  {:<7} {}  ({})", number, episode.name, airdate);
    }
}
