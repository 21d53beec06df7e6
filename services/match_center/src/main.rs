use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use match_center::center::{FixtureFilter, MatchCenter};
use match_center::config::AppConfig;
use match_center::notify::{spawn_fixture_watcher, ChangeDetector};
use match_center::postgres::PgStore;
use match_center::roster::{InMemoryRoster, RosterProvider};
use match_center::store::{FixtureStore, InMemoryFixtureStore};
use match_center::web::{serve, AppState};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the match center web server
    Serve {
        /// Port to listen on, overrides MATCH_CENTER_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create the Postgres tables
    Migrate,
    /// Load players from a CSV file into Postgres
    ImportRoster {
        /// Path to the roster CSV (id,first_name,last_name,position,team)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print the fixture list
    Fixtures {
        /// Only show fixtures for this squad
        #[arg(short, long)]
        team: Option<String>,
    },
}

async fn connect(config: &AppConfig) -> Result<PgStore> {
    let database = config
        .database
        .as_ref()
        .context("DATABASE_URL must be set for this command")?;
    Ok(PgStore::connect(database).await?)
}

async fn build_center(config: &AppConfig) -> Result<MatchCenter> {
    let (store, roster): (Arc<dyn FixtureStore>, Arc<dyn RosterProvider>) =
        match &config.database {
            Some(database) => {
                let pg = Arc::new(PgStore::connect(database).await?);
                pg.migrate().await?;
                let store: Arc<dyn FixtureStore> = pg.clone();
                let roster: Arc<dyn RosterProvider> = pg;
                (store, roster)
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory store");
                let store = match &config.seed.fixtures_json {
                    Some(path) => InMemoryFixtureStore::load_json(path)?,
                    None => InMemoryFixtureStore::new(),
                };
                let roster = match &config.seed.roster_csv {
                    Some(path) => InMemoryRoster::load_csv(path)?,
                    None => InMemoryRoster::default(),
                };
                let store: Arc<dyn FixtureStore> = Arc::new(store);
                let roster: Arc<dyn RosterProvider> = Arc::new(roster);
                (store, roster)
            }
        };

    Ok(MatchCenter::new(
        store,
        roster,
        config.club.squads.clone(),
        config.clock.tick(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let center = Arc::new(build_center(&config).await?);
            let watcher = spawn_fixture_watcher(center.store(), ChangeDetector::new()).await;
            serve(AppState::new(center), &config.bind_addr()).await?;
            watcher.abort();
        }
        Commands::Migrate => {
            connect(&config).await?.migrate().await?;
        }
        Commands::ImportRoster { file } => {
            let store = connect(&config).await?;
            store.migrate().await?;
            let count = store.import_roster(&file).await?;
            info!("Roster import complete: {} players", count);
        }
        Commands::Fixtures { team } => {
            let center = build_center(&config).await?;
            let filter = FixtureFilter {
                team,
                status: None,
            };
            for fixture in center.list_fixtures(&filter).await? {
                println!(
                    "{}  {:<12} {} v {}  {:?}  {}",
                    fixture.date,
                    fixture.team,
                    fixture.home_team(),
                    fixture.away_team(),
                    fixture.status,
                    fixture.score.as_deref().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}
