//! Postgres backing for fixtures and the roster.
//!
//! Fixtures are stored as JSONB documents keyed by id, so partial updates are a
//! plain `doc || patch` merge.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use std::path::Path;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::roster::{read_players_csv, sort_players, RosterProvider};
use crate::store::{new_fixture_id, FixtureChange, FixtureStore};
use crate::types::{by_schedule, Fixture, FixtureUpdate, NewFixture, Player};

const FEED_CAPACITY: usize = 64;

pub struct PgStore {
    pool: PgPool,
    feed: broadcast::Sender<FixtureChange>,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        info!("Connected to Postgres");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self { pool, feed }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fixtures (
                id TEXT PRIMARY KEY,
                doc JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                position TEXT NOT NULL,
                team TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Schema is up to date");
        Ok(())
    }

    /// Upserts every player in the CSV file inside one transaction.
    pub async fn import_roster(&self, path: &Path) -> Result<usize, StoreError> {
        let players = read_players_csv(path)?;
        let mut tx = self.pool.begin().await?;
        for player in &players {
            sqlx::query(
                r#"
                INSERT INTO players (id, first_name, last_name, position, team)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO UPDATE SET
                    first_name = EXCLUDED.first_name,
                    last_name = EXCLUDED.last_name,
                    position = EXCLUDED.position,
                    team = EXCLUDED.team
                "#,
            )
            .bind(&player.id)
            .bind(&player.first_name)
            .bind(&player.last_name)
            .bind(&player.position)
            .bind(&player.team)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!("Imported {} players from {:?}", players.len(), path);
        Ok(players.len())
    }

    fn publish(&self, change: FixtureChange) {
        let _ = self.feed.send(change);
    }
}

#[async_trait]
impl FixtureStore for PgStore {
    async fn read(&self, id: &str) -> Result<Fixture, StoreError> {
        let row: Option<(Json<Fixture>,)> = sqlx::query_as("SELECT doc FROM fixtures WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(Json(fixture),)| fixture)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn write(&self, id: &str, update: &FixtureUpdate) -> Result<(), StoreError> {
        let patch = serde_json::to_value(update)?;
        let result = sqlx::query(
            r#"
            UPDATE fixtures
            SET doc = doc || $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(patch))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!("Updated fixture {}", id);
        self.publish(FixtureChange::Updated(id.to_string()));
        Ok(())
    }

    async fn insert(&self, fixture: NewFixture) -> Result<Fixture, StoreError> {
        let fixture = fixture.into_fixture(new_fixture_id());
        sqlx::query("INSERT INTO fixtures (id, doc) VALUES ($1, $2)")
            .bind(&fixture.id)
            .bind(Json(&fixture))
            .execute(&self.pool)
            .await?;
        debug!("Inserted fixture {}", fixture.id);
        self.publish(FixtureChange::Inserted(fixture.id.clone()));
        Ok(fixture)
    }

    async fn list(&self) -> Result<Vec<Fixture>, StoreError> {
        let rows: Vec<(Json<Fixture>,)> = sqlx::query_as("SELECT doc FROM fixtures")
            .fetch_all(&self.pool)
            .await?;
        let mut fixtures: Vec<Fixture> = rows.into_iter().map(|(Json(f),)| f).collect();
        fixtures.sort_by(by_schedule);
        Ok(fixtures)
    }

    fn subscribe(&self) -> broadcast::Receiver<FixtureChange> {
        self.feed.subscribe()
    }
}

#[async_trait]
impl RosterProvider for PgStore {
    async fn list_players(&self, team: &str) -> Result<Vec<Player>, StoreError> {
        let mut players: Vec<Player> = sqlx::query_as(
            "SELECT id, first_name, last_name, position, team FROM players WHERE team = $1",
        )
        .bind(team)
        .fetch_all(&self.pool)
        .await?;
        sort_players(&mut players);
        Ok(players)
    }
}
