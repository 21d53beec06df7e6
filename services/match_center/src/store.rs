use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::{by_schedule, Fixture, FixtureUpdate, NewFixture};

const FEED_CAPACITY: usize = 64;

/// Change notification published by a fixture store after each successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureChange {
    Inserted(String),
    Updated(String),
}

impl FixtureChange {
    pub fn fixture_id(&self) -> &str {
        match self {
            FixtureChange::Inserted(id) | FixtureChange::Updated(id) => id,
        }
    }
}

/// Document collection holding fixtures.
#[async_trait]
pub trait FixtureStore: Send + Sync {
    async fn read(&self, id: &str) -> Result<Fixture, StoreError>;

    /// Merges the set fields of `update` into the stored fixture.
    async fn write(&self, id: &str, update: &FixtureUpdate) -> Result<(), StoreError>;

    /// Stores a new `Upcoming` fixture under a fresh id.
    async fn insert(&self, fixture: NewFixture) -> Result<Fixture, StoreError>;

    /// All fixtures ordered by date and kickoff.
    async fn list(&self) -> Result<Vec<Fixture>, StoreError>;

    /// Live feed of changes made through this store.
    fn subscribe(&self) -> broadcast::Receiver<FixtureChange>;
}

pub fn new_fixture_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub struct InMemoryFixtureStore {
    fixtures: RwLock<HashMap<String, Fixture>>,
    feed: broadcast::Sender<FixtureChange>,
}

impl InMemoryFixtureStore {
    pub fn new() -> Self {
        Self::with_fixtures(Vec::new())
    }

    pub fn with_fixtures(fixtures: Vec<Fixture>) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            fixtures: RwLock::new(fixtures.into_iter().map(|f| (f.id.clone(), f)).collect()),
            feed,
        }
    }

    /// Seeds the store from a JSON array of fixtures.
    pub fn load_json(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let fixtures: Vec<Fixture> = serde_json::from_str(&raw)?;
        info!("Loaded {} fixtures from {:?}", fixtures.len(), path);
        Ok(Self::with_fixtures(fixtures))
    }

    fn publish(&self, change: FixtureChange) {
        // No subscribers is fine.
        let _ = self.feed.send(change);
    }
}

impl Default for InMemoryFixtureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FixtureStore for InMemoryFixtureStore {
    async fn read(&self, id: &str) -> Result<Fixture, StoreError> {
        self.fixtures
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn write(&self, id: &str, update: &FixtureUpdate) -> Result<(), StoreError> {
        {
            let mut fixtures = self.fixtures.write().await;
            let fixture = fixtures
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            fixture.apply(update);
        }
        debug!("Updated fixture {}", id);
        self.publish(FixtureChange::Updated(id.to_string()));
        Ok(())
    }

    async fn insert(&self, fixture: NewFixture) -> Result<Fixture, StoreError> {
        let fixture = fixture.into_fixture(new_fixture_id());
        self.fixtures
            .write()
            .await
            .insert(fixture.id.clone(), fixture.clone());
        debug!("Inserted fixture {}", fixture.id);
        self.publish(FixtureChange::Inserted(fixture.id.clone()));
        Ok(fixture)
    }

    async fn list(&self) -> Result<Vec<Fixture>, StoreError> {
        let mut fixtures: Vec<Fixture> = self.fixtures.read().await.values().cloned().collect();
        fixtures.sort_by(by_schedule);
        Ok(fixtures)
    }

    fn subscribe(&self) -> broadcast::Receiver<FixtureChange> {
        self.feed.subscribe()
    }
}
