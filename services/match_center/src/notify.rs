//! Change detection for the fixture feed.
//!
//! The detector is an ordinary value created at startup and handed to whoever
//! needs it, so every watcher keeps its own baseline.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::FixtureStore;
use crate::types::{Fixture, FixtureStatus};

pub const UPCOMING: &str = "fixtures.upcoming";
pub const COMPLETED: &str = "fixtures.completed";

/// Remembers the last seen size of each collection.
#[derive(Debug, Default, Clone)]
pub struct ChangeDetector {
    previous_counts: HashMap<String, usize>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items added since the previous call for `collection`.
    /// The first observation only sets the baseline and returns `None`.
    pub fn observe(&mut self, collection: &str, count: usize) -> Option<usize> {
        let previous = self.previous_counts.insert(collection.to_string(), count)?;
        (count > previous).then(|| count - previous)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Compares the fixture list against the detector's baseline.
pub fn fixture_notifications(
    detector: &mut ChangeDetector,
    fixtures: &[Fixture],
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    let upcoming: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| f.status == FixtureStatus::Upcoming)
        .collect();
    if let Some(added) = detector.observe(UPCOMING, upcoming.len()) {
        notifications.push(Notification {
            title: "New fixtures".to_string(),
            body: if added == 1 {
                "1 fixture has been added".to_string()
            } else {
                format!("{} fixtures have been added", added)
            },
        });
    }

    let mut completed: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| f.status == FixtureStatus::Completed)
        .collect();
    if let Some(added) = detector.observe(COMPLETED, completed.len()) {
        completed.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        for fixture in completed.into_iter().take(added) {
            notifications.push(Notification {
                title: format!("Full time: {}", fixture.team),
                body: format!(
                    "{} {} {} ({})",
                    fixture.home_team(),
                    fixture.score.as_deref().unwrap_or("?-?"),
                    fixture.away_team(),
                    fixture
                        .result
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "no result".to_string())
                ),
            });
        }
    }

    notifications
}

const NOTIFICATION_CAPACITY: usize = 32;

/// Handle to a running fixture watcher.
pub struct FixtureWatcher {
    handle: JoinHandle<()>,
    notifications: broadcast::Sender<Notification>,
}

impl FixtureWatcher {
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Waits for the task to end. True when it stopped on its own.
    pub async fn finished(self) -> bool {
        self.handle.await.is_ok()
    }
}

/// Follows the store feed and logs a notification for every new fixture or
/// result. The baseline is taken before this returns. The task holds only a
/// weak reference and stops once the store is dropped.
pub async fn spawn_fixture_watcher(
    store: &Arc<dyn FixtureStore>,
    mut detector: ChangeDetector,
) -> FixtureWatcher {
    let mut feed = store.subscribe();
    match store.list().await {
        Ok(fixtures) => {
            fixture_notifications(&mut detector, &fixtures);
        }
        Err(e) => warn!("Fixture watcher could not load baseline: {}", e),
    }

    let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
    let outbox = notifications.clone();
    let store: Weak<dyn FixtureStore> = Arc::downgrade(store);
    let handle = tokio::spawn(async move {
        loop {
            let change = match feed.recv().await {
                Ok(change) => change,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Fixture watcher skipped {} changes", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Some(store) = store.upgrade() else {
                break;
            };
            let fixtures = match store.list().await {
                Ok(fixtures) => fixtures,
                Err(e) => {
                    warn!(fixture_id = %change.fixture_id(), "Fixture watcher list failed: {}", e);
                    continue;
                }
            };
            drop(store);
            for n in fixture_notifications(&mut detector, &fixtures) {
                info!(target: "notifications", "{}: {}", n.title, n.body);
                let _ = outbox.send(n);
            }
        }
        debug!("Fixture feed closed, watcher stopping");
    });

    FixtureWatcher {
        handle,
        notifications,
    }
}
