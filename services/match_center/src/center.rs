use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{MatchError, StoreError};
use crate::metrics::MetricsCollector;
use crate::roster::RosterProvider;
use crate::session::{
    AttributionInput, Confirmation, FinalizeOutcome, LiveMatchSession, LiveView, Recorded,
    SessionState,
};
use crate::store::FixtureStore;
use crate::types::{
    by_schedule, compute_result, score_string, CardKind, Fixture, FixtureStatus, FixtureUpdate,
    NewFixture, Player, Side,
};
use crate::utils::parse_score;

/// Filters for listing fixtures.
#[derive(Debug, Clone, Default)]
pub struct FixtureFilter {
    pub team: Option<String>,
    pub status: Option<FixtureStatus>,
}

impl FixtureFilter {
    fn matches(&self, fixture: &Fixture) -> bool {
        self.team.as_deref().map_or(true, |t| fixture.team == t)
            && self.status.map_or(true, |s| fixture.status == s)
    }
}

/// Owns the single live session and the collaborators it talks to.
pub struct MatchCenter {
    store: Arc<dyn FixtureStore>,
    roster: Arc<dyn RosterProvider>,
    metrics: MetricsCollector,
    squads: Vec<String>,
    tick: Duration,
    session: Mutex<Option<LiveMatchSession>>,
}

impl MatchCenter {
    pub fn new(
        store: Arc<dyn FixtureStore>,
        roster: Arc<dyn RosterProvider>,
        squads: Vec<String>,
        tick: Duration,
    ) -> Self {
        Self {
            store,
            roster,
            metrics: MetricsCollector::new(),
            squads,
            tick,
            session: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn FixtureStore> {
        &self.store
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn squads(&self) -> &[String] {
        &self.squads
    }

    pub async fn list_fixtures(&self, filter: &FixtureFilter) -> Result<Vec<Fixture>, MatchError> {
        let mut fixtures: Vec<Fixture> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|f| filter.matches(f))
            .collect();
        fixtures.sort_by(by_schedule);
        Ok(fixtures)
    }

    pub async fn fixture(&self, id: &str) -> Result<Fixture, MatchError> {
        Ok(self.store.read(id).await?)
    }

    pub async fn create_fixture(&self, fixture: NewFixture) -> Result<Fixture, MatchError> {
        if !self.squads.iter().any(|s| s == &fixture.team) {
            return Err(MatchError::UnknownSquad(fixture.team));
        }
        let created = self.store.insert(fixture).await?;
        info!(
            fixture_id = %created.id,
            "Created fixture {} vs {} on {}",
            created.team,
            created.opponent,
            created.date
        );
        Ok(created)
    }

    pub async fn players(&self, team: &str) -> Result<Vec<Player>, MatchError> {
        Ok(self.roster.list_players(team).await?)
    }

    /// Writes through the store, recording the attempt in metrics.
    async fn write(&self, id: &str, update: &FixtureUpdate) -> Result<(), StoreError> {
        let tracker = self.metrics.record_write_start();
        let result = self.store.write(id, update).await;
        match &result {
            Ok(()) => tracker.finish(true),
            Err(e) => {
                tracker.finish(false);
                self.metrics.record_error(e.to_string());
            }
        }
        result
    }

    /// Enters a final score by hand. Event logs are left as they are.
    /// Refused while the fixture has a live session, which would overwrite it
    /// on finalize.
    pub async fn record_result(&self, id: &str, score: &str) -> Result<Fixture, MatchError> {
        let (home, away) = parse_score(score).map_err(|e| MatchError::InvalidScore(e.to_string()))?;
        if self.live_fixture_id().await.as_deref() == Some(id) {
            return Err(MatchError::FixtureLive(id.to_string()));
        }
        let fixture = self.store.read(id).await?;
        let update = FixtureUpdate {
            score: Some(score_string(home, away)),
            result: Some(compute_result(fixture.home_away, home, away)),
            status: Some(FixtureStatus::Completed),
            ..Default::default()
        };
        self.write(id, &update).await?;
        info!(fixture_id = %id, "Result entered: {}", score_string(home, away));
        Ok(self.store.read(id).await?)
    }

    /// Starts tracking an upcoming fixture, replacing any live session.
    pub async fn start_match(&self, fixture_id: &str) -> Result<LiveView, MatchError> {
        let fixture = self.store.read(fixture_id).await?;
        if fixture.status != FixtureStatus::Upcoming {
            return Err(MatchError::NotUpcoming(fixture.id));
        }
        let roster = self.roster.list_players(&fixture.team).await?;

        let mut session = self.session.lock().await;
        if let Some(previous) = session.take() {
            warn!(
                fixture_id = %previous.fixture().id,
                "Discarding unfinished live match"
            );
        }
        let started = LiveMatchSession::start(fixture, roster, self.tick);
        let view = started.view();
        *session = Some(started);
        Ok(view)
    }

    /// Drops the live session without saving anything.
    pub async fn discard(&self) -> bool {
        match self.session.lock().await.take() {
            Some(session) => {
                info!(fixture_id = %session.fixture().id, "Live match discarded");
                true
            }
            None => false,
        }
    }

    async fn live_fixture_id(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.fixture().id.clone())
    }

    pub async fn is_live(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn with_session<T>(
        &self,
        f: impl FnOnce(&mut LiveMatchSession) -> Result<T, MatchError>,
    ) -> Result<T, MatchError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(MatchError::NoActiveSession)?;
        f(session)
    }

    pub async fn view(&self) -> Result<LiveView, MatchError> {
        self.with_session(|s| Ok(s.view())).await
    }

    pub async fn live_roster(&self) -> Result<Vec<Player>, MatchError> {
        self.with_session(|s| Ok(s.roster().to_vec())).await
    }

    pub async fn toggle_clock(&self) -> Result<SessionState, MatchError> {
        self.with_session(|s| s.toggle_clock()).await
    }

    pub async fn reset_clock(&self) -> Result<(), MatchError> {
        self.with_session(|s| s.reset_clock()).await
    }

    pub async fn switch_half(&self) -> Result<(), MatchError> {
        self.with_session(|s| s.switch_half()).await
    }

    pub async fn record_goal(
        &self,
        side: Side,
        attribution: AttributionInput,
    ) -> Result<Recorded, MatchError> {
        self.with_session(|s| s.record_goal(side, attribution)).await
    }

    pub async fn adjust_score(&self, side: Side, delta: i32) -> Result<u32, MatchError> {
        self.with_session(|s| s.adjust_score(side, delta)).await
    }

    pub async fn record_goal_event(
        &self,
        side: Side,
        attribution: AttributionInput,
    ) -> Result<Recorded, MatchError> {
        self.with_session(|s| s.record_goal_event(side, attribution)).await
    }

    pub async fn record_card(
        &self,
        kind: CardKind,
        player_or_shirt: &str,
        tracked_club_player: bool,
    ) -> Result<Recorded, MatchError> {
        self.with_session(|s| s.record_card(kind, player_or_shirt, tracked_club_player))
            .await
    }

    /// Persists the live match. The session is discarded only once the write
    /// succeeds; on failure it stays available for another attempt.
    pub async fn finalize(&self, confirmation: Confirmation) -> Result<FinalizeOutcome, MatchError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(MatchError::NoActiveSession)?;

        let tracker = (confirmation == Confirmation::Confirmed).then(|| self.metrics.record_write_start());
        let outcome = session.finalize(self.store.as_ref(), confirmation).await;
        if let Some(tracker) = tracker {
            tracker.finish(outcome.is_ok());
        }

        match outcome {
            Ok(FinalizeOutcome::Completed(fixture)) => {
                *guard = None;
                Ok(FinalizeOutcome::Completed(fixture))
            }
            Ok(FinalizeOutcome::Declined) => Ok(FinalizeOutcome::Declined),
            Err(e) => {
                self.metrics.record_error(e.to_string());
                Err(e)
            }
        }
    }
}
