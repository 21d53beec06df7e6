use async_trait::async_trait;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use match_center::center::MatchCenter;
use match_center::error::{MatchError, StoreError};
use match_center::roster::InMemoryRoster;
use match_center::session::{AttributionInput, Confirmation, FinalizeOutcome, Recorded, SessionState};
use match_center::store::{FixtureChange, FixtureStore, InMemoryFixtureStore};
use match_center::types::{
    Attribution, CardKind, Fixture, FixtureStatus, FixtureUpdate, MatchResult, NewFixture, Player,
    Side,
};

/// In-memory store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryFixtureStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl FixtureStore for FlakyStore {
    async fn read(&self, id: &str) -> Result<Fixture, StoreError> {
        self.inner.read(id).await
    }

    async fn write(&self, id: &str, update: &FixtureUpdate) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.write(id, update).await
    }

    async fn insert(&self, fixture: NewFixture) -> Result<Fixture, StoreError> {
        self.inner.insert(fixture).await
    }

    async fn list(&self) -> Result<Vec<Fixture>, StoreError> {
        self.inner.list().await
    }

    fn subscribe(&self) -> broadcast::Receiver<FixtureChange> {
        self.inner.subscribe()
    }
}

fn roster() -> InMemoryRoster {
    InMemoryRoster::new(vec![
        Player {
            id: "p9".to_string(),
            first_name: "alex".to_string(),
            last_name: "morgan".to_string(),
            position: "Forward".to_string(),
            team: "First Team".to_string(),
        },
        Player {
            id: "p4".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Potter".to_string(),
            position: "Defender".to_string(),
            team: "First Team".to_string(),
        },
        Player {
            id: "u1".to_string(),
            first_name: "Kit".to_string(),
            last_name: "Young".to_string(),
            position: "Midfielder".to_string(),
            team: "U18".to_string(),
        },
    ])
}

fn home_fixture() -> NewFixture {
    NewFixture {
        date: NaiveDate::from_ymd_opt(2025, 8, 16).unwrap(),
        kickoff: None,
        opponent: "Rovers".to_string(),
        venue: Some("Memorial Ground".to_string()),
        home_away: Side::Home,
        competition: Some("League".to_string()),
        team: "First Team".to_string(),
    }
}

fn setup() -> (Arc<FlakyStore>, MatchCenter) {
    let store = Arc::new(FlakyStore::default());
    let center = MatchCenter::new(
        store.clone(),
        Arc::new(roster()),
        vec!["First Team".to_string(), "U18".to_string()],
        Duration::from_secs(1),
    );
    (store, center)
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_full_match_survives_a_failed_write() {
    let (store, center) = setup();
    let fixture = center.create_fixture(home_fixture()).await.unwrap();

    let live = center.start_match(&fixture.id).await.unwrap();
    assert_eq!(live.home_team, "First Team");
    assert_eq!(live.away_team, "Rovers");

    let roster = center.live_roster().await.unwrap();
    assert_eq!(
        roster.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        vec!["p9", "p4"]
    );

    assert_eq!(center.toggle_clock().await.unwrap(), SessionState::Running);
    tokio::time::sleep(Duration::from_millis(65_500)).await;

    let goal = center
        .record_goal(Side::Home, AttributionInput::Player("p9".to_string()))
        .await
        .unwrap();
    let Recorded::Event(event) = goal else {
        panic!("expected a credited goal, got {:?}", goal);
    };
    assert_eq!(event.time, "1H 1:05");
    assert_eq!(event.team, "First Team");
    assert_eq!(event.attribution.player_name(), "Alex Morgan");

    let away = center
        .record_goal(Side::Away, AttributionInput::Shirt("#7".to_string()))
        .await
        .unwrap();
    assert!(matches!(
        away,
        Recorded::Event(ref e) if e.attribution == Attribution::Shirt { shirt_number: "7".to_string() }
    ));

    let blank = center
        .record_goal(Side::Away, AttributionInput::Shirt("  ".to_string()))
        .await
        .unwrap();
    assert_eq!(blank, Recorded::Ignored);

    let err = center
        .record_goal(Side::Home, AttributionInput::Player("u1".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::UnknownPlayer(id) if id == "u1"));

    assert_eq!(
        center
            .record_goal(Side::Home, AttributionInput::None)
            .await
            .unwrap(),
        Recorded::ScoreOnly
    );
    assert_eq!(center.adjust_score(Side::Away, -5).await.unwrap(), 0);
    assert_eq!(center.adjust_score(Side::Away, 1).await.unwrap(), 1);

    center
        .record_card(CardKind::Yellow, "p4", true)
        .await
        .unwrap();
    center.record_card(CardKind::Red, "11", false).await.unwrap();

    let view = center.view().await.unwrap();
    assert_eq!((view.home_score, view.away_score), (2, 1));
    assert_eq!(view.home.goals.len(), 1);
    assert_eq!(view.away.goals.len(), 1);
    assert_eq!(view.home.yellow_cards.len(), 1);
    assert_eq!(view.away.red_cards.len(), 1);

    assert_eq!(
        center.finalize(Confirmation::Declined).await.unwrap(),
        FinalizeOutcome::Declined
    );
    assert_eq!(center.view().await.unwrap().state, SessionState::Running);

    store.set_failing(true);
    let err = center.finalize(Confirmation::Confirmed).await.unwrap_err();
    assert!(err.is_retryable());

    let kept = center.view().await.unwrap();
    assert_eq!(kept.state, SessionState::Paused);
    assert_eq!((kept.home_score, kept.away_score), (2, 1));
    assert_eq!(
        store.read(&fixture.id).await.unwrap().status,
        FixtureStatus::Upcoming
    );

    store.set_failing(false);
    let FinalizeOutcome::Completed(done) = center.finalize(Confirmation::Confirmed).await.unwrap()
    else {
        panic!("expected the match to complete");
    };
    assert_eq!(done.score.as_deref(), Some("2-1"));
    assert_eq!(done.result, Some(MatchResult::Win));
    assert!(!center.is_live().await);

    let stored = store.read(&fixture.id).await.unwrap();
    assert_eq!(stored.status, FixtureStatus::Completed);
    assert_eq!(stored.scorers.len(), 2);
    assert_eq!(stored.yellow_cards.len(), 1);
    assert_eq!(stored.red_cards.len(), 1);

    let metrics = center.metrics().get_metrics();
    assert_eq!(metrics.failed_writes, 1);
    assert_eq!(metrics.successful_writes, 1);
    assert!(metrics.last_error.is_some());
}

#[tokio::test]
async fn test_completed_fixture_cannot_go_live_again() {
    let (_store, center) = setup();
    let fixture = center.create_fixture(home_fixture()).await.unwrap();

    let updated = center.record_result(&fixture.id, "0-3").await.unwrap();
    assert_eq!(updated.result, Some(MatchResult::Loss));
    assert_eq!(updated.status, FixtureStatus::Completed);

    let err = center.start_match(&fixture.id).await.unwrap_err();
    assert!(matches!(err, MatchError::NotUpcoming(_)));
    assert!(!center.is_live().await);
}

#[tokio::test]
async fn test_finalized_session_rejects_further_events() {
    let (_store, center) = setup();
    let fixture = center.create_fixture(home_fixture()).await.unwrap();
    center.start_match(&fixture.id).await.unwrap();
    center.finalize(Confirmation::Confirmed).await.unwrap();

    let err = center
        .record_goal(Side::Home, AttributionInput::None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::NoActiveSession));
}
