use axum::http::StatusCode;
use axum_test::TestServer;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use match_center::center::MatchCenter;
use match_center::metrics::StoreMetrics;
use match_center::roster::InMemoryRoster;
use match_center::share::ShareLink;
use match_center::store::InMemoryFixtureStore;
use match_center::types::{Fixture, FixtureStatus, Player};
use match_center::web::{router, AppState, ErrorBody};

fn server() -> TestServer {
    let roster = InMemoryRoster::new(vec![Player {
        id: "p1".to_string(),
        first_name: "Sam".to_string(),
        last_name: "Kerr".to_string(),
        position: "Forward".to_string(),
        team: "First Team".to_string(),
    }]);
    let center = MatchCenter::new(
        Arc::new(InMemoryFixtureStore::new()),
        Arc::new(roster),
        vec!["First Team".to_string(), "Reserves".to_string()],
        Duration::from_secs(1),
    );
    TestServer::new(router(AppState::new(Arc::new(center)))).unwrap()
}

async fn create_fixture(server: &TestServer, team: &str) -> Fixture {
    let response = server
        .post("/fixtures")
        .json(&json!({
            "date": "2025-09-06",
            "opponent": "Athletic",
            "home_away": "Home",
            "competition": "League",
            "team": team,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Fixture>()
}

#[tokio::test]
async fn test_live_match_over_http() {
    let server = server();
    let fixture = create_fixture(&server, "First Team").await;
    assert_eq!(fixture.status, FixtureStatus::Upcoming);

    server.get("/live").await.assert_status(StatusCode::NOT_FOUND);

    server
        .post("/live")
        .json(&json!({ "fixture_id": fixture.id }))
        .await
        .assert_status(StatusCode::CREATED);

    let clock: Value = server.post("/live/clock/toggle").await.json();
    assert_eq!(clock["state"], "running");

    let goal: Value = server
        .post("/live/goal")
        .json(&json!({ "side": "Home", "player_id": "p1" }))
        .await
        .json();
    assert_eq!(goal["status"], "recorded");
    assert_eq!(goal["event"]["player_name"], "Sam Kerr");
    assert_eq!(goal["live"]["home_score"], 1);

    let conflict = server
        .post("/live/goal")
        .json(&json!({ "side": "Home", "player_id": "p1", "shirt_number": "4" }))
        .await;
    conflict.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!conflict.json::<ErrorBody>().retryable);

    let declined: Value = server
        .post("/live/finalize")
        .json(&json!({ "confirm": false }))
        .await
        .json();
    assert_eq!(declined["status"], "declined");
    assert_eq!(declined["live"]["home_score"], 1);

    let completed: Value = server
        .post("/live/finalize")
        .json(&json!({ "confirm": true }))
        .await
        .json();
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["fixture"]["score"], "1-0");
    assert_eq!(completed["fixture"]["result"], "Win");

    server.get("/live").await.assert_status(StatusCode::NOT_FOUND);

    let share: ShareLink = server
        .get(&format!("/fixtures/{}/share", fixture.id))
        .await
        .json();
    assert!(share.text.starts_with("FT: First Team 1-0 Athletic"));
    assert!(share.url.starts_with("https://wa.me/?text="));

    server
        .post("/live")
        .json(&json!({ "fixture_id": fixture.id }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let stats: StoreMetrics = server.get("/stats").await.json();
    assert_eq!(stats.successful_writes, 1);
}

#[tokio::test]
async fn test_fixture_routes() {
    let server = server();
    let first = create_fixture(&server, "First Team").await;
    create_fixture(&server, "Reserves").await;

    server
        .post("/fixtures")
        .json(&json!({
            "date": "2025-09-06",
            "opponent": "Athletic",
            "home_away": "Away",
            "team": "Veterans",
        }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let reserves: Vec<Fixture> = server
        .get("/fixtures")
        .add_query_param("team", "Reserves")
        .await
        .json();
    assert_eq!(reserves.len(), 1);

    server
        .get(&format!("/fixtures/{}/share", first.id))
        .await
        .assert_status(StatusCode::CONFLICT);

    let bad = server
        .post(&format!("/fixtures/{}/result", first.id))
        .json(&json!({ "score": "three-nil" }))
        .await;
    bad.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let updated: Fixture = server
        .post(&format!("/fixtures/{}/result", first.id))
        .json(&json!({ "score": "2-2" }))
        .await
        .json();
    assert_eq!(updated.score.as_deref(), Some("2-2"));

    let completed: Vec<Fixture> = server
        .get("/fixtures")
        .add_query_param("status", "Completed")
        .await
        .json();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, first.id);

    server
        .get("/fixtures/does-not-exist")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let players: Vec<Player> = server.get("/squads/First%20Team/players").await.json();
    assert_eq!(players.len(), 1);

    let squads: Vec<String> = server.get("/squads").await.json();
    assert_eq!(squads, vec!["First Team", "Reserves"]);
}

#[tokio::test]
async fn test_index_page_without_live_match() {
    let server = server();
    let page = server.get("/").await;
    page.assert_status_ok();
    assert!(page.text().contains("No live match"));
    server.delete("/live").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_markup_in_event_names_stays_text() {
    let server = server();
    let response = server
        .post("/fixtures")
        .json(&json!({
            "date": "2025-09-13",
            "opponent": "<b>Athletic</b>",
            "home_away": "Away",
            "team": "First Team",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let fixture: Fixture = response.json();

    server
        .post("/live")
        .json(&json!({ "fixture_id": fixture.id }))
        .await
        .assert_status(StatusCode::CREATED);

    let shirt = "<img src=x onerror=alert(1)>";
    let goal: Value = server
        .post("/live/goal")
        .json(&json!({ "side": "Home", "shirt_number": shirt }))
        .await
        .json();
    assert_eq!(goal["status"], "recorded");
    assert_eq!(goal["event"]["shirt_number"], shirt);

    let page = server.get("/").await.text();
    assert!(page.contains("&lt;b&gt;Athletic&lt;/b&gt; v First Team"));
    assert!(!page.contains("<b>Athletic</b>"));
    assert!(!page.contains(shirt));
    assert!(!page.contains("innerHTML"));
    assert!(page.contains("item.textContent"));
}
