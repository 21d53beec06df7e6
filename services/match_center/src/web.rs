use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::info;

use crate::center::{FixtureFilter, MatchCenter};
use crate::error::{MatchError, StoreError};
use crate::metrics::StoreMetrics;
use crate::session::{AttributionInput, Confirmation, FinalizeOutcome, LiveView, Recorded};
use crate::share::{whatsapp_link, ShareLink};
use crate::types::{CardKind, Fixture, FixtureStatus, MatchEvent, NewFixture, Player, Side};

#[derive(Clone)]
pub struct AppState {
    pub center: Arc<MatchCenter>,
    pub shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn new(center: Arc<MatchCenter>) -> Self {
        Self {
            center,
            shutdown_tx: Arc::new(Mutex::new(None)),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Match(MatchError),
    Conflict(String),
}

impl From<MatchError> for ApiError {
    fn from(e: MatchError) -> Self {
        ApiError::Match(e)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub retryable: bool,
}

fn status_for(e: &MatchError) -> StatusCode {
    match e {
        MatchError::NoActiveSession | MatchError::Store(StoreError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        MatchError::NotUpcoming(_) | MatchError::Finalized | MatchError::FixtureLive(_) => {
            StatusCode::CONFLICT
        }
        MatchError::UnknownPlayer(_)
        | MatchError::ConflictingAttribution
        | MatchError::MismatchedAttribution(_)
        | MatchError::InvalidScore(_)
        | MatchError::UnknownSquad(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MatchError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Match(e) => (
                status_for(&e),
                ErrorBody {
                    error: e.to_string(),
                    retryable: e.is_retryable(),
                },
            ),
            ApiError::Conflict(error) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    error,
                    retryable: false,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct FixtureQuery {
    pub team: Option<String>,
    pub status: Option<FixtureStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ResultRequest {
    pub score: String,
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub fixture_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub side: Side,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub shirt_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub side: Side,
    pub delta: i32,
}

#[derive(Debug, Deserialize)]
pub struct CardRequest {
    pub kind: CardKind,
    pub player_or_shirt: String,
    pub tracked_club_player: bool,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Recorded,
    ScoreOnly,
    Ignored,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub status: RecordStatus,
    pub event: Option<MatchEvent>,
    pub live: LiveView,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub score: u32,
    pub live: LiveView,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalizeResponse {
    Declined { live: LiveView },
    Completed { fixture: Fixture },
}

async fn record_response(center: &MatchCenter, recorded: Recorded) -> ApiResult<RecordResponse> {
    let (status, event) = match recorded {
        Recorded::Event(event) => (RecordStatus::Recorded, Some(event)),
        Recorded::ScoreOnly => (RecordStatus::ScoreOnly, None),
        Recorded::Ignored => (RecordStatus::Ignored, None),
    };
    Ok(Json(RecordResponse {
        status,
        event,
        live: center.view().await?,
    }))
}

pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let title = match state.center.view().await {
        Ok(live) => format!(
            "{} v {}",
            html_escape::encode_text(&live.home_team),
            html_escape::encode_text(&live.away_team)
        ),
        Err(_) => "No live match".to_string(),
    };
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Match Center</title>
    <script src="https://unpkg.com/@tailwindcss/browser@4"></script>
    <script>
        function fillEvents(id, events) {{
            const items = events.map(e => {{
                const item = document.createElement('li');
                item.textContent = (e.player_name || ('#' + e.shirt_number)) + ' ';
                const time = document.createElement('span');
                time.className = 'text-gray-500';
                time.textContent = e.time;
                item.appendChild(time);
                return item;
            }});
            document.getElementById(id).replaceChildren(...items);
        }}
        function updateLive() {{
            fetch('/live')
                .then(response => response.ok ? response.json() : null)
                .then(live => {{
                    const board = document.getElementById('board');
                    if (!live) {{
                        document.getElementById('title').textContent = 'No live match';
                        board.classList.add('hidden');
                        return;
                    }}
                    board.classList.remove('hidden');
                    document.getElementById('title').textContent = `${{live.home_team}} v ${{live.away_team}}`;
                    document.getElementById('clock').textContent = `${{live.half}}H ${{live.clock}}`;
                    document.getElementById('state').textContent = live.state;
                    document.getElementById('score').textContent = `${{live.home_score}} - ${{live.away_score}}`;
                    fillEvents('home_goals', live.home.goals);
                    fillEvents('away_goals', live.away.goals);
                    fillEvents('home_cards', live.home.yellow_cards.concat(live.home.red_cards));
                    fillEvents('away_cards', live.away.yellow_cards.concat(live.away.red_cards));
                }});
        }}
        setInterval(updateLive, 1000);
        updateLive();
    </script>
</head>
<body class="bg-gray-100 min-h-screen p-8">
    <div class="max-w-4xl mx-auto">
        <h1 class="text-3xl font-bold mb-8 text-gray-800" id="title">{}</h1>
        <div id="board" class="bg-white rounded-lg shadow-lg p-6">
            <div class="flex justify-between items-center mb-6">
                <p class="text-2xl font-mono text-blue-700" id="clock">1H 0:00</p>
                <p class="text-sm text-gray-500" id="state"></p>
                <p class="text-4xl font-bold text-gray-800" id="score">0 - 0</p>
            </div>
            <div class="grid grid-cols-2 gap-6">
                <div>
                    <h2 class="text-sm font-semibold text-green-600 mb-1">Goals</h2>
                    <ul id="home_goals"></ul>
                    <h2 class="text-sm font-semibold text-yellow-600 mt-4 mb-1">Cards</h2>
                    <ul id="home_cards"></ul>
                </div>
                <div>
                    <h2 class="text-sm font-semibold text-green-600 mb-1">Goals</h2>
                    <ul id="away_goals"></ul>
                    <h2 class="text-sm font-semibold text-yellow-600 mt-4 mb-1">Cards</h2>
                    <ul id="away_cards"></ul>
                </div>
            </div>
        </div>
    </div>
</body>
</html>"#,
        title
    ))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StoreMetrics> {
    Json(state.center.metrics().get_metrics())
}

pub async fn list_fixtures(
    State(state): State<AppState>,
    Query(query): Query<FixtureQuery>,
) -> ApiResult<Vec<Fixture>> {
    let filter = FixtureFilter {
        team: query.team,
        status: query.status,
    };
    Ok(Json(state.center.list_fixtures(&filter).await?))
}

pub async fn create_fixture(
    State(state): State<AppState>,
    Json(fixture): Json<NewFixture>,
) -> Result<(StatusCode, Json<Fixture>), ApiError> {
    let created = state.center.create_fixture(fixture).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_fixture(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Fixture> {
    Ok(Json(state.center.fixture(&id).await?))
}

pub async fn record_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResultRequest>,
) -> ApiResult<Fixture> {
    Ok(Json(state.center.record_result(&id, &request.score).await?))
}

pub async fn share_fixture(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ShareLink> {
    let fixture = state.center.fixture(&id).await?;
    whatsapp_link(&fixture)
        .map(Json)
        .ok_or_else(|| ApiError::Conflict(format!("Fixture {} has no result yet", id)))
}

pub async fn list_squads(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.center.squads().to_vec())
}

pub async fn squad_players(
    State(state): State<AppState>,
    Path(team): Path<String>,
) -> ApiResult<Vec<Player>> {
    Ok(Json(state.center.players(&team).await?))
}

pub async fn get_live(State(state): State<AppState>) -> ApiResult<LiveView> {
    Ok(Json(state.center.view().await?))
}

pub async fn start_live(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<(StatusCode, Json<LiveView>), ApiError> {
    let live = state.center.start_match(&request.fixture_id).await?;
    Ok((StatusCode::CREATED, Json(live)))
}

pub async fn discard_live(State(state): State<AppState>) -> StatusCode {
    if state.center.discard().await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn live_roster(State(state): State<AppState>) -> ApiResult<Vec<Player>> {
    Ok(Json(state.center.live_roster().await?))
}

pub async fn toggle_clock(State(state): State<AppState>) -> ApiResult<LiveView> {
    state.center.toggle_clock().await?;
    Ok(Json(state.center.view().await?))
}

pub async fn reset_clock(State(state): State<AppState>) -> ApiResult<LiveView> {
    state.center.reset_clock().await?;
    Ok(Json(state.center.view().await?))
}

pub async fn switch_half(State(state): State<AppState>) -> ApiResult<LiveView> {
    state.center.switch_half().await?;
    Ok(Json(state.center.view().await?))
}

pub async fn record_goal(
    State(state): State<AppState>,
    Json(request): Json<GoalRequest>,
) -> ApiResult<RecordResponse> {
    let attribution = AttributionInput::from_parts(request.player_id, request.shirt_number)?;
    let recorded = state.center.record_goal(request.side, attribution).await?;
    record_response(&state.center, recorded).await
}

pub async fn record_goal_event(
    State(state): State<AppState>,
    Json(request): Json<GoalRequest>,
) -> ApiResult<RecordResponse> {
    let attribution = AttributionInput::from_parts(request.player_id, request.shirt_number)?;
    let recorded = state.center.record_goal_event(request.side, attribution).await?;
    record_response(&state.center, recorded).await
}

pub async fn adjust_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<ScoreResponse> {
    let score = state.center.adjust_score(request.side, request.delta).await?;
    Ok(Json(ScoreResponse {
        score,
        live: state.center.view().await?,
    }))
}

pub async fn record_card(
    State(state): State<AppState>,
    Json(request): Json<CardRequest>,
) -> ApiResult<RecordResponse> {
    let recorded = state
        .center
        .record_card(request.kind, &request.player_or_shirt, request.tracked_club_player)
        .await?;
    record_response(&state.center, recorded).await
}

pub async fn finalize(
    State(state): State<AppState>,
    Json(request): Json<FinalizeRequest>,
) -> ApiResult<FinalizeResponse> {
    match state.center.finalize(Confirmation::from(request.confirm)).await? {
        FinalizeOutcome::Declined => Ok(Json(FinalizeResponse::Declined {
            live: state.center.view().await?,
        })),
        FinalizeOutcome::Completed(fixture) => Ok(Json(FinalizeResponse::Completed { fixture })),
    }
}

pub async fn shutdown_handler(State(state): State<AppState>) -> StatusCode {
    if let Some(tx) = state.shutdown_tx.lock().await.take() {
        let _ = tx.send(());
    }
    StatusCode::ACCEPTED
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stats", get(stats_handler))
        .route("/fixtures", get(list_fixtures).post(create_fixture))
        .route("/fixtures/{id}", get(get_fixture))
        .route("/fixtures/{id}/result", post(record_result))
        .route("/fixtures/{id}/share", get(share_fixture))
        .route("/squads", get(list_squads))
        .route("/squads/{team}/players", get(squad_players))
        .route("/live", get(get_live).post(start_live).delete(discard_live))
        .route("/live/roster", get(live_roster))
        .route("/live/clock/toggle", post(toggle_clock))
        .route("/live/clock/reset", post(reset_clock))
        .route("/live/half", post(switch_half))
        .route("/live/goal", post(record_goal))
        .route("/live/goal/event", post(record_goal_event))
        .route("/live/score", post(adjust_score))
        .route("/live/card", post(record_card))
        .route("/live/finalize", post(finalize))
        .route("/shutdown", post(shutdown_handler))
        .with_state(state)
}

/// Serves until `/shutdown` is hit or Ctrl-C arrives.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.lock().await = Some(shutdown_tx);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Match center available at http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_rx => info!("Shutdown requested"),
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        })
        .await?;
    Ok(())
}
