//! State of one in-progress match: clock, running score and the three event
//! logs. Persisted only through [`LiveMatchSession::finalize`].

use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::clock::{format_elapsed, MatchClock};
use crate::error::MatchError;
use crate::store::FixtureStore;
use crate::types::{
    compute_result, score_string, Attribution, CardKind, Fixture, FixtureStatus, FixtureUpdate,
    MatchEvent, MatchResult, Player, Side,
};
use crate::utils::normalize_shirt_number;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Finalized,
}

/// What the user picked when crediting an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributionInput {
    None,
    Player(String),
    Shirt(String),
}

impl AttributionInput {
    pub fn from_parts(
        player_id: Option<String>,
        shirt_number: Option<String>,
    ) -> Result<Self, MatchError> {
        match (player_id, shirt_number) {
            (Some(_), Some(_)) => Err(MatchError::ConflictingAttribution),
            (Some(id), None) => Ok(AttributionInput::Player(id)),
            (None, Some(shirt)) => Ok(AttributionInput::Shirt(shirt)),
            (None, None) => Ok(AttributionInput::None),
        }
    }
}

/// Outcome of a recording operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Event(MatchEvent),
    /// The score moved but nobody was credited.
    ScoreOnly,
    /// Nothing changed; an empty shirt number was submitted.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    Declined,
    Completed(Fixture),
}

enum Resolved {
    Credit(Attribution),
    Nobody,
    Ignore,
}

#[derive(Debug)]
pub struct LiveMatchSession {
    fixture: Fixture,
    roster: Vec<Player>,
    clock: MatchClock,
    started: bool,
    finalized: bool,
    home_score: u32,
    away_score: u32,
    scorers: Vec<MatchEvent>,
    yellow_cards: Vec<MatchEvent>,
    red_cards: Vec<MatchEvent>,
}

impl LiveMatchSession {
    /// Begins tracking `fixture` with a zeroed clock, 0-0 score and empty logs.
    pub fn start(fixture: Fixture, roster: Vec<Player>, tick: Duration) -> Self {
        info!(
            fixture_id = %fixture.id,
            "Live match started: {} vs {} ({} players)",
            fixture.home_team(),
            fixture.away_team(),
            roster.len()
        );
        Self {
            fixture,
            roster,
            clock: MatchClock::new(tick),
            started: false,
            finalized: false,
            home_score: 0,
            away_score: 0,
            scorers: Vec::new(),
            yellow_cards: Vec::new(),
            red_cards: Vec::new(),
        }
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    pub fn home_score(&self) -> u32 {
        self.home_score
    }

    pub fn away_score(&self) -> u32 {
        self.away_score
    }

    pub fn scorers(&self) -> &[MatchEvent] {
        &self.scorers
    }

    pub fn yellow_cards(&self) -> &[MatchEvent] {
        &self.yellow_cards
    }

    pub fn red_cards(&self) -> &[MatchEvent] {
        &self.red_cards
    }

    pub fn state(&self) -> SessionState {
        if self.finalized {
            SessionState::Finalized
        } else if self.clock.is_running() {
            SessionState::Running
        } else if self.started {
            SessionState::Paused
        } else {
            SessionState::Idle
        }
    }

    fn ensure_open(&self) -> Result<(), MatchError> {
        if self.finalized {
            Err(MatchError::Finalized)
        } else {
            Ok(())
        }
    }

    pub fn toggle_clock(&mut self) -> Result<SessionState, MatchError> {
        self.ensure_open()?;
        self.started = true;
        let running = self.clock.toggle();
        info!(
            fixture_id = %self.fixture.id,
            "Clock {} at {}",
            if running { "running" } else { "paused" },
            self.clock.label()
        );
        Ok(self.state())
    }

    pub fn reset_clock(&mut self) -> Result<(), MatchError> {
        self.ensure_open()?;
        self.clock.reset();
        info!(fixture_id = %self.fixture.id, "Clock reset for {}", self.clock.half());
        Ok(())
    }

    pub fn switch_half(&mut self) -> Result<(), MatchError> {
        self.ensure_open()?;
        self.clock.switch_half();
        info!(fixture_id = %self.fixture.id, "Switched to {}", self.clock.half());
        Ok(())
    }

    fn score_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Home => &mut self.home_score,
            Side::Away => &mut self.away_score,
        }
    }

    fn is_club_side(&self, side: Side) -> bool {
        side == self.fixture.home_away
    }

    fn resolve(&self, input: &AttributionInput, club_player: bool) -> Result<Resolved, MatchError> {
        match input {
            AttributionInput::None => Ok(Resolved::Nobody),
            AttributionInput::Player(id) => {
                if !club_player {
                    return Err(MatchError::MismatchedAttribution(format!(
                        "Roster players can only be credited to {}",
                        self.fixture.team
                    )));
                }
                let player = self
                    .roster
                    .iter()
                    .find(|p| &p.id == id)
                    .ok_or_else(|| MatchError::UnknownPlayer(id.clone()))?;
                Ok(Resolved::Credit(Attribution::roster(player)))
            }
            AttributionInput::Shirt(raw) => {
                if club_player {
                    return Err(MatchError::MismatchedAttribution(format!(
                        "Shirt numbers are only used for {}",
                        self.fixture.opponent
                    )));
                }
                Ok(match normalize_shirt_number(raw) {
                    Some(shirt_number) => Resolved::Credit(Attribution::Shirt { shirt_number }),
                    None => Resolved::Ignore,
                })
            }
        }
    }

    fn event(&self, attribution: Attribution, club_player: bool) -> MatchEvent {
        let team = if club_player {
            self.fixture.team.clone()
        } else {
            self.fixture.opponent.clone()
        };
        MatchEvent {
            attribution,
            time: self.clock.label(),
            team,
        }
    }

    /// Adds a goal for `side` and credits it when an attribution is given.
    ///
    /// Without attribution only the score moves. An empty shirt number
    /// cancels the whole operation.
    pub fn record_goal(
        &mut self,
        side: Side,
        attribution: AttributionInput,
    ) -> Result<Recorded, MatchError> {
        self.ensure_open()?;
        let club = self.is_club_side(side);
        let resolved = self.resolve(&attribution, club)?;
        if matches!(resolved, Resolved::Ignore) {
            return Ok(Recorded::Ignored);
        }

        *self.score_mut(side) += 1;
        let recorded = match resolved {
            Resolved::Credit(attribution) => {
                let event = self.event(attribution, club);
                self.scorers.push(event.clone());
                Recorded::Event(event)
            }
            _ => Recorded::ScoreOnly,
        };
        info!(
            fixture_id = %self.fixture.id,
            "Goal for {} at {}: {}-{}",
            self.fixture.team_on(side),
            self.clock.label(),
            self.home_score,
            self.away_score
        );
        Ok(recorded)
    }

    /// Corrects a miscount without touching the scorer log. Scores never
    /// drop below zero. Returns the new score for `side`.
    pub fn adjust_score(&mut self, side: Side, delta: i32) -> Result<u32, MatchError> {
        self.ensure_open()?;
        let score = self.score_mut(side);
        *score = score.saturating_add_signed(delta);
        let score = *score;
        info!(
            fixture_id = %self.fixture.id,
            "Score for {} adjusted by {} to {}",
            self.fixture.team_on(side),
            delta,
            score
        );
        Ok(score)
    }

    /// Credits a goal to a player without changing the score.
    pub fn record_goal_event(
        &mut self,
        side: Side,
        attribution: AttributionInput,
    ) -> Result<Recorded, MatchError> {
        self.ensure_open()?;
        let club = self.is_club_side(side);
        match self.resolve(&attribution, club)? {
            Resolved::Credit(attribution) => {
                let event = self.event(attribution, club);
                self.scorers.push(event.clone());
                Ok(Recorded::Event(event))
            }
            Resolved::Nobody | Resolved::Ignore => Ok(Recorded::Ignored),
        }
    }

    /// Logs a card. `player_or_shirt` is a roster id when
    /// `tracked_club_player` is set and an opposition shirt number otherwise.
    /// Cards are purely additive; a second yellow is not turned into a red.
    pub fn record_card(
        &mut self,
        kind: CardKind,
        player_or_shirt: &str,
        tracked_club_player: bool,
    ) -> Result<Recorded, MatchError> {
        self.ensure_open()?;
        let input = if tracked_club_player {
            if player_or_shirt.trim().is_empty() {
                return Ok(Recorded::Ignored);
            }
            AttributionInput::Player(player_or_shirt.trim().to_string())
        } else {
            AttributionInput::Shirt(player_or_shirt.to_string())
        };

        let attribution = match self.resolve(&input, tracked_club_player)? {
            Resolved::Credit(attribution) => attribution,
            Resolved::Nobody | Resolved::Ignore => return Ok(Recorded::Ignored),
        };
        let event = self.event(attribution, tracked_club_player);
        match kind {
            CardKind::Yellow => self.yellow_cards.push(event.clone()),
            CardKind::Red => self.red_cards.push(event.clone()),
        }
        info!(
            fixture_id = %self.fixture.id,
            "{} card for {} ({}) at {}",
            kind,
            event.attribution.player_name(),
            event.team,
            event.time
        );
        Ok(Recorded::Event(event))
    }

    pub fn result(&self) -> MatchResult {
        compute_result(self.fixture.home_away, self.home_score, self.away_score)
    }

    pub fn final_update(&self) -> FixtureUpdate {
        FixtureUpdate {
            score: Some(score_string(self.home_score, self.away_score)),
            result: Some(self.result()),
            status: Some(FixtureStatus::Completed),
            scorers: Some(self.scorers.clone()),
            yellow_cards: Some(self.yellow_cards.clone()),
            red_cards: Some(self.red_cards.clone()),
        }
    }

    /// Writes the final score, result and event logs to the store.
    ///
    /// Declining leaves the session untouched. A failed write is returned and
    /// the session stays open (clock paused) so the caller can retry.
    pub async fn finalize(
        &mut self,
        store: &dyn FixtureStore,
        confirmation: Confirmation,
    ) -> Result<FinalizeOutcome, MatchError> {
        self.ensure_open()?;
        if confirmation == Confirmation::Declined {
            info!(fixture_id = %self.fixture.id, "Finalize declined");
            return Ok(FinalizeOutcome::Declined);
        }

        self.clock.pause();
        let update = self.final_update();
        if let Err(e) = store.write(&self.fixture.id, &update).await {
            warn!(fixture_id = %self.fixture.id, "Failed to persist final result: {}", e);
            return Err(MatchError::Store(e));
        }

        self.finalized = true;
        self.fixture.apply(&update);
        info!(
            fixture_id = %self.fixture.id,
            "Match finalized: {} {} ({})",
            self.fixture.team,
            update.score.as_deref().unwrap_or_default(),
            self.result()
        );
        Ok(FinalizeOutcome::Completed(self.fixture.clone()))
    }

    pub fn view(&self) -> LiveView {
        let home_team = self.fixture.home_team().to_string();
        let away_team = self.fixture.away_team().to_string();
        let elapsed = self.clock.elapsed();
        LiveView {
            fixture_id: self.fixture.id.clone(),
            team: self.fixture.team.clone(),
            opponent: self.fixture.opponent.clone(),
            home_away: self.fixture.home_away,
            state: self.state(),
            half: self.clock.half().number(),
            elapsed_seconds: elapsed,
            clock: format_elapsed(elapsed),
            home_score: self.home_score,
            away_score: self.away_score,
            home: self.events_for(&home_team),
            away: self.events_for(&away_team),
            home_team,
            away_team,
        }
    }

    fn events_for(&self, team: &str) -> TeamEvents {
        let pick = |events: &[MatchEvent]| {
            events
                .iter()
                .filter(|e| e.team == team)
                .cloned()
                .collect::<Vec<_>>()
        };
        TeamEvents {
            team: team.to_string(),
            goals: pick(&self.scorers),
            yellow_cards: pick(&self.yellow_cards),
            red_cards: pick(&self.red_cards),
        }
    }
}

/// Presentation snapshot of a live session.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LiveView {
    pub fixture_id: String,
    pub team: String,
    pub opponent: String,
    pub home_away: Side,
    pub home_team: String,
    pub away_team: String,
    pub state: SessionState,
    pub half: u8,
    pub elapsed_seconds: u32,
    pub clock: String,
    pub home_score: u32,
    pub away_score: u32,
    pub home: TeamEvents,
    pub away: TeamEvents,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamEvents {
    pub team: String,
    pub goals: Vec<MatchEvent>,
    pub yellow_cards: Vec<MatchEvent>,
    pub red_cards: Vec<MatchEvent>,
}
