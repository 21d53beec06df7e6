use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Which end of the fixture a thing belongs to. Also used as the club's
/// home/away indicator on a fixture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Away,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "Home"),
            Side::Away => write!(f, "Away"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FixtureStatus {
    Upcoming,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchResult {
    Win,
    Draw,
    Loss,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Win => write!(f, "Win"),
            MatchResult::Draw => write!(f, "Draw"),
            MatchResult::Loss => write!(f, "Loss"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Yellow,
    Red,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardKind::Yellow => write!(f, "yellow"),
            CardKind::Red => write!(f, "red"),
        }
    }
}

/// A scheduled or completed match, as kept in the fixture store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fixture {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub kickoff: Option<NaiveTime>,
    pub opponent: String,
    #[serde(default)]
    pub venue: Option<String>,
    pub home_away: Side,
    #[serde(default)]
    pub competition: Option<String>,
    pub team: String,
    pub status: FixtureStatus,
    #[serde(default)]
    pub result: Option<MatchResult>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub scorers: Vec<MatchEvent>,
    #[serde(default)]
    pub yellow_cards: Vec<MatchEvent>,
    #[serde(default)]
    pub red_cards: Vec<MatchEvent>,
}

impl Fixture {
    /// Team name playing on the given side of this fixture.
    pub fn team_on(&self, side: Side) -> &str {
        if side == self.home_away {
            &self.team
        } else {
            &self.opponent
        }
    }

    pub fn home_team(&self) -> &str {
        self.team_on(Side::Home)
    }

    pub fn away_team(&self) -> &str {
        self.team_on(Side::Away)
    }

    /// Applies a partial update. Fields left `None` keep their value.
    pub fn apply(&mut self, update: &FixtureUpdate) {
        if let Some(score) = &update.score {
            self.score = Some(score.clone());
        }
        if let Some(result) = update.result {
            self.result = Some(result);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(scorers) = &update.scorers {
            self.scorers = scorers.clone();
        }
        if let Some(yellow_cards) = &update.yellow_cards {
            self.yellow_cards = yellow_cards.clone();
        }
        if let Some(red_cards) = &update.red_cards {
            self.red_cards = red_cards.clone();
        }
    }

    pub fn sort_key(&self) -> (NaiveDate, Option<NaiveTime>) {
        (self.date, self.kickoff)
    }
}

/// Orders fixtures by date, then kickoff (fixtures without a kickoff time first).
pub fn by_schedule(a: &Fixture, b: &Fixture) -> Ordering {
    a.sort_key().cmp(&b.sort_key())
}

/// Input for creating a fixture. New fixtures always start `Upcoming`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFixture {
    pub date: NaiveDate,
    #[serde(default)]
    pub kickoff: Option<NaiveTime>,
    pub opponent: String,
    #[serde(default)]
    pub venue: Option<String>,
    pub home_away: Side,
    #[serde(default)]
    pub competition: Option<String>,
    pub team: String,
}

impl NewFixture {
    pub fn into_fixture(self, id: String) -> Fixture {
        Fixture {
            id,
            date: self.date,
            kickoff: self.kickoff,
            opponent: self.opponent,
            venue: self.venue,
            home_away: self.home_away,
            competition: self.competition,
            team: self.team,
            status: FixtureStatus::Upcoming,
            result: None,
            score: None,
            scorers: Vec::new(),
            yellow_cards: Vec::new(),
            red_cards: Vec::new(),
        }
    }
}

/// Partial fixture document sent to the store on write.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FixtureUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FixtureStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scorers: Option<Vec<MatchEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yellow_cards: Option<Vec<MatchEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red_cards: Option<Vec<MatchEvent>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Player {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub team: String,
}

impl Player {
    pub fn display_name(&self) -> String {
        crate::utils::display_name(&self.first_name, &self.last_name)
    }
}

/// Who an event is credited to. Club players come from the roster, opposition
/// players are only known by shirt number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "attribution", rename_all = "snake_case")]
pub enum Attribution {
    Roster {
        player_id: String,
        player_name: String,
        position: String,
    },
    Shirt {
        shirt_number: String,
    },
}

impl Attribution {
    pub fn roster(player: &Player) -> Self {
        Attribution::Roster {
            player_id: player.id.clone(),
            player_name: player.display_name(),
            position: player.position.clone(),
        }
    }

    pub fn player_name(&self) -> String {
        match self {
            Attribution::Roster { player_name, .. } => player_name.clone(),
            Attribution::Shirt { shirt_number } => format!("#{}", shirt_number),
        }
    }
}

/// A goal or card logged during a live match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEvent {
    #[serde(flatten)]
    pub attribution: Attribution,
    /// Match clock label, e.g. `1H 23:04`.
    pub time: String,
    pub team: String,
}

/// Result from the club's point of view given the home and away goal counts.
pub fn compute_result(home_away: Side, home_score: u32, away_score: u32) -> MatchResult {
    let (ours, theirs) = match home_away {
        Side::Home => (home_score, away_score),
        Side::Away => (away_score, home_score),
    };
    match ours.cmp(&theirs) {
        Ordering::Greater => MatchResult::Win,
        Ordering::Less => MatchResult::Loss,
        Ordering::Equal => MatchResult::Draw,
    }
}

pub fn score_string(home_score: u32, away_score: u32) -> String {
    format!("{}-{}", home_score, away_score)
}
