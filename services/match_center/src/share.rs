use serde::{Deserialize, Serialize};

use crate::types::{Fixture, FixtureStatus, MatchEvent};

const WHATSAPP_BASE: &str = "https://wa.me/?text=";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareLink {
    pub text: String,
    pub url: String,
}

fn scorer_line(events: &[MatchEvent]) -> String {
    events
        .iter()
        .map(|e| format!("{} ({})", e.attribution.player_name(), e.time))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result message for a completed fixture. `None` while it is still upcoming.
pub fn result_message(fixture: &Fixture) -> Option<String> {
    if fixture.status != FixtureStatus::Completed {
        return None;
    }
    let score = fixture.score.as_deref()?;

    let mut lines = vec![format!(
        "FT: {} {} {}",
        fixture.home_team(),
        score,
        fixture.away_team()
    )];
    if let Some(result) = fixture.result {
        lines.push(format!("{}: {}", fixture.team, result));
    }
    if let Some(competition) = &fixture.competition {
        lines.push(format!("{} - {}", competition, fixture.date.format("%d %b %Y")));
    }

    let ours: Vec<MatchEvent> = fixture
        .scorers
        .iter()
        .filter(|e| e.team == fixture.team)
        .cloned()
        .collect();
    if !ours.is_empty() {
        lines.push(format!("Scorers: {}", scorer_line(&ours)));
    }
    if !fixture.red_cards.is_empty() {
        lines.push(format!("Red cards: {}", scorer_line(&fixture.red_cards)));
    }

    Some(lines.join("\n"))
}

pub fn whatsapp_link(fixture: &Fixture) -> Option<ShareLink> {
    let text = result_message(fixture)?;
    let url = format!("{}{}", WHATSAPP_BASE, urlencoding::encode(&text));
    Some(ShareLink { text, url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attribution, MatchResult, NewFixture, Side};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn completed() -> Fixture {
        let mut f = NewFixture {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            kickoff: None,
            opponent: "Rovers".to_string(),
            venue: None,
            home_away: Side::Away,
            competition: Some("County Cup".to_string()),
            team: "First Team".to_string(),
        }
        .into_fixture("f".to_string());
        f.status = FixtureStatus::Completed;
        f.score = Some("1-2".to_string());
        f.result = Some(MatchResult::Win);
        f.scorers = vec![
            MatchEvent {
                attribution: Attribution::Roster {
                    player_id: "p1".to_string(),
                    player_name: "Sam Kerr".to_string(),
                    position: "Forward".to_string(),
                },
                time: "1H 12:30".to_string(),
                team: "First Team".to_string(),
            },
            MatchEvent {
                attribution: Attribution::Shirt {
                    shirt_number: "9".to_string(),
                },
                time: "2H 3:00".to_string(),
                team: "Rovers".to_string(),
            },
        ];
        f
    }

    #[test]
    fn test_result_message() {
        assert_eq!(
            result_message(&completed()).unwrap(),
            "FT: Rovers 1-2 First Team\nFirst Team: Win\nCounty Cup - 01 Mar 2025\nScorers: Sam Kerr (1H 12:30)"
        );
    }

    #[test]
    fn test_upcoming_has_no_link() {
        let mut f = completed();
        f.status = FixtureStatus::Upcoming;
        assert!(whatsapp_link(&f).is_none());
    }

    #[test]
    fn test_link_is_encoded() {
        let link = whatsapp_link(&completed()).unwrap();
        assert!(link.url.starts_with("https://wa.me/?text=FT%3A%20Rovers%201-2"));
        assert!(!link.url.contains('\n'));
    }
}
