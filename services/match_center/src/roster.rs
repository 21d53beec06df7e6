use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::StoreError;
use crate::types::Player;

/// Supplies the squad list used to resolve player selections.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Players whose team is `team`, sorted by last then first name.
    async fn list_players(&self, team: &str) -> Result<Vec<Player>, StoreError>;
}

#[derive(Debug, Deserialize)]
struct PlayerRecord {
    id: String,
    first_name: String,
    last_name: String,
    position: String,
    team: String,
}

impl From<PlayerRecord> for Player {
    fn from(record: PlayerRecord) -> Self {
        Player {
            id: record.id.trim().to_string(),
            first_name: record.first_name.trim().to_string(),
            last_name: record.last_name.trim().to_string(),
            position: record.position.trim().to_string(),
            team: record.team.trim().to_string(),
        }
    }
}

/// Reads players from a CSV file with the header
/// `id,first_name,last_name,position,team`.
pub fn read_players_csv(path: &Path) -> Result<Vec<Player>, StoreError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut players = Vec::new();
    for record in rdr.deserialize::<PlayerRecord>() {
        players.push(Player::from(record?));
    }
    Ok(players)
}

pub fn sort_players(players: &mut [Player]) {
    players.sort_by(|a, b| {
        a.last_name
            .cmp(&b.last_name)
            .then_with(|| a.first_name.cmp(&b.first_name))
    });
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryRoster {
    players: Vec<Player>,
}

impl InMemoryRoster {
    pub fn new(players: Vec<Player>) -> Self {
        Self { players }
    }

    pub fn load_csv(path: &Path) -> Result<Self, StoreError> {
        let players = read_players_csv(path)?;
        info!("Loaded {} players from {:?}", players.len(), path);
        Ok(Self::new(players))
    }
}

#[async_trait]
impl RosterProvider for InMemoryRoster {
    async fn list_players(&self, team: &str) -> Result<Vec<Player>, StoreError> {
        let mut players: Vec<Player> = self
            .players
            .iter()
            .filter(|p| p.team == team)
            .cloned()
            .collect();
        sort_players(&mut players);
        Ok(players)
    }
}
