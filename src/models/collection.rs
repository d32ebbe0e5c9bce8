use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Game;

/// Default color for new user collections
pub const DEFAULT_COLLECTION_COLOR: &str = "#3b82f6";

/// A user-defined collection of owned games
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub color: String,
    /// App ids in insertion order, without duplicates
    #[serde(default)]
    pub game_ids: Vec<u32>,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(name: String, color: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            color: color.unwrap_or_else(|| DEFAULT_COLLECTION_COLOR.to_string()),
            game_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn contains(&self, appid: u32) -> bool {
        self.game_ids.contains(&appid)
    }

    /// Adds a game; returns false if it was already present
    pub fn add_game(&mut self, appid: u32) -> bool {
        if self.contains(appid) {
            return false;
        }
        self.game_ids.push(appid);
        true
    }

    /// Removes a game; returns false if it was not present
    pub fn remove_game(&mut self, appid: u32) -> bool {
        match self.game_ids.iter().position(|id| *id == appid) {
            Some(index) => {
                self.game_ids.remove(index);
                true
            }
            None => false,
        }
    }
}

/// A derived, never-persisted grouping of games by playtime heuristics
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoCollection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub games: Vec<Game>,
    pub count: usize,
}

/// Store price of a single app
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppPrice {
    pub appid: u32,
    /// Undiscounted price in major currency units
    pub price: f64,
    pub currency: String,
}

/// Estimated value of a library from store prices
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionValue {
    pub total: f64,
    pub currency: String,
    pub games_with_prices: usize,
    pub total_games: usize,
    /// True when the total was extrapolated from a sample of the library
    pub estimated: bool,
}

impl CollectionValue {
    pub fn empty(total_games: usize) -> Self {
        Self {
            total: 0.0,
            currency: "USD".to_string(),
            games_with_prices: 0,
            total_games,
            estimated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_collection_uses_default_color() {
        let collection = Collection::new("Backlog".to_string(), None);
        assert_eq!(collection.color, DEFAULT_COLLECTION_COLOR);
        assert!(collection.game_ids.is_empty());
    }

    #[test]
    fn test_add_game_is_idempotent() {
        let mut collection = Collection::new("Co-op".to_string(), Some("#10b981".to_string()));
        assert!(collection.add_game(620));
        assert!(!collection.add_game(620));
        assert!(collection.add_game(550));
        assert_eq!(collection.game_ids, vec![620, 550]);
    }

    #[test]
    fn test_remove_game() {
        let mut collection = Collection::new("Co-op".to_string(), None);
        collection.add_game(620);
        assert!(collection.remove_game(620));
        assert!(!collection.remove_game(620));
        assert!(collection.game_ids.is_empty());
    }

    #[test]
    fn test_collection_reads_browser_shape() {
        let json = r##"{
            "id": "1718000000000",
            "name": "Favorites",
            "gameIds": [220, 440],
            "color": "#ef4444",
            "createdAt": "2024-06-10T06:13:20.000Z"
        }"##;
        let collection: Collection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.id, "1718000000000");
        assert_eq!(collection.game_ids, vec![220, 440]);
    }
}
