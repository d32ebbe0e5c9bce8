use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::Game;

/// What the player feels like playing right now
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Any,
    Chill,
    Action,
    Nostalgia,
    Discover,
    Completion,
    Multiplayer,
    Creative,
    Brain,
    Story,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Any => "any",
            Mood::Chill => "chill",
            Mood::Action => "action",
            Mood::Nostalgia => "nostalgia",
            Mood::Discover => "discover",
            Mood::Completion => "completion",
            Mood::Multiplayer => "multiplayer",
            Mood::Creative => "creative",
            Mood::Brain => "brain",
            Mood::Story => "story",
        }
    }

    /// One-line steer for the language model
    pub fn context(&self) -> &'static str {
        match self {
            Mood::Any => "No particular mood; recommend a varied mix.",
            Mood::Chill => "Wants something relaxing and low-stress: puzzles, exploration, building.",
            Mood::Action => "Wants high energy: shooters, racing, intense action.",
            Mood::Nostalgia => "Wants to return to older favourites or games that feel nostalgic.",
            Mood::Discover => "Wants unplayed games or hidden gems already in the library.",
            Mood::Completion => "Wants to finish games that were started but never completed.",
            Mood::Multiplayer => "Wants social games to play with friends, co-op or competitive.",
            Mood::Creative => "Wants building, crafting or other creative games.",
            Mood::Brain => "Wants mentally demanding games: strategy, puzzles, deep systems.",
            Mood::Story => "Wants narrative-driven games with strong characters.",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPreferences {
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub skip_recent: bool,
}

/// Request body for POST /api/recommendations
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    pub games: Vec<Game>,
    #[serde(default)]
    pub preferences: RecommendationPreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Discover,
    Revisit,
    Quick,
    Favorite,
    Challenge,
    SecondChance,
    #[serde(other)]
    Other,
}

/// A recommendation that always points at a game from the caller's library
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub title: String,
    pub game: Game,
    pub reason: String,
    /// In [0, 1]
    pub confidence: f64,
}

/// A game the player does not own yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewGameSuggestion {
    pub title: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub estimated_hours: String,
}

/// Accepts `"20"`, `"15-20"` or `20`; anything else reads as empty
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Accepts `0.9` or `"0.9"`; anything else reads as missing
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GameHours {
    pub name: String,
    pub hours: u32,
}

impl From<&Game> for GameHours {
    fn from(game: &Game) -> Self {
        Self {
            name: game.name.clone(),
            hours: game.hours(),
        }
    }
}

/// Mutually exclusive playtime bands
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCategories {
    pub unplayed: usize,
    pub short_sessions: usize,
    pub medium_sessions: usize,
    pub long_sessions: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub games_played: usize,
    /// Hours here are two-week hours
    pub most_active: Vec<GameHours>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LibraryAnalysis {
    pub total_games: usize,
    pub total_playtime: u32,
    pub average_playtime: u32,
    pub categories: SessionCategories,
    pub recent_activity: RecentActivity,
    pub favorites: Vec<GameHours>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub analysis: LibraryAnalysis,
    pub recommendations: Vec<Recommendation>,
    pub new_game_suggestions: Vec<NewGameSuggestion>,
    #[serde(rename = "aiInsights")]
    pub insights: String,
    /// False when the language model could not be used and local picks were returned
    pub generated: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_default_to_any() {
        let prefs: RecommendationPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs.mood, Mood::Any);
        assert!(!prefs.skip_recent);
    }

    #[test]
    fn test_preferences_camel_case() {
        let prefs: RecommendationPreferences =
            serde_json::from_str(r#"{"mood": "brain", "skipRecent": true}"#).unwrap();
        assert_eq!(prefs.mood, Mood::Brain);
        assert!(prefs.skip_recent);
    }

    #[test]
    fn test_unknown_mood_is_rejected() {
        let result = serde_json::from_str::<RecommendationPreferences>(r#"{"mood": "sleepy"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_suggestion_hours_accept_numbers() {
        let suggestion: NewGameSuggestion =
            serde_json::from_str(r#"{"title": "Black Mesa", "estimatedHours": 20}"#).unwrap();
        assert_eq!(suggestion.estimated_hours, "20");

        let suggestion: NewGameSuggestion =
            serde_json::from_str(r#"{"title": "Hades", "estimatedHours": "20-30"}"#).unwrap();
        assert_eq!(suggestion.estimated_hours, "20-30");

        let suggestion: NewGameSuggestion =
            serde_json::from_str(r#"{"title": "Celeste", "estimatedHours": null}"#).unwrap();
        assert_eq!(suggestion.estimated_hours, "");
    }

    #[test]
    fn test_unknown_kind_maps_to_other() {
        let kind: RecommendationKind = serde_json::from_str(r#""hidden_gem""#).unwrap();
        assert_eq!(kind, RecommendationKind::Other);
        let kind: RecommendationKind = serde_json::from_str(r#""second_chance""#).unwrap();
        assert_eq!(kind, RecommendationKind::SecondChance);
    }
}
