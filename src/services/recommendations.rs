//! Personalized "what to play next" recommendations
//!
//! The library is summarized, rendered into a bounded prompt and sent to the
//! text generator once. Every suggested owned game is reconciled against the
//! caller's library by name; anything that cannot be matched is dropped. When
//! the generator is missing, fails or returns nothing usable, a pair of local
//! picks is returned instead.

use std::{collections::HashMap, sync::Arc, sync::LazyLock};

use chrono::Utc;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{
        recommendation::{optional_number, LibraryAnalysis},
        ChatTurn, Game, NewGameSuggestion, Recommendation,
        RecommendationKind, RecommendationPreferences, RecommendationResult,
    },
    services::{
        analysis::{self, MAX_FAVORITES, MAX_RECENT},
        categorization,
        providers::{CompletionRequest, TextGenerator},
    },
};

/// Games listed individually in the prompt; the rest are summarized as a count
pub const MAX_PROMPT_GAMES: usize = 50;

const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Revisit candidates: more than five hours, less than fifty, nothing in the last two weeks
const REVISIT_MIN_MINUTES: u32 = 300;
const REVISIT_MAX_MINUTES: u32 = 3000;

const SYSTEM_PROMPT: &str = "You are an expert gaming consultant who analyzes Steam libraries \
and gives specific, personal recommendations.";

const FALLBACK_INSIGHTS: &str =
    "Recommendations were picked locally because the recommendation service is unavailable.";
const EMPTY_LIBRARY_INSIGHTS: &str = "Your library is empty. Add some games to get recommendations.";
const DEFAULT_INSIGHTS: &str = "Library analysis completed.";

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex")
});

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$").expect("valid regex")
});

/// One library entry as sent to the generator
#[derive(Debug, Clone, PartialEq)]
pub struct PromptGame {
    pub name: String,
    pub appid: u32,
    pub hours: u32,
    pub recent_hours: u32,
}

/// Everything the generator sees, bounded to `MAX_PROMPT_GAMES` listed games
#[derive(Debug, Clone)]
pub struct RecommendationPayload<'a> {
    pub analysis: &'a LibraryAnalysis,
    pub preferences: &'a RecommendationPreferences,
    pub games: Vec<PromptGame>,
    /// Games left out of the listing
    pub overflow: usize,
}

impl<'a> RecommendationPayload<'a> {
    pub fn build(
        games: &[Game],
        analysis: &'a LibraryAnalysis,
        preferences: &'a RecommendationPreferences,
    ) -> Self {
        let listed: Vec<PromptGame> = games
            .iter()
            .take(MAX_PROMPT_GAMES)
            .map(|g| PromptGame {
                name: g.name.clone(),
                appid: g.appid,
                hours: g.hours(),
                recent_hours: g.recent_hours(),
            })
            .collect();

        Self {
            analysis,
            preferences,
            overflow: games.len().saturating_sub(listed.len()),
            games: listed,
        }
    }

    pub fn render(&self) -> String {
        let a = self.analysis;
        let mut lines = vec![
            "Analyze this Steam library and recommend what to play.".to_string(),
            String::new(),
            "PROFILE:".to_string(),
            format!("- Total games: {}", a.total_games),
            format!("- Total playtime: {} hours", a.total_playtime),
            format!("- Average playtime per game: {} hours", a.average_playtime),
            format!("- Unplayed games: {}", a.categories.unplayed),
            format!("- Recently active games: {}", a.recent_activity.games_played),
            String::new(),
            "PREFERENCES:".to_string(),
            format!("- Mood: {}", self.preferences.mood.as_str()),
            format!("- Skip recently played: {}", self.preferences.skip_recent),
            format!("- {}", self.preferences.mood.context()),
            String::new(),
            "FAVORITES:".to_string(),
        ];

        lines.extend(
            a.favorites
                .iter()
                .take(MAX_FAVORITES)
                .map(|g| format!("- {} ({}h)", g.name, g.hours)),
        );

        lines.push(String::new());
        lines.push("RECENTLY ACTIVE:".to_string());
        lines.extend(
            a.recent_activity
                .most_active
                .iter()
                .take(MAX_RECENT)
                .map(|g| format!("- {} ({}h recent)", g.name, g.hours)),
        );

        lines.push(String::new());
        lines.push("LIBRARY:".to_string());
        lines.extend(self.games.iter().map(|g| {
            format!("- {} ({}h total, {}h recent)", g.name, g.hours, g.recent_hours)
        }));
        if self.overflow > 0 {
            lines.push(format!("... and {} more games", self.overflow));
        }

        let mut prompt = lines.join("\n");
        prompt.push_str(
            "\n\nReply with JSON only:\n\
             {\"ownedGameRecommendations\": [{\"type\": \"discover|revisit|quick|favorite|challenge\", \
             \"title\": \"...\", \"gameName\": \"exact name from the library\", \"reason\": \"...\", \
             \"confidence\": 0.9}], \
             \"newGameSuggestions\": [{\"title\": \"...\", \"reason\": \"...\", \"genre\": \"...\", \
             \"estimatedHours\": \"...\"}], \
             \"insights\": \"2-3 sentences about their habits\"}\n\
             Give 4 owned-game recommendations and 3 new games to buy.",
        );

        prompt
    }
}

/// An owned-game suggestion as written by the generator, before reconciliation
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedGame {
    #[serde(rename = "type", default = "unknown_kind")]
    pub kind: RecommendationKind,
    #[serde(default)]
    pub title: String,
    pub game_name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, deserialize_with = "optional_number")]
    pub confidence: Option<f64>,
}

fn unknown_kind() -> RecommendationKind {
    RecommendationKind::Other
}

/// The readable parts of a JSON reply; malformed entries are skipped one by one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredReply {
    pub owned_game_recommendations: Vec<SuggestedGame>,
    pub new_game_suggestions: Vec<NewGameSuggestion>,
    pub insights: Option<String>,
}

impl StructuredReply {
    /// `None` unless the value is a JSON object
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        Some(Self {
            owned_game_recommendations: readable_entries(object.get("ownedGameRecommendations")),
            new_game_suggestions: readable_entries(object.get("newGameSuggestions")),
            insights: object
                .get("insights")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn is_empty(&self) -> bool {
        self.owned_game_recommendations.is_empty()
            && self.new_game_suggestions.is_empty()
            && self.insights.as_deref().map_or(true, |s| s.trim().is_empty())
    }
}

fn readable_entries<T: DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable reply entry");
                None
            }
        })
        .collect()
}

/// The generator's answer, classified by shape
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Structured(StructuredReply),
    FreeText(String),
}

impl ModelReply {
    /// Classifies a raw reply. Blank replies, empty JSON objects and JSON that
    /// cannot be read are unusable.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        match extract_json_object(trimmed) {
            Some(value) => StructuredReply::from_value(&value)
                .filter(|reply| !reply.is_empty())
                .map(ModelReply::Structured),
            None if looks_like_json(trimmed) => {
                tracing::debug!("Generator reply looks like JSON but could not be read");
                None
            }
            None => Some(ModelReply::FreeText(trimmed.to_string())),
        }
    }
}

/// Tries the whole text, then a fenced block, then the outermost braces
fn extract_json_object(text: &str) -> Option<Value> {
    let fenced = FENCED_JSON
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());
    let braced = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&text[start..=end]),
        _ => None,
    };

    [Some(text), fenced, braced]
        .into_iter()
        .flatten()
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .find(Value::is_object)
}

fn looks_like_json(text: &str) -> bool {
    text.starts_with('{')
        || text.starts_with('[')
        || text.starts_with("```json")
        || text.contains("\"ownedGameRecommendations\"")
}

/// Candidate game names from the list lines of a prose reply
///
/// `1. **Hades**: great runs` and `- Hades - great runs` both yield `("Hades", "great runs")`.
pub fn free_text_candidates(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| LIST_ITEM.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().replace("**", "")))
        .filter_map(|item| {
            let (name, reason) = match item.split_once(':') {
                Some((name, reason)) => (name, reason),
                None => item.split_once(" - ").unwrap_or((item.as_str(), "")),
            };
            let name = name.trim().trim_matches('"').trim();
            (!name.is_empty()).then(|| (name.to_string(), reason.trim().to_string()))
        })
        .collect()
}

/// Case-insensitive exact-name index over the caller's games; first occurrence wins
struct LibraryIndex<'a> {
    by_name: HashMap<String, &'a Game>,
}

impl<'a> LibraryIndex<'a> {
    fn new(games: &'a [Game]) -> Self {
        let mut by_name = HashMap::with_capacity(games.len());
        for game in games {
            by_name.entry(game.name.trim().to_lowercase()).or_insert(game);
        }
        Self { by_name }
    }

    fn find(&self, name: &str) -> Option<&'a Game> {
        self.by_name.get(&name.trim().to_lowercase()).copied()
    }
}

/// Resolves structured suggestions to owned games, dropping the ones that are not owned
pub fn reconcile(suggestions: Vec<SuggestedGame>, games: &[Game]) -> Vec<Recommendation> {
    let index = LibraryIndex::new(games);

    suggestions
        .into_iter()
        .filter_map(|suggestion| {
            let Some(game) = index.find(&suggestion.game_name) else {
                tracing::debug!(
                    game_name = %suggestion.game_name,
                    "Dropping recommendation for a game not in the library"
                );
                return None;
            };

            Some(Recommendation {
                kind: suggestion.kind,
                title: if suggestion.title.trim().is_empty() {
                    game.name.clone()
                } else {
                    suggestion.title
                },
                game: game.clone(),
                reason: suggestion.reason,
                confidence: clamp_confidence(suggestion.confidence),
            })
        })
        .collect()
}

fn reconcile_free_text(text: &str, games: &[Game]) -> Vec<Recommendation> {
    let index = LibraryIndex::new(games);
    let mut seen = Vec::new();

    free_text_candidates(text)
        .into_iter()
        .filter_map(|(name, reason)| {
            let game = index.find(&name)?;
            if seen.contains(&game.appid) {
                return None;
            }
            seen.push(game.appid);

            Some(Recommendation {
                kind: kind_from_playtime(game),
                title: game.name.clone(),
                game: game.clone(),
                reason,
                confidence: DEFAULT_CONFIDENCE,
            })
        })
        .collect()
}

fn kind_from_playtime(game: &Game) -> RecommendationKind {
    if categorization::is_untouched(game) {
        RecommendationKind::Discover
    } else if game.is_recently_played() {
        RecommendationKind::Favorite
    } else {
        RecommendationKind::Revisit
    }
}

fn clamp_confidence(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

fn is_revisit_candidate(game: &Game) -> bool {
    game.playtime_forever > REVISIT_MIN_MINUTES
        && game.playtime_forever < REVISIT_MAX_MINUTES
        && !game.is_recently_played()
}

/// Local picks: one random untouched game and one random revisit candidate
pub fn fallback_recommendations(games: &[Game], rng: &mut StdRng) -> Vec<Recommendation> {
    let untouched: Vec<&Game> = games.iter().filter(|g| categorization::is_untouched(g)).collect();
    let revisit: Vec<&Game> = games.iter().filter(|g| is_revisit_candidate(g)).collect();

    let mut picks = Vec::with_capacity(2);

    if let Some(game) = untouched.choose(rng) {
        picks.push(Recommendation {
            kind: RecommendationKind::Discover,
            title: "Try Something New".to_string(),
            game: (*game).clone(),
            reason: "You own this game but haven't played it yet.".to_string(),
            confidence: 0.7,
        });
    }

    if let Some(game) = revisit.choose(rng) {
        picks.push(Recommendation {
            kind: RecommendationKind::Revisit,
            title: "Worth Revisiting".to_string(),
            game: (*game).clone(),
            reason: format!(
                "You've played this for {} hours. Time to return!",
                game.hours()
            ),
            confidence: 0.8,
        });
    }

    picks
}

/// Outcome of one generator round trip, before preferences are applied
struct Generated {
    recommendations: Vec<Recommendation>,
    new_game_suggestions: Vec<NewGameSuggestion>,
    insights: String,
}

#[derive(Clone)]
pub struct RecommendationEngine {
    generator: Option<Arc<dyn TextGenerator>>,
    model: String,
    seed: Option<u64>,
}

impl RecommendationEngine {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, model: String, seed: Option<u64>) -> Self {
        Self {
            generator,
            model,
            seed,
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Never fails: generator problems are logged and answered with local picks
    pub async fn recommend(
        &self,
        games: &[Game],
        preferences: &RecommendationPreferences,
    ) -> RecommendationResult {
        let analysis = analysis::analyze_library(games);

        if games.is_empty() {
            return RecommendationResult {
                analysis,
                recommendations: Vec::new(),
                new_game_suggestions: Vec::new(),
                insights: EMPTY_LIBRARY_INSIGHTS.to_string(),
                generated: false,
                timestamp: Utc::now(),
            };
        }

        let (generated, from_model) = match self.generate(games, &analysis, preferences).await {
            Ok(generated) => (generated, true),
            Err(e) => {
                tracing::warn!(error = %e, "Recommendation generation failed, using local picks");
                let generated = Generated {
                    recommendations: fallback_recommendations(games, &mut self.rng()),
                    new_game_suggestions: Vec::new(),
                    insights: FALLBACK_INSIGHTS.to_string(),
                };
                (generated, false)
            }
        };

        let mut recommendations = generated.recommendations;
        if preferences.skip_recent {
            recommendations.retain(|r| !r.game.is_recently_played());
        }

        tracing::info!(
            games = games.len(),
            recommendations = recommendations.len(),
            generated = from_model,
            mood = preferences.mood.as_str(),
            "Recommendations built"
        );

        RecommendationResult {
            analysis,
            recommendations,
            new_game_suggestions: generated.new_game_suggestions,
            insights: generated.insights,
            generated: from_model,
            timestamp: Utc::now(),
        }
    }

    async fn generate(
        &self,
        games: &[Game],
        analysis: &LibraryAnalysis,
        preferences: &RecommendationPreferences,
    ) -> AppResult<Generated> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("No text generator configured".to_string())
        })?;

        let payload = RecommendationPayload::build(games, analysis, preferences);
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatTurn::system(SYSTEM_PROMPT), ChatTurn::user(payload.render())],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let raw = generator.complete(&request).await?;

        match ModelReply::parse(&raw) {
            Some(ModelReply::Structured(reply)) => Ok(Generated {
                recommendations: reconcile(reply.owned_game_recommendations, games),
                new_game_suggestions: reply.new_game_suggestions,
                insights: reply
                    .insights
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_INSIGHTS.to_string()),
            }),
            Some(ModelReply::FreeText(text)) => {
                tracing::debug!("Generator replied with prose, extracting list items");
                Ok(Generated {
                    recommendations: reconcile_free_text(&text, games),
                    new_game_suggestions: Vec::new(),
                    insights: text,
                })
            }
            None => Err(AppError::Upstream(
                "Generator returned an unusable reply".to_string(),
            )),
        }
    }
}
