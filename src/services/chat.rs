use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{ChatRequest, ChatResponse, ChatRole, ChatTurn},
    services::{
        analysis::{analyze_for_chat, CategorizedGame, ChatAnalysis},
        collection_value::{estimate_collection_value, PriceLookupSettings},
        providers::{CompletionRequest, PriceProvider, TextGenerator},
    },
};

/// Conversation turns carried over from the client
pub const MAX_HISTORY_TURNS: usize = 6;

const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.7;
const CATEGORY_SAMPLE: usize = 10;
const IN_PROGRESS_SAMPLE: usize = 5;

const ASSISTANT_RULES: &str = "You are a helpful gaming assistant with access to the user's \
Steam library. Recommend games from their library, analyze their habits and suggest what to \
play next.

Recommendation rules:
- Prefer unplayed games, games worth revisiting and games in progress.
- Avoid games with under two hours played; the user probably did not enjoy them.
- Avoid games with 50+ hours that are not being played; they are probably finished.
- Explain why a game fits, based on how the user plays.

Be conversational and specific.";

/// Library-aware chat assistant
#[derive(Clone)]
pub struct ChatAssistant {
    generator: Option<Arc<dyn TextGenerator>>,
    prices: Arc<dyn PriceProvider>,
    model: String,
    price_settings: PriceLookupSettings,
}

impl ChatAssistant {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        prices: Arc<dyn PriceProvider>,
        model: String,
        price_settings: PriceLookupSettings,
    ) -> Self {
        Self {
            generator,
            prices,
            model,
            price_settings,
        }
    }

    pub async fn reply(&self, request: ChatRequest) -> AppResult<ChatResponse> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AppError::InvalidInput("Message is required".to_string()));
        }

        let generator = self.generator.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Chat assistant is not configured".to_string())
        })?;

        let value = estimate_collection_value(
            Arc::clone(&self.prices),
            &request.games,
            self.price_settings,
        )
        .await;
        let analysis = analyze_for_chat(&request.games, value);

        let completion = CompletionRequest {
            model: self.model.clone(),
            messages: build_messages(&analysis, &request.chat_history, message),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let reply = generator.complete(&completion).await.map_err(|e| {
            tracing::error!(error = %e, generator = generator.name(), "Chat completion failed");
            match e {
                AppError::Upstream(_) => e,
                other => AppError::Upstream(other.to_string()),
            }
        })?;

        tracing::info!(
            games = request.games.len(),
            history = request.chat_history.len().min(MAX_HISTORY_TURNS),
            "Chat reply generated"
        );

        Ok(ChatResponse {
            message: reply,
            timestamp: Utc::now(),
        })
    }
}

/// System context, the tail of the history, then the new message
pub fn build_messages(analysis: &ChatAnalysis, history: &[ChatTurn], message: &str) -> Vec<ChatTurn> {
    let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);

    let mut messages = Vec::with_capacity(MAX_HISTORY_TURNS + 2);
    messages.push(ChatTurn::system(format!(
        "{}\n\n{}",
        ASSISTANT_RULES,
        render_context(analysis)
    )));
    messages.extend(history.iter().skip(skip).map(|turn| match turn.role {
        ChatRole::User => ChatTurn::user(turn.content.clone()),
        _ => ChatTurn::assistant(turn.content.clone()),
    }));
    messages.push(ChatTurn::user(message));
    messages
}

pub fn render_context(analysis: &ChatAnalysis) -> String {
    let counts = analysis.counts();
    let by = &analysis.games_by_category;
    let value = &analysis.collection_value;

    let mut lines = vec![
        "LIBRARY:".to_string(),
        format!("- Total games: {}", analysis.total_games),
        format!("- Total playtime: {} hours", analysis.total_playtime),
        format!(
            "- Collection value: ${:.2} ({}){}",
            value.total,
            value.currency,
            if value.estimated { ", estimated" } else { "" }
        ),
        String::new(),
        "CATEGORIES:".to_string(),
        format!("- Unplayed: {}", counts.unplayed),
        format!("- Abandoned (under 2h): {}", counts.abandoned),
        format!("- Worth revisiting (2-50h, not recent): {}", counts.worth_revisiting),
        format!("- In progress (2-50h, recent): {}", counts.in_progress),
        format!("- Actively playing: {}", counts.actively_playing),
        format!("- Likely completed (50h+, not recent): {}", counts.completed),
        String::new(),
        "TOP PLAYED:".to_string(),
    ];
    lines.extend(
        analysis
            .top_games
            .iter()
            .map(|g| format!("- {} ({}h)", g.name, g.hours)),
    );

    lines.push(String::new());
    lines.push("RECENTLY ACTIVE:".to_string());
    if analysis.recent_games.is_empty() {
        lines.push("- No recent activity".to_string());
    }
    lines.extend(
        analysis
            .recent_games
            .iter()
            .map(|g| format!("- {} ({}h recent)", g.name, g.hours)),
    );

    lines.push(String::new());
    lines.push("UNPLAYED:".to_string());
    lines.extend(
        by.unplayed
            .iter()
            .take(CATEGORY_SAMPLE)
            .map(|g| format!("- {}", g.name)),
    );

    lines.push(String::new());
    lines.push("WORTH REVISITING:".to_string());
    lines.extend(
        by.worth_revisiting
            .iter()
            .take(CATEGORY_SAMPLE)
            .map(|g| format!("- {} ({}h played)", g.name, g.hours)),
    );

    lines.push(String::new());
    lines.push("IN PROGRESS:".to_string());
    lines.extend(
        by.in_progress
            .iter()
            .take(IN_PROGRESS_SAMPLE)
            .map(|g| format!("- {} ({}h total, {}h recent)", g.name, g.hours, g.recent)),
    );

    let names = |games: &[CategorizedGame]| {
        games
            .iter()
            .take(CATEGORY_SAMPLE)
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    lines.push(String::new());
    lines.push("AVOID:".to_string());
    lines.push(format!("- Abandoned: {}", names(by.abandoned.as_slice())));
    lines.push(format!("- Likely completed: {}", names(by.completed.as_slice())));

    lines.join("\n")
}
