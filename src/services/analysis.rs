use std::cmp::Reverse;

use serde::Serialize;

use crate::models::{
    recommendation::{GameHours, LibraryAnalysis, RecentActivity, SessionCategories},
    round_hours, CollectionValue, Game,
};

/// Playtime bands in minutes
const SHORT_SESSION_LIMIT: u32 = 120;
const LONG_SESSION_START: u32 = 3000;
const FAVORITE_THRESHOLD: u32 = 1800;

pub const MAX_FAVORITES: usize = 10;
pub const MAX_RECENT: usize = 5;

/// Summarizes a library for the recommendation prompt
pub fn analyze_library(games: &[Game]) -> LibraryAnalysis {
    let total_minutes: u64 = games.iter().map(|g| u64::from(g.playtime_forever)).sum();
    let average_minutes = if games.is_empty() {
        0
    } else {
        total_minutes / games.len() as u64
    };

    let mut categories = SessionCategories::default();
    for game in games {
        match game.playtime_forever {
            0 => categories.unplayed += 1,
            m if m < SHORT_SESSION_LIMIT => categories.short_sessions += 1,
            m if m < LONG_SESSION_START => categories.medium_sessions += 1,
            _ => categories.long_sessions += 1,
        }
    }

    let recent = most_recent(games, usize::MAX);

    LibraryAnalysis {
        total_games: games.len(),
        total_playtime: hours_u64(total_minutes),
        average_playtime: hours_u64(average_minutes),
        categories,
        recent_activity: RecentActivity {
            games_played: recent.len(),
            most_active: recent
                .iter()
                .take(MAX_RECENT)
                .map(|g| GameHours {
                    name: g.name.clone(),
                    hours: g.recent_hours(),
                })
                .collect(),
        },
        favorites: favorites(games).iter().map(|g| GameHours::from(*g)).collect(),
    }
}

/// Games above 30 hours, most played first, capped at ten
pub fn favorites(games: &[Game]) -> Vec<&Game> {
    let mut picked: Vec<&Game> = games
        .iter()
        .filter(|g| g.playtime_forever > FAVORITE_THRESHOLD)
        .collect();
    picked.sort_by_key(|g| Reverse(g.playtime_forever));
    picked.truncate(MAX_FAVORITES);
    picked
}

/// Recently played games, most two-week playtime first
pub fn most_recent(games: &[Game], limit: usize) -> Vec<&Game> {
    let mut picked: Vec<&Game> = games.iter().filter(|g| g.is_recently_played()).collect();
    picked.sort_by_key(|g| Reverse(g.recent_minutes()));
    picked.truncate(limit);
    picked
}

fn hours_u64(minutes: u64) -> u32 {
    u32::try_from((minutes + 30) / 60).unwrap_or(u32::MAX)
}

/// Six-way breakdown used to steer the chat assistant
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatCategories<T> {
    pub unplayed: T,
    pub abandoned: T,
    pub worth_revisiting: T,
    pub actively_playing: T,
    pub completed: T,
    pub in_progress: T,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategorizedGame {
    pub name: String,
    pub hours: u32,
    pub recent: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnalysis {
    pub total_games: usize,
    pub total_playtime: u32,
    pub collection_value: CollectionValue,
    pub top_games: Vec<GameHours>,
    pub recent_games: Vec<GameHours>,
    pub games_by_category: ChatCategories<Vec<CategorizedGame>>,
}

impl ChatAnalysis {
    pub fn counts(&self) -> ChatCategories<usize> {
        let c = &self.games_by_category;
        ChatCategories {
            unplayed: c.unplayed.len(),
            abandoned: c.abandoned.len(),
            worth_revisiting: c.worth_revisiting.len(),
            actively_playing: c.actively_playing.len(),
            completed: c.completed.len(),
            in_progress: c.in_progress.len(),
        }
    }
}

/// Builds the chat-side analysis; the value estimate is computed by the caller
pub fn analyze_for_chat(games: &[Game], collection_value: CollectionValue) -> ChatAnalysis {
    let total_minutes: u64 = games.iter().map(|g| u64::from(g.playtime_forever)).sum();

    let mut top: Vec<&Game> = games.iter().filter(|g| g.playtime_forever > 0).collect();
    top.sort_by_key(|g| Reverse(g.playtime_forever));
    top.truncate(MAX_FAVORITES);

    let mut by_category: ChatCategories<Vec<CategorizedGame>> = ChatCategories::default();
    for game in games {
        let entry = || CategorizedGame {
            name: game.name.clone(),
            hours: game.hours(),
            recent: game.recent_hours(),
        };
        let minutes = game.playtime_forever;
        let mid_band = (SHORT_SESSION_LIMIT..LONG_SESSION_START).contains(&minutes);

        if minutes == 0 {
            by_category.unplayed.push(entry());
        }
        if minutes > 0 && minutes < SHORT_SESSION_LIMIT {
            by_category.abandoned.push(entry());
        }
        if mid_band && !game.is_recently_played() {
            by_category.worth_revisiting.push(entry());
        }
        if game.is_recently_played() {
            by_category.actively_playing.push(entry());
        }
        if minutes >= LONG_SESSION_START && !game.is_recently_played() {
            by_category.completed.push(entry());
        }
        if mid_band && game.is_recently_played() {
            by_category.in_progress.push(entry());
        }
    }

    ChatAnalysis {
        total_games: games.len(),
        total_playtime: hours_u64(total_minutes),
        collection_value,
        top_games: top.iter().map(|g| GameHours::from(*g)).collect(),
        recent_games: most_recent(games, MAX_RECENT)
            .iter()
            .map(|g| GameHours {
                name: g.name.clone(),
                hours: round_hours(g.recent_minutes()),
            })
            .collect(),
        games_by_category: by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::categorization::fixtures::game;

    #[test]
    fn test_empty_library_analysis() {
        let analysis = analyze_library(&[]);
        assert_eq!(analysis.total_games, 0);
        assert_eq!(analysis.average_playtime, 0);
        assert!(analysis.favorites.is_empty());
    }

    #[test]
    fn test_session_categories_are_exclusive() {
        let games = vec![
            game(1, "Unplayed", 0, None),
            game(2, "Short", 119, None),
            game(3, "Medium low", 120, None),
            game(4, "Medium high", 2999, None),
            game(5, "Long", 3000, None),
        ];
        let analysis = analyze_library(&games);
        assert_eq!(
            analysis.categories,
            SessionCategories {
                unplayed: 1,
                short_sessions: 1,
                medium_sessions: 2,
                long_sessions: 1,
            }
        );
        assert_eq!(analysis.total_playtime, 104);
    }

    #[test]
    fn test_favorites_sorted_and_capped() {
        let games: Vec<Game> = (1..=12)
            .map(|i| game(i, &format!("G{}", i), 1800 + i * 60, None))
            .collect();
        let analysis = analyze_library(&games);
        assert_eq!(analysis.favorites.len(), 10);
        assert_eq!(analysis.favorites[0].name, "G12");
        assert_eq!(analysis.favorites[9].name, "G3");
    }

    #[test]
    fn test_favorites_exclude_exactly_thirty_hours() {
        let games = vec![game(1, "Edge", 1800, None), game(2, "Over", 1801, None)];
        let picked = favorites(&games);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "Over");
    }

    #[test]
    fn test_recent_activity_top_five() {
        let games: Vec<Game> = (1..=7)
            .map(|i| game(i, &format!("R{}", i), 1000, Some(i * 60)))
            .chain(std::iter::once(game(99, "Idle", 1000, None)))
            .collect();
        let analysis = analyze_library(&games);
        assert_eq!(analysis.recent_activity.games_played, 7);
        assert_eq!(analysis.recent_activity.most_active.len(), 5);
        assert_eq!(analysis.recent_activity.most_active[0].name, "R7");
        assert_eq!(analysis.recent_activity.most_active[0].hours, 7);
    }

    #[test]
    fn test_chat_categories() {
        let games = vec![
            game(1, "Never", 0, None),
            game(2, "Dropped", 45, None),
            game(3, "Shelved", 900, None),
            game(4, "Current", 900, Some(120)),
            game(5, "Done", 4000, None),
            game(6, "Grinding", 4000, Some(600)),
        ];
        let analysis = analyze_for_chat(&games, CollectionValue::empty(games.len()));
        let counts = analysis.counts();
        assert_eq!(counts.unplayed, 1);
        assert_eq!(counts.abandoned, 1);
        assert_eq!(counts.worth_revisiting, 1);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.actively_playing, 2);
        assert_eq!(analysis.top_games[0].name, "Done");
        assert_eq!(analysis.recent_games[0].name, "Grinding");
    }
}
