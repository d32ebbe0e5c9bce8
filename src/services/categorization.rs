use crate::models::{AutoCollection, Game};

/// Playtime thresholds in minutes
const TWO_HOURS: u32 = 2 * 60;
const ONE_HOUR: u32 = 60;
const FIVE_HOURS: u32 = 5 * 60;
const TEN_HOURS: u32 = 10 * 60;
const FIFTY_HOURS: u32 = 50 * 60;
const HUNDRED_HOURS: u32 = 100 * 60;

/// Static description of one auto-collection and its membership test
struct BucketRule {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    color: &'static str,
    icon: &'static str,
    matches: fn(&Game) -> bool,
}

/// Buckets are evaluated independently and may overlap. Order here is the output order.
const RULES: [BucketRule; 6] = [
    BucketRule {
        id: "auto-untouched",
        name: "Untouched",
        description: "Games you've never played",
        color: "#6b7280",
        icon: "🎮",
        matches: is_untouched,
    },
    BucketRule {
        id: "auto-abandoned",
        name: "Abandoned",
        description: "Games with little playtime that haven't been touched recently",
        color: "#ef4444",
        icon: "💀",
        matches: is_abandoned,
    },
    BucketRule {
        id: "auto-binge",
        name: "Binge-worthy",
        description: "Games you've been playing a lot recently",
        color: "#10b981",
        icon: "🔥",
        matches: is_binge_worthy,
    },
    BucketRule {
        id: "auto-completionist",
        name: "Completionist",
        description: "Games with 100+ hours of playtime",
        color: "#8b5cf6",
        icon: "👑",
        matches: is_completionist,
    },
    BucketRule {
        id: "auto-worth-revisiting",
        name: "Worth Revisiting",
        description: "Games with solid playtime that deserve more attention",
        color: "#f59e0b",
        icon: "🔄",
        matches: is_worth_revisiting,
    },
    BucketRule {
        id: "auto-quick-sessions",
        name: "Quick Sessions",
        description: "Perfect for short gaming sessions",
        color: "#06b6d4",
        icon: "⚡",
        matches: is_quick_session,
    },
];

pub const AUTO_COLLECTION_PREFIX: &str = "auto-";

pub fn is_untouched(game: &Game) -> bool {
    game.playtime_forever == 0
}

pub fn is_abandoned(game: &Game) -> bool {
    game.playtime_forever > 0 && game.playtime_forever < TWO_HOURS && !game.is_recently_played()
}

pub fn is_binge_worthy(game: &Game) -> bool {
    game.recent_minutes() >= FIVE_HOURS
}

pub fn is_completionist(game: &Game) -> bool {
    game.playtime_forever >= HUNDRED_HOURS
}

pub fn is_worth_revisiting(game: &Game) -> bool {
    (FIVE_HOURS..=FIFTY_HOURS).contains(&game.playtime_forever)
}

pub fn is_quick_session(game: &Game) -> bool {
    (ONE_HOUR..=TEN_HOURS).contains(&game.playtime_forever)
}

/// Partitions a library into the non-empty auto-collections
///
/// Pure and deterministic: games keep their input order inside each bucket and
/// buckets with no members are left out.
pub fn auto_collections(games: &[Game]) -> Vec<AutoCollection> {
    RULES
        .iter()
        .filter_map(|rule| {
            let members: Vec<Game> = games.iter().filter(|g| (rule.matches)(g)).cloned().collect();
            if members.is_empty() {
                return None;
            }
            Some(AutoCollection {
                id: rule.id.to_string(),
                name: rule.name.to_string(),
                description: rule.description.to_string(),
                color: rule.color.to_string(),
                icon: rule.icon.to_string(),
                count: members.len(),
                games: members,
            })
        })
        .collect()
}

/// Games of a single auto-collection; empty for unknown ids
pub fn games_in_auto_collection(collection_id: &str, games: &[Game]) -> Vec<Game> {
    match RULES.iter().find(|rule| rule.id == collection_id) {
        Some(rule) => games.iter().filter(|g| (rule.matches)(g)).cloned().collect(),
        None => Vec::new(),
    }
}

pub fn is_auto_collection_id(collection_id: &str) -> bool {
    collection_id.starts_with(AUTO_COLLECTION_PREFIX)
}


#[cfg(test)]
mod tests {
    use super::fixtures::game;
    use super::*;

    fn ids(collections: &[AutoCollection]) -> Vec<&str> {
        collections.iter().map(|c| c.id.as_str()).collect()
    }

    fn names(collection: &AutoCollection) -> Vec<&str> {
        collection.games.iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn test_three_game_library() {
        let games = vec![
            game(1, "A", 0, None),
            game(2, "B", 90, None),
            game(3, "C", 6000, Some(0)),
        ];

        let collections = auto_collections(&games);
        assert_eq!(
            ids(&collections),
            vec!["auto-untouched", "auto-abandoned", "auto-completionist"]
        );
        assert_eq!(names(&collections[0]), vec!["A"]);
        assert_eq!(names(&collections[1]), vec!["B"]);
        assert_eq!(names(&collections[2]), vec!["C"]);
        assert_eq!(collections[2].count, 1);
    }

    #[test]
    fn test_empty_library_has_no_buckets() {
        assert!(auto_collections(&[]).is_empty());
    }

    #[test]
    fn test_untouched_and_abandoned_are_disjoint() {
        let games = vec![
            game(1, "Zero", 0, None),
            game(2, "Tiny", 1, None),
            game(3, "Almost", 119, None),
        ];
        for g in &games {
            assert!(!(is_untouched(g) && is_abandoned(g)), "{} in both", g.name);
        }
    }

    #[test]
    fn test_recent_play_rescues_from_abandoned() {
        assert!(is_abandoned(&game(1, "Old", 30, None)));
        assert!(is_abandoned(&game(1, "Old", 30, Some(0))));
        assert!(!is_abandoned(&game(1, "Fresh", 30, Some(15))));
        assert!(!is_abandoned(&game(1, "Two hours", 120, None)));
    }

    #[test]
    fn test_worth_revisiting_and_quick_sessions_overlap() {
        let games = vec![game(1, "Eight hours", 480, None)];
        let collections = auto_collections(&games);
        assert_eq!(
            ids(&collections),
            vec!["auto-worth-revisiting", "auto-quick-sessions"]
        );
    }

    #[test]
    fn test_threshold_boundaries_are_inclusive() {
        assert!(is_binge_worthy(&game(1, "x", 300, Some(300))));
        assert!(!is_binge_worthy(&game(1, "x", 299, Some(299))));
        assert!(is_completionist(&game(1, "x", 6000, None)));
        assert!(!is_completionist(&game(1, "x", 5999, None)));
        assert!(is_worth_revisiting(&game(1, "x", 300, None)));
        assert!(is_worth_revisiting(&game(1, "x", 3000, None)));
        assert!(!is_worth_revisiting(&game(1, "x", 3001, None)));
        assert!(is_quick_session(&game(1, "x", 60, None)));
        assert!(is_quick_session(&game(1, "x", 600, None)));
        assert!(!is_quick_session(&game(1, "x", 59, None)));
    }

    #[test]
    fn test_bucket_preserves_input_order() {
        let games = vec![
            game(3, "Gamma", 0, None),
            game(1, "Alpha", 0, None),
            game(2, "Beta", 0, None),
        ];
        let collections = auto_collections(&games);
        assert_eq!(names(&collections[0]), vec!["Gamma", "Alpha", "Beta"]);
    }

    #[test]
    fn test_recomputing_yields_equal_buckets() {
        let games = vec![
            game(1, "A", 0, None),
            game(2, "B", 420, Some(360)),
            game(3, "C", 7000, None),
            game(4, "D", 65, None),
        ];
        assert_eq!(auto_collections(&games), auto_collections(&games));
    }

    #[test]
    fn test_games_in_auto_collection() {
        let games = vec![game(1, "A", 0, None), game(2, "B", 7000, None)];
        let completionist = games_in_auto_collection("auto-completionist", &games);
        assert_eq!(completionist.len(), 1);
        assert_eq!(completionist[0].name, "B");

        assert!(games_in_auto_collection("auto-binge", &games).is_empty());
        assert!(games_in_auto_collection("auto-nope", &games).is_empty());
    }
}
