use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod chat;
pub mod collection;
pub mod recommendation;
pub mod steam_id;

pub use chat::{ChatRequest, ChatResponse, ChatRole, ChatTurn};
pub use collection::{AppPrice, AutoCollection, Collection, CollectionValue};
pub use recommendation::{
    Mood, NewGameSuggestion, Recommendation, RecommendationKind, RecommendationPreferences,
    RecommendationRequest, RecommendationResult,
};
pub use steam_id::{IdentifierInput, SteamId};

/// An owned game as reported by `IPlayerService/GetOwnedGames`
///
/// Field names follow the Steam Web API so the payload can be passed through unchanged.
/// Playtimes are in minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Game {
    pub appid: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub playtime_forever: u32,
    /// Minutes played over the trailing two weeks; absent when zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_2weeks: Option<u32>,
    #[serde(default)]
    pub img_icon_url: String,
    #[serde(default)]
    pub img_logo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_community_visible_stats: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_windows_forever: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_mac_forever: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_linux_forever: Option<u32>,
}

impl Game {
    /// Minutes played in the last two weeks, treating "absent" as zero
    pub fn recent_minutes(&self) -> u32 {
        self.playtime_2weeks.unwrap_or(0)
    }

    pub fn is_recently_played(&self) -> bool {
        self.recent_minutes() > 0
    }

    /// Whole hours played, rounded to nearest
    pub fn hours(&self) -> u32 {
        round_hours(self.playtime_forever)
    }

    pub fn recent_hours(&self) -> u32 {
        round_hours(self.recent_minutes())
    }
}

/// Rounds minutes to whole hours the way the dashboard displays them
pub fn round_hours(minutes: u32) -> u32 {
    minutes.saturating_add(30) / 60
}

/// Owned games list returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnedGames {
    pub game_count: u32,
    pub games: Vec<Game>,
}

/// Normalized Steam profile of the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SteamProfile {
    pub steam_id: SteamId,
    pub display_name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub profile_state: Option<u8>,
    #[serde(default)]
    pub visibility: Option<u8>,
    #[serde(default)]
    pub last_logoff: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
}

// ============================================================================
// Steam Web API Types
// ============================================================================

/// Raw envelope from GET /IPlayerService/GetOwnedGames/v0001/
#[derive(Debug, Deserialize)]
pub struct ApiOwnedGamesEnvelope {
    #[serde(default)]
    pub response: Option<ApiOwnedGames>,
}

#[derive(Debug, Deserialize)]
pub struct ApiOwnedGames {
    #[serde(default)]
    pub game_count: Option<u32>,
    #[serde(default)]
    pub games: Option<Vec<Game>>,
}

/// Raw envelope from GET /ISteamUser/GetPlayerSummaries/v0002/
#[derive(Debug, Deserialize)]
pub struct ApiPlayerSummariesEnvelope {
    #[serde(default)]
    pub response: Option<ApiPlayerSummaries>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPlayerSummaries {
    #[serde(default)]
    pub players: Vec<ApiPlayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPlayer {
    pub steamid: String,
    #[serde(default)]
    pub personaname: String,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub avatarmedium: Option<String>,
    #[serde(default)]
    pub avatarfull: Option<String>,
    #[serde(default)]
    pub profileurl: Option<String>,
    #[serde(default)]
    pub profilestate: Option<u8>,
    #[serde(default)]
    pub communityvisibilitystate: Option<u8>,
    #[serde(default)]
    pub lastlogoff: Option<i64>,
    #[serde(default)]
    pub loccountrycode: Option<String>,
}

impl TryFrom<ApiPlayer> for SteamProfile {
    type Error = crate::error::AppError;

    fn try_from(player: ApiPlayer) -> Result<Self, Self::Error> {
        let steam_id = SteamId::parse(&player.steamid).map_err(|_| {
            crate::error::AppError::Upstream(format!(
                "Steam returned malformed steamid {}",
                player.steamid
            ))
        })?;

        Ok(SteamProfile {
            steam_id,
            display_name: player.personaname,
            real_name: player.realname.filter(|name| !name.is_empty()),
            avatar_url: player.avatarfull.or(player.avatarmedium).or(player.avatar),
            profile_url: player.profileurl,
            profile_state: player.profilestate,
            visibility: player.communityvisibilitystate,
            last_logoff: player
                .lastlogoff
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            location: player.loccountrycode,
        })
    }
}

/// Raw envelope from GET /ISteamUser/ResolveVanityURL/v0001/
#[derive(Debug, Deserialize)]
pub struct ApiVanityEnvelope {
    #[serde(default)]
    pub response: Option<ApiVanityResult>,
}

#[derive(Debug, Deserialize)]
pub struct ApiVanityResult {
    pub success: u8,
    #[serde(default)]
    pub steamid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(minutes: u32) -> Game {
        Game {
            appid: 220,
            name: "Half-Life 2".to_string(),
            playtime_forever: minutes,
            playtime_2weeks: None,
            img_icon_url: "fcfb366051782b8ebf2aa297f3b746395858cb62".to_string(),
            img_logo_url: String::new(),
            has_community_visible_stats: None,
            playtime_windows_forever: None,
            playtime_mac_forever: None,
            playtime_linux_forever: None,
        }
    }

    #[test]
    fn test_round_hours() {
        assert_eq!(round_hours(0), 0);
        assert_eq!(round_hours(29), 0);
        assert_eq!(round_hours(90), 2);
        assert_eq!(round_hours(6000), 100);
        assert_eq!(game(90).hours(), 2);
        assert_eq!(game(90).recent_hours(), 0);
    }

    #[test]
    fn test_game_deserializes_steam_payload() {
        let json = r#"{
            "appid": 440,
            "name": "Team Fortress 2",
            "playtime_forever": 1234,
            "playtime_2weeks": 60,
            "img_icon_url": "e3f595a92552da3d664ad00277fad2107345f743",
            "has_community_visible_stats": true,
            "playtime_windows_forever": 1200,
            "playtime_mac_forever": 34,
            "playtime_linux_forever": 0
        }"#;

        let g: Game = serde_json::from_str(json).unwrap();
        assert_eq!(g.appid, 440);
        assert_eq!(g.recent_minutes(), 60);
        assert!(g.is_recently_played());
        assert_eq!(g.img_logo_url, "");
    }

    #[test]
    fn test_player_to_profile_prefers_full_avatar() {
        let player = ApiPlayer {
            steamid: "76561197960287930".to_string(),
            personaname: "Rabscuttle".to_string(),
            realname: Some(String::new()),
            avatar: Some("small.jpg".to_string()),
            avatarmedium: Some("medium.jpg".to_string()),
            avatarfull: None,
            profileurl: Some("https://steamcommunity.com/id/rabscuttle/".to_string()),
            profilestate: Some(1),
            communityvisibilitystate: Some(3),
            lastlogoff: Some(1_700_000_000),
            loccountrycode: Some("US".to_string()),
        };

        let profile = SteamProfile::try_from(player).unwrap();
        assert_eq!(profile.steam_id.as_str(), "76561197960287930");
        assert_eq!(profile.avatar_url.as_deref(), Some("medium.jpg"));
        assert_eq!(profile.real_name, None);
        assert_eq!(
            profile.last_logoff.unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[test]
    fn test_profile_serializes_camel_case() {
        let profile = SteamProfile {
            steam_id: SteamId::parse("76561197960287930").unwrap(),
            display_name: "Rabscuttle".to_string(),
            real_name: None,
            avatar_url: None,
            profile_url: None,
            profile_state: None,
            visibility: None,
            last_logoff: None,
            location: None,
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["steamId"], "76561197960287930");
        assert_eq!(value["displayName"], "Rabscuttle");
    }
}
