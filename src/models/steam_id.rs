use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr, sync::LazyLock};

use crate::error::{AppError, AppResult};

/// Every individual-account SteamID64 starts with this prefix
pub const STEAM_ID_PREFIX: &str = "7656119";

static STEAM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^7656119\d{10}$").expect("valid regex"));

static PROFILE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"steamcommunity\.com/profiles/(\d+)").expect("valid regex"));

static VANITY_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"steamcommunity\.com/id/([^/?#\s]+)").expect("valid regex"));

static VANITY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{2,32}$").expect("valid regex"));

/// A validated 64-bit Steam account identifier (17 digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SteamId(String);

impl SteamId {
    /// True when `candidate` is a SteamID64: the fixed prefix followed by 10 digits
    pub fn is_valid(candidate: &str) -> bool {
        STEAM_ID_RE.is_match(candidate)
    }

    pub fn parse(candidate: &str) -> AppResult<Self> {
        let trimmed = candidate.trim();
        if Self::is_valid(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(AppError::InvalidIdentifierFormat(candidate.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SteamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SteamId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SteamId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SteamId> for String {
    fn from(id: SteamId) -> Self {
        id.0
    }
}

/// The shapes a user may type to identify their Steam account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierInput {
    /// A SteamID64, given directly or inside a `/profiles/` URL
    Id(SteamId),
    /// A custom profile name that still needs a vanity lookup
    Vanity(String),
}

impl IdentifierInput {
    /// Normalizes a raw SteamID64, a profile URL, a custom URL or a bare custom name
    pub fn parse(input: &str) -> AppResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidIdentifierFormat(
                "identifier is empty".to_string(),
            ));
        }

        if SteamId::is_valid(trimmed) {
            return Ok(Self::Id(SteamId(trimmed.to_string())));
        }

        if let Some(captures) = PROFILE_URL_RE.captures(trimmed) {
            return SteamId::parse(&captures[1]).map(Self::Id);
        }

        if let Some(captures) = VANITY_URL_RE.captures(trimmed) {
            return Ok(Self::Vanity(captures[1].to_string()));
        }

        if VANITY_NAME_RE.is_match(trimmed) {
            return Ok(Self::Vanity(trimmed.to_string()));
        }

        Err(AppError::InvalidIdentifierFormat(input.to_string()))
    }
}
