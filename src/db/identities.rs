use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::{store::KeyValueStore, versioned},
    error::AppResult,
    models::{SteamId, SteamProfile},
};

/// Sessions older than this are refused and removed on lookup
pub const SESSION_TTL_DAYS: i64 = 30;

/// Live sessions per identity; signing in again past this revokes the oldest
pub const MAX_SESSIONS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    steam_id: SteamId,
    created_at: DateTime<Utc>,
}

/// Signed-in identities, one record per SteamID64, plus the opaque session
/// tokens issued to them
#[derive(Clone)]
pub struct IdentityRepository {
    store: Arc<dyn KeyValueStore>,
    session_lock: Arc<Mutex<()>>,
}

impl IdentityRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            session_lock: Arc::new(Mutex::new(())),
        }
    }

    fn key(steam_id: &SteamId) -> String {
        format!("identity:{}", steam_id)
    }

    fn session_key(token: &str) -> String {
        format!("session:{}", token)
    }

    fn session_list_key(steam_id: &SteamId) -> String {
        format!("sessions:{}", steam_id)
    }

    pub async fn save(&self, profile: &SteamProfile) -> AppResult<()> {
        let raw = versioned::encode(profile)?;
        self.store.put(&Self::key(&profile.steam_id), raw).await?;
        tracing::info!(steam_id = %profile.steam_id, store = self.store.name(), "Identity saved");
        Ok(())
    }

    pub async fn load(&self, steam_id: &SteamId) -> AppResult<Option<SteamProfile>> {
        let Some(raw) = self.store.get(&Self::key(steam_id)).await? else {
            return Ok(None);
        };

        let decoded = versioned::decode::<SteamProfile>(&raw)?;
        if decoded.needs_upgrade() {
            self.save(&decoded.data).await?;
        }
        Ok(Some(decoded.data))
    }

    /// Logout. Returns whether an identity was stored.
    pub async fn delete(&self, steam_id: &SteamId) -> AppResult<bool> {
        let removed = self.store.delete(&Self::key(steam_id)).await?;
        tracing::info!(steam_id = %steam_id, removed, "Identity cleared");
        Ok(removed)
    }
}

impl IdentityRepository {
    /// Issues a new session token for a verified identity
    pub async fn start_session(&self, steam_id: &SteamId) -> AppResult<String> {
        let token = Uuid::new_v4().simple().to_string();
        let record = SessionRecord {
            steam_id: steam_id.clone(),
            created_at: Utc::now(),
        };

        let _guard = self.session_lock.lock().await;
        self.store
            .put(&Self::session_key(&token), versioned::encode(&record)?)
            .await?;

        let mut tokens = self.session_tokens(steam_id).await?;
        tokens.push(token.clone());
        let excess = tokens.len().saturating_sub(MAX_SESSIONS);
        for old in tokens.drain(..excess) {
            self.store.delete(&Self::session_key(&old)).await?;
        }
        self.store
            .put(&Self::session_list_key(steam_id), versioned::encode(&tokens)?)
            .await?;

        tracing::info!(steam_id = %steam_id, sessions = tokens.len(), "Session started");
        Ok(token)
    }

    /// The identity a live token belongs to
    pub async fn session_owner(&self, token: &str) -> AppResult<Option<SteamId>> {
        let key = Self::session_key(token);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let record = versioned::decode::<SessionRecord>(&raw)?.data;
        if Utc::now() - record.created_at > TimeDelta::days(SESSION_TTL_DAYS) {
            self.store.delete(&key).await?;
            tracing::debug!(steam_id = %record.steam_id, "Expired session refused");
            return Ok(None);
        }

        Ok(Some(record.steam_id))
    }

    /// Revokes every session of the identity. Returns how many were live.
    pub async fn end_sessions(&self, steam_id: &SteamId) -> AppResult<usize> {
        let _guard = self.session_lock.lock().await;
        let tokens = self.session_tokens(steam_id).await?;
        for token in &tokens {
            self.store.delete(&Self::session_key(token)).await?;
        }
        self.store.delete(&Self::session_list_key(steam_id)).await?;
        Ok(tokens.len())
    }

    async fn session_tokens(&self, steam_id: &SteamId) -> AppResult<Vec<String>> {
        match self.store.get(&Self::session_list_key(steam_id)).await? {
            Some(raw) => Ok(versioned::decode::<Vec<String>>(&raw)?.data),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;

    fn profile() -> SteamProfile {
        SteamProfile {
            steam_id: SteamId::parse("76561197960287930").unwrap(),
            display_name: "Rabscuttle".to_string(),
            real_name: None,
            avatar_url: Some("https://avatars.example/a.jpg".to_string()),
            profile_url: None,
            profile_state: Some(1),
            visibility: Some(3),
            last_logoff: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        let repo = IdentityRepository::new(Arc::new(MemoryStore::new()));
        let p = profile();

        assert_eq!(repo.load(&p.steam_id).await.unwrap(), None);
        repo.save(&p).await.unwrap();
        assert_eq!(repo.load(&p.steam_id).await.unwrap(), Some(p.clone()));

        assert!(repo.delete(&p.steam_id).await.unwrap());
        assert_eq!(repo.load(&p.steam_id).await.unwrap(), None);
        assert!(!repo.delete(&p.steam_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_legacy_browser_record_is_upgraded() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                "identity:76561197960287930",
                r#"{"steamId": "76561197960287930", "displayName": "Rabscuttle"}"#.to_string(),
            )
            .await
            .unwrap();

        let repo = IdentityRepository::new(store.clone());
        let loaded = repo
            .load(&SteamId::parse("76561197960287930").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.display_name, "Rabscuttle");

        let raw = store.get("identity:76561197960287930").await.unwrap().unwrap();
        assert!(raw.contains("\"schema_version\":1"));
    }

    #[tokio::test]
    async fn test_sessions_resolve_to_their_owner() {
        let repo = IdentityRepository::new(Arc::new(MemoryStore::new()));
        let owner = profile().steam_id;

        let first = repo.start_session(&owner).await.unwrap();
        let second = repo.start_session(&owner).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(first.len(), 32);

        assert_eq!(repo.session_owner(&first).await.unwrap(), Some(owner.clone()));
        assert_eq!(repo.session_owner(&second).await.unwrap(), Some(owner.clone()));
        assert_eq!(repo.session_owner("made-up").await.unwrap(), None);

        assert_eq!(repo.end_sessions(&owner).await.unwrap(), 2);
        assert_eq!(repo.session_owner(&first).await.unwrap(), None);
        assert_eq!(repo.session_owner(&second).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oldest_session_is_revoked_past_the_cap() {
        let repo = IdentityRepository::new(Arc::new(MemoryStore::new()));
        let owner = profile().steam_id;

        let oldest = repo.start_session(&owner).await.unwrap();
        for _ in 0..MAX_SESSIONS {
            repo.start_session(&owner).await.unwrap();
        }

        assert_eq!(repo.session_owner(&oldest).await.unwrap(), None);
        assert_eq!(repo.end_sessions(&owner).await.unwrap(), MAX_SESSIONS);
    }

    #[tokio::test]
    async fn test_expired_session_is_refused_and_removed() {
        let store = Arc::new(MemoryStore::new());
        let record = SessionRecord {
            steam_id: profile().steam_id,
            created_at: Utc::now() - TimeDelta::days(SESSION_TTL_DAYS + 1),
        };
        store
            .put("session:stale", versioned::encode(&record).unwrap())
            .await
            .unwrap();

        let repo = IdentityRepository::new(store.clone());
        assert_eq!(repo.session_owner("stale").await.unwrap(), None);
        assert_eq!(store.get("session:stale").await.unwrap(), None);
    }
}
