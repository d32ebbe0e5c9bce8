use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    db::{store::KeyValueStore, versioned},
    error::{AppError, AppResult},
    models::{Collection, Game, SteamId},
    services::categorization,
};

/// Partial update for a collection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// User-defined collections, stored as one list per owner
///
/// Every mutation is load → modify → save under a single lock, so concurrent
/// requests for the same owner cannot lose each other's writes.
#[derive(Clone)]
pub struct CollectionRepository {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl CollectionRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn key(owner: &SteamId) -> String {
        format!("collections:{}", owner)
    }

    pub async fn list(&self, owner: &SteamId) -> AppResult<Vec<Collection>> {
        let Some(raw) = self.store.get(&Self::key(owner)).await? else {
            return Ok(Vec::new());
        };
        Ok(versioned::decode::<Vec<Collection>>(&raw)?.data)
    }

    async fn save(&self, owner: &SteamId, collections: &[Collection]) -> AppResult<()> {
        let raw = versioned::encode(&collections)?;
        self.store.put(&Self::key(owner), raw).await
    }

    pub async fn get(&self, owner: &SteamId, collection_id: &str) -> AppResult<Collection> {
        self.list(owner)
            .await?
            .into_iter()
            .find(|c| c.id == collection_id)
            .ok_or_else(|| not_found(collection_id))
    }

    pub async fn create(
        &self,
        owner: &SteamId,
        name: &str,
        color: Option<String>,
    ) -> AppResult<Collection> {
        let name = validate_name(name)?;
        if let Some(color) = &color {
            validate_color(color)?;
        }

        let _guard = self.write_lock.lock().await;
        let mut collections = self.list(owner).await?;
        let collection = Collection::new(name, color);
        collections.push(collection.clone());
        self.save(owner, &collections).await?;

        tracing::info!(
            owner = %owner,
            collection_id = %collection.id,
            "Collection created"
        );

        Ok(collection)
    }

    pub async fn update(
        &self,
        owner: &SteamId,
        collection_id: &str,
        update: CollectionUpdate,
    ) -> AppResult<Collection> {
        let name = update.name.as_deref().map(validate_name).transpose()?;
        if let Some(color) = &update.color {
            validate_color(color)?;
        }

        self.mutate(owner, collection_id, |collection| {
            if let Some(name) = name {
                collection.name = name;
            }
            if let Some(color) = update.color {
                collection.color = color;
            }
        })
        .await
    }

    pub async fn delete(&self, owner: &SteamId, collection_id: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut collections = self.list(owner).await?;
        let before = collections.len();
        collections.retain(|c| c.id != collection_id);

        if collections.len() == before {
            return Err(not_found(collection_id));
        }

        self.save(owner, &collections).await?;
        tracing::info!(owner = %owner, collection_id = %collection_id, "Collection deleted");
        Ok(())
    }

    /// Idempotent: adding a game twice leaves one entry
    pub async fn add_game(
        &self,
        owner: &SteamId,
        collection_id: &str,
        appid: u32,
    ) -> AppResult<Collection> {
        self.mutate(owner, collection_id, |collection| {
            collection.add_game(appid);
        })
        .await
    }

    pub async fn remove_game(
        &self,
        owner: &SteamId,
        collection_id: &str,
        appid: u32,
    ) -> AppResult<Collection> {
        self.mutate(owner, collection_id, |collection| {
            collection.remove_game(appid);
        })
        .await
    }

    pub async fn collections_with_game(
        &self,
        owner: &SteamId,
        appid: u32,
    ) -> AppResult<Vec<Collection>> {
        Ok(self
            .list(owner)
            .await?
            .into_iter()
            .filter(|c| c.contains(appid))
            .collect())
    }

    /// Resolves a collection id against a library; `auto-*` ids are recomputed
    pub async fn games_in_collection(
        &self,
        owner: &SteamId,
        collection_id: &str,
        library: &[Game],
    ) -> AppResult<Vec<Game>> {
        if categorization::is_auto_collection_id(collection_id) {
            return Ok(categorization::games_in_auto_collection(
                collection_id,
                library,
            ));
        }

        let collection = self.get(owner, collection_id).await?;
        Ok(library
            .iter()
            .filter(|g| collection.contains(g.appid))
            .cloned()
            .collect())
    }

    async fn mutate<F>(&self, owner: &SteamId, collection_id: &str, apply: F) -> AppResult<Collection>
    where
        F: FnOnce(&mut Collection),
    {
        let _guard = self.write_lock.lock().await;
        let mut collections = self.list(owner).await?;
        let collection = collections
            .iter_mut()
            .find(|c| c.id == collection_id)
            .ok_or_else(|| not_found(collection_id))?;

        apply(collection);
        let updated = collection.clone();

        self.save(owner, &collections).await?;
        Ok(updated)
    }
}

fn not_found(collection_id: &str) -> AppError {
    AppError::NotFound(format!("Collection {} not found", collection_id))
}

fn validate_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "Collection name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Accepts `#rgb` or `#rrggbb`
fn validate_color(color: &str) -> AppResult<()> {
    let valid = color
        .strip_prefix('#')
        .map(|hex| (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("Invalid color {}", color)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;
    use crate::services::categorization::fixtures::game;

    fn repo() -> CollectionRepository {
        CollectionRepository::new(Arc::new(MemoryStore::new()))
    }

    fn owner() -> SteamId {
        SteamId::parse("76561197960287930").unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let repo = repo();
        let created = repo.create(&owner(), "  Backlog ", None).await.unwrap();
        assert_eq!(created.name, "Backlog");
        assert_eq!(created.color, "#3b82f6");

        let listed = repo.list(&owner()).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let repo = repo();
        repo.create(&owner(), "Mine", None).await.unwrap();
        let other = SteamId::parse("76561190000000001").unwrap();
        assert!(repo.list(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name_and_bad_color() {
        let repo = repo();
        assert!(matches!(
            repo.create(&owner(), "   ", None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            repo.create(&owner(), "x", Some("blue".to_string())).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_add_and_remove_games() {
        let repo = repo();
        let c = repo.create(&owner(), "Co-op", None).await.unwrap();

        repo.add_game(&owner(), &c.id, 620).await.unwrap();
        let after = repo.add_game(&owner(), &c.id, 620).await.unwrap();
        assert_eq!(after.game_ids, vec![620]);

        let with_game = repo.collections_with_game(&owner(), 620).await.unwrap();
        assert_eq!(with_game.len(), 1);

        let after = repo.remove_game(&owner(), &c.id, 620).await.unwrap();
        assert!(after.game_ids.is_empty());
        assert!(repo
            .collections_with_game(&owner(), 620)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = repo();
        let c = repo.create(&owner(), "Old", None).await.unwrap();

        let updated = repo
            .update(
                &owner(),
                &c.id,
                CollectionUpdate {
                    name: Some("New".to_string()),
                    color: Some("#abc".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.color, "#abc");
        assert_eq!(updated.created_at, c.created_at);

        repo.delete(&owner(), &c.id).await.unwrap();
        assert!(matches!(
            repo.delete(&owner(), &c.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let repo = repo();
        assert!(matches!(
            repo.add_game(&owner(), "missing", 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_games_in_collection_custom_and_auto() {
        let repo = repo();
        let library = vec![
            game(10, "Unplayed", 0, None),
            game(20, "Favourite", 7000, None),
            game(30, "Other", 400, None),
        ];

        let c = repo.create(&owner(), "Picks", None).await.unwrap();
        repo.add_game(&owner(), &c.id, 30).await.unwrap();
        repo.add_game(&owner(), &c.id, 10).await.unwrap();
        repo.add_game(&owner(), &c.id, 999).await.unwrap();

        let games = repo
            .games_in_collection(&owner(), &c.id, &library)
            .await
            .unwrap();
        let names: Vec<&str> = games.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Unplayed", "Other"]);

        let auto = repo
            .games_in_collection(&owner(), "auto-completionist", &library)
            .await
            .unwrap();
        assert_eq!(auto.len(), 1);
        assert_eq!(auto[0].appid, 20);
    }

    #[tokio::test]
    async fn test_reads_legacy_browser_list() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                "collections:76561197960287930",
                r##"[{"id": "1718000000000", "name": "Favorites", "gameIds": [220],
                      "color": "#ef4444", "createdAt": "2024-06-10T06:13:20.000Z"}]"##
                    .to_string(),
            )
            .await
            .unwrap();

        let repo = CollectionRepository::new(store);
        let listed = repo.list(&owner()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].game_ids, vec![220]);

        repo.add_game(&owner(), "1718000000000", 440).await.unwrap();
        let listed = repo.list(&owner()).await.unwrap();
        assert_eq!(listed[0].game_ids, vec![220, 440]);
    }
}
