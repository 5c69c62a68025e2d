// Per-user favorites persisted as a JSON list under `<favorites_prefix><user id>`

use crate::auth::SessionContext;
use crate::catalog::{CatalogItem, CatalogKind, Itinerary};
use crate::config::StorageConfig;
use crate::store::{KeyValueStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum FavoritesError {
    #[error("Sign in to save favorites")]
    NotSignedIn,

    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteKind {
    Destination,
    Hotel,
    Guide,
    Vendor,
    Itinerary,
}

impl From<CatalogKind> for FavoriteKind {
    fn from(kind: CatalogKind) -> Self {
        match kind {
            CatalogKind::Destination => FavoriteKind::Destination,
            CatalogKind::Hotel => FavoriteKind::Hotel,
            CatalogKind::Guide => FavoriteKind::Guide,
            CatalogKind::Vendor => FavoriteKind::Vendor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FavoriteKind,
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub added_at: DateTime<Utc>,
}

// A favorite before it is stamped with `added_at`
#[derive(Debug, Clone, PartialEq)]
pub struct NewFavorite {
    pub id: String,
    pub kind: FavoriteKind,
    pub name: String,
    pub image: String,
    pub price: Option<u32>,
    pub rating: Option<f32>,
    pub location: Option<String>,
}

impl NewFavorite {
    fn stamp(self, added_at: DateTime<Utc>) -> FavoriteRecord {
        FavoriteRecord {
            id: self.id,
            kind: self.kind,
            name: self.name,
            image: self.image,
            price: self.price,
            rating: self.rating,
            location: self.location,
            added_at,
        }
    }
}

impl From<&CatalogItem> for NewFavorite {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: item.id().to_string(),
            kind: item.kind().into(),
            name: item.name().to_string(),
            image: item.image().to_string(),
            price: Some(item.price().amount),
            rating: Some(item.rating()),
            location: Some(item.location().to_string()),
        }
    }
}

impl From<&Itinerary> for NewFavorite {
    fn from(itinerary: &Itinerary) -> Self {
        Self {
            id: itinerary.id.clone(),
            kind: FavoriteKind::Itinerary,
            name: itinerary.title.clone(),
            image: itinerary.image.clone(),
            price: Some(itinerary.price),
            rating: Some(itinerary.rating),
            location: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

pub struct FavoritesStore {
    backend: Arc<dyn KeyValueStore>,
    storage: StorageConfig,
}

impl FavoritesStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, storage: StorageConfig) -> Self {
        Self { backend, storage }
    }

    // Shares the session's backend and key layout
    pub fn for_session(session: &SessionContext) -> Self {
        Self::new(Arc::clone(session.backend()), session.storage().clone())
    }

    fn key(&self, user_id: &str) -> String {
        self.storage.favorites_key(user_id)
    }

    // Empty without a session or when the stored list cannot be read
    pub fn list(&self, session: &SessionContext) -> Vec<FavoriteRecord> {
        match session.user_id() {
            Some(user_id) => decode(self.backend.get(&self.key(&user_id)).as_deref()),
            None => Vec::new(),
        }
    }

    pub fn is_favorite(&self, session: &SessionContext, id: &str) -> bool {
        self.list(session).iter().any(|favorite| favorite.id == id)
    }

    // Returns false when the id is already saved
    pub fn add(&self, session: &SessionContext, item: NewFavorite) -> Result<bool, FavoritesError> {
        let user_id = session.user_id().ok_or(FavoritesError::NotSignedIn)?;
        let mut item = Some(item);
        let mut added = false;

        self.modify(&user_id, |favorites| {
            if let Some(item) = item.take() {
                if !favorites.iter().any(|favorite| favorite.id == item.id) {
                    favorites.push(item.stamp(Utc::now()));
                    added = true;
                }
            }
        })?;

        debug!("Favorite add for user {}: added={}", user_id, added);
        Ok(added)
    }

    // Returns false when the id was not saved
    pub fn remove(&self, session: &SessionContext, id: &str) -> Result<bool, FavoritesError> {
        let user_id = session.user_id().ok_or(FavoritesError::NotSignedIn)?;
        let mut removed = false;

        self.modify(&user_id, |favorites| {
            let before = favorites.len();
            favorites.retain(|favorite| favorite.id != id);
            removed = favorites.len() != before;
        })?;

        debug!("Favorite remove for user {}: removed={}", user_id, removed);
        Ok(removed)
    }

    pub fn toggle(
        &self,
        session: &SessionContext,
        item: NewFavorite,
    ) -> Result<ToggleOutcome, FavoritesError> {
        let user_id = session.user_id().ok_or(FavoritesError::NotSignedIn)?;
        let mut item = Some(item);
        let mut outcome = ToggleOutcome::Added;

        self.modify(&user_id, |favorites| {
            if let Some(item) = item.take() {
                let before = favorites.len();
                favorites.retain(|favorite| favorite.id != item.id);
                if favorites.len() == before {
                    favorites.push(item.stamp(Utc::now()));
                    outcome = ToggleOutcome::Added;
                } else {
                    outcome = ToggleOutcome::Removed;
                }
            }
        })?;

        Ok(outcome)
    }

    pub fn clear(&self, session: &SessionContext) -> Result<(), FavoritesError> {
        let user_id = session.user_id().ok_or(FavoritesError::NotSignedIn)?;
        self.backend.remove(&self.key(&user_id))?;
        Ok(())
    }

    // One read-modify-write through the backend
    fn modify<F>(&self, user_id: &str, mut change: F) -> Result<(), FavoritesError>
    where
        F: FnMut(&mut Vec<FavoriteRecord>),
    {
        let mut encode_error = None;

        self.backend.update(&self.key(user_id), &mut |current| {
            let mut favorites = decode(current);
            change(&mut favorites);
            match serde_json::to_string(&favorites) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    encode_error = Some(e);
                    current.map(str::to_string)
                }
            }
        })?;

        match encode_error {
            Some(e) => Err(StoreError::from(e).into()),
            None => Ok(()),
        }
    }
}

fn decode(raw: Option<&str>) -> Vec<FavoriteRecord> {
    match raw {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("Error parsing favorites: {}", e);
            Vec::new()
        }),
        None => Vec::new(),
    }
}
