//! Viewing spots
//!
//! A fixed curated list plus spots added by the user. User spots are kept in
//! the service database when one is open, otherwise only in memory. Curated
//! spots are read-only; ids are unique across both lists.

use anyhow::{Context, Result};
use chrono::Utc;
use nordlys_common::{LightPollution, ViewingSpot};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Curated list compiled into the binary
const BUILTIN_SPOTS: &str = include_str!("../data/viewing-spots.json");

#[derive(Debug, Error)]
pub enum SpotError {
    #[error(transparent)]
    Invalid(#[from] nordlys_common::Error),

    #[error("Spot id already in use: {0}")]
    DuplicateId(String),

    #[error("Spot {0} is curated and cannot be removed")]
    Curated(String),

    #[error("Spot not found: {0}")]
    NotFound(String),

    #[error("Spot storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Body of a request adding a user spot
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpot {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub description: String,
    pub light_pollution: LightPollution,
    #[serde(default)]
    pub access: String,
}

impl NewSpot {
    fn into_spot(self) -> ViewingSpot {
        let id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        ViewingSpot {
            id,
            name: self.name.trim().to_string(),
            lat: self.lat,
            lon: self.lon,
            description: self.description,
            light_pollution: self.light_pollution,
            access: self.access,
            user_added: true,
        }
    }
}

/// Parse a JSON array of curated spots
///
/// Invalid and duplicate entries are skipped with a warning.
pub fn parse_curated(json: &str) -> Result<Vec<ViewingSpot>> {
    let parsed: Vec<ViewingSpot> =
        serde_json::from_str(json).context("Curated spots are not a JSON array of spots")?;

    let mut spots: Vec<ViewingSpot> = Vec::with_capacity(parsed.len());
    for mut spot in parsed {
        if let Err(e) = spot.validate() {
            warn!("Skipping curated spot: {}", e);
            continue;
        }
        if spots.iter().any(|s| s.id == spot.id) {
            warn!("Skipping duplicate curated spot {}", spot.id);
            continue;
        }
        spot.user_added = false;
        spots.push(spot);
    }
    Ok(spots)
}

/// Read the curated list from `path`
pub fn load_curated(path: &Path) -> Result<Vec<ViewingSpot>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Read {} failed", path.display()))?;
    parse_curated(&json)
}

/// The compiled-in curated list
pub fn builtin_spots() -> Vec<ViewingSpot> {
    parse_curated(BUILTIN_SPOTS).unwrap_or_else(|e| {
        warn!("Built-in spot list unusable: {:#}", e);
        Vec::new()
    })
}

/// Curated plus user-added viewing spots
pub struct SpotRegistry {
    curated: Vec<ViewingSpot>,
    user: RwLock<Vec<ViewingSpot>>,
    pool: Option<SqlitePool>,
}

impl SpotRegistry {
    /// Registry whose user spots live only as long as the process
    pub fn new(curated: Vec<ViewingSpot>) -> Self {
        Self {
            curated,
            user: RwLock::new(Vec::new()),
            pool: None,
        }
    }

    /// Registry persisting user spots in `pool`, loading those already stored
    pub async fn with_pool(curated: Vec<ViewingSpot>, pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_spots (
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        let rows = sqlx::query("SELECT id, payload FROM user_spots ORDER BY created_at, rowid")
            .fetch_all(&pool)
            .await?;

        let mut user = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            match row.try_get::<Json<ViewingSpot>, _>("payload") {
                Ok(Json(mut spot)) => {
                    spot.user_added = true;
                    user.push(spot);
                }
                Err(e) => warn!(id = %id, error = %e, "Stored spot could not be decoded"),
            }
        }
        info!("{} user spots loaded", user.len());

        Ok(Self {
            curated,
            user: RwLock::new(user),
            pool: Some(pool),
        })
    }

    pub fn curated(&self) -> &[ViewingSpot] {
        &self.curated
    }

    pub async fn user_added(&self) -> Vec<ViewingSpot> {
        self.user.read().await.clone()
    }

    /// Curated spots first, then user spots in the order they were added
    pub async fn all(&self) -> Vec<ViewingSpot> {
        let user = self.user.read().await;
        self.curated.iter().chain(user.iter()).cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<ViewingSpot> {
        if let Some(spot) = self.curated.iter().find(|s| s.id == id) {
            return Some(spot.clone());
        }
        self.user.read().await.iter().find(|s| s.id == id).cloned()
    }

    /// Add a user spot
    ///
    /// # Errors
    /// `Invalid` for an empty name or unusable coordinates, `DuplicateId`
    /// when the id is taken, `Storage` when persisting fails.
    pub async fn add(&self, new: NewSpot) -> Result<ViewingSpot, SpotError> {
        let spot = new.into_spot();
        spot.validate()?;

        let mut user = self.user.write().await;
        if self.curated.iter().chain(user.iter()).any(|s| s.id == spot.id) {
            return Err(SpotError::DuplicateId(spot.id));
        }

        if let Some(pool) = &self.pool {
            sqlx::query("INSERT INTO user_spots (id, payload, created_at) VALUES (?, ?, ?)")
                .bind(&spot.id)
                .bind(Json(&spot))
                .bind(Utc::now())
                .execute(pool)
                .await?;
        }

        debug!(id = %spot.id, name = %spot.name, "User spot added");
        user.push(spot.clone());
        Ok(spot)
    }

    /// Remove a user spot, returning it
    pub async fn remove(&self, id: &str) -> Result<ViewingSpot, SpotError> {
        if self.curated.iter().any(|s| s.id == id) {
            return Err(SpotError::Curated(id.to_string()));
        }

        let mut user = self.user.write().await;
        let index = user
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SpotError::NotFound(id.to_string()))?;

        if let Some(pool) = &self.pool {
            sqlx::query("DELETE FROM user_spots WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await?;
        }

        debug!(id, "User spot removed");
        Ok(user.remove(index))
    }
}
