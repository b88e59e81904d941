//! # Location Repository
//!
//! Registry of warehouses, stores and dropship endpoints. Stock records
//! reference locations by id only; a record may exist for an unregistered
//! location.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockroom_core::requests::NewLocation;
use stockroom_core::Location;

/// Repository for locations.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    /// Creates a new LocationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// Registers a location. Codes are unique.
    pub async fn register(&self, req: &NewLocation) -> DbResult<Location> {
        req.validate()?;

        let location = Location {
            id: Uuid::new_v4().to_string(),
            code: req.code.trim().to_string(),
            name: req.name.trim().to_string(),
            kind: req.kind,
            address: req.address.clone(),
            created_at: Utc::now(),
        };

        debug!(code = %location.code, kind = ?location.kind, "Registering location");

        sqlx::query(
            r#"
            INSERT INTO locations (
                id, code, name, kind, line1, city, region, postal_code, country, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&location.id)
        .bind(&location.code)
        .bind(&location.name)
        .bind(location.kind)
        .bind(&location.address.line1)
        .bind(&location.address.city)
        .bind(&location.address.region)
        .bind(&location.address.postal_code)
        .bind(&location.address.country)
        .bind(location.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", location.code.clone()),
            other => other,
        })?;

        info!(id = %location.id, code = %location.code, "Location registered");
        Ok(location)
    }

    /// Gets a location by id.
    pub async fn get(&self, id: &str) -> DbResult<Location> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Location", id))
    }

    /// Gets a location by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Location> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Location", code))
    }

    /// All locations ordered by code.
    pub async fn list(&self) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>("SELECT * FROM locations ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::{Address, ErrorKind, LocationKind};

    fn warehouse(code: &str) -> NewLocation {
        NewLocation {
            code: code.to_string(),
            name: "UK Warehouse".to_string(),
            kind: LocationKind::Warehouse,
            address: Address {
                city: Some("Leeds".to_string()),
                country: Some("GB".to_string()),
                ..Address::default()
            },
        }
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.locations().register(&warehouse("WH-UK-01")).await.unwrap();

        let fetched = db.locations().get(&created.id).await.unwrap();
        assert_eq!(fetched.code, "WH-UK-01");
        assert_eq!(fetched.address.city.as_deref(), Some("Leeds"));

        let by_code = db.locations().get_by_code("WH-UK-01").await.unwrap();
        assert_eq!(by_code.id, created.id);
        assert_eq!(db.locations().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.locations().register(&warehouse("WH-UK-01")).await.unwrap();

        let err = db.locations().register(&warehouse("WH-UK-01")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(err.kind(), Some(ErrorKind::BadInput));
    }

    #[tokio::test]
    async fn test_missing_location() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.locations().get("nope").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }
}
