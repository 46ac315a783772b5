use rust_decimal::Decimal;
use sqlx::Row;

use vendo_core::domain::item::{ItemId, ItemSnapshot};

use super::{CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn snapshot_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ItemSnapshot, RepositoryError> {
    let unit_price = row
        .get::<String, _>("unit_price")
        .parse::<Decimal>()
        .map_err(|error| RepositoryError::Decode(format!("invalid unit_price: {error}")))?;
    Ok(ItemSnapshot {
        id: ItemId(row.get::<String, _>("id")),
        name: row.get::<String, _>("name"),
        brand: row.get::<String, _>("brand"),
        unit_price,
        category: row.get::<String, _>("category"),
    })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn find_by_id(&self, id: &ItemId) -> Result<Option<ItemSnapshot>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, brand, category, unit_price
             FROM items WHERE id = ?1 AND active = 1",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn search(&self, terms: &str, limit: u32) -> Result<Vec<ItemSnapshot>, RepositoryError> {
        let pattern = format!("%{}%", terms.trim());
        let rows = sqlx::query(
            "SELECT id, name, brand, category, unit_price
             FROM items
             WHERE active = 1 AND (name LIKE ?1 OR brand LIKE ?1 OR category LIKE ?1)
             ORDER BY name
             LIMIT ?2",
        )
        .bind(&pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }
}
