//! Read operations for the `businesses` table.

use chrono::{DateTime, Utc};
use posdash_core::RawBusinessRecord;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A geocoded row from the `businesses` table.
///
/// Coordinates are read as `float8` so the pipeline sees plain degrees.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessRow {
    pub id: String,
    pub name: Option<String>,
    pub business_type: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_danone_customer: Option<bool>,
    pub last_photo_date: Option<DateTime<Utc>>,
    pub menu_items: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<BusinessRow> for RawBusinessRecord {
    fn from(row: BusinessRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            declared_type: row.business_type,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            is_customer: row.is_danone_customer.unwrap_or(false),
            last_activity_at: row.last_photo_date,
            menu_items: menu_items_from_json(row.menu_items),
        }
    }
}

/// Flattens the stored `menu_items` value into a list.
///
/// Older rows hold the array as a JSON-encoded string; anything that is not
/// an array after decoding becomes an empty menu.
#[must_use]
pub fn menu_items_from_json(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(encoded)) => match serde_json::from_str(&encoded) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Lists every business with both coordinates, most recently photographed first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_geocoded_businesses(pool: &PgPool) -> Result<Vec<BusinessRow>, DbError> {
    let rows = sqlx::query_as::<_, BusinessRow>(
        "SELECT \
             id::text AS id, name, type AS business_type, address, \
             latitude::float8 AS latitude, longitude::float8 AS longitude, \
             is_danone_customer, last_photo_date, menu_items, \
             created_at, updated_at \
         FROM businesses \
         WHERE latitude IS NOT NULL \
           AND longitude IS NOT NULL \
         ORDER BY last_photo_date DESC NULLS LAST, created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts businesses that have both coordinates.
///
/// Takes any executor so the database probe can run it on the connection it
/// already holds.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_geocoded_businesses<'e, E>(executor: E) -> Result<i64, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM businesses \
         WHERE latitude IS NOT NULL AND longitude IS NOT NULL",
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}
