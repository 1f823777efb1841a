//! Result Materializer
//!
//! Hydrates phase rows into full listing aggregates. Side relations are read
//! in one batch per relation; a listing without a boost, characteristics or
//! location simply gets an empty field.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::Result;
use crate::storage::cancel::Cancellation;
use crate::storage::sqlite::{BoostRecord, CategoryRef, Database, ListingRow, LocationRecord};

/// A listing as returned to search clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub boosts: Vec<BoostRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationRecord>,
}

/// Hydrate `rows`, keeping their order.
pub fn materialize(
    db: &Database,
    rows: Vec<ListingRow>,
    cancel: &Cancellation,
) -> Result<Vec<Listing>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();

    let mut categories = db.categories_for(&ids, cancel)?;
    let mut boosts = db.boosts_for(&ids, cancel)?;
    let mut characteristics = db.characteristics_for(&ids, cancel)?;
    let mut locations = db.locations_for(&ids, cancel)?;

    let listings = rows
        .into_iter()
        .map(|row| {
            let characteristics = characteristics.remove(&row.id).and_then(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|err| {
                        warn!(listing = %row.id, error = %err, "unreadable characteristics");
                    })
                    .ok()
            });
            Listing {
                categories: categories.remove(&row.id).unwrap_or_default(),
                boosts: boosts.remove(&row.id).unwrap_or_default(),
                location: locations.remove(&row.id),
                characteristics,
                id: row.id,
                title: row.title,
                description: row.description,
                price: row.price,
                currency: row.currency,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }
        })
        .collect();
    Ok(listings)
}
