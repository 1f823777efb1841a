//! SQLite database layer

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{BazaarError, Result};
use crate::search::query::RenderedQuery;
use crate::storage::cancel::Cancellation;
use crate::storage::{functions, migrations};

/// SQLite database wrapper for the listing store
pub struct Database {
    conn: Connection,
    schema_version: u32,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}

/// One row of a phase query, before hydration.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
    pub rank: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostRecord {
    pub boost_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Category node as imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBoost {
    pub boost_type: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Listing as imported. Characteristics use base units (mm, g, cm2, ml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub boosts: Vec<NewBoost>,
    #[serde(default)]
    pub characteristics: Option<JsonValue>,
    #[serde(default)]
    pub location: Option<LocationRecord>,
}

/// Import document: categories first, then listings referencing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<NewCategory>,
    #[serde(default)]
    pub listings: Vec<NewListing>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub categories: usize,
    pub listings: usize,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl NewListing {
    #[must_use]
    pub fn new(title: impl Into<String>, price: i64) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            price,
            currency: default_currency(),
            created_at: None,
            categories: Vec::new(),
            boosts: Vec::new(),
            characteristics: None,
            location: None,
        }
    }
}

/// Fixed-width UTC timestamp, so text order equals time order.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn placeholders(n: usize) -> String {
    std::iter::repeat_n("?", n).join(", ")
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Private in-memory database, used by tests and benchmarks.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        Self::configure_pragmas(&conn)?;
        functions::register(&conn)?;
        let schema_version = migrations::run_migrations(&conn)?;
        Ok(Self {
            conn,
            schema_version,
        })
    }

    /// Get a reference to the connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Current schema version after migrations.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn upsert_category(&self, category: &NewCategory) -> Result<()> {
        self.conn.execute(
            "INSERT INTO categories (id, name, parent_id) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, parent_id = excluded.parent_id",
            params![category.id, category.name, category.parent_id],
        )?;
        Ok(())
    }

    /// Insert a listing with its side relations in one transaction.
    ///
    /// Returns the listing id (generated when the input has none).
    pub fn insert_listing(&self, listing: &NewListing) -> Result<String> {
        if listing.title.trim().is_empty() {
            return Err(BazaarError::InvalidRequest("listing title is empty".to_string()));
        }
        let id = listing
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let created_at = format_timestamp(listing.created_at.unwrap_or_else(Utc::now));

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO listings (id, title, description, price, currency, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                listing.title,
                listing.description,
                listing.price,
                listing.currency,
                created_at,
                created_at
            ],
        )?;
        for category in &listing.categories {
            tx.execute(
                "INSERT OR IGNORE INTO listing_categories (listing_id, category_id) VALUES (?, ?)",
                params![id, category],
            )?;
        }
        for boost in &listing.boosts {
            tx.execute(
                "INSERT OR REPLACE INTO listing_boosts (listing_id, boost_type, expires_at)
                 VALUES (?, ?, ?)",
                params![id, boost.boost_type, boost.expires_at.map(format_timestamp)],
            )?;
        }
        if let Some(characteristics) = &listing.characteristics {
            tx.execute(
                "INSERT INTO listing_characteristics (listing_id, data) VALUES (?, ?)",
                params![id, serde_json::to_string(characteristics)?],
            )?;
        }
        if let Some(location) = &listing.location {
            tx.execute(
                "INSERT INTO listing_locations (listing_id, latitude, longitude, city, country)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    id,
                    location.latitude,
                    location.longitude,
                    location.city,
                    location.country
                ],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    /// Mark a listing deleted. Returns false when it was unknown or already deleted.
    pub fn soft_delete_listing(&self, id: &str) -> Result<bool> {
        let now = format_timestamp(Utc::now());
        let changed = self.conn.execute(
            "UPDATE listings SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            params![now, now, id],
        )?;
        Ok(changed > 0)
    }

    /// Count live listings.
    pub fn count_listings(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM listings WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0).unsigned_abs())
    }

    pub fn listing_exists(&self, id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM listings WHERE id = ?", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Import a whole catalog. Stops at the first invalid listing.
    pub fn import_catalog(&self, catalog: &Catalog) -> Result<ImportReport> {
        for category in &catalog.categories {
            self.upsert_category(category)?;
        }
        for listing in &catalog.listings {
            self.insert_listing(listing)?;
        }
        Ok(ImportReport {
            categories: catalog.categories.len(),
            listings: catalog.listings.len(),
        })
    }

    /// Run `f` with cancellation watching the connection.
    fn watched<T>(
        &self,
        cancel: &Cancellation,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        cancel.check()?;
        let _guard = cancel.watch(&self.conn);
        f(&self.conn).map_err(|err| cancel.map_err(err))
    }

    /// Execute a rendered phase query.
    pub fn query_listings(
        &self,
        query: &RenderedQuery,
        cancel: &Cancellation,
    ) -> Result<Vec<ListingRow>> {
        self.watched(cancel, |conn| {
            let mut stmt = conn.prepare_cached(&query.sql)?;
            let rows = stmt.query_map(params_from_iter(query.params.iter()), listing_from_row)?;
            rows.collect()
        })
    }

    pub fn categories_for(
        &self,
        ids: &[String],
        cancel: &Cancellation,
    ) -> Result<HashMap<String, Vec<CategoryRef>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT lc.listing_id, c.id, c.name FROM listing_categories lc
             JOIN categories c ON c.id = lc.category_id
             WHERE lc.listing_id IN ({}) ORDER BY lc.listing_id, c.name",
            placeholders(ids.len())
        );
        let rows: Vec<(String, CategoryRef)> = self.watched(cancel, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
                Ok((
                    row.get(0)?,
                    CategoryRef {
                        id: row.get(1)?,
                        name: row.get(2)?,
                    },
                ))
            })?;
            rows.collect()
        })?;
        Ok(rows.into_iter().into_group_map())
    }

    pub fn boosts_for(
        &self,
        ids: &[String],
        cancel: &Cancellation,
    ) -> Result<HashMap<String, Vec<BoostRecord>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT listing_id, boost_type, expires_at FROM listing_boosts
             WHERE listing_id IN ({}) ORDER BY listing_id, boost_type",
            placeholders(ids.len())
        );
        let rows: Vec<(String, BoostRecord)> = self.watched(cancel, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
                Ok((
                    row.get(0)?,
                    BoostRecord {
                        boost_type: row.get(1)?,
                        expires_at: row.get(2)?,
                    },
                ))
            })?;
            rows.collect()
        })?;
        Ok(rows.into_iter().into_group_map())
    }

    /// Raw characteristics documents by listing id.
    pub fn characteristics_for(
        &self,
        ids: &[String],
        cancel: &Cancellation,
    ) -> Result<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT listing_id, data FROM listing_characteristics WHERE listing_id IN ({})",
            placeholders(ids.len())
        );
        self.watched(cancel, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            rows.collect()
        })
    }

    pub fn locations_for(
        &self,
        ids: &[String],
        cancel: &Cancellation,
    ) -> Result<HashMap<String, LocationRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT listing_id, latitude, longitude, city, country FROM listing_locations
             WHERE listing_id IN ({})",
            placeholders(ids.len())
        );
        self.watched(cancel, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
                Ok((
                    row.get(0)?,
                    LocationRecord {
                        latitude: row.get(1)?,
                        longitude: row.get(2)?,
                        city: row.get(3)?,
                        country: row.get(4)?,
                    },
                ))
            })?;
            rows.collect()
        })
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA mmap_size = 268435456;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        price: row.get("price")?,
        currency: row.get("currency")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        rank: row.get("rank")?,
    })
}
