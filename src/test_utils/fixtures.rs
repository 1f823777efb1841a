use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use crate::config::{CacheConfig, SearchConfig};
use crate::search::cache::SearchCache;
use crate::search::service::SearchService;
use crate::storage::sqlite::{Catalog, Database, LocationRecord, NewCategory, NewListing};

/// Fixed HMAC key so fixture tokens are reproducible within a process.
pub const TEST_SECRET: [u8; 32] = [7; 32];

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Nine listings "iPhone 14 Pro" .. "iPhone 22 Pro", ids `iphone-14` ..
/// `iphone-22`, with strictly increasing price and creation time.
pub fn iphone_listings() -> Vec<NewListing> {
    (14..=22)
        .map(|model: i64| {
            let mut listing = NewListing::new(format!("iPhone {model} Pro"), 50_000 + model * 1_000);
            listing.id = Some(format!("iphone-{model}"));
            listing.description = format!("Unlocked handset, model {model}, boxed");
            listing.created_at = Some(epoch() + Duration::hours(model));
            listing
        })
        .collect()
}

/// A small catalog with a category tree, characteristics and locations.
///
/// "oak table" matches `oak-table` by title and `brass-lamp` by description
/// only; `grey-sofa` matches neither.
pub fn furniture_catalog() -> Catalog {
    let category = |id: &str, name: &str, parent: Option<&str>| NewCategory {
        id: id.to_string(),
        name: name.to_string(),
        parent_id: parent.map(str::to_string),
    };
    let listing = |id: &str, title: &str, description: &str, price: i64, data| {
        let mut listing = NewListing::new(title, price);
        listing.id = Some(id.to_string());
        listing.description = description.to_string();
        listing.characteristics = Some(data);
        listing
    };

    let mut table = listing(
        "oak-table",
        "Oak dining table",
        "Solid wood, seats six",
        30_000,
        json!({"color": "brown", "height": 750.0, "width": 1800.0, "dropdown": "oak", "checkbox": true}),
    );
    table.categories = vec!["tables".into()];
    table.location = Some(LocationRecord {
        latitude: 52.520,
        longitude: 13.405,
        city: Some("Berlin".into()),
        country: Some("DE".into()),
    });

    let mut lamp = listing(
        "brass-lamp",
        "Brass floor lamp",
        "Pairs well with an oak table",
        9_000,
        json!({"color": "gold", "height": 1600.0, "checkbox": false}),
    );
    lamp.categories = vec!["lighting".into()];
    lamp.location = Some(LocationRecord {
        latitude: 48.137,
        longitude: 11.575,
        city: Some("Munich".into()),
        country: Some("DE".into()),
    });

    let mut sofa = listing(
        "grey-sofa",
        "Grey sofa",
        "Three seats, washable covers",
        45_000,
        json!({"color": "grey", "width": 2100.0, "weight": 42_000.0}),
    );
    sofa.categories = vec!["furniture".into()];

    Catalog {
        categories: vec![
            category("furniture", "Furniture", None),
            category("tables", "Tables", Some("furniture")),
            category("lighting", "Lighting", None),
        ],
        listings: vec![table, lamp, sofa],
    }
}

/// In-memory database seeded with [`iphone_listings`].
pub fn iphone_catalog() -> Database {
    seeded(&Catalog {
        categories: Vec::new(),
        listings: iphone_listings(),
    })
}

pub fn seeded(catalog: &Catalog) -> Database {
    let db = Database::open_in_memory().expect("open in-memory database");
    db.import_catalog(catalog).expect("import fixture catalog");
    db
}

/// Cache without a sweeper thread, keyed with [`TEST_SECRET`].
pub fn cache() -> Arc<SearchCache> {
    let config = CacheConfig {
        sweep_interval: std::time::Duration::ZERO,
        ..CacheConfig::default()
    };
    Arc::new(SearchCache::with_secret(&TEST_SECRET, &config))
}

pub fn service(config: &SearchConfig) -> SearchService {
    SearchService::new(config, cache())
}

/// Temporary project directory for tests that need files on disk.
pub struct TempProject {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TempProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join("bazaar.db")
    }

    /// Write `catalog` as an import file and return its path.
    pub fn write_catalog(&self, name: &str, catalog: &Catalog) -> PathBuf {
        let path = self.root.join(name);
        let body = serde_json::to_string_pretty(catalog).expect("serialize catalog");
        std::fs::write(&path, body).expect("write catalog");
        path
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}
