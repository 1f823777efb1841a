//! Scalar SQL functions used by search predicates and ranking.
//!
//! | name | args | returns |
//! |---|---|---|
//! | `trgm_similarity` | text, text | trigram similarity in `[0, 1]` |
//! | `trgm_word_similarity` | needle, haystack | share of the needle's trigrams in the haystack |
//! | `fts_match` | document, query | 1 when every query term occurs |
//! | `fts_rank` | document, query | frequency-saturated term rank in `[0, 1)` |
//! | `geo_distance_km` | lat1, lon1, lat2, lon2 | great-circle distance |
//!
//! All are deterministic, so SQLite may factor them out of loops and a
//! cursor row's rank recomputes to the identical value.

use rusqlite::Connection;
use rusqlite::functions::{Context, FunctionFlags};

use crate::error::Result;
use crate::search::text;

const EARTH_RADIUS_KM: f64 = 6371.0088;

fn text_arg(ctx: &Context<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(ctx.get::<Option<String>>(idx)?.unwrap_or_default())
}

/// Register every search function on `conn`.
pub fn register(conn: &Connection) -> Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("trgm_similarity", 2, flags, |ctx| {
        Ok(text::similarity(&text_arg(ctx, 0)?, &text_arg(ctx, 1)?))
    })?;
    conn.create_scalar_function("trgm_word_similarity", 2, flags, |ctx| {
        Ok(text::word_similarity(&text_arg(ctx, 0)?, &text_arg(ctx, 1)?))
    })?;
    conn.create_scalar_function("fts_match", 2, flags, |ctx| {
        Ok(text::text_match(&text_arg(ctx, 0)?, &text_arg(ctx, 1)?))
    })?;
    conn.create_scalar_function("fts_rank", 2, flags, |ctx| {
        Ok(text::text_rank(&text_arg(ctx, 0)?, &text_arg(ctx, 1)?))
    })?;
    conn.create_scalar_function("geo_distance_km", 4, flags, |ctx| {
        let lat1: f64 = ctx.get(0)?;
        let lon1: f64 = ctx.get(1)?;
        let lat2: f64 = ctx.get(2)?;
        let lon2: f64 = ctx.get(3)?;
        Ok(haversine_km(lat1, lon1, lat2, lon2))
    })?;

    Ok(())
}

/// Haversine distance in kilometres.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}
