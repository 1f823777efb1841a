//! bazaar search - Search listings
//!
//! Runs one page of a search. Cursor and session tokens live in a
//! process-local cache, so they only resolve within `bazaar serve`; a
//! one-shot search prints them for inspection.

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{self, truncate_chars};
use crate::error::{BazaarError, Result};
use crate::search::{GeoFilter, RawFilter, SearchRequest, SearchResponse};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query (empty browses every listing)
    #[arg(default_value = "")]
    pub query: String,

    /// Page size; negative reads the page before the cursor
    #[arg(long, short, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Cursor token from a previous response
    #[arg(long)]
    pub cursor: Option<String>,

    /// Search session token (`search_id`) from a previous response
    #[arg(long)]
    pub qid: Option<String>,

    /// Sort order: price_asc, price_desc, newest, relevance
    #[arg(long, short)]
    pub sort: Option<String>,

    /// Filter as ROLE=JSON, e.g. `price={"max":5000}` (repeatable)
    #[arg(long = "filter", value_name = "ROLE=JSON")]
    pub filters: Vec<String>,

    /// Restrict to a category and its descendants
    #[arg(long)]
    pub category: Option<String>,

    /// Restrict to a radius: LAT,LON,KM
    #[arg(long, value_name = "LAT,LON,KM")]
    pub near: Option<String>,

    /// Abort the search after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let request = build_request(args)?;
    let db = ctx.open_database()?;
    let service = ctx.search_service()?;
    let response = service.search(&db, &request)?;

    if ctx.json {
        return output::emit_json(&response);
    }
    print_human(&args.query, &response);
    Ok(())
}

fn build_request(args: &SearchArgs) -> Result<SearchRequest> {
    let filters = args
        .filters
        .iter()
        .map(|raw| parse_filter(raw))
        .collect::<Result<Vec<_>>>()?;
    let location = args.near.as_deref().map(parse_near).transpose()?;
    Ok(SearchRequest {
        query: args.query.clone(),
        limit: args.limit,
        cursor: args.cursor.clone(),
        sort_order: args.sort.clone(),
        qid: args.qid.clone(),
        filters,
        category: args.category.clone(),
        location,
        timeout_ms: args.timeout_ms,
    })
}

fn parse_filter(raw: &str) -> Result<RawFilter> {
    let (role, value) = raw
        .split_once('=')
        .ok_or_else(|| BazaarError::InvalidRequest(format!("filter '{raw}' is not ROLE=JSON")))?;
    let value = serde_json::from_str(value).map_err(|err| BazaarError::InvalidFilterShape {
        role: role.trim().to_string(),
        reason: format!("not JSON: {err}"),
    })?;
    Ok(RawFilter {
        role: role.trim().to_string(),
        value,
    })
}

fn parse_near(raw: &str) -> Result<GeoFilter> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|err| BazaarError::InvalidRequest(format!("--near '{raw}': {err}")))?;
    let [latitude, longitude, radius_km] = parts[..] else {
        return Err(BazaarError::InvalidRequest(format!(
            "--near '{raw}' must be LAT,LON,KM"
        )));
    };
    Ok(GeoFilter {
        latitude,
        longitude,
        radius_km,
    })
}

fn print_human(query: &str, response: &SearchResponse) {
    if response.results.is_empty() {
        println!("{} No listings found for '{}'", "!".yellow(), query.cyan());
    } else {
        println!(
            "{} results for '{}':",
            response.results.len().to_string().bold(),
            query.cyan()
        );
        println!();
        for (i, listing) in response.results.iter().enumerate() {
            let rank = format!("{}.", i + 1);
            println!(
                "{:4} {} {} {}",
                rank.dimmed(),
                listing.title.bold(),
                listing.price,
                listing.currency
            );
            println!("     {}", listing.id.dimmed());
            if !listing.description.is_empty() {
                println!("     {}", truncate_chars(&listing.description, 77).dimmed());
            }
        }
    }

    println!();
    if let Some(token) = &response.cursor_before {
        println!("cursor_before: {token}");
    }
    if let Some(token) = &response.cursor_after {
        println!("cursor_after:  {token}");
    }
    println!("search_id:     {}", response.search_id);
}
