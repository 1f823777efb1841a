//! Pagination Orchestrator
//!
//! Runs the two result phases in fixed order, title matches then description
//! matches, until the page is full:
//!
//! ```text
//! Start ──(no cursor / title cursor)──▶ ScanTitle ──(page not full)──▶ ScanDescription ──▶ Done
//!   └──────────(description cursor)──────────────────────────────────▶ ScanDescription ──▶ Done
//! ```
//!
//! A negative limit walks the same sequence backwards: description rows
//! before the cursor first, then the tail of the title block, prepending so
//! the page stays in natural order.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::error::Result;
use crate::storage::cancel::Cancellation;
use crate::storage::sqlite::{Database, ListingRow};

use super::cursor::{Block, SearchCursor};
use super::query::{QueryBuilder, SearchParams};

/// Fetches one phase's rows for a cursor and signed limit, in natural order.
pub trait PhaseSource {
    fn fetch(
        &self,
        block: Block,
        cursor: Option<&SearchCursor>,
        limit: i64,
    ) -> Result<Vec<ListingRow>>;
}

/// [`PhaseSource`] backed by the listing store.
pub struct DbPhases<'a> {
    pub db: &'a Database,
    pub builder: &'a QueryBuilder,
    pub params: SearchParams<'a>,
    pub cancel: &'a Cancellation,
}

impl PhaseSource for DbPhases<'_> {
    fn fetch(
        &self,
        block: Block,
        cursor: Option<&SearchCursor>,
        limit: i64,
    ) -> Result<Vec<ListingRow>> {
        let query = self.builder.build(&self.params, block, cursor, limit);
        self.db.query_listings(&query, self.cancel)
    }
}

/// A row together with the phase that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRow {
    pub block: Block,
    pub row: ListingRow,
}

/// One page of rows plus the cursors to move away from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<PageRow>,
    pub cursor_after: Option<SearchCursor>,
    pub cursor_before: Option<SearchCursor>,
}

/// Whether the second phase can produce rows at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phases {
    /// Title then description.
    Both,
    /// Browse mode: every listing is a title row.
    TitleOnly,
}

/// Assemble one page.
///
/// `limit` must be non-zero; its sign picks the direction.
pub fn paginate<S: PhaseSource>(
    source: &S,
    cursor: Option<&SearchCursor>,
    limit: i64,
    phases: Phases,
) -> Result<Page> {
    let size = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX);
    if size == 0 {
        return Ok(Page::default());
    }

    let rows = if limit > 0 {
        scan_forward(source, cursor, size, phases)?
    } else {
        scan_backward(source, cursor, size, phases)?
    };

    // full page: there may be more
    let cursor_after = if rows.len() == size {
        rows.last()
            .map(|last| SearchCursor::after(last.block, last.row.id.clone()))
    } else {
        None
    };
    let cursor_before = if cursor.is_some() {
        rows.first()
            .map(|first| SearchCursor::before(first.block, first.row.id.clone()))
    } else {
        None
    };

    Ok(Page {
        rows,
        cursor_after,
        cursor_before,
    })
}

fn plan(cursor: Option<&SearchCursor>, backward: bool) -> Vec<(Block, Option<SearchCursor>)> {
    match (cursor, backward) {
        (Some(c), false) if c.block == Block::Description => {
            vec![(Block::Description, Some(c.clone()))]
        }
        (Some(c), false) => vec![(Block::Title, Some(c.clone())), (Block::Description, None)],
        (None, false) => vec![(Block::Title, None), (Block::Description, None)],
        (Some(c), true) if c.block == Block::Description => {
            vec![(Block::Description, Some(c.clone())), (Block::Title, None)]
        }
        (Some(c), true) => vec![(Block::Title, Some(c.clone()))],
        (None, true) => vec![(Block::Description, None), (Block::Title, None)],
    }
}

fn scan_forward<S: PhaseSource>(
    source: &S,
    cursor: Option<&SearchCursor>,
    size: usize,
    phases: Phases,
) -> Result<Vec<PageRow>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(size);

    for (block, phase_cursor) in plan(cursor, false) {
        if block == Block::Description && phases == Phases::TitleOnly {
            continue;
        }
        let quota = size - out.len();
        if quota == 0 {
            break;
        }
        let rows = source.fetch(block, phase_cursor.as_ref(), quota_limit(quota))?;
        debug!(?block, quota, fetched = rows.len(), "forward phase");
        for row in rows {
            if out.len() == size {
                break;
            }
            if seen.insert(row.id.clone()) {
                out.push(PageRow { block, row });
            }
        }
    }
    Ok(out)
}

fn scan_backward<S: PhaseSource>(
    source: &S,
    cursor: Option<&SearchCursor>,
    size: usize,
    phases: Phases,
) -> Result<Vec<PageRow>> {
    let mut seen = HashSet::new();
    let mut out = VecDeque::with_capacity(size);

    for (block, phase_cursor) in plan(cursor, true) {
        if block == Block::Description && phases == Phases::TitleOnly {
            continue;
        }
        let quota = size - out.len();
        if quota == 0 {
            break;
        }
        let rows = source.fetch(block, phase_cursor.as_ref(), -quota_limit(quota))?;
        debug!(?block, quota, fetched = rows.len(), "backward phase");
        for row in rows.into_iter().rev() {
            if out.len() == size {
                break;
            }
            if seen.insert(row.id.clone()) {
                out.push_front(PageRow { block, row });
            }
        }
    }
    Ok(out.into())
}

fn quota_limit(quota: usize) -> i64 {
    i64::try_from(quota).unwrap_or(i64::MAX)
}
