//! bazaar serve - Answer search requests line by line
//!
//! Reads one JSON [`SearchRequest`] per stdin line and writes one JSON
//! reply per stdout line. Requests are spread over a worker pool; each
//! worker owns its own database connection while the token cache is
//! shared, so cursors and sessions resolve on any worker.
//!
//! Replies may arrive out of order; an `id` field on the request is
//! echoed back to match them up.

use std::io::{BufRead, Write};
use std::num::NonZeroUsize;

use clap::Args;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::AppContext;
use crate::cli::output;
use crate::error::{BazaarError, Result};
use crate::search::{SearchRequest, SearchService};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Worker threads (default: available parallelism)
    #[arg(long, short)]
    pub workers: Option<NonZeroUsize>,
}

/// One stdin line.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<Value>,
    #[serde(flatten)]
    request: SearchRequest,
}

/// One stdout line.
#[derive(Debug, Serialize)]
struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(flatten)]
    body: Value,
}

pub fn run(ctx: &AppContext, args: &ServeArgs) -> Result<()> {
    let workers = args
        .workers
        .or_else(|| std::thread::available_parallelism().ok())
        .map_or(1, NonZeroUsize::get);
    // fail fast on a missing database before reading any input
    drop(ctx.open_database()?);
    let service = ctx.search_service()?;
    info!(workers, db = %ctx.db_path.display(), "serving search requests");

    let (job_tx, job_rx) = crossbeam_channel::bounded::<String>(workers * 4);
    let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<String>();

    let served = std::thread::scope(|scope| -> Result<usize> {
        for worker in 0..workers {
            let jobs = job_rx.clone();
            let replies = reply_tx.clone();
            let service = service.clone();
            scope.spawn(move || worker_loop(ctx, worker, &service, &jobs, &replies));
        }
        drop(job_rx);
        drop(reply_tx);

        let writer = scope.spawn(move || write_replies(&reply_rx));

        let mut count = 0;
        for line in std::io::stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if job_tx.send(line).is_err() {
                warn!("all workers exited, stopping input");
                break;
            }
            count += 1;
        }
        drop(job_tx);

        match writer.join() {
            Ok(result) => result?,
            Err(_) => warn!("reply writer panicked"),
        }
        Ok(count)
    })?;

    service.cache().close();
    info!(served, "input closed, shutting down");
    Ok(())
}

fn worker_loop(
    ctx: &AppContext,
    worker: usize,
    service: &SearchService,
    jobs: &Receiver<String>,
    replies: &Sender<String>,
) {
    let db = match ctx.open_database() {
        Ok(db) => db,
        Err(err) => {
            warn!(worker, error = %err, "worker could not open database");
            return;
        }
    };
    for line in jobs {
        let reply = match serde_json::from_str::<Envelope>(&line) {
            Ok(envelope) => {
                let body = match service.search(&db, &envelope.request) {
                    Ok(response) => serde_json::to_value(&response).unwrap_or_else(|err| {
                        output::error_body(&BazaarError::Serialization(err.to_string()))
                    }),
                    Err(err) => {
                        debug!(worker, error = %err, "search failed");
                        output::error_body(&err)
                    }
                };
                Reply {
                    id: envelope.id,
                    body,
                }
            }
            Err(err) => Reply {
                id: None,
                body: output::error_body(&BazaarError::InvalidRequest(format!(
                    "request is not valid JSON: {err}"
                ))),
            },
        };
        match serde_json::to_string(&reply) {
            Ok(text) => {
                if replies.send(text).is_err() {
                    return;
                }
            }
            Err(err) => warn!(worker, error = %err, "unserializable reply"),
        }
    }
}

fn write_replies(replies: &Receiver<String>) -> Result<()> {
    let stdout = std::io::stdout();
    for text in replies {
        let mut out = stdout.lock();
        writeln!(out, "{text}")?;
        out.flush()?;
    }
    Ok(())
}
