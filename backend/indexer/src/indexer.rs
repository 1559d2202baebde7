//! Long-running background task that polls the Soroban RPC and writes
//! decoded sale and claim events to the database.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db;
use crate::events::{EventKind, SaleEvent};
use crate::rpc;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

/// Spawn the indexer loop as a background [`tokio`] task.
///
/// Returns once `shutdown` is cancelled.
pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) {
    let contract_ids = state.config.contract_ids();
    info!("Indexer starting, contracts: {}", contract_ids.join(", "));

    // Load the cursor from the DB; fall back to config start_ledger.
    let last_ledger = db::get_last_ledger(&state.pool).await.unwrap_or_else(|e| {
        warn!("Could not read saved ledger, starting fresh: {e}");
        0
    });
    let cursor_str = db::get_cursor_string(&state.pool).await.unwrap_or_else(|e| {
        warn!("Could not read saved cursor: {e}");
        None
    });

    let mut current_ledger = if last_ledger > 0 {
        last_ledger as u32
    } else {
        state.config.start_ledger
    };
    let mut cursor: Option<String> = cursor_str;

    info!("Resuming from ledger {current_ledger}");

    loop {
        match poll_once(
            &state.pool,
            &state.client,
            &state.config,
            &contract_ids,
            current_ledger,
            cursor.as_deref(),
        )
        .await
        {
            Ok((next_ledger, next_cursor)) => {
                current_ledger = next_ledger;
                cursor = next_cursor;
            }
            Err(e) => {
                error!("Indexer poll error: {e}");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Indexer stopping at ledger {current_ledger}");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)) => {}
        }
    }
}

/// Perform a single poll iteration.
///
/// Returns `(next_start_ledger, next_cursor)`.
async fn poll_once(
    pool: &SqlitePool,
    client: &Client,
    config: &Config,
    contract_ids: &[String],
    start_ledger: u32,
    cursor: Option<&str>,
) -> crate::errors::Result<(u32, Option<String>)> {
    let (raw_events, next_cursor, latest_ledger) = rpc::fetch_events(
        client,
        &config.rpc_url,
        contract_ids,
        start_ledger,
        cursor,
        config.events_per_page,
    )
    .await?;

    if !raw_events.is_empty() {
        let decoded = rpc::decode_events(&raw_events, &config.sale_contract_id);
        let inserted = db::insert_events(pool, &decoded).await?;
        let batch = BatchSummary::of(&decoded);
        info!(
            raw = raw_events.len(),
            inserted,
            contributions = batch.contributions,
            claims = batch.claims,
            "Stored sale events"
        );
        if let (Some(raised), Some(sold)) = (batch.total_raised, batch.total_sold) {
            info!("Sale totals now raised={raised} sold={sold}");
        }
    }

    // Advance the ledger cursor:
    // - If there is a next_cursor string, keep the same start_ledger so the next
    //   call paginates within the same ledger range.
    // - Otherwise advance to the latest known ledger.
    let next_ledger = latest_ledger
        .map(|l| (l as u32).max(start_ledger))
        .unwrap_or(start_ledger);

    // Persist cursor so restarts are deterministic.
    db::save_cursor(pool, next_ledger as i64, next_cursor.as_deref()).await?;

    Ok((next_ledger, next_cursor))
}

/// Per-batch counts for the poll log line.
#[derive(Debug, Default, PartialEq)]
struct BatchSummary {
    contributions: usize,
    claims: usize,
    /// Running totals carried by the newest contribution in the batch.
    total_raised: Option<String>,
    total_sold: Option<String>,
}

impl BatchSummary {
    fn of(events: &[SaleEvent]) -> Self {
        let mut summary = Self::default();
        for ev in events {
            if ev.event_type == EventKind::Contributed.as_str() {
                summary.contributions += 1;
                if ev.total_raised.is_some() {
                    summary.total_raised = ev.total_raised.clone();
                    summary.total_sold = ev.total_sold.clone();
                }
            } else if ev.event_type == EventKind::Claimed.as_str() {
                summary.claims += 1;
            }
        }
        summary
    }
}
