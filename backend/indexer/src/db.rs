//! Database layer: migrations, queries, and cursor management.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::events::{EventKind, EventRecord, Progress, SaleEvent};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let url = if url.contains('?') || url.contains(":memory:") {
        url
    } else {
        format!("{url}?mode=rwc")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Cursor helpers
// ─────────────────────────────────────────────────────────

/// Read the last-seen ledger from the cursor row.
/// Returns `0` when no cursor has been persisted yet.
pub async fn get_last_ledger(pool: &SqlitePool) -> Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT last_ledger FROM indexer_cursor WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v).unwrap_or(0))
}

/// Persist the last-seen ledger (and optionally a pagination cursor string).
pub async fn save_cursor(
    pool: &SqlitePool,
    last_ledger: i64,
    last_cursor: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE indexer_cursor SET last_ledger = ?1, last_cursor = ?2 WHERE id = 1")
        .bind(last_ledger)
        .bind(last_cursor)
        .execute(pool)
        .await?;
    Ok(())
}

/// Read back the raw cursor string (used to resume pagination mid-ledger).
pub async fn get_cursor_string(pool: &SqlitePool) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT last_cursor FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|(v,)| v))
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of decoded events. Events whose `event_id` is already
/// stored are silently ignored to make the indexer idempotent.
pub async fn insert_events(pool: &SqlitePool, events: &[SaleEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_id, event_type, actor, amount, units, price,
                 total_raised, total_sold, ledger, timestamp, contract_id, tx_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&ev.event_id)
        .bind(&ev.event_type)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(&ev.units)
        .bind(&ev.price)
        .bind(&ev.total_raised)
        .bind(&ev.total_sold)
        .bind(ev.ledger)
        .bind(ev.timestamp)
        .bind(&ev.contract_id)
        .bind(&ev.tx_hash)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    tx.commit().await?;
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events, ordered by ledger ascending.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_id, event_type, actor, amount, units, price,
               total_raised, total_sold, ledger, timestamp, contract_id,
               tx_hash, created_at
        FROM   events
        ORDER  BY ledger ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch every event naming `actor` (contributions, refunds, claims, ...).
pub async fn get_events_for_actor(pool: &SqlitePool, actor: &str) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_id, event_type, actor, amount, units, price,
               total_raised, total_sold, ledger, timestamp, contract_id,
               tx_hash, created_at
        FROM   events
        WHERE  actor = ?1
        ORDER  BY ledger ASC, id ASC
        "#,
    )
    .bind(actor)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Latest contributions, newest first.
pub async fn get_contribution_feed(pool: &SqlitePool, limit: u32) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_id, event_type, actor, amount, units, price,
               total_raised, total_sold, ledger, timestamp, contract_id,
               tx_hash, created_at
        FROM   events
        WHERE  event_type = ?1
        ORDER  BY ledger DESC, id DESC
        LIMIT  ?2
        "#,
    )
    .bind(EventKind::Contributed.as_str())
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Rebuild the progress widget from indexed events.
///
/// Totals come from the running totals carried by the latest contribution;
/// status from the latest lifecycle event.
pub async fn get_progress(pool: &SqlitePool) -> Result<Progress> {
    let latest: Option<(Option<String>, Option<String>, Option<String>, i64)> = sqlx::query_as(
        r#"
        SELECT total_raised, total_sold, price, ledger
        FROM   events
        WHERE  event_type = ?1
        ORDER  BY ledger DESC, id DESC
        LIMIT  1
        "#,
    )
    .bind(EventKind::Contributed.as_str())
    .fetch_optional(pool)
    .await?;

    let (contributors,): (i64,) =
        sqlx::query_as("SELECT COUNT(DISTINCT actor) FROM events WHERE event_type = ?1")
            .bind(EventKind::Contributed.as_str())
            .fetch_one(pool)
            .await?;

    let lifecycle: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT event_type
        FROM   events
        WHERE  event_type IN (?1, ?2, ?3, ?4)
        ORDER  BY ledger DESC, id DESC
        LIMIT  1
        "#,
    )
    .bind(EventKind::Opened.as_str())
    .bind(EventKind::Finalized.as_str())
    .bind(EventKind::RefundsEnabled.as_str())
    .bind(EventKind::EmergencyRefund.as_str())
    .fetch_optional(pool)
    .await?;

    let status = match lifecycle.map(|(kind,)| kind) {
        None => "pending",
        Some(kind) if kind == EventKind::Opened.as_str() => "open",
        Some(kind) if kind == EventKind::Finalized.as_str() => "finalized",
        Some(_) => "refunding",
    };

    let (raised, sold, price, ledger) = latest.unwrap_or((None, None, None, 0));
    Ok(Progress {
        status: status.to_string(),
        total_raised: raised.unwrap_or_else(|| "0".to_string()),
        total_sold: sold.unwrap_or_else(|| "0".to_string()),
        spot_price: price.unwrap_or_else(|| "0".to_string()),
        contributors,
        last_ledger: ledger,
    })
}
