use chrono::{DateTime, Utc};
use log::*;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db::traits::{LiveOrderInsert, SyncDatabaseError},
    db_types::{NewOrderRecord, OrderRecord, OrderRecordFilter, OrderStatusType, Quota, TrackingEntry},
};

// Tracking entries are stored as a JSON array, so the row mapping is done by hand.
impl FromRow<'_, SqliteRow> for OrderRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let tracking: String = row.try_get("tracking")?;
        let tracking = serde_json::from_str::<Vec<TrackingEntry>>(&tracking)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "tracking".into(), source: Box::new(e) })?;
        Ok(Self {
            id: row.try_get("id")?,
            merchant_id: row.try_get("merchant_id")?,
            shopify_id: row.try_get("shopify_id")?,
            name: row.try_get("name")?,
            transaction_id: row.try_get("transaction_id")?,
            tracking,
            historical: row.try_get("historical")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            synchronized_at: row.try_get("synchronized_at")?,
        })
    }
}

/// Inserts a live order record, deciding between PROCESSING and INSUFFICIENT_CREDITS in the same statement.
///
/// A limit of zero is unlimited. The `WHERE true` is needed for SQLite to parse the upsert clause after a SELECT.
pub async fn insert_live_order(
    order: NewOrderRecord,
    quota: Quota,
    period_start: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<LiveOrderInsert, SyncDatabaseError> {
    let tracking = serde_json::to_string(&order.tracking)?;
    let merchant_id = order.merchant_id.clone();
    let shopify_id = order.shopify_id;
    let row: Option<(i64, String)> = sqlx::query_as(
        r#"
            INSERT INTO orders (merchant_id, shopify_id, name, transaction_id, tracking, historical, status, created_at)
            SELECT ?1, ?2, ?3, ?4, ?5, FALSE,
                CASE WHEN ?6 = 0 OR (
                    SELECT COUNT(*) FROM orders
                    WHERE merchant_id = ?1 AND historical = FALSE AND (
                        (status = 'PROCESSED' AND synchronized_at >= ?7) OR
                        (status = 'PROCESSING' AND created_at >= ?7)
                    )
                ) < ?6 THEN 'PROCESSING' ELSE 'INSUFFICIENT_CREDITS' END,
                ?8
            WHERE true
            ON CONFLICT (merchant_id, shopify_id) DO NOTHING
            RETURNING id, status;
        "#,
    )
    .bind(order.merchant_id)
    .bind(order.shopify_id)
    .bind(order.name)
    .bind(order.transaction_id)
    .bind(tracking)
    .bind(quota.as_limit())
    .bind(period_start)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;
    let result = match row {
        Some((id, status)) => LiveOrderInsert::from_status(id, OrderStatusType::from(status)),
        None => {
            let existing = fetch_by_shopify_id(&merchant_id, shopify_id, conn).await?;
            let id = existing.map(|o| o.id).unwrap_or_default();
            LiveOrderInsert::AlreadyExists(id)
        },
    };
    debug!("🗃️ Live order {shopify_id} for {merchant_id}: {result:?}");
    Ok(result)
}

/// Inserts a PENDING historical record. Returns false if the storefront order already has a record.
pub async fn insert_historical_order(
    order: NewOrderRecord,
    conn: &mut SqliteConnection,
) -> Result<bool, SyncDatabaseError> {
    let tracking = serde_json::to_string(&order.tracking)?;
    let result = sqlx::query(
        r#"
            INSERT INTO orders (merchant_id, shopify_id, name, transaction_id, tracking, historical, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, TRUE, ?6, ?7)
            ON CONFLICT (merchant_id, shopify_id) DO NOTHING
        "#,
    )
    .bind(order.merchant_id)
    .bind(order.shopify_id)
    .bind(order.name)
    .bind(order.transaction_id)
    .bind(tracking)
    .bind(OrderStatusType::Pending)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_by_shopify_id(
    merchant_id: &str,
    shopify_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, SyncDatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE merchant_id = ?1 AND shopify_id = ?2")
        .bind(merchant_id)
        .bind(shopify_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderRecord>, SyncDatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = ?1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Moves a live record to PROCESSED or FAILED. Returns true if the record moved.
///
/// Historical records and records whose status does not allow the move are left alone. The update only applies if
/// the status is still the one that was read.
pub async fn finalize_live_order(id: i64, synced: bool, conn: &mut SqliteConnection) -> Result<bool, SyncDatabaseError> {
    let (next, synchronized_at) = if synced {
        (OrderStatusType::Processed, Some(Utc::now()))
    } else {
        (OrderStatusType::Failed, None)
    };
    let Some(current) = fetch_by_id(id, conn).await? else {
        return Ok(false);
    };
    if current.historical || !current.status.can_transition_to(next) {
        trace!("🗃️ Order record {id} cannot move from {} to {next}", current.status);
        return Ok(false);
    }
    let result = sqlx::query("UPDATE orders SET status = ?1, synchronized_at = ?2 WHERE id = ?3 AND status = ?4")
        .bind(next)
        .bind(synchronized_at)
        .bind(id)
        .bind(current.status)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// PENDING -> PROCESSED for one storefront order. The transaction id is only written while it is still empty.
pub async fn mark_processed(
    merchant_id: &str,
    shopify_id: i64,
    transaction_id: &str,
    synchronized_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, SyncDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                status = 'PROCESSED',
                synchronized_at = ?1,
                transaction_id = CASE WHEN transaction_id = '' THEN ?2 ELSE transaction_id END
            WHERE merchant_id = ?3 AND shopify_id = ?4 AND status = 'PENDING'
        "#,
    )
    .bind(synchronized_at)
    .bind(transaction_id)
    .bind(merchant_id)
    .bind(shopify_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Fetches order records according to the filter, ordered by `created_at`, then `id`.
pub async fn search_orders(
    filter: OrderRecordFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderRecord>, SyncDatabaseError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(merchant_id) = filter.merchant_id {
        where_clause.push("merchant_id = ");
        where_clause.push_bind_unseparated(merchant_id);
    }
    if let Some(shopify_id) = filter.shopify_id {
        where_clause.push("shopify_id = ");
        where_clause.push_bind_unseparated(shopify_id);
    }
    if let Some(historical) = filter.historical {
        where_clause.push("historical = ");
        where_clause.push_bind_unseparated(historical);
    }
    if !filter.statuses.is_empty() {
        where_clause.push("status IN (");
        for (i, status) in filter.statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<OrderRecord>().fetch_all(conn).await?;
    Ok(orders)
}
