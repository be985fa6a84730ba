use chrono::Utc;
use log::*;
use pts_common::Secret;
use sqlx::SqliteConnection;

use crate::{
    db::traits::SyncDatabaseError,
    db_types::{Merchant, NewMerchant, Plan, PlanStatus},
};

/// Inserts the merchant, or updates the storefront token and plan of an existing merchant with the same id.
pub async fn upsert_merchant(merchant: NewMerchant, conn: &mut SqliteConnection) -> Result<Merchant, SyncDatabaseError> {
    let now = Utc::now();
    let merchant = sqlx::query_as(
        r#"
            INSERT INTO merchants (id, shop_domain, shopify_access_token, plan, plan_status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT (id) DO UPDATE SET
                shop_domain = excluded.shop_domain,
                shopify_access_token = excluded.shopify_access_token,
                plan = excluded.plan,
                plan_status = excluded.plan_status,
                uninstalled = FALSE,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(merchant.id)
    .bind(merchant.shop_domain)
    .bind(merchant.shopify_access_token)
    .bind(merchant.plan)
    .bind(merchant.plan_status)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(merchant)
}

pub async fn fetch_merchant(id: &str, conn: &mut SqliteConnection) -> Result<Option<Merchant>, SyncDatabaseError> {
    let merchant = sqlx::query_as("SELECT * FROM merchants WHERE id = ?1").bind(id).fetch_optional(conn).await?;
    Ok(merchant)
}

pub async fn fetch_merchant_by_domain(
    shop_domain: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, SyncDatabaseError> {
    let merchant = sqlx::query_as("SELECT * FROM merchants WHERE shop_domain = ?1")
        .bind(shop_domain)
        .fetch_optional(conn)
        .await?;
    Ok(merchant)
}

pub async fn update_plan(
    id: &str,
    plan: Plan,
    status: PlanStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, SyncDatabaseError> {
    let merchant = sqlx::query_as(
        "UPDATE merchants SET plan = ?1, plan_status = ?2, updated_at = ?3 WHERE id = ?4 RETURNING *",
    )
    .bind(plan)
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(merchant)
}

pub async fn store_provider_credentials(
    id: &str,
    access_token: &Secret<String>,
    refresh_token: &Secret<String>,
    email: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, SyncDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE merchants SET
                paypal_access_token = ?1,
                paypal_refresh_token = ?2,
                paypal_email = COALESCE(?3, paypal_email),
                updated_at = ?4
            WHERE id = ?5
        "#,
    )
    .bind(access_token.reveal().as_str())
    .bind(refresh_token.reveal().as_str())
    .bind(email)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_provider_access_token(
    id: &str,
    access_token: &Secret<String>,
    conn: &mut SqliteConnection,
) -> Result<bool, SyncDatabaseError> {
    let result = sqlx::query("UPDATE merchants SET paypal_access_token = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(access_token.reveal().as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    trace!("🗃️ Provider access token updated for merchant {id}");
    Ok(result.rows_affected() > 0)
}

pub async fn mark_uninstalled(
    shop_domain: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, SyncDatabaseError> {
    let merchant = sqlx::query_as(
        r#"
            UPDATE merchants SET uninstalled = TRUE, plan_status = ?1, updated_at = ?2
            WHERE shop_domain = ?3
            RETURNING *
        "#,
    )
    .bind(PlanStatus::Cancelled)
    .bind(Utc::now())
    .bind(shop_domain)
    .fetch_optional(conn)
    .await?;
    Ok(merchant)
}

/// Sets `backfill_done` if it is not yet set. Returns `true` if this call set it.
pub async fn claim_backfill(id: &str, conn: &mut SqliteConnection) -> Result<bool, SyncDatabaseError> {
    let result = sqlx::query(
        "UPDATE merchants SET backfill_done = TRUE, updated_at = ?1 WHERE id = ?2 AND backfill_done = FALSE",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
