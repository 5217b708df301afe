use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::error::{BillingError, parse_id};
use crate::validation::{self, Validator};

/// Cap on the global company listing. Also bounds the admin selection lists.
pub const LIST_LIMIT: i64 = 10;

/// Root of tenancy: users, vendors and bills all carry a `company_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewCompany<'a> {
    pub name: &'a str,
    pub created_by: &'a str,
}

#[tracing::instrument(skip(pool, new), fields(name = %new.name), err)]
pub async fn create(pool: &PgPool, new: &NewCompany<'_>) -> Result<Uuid, BillingError> {
    let mut v = Validator::new();
    v.check(validation::is_name(new.name), "Name must be valid");
    v.finish()?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO companies (name, created_by) VALUES ($1, $2) RETURNING id",
    )
    .bind(new.name.trim())
    .bind(new.created_by)
    .fetch_one(pool)
    .await?;

    tracing::info!(%id, "company created");
    Ok(id)
}

pub async fn get(pool: &PgPool, id: &str) -> Result<Company, BillingError> {
    get_by_key(pool, parse_id("company", id)?).await
}

pub async fn get_by_key(pool: &PgPool, id: Uuid) -> Result<Company, BillingError> {
    sqlx::query_as::<_, Company>(
        "SELECT id, name, created_by, created_on FROM companies WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(BillingError::NotFound("company"))
}

pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, BillingError> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM companies WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(found)
}

/// First [`LIST_LIMIT`] companies by name. Anything beyond the cap is not returned.
pub async fn list(pool: &PgPool) -> Result<Vec<Company>, BillingError> {
    let companies = sqlx::query_as::<_, Company>(
        "SELECT id, name, created_by, created_on FROM companies ORDER BY name, id LIMIT $1",
    )
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(companies)
}

pub async fn count(pool: &PgPool) -> Result<i64, BillingError> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
