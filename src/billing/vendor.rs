use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::associate::{BelongsToCompany, Keyed};
use super::company::{self, Company};
use super::error::{BillingError, parse_id};
use crate::validation::{self, Validator};

pub const LIST_LIMIT: i64 = 10;
pub const COMPANY_LIST_LIMIT: i64 = 20;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub company_id: Uuid,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
    #[sqlx(skip)]
    pub company: Option<Company>,
}

impl Keyed for Vendor {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl BelongsToCompany for Vendor {
    fn company_id(&self) -> Uuid {
        self.company_id
    }

    fn set_company(&mut self, company: Company) {
        self.company = Some(company);
    }
}

#[derive(Debug)]
pub struct NewVendor<'a> {
    pub name: &'a str,
    pub company_id: &'a str,
    pub created_by: &'a str,
}

#[tracing::instrument(skip(pool, new), fields(name = %new.name), err)]
pub async fn create(pool: &PgPool, new: &NewVendor<'_>) -> Result<Uuid, BillingError> {
    let mut v = Validator::new();
    v.check(validation::is_name(new.name), "Name must be valid");

    let company_id = v.select_key(
        new.company_id,
        "You must select a company",
        "Invalid company selected",
    );
    if let Some(id) = company_id {
        v.check(company::exists(pool, id).await?, "Invalid company selected");
    }

    v.finish()?;
    let company_id = company_id.ok_or(BillingError::InvalidKey("company"))?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO vendors (company_id, name, created_by) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(company_id)
    .bind(new.name.trim())
    .bind(new.created_by)
    .fetch_one(pool)
    .await?;

    tracing::info!(%id, %company_id, "vendor created");
    Ok(id)
}

pub async fn get(pool: &PgPool, id: &str) -> Result<Vendor, BillingError> {
    get_by_key(pool, parse_id("vendor", id)?).await
}

pub async fn get_by_key(pool: &PgPool, id: Uuid) -> Result<Vendor, BillingError> {
    sqlx::query_as::<_, Vendor>(
        "SELECT id, name, company_id, created_by, created_on FROM vendors WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(BillingError::NotFound("vendor"))
}

/// First [`LIST_LIMIT`] vendors by name, across all tenants.
pub async fn list(pool: &PgPool) -> Result<Vec<Vendor>, BillingError> {
    let vendors = sqlx::query_as::<_, Vendor>(
        r"
        SELECT id, name, company_id, created_by, created_on
        FROM vendors ORDER BY name, id LIMIT $1
        ",
    )
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(vendors)
}

pub async fn list_by_company(
    pool: &PgPool,
    company_id: Uuid,
) -> Result<Vec<Vendor>, BillingError> {
    let vendors = sqlx::query_as::<_, Vendor>(
        r"
        SELECT id, name, company_id, created_by, created_on
        FROM vendors WHERE company_id = $1
        ORDER BY name, id LIMIT $2
        ",
    )
    .bind(company_id)
    .bind(COMPANY_LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(vendors)
}

pub async fn count(pool: &PgPool) -> Result<i64, BillingError> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vendors")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
