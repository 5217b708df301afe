use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::associate::BelongsToCompany;
use super::blob::{self, UploadedFile};
use super::company::Company;
use super::error::{BillingError, parse_id};
use super::vendor::{self, Vendor};
use crate::validation::Validator;

pub const LIST_LIMIT: i64 = 10;
/// Cap per reconciled state on a tenant's bill listings.
pub const COMPANY_LIST_LIMIT: i64 = 20;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Bill {
    pub id: Uuid,
    /// Minor currency units.
    pub amt: i64,
    pub posted_by: String,
    pub posted_on: DateTime<Utc>,
    pub company_id: Uuid,
    pub vendor_id: Uuid,
    pub blob_key: Uuid,
    pub paid: bool,
    pub reconciled: bool,
    #[sqlx(skip)]
    pub company: Option<Company>,
    #[sqlx(skip)]
    pub vendor: Option<Vendor>,
}

impl BelongsToCompany for Bill {
    fn company_id(&self) -> Uuid {
        self.company_id
    }

    fn set_company(&mut self, company: Company) {
        self.company = Some(company);
    }
}

#[derive(Debug)]
pub struct NewBill<'a> {
    pub amt: i64,
    pub vendor_id: &'a str,
    pub file: Option<UploadedFile>,
    pub posted_by: &'a str,
    /// When set, the vendor must belong to this company.
    pub company_scope: Option<Uuid>,
}

/// Validate, store the uploaded file, then insert the bill under its
/// vendor's company. Nothing is written when validation fails.
#[tracing::instrument(skip(pool, blobs, new), fields(amt = new.amt, vendor = %new.vendor_id), err)]
pub async fn create(
    pool: &PgPool,
    blobs: &opendal::Operator,
    new: NewBill<'_>,
) -> Result<Uuid, BillingError> {
    let mut v = Validator::new();
    v.check(new.amt > 0, "Amount must be greater than 0");

    let vendor_key = v.select_key(
        new.vendor_id,
        "You must choose a vendor for the bill",
        "Invalid vendor selected",
    );
    let vendor = match vendor_key {
        Some(key) => match vendor::get_by_key(pool, key).await {
            Ok(found)
                if new
                    .company_scope
                    .is_none_or(|company| company == found.company_id) =>
            {
                Some(found)
            }
            Ok(_) | Err(BillingError::NotFound(_)) => {
                v.push("Invalid vendor selected");
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    v.check(new.file.is_some(), "You must upload a bill file");
    v.finish()?;
    let vendor =
        vendor.ok_or_else(|| BillingError::Validation(vec!["Invalid vendor selected".into()]))?;
    let file = new
        .file
        .ok_or_else(|| BillingError::Validation(vec!["You must upload a bill file".into()]))?;

    let blob = blob::put(pool, blobs, file).await?;

    let id: Uuid = sqlx::query_scalar(
        r"
        INSERT INTO bills (company_id, vendor_id, blob_key, amt, posted_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(vendor.company_id)
    .bind(vendor.id)
    .bind(blob.blob_key)
    .bind(new.amt)
    .bind(new.posted_by)
    .fetch_one(pool)
    .await?;

    tracing::info!(%id, company_id = %vendor.company_id, "bill created");
    Ok(id)
}

pub async fn get(pool: &PgPool, id: &str) -> Result<Bill, BillingError> {
    let id = parse_id("bill", id)?;
    sqlx::query_as::<_, Bill>(
        r"
        SELECT id, amt, posted_by, posted_on, company_id, vendor_id, blob_key, paid, reconciled
        FROM bills WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(BillingError::NotFound("bill"))
}

/// Fetch a bill only if it belongs to `company_id`. Bills of other tenants
/// are reported as missing.
pub async fn get_in_company(
    pool: &PgPool,
    id: &str,
    company_id: Uuid,
) -> Result<Bill, BillingError> {
    let id = parse_id("bill", id)?;
    sqlx::query_as::<_, Bill>(
        r"
        SELECT id, amt, posted_by, posted_on, company_id, vendor_id, blob_key, paid, reconciled
        FROM bills WHERE id = $1 AND company_id = $2
        ",
    )
    .bind(id)
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .ok_or(BillingError::NotFound("bill"))
}

/// Most recent [`LIST_LIMIT`] bills across all tenants.
pub async fn list(pool: &PgPool) -> Result<Vec<Bill>, BillingError> {
    let bills = sqlx::query_as::<_, Bill>(
        r"
        SELECT id, amt, posted_by, posted_on, company_id, vendor_id, blob_key, paid, reconciled
        FROM bills ORDER BY posted_on DESC, id LIMIT $1
        ",
    )
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(bills)
}

/// A tenant's bills in one reconciled state, most recent first.
pub async fn list_by_company(
    pool: &PgPool,
    company_id: Uuid,
    reconciled: bool,
) -> Result<Vec<Bill>, BillingError> {
    let bills = sqlx::query_as::<_, Bill>(
        r"
        SELECT id, amt, posted_by, posted_on, company_id, vendor_id, blob_key, paid, reconciled
        FROM bills WHERE company_id = $1 AND reconciled = $2
        ORDER BY posted_on DESC, id LIMIT $3
        ",
    )
    .bind(company_id)
    .bind(reconciled)
    .bind(COMPANY_LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(bills)
}

#[tracing::instrument(skip(pool), err)]
pub async fn set_reconciled(
    pool: &PgPool,
    id: &str,
    reconciled: bool,
) -> Result<(), BillingError> {
    let id = parse_id("bill", id)?;
    let result = sqlx::query("UPDATE bills SET reconciled = $2 WHERE id = $1")
        .bind(id)
        .bind(reconciled)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BillingError::NotFound("bill"));
    }
    Ok(())
}

pub async fn count(pool: &PgPool) -> Result<i64, BillingError> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
