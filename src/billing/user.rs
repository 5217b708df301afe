use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::associate::BelongsToCompany;
use super::company::{self, Company};
use super::error::{BillingError, parse_id};
use crate::validation::{self, Validator};

pub const LIST_LIMIT: i64 = 10;
pub const COMPANY_LIST_LIMIT: i64 = 20;

const DUPLICATE_EMAIL: &str = "User already exists";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub company_id: Uuid,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
    pub last_login_on: Option<DateTime<Utc>>,
    /// Filled by the association layer, never stored.
    #[sqlx(skip)]
    pub company: Option<Company>,
}

impl BelongsToCompany for User {
    fn company_id(&self) -> Uuid {
        self.company_id
    }

    fn set_company(&mut self, company: Company) {
        self.company = Some(company);
    }
}

/// A signed-in caller's billing identity: their user record and its company.
#[derive(Debug, Clone, Serialize)]
pub struct UserSession {
    pub user: User,
    pub company: Company,
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    /// Raw id as submitted by the form.
    pub company_id: &'a str,
    pub created_by: &'a str,
}

/// Create a user after checking every field.
///
/// The email check is read-then-write with no isolation. A concurrent create
/// that slips past it hits the unique constraint and is reported the same way.
#[tracing::instrument(skip(pool, new), fields(email = %new.email), err)]
pub async fn create(pool: &PgPool, new: &NewUser<'_>) -> Result<Uuid, BillingError> {
    let email = validation::normalize_email(new.email);
    let mut v = Validator::new();

    if v.check(validation::is_email(&email), "Email must be valid")
        && email_exists(pool, &email).await?
    {
        v.push(DUPLICATE_EMAIL);
    }

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

    let inserted = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (company_id, email, created_by) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(company_id)
    .bind(&email)
    .bind(new.created_by)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(id) => {
            tracing::info!(%id, %company_id, "user created");
            Ok(id)
        }
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(BillingError::Validation(vec![DUPLICATE_EMAIL.into()]))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn get(pool: &PgPool, id: &str) -> Result<User, BillingError> {
    let id = parse_id("user", id)?;
    sqlx::query_as::<_, User>(
        r"
        SELECT id, email, company_id, created_by, created_on, last_login_on
        FROM users WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(BillingError::NotFound("user"))
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, BillingError> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(validation::normalize_email(email))
        .fetch_one(pool)
        .await?;
    Ok(found)
}

/// Resolve the user record and company behind a signed-in email, if any.
pub async fn find_session_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserSession>, BillingError> {
    let user = sqlx::query_as::<_, User>(
        r"
        SELECT id, email, company_id, created_by, created_on, last_login_on
        FROM users WHERE email = $1
        LIMIT 1
        ",
    )
    .bind(validation::normalize_email(email))
    .fetch_optional(pool)
    .await?;

    let Some(user) = user else {
        return Ok(None);
    };

    let company = company::get_by_key(pool, user.company_id).await?;
    Ok(Some(UserSession { user, company }))
}

/// Stamp `last_login_on`. Returns false when the email has no user record.
#[tracing::instrument(skip(pool), err)]
pub async fn record_login(pool: &PgPool, email: &str) -> Result<bool, BillingError> {
    let result = sqlx::query("UPDATE users SET last_login_on = now() WHERE email = $1")
        .bind(validation::normalize_email(email))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a user, returning the removed record.
#[tracing::instrument(skip(pool), err)]
pub async fn delete(pool: &PgPool, id: &str) -> Result<User, BillingError> {
    let id = parse_id("user", id)?;
    let user = sqlx::query_as::<_, User>(
        r"
        DELETE FROM users WHERE id = $1
        RETURNING id, email, company_id, created_by, created_on, last_login_on
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(BillingError::NotFound("user"))?;

    tracing::info!(%id, email = %user.email, "user deleted");
    Ok(user)
}

/// First [`LIST_LIMIT`] users by email.
pub async fn list(pool: &PgPool) -> Result<Vec<User>, BillingError> {
    let users = sqlx::query_as::<_, User>(
        r"
        SELECT id, email, company_id, created_by, created_on, last_login_on
        FROM users ORDER BY email LIMIT $1
        ",
    )
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Users of one tenant, by email, capped at [`COMPANY_LIST_LIMIT`].
pub async fn list_by_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<User>, BillingError> {
    let users = sqlx::query_as::<_, User>(
        r"
        SELECT id, email, company_id, created_by, created_on, last_login_on
        FROM users WHERE company_id = $1
        ORDER BY email LIMIT $2
        ",
    )
    .bind(company_id)
    .bind(COMPANY_LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn count(pool: &PgPool) -> Result<i64, BillingError> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
