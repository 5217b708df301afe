//! Hydration of the transient `company` / `vendor` references.
//!
//! Two strategies: a batched multi-get that returns one slot per requested
//! key, and an in-memory [`CompanyIndex`] for views that already hold a
//! company list.

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use uuid::Uuid;

use super::bill::Bill;
use super::company::Company;
use super::error::BillingError;
use super::vendor::Vendor;

pub trait Keyed {
    fn key(&self) -> Uuid;
}

impl Keyed for Company {
    fn key(&self) -> Uuid {
        self.id
    }
}

/// Records that carry a tenant reference.
pub trait BelongsToCompany {
    fn company_id(&self) -> Uuid;
    fn set_company(&mut self, company: Company);
}

/// Line fetched records up with `keys`: slot `i` holds the record for
/// `keys[i]`, or `None` when the store had no such record.
pub fn align<T: Keyed + Clone>(keys: &[Uuid], fetched: Vec<T>) -> Vec<Option<T>> {
    let by_key: HashMap<Uuid, T> = fetched.into_iter().map(|t| (t.key(), t)).collect();
    keys.iter().map(|k| by_key.get(k).cloned()).collect()
}

/// Batched get. Fails only if the query itself fails; missing companies
/// come back as `None` in their slot.
pub async fn get_companies(
    pool: &PgPool,
    keys: &[Uuid],
) -> Result<Vec<Option<Company>>, BillingError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let fetched = sqlx::query_as::<_, Company>(
        "SELECT id, name, created_by, created_on FROM companies WHERE id = ANY($1)",
    )
    .bind(keys)
    .fetch_all(pool)
    .await?;
    Ok(align(keys, fetched))
}

pub async fn get_vendors(
    pool: &PgPool,
    keys: &[Uuid],
) -> Result<Vec<Option<Vendor>>, BillingError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let fetched = sqlx::query_as::<_, Vendor>(
        "SELECT id, name, company_id, created_by, created_on FROM vendors WHERE id = ANY($1)",
    )
    .bind(keys)
    .fetch_all(pool)
    .await?;
    Ok(align(keys, fetched))
}

/// Fill `company` on every item with one batched fetch.
pub async fn load_companies<T: BelongsToCompany>(
    pool: &PgPool,
    items: &mut [T],
) -> Result<(), BillingError> {
    let keys: Vec<Uuid> = items.iter().map(BelongsToCompany::company_id).collect();
    let companies = get_companies(pool, &keys).await?;

    for (item, company) in items.iter_mut().zip(companies) {
        match company {
            Some(c) => item.set_company(c),
            None => tracing::warn!(company_id = %item.company_id(), "company reference did not resolve"),
        }
    }
    Ok(())
}

pub async fn load_vendors(pool: &PgPool, bills: &mut [Bill]) -> Result<(), BillingError> {
    let keys: Vec<Uuid> = bills.iter().map(|b| b.vendor_id).collect();
    let vendors = get_vendors(pool, &keys).await?;

    for (bill, vendor) in bills.iter_mut().zip(vendors) {
        if vendor.is_none() {
            tracing::warn!(bill_id = %bill.id, vendor_id = %bill.vendor_id, "vendor reference did not resolve");
        }
        bill.vendor = vendor;
    }
    Ok(())
}

/// Company lookup keyed by id, built from a list the caller already fetched.
#[derive(Debug, Default)]
pub struct CompanyIndex {
    by_id: HashMap<Uuid, Company>,
}

impl CompanyIndex {
    pub fn new(companies: &[Company]) -> Self {
        let mut index = Self::default();
        index.extend(companies.iter().cloned());
        index
    }

    pub fn extend(&mut self, companies: impl IntoIterator<Item = Company>) {
        self.by_id
            .extend(companies.into_iter().map(|c| (c.id, c)));
    }

    pub fn get(&self, id: Uuid) -> Option<&Company> {
        self.by_id.get(&id)
    }

    /// Attach companies to `items`. Returns the distinct company ids that
    /// are not in the index, in first-seen order.
    pub fn attach<T: BelongsToCompany>(&self, items: &mut [T]) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        let mut unresolved = Vec::new();
        for item in items.iter_mut() {
            let id = item.company_id();
            match self.by_id.get(&id) {
                Some(company) => item.set_company(company.clone()),
                None => {
                    if seen.insert(id) {
                        unresolved.push(id);
                    }
                }
            }
        }
        unresolved
    }
}
