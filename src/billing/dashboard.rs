use serde::Serialize;
use sqlx::PgPool;

use super::associate::{CompanyIndex, get_companies};
use super::bill;
use super::company::{self, Company};
use super::error::BillingError;
use super::user::{self, User};
use super::vendor::{self, Vendor};

/// Entity counts shown in the admin sidebar, plus the path being viewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardInfo {
    pub user_count: i64,
    pub company_count: i64,
    pub vendor_count: i64,
    pub bill_count: i64,
    pub path: String,
}

/// Recomputed on every admin page. Any failed count fails the whole summary.
pub async fn build_summary(pool: &PgPool, path: &str) -> Result<DashboardInfo, BillingError> {
    let (user_count, company_count, vendor_count, bill_count) = tokio::try_join!(
        user::count(pool),
        company::count(pool),
        vendor::count(pool),
        bill::count(pool),
    )?;

    Ok(DashboardInfo {
        user_count,
        company_count,
        vendor_count,
        bill_count,
        path: path.to_owned(),
    })
}

#[derive(Debug, Serialize)]
pub struct DashboardHome {
    pub users: Vec<User>,
    pub companies: Vec<Company>,
    pub vendors: Vec<Vendor>,
    /// Users and vendors whose company could not be found at all.
    pub unresolved: usize,
}

/// Capped user/company/vendor listings with companies attached.
///
/// The company listing is capped, so users and vendors can point at
/// companies outside it. Those are fetched in one batch; whatever is still
/// missing after that is counted and logged rather than dropped silently.
pub async fn build_home(pool: &PgPool) -> Result<DashboardHome, BillingError> {
    let (companies, mut users, mut vendors) =
        tokio::try_join!(company::list(pool), user::list(pool), vendor::list(pool))?;

    let mut index = CompanyIndex::new(&companies);
    let mut missing = index.attach(&mut users);
    for id in index.attach(&mut vendors) {
        if !missing.contains(&id) {
            missing.push(id);
        }
    }

    let mut unresolved = 0;
    if !missing.is_empty() {
        index.extend(get_companies(pool, &missing).await?.into_iter().flatten());
        let still_missing: Vec<_> = index
            .attach(&mut users)
            .into_iter()
            .chain(index.attach(&mut vendors))
            .collect();

        unresolved = users.iter().filter(|u| u.company.is_none()).count()
            + vendors.iter().filter(|v| v.company.is_none()).count();
        if unresolved > 0 {
            tracing::warn!(
                unresolved,
                companies = ?still_missing,
                "dashboard entries reference unknown companies"
            );
        }
    }

    Ok(DashboardHome {
        users,
        companies,
        vendors,
        unresolved,
    })
}
