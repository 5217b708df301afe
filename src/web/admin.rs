use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::{Deserialize, Serialize};

use super::{BillForm, FormPage, IdParam, render_admin};
use crate::auth::identity::Caller;
use crate::billing::BillingError;
use crate::billing::associate;
use crate::billing::bill::{self, NewBill};
use crate::billing::company::{self, Company, NewCompany};
use crate::billing::dashboard;
use crate::billing::user::{self, NewUser, User};
use crate::billing::vendor::{self, NewVendor, Vendor};
use crate::error::AppError;
use crate::store::AppState;

/// Admin pages and forms. Mounted behind `require_admin`.
pub fn router(max_upload: usize) -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/admin/companies", get(list_companies))
        .route("/admin/users", get(list_users))
        .route("/admin/vendors", get(list_vendors))
        .route("/admin/bills", get(list_bills))
        .route("/admin/company/new", get(new_company))
        .route("/admin/company/create", post(create_company))
        .route("/admin/company/view", get(view_company))
        .route("/admin/user/new", get(new_user))
        .route("/admin/user/create", post(create_user))
        .route("/admin/user/delete", post(delete_user))
        .route("/admin/vendor/new", get(new_vendor))
        .route("/admin/vendor/create", post(create_vendor))
        .route("/admin/vendor/view", get(view_vendor))
        .route("/admin/bill/new", get(new_bill))
        .route(
            "/admin/bill/create",
            post(create_bill).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/admin/bill/reconcile", post(reconcile_bill))
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompanyInput {
    #[serde(default)]
    pub name: String,
}

/// Shared by the user and vendor forms: a name or email plus a company.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemberInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileInput {
    #[serde(default)]
    pub id: String,
    #[serde(default = "reconcile_default")]
    pub reconciled: bool,
}

fn reconcile_default() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct CompanyView {
    company: Company,
    users: Vec<User>,
    vendors: Vec<Vendor>,
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

async fn admin_dashboard(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    let home = dashboard::build_home(&state.pool).await?;
    render_admin(
        &state,
        &caller,
        uri.path(),
        "admin/dashboard.html",
        "Admin Dashboard",
        home,
    )
    .await
}

async fn list_companies(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    let companies = company::list(&state.pool).await?;
    render_admin(
        &state,
        &caller,
        uri.path(),
        "admin/companies.html",
        "Companies",
        companies,
    )
    .await
}

async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    let mut users = user::list(&state.pool).await?;
    associate::load_companies(&state.pool, &mut users).await?;
    render_admin(
        &state,
        &caller,
        uri.path(),
        "admin/users.html",
        "Users",
        users,
    )
    .await
}

async fn list_vendors(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    let mut vendors = vendor::list(&state.pool).await?;
    associate::load_companies(&state.pool, &mut vendors).await?;
    render_admin(
        &state,
        &caller,
        uri.path(),
        "admin/vendors.html",
        "Vendors",
        vendors,
    )
    .await
}

async fn list_bills(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    let mut bills = bill::list(&state.pool).await?;
    associate::load_companies(&state.pool, &mut bills).await?;
    associate::load_vendors(&state.pool, &mut bills).await?;
    render_admin(
        &state,
        &caller,
        uri.path(),
        "admin/bills.html",
        "Bills",
        bills,
    )
    .await
}

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

async fn company_form(
    state: &AppState,
    caller: &Caller,
    path: &str,
    form: CompanyInput,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let page: FormPage<_, ()> = FormPage {
        form,
        errors,
        choices: vec![],
    };
    render_admin(state, caller, path, "admin/new_company.html", "New Company", page).await
}

async fn new_company(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    company_form(&state, &caller, uri.path(), CompanyInput::default(), vec![]).await
}

async fn create_company(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
    Form(input): Form<CompanyInput>,
) -> Result<Response, AppError> {
    let new = NewCompany {
        name: &input.name,
        created_by: &caller.email,
    };
    match company::create(&state.pool, &new).await {
        Ok(_) => Ok(Redirect::to("/admin/dashboard").into_response()),
        Err(BillingError::Validation(errors)) => {
            company_form(&state, &caller, uri.path(), input, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn view_company(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
    Query(params): Query<IdParam>,
) -> Result<Response, AppError> {
    let company = company::get(&state.pool, &params.id).await?;
    let (users, vendors) = tokio::try_join!(
        user::list_by_company(&state.pool, company.id),
        vendor::list_by_company(&state.pool, company.id),
    )?;
    let title = company.name.clone();
    render_admin(
        &state,
        &caller,
        uri.path(),
        "admin/view_company.html",
        &title,
        CompanyView {
            company,
            users,
            vendors,
        },
    )
    .await
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn user_form(
    state: &AppState,
    caller: &Caller,
    path: &str,
    form: MemberInput,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let companies = company::list(&state.pool).await?;
    let page = FormPage {
        form,
        errors,
        choices: companies,
    };
    render_admin(state, caller, path, "admin/new_user.html", "New User", page).await
}

async fn new_user(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    user_form(&state, &caller, uri.path(), MemberInput::default(), vec![]).await
}

async fn create_user(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
    Form(input): Form<MemberInput>,
) -> Result<Response, AppError> {
    let new = NewUser {
        email: &input.email,
        company_id: &input.company,
        created_by: &caller.email,
    };
    match user::create(&state.pool, &new).await {
        Ok(_) => Ok(Redirect::to("/admin/dashboard").into_response()),
        Err(BillingError::Validation(errors)) => {
            user_form(&state, &caller, uri.path(), input, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_user(
    State(state): State<AppState>,
    caller: Caller,
    Form(params): Form<IdParam>,
) -> Result<Response, AppError> {
    let removed = user::delete(&state.pool, &params.id).await?;
    tracing::info!(by = %caller.email, email = %removed.email, "user deleted by admin");
    Ok(Redirect::to("/admin/dashboard").into_response())
}

// ---------------------------------------------------------------------------
// Vendors
// ---------------------------------------------------------------------------

async fn vendor_form(
    state: &AppState,
    caller: &Caller,
    path: &str,
    form: MemberInput,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let companies = company::list(&state.pool).await?;
    let page = FormPage {
        form,
        errors,
        choices: companies,
    };
    render_admin(state, caller, path, "admin/new_vendor.html", "New Vendor", page).await
}

async fn new_vendor(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    vendor_form(&state, &caller, uri.path(), MemberInput::default(), vec![]).await
}

async fn create_vendor(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
    Form(input): Form<MemberInput>,
) -> Result<Response, AppError> {
    let new = NewVendor {
        name: &input.name,
        company_id: &input.company,
        created_by: &caller.email,
    };
    match vendor::create(&state.pool, &new).await {
        Ok(_) => Ok(Redirect::to("/admin/dashboard").into_response()),
        Err(BillingError::Validation(errors)) => {
            vendor_form(&state, &caller, uri.path(), input, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn view_vendor(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
    Query(params): Query<IdParam>,
) -> Result<Response, AppError> {
    let mut vendor = vendor::get(&state.pool, &params.id).await?;
    associate::load_companies(&state.pool, std::slice::from_mut(&mut vendor)).await?;
    let title = vendor.name.clone();
    render_admin(
        &state,
        &caller,
        uri.path(),
        "admin/view_vendor.html",
        &title,
        vendor,
    )
    .await
}

// ---------------------------------------------------------------------------
// Bills
// ---------------------------------------------------------------------------

async fn bill_form(
    state: &AppState,
    caller: &Caller,
    path: &str,
    form: BillForm,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let mut vendors = vendor::list(&state.pool).await?;
    associate::load_companies(&state.pool, &mut vendors).await?;
    let page = FormPage {
        form,
        errors,
        choices: vendors,
    };
    render_admin(state, caller, path, "admin/new_bill.html", "New Bill", page).await
}

async fn new_bill(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
) -> Result<Response, AppError> {
    bill_form(&state, &caller, uri.path(), BillForm::default(), vec![]).await
}

async fn create_bill(
    State(state): State<AppState>,
    caller: Caller,
    uri: Uri,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = BillForm::read(multipart).await?;

    let new = NewBill {
        amt: form.amount,
        vendor_id: &form.vendor,
        file: form.file.take(),
        posted_by: &caller.email,
        company_scope: None,
    };
    match bill::create(&state.pool, &state.blobs, new).await {
        Ok(_) => Ok(Redirect::to("/admin/bills").into_response()),
        Err(BillingError::Validation(errors)) => {
            bill_form(&state, &caller, uri.path(), form, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn reconcile_bill(
    State(state): State<AppState>,
    caller: Caller,
    Form(input): Form<ReconcileInput>,
) -> Result<Response, AppError> {
    bill::set_reconciled(&state.pool, &input.id, input.reconciled).await?;
    tracing::info!(by = %caller.email, bill = %input.id, reconciled = input.reconciled, "bill reconciliation updated");
    Ok(Redirect::to("/admin/bills").into_response())
}
