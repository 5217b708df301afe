use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{Uri, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use serde::Serialize;

use super::{BillForm, FormPage, IdParam, render_signed_in};
use crate::auth::middleware::SignedIn;
use crate::billing::associate;
use crate::billing::bill::{self, Bill, NewBill};
use crate::billing::blob::{self, BlobInfo};
use crate::billing::vendor::{self, Vendor};
use crate::billing::BillingError;
use crate::error::AppError;
use crate::store::AppState;

pub fn router(max_upload: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(upload_form))
        .route(
            "/bills/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/bills/dashboard", get(dashboard))
        .route("/bills/view", get(view))
        .route("/bills/download", get(download))
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct BillsDashboard {
    unreconciled: Vec<Bill>,
    reconciled: Vec<Bill>,
}

#[derive(Debug, Serialize)]
struct BillView {
    bill: Bill,
    file: BlobInfo,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn render_upload_form(
    state: &AppState,
    signed: &SignedIn,
    path: &str,
    form: BillForm,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let vendors: Vec<Vendor> =
        vendor::list_by_company(&state.pool, signed.session.company.id).await?;
    render_signed_in(
        state,
        signed,
        path,
        "upload.html",
        "Upload a bill",
        FormPage {
            form,
            errors,
            choices: vendors,
        },
    )
}

async fn upload_form(
    State(state): State<AppState>,
    signed: SignedIn,
    uri: Uri,
) -> Result<Response, AppError> {
    render_upload_form(&state, &signed, uri.path(), BillForm::default(), vec![]).await
}

async fn upload(
    State(state): State<AppState>,
    signed: SignedIn,
    uri: Uri,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = BillForm::read(multipart).await?;

    let new = NewBill {
        amt: form.amount,
        vendor_id: &form.vendor,
        file: form.file.take(),
        posted_by: &signed.caller.email,
        company_scope: Some(signed.session.company.id),
    };

    match bill::create(&state.pool, &state.blobs, new).await {
        Ok(id) => Ok(Redirect::to(&format!("/bills/view?id={id}")).into_response()),
        Err(BillingError::Validation(errors)) => {
            tracing::info!(email = %signed.caller.email, ?errors, "bill upload rejected");
            render_upload_form(&state, &signed, uri.path(), form, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn dashboard(
    State(state): State<AppState>,
    signed: SignedIn,
    uri: Uri,
) -> Result<Response, AppError> {
    let company_id = signed.session.company.id;
    let (mut unreconciled, mut reconciled) = tokio::try_join!(
        bill::list_by_company(&state.pool, company_id, false),
        bill::list_by_company(&state.pool, company_id, true),
    )?;
    associate::load_vendors(&state.pool, &mut unreconciled).await?;
    associate::load_vendors(&state.pool, &mut reconciled).await?;

    render_signed_in(
        &state,
        &signed,
        uri.path(),
        "bills/dashboard.html",
        "Bills",
        BillsDashboard {
            unreconciled,
            reconciled,
        },
    )
}

async fn view(
    State(state): State<AppState>,
    signed: SignedIn,
    uri: Uri,
    Query(params): Query<IdParam>,
) -> Result<Response, AppError> {
    let mut bill = bill::get_in_company(&state.pool, &params.id, signed.session.company.id).await?;
    associate::load_vendors(&state.pool, std::slice::from_mut(&mut bill)).await?;
    let file = blob::stat(&state.pool, bill.blob_key).await?;

    render_signed_in(
        &state,
        &signed,
        uri.path(),
        "view.html",
        "Bill",
        BillView { bill, file },
    )
}

/// Stream a bill's file. Only bills of the caller's own company resolve.
async fn download(
    State(state): State<AppState>,
    signed: SignedIn,
    Query(params): Query<IdParam>,
) -> Result<Response, AppError> {
    let bill = bill::get_in_company(&state.pool, &params.id, signed.session.company.id).await?;
    let info = blob::stat(&state.pool, bill.blob_key).await?;
    let data = blob::read(&state.blobs, bill.blob_key).await?;

    Ok((
        [
            (header::CONTENT_TYPE, info.content_type),
            (
                header::CONTENT_DISPOSITION,
                blob::attachment_header(&info.filename),
            ),
        ],
        data,
    )
        .into_response())
}
