pub mod admin;
pub mod bills;
pub mod login;

use axum::Router;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::auth::guard::require_admin;
use crate::auth::identity::Caller;
use crate::auth::middleware::SignedIn;
use crate::billing::blob::UploadedFile;
use crate::billing::dashboard::{self, DashboardInfo};
use crate::error::AppError;
use crate::render::{Page, UserInfo};
use crate::store::AppState;

/// Every HTML route. Admin routes sit behind [`require_admin`].
pub fn router(state: &AppState) -> Router<AppState> {
    let max_upload = state.config.max_upload_bytes;
    let admin = admin::router(max_upload).route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        require_admin,
    ));

    Router::new()
        .merge(login::router())
        .merge(bills::router(max_upload))
        .merge(admin)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Content of every admin page: the sidebar counts plus the page itself.
#[derive(Debug, Serialize)]
pub struct AdminPage<T: Serialize> {
    pub dashboard: DashboardInfo,
    pub page: T,
}

/// A form page: what was submitted, what was wrong with it, and the choices
/// offered by its select box.
#[derive(Debug, Serialize)]
pub struct FormPage<F: Serialize, C: Serialize> {
    pub form: F,
    pub errors: Vec<String>,
    pub choices: Vec<C>,
}

pub fn render_signed_in<T: Serialize>(
    state: &AppState,
    signed: &SignedIn,
    path: &str,
    template: &str,
    title: &str,
    content: T,
) -> Result<Response, AppError> {
    let page = Page {
        title,
        path,
        user: Some(UserInfo::for_caller(&signed.caller, state)),
        session: Some(&signed.session),
        content,
    };
    Ok(state.templates.render(template, &page)?.into_response())
}

/// Render an admin page. The sidebar counts are recomputed every time.
pub async fn render_admin<T: Serialize>(
    state: &AppState,
    caller: &Caller,
    path: &str,
    template: &str,
    title: &str,
    content: T,
) -> Result<Response, AppError> {
    let dashboard = dashboard::build_summary(&state.pool, path).await?;
    let page = Page {
        title,
        path,
        user: Some(UserInfo::for_caller(caller, state)),
        session: None,
        content: AdminPage {
            dashboard,
            page: content,
        },
    };
    Ok(state.templates.render(template, &page)?.into_response())
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// `?id=` on view and download routes, and the `id` field of action forms.
/// A missing id is treated as an empty one and fails key decoding.
#[derive(Debug, Deserialize)]
pub struct IdParam {
    #[serde(default)]
    pub id: String,
}

/// Fields of the bill upload form, shared by the tenant and admin routes.
#[derive(Debug, Default, Serialize)]
pub struct BillForm {
    /// Minor currency units. Anything that is not an integer reads as 0.
    pub amount: i64,
    pub vendor: String,
    #[serde(skip)]
    pub file: Option<UploadedFile>,
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

fn parse_amount(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

impl BillForm {
    /// Read `amount`, `vendor` and `file`. An empty file part counts as no
    /// file. Unknown parts are skipped.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().map(ToOwned::to_owned);
            match name.as_deref() {
                Some("amount") => {
                    form.amount = parse_amount(&field.text().await.map_err(bad_multipart)?);
                }
                Some("vendor") => {
                    form.vendor = field.text().await.map_err(bad_multipart)?.trim().to_owned();
                }
                Some("file") => {
                    let filename = field.file_name().unwrap_or("upload").to_owned();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_owned();
                    let data = field.bytes().await.map_err(bad_multipart)?;
                    if !data.is_empty() {
                        form.file = Some(UploadedFile {
                            filename,
                            content_type,
                            data,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("500", 500)]
    #[case(" 42 ", 42)]
    #[case("", 0)]
    #[case("12.50", 0)]
    #[case("ten", 0)]
    #[case("-5", -5)]
    fn amount_parsing(#[case] raw: &str, #[case] expected: i64) {
        assert_eq!(parse_amount(raw), expected);
    }

    #[test]
    fn bill_form_serializes_without_file() {
        let form = BillForm {
            amount: 500,
            vendor: "v".into(),
            file: None,
        };
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json, serde_json::json!({ "amount": 500, "vendor": "v" }));
    }
}
