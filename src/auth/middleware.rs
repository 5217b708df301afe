use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::auth::identity::Caller;
use crate::billing::user::{self, UserSession};
use crate::error::AppError;
use crate::render::{Page, UserInfo};
use crate::store::AppState;

const SIGN_IN_TITLE: &str = "Please log in to continue ...";
const INVALID_USER_TITLE: &str = "Invalid user ...";

/// Identity resolved for this request, cached so the guard and the handler
/// share one resolution.
#[derive(Debug, Clone)]
struct ResolvedCaller(Option<Caller>);

fn resolve_once(parts: &mut Parts, state: &AppState) -> Option<Caller> {
    if let Some(ResolvedCaller(caller)) = parts.extensions.get::<ResolvedCaller>() {
        return caller.clone();
    }
    let caller = state.identity.resolve(&parts.headers);
    parts.extensions.insert(ResolvedCaller(caller.clone()));
    caller
}

impl UserInfo {
    pub fn for_caller(caller: &Caller, state: &AppState) -> Self {
        Self {
            admin: caller.is_admin,
            name: caller.email.clone(),
            logout_url: state.identity.logout_url().to_owned(),
        }
    }
}

/// Render the sign-in page pointing at the provider's login URL.
fn sign_in_page(state: &AppState, caller: Option<&Caller>, path: &str, title: &str) -> Response {
    let page = Page {
        title,
        path,
        user: caller.map(|c| UserInfo::for_caller(c, state)),
        session: None,
        content: state.identity.login_url(),
    };
    match state.templates.render("signin.html", &page) {
        Ok(html) => html.into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Any authenticated caller. Anonymous requests get the sign-in page.
impl FromRequestParts<AppState> for Caller {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_once(parts, state)
            .ok_or_else(|| sign_in_page(state, None, parts.uri.path(), SIGN_IN_TITLE))
    }
}

/// Identity if present; never rejects.
#[derive(Debug, Clone)]
pub struct OptionalCaller(pub Option<Caller>);

impl FromRequestParts<AppState> for OptionalCaller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_once(parts, state)))
    }
}

/// An authenticated caller who also has a billing user record and company.
/// Everything a signed-in handler reads is scoped to `session.company`.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub caller: Caller,
    pub session: UserSession,
}

impl FromRequestParts<AppState> for SignedIn {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;

        match user::find_session_by_email(&state.pool, &caller.email).await {
            Ok(Some(session)) => {
                tracing::debug!(user_id = %session.user.id, company_id = %session.company.id, "session loaded");
                Ok(Self { caller, session })
            }
            Ok(None) => Err(sign_in_page(
                state,
                Some(&caller),
                parts.uri.path(),
                INVALID_USER_TITLE,
            )),
            Err(e) => Err(AppError::from(e).into_response()),
        }
    }
}
