use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;

use crate::auth::identity::Caller;
use crate::billing::user;
use crate::error::AppError;
use crate::store::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/logout", get(logout))
}

/// Landing point after the identity provider signs someone in.
async fn login(State(state): State<AppState>, caller: Caller) -> Result<Response, AppError> {
    if !user::record_login(&state.pool, &caller.email).await? {
        tracing::info!(email = %caller.email, "login without a billing user record");
    }

    let target = if caller.is_admin {
        "/admin/dashboard"
    } else {
        "/bills/dashboard"
    };
    Ok(Redirect::to(target).into_response())
}

async fn logout(State(state): State<AppState>) -> Redirect {
    Redirect::to(state.identity.logout_url())
}
