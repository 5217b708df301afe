use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::middleware::OptionalCaller;

/// Where callers without admin privilege are sent.
pub const NON_ADMIN_REDIRECT: &str = "/bills/dashboard";

/// Admin-only gate.
///
/// Usage:
/// ```ignore
/// Router::new()
///     .route("/admin/dashboard", get(handler))
///     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_admin))
/// ```
///
/// Non-admin and anonymous callers are redirected; the wrapped handler never
/// runs for them.
pub async fn require_admin(
    OptionalCaller(caller): OptionalCaller,
    req: Request,
    next: Next,
) -> Response {
    match caller {
        Some(caller) if caller.is_admin => next.run(req).await,
        other => {
            tracing::warn!(
                email = other.as_ref().map(|c| c.email.as_str()),
                path = %req.uri().path(),
                "admin route denied"
            );
            Redirect::to(NON_ADMIN_REDIRECT).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::identity::IdentityProvider;
    use crate::config::Config;
    use crate::render::Templates;
    use crate::store::AppState;

    const ADMIN: &str = "admin@acme.test";

    fn state() -> AppState {
        let mut config = Config::load();
        config.identity_header = "x-forwarded-email".into();
        config.admin_emails = vec![ADMIN.into()];

        // Never connects: the guard does not touch the database
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://billing@localhost:1/unused")
            .unwrap();
        let blobs = opendal::Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish();

        AppState {
            pool,
            blobs,
            templates: Arc::new(Templates::load()),
            identity: Arc::new(IdentityProvider::from_config(&config).unwrap()),
            config: Arc::new(config),
        }
    }

    fn guarded(hits: Arc<AtomicUsize>) -> Router {
        let state = state();
        Router::new()
            .route(
                "/admin/thing",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "ran"
                    }
                }),
            )
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_admin,
            ))
            .with_state(state)
    }

    async fn call(app: Router, email: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().uri("/admin/thing");
        if let Some(email) = email {
            builder = builder.header("x-forwarded-email", email);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn admin_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let resp = call(guarded(hits.clone()), Some(ADMIN)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_admin_is_redirected_without_running_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let resp = call(guarded(hits.clone()), Some("clerk@acme.test")).await;
        assert!(resp.status().is_redirection());
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            NON_ADMIN_REDIRECT
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn anonymous_is_redirected_without_running_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let resp = call(guarded(hits.clone()), None).await;
        assert!(resp.status().is_redirection());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
