use std::collections::HashSet;

use axum::http::{HeaderMap, HeaderName};

use crate::config::Config;
use crate::validation::normalize_email;

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub email: String,
    pub is_admin: bool,
}

/// Adapter over the external identity provider.
///
/// Authentication happens upstream in a reverse proxy, which forwards the
/// caller's email in a trusted header. Administrative privilege is granted
/// by configuration. The service must only be reachable through that proxy.
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    header: HeaderName,
    admins: HashSet<String>,
    login_url: String,
    logout_url: String,
}

impl IdentityProvider {
    pub fn new(
        header: &str,
        admins: &[String],
        login_url: &str,
        logout_url: &str,
    ) -> anyhow::Result<Self> {
        let header = HeaderName::try_from(header)
            .map_err(|e| anyhow::anyhow!("invalid identity header '{header}': {e}"))?;
        Ok(Self {
            header,
            admins: admins.iter().map(|e| normalize_email(e)).collect(),
            login_url: login_url.to_owned(),
            logout_url: logout_url.to_owned(),
        })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Self::new(
            &cfg.identity_header,
            &cfg.admin_emails,
            &cfg.login_url,
            &cfg.logout_url,
        )
    }

    /// Current caller, or `None` when the request carries no identity.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<Caller> {
        let email = normalize_email(headers.get(&self.header)?.to_str().ok()?);
        if email.is_empty() {
            return None;
        }
        Some(Caller {
            is_admin: self.admins.contains(&email),
            email,
        })
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admins.contains(&normalize_email(email))
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn logout_url(&self) -> &str {
        &self.logout_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> IdentityProvider {
        IdentityProvider::new(
            "x-forwarded-email",
            &["Admin@Acme.test".into()],
            "/oauth2/start",
            "/oauth2/sign_out",
        )
        .unwrap()
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(k, v) in pairs {
            map.insert(k, v.parse().unwrap());
        }
        map
    }

    #[test]
    fn resolves_regular_user() {
        let caller = provider()
            .resolve(&headers(&[("x-forwarded-email", "clerk@acme.test")]))
            .unwrap();
        assert_eq!(caller.email, "clerk@acme.test");
        assert!(!caller.is_admin);
    }

    #[test]
    fn admin_match_is_case_insensitive() {
        let caller = provider()
            .resolve(&headers(&[("x-forwarded-email", "admin@ACME.test")]))
            .unwrap();
        assert!(caller.is_admin);
    }

    #[test]
    fn resolved_email_is_lowercased() {
        let caller = provider()
            .resolve(&headers(&[("x-forwarded-email", " Clerk@Acme.TEST ")]))
            .unwrap();
        assert_eq!(caller.email, "clerk@acme.test");
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(provider().resolve(&headers(&[])).is_none());
    }

    #[test]
    fn blank_header_is_anonymous() {
        assert!(
            provider()
                .resolve(&headers(&[("x-forwarded-email", "  ")]))
                .is_none()
        );
    }

    #[test]
    fn other_headers_are_ignored() {
        let h = headers(&[("x-forwarded-user", "admin@acme.test")]);
        assert!(provider().resolve(&h).is_none());
    }

    #[test]
    fn invalid_header_name_rejected() {
        assert!(IdentityProvider::new("bad header", &[], "/in", "/out").is_err());
    }

    #[test]
    fn exposes_redirect_urls() {
        let p = provider();
        assert_eq!(p.login_url(), "/oauth2/start");
        assert_eq!(p.logout_url(), "/oauth2/sign_out");
    }
}
