use uuid::Uuid;

use crate::billing::error::BillingError;

/// Collects every field-level violation of a form before anything is written,
/// so the caller can show all of them in one round trip.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `msg` unless `ok` holds. Returns `ok` so callers can chain
    /// dependent checks.
    pub fn check(&mut self, ok: bool, msg: &str) -> bool {
        if !ok {
            self.errors.push(msg.to_owned());
        }
        ok
    }

    pub fn push(&mut self, msg: &str) {
        self.errors.push(msg.to_owned());
    }

    /// Parse a selected foreign key. Blank yields `missing_msg`, garbage yields
    /// `invalid_msg`; both return `None`.
    pub fn select_key(&mut self, raw: &str, missing_msg: &str, invalid_msg: &str) -> Option<Uuid> {
        let raw = raw.trim();
        if raw.is_empty() {
            self.push(missing_msg);
            return None;
        }
        match raw.parse::<Uuid>() {
            Ok(id) => Some(id),
            Err(_) => {
                self.push(invalid_msg);
                None
            }
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn finish(self) -> Result<(), BillingError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(BillingError::Validation(self.errors))
        }
    }
}

pub fn check_length(value: &str, min: usize, max: usize) -> bool {
    let len = value.trim().chars().count();
    (min..=max).contains(&len)
}

pub fn is_name(value: &str) -> bool {
    check_length(value, 1, 255)
}

pub fn is_email(value: &str) -> bool {
    check_length(value, 3, 254) && value.contains('@') && !value.contains(char::is_whitespace)
}

/// Canonical form of an email address. Stored, compared and resolved emails
/// all go through this.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_validator_finishes_ok() {
        assert!(Validator::new().finish().is_ok());
    }

    #[test]
    fn collects_all_errors_in_order() {
        let mut v = Validator::new();
        v.check(false, "Name must be valid");
        v.check(true, "never reported");
        v.push("You must select a company");

        let err = v.finish().unwrap_err();
        match err {
            BillingError::Validation(msgs) => {
                assert_eq!(msgs, vec!["Name must be valid", "You must select a company"]);
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn select_key_blank_reports_missing() {
        let mut v = Validator::new();
        assert!(v.select_key("  ", "missing", "invalid").is_none());
        assert_eq!(v.errors(), ["missing"]);
    }

    #[test]
    fn select_key_garbage_reports_invalid() {
        let mut v = Validator::new();
        assert!(v.select_key("not-a-key", "missing", "invalid").is_none());
        assert_eq!(v.errors(), ["invalid"]);
    }

    #[test]
    fn select_key_parses_uuid() {
        let id = Uuid::new_v4();
        let mut v = Validator::new();
        assert_eq!(v.select_key(&id.to_string(), "missing", "invalid"), Some(id));
        assert!(v.errors().is_empty());
    }

    #[rstest]
    #[case("Acme", true)]
    #[case("a", true)]
    #[case("", false)]
    #[case("   ", false)]
    fn name_rules(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(is_name(input), ok, "input {input:?}");
    }

    #[rstest]
    #[case("clerk@acme.test", "clerk@acme.test")]
    #[case("Clerk@Acme.TEST", "clerk@acme.test")]
    #[case("  clerk@acme.test ", "clerk@acme.test")]
    fn email_normalization(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_email(input), expected);
    }

    #[test]
    fn name_at_max_length() {
        assert!(is_name(&"a".repeat(255)));
        assert!(!is_name(&"a".repeat(256)));
    }

    #[rstest]
    #[case("user@example.com", true)]
    #[case("a@b", true)]
    #[case("a@", false)]
    #[case("nope", false)]
    #[case("has space@example.com", false)]
    #[case("", false)]
    fn email_rules(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(is_email(input), ok, "input {input:?}");
    }
}
