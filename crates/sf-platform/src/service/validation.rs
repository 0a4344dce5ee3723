//! Input validation
//!
//! Collects field-level failures so a request reports all of them at once.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{FieldError, PlatformError, Result};

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static DOMAIN_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?)+$")
            .expect("email pattern is valid")
    })
}

fn domain_re() -> &'static Regex {
    DOMAIN_RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
            .expect("domain pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_re().is_match(email.trim())
}

pub fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= 253 && domain_re().is_match(&crate::domain::normalize_domain(domain))
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.add(field, "is required");
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.add(field, format!("must be at most {} characters", max));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_valid_email(value) {
            self.add(field, "must be a valid email address");
        }
        self
    }

    pub fn domain(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_valid_domain(value) {
            self.add(field, "must be a valid domain name");
        }
        self
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(PlatformError::InvalidFields(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("a@acme.com"));
        assert!(is_valid_email("first.last+tag@mail.acme.co.uk"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email("a@@acme.com"));
    }

    #[test]
    fn test_domain() {
        assert!(is_valid_domain("acme.com"));
        assert!(is_valid_domain("ACME.com."));
        assert!(!is_valid_domain("acme"));
        assert!(!is_valid_domain("-acme.com"));
        assert!(!is_valid_domain("https://acme.com"));
    }

    #[test]
    fn test_collects_all_errors() {
        let err = Validator::new()
            .required("firstName", " ")
            .email("email", "nope")
            .max_len("name", "abc", 2)
            .finish()
            .unwrap_err();
        match err {
            PlatformError::InvalidFields(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["firstName", "email", "name"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_ok_when_clean() {
        assert!(Validator::new().required("name", "Acme").finish().is_ok());
    }
}
