//! Format checks for common form fields

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w-]+\w[.\w-]+$").expect("valid email pattern"));

static CN_MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:0|\+?86)?(?:13[0-9]|14[57]|15[0-35-9]|17[0678]|18[0-9])[0-9]{8}$")
        .expect("valid mobile pattern")
});

static CN_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9]{3,4}-?)?[0-9]{7,8}(?:-[0-9]{1,4})?$").expect("valid phone pattern")
});

static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9_-]{0,62}(?:\.[a-zA-Z0-9][a-zA-Z0-9_-]{0,62})*\.[a-zA-Z][a-zA-Z0-9]{0,10}$",
    )
    .expect("valid domain pattern")
});

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid identifier pattern")
});

pub fn is_email(s: &str) -> bool {
    EMAIL.is_match(s)
}

/// Mainland mobile number, optionally prefixed with `0`, `86` or `+86`
pub fn is_cn_mobile(s: &str) -> bool {
    CN_MOBILE.is_match(s)
}

/// Landline such as `0571-88886666` or `0571-88886666-123`
pub fn is_cn_phone(s: &str) -> bool {
    CN_PHONE.is_match(s)
}

/// Dotted-quad IPv4 address
pub fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

pub fn is_domain(s: &str) -> bool {
    DOMAIN.is_match(s)
}

/// Plain or table-qualified SQL column name
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Password with at least one letter and one digit
pub fn check_password(password: &str, min_len: usize) -> Result<()> {
    if password.chars().count() < min_len {
        return Err(Error::ValidationError(format!(
            "password must be at least {} characters",
            min_len
        )));
    }
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    if !(has_digit && has_letter) {
        return Err(Error::ValidationError(
            "password must contain letters and digits".into(),
        ));
    }
    Ok(())
}

/// Password with upper and lower case letters, a digit and a symbol
///
/// `#` and `|` are rejected.
pub fn check_strong_password(password: &str, min_len: usize) -> Result<()> {
    if password.chars().count() < min_len {
        return Err(Error::ValidationError(format!(
            "password must be at least {} characters",
            min_len
        )));
    }
    if password.contains(['#', '|']) {
        return Err(Error::ValidationError(
            "password must not contain '#' or '|'".into(),
        ));
    }

    let mut digit = false;
    let mut upper = false;
    let mut lower = false;
    let mut symbol = false;
    for c in password.chars() {
        match c {
            '0'..='9' => digit = true,
            'A'..='Z' => upper = true,
            'a'..='z' => lower = true,
            c if c.is_ascii_punctuation() => symbol = true,
            _ => {}
        }
    }
    if !(digit && upper && lower && symbol) {
        return Err(Error::ValidationError(
            "password must mix upper and lower case letters, digits and symbols".into(),
        ));
    }
    Ok(())
}
