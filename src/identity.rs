//! Anonymous visitor identity
//!
//! Every request to the engagement API is attributed to a stable anonymous
//! visitor via a long-lived cookie, without any authentication. The cookie
//! carries a random UUID; there is no server-side visitor table, so the id
//! is validated by format only.

use axum::http::{header, HeaderMap};
use std::env;
use uuid::{Uuid, Variant};

/// Name of the identity cookie
pub const VISITOR_COOKIE: &str = "bbg_vid";

/// Cookie lifetime: one year
const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

/// The visitor identity resolved for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorIdentity {
    /// Stable anonymous identifier for this browser
    pub id: Uuid,

    /// True when the id was freshly minted and the response must set the cookie
    pub fresh: bool,
}

/// Resolves the visitor identity for an incoming request
///
/// Inspects the identity cookie; a value that parses as a version 1-5
/// RFC 4122 UUID is returned unchanged. Anything else (absent, malformed,
/// nil, wrong variant) mints a fresh random id and flags that the response
/// must set the cookie.
///
/// This operation cannot fail.
pub fn resolve_visitor(headers: &HeaderMap) -> VisitorIdentity {
    if let Some(raw) = cookie_value(headers, VISITOR_COOKIE) {
        if let Some(id) = parse_visitor_id(&raw) {
            return VisitorIdentity { id, fresh: false };
        }
    }

    VisitorIdentity {
        id: Uuid::new_v4(),
        fresh: true,
    }
}

/// Builds the Set-Cookie header value for a freshly minted visitor id
///
/// Persistent for one year, http-only, SameSite=Lax, scoped to the whole
/// site, and marked Secure outside local development (APP_ENV=production).
pub fn set_cookie_value(id: &Uuid) -> String {
    let secure = match env::var("APP_ENV") {
        Ok(value) => value == "production",
        Err(_) => false,
    };

    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax{}",
        VISITOR_COOKIE,
        id,
        COOKIE_MAX_AGE_SECS,
        if secure { "; Secure" } else { "" }
    )
}

/// Accepts only ids a standard random-UUID generator could have produced:
/// version bits 1-5 and the RFC 4122 variant
fn parse_visitor_id(value: &str) -> Option<Uuid> {
    let id = Uuid::try_parse(value).ok()?;
    let version_ok = matches!(id.get_version_num(), 1..=5);
    let variant_ok = matches!(id.get_variant(), Variant::RFC4122);
    (version_ok && variant_ok).then_some(id)
}

/// Extracts a single cookie value from the request headers
///
/// Walks every Cookie header, splitting on ';' pairs; the first match wins.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(header::COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((key, value)) = pair.split_once('=') {
                if key.trim() == name {
                    return Some(value.trim().to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", VISITOR_COOKIE, value)).unwrap(),
        );
        headers
    }

    #[test]
    fn valid_cookie_passes_through_unchanged() {
        let id = Uuid::new_v4();
        let visitor = resolve_visitor(&headers_with_cookie(&id.to_string()));
        assert_eq!(visitor.id, id);
        assert!(!visitor.fresh);
    }

    #[test]
    fn missing_cookie_mints_a_fresh_id() {
        let visitor = resolve_visitor(&HeaderMap::new());
        assert!(visitor.fresh);
    }

    #[test]
    fn malformed_cookie_mints_a_fresh_id() {
        let visitor = resolve_visitor(&headers_with_cookie("not-a-uuid"));
        assert!(visitor.fresh);
    }

    #[test]
    fn nil_uuid_is_rejected() {
        // Version 0 is not something a random generator produces
        let visitor =
            resolve_visitor(&headers_with_cookie("00000000-0000-0000-0000-000000000000"));
        assert!(visitor.fresh);
    }

    #[test]
    fn cookie_is_found_among_other_cookies() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}; lang=en", VISITOR_COOKIE, id))
                .unwrap(),
        );
        let visitor = resolve_visitor(&headers);
        assert_eq!(visitor.id, id);
        assert!(!visitor.fresh);
    }
}
