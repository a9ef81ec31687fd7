/// Authentication utilities for validating the frontend bearer token
use subtle::ConstantTimeEq;

const BEARER_PREFIX: &str = "Bearer ";

/// A wrapper around String that uses constant-time equality comparison
/// to prevent timing attacks on API key validation.
#[derive(Clone)]
pub struct ConstantTimeString(String);

impl From<String> for ConstantTimeString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConstantTimeString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl PartialEq for ConstantTimeString {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for ConstantTimeString {}

/// Keys never end up in logs.
impl std::fmt::Debug for ConstantTimeString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConstantTimeString(<redacted>)")
    }
}

/// Validates an `Authorization` header value against the frontend key.
///
/// The header must be exactly `Bearer <key>`: the scheme is case sensitive and
/// no surrounding whitespace is tolerated. A missing header never validates.
pub fn validate_bearer_header(frontend_key: &ConstantTimeString, header: Option<&str>) -> bool {
    let Some(token) = header.and_then(|value| value.strip_prefix(BEARER_PREFIX)) else {
        return false;
    };
    *frontend_key == ConstantTimeString::from(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::exact(Some("Bearer frontend-secret"), true)]
    #[case::missing(None, false)]
    #[case::empty(Some(""), false)]
    #[case::no_scheme(Some("frontend-secret"), false)]
    #[case::lowercase_scheme(Some("bearer frontend-secret"), false)]
    #[case::wrong_key(Some("Bearer other-secret"), false)]
    #[case::key_prefix(Some("Bearer frontend"), false)]
    #[case::trailing_space(Some("Bearer frontend-secret "), false)]
    #[case::double_space(Some("Bearer  frontend-secret"), false)]
    fn test_validate_bearer_header(#[case] header: Option<&str>, #[case] expected: bool) {
        let key = ConstantTimeString::from("frontend-secret");
        assert_eq!(validate_bearer_header(&key, header), expected);
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = ConstantTimeString::from("frontend-secret");
        assert!(!format!("{key:?}").contains("frontend-secret"));
    }
}
