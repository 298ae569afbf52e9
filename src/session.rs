//! Session state captured from the login exchange

use crate::error::EbikesError;
use reqwest::header::HeaderValue;
use zeroize::Zeroize;

/// Cookies captured from a successful login, render-able as a `Cookie` header.
///
/// A session is created by [`Authenticator::authenticate`](crate::Authenticator::authenticate)
/// or restored from a previously stored cookie mapping via [`Session::from_cookies`].
/// It is immutable once constructed; staleness is discovered lazily through
/// [`EbikesClient::validate`](crate::EbikesClient::validate) and never mutates
/// the session itself.
///
/// Cookies are kept as an ordered association list so that header rendering is
/// deterministic: iteration order is first-seen order, and a repeated cookie
/// name keeps its position while taking the last value seen.
///
/// # Example
///
/// ```
/// use stockholm_ebikes::Session;
///
/// let session = Session::from_cookies([
///     ("__session".to_string(), "abc123".to_string()),
///     ("csrf".to_string(), "xyz".to_string()),
/// ]);
/// assert_eq!(session.cookie_header(), "__session=abc123;csrf=xyz");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: Vec<(String, String)>,
}

impl Session {
    /// Create a session from an existing cookie mapping
    ///
    /// Useful for restoring a session persisted by the caller. Duplicate
    /// names collapse with last-seen-wins semantics.
    pub fn from_cookies(cookies: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut session = Session::default();
        for (name, value) in cookies {
            session.insert(name, value);
        }
        session
    }

    /// Build a session from raw `Set-Cookie` header values
    ///
    /// Only the leading `name=value` pair of each header is kept; cookie
    /// attributes after the first `;` (Path, Expires, HttpOnly, ...) are
    /// discarded. Values are captured verbatim, with no decoding applied.
    /// Headers whose leading pair contains no `=` are skipped.
    pub(crate) fn from_set_cookie_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut session = Session::default();
        for value in values {
            let pair = value.split(';').next().unwrap_or("");
            if let Some((name, content)) = pair.split_once('=') {
                session.insert(name.to_string(), content.to_string());
            }
        }
        session
    }

    fn insert(&mut self, name: String, value: String) {
        match self.cookies.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.cookies.push((name, value)),
        }
    }

    /// The captured cookies, in first-seen order
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Whether the session holds no cookies
    ///
    /// The login exchange can legitimately return no cookies; such a session
    /// is valid but sends no credentials with requests.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Render the cookies as a `Cookie` request header value
    ///
    /// Pairs are joined as `name=value` with `;` separators, no spaces, in
    /// iteration order. Values pass through byte-for-byte as captured.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Render the cookie header as a sensitive `HeaderValue`, zeroizing the
    /// temporary string after use.
    pub(crate) fn header_value(&self) -> Result<HeaderValue, EbikesError> {
        let mut cookie_string = self.cookie_header();
        let header_value = HeaderValue::from_bytes(cookie_string.as_bytes())
            .map_err(|_| EbikesError::ClientInit("Invalid cookie header format".to_string()))?;

        let mut sensitive_header = header_value;
        sensitive_header.set_sensitive(true);
        cookie_string.zeroize();

        Ok(sensitive_header)
    }
}
