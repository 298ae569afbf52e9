//! Login exchange against the Stockholm EBikes service

use crate::error::EbikesError;
use crate::session::Session;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, SET_COOKIE};

/// Turns raw credentials into a [`Session`] via the login protocol exchange.
///
/// The service signals a successful login with `204 No Content` plus one or
/// more `Set-Cookie` headers; rejected credentials come back as `200` with a
/// JSON error body. The client therefore never follows redirects, so that the
/// raw status of the exchange is always observed.
///
/// # Example
///
/// ```no_run
/// use stockholm_ebikes::Authenticator;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let authenticator = Authenticator::new()?;
/// let session = authenticator.authenticate("user@example.com", "hunter2")?;
/// println!("captured {} cookies", session.cookies().len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Authenticator {
    client: reqwest::blocking::Client,
    base_url: reqwest::Url,
}

impl Authenticator {
    /// Create an authenticator against the production service origin
    ///
    /// # Errors
    ///
    /// Returns `EbikesError::ClientInit` if the HTTP client cannot be
    /// initialized.
    pub fn new() -> Result<Self, EbikesError> {
        Self::builder().build()
    }

    /// Create a builder for configuring the authenticator
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stockholm_ebikes::Authenticator;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let authenticator = Authenticator::builder()
    ///     .base_url("http://localhost:1234")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> AuthenticatorBuilder {
        AuthenticatorBuilder::new()
    }

    /// Perform the login exchange and capture the session cookies
    ///
    /// Sends a form-encoded POST with `email` and `password` fields to the
    /// login endpoint. A single attempt is made; no retry.
    ///
    /// Response classification, in priority order:
    ///
    /// 1. `204 No Content` — success. Every `Set-Cookie` header is reduced to
    ///    its leading `name=value` pair (attributes discarded) and collected
    ///    into the session. A response with no cookies still succeeds, though
    ///    the resulting session carries no credentials.
    /// 2. `200` with a JSON content-type — the service rejected the
    ///    credentials; fails with [`EbikesError::AuthenticationRejected`]
    ///    carrying the parsed JSON body.
    /// 3. Anything else — fails with [`EbikesError::UnexpectedAuthResponse`]
    ///    carrying the status and raw body.
    ///
    /// # Errors
    ///
    /// * `EbikesError::AuthenticationRejected` - Credentials were rejected
    /// * `EbikesError::UnexpectedAuthResponse` - Unrecognized response shape
    /// * `EbikesError::Request` - Transport failure
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Session, EbikesError> {
        let url = self
            .base_url
            .join("/login?_data=routes/login")
            .map_err(|e| EbikesError::InvalidUrl(e.to_string()))?;

        let form = [("email", email), ("password", password)];
        let response = self.client.post(url).form(&form).send()?;

        if response.status() == StatusCode::NO_CONTENT {
            let cookies = response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok());
            return Ok(Session::from_set_cookie_values(cookies));
        }

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if status == StatusCode::OK && is_json {
            let body: serde_json::Value = serde_json::from_str(&response.text()?)?;
            return Err(EbikesError::AuthenticationRejected { body });
        }

        Err(EbikesError::UnexpectedAuthResponse {
            status,
            body: response.text()?,
        })
    }
}

/// Builder for configuring an [`Authenticator`]
///
/// Allows customization of the base URL (for pointing at a mock server) and
/// the HTTP client configuration. The redirect policy is always overridden to
/// `Policy::none()` so the login status is observed directly.
#[derive(Debug)]
pub struct AuthenticatorBuilder {
    base_url: Option<reqwest::Url>,
    client_builder: Option<reqwest::blocking::ClientBuilder>,
}

impl AuthenticatorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            base_url: None,
            client_builder: None,
        }
    }

    /// Set a custom base URL for the login exchange
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn base_url(mut self, url: impl reqwest::IntoUrl) -> Result<Self, EbikesError> {
        self.base_url = Some(url.into_url()?);
        Ok(self)
    }

    /// Set a custom HTTP client builder (timeouts, proxies, ...)
    ///
    /// The redirect policy will always be overridden to `Policy::none()`
    /// regardless of the provided configuration.
    pub fn client_builder(mut self, builder: reqwest::blocking::ClientBuilder) -> Self {
        self.client_builder = Some(builder);
        self
    }

    /// Build the authenticator with the configured settings
    ///
    /// # Errors
    ///
    /// Returns `EbikesError::ClientInit` if the HTTP client cannot be
    /// initialized.
    pub fn build(self) -> Result<Authenticator, EbikesError> {
        let base_url = self
            .base_url
            .unwrap_or_else(crate::default_base_url);

        let builder = self
            .client_builder
            .unwrap_or_else(|| reqwest::blocking::Client::builder().use_rustls_tls());

        let client = builder
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| EbikesError::ClientInit(e.to_string()))?;

        Ok(Authenticator { client, base_url })
    }
}

impl Default for AuthenticatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
