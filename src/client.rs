//! Authenticated access to the service data endpoints

use crate::error::EbikesError;
use crate::session::Session;
use reqwest::header::COOKIE;
use serde_json::Value;

/// The main Stockholm EBikes client
///
/// Issues requests against the service's internal data endpoints, attaching
/// the held session's `Cookie` header when one is present. A client without a
/// session is a valid anonymous client; its requests simply carry no
/// credentials.
///
/// Every endpoint method is a single round trip with no caching, pagination,
/// or retries. Clients are independent of each other; each holds its own
/// immutable [`Session`].
///
/// # Example
///
/// ```no_run
/// use stockholm_ebikes::{Authenticator, EbikesClient};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Authenticator::new()?.authenticate("user@example.com", "hunter2")?;
/// let client = EbikesClient::with_session(session)?;
///
/// if client.validate()? {
///     let trips = client.trips()?;
///     println!("trips: {}", trips);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct EbikesClient {
    client: reqwest::blocking::Client,
    base_url: reqwest::Url,
    session: Option<Session>,
}

impl EbikesClient {
    /// Create an anonymous client against the production service origin
    ///
    /// # Errors
    ///
    /// Returns `EbikesError::ClientInit` if the HTTP client cannot be
    /// initialized.
    pub fn new() -> Result<Self, EbikesError> {
        Self::builder().build()
    }

    /// Create a client holding the given session
    pub fn with_session(session: Session) -> Result<Self, EbikesError> {
        Self::builder().session(session).build()
    }

    /// Create a builder for configuring the client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stockholm_ebikes::EbikesClient;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = EbikesClient::builder()
    ///     .base_url("http://localhost:1234")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> EbikesClientBuilder {
        EbikesClientBuilder::new()
    }

    /// The session held by this client, if any
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Shared authenticated request path
    ///
    /// Resolves `path` (path plus query string) against the base origin,
    /// attaches the session cookie header when a session is held, and returns
    /// the response if its status is 2xx. A non-success status is reported as
    /// [`EbikesError::RemoteService`] carrying the parsed JSON error body; if
    /// that body is not JSON, the parse failure propagates instead.
    fn request(&self, path: &str) -> Result<reqwest::blocking::Response, EbikesError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| EbikesError::InvalidUrl(e.to_string()))?;

        let mut request = self.client.get(url);
        if let Some(session) = &self.session {
            request = request.header(COOKIE, session.header_value()?);
        }

        let response = request.send()?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body: Value = serde_json::from_str(&response.text()?)?;
        Err(EbikesError::RemoteService { status, body })
    }

    /// Perform a request and parse the response body as JSON
    fn fetch_json(&self, path: &str) -> Result<Value, EbikesError> {
        let body = self.request(path)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Check whether the held session is still accepted by the service
    ///
    /// Performs an authenticated GET against the status endpoint. Returns
    /// `Ok(true)` only when the response status is 2xx and the JSON body's
    /// `isLoggedIn` field is exactly `true`. A non-2xx status, an unparsable
    /// body, or a missing/false field all mean "not logged in" and yield
    /// `Ok(false)` rather than an error; only transport failures are
    /// surfaced as `Err`.
    pub fn validate(&self) -> Result<bool, EbikesError> {
        let url = self
            .base_url
            .join("/?_data=routes/index")
            .map_err(|e| EbikesError::InvalidUrl(e.to_string()))?;

        let mut request = self.client.get(url);
        if let Some(session) = &self.session {
            request = request.header(COOKIE, session.header_value()?);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Ok(false);
        }

        let body = response.text()?;
        let json: Value = match serde_json::from_str(&body) {
            Ok(json) => json,
            Err(_) => return Ok(false),
        };

        Ok(json["isLoggedIn"] == Value::Bool(true))
    }

    /// Fetch the map/service-area payload
    pub fn map(&self) -> Result<Value, EbikesError> {
        self.fetch_json("/map?_data=routes/map")
    }

    /// Fetch the detail payload for a mobility option
    ///
    /// The id is interpolated into the request path with standard URL path
    /// construction and no further escaping.
    pub fn detail(&self, id: &str) -> Result<Value, EbikesError> {
        self.fetch_json(&format!(
            "/map/detail/{}?_data=routes/map/detail.$optionId",
            id
        ))
    }

    /// Fetch the trips payload for the logged-in user
    pub fn trips(&self) -> Result<Value, EbikesError> {
        self.fetch_json("/app/my-trips?_data=routes/app/my-trips")
    }

    /// Fetch the wallet payload for the logged-in user
    pub fn wallet(&self) -> Result<Value, EbikesError> {
        self.fetch_json("/app/wallet?_data=routes/app/wallet")
    }

    /// Fetch the profile payload for the logged-in user
    pub fn account(&self) -> Result<Value, EbikesError> {
        self.fetch_json("/app/profile?_data=routes/app/profile")
    }

    /// Fetch the main service area as a parsed GeoJSON FeatureCollection
    ///
    /// The map payload embeds the service area as a JSON-serialized GeoJSON
    /// string at `mainServiceArea.attributes.geojson`; this parses that
    /// string and returns the resulting structure.
    ///
    /// # Errors
    ///
    /// * `EbikesError::MalformedAreaData` - The field is absent, not a
    ///   string, or not valid JSON
    pub fn area(&self) -> Result<Value, EbikesError> {
        let map = self.map()?;

        let geojson = map
            .pointer("/mainServiceArea/attributes/geojson")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EbikesError::MalformedAreaData(
                    "missing mainServiceArea.attributes.geojson field".to_string(),
                )
            })?;

        serde_json::from_str(geojson).map_err(|e| EbikesError::MalformedAreaData(e.to_string()))
    }
}

/// Builder for configuring an [`EbikesClient`]
///
/// Allows customization of the base URL (for pointing at a mock server), the
/// HTTP client configuration, and the session to attach to requests.
#[derive(Debug)]
pub struct EbikesClientBuilder {
    base_url: Option<reqwest::Url>,
    client_builder: Option<reqwest::blocking::ClientBuilder>,
    session: Option<Session>,
}

impl EbikesClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            base_url: None,
            client_builder: None,
            session: None,
        }
    }

    /// Set a custom base URL for the client
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

    /// Attach a session whose cookies will sign every request
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the client with the configured settings
    ///
    /// # Errors
    ///
    /// Returns `EbikesError::ClientInit` if the HTTP client cannot be
    /// initialized.
    pub fn build(self) -> Result<EbikesClient, EbikesError> {
        let base_url = self.base_url.unwrap_or_else(crate::default_base_url);

        let builder = self
            .client_builder
            .unwrap_or_else(|| reqwest::blocking::Client::builder().use_rustls_tls());

        let client = builder
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| EbikesError::ClientInit(e.to_string()))?;

        Ok(EbikesClient {
            client,
            base_url,
            session: self.session,
        })
    }
}

impl Default for EbikesClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn client_for(server: &mockito::Server, session: Option<Session>) -> EbikesClient {
        let builder = EbikesClient::builder().base_url(server.url()).unwrap();
        let builder = match session {
            Some(session) => builder.session(session),
            None => builder,
        };
        builder.build().unwrap()
    }

    fn test_session() -> Session {
        Session::from_cookies([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ])
    }

    #[test]
    fn test_session_cookie_header_attached() {
        let mut server = mockito::Server::new();

        let mock = server
            .mock("GET", "/map")
            .match_query(mockito::Matcher::UrlEncoded(
                "_data".into(),
                "routes/map".into(),
            ))
            .match_header("cookie", "a=1;b=2")
            .with_status(200)
            .with_body(r#"{"mobilityOptions":[]}"#)
            .expect(1)
            .create();

        let client = client_for(&server, Some(test_session()));
        let payload = client.map().unwrap();

        assert_eq!(payload, json!({"mobilityOptions": []}));
        mock.assert();
    }

    #[test]
    fn test_anonymous_client_sends_no_cookie_header() {
        let mut server = mockito::Server::new();

        let mock = server
            .mock("GET", "/map")
            .match_query(mockito::Matcher::Any)
            .match_header("cookie", mockito::Matcher::Missing)
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create();

        let client = client_for(&server, None);
        client.map().unwrap();

        mock.assert();
    }

    #[test]
    fn test_error_status_carries_json_body() {
        let mut server = mockito::Server::new();

        let mock = server
            .mock("GET", "/app/my-trips")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"not found"}"#)
            .expect(1)
            .create();

        let client = client_for(&server, Some(test_session()));
        let result = client.trips();

        match result.unwrap_err() {
            EbikesError::RemoteService { status, body } => {
                assert_eq!(status.as_u16(), 404);
                assert_eq!(body, json!({"message": "not found"}));
            }
            other => panic!("Expected RemoteService, got {:?}", other),
        }

        mock.assert();
    }

    #[test]
    fn test_error_status_with_non_json_body_propagates_parse_failure() {
        let mut server = mockito::Server::new();

        let mock = server
            .mock("GET", "/app/wallet")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("internal server error")
            .expect(1)
            .create();

        let client = client_for(&server, Some(test_session()));
        let result = client.wallet();

        assert!(matches!(result.unwrap_err(), EbikesError::Json(_)));
        mock.assert();
    }

    #[test]
    fn test_validate_logged_in() {
        let mut server = mockito::Server::new();

        let mock = server
            .mock("GET", "/")
            .match_query(mockito::Matcher::UrlEncoded(
                "_data".into(),
                "routes/index".into(),
            ))
            .match_header("cookie", "a=1;b=2")
            .with_status(200)
            .with_body(r#"{"isLoggedIn":true}"#)
            .expect(1)
            .create();

        let client = client_for(&server, Some(test_session()));
        assert!(client.validate().unwrap());

        mock.assert();
    }

    #[test]
    fn test_validate_logged_out_field() {
        let mut server = mockito::Server::new();

        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"isLoggedIn":false}"#)
            .create();

        let client = client_for(&server, Some(test_session()));
        assert!(!client.validate().unwrap());
    }

    #[test]
    fn test_validate_non_success_status_is_false_not_error() {
        let mut server = mockito::Server::new();

        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message":"unauthorized"}"#)
            .create();

        let client = client_for(&server, Some(test_session()));
        assert!(!client.validate().unwrap());
    }

    #[test]
    fn test_validate_malformed_body_is_false_not_error() {
        let mut server = mockito::Server::new();

        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create();

        let client = client_for(&server, Some(test_session()));
        assert!(!client.validate().unwrap());
    }

    #[test]
    fn test_validate_missing_field_is_false() {
        let mut server = mockito::Server::new();

        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create();

        let client = client_for(&server, Some(test_session()));
        assert!(!client.validate().unwrap());
    }

    #[test]
    fn test_detail_interpolates_id_into_path() {
        let mut server = mockito::Server::new();

        let mock = server
            .mock("GET", "/map/detail/abc123")
            .match_query(mockito::Matcher::UrlEncoded(
                "_data".into(),
                "routes/map/detail.$optionId".into(),
            ))
            .with_status(200)
            .with_body(r#"{"id":"abc123"}"#)
            .expect(1)
            .create();

        let client = client_for(&server, Some(test_session()));
        let payload = client.detail("abc123").unwrap();

        assert_eq!(payload, json!({"id": "abc123"}));
        mock.assert();
    }

    #[test]
    fn test_account_and_wallet_paths() {
        let mut server = mockito::Server::new();

        let profile_mock = server
            .mock("GET", "/app/profile")
            .match_query(mockito::Matcher::UrlEncoded(
                "_data".into(),
                "routes/app/profile".into(),
            ))
            .with_status(200)
            .with_body(r#"{"email":"user@example.com"}"#)
            .expect(1)
            .create();

        let wallet_mock = server
            .mock("GET", "/app/wallet")
            .match_query(mockito::Matcher::UrlEncoded(
                "_data".into(),
                "routes/app/wallet".into(),
            ))
            .with_status(200)
            .with_body(r#"{"balance":0}"#)
            .expect(1)
            .create();

        let client = client_for(&server, Some(test_session()));

        assert_eq!(
            client.account().unwrap(),
            json!({"email": "user@example.com"})
        );
        assert_eq!(client.wallet().unwrap(), json!({"balance": 0}));

        profile_mock.assert();
        wallet_mock.assert();
    }

    #[test]
    fn test_area_parses_embedded_geojson() {
        let mut server = mockito::Server::new();

        let body = json!({
            "mainServiceArea": {
                "attributes": {
                    "geojson": r#"{"type":"FeatureCollection","features":[]}"#
                }
            }
        });

        server
            .mock("GET", "/map")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create();

        let client = client_for(&server, Some(test_session()));
        let area = client.area().unwrap();

        assert_eq!(area, json!({"type": "FeatureCollection", "features": []}));
    }

    #[test]
    fn test_area_missing_field_is_malformed() {
        let mut server = mockito::Server::new();

        server
            .mock("GET", "/map")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"mobilityOptions":[]}"#)
            .create();

        let client = client_for(&server, Some(test_session()));
        let result = client.area();

        assert!(matches!(
            result.unwrap_err(),
            EbikesError::MalformedAreaData(_)
        ));
    }

    #[test]
    fn test_area_invalid_embedded_json_is_malformed() {
        let mut server = mockito::Server::new();

        let body = json!({
            "mainServiceArea": {
                "attributes": {
                    "geojson": "not valid json"
                }
            }
        });

        server
            .mock("GET", "/map")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create();

        let client = client_for(&server, Some(test_session()));
        let result = client.area();

        assert!(matches!(
            result.unwrap_err(),
            EbikesError::MalformedAreaData(_)
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = EbikesClient::builder().base_url("not a valid url");

        assert!(result.is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        #[test]
        fn prop_base_url_configuration(
            scheme in prop::sample::select(vec!["http", "https"]),
            host in "[a-z]{3,10}",
            port in 1000u16..10000u16,
        ) {
            let base_url = format!("{}://{}:{}", scheme, host, port);

            let client = EbikesClient::builder()
                .base_url(&base_url)
                .unwrap()
                .build()
                .unwrap();

            prop_assert_eq!(client.base_url.scheme(), scheme);
            prop_assert_eq!(client.base_url.host_str(), Some(host.as_str()));
            prop_assert_eq!(client.base_url.port(), Some(port));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        #[test]
        fn prop_default_base_url(_dummy in 0u8..10u8) {
            let client = EbikesClient::builder().build().unwrap();

            prop_assert_eq!(client.base_url.as_str(), "https://stockholmebikes.se/");
        }
    }
}
