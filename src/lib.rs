//! Stockholm EBikes Client Library
//!
//! This library provides a client for the Stockholm EBikes bike-sharing
//! service's internal data endpoints, including session authentication,
//! session validation, and retrieval of map, trip, wallet, and profile data.
//!
//! The service's contract is undocumented and informally typed: a successful
//! login is signalled by `204 No Content` plus `Set-Cookie` headers, rejected
//! credentials by `200` plus a JSON error body, and every data endpoint
//! returns opaque JSON. This crate classifies those outcomes into a closed
//! error taxonomy and otherwise passes payloads through untouched.
//!
//! # Features
//!
//! - Login exchange producing a reusable cookie [`Session`]
//! - Session validation against the service's status endpoint
//! - Authenticated access to the map, detail, trips, wallet, and profile
//!   endpoints, plus the parsed GeoJSON service area
//! - Secure TLS using rustls (no OpenSSL dependencies)
//! - Blocking synchronous API
//! - Well-typed errors using thiserror
//!
//! # Example
//!
//! ```no_run
//! use stockholm_ebikes::{Authenticator, EbikesClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Log in and capture the session cookies
//! let session = Authenticator::new()?.authenticate("user@example.com", "hunter2")?;
//!
//! // Issue authenticated calls through a client holding the session
//! let client = EbikesClient::with_session(session)?;
//!
//! if client.validate()? {
//!     let trips = client.trips()?;
//!     println!("trips: {}", trips);
//!
//!     let area = client.area()?;
//!     println!("service area: {}", area);
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod error;
mod session;

pub use auth::{Authenticator, AuthenticatorBuilder};
pub use client::{EbikesClient, EbikesClientBuilder};
pub use error::EbikesError;
pub use session::Session;

/// The production service origin, used when no base URL is configured
pub(crate) fn default_base_url() -> reqwest::Url {
    reqwest::Url::parse("https://stockholmebikes.se")
        .expect("Default base URL should always be valid")
}
