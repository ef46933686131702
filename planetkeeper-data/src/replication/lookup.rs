//! Map a snapshot timestamp to a replication `state.txt`.
//!
//! The lookup service answers `GET <base>?<timestamp>` with the state
//! document of the replication sequence covering that instant.
//! [`SequenceLookup`] is synchronous; [`HttpSequenceLookup`] bridges to
//! `reqwest` by blocking on a Tokio runtime it owns.

use std::fmt;
use std::io;
use std::time::Duration;

use log::debug;
use planetkeeper_core::SnapshotTimestamp;
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

/// Default sequence lookup endpoint.
pub const DEFAULT_LOOKUP_URL: &str = "https://replicate-sequences.osm.mazdermind.de/";

/// Default user agent for lookup requests.
pub const DEFAULT_USER_AGENT: &str = "planetkeeper/0.1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors produced by a [`SequenceLookup`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LookupError {
    /// The base URL could not be parsed.
    #[error("invalid lookup URL {url:?}: {source}")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// Builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// The Tokio runtime could not be built.
    #[error("failed to build Tokio runtime: {source}")]
    Runtime {
        /// Builder failure.
        #[source]
        source: io::Error,
    },
    /// The service answered with an error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The request failed before a response arrived.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Request URL.
        url: String,
        /// Error description.
        message: String,
    },
    /// The service answered with an empty body.
    #[error("lookup service returned an empty state for {url}")]
    EmptyResponse {
        /// Request URL.
        url: String,
    },
}

/// Resolves the replication state covering a timestamp.
pub trait SequenceLookup {
    /// Return the `state.txt` document for `timestamp`, verbatim.
    fn state_for(&self, timestamp: &SnapshotTimestamp) -> Result<String, LookupError>;
}

/// Configuration for [`HttpSequenceLookup`].
#[derive(Debug, Clone)]
pub struct HttpSequenceLookupConfig {
    /// Lookup endpoint; the timestamp becomes its query string.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpSequenceLookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOOKUP_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpSequenceLookupConfig {
    /// Create a configuration for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP-backed [`SequenceLookup`].
///
/// Outside any Tokio runtime the lookup blocks on its own current-thread
/// runtime. Inside a multi-threaded runtime it uses that runtime's handle
/// through [`tokio::task::block_in_place`].
pub struct HttpSequenceLookup {
    client: Client,
    base_url: Url,
    timeout: Duration,
    runtime: Runtime,
}

impl fmt::Debug for HttpSequenceLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSequenceLookup")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl HttpSequenceLookup {
    /// Create a lookup against the default endpoint.
    pub fn new() -> Result<Self, LookupError> {
        Self::with_config(HttpSequenceLookupConfig::default())
    }

    /// Create a lookup with explicit configuration.
    pub fn with_config(config: HttpSequenceLookupConfig) -> Result<Self, LookupError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| LookupError::InvalidUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|source| LookupError::Client { source })?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| LookupError::Runtime { source })?;
        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
            runtime,
        })
    }

    /// URL queried for `timestamp`.
    fn lookup_url(&self, timestamp: &SnapshotTimestamp) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(Some(timestamp.as_ref()));
        url
    }

    async fn fetch_state(&self, url: Url) -> Result<String, LookupError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;
        let body = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;
        if body.trim().is_empty() {
            return Err(LookupError::EmptyResponse {
                url: url.to_string(),
            });
        }
        Ok(body)
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &Url) -> LookupError {
        if error.is_timeout() {
            return LookupError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return LookupError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        LookupError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

impl SequenceLookup for HttpSequenceLookup {
    fn state_for(&self, timestamp: &SnapshotTimestamp) -> Result<String, LookupError> {
        let url = self.lookup_url(timestamp);
        debug!("looking up replication state at {url}");
        let future = self.fetch_state(url);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}
