//! Server endpoint addressing.
//!
//! The display is addressed by the HTTP base URL of the event server.
//! Websocket URLs are derived from it the same way a served page derives
//! them from its own location.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Endpoint
// ============================================================================

/// Event server base URL plus the query every request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// HTTP(S) base URL.
    base: Url,
    /// Extra query pairs appended after the base URL's own query.
    query: Vec<(String, String)>,
}

impl Endpoint {
    /// Parses an HTTP(S) base URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL does not parse
    /// - [`Error::Config`] if the scheme is not `http` or `https`
    pub fn parse(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;
        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::config(format!(
                    "server URL must be http or https, got {other}"
                )));
            }
        }
        if base.host_str().is_none() {
            return Err(Error::config("server URL has no host"));
        }

        Ok(Self {
            base,
            query: Vec::new(),
        })
    }

    /// Adds a query pair carried by every derived URL.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Returns the base URL.
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the HTTP URL for `path`.
    #[must_use]
    pub fn page_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        self.apply_query(&mut url);
        url
    }

    /// Returns the websocket URL for `path`.
    ///
    /// `http` maps to `ws` and `https` to `wss`; host and port are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the scheme cannot be switched.
    pub fn websocket_url(&self, path: &str) -> Result<Url> {
        let mut url = self.page_url(path);
        let scheme = if self.base.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::config(format!("cannot derive {scheme} URL from {}", self.base)))?;
        Ok(url)
    }

    /// Resolves a page-relative resource such as an image source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `src` cannot be joined onto the base.
    pub fn resolve(&self, src: &str) -> Result<Url> {
        Ok(self.base.join(src)?)
    }

    fn apply_query(&self, url: &mut Url) {
        if self.query.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &self.query {
            pairs.append_pair(key, value);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
