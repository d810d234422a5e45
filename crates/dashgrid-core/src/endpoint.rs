//! Endpoint derivation from the page location.
//!
//! Every relative API path (`data/...`, `channels`, `control/<topic>`,
//! `subscribe/<topic>`) resolves against one base derived from the location
//! the dashboard was opened at. Path segments are percent-encoded, so channel
//! and topic names may carry reserved characters.

use crate::error::{CoreError, Result};
use std::fmt;
use url::Url;

/// Base address for all API calls. The path always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    base: Url,
}

impl ApiBase {
    /// Derive the base from a page location.
    ///
    /// Query and fragment are dropped. If the last path segment looks like a
    /// file (contains a `.`), it is replaced; otherwise the path is treated as
    /// a directory.
    pub fn from_page_location(location: &str) -> Result<Self> {
        let mut url = Url::parse(location.trim())
            .map_err(|e| CoreError::InvalidConfig(format!("invalid page location {location:?}: {e}")))?;
        if url.cannot_be_a_base() || !url.has_host() {
            return Err(CoreError::InvalidConfig(format!(
                "page location has no host: {location}"
            )));
        }
        url.set_query(None);
        url.set_fragment(None);

        let last_segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        let base = if last_segment.contains('.') {
            url.join(".")
                .map_err(|e| CoreError::InvalidConfig(format!("invalid page location: {e}")))?
        } else if last_segment.is_empty() {
            url
        } else {
            let directory = format!("{}/", url.path());
            url.set_path(&directory);
            url
        };

        Ok(Self { base })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.base
    }

    /// Absolute address of `segments` below the base, each one encoded as a
    /// single path segment.
    pub fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Address of the push subscription for `topic` (ws/wss scheme).
    pub fn push_address(&self, topic: &str) -> Url {
        let mut url = self.endpoint(["subscribe", topic]);
        let scheme = match url.scheme() {
            "https" => Some("wss"),
            "http" => Some("ws"),
            _ => None,
        };
        if let Some(scheme) = scheme {
            // http(s) -> ws(s) stays within the special schemes and cannot fail.
            let _ = url.set_scheme(scheme);
        }
        url
    }

    /// Address of the publish fallback endpoint for `topic`.
    pub fn control_address(&self, topic: &str) -> Url {
        self.endpoint(["control", topic])
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str())
    }
}
