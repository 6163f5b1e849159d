//! Video identifiers and locator extraction.
//!
//! A [`VideoId`] can only be built from a non-blank string, so anything that
//! holds one has already passed validation. Locators are URL-shaped strings
//! that carry the identifier in their `v` query parameter.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use url::{ParseError, Url};

use crate::error::{Error, Result};

/// Query parameter that carries the identifier inside a locator.
pub const LOCATOR_QUERY_PARAM: &str = "v";

/// Base used to resolve relative locators such as `watch?v=abc`.
static PLACEHOLDER_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost/").expect("placeholder base is a valid URL"));

/// Canonical identifier of a requested video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Wrap an already-extracted identifier. Blank input is rejected.
    pub fn new<S: Into<String>>(raw: S) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::invalid_input("identifier is blank"));
        }
        Ok(Self(raw))
    }

    /// Extract the identifier from a URL-shaped locator.
    ///
    /// The locator must parse as a URL (relative locators are accepted) and
    /// carry a non-blank `v` query parameter. When the parameter appears more
    /// than once the first occurrence is used.
    pub fn from_locator(locator: &str) -> Result<Self> {
        let url = match Url::parse(locator) {
            Ok(url) => url,
            Err(ParseError::RelativeUrlWithoutBase) => PLACEHOLDER_BASE
                .join(locator)
                .map_err(|e| Error::invalid_input(format!("malformed locator: {e}")))?,
            Err(e) => return Err(Error::invalid_input(format!("malformed locator: {e}"))),
        };

        let value = url
            .query_pairs()
            .find(|(key, _)| key == LOCATOR_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| Error::invalid_input("locator has no video id parameter"))?;

        Self::new(value)
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VideoId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
