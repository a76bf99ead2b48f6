use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    #[error("empty resource locator")]
    Empty,
    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },
}

/// Where an asset lives: an absolute URL, or a site-relative / local path
/// such as `/models/cantina.glb` that the configured source resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Locator {
    Url(Url),
    Path(String),
}

impl Locator {
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LocatorError::Empty);
        }
        if input.contains("://") {
            return Url::parse(input)
                .map(Locator::Url)
                .map_err(|e| LocatorError::InvalidUrl {
                    input: input.to_string(),
                    reason: e.to_string(),
                });
        }
        Ok(Locator::Path(input.to_string()))
    }

    /// Last path segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        let path = match self {
            Locator::Url(url) => url.path(),
            Locator::Path(p) => p.as_str(),
        };
        path.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Url(url) => write!(f, "{url}"),
            Locator::Path(p) => write!(f, "{p}"),
        }
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl TryFrom<String> for Locator {
    type Error = LocatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Locator::parse(&value)
    }
}

impl From<Locator> for String {
    fn from(value: Locator) -> Self {
        value.to_string()
    }
}
