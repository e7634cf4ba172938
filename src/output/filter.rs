//! Source-name filtering for outputs.

use std::borrow::Cow;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::output::OutputError;
use crate::status::Snapshot;

/// Keeps snapshot entries whose source name matches a regex.
///
/// An empty filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    pattern: Option<Regex>,
}

impl SourceFilter {
    /// A filter that keeps every source.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(pattern: &str) -> Result<Self, OutputError> {
        let regex = Regex::new(pattern)
            .map_err(|e| OutputError::Config(format!("invalid collector_pattern: {}", e)))?;
        Ok(Self {
            pattern: Some(regex),
        })
    }

    pub fn matches(&self, source: &str) -> bool {
        self.pattern.as_ref().is_none_or(|re| re.is_match(source))
    }

    /// Borrow the snapshot unchanged when nothing is filtered.
    pub fn apply<'a>(&self, snapshot: &'a Snapshot) -> Cow<'a, Snapshot> {
        match self.pattern {
            None => Cow::Borrowed(snapshot),
            Some(_) => Cow::Owned(snapshot.filter_sources(|source| self.matches(source))),
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }
}

impl<'de> Deserialize<'de> for SourceFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Self::all()),
            Some(pattern) => Self::new(&pattern).map_err(serde::de::Error::custom),
        }
    }
}
