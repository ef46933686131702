//! Reader for the `key=value` files osmosis keeps in its working directory.
//!
//! The files follow Java properties conventions: `#` and `!` start
//! comments, either `=` or `:` separates key from value, and a backslash
//! escapes the next character (osmosis writes timestamps as
//! `2024-05-01T00\:00\:00Z`).

use std::collections::HashMap;
use std::num::ParseIntError;

use thiserror::Error;

/// Errors raised while interpreting a properties document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertiesError {
    /// A required key was absent.
    #[error("missing required key {key:?}")]
    MissingKey {
        /// Key that was expected.
        key: &'static str,
    },
    /// A numeric key held something else.
    #[error("key {key:?} must be a non-negative integer, found {value:?}")]
    InvalidNumber {
        /// Key being read.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Integer parsing failure.
        #[source]
        source: ParseIntError,
    },
}

/// Parsed `key=value` pairs.
#[derive(Debug, Default)]
pub(crate) struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub(crate) fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(['#', '!']))
            .map(split_entry)
            .collect();
        Self { entries }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub(crate) fn require(&self, key: &'static str) -> Result<&str, PropertiesError> {
        self.get(key).ok_or(PropertiesError::MissingKey { key })
    }

    pub(crate) fn number(&self, key: &'static str) -> Result<Option<u64>, PropertiesError> {
        self.get(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|source| PropertiesError::InvalidNumber {
                        key,
                        value: value.to_owned(),
                        source,
                    })
            })
            .transpose()
    }
}

fn split_entry(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.chars();
    let mut escaped = false;
    for ch in chars.by_ref() {
        if escaped {
            key.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '=' || ch == ':' {
            break;
        } else {
            key.push(ch);
        }
    }
    let value = unescape(chars.as_str().trim_start());
    (key.trim_end().to_owned(), value)
}

fn unescape(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some(other) => value.push(other),
            None => {}
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn reads_osmosis_state() {
        let properties = Properties::parse(
            "#Mon May 01 00:00:00 UTC 2024\n\
             sequenceNumber=6042781\n\
             timestamp=2024-05-01T00\\:00\\:00Z\n",
        );
        assert_eq!(properties.number("sequenceNumber"), Ok(Some(6_042_781)));
        assert_eq!(properties.get("timestamp"), Some("2024-05-01T00:00:00Z"));
    }

    #[rstest]
    #[case("baseUrl=https://example.org/minute", "https://example.org/minute")]
    #[case("baseUrl = https://example.org/minute", "https://example.org/minute")]
    #[case("baseUrl:https\\://example.org/minute", "https://example.org/minute")]
    fn accepts_both_separators(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(Properties::parse(line).get("baseUrl"), Some(expected));
    }

    #[rstest]
    fn reports_missing_and_malformed_keys() {
        let properties = Properties::parse("maxInterval=soon\n");
        assert_eq!(
            properties.require("baseUrl"),
            Err(PropertiesError::MissingKey { key: "baseUrl" })
        );
        assert!(matches!(
            properties.number("maxInterval"),
            Err(PropertiesError::InvalidNumber { key: "maxInterval", .. })
        ));
        assert_eq!(properties.number("sequenceNumber"), Ok(None));
    }
}
