use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::LoggerError;

/// Validated `EnvFilter` expression.
///
/// Stores the raw filter string ("info", "tend_core=debug,info", ...) and
/// guarantees it parses; [`LoggerLevel::to_env_filter`] builds the actual
/// filter on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.as_str()).expect("LoggerLevel is always valid after construction")
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match EnvFilter::try_new(&s) {
            Ok(_) => Ok(LoggerLevel(s)),
            Err(e) => Err(LoggerError::InvalidLevel(format!("{s}: {e}"))),
        }
    }
}

impl From<LoggerLevel> for String {
    fn from(level: LoggerLevel) -> Self {
        level.0
    }
}

#[cfg(test)]
mod tests {
    use super::LoggerLevel;

    #[test]
    fn accepts_valid_filter_expressions() {
        for expr in ["info", "warn", "tend_core=debug,tend_queue=trace,info"] {
            assert!(expr.parse::<LoggerLevel>().is_ok(), "expected ok: {expr}");
        }
    }

    #[test]
    fn rejects_invalid_filter_expressions() {
        for expr in ["tend_core=verbose", "a=trace,b=wat"] {
            assert!(expr.parse::<LoggerLevel>().is_err(), "expected err: {expr}");
        }
    }

    #[test]
    fn serde_roundtrips_as_plain_string() {
        let level: LoggerLevel = serde_json::from_str(r#""debug""#).unwrap();
        assert_eq!(level.as_str(), "debug");

        let json = serde_json::to_string(&level).unwrap();
        assert_eq!(json, r#""debug""#);
    }

    #[test]
    fn default_is_info_and_builds_a_filter() {
        let level = LoggerLevel::default();
        assert_eq!(level.as_str(), "info");
        let _filter = level.to_env_filter();
    }
}
