use std::time::Duration;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// Errors found while validating a [`LimiterConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A limit was set but the window has no length.
    #[error("window must be non-zero when a limit of {limit} is configured")]
    ZeroWindow { limit: usize },

    /// An exclusion pattern was the empty string.
    #[error("exclusion pattern at index {index} is empty")]
    EmptyPattern { index: usize },

    /// A window duration string could not be parsed.
    #[error("invalid window duration {value:?}: {source}")]
    InvalidWindow {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
}

/// Static configuration for a [`WindowedLimiter`](crate::WindowedLimiter).
///
/// Windows are written as human readable durations when (de)serialized:
///
/// ```rust
/// # use gate_limit::LimiterConfig;
/// # use std::time::Duration;
/// let config: LimiterConfig = serde_json::from_str(
///     r#"{ "limit": 60, "window": "1m", "exclusions": ["/network/"] }"#,
/// ).unwrap();
///
/// assert_eq!(config.window, Duration::from_secs(60));
/// assert!(!config.fail_fast);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimiterConfig {
    /// Requests admitted per window. Zero disables limiting.
    pub limit: usize,

    /// Time between resets.
    #[serde(
        serialize_with = "serialize_window",
        deserialize_with = "deserialize_window"
    )]
    pub window: Duration,

    /// Path patterns that bypass the limiter.
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Reject instead of queuing once the window is used up.
    #[serde(default)]
    pub fail_fast: bool,
}

impl LimiterConfig {
    /// Creates a config that queues excess requests and exempts nothing.
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            exclusions: Vec::new(),
            fail_fast: false,
        }
    }

    pub fn with_exclusions<I, P>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether requests beyond the limit fail immediately.
    ///
    /// If `true`, admission returns [`Reason::RequestsExceeded`](crate::Reason) instead
    /// of waiting for the window to reset.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Parses a window such as `"250ms"`, `"1s"` or `"1m 30s"`.
    pub fn parse_window(value: &str) -> Result<Duration, ConfigError> {
        humantime::parse_duration(value).map_err(|source| ConfigError::InvalidWindow {
            value: value.to_string(),
            source,
        })
    }

    /// Checks the config for values the limiter cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit > 0 && self.window.is_zero() {
            return Err(ConfigError::ZeroWindow { limit: self.limit });
        }
        if let Some(index) = self.exclusions.iter().position(String::is_empty) {
            return Err(ConfigError::EmptyPattern { index });
        }
        Ok(())
    }
}

fn serialize_window<S: Serializer>(window: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*window))
}

fn deserialize_window<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let value = String::deserialize(deserializer)?;
    LimiterConfig::parse_window(&value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_deserializes_with_defaults() {
        let config: LimiterConfig =
            serde_json::from_str(r#"{ "limit": 5, "window": "3s" }"#).unwrap();

        assert_eq!(config, LimiterConfig::new(5, Duration::from_secs(3)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn it_deserializes_everything() {
        let config: LimiterConfig = serde_json::from_str(
            r#"{
                "limit": 4,
                "window": "1m 30s",
                "exclusions": ["/servers/*/status", "/network/"],
                "fail_fast": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.limit, 4);
        assert_eq!(config.window, Duration::from_secs(90));
        assert_eq!(config.exclusions, vec!["/servers/*/status", "/network/"]);
        assert!(config.fail_fast);
    }

    #[test]
    fn window_round_trips_as_text() {
        let config = LimiterConfig::new(1, Duration::from_millis(1500));
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["window"], "1s 500ms");
        assert_eq!(serde_json::from_value::<LimiterConfig>(json).unwrap(), config);
    }

    #[test]
    fn bad_window_is_rejected() {
        let err = serde_json::from_str::<LimiterConfig>(r#"{ "limit": 1, "window": "soon" }"#)
            .unwrap_err();
        assert!(err.to_string().contains("invalid window duration"));

        assert!(matches!(
            LimiterConfig::parse_window("10 parsecs"),
            Err(ConfigError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result =
            serde_json::from_str::<LimiterConfig>(r#"{ "limit": 1, "window": "1s", "burst": 3 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn validation_catches_unusable_values() {
        let zero_window = LimiterConfig::new(10, Duration::ZERO);
        assert!(matches!(
            zero_window.validate(),
            Err(ConfigError::ZeroWindow { limit: 10 })
        ));

        // A disabled limiter doesn't care about its window
        assert!(LimiterConfig::new(0, Duration::ZERO).validate().is_ok());

        let empty_pattern =
            LimiterConfig::new(1, Duration::from_secs(1)).with_exclusions(["/a/", ""]);
        assert!(matches!(
            empty_pattern.validate(),
            Err(ConfigError::EmptyPattern { index: 1 })
        ));
    }
}
