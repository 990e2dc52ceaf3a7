//! Request logging configuration.
//!
//! The host owns loading; reqtrail only reads the resolved values. For hosts
//! that keep their settings in TOML, [`LoggingConfig::from_toml`] reads the
//! `[http.logging]` table:
//!
//! ```toml
//! [http.logging]
//! enabled = true
//! include-query-string = false
//! include-user = true
//! exclude-paths = ["/actuator", "/health", "/metrics"]
//! ```

use serde::Deserialize;

use crate::error::Error;

/// Process-wide, read-only settings for the logging middleware.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Install the middleware at all.
    pub enabled: bool,
    /// Append `?query` to the path in the incoming-request line.
    pub include_query_string: bool,
    /// Ask the principal lookup for a username.
    pub include_user: bool,
    /// Path prefixes that bypass the middleware entirely. Case-sensitive,
    /// plain `starts_with`, no wildcards.
    pub exclude_paths: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_query_string: false,
            include_user: true,
            exclude_paths: vec!["/actuator".into(), "/health".into(), "/metrics".into()],
        }
    }
}

#[derive(Deserialize, Default)]
struct Document {
    #[serde(default)]
    http: HttpSection,
}

#[derive(Deserialize, Default)]
struct HttpSection {
    #[serde(default)]
    logging: LoggingConfig,
}

impl LoggingConfig {
    /// Parses the `[http.logging]` table of a TOML document. Missing keys,
    /// or a missing table, fall back to the defaults.
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        let doc: Document = toml::from_str(source)?;
        Ok(doc.http.logging)
    }

    /// Rejects settings that would silently change what gets logged.
    ///
    /// An empty prefix matches every path, so it would turn logging off
    /// without anyone noticing.
    pub fn validate(&self) -> Result<(), Error> {
        for prefix in &self.exclude_paths {
            if prefix.is_empty() {
                return Err(Error::InvalidConfig("exclude path must not be empty".into()));
            }
            if !prefix.starts_with('/') {
                return Err(Error::InvalidConfig(format!(
                    "exclude path `{prefix}` must start with `/`"
                )));
            }
        }
        Ok(())
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn include_query_string(mut self, include: bool) -> Self {
        self.include_query_string = include;
        self
    }

    pub fn include_user(mut self, include: bool) -> Self {
        self.include_user = include;
        self
    }

    pub fn exclude_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// `true` when `path` starts with any configured exclude prefix.
    pub fn is_excluded(&self, path: &str) -> bool {
        should_skip(path, &self.exclude_paths)
    }
}

/// Ordinary prefix match against an ordered list of exclude prefixes.
pub fn should_skip(path: &str, exclude_paths: &[String]) -> bool {
    exclude_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert!(!config.include_query_string);
        assert!(config.include_user);
        assert_eq!(config.exclude_paths, ["/actuator", "/health", "/metrics"]);
    }

    #[test]
    fn reads_the_http_logging_table() {
        let config = LoggingConfig::from_toml(
            r#"
            [server]
            port = 8080

            [http.logging]
            include-query-string = true
            exclude-paths = ["/internal"]
            "#,
        )
        .unwrap();

        assert!(config.enabled);
        assert!(config.include_query_string);
        assert!(config.include_user);
        assert_eq!(config.exclude_paths, ["/internal"]);
    }

    #[test]
    fn missing_table_means_defaults() {
        assert_eq!(LoggingConfig::from_toml("").unwrap(), LoggingConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = LoggingConfig::from_toml("[http.logging]\nenabled = \"yes\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn validate_rejects_unanchored_prefixes() {
        assert!(LoggingConfig::default().validate().is_ok());
        assert!(LoggingConfig::default().exclude_paths([""]).validate().is_err());
        assert!(LoggingConfig::default().exclude_paths(["health"]).validate().is_err());
    }

    #[test]
    fn skip_is_a_case_sensitive_prefix_match() {
        let excludes = vec!["/health".to_owned(), "/actuator".to_owned()];

        assert!(should_skip("/health", &excludes));
        assert!(should_skip("/healthz", &excludes));
        assert!(should_skip("/actuator/info", &excludes));
        assert!(!should_skip("/Health", &excludes));
        assert!(!should_skip("/api/health", &excludes));
        assert!(!should_skip("/", &[]));
    }
}
