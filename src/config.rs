//! Configuration for the resource engine and bootstrap.

/// Base trait for configuration types.
///
/// # Example
///
/// ```rust
/// use bondkit::Config;
///
/// #[derive(Debug, Clone)]
/// struct MailConfig {
///     sender: String,
/// }
///
/// impl Config for MailConfig {
///     fn name(&self) -> &str {
///         "mail"
///     }
///
///     fn validate(&self) -> Result<(), String> {
///         if self.sender.contains('@') {
///             Ok(())
///         } else {
///             Err(format!("invalid sender: {}", self.sender))
///         }
///     }
/// }
/// ```
pub trait Config: Send + Sync {
    /// Returns the configuration name/identifier.
    fn name(&self) -> &str {
        "default"
    }

    /// Returns whether verbose output is enabled.
    fn is_verbose(&self) -> bool {
        false
    }

    /// Returns whether debug mode is enabled.
    fn is_debug(&self) -> bool {
        false
    }

    /// Validates the configuration.
    ///
    /// Returns Ok(()) if valid, or an error message describing the issue.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Settings shared by every handler the resource engine builds.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Configuration name
    pub name: String,
    /// Page size applied when a query does not set `limit`
    pub default_limit: Option<usize>,
    /// Upper bound for `limit`
    pub max_limit: usize,
    /// Log successful operations at info level
    pub verbose: bool,
    /// Debug mode flag
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            default_limit: None,
            max_limit: 1000,
            verbose: false,
            debug: false,
        }
    }
}

impl EngineConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = Some(limit);
        self
    }

    pub fn with_max_limit(mut self, limit: usize) -> Self {
        self.max_limit = limit;
        self
    }

    /// Enable verbose output.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Enable debug mode.
    pub fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Effective limit for a query asking for `requested` rows.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .or(self.default_limit)
            .unwrap_or(self.max_limit)
            .min(self.max_limit)
    }
}

impl Config for EngineConfig {
    fn name(&self) -> &str {
        if self.name.is_empty() {
            "default"
        } else {
            &self.name
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn is_debug(&self) -> bool {
        self.debug
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_limit == 0 {
            return Err("max_limit must be greater than 0".to_string());
        }
        match self.default_limit {
            Some(limit) if limit > self.max_limit => Err(format!(
                "default_limit {limit} exceeds max_limit {}",
                self.max_limit
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config() {
        let config = EngineConfig::new()
            .with_name("api")
            .with_default_limit(25)
            .verbose();

        assert_eq!(config.name(), "api");
        assert!(config.is_verbose());
        assert!(!config.is_debug());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_name() {
        assert_eq!(EngineConfig::new().name(), "default");
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::new().with_max_limit(0).validate().is_err());

        let config = EngineConfig::new().with_max_limit(10).with_default_limit(50);
        assert!(config.validate().unwrap_err().contains("exceeds"));
    }

    #[test]
    fn test_clamp_limit() {
        let config = EngineConfig::new().with_max_limit(100).with_default_limit(20);
        assert_eq!(config.clamp_limit(None), 20);
        assert_eq!(config.clamp_limit(Some(5)), 5);
        assert_eq!(config.clamp_limit(Some(500)), 100);

        assert_eq!(EngineConfig::new().clamp_limit(None), 1000);
    }
}
