use std::time::Duration;

/// Oracle configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Anthropic API key (oracle disabled when absent)
    pub api_key: Option<String>,
    /// Model used for naming, discovery and analysis
    pub model: String,
    /// Per-call deadline before falling back
    pub timeout_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-3-5-haiku-latest".to_string(),
            timeout_ms: 8000,
        }
    }
}

impl OracleConfig {
    /// Whether calls can reach the API at all
    pub fn is_active(&self) -> bool {
        self.api_key.as_ref().map(|k| !k.is_empty()).unwrap_or(false)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Observatory configuration
#[derive(Debug, Clone)]
pub struct ObservatoryConfig {
    pub oracle: OracleConfig,
    /// Snapshot file location
    pub save_path: String,
    /// Save after every state-changing command
    pub autosave: bool,
    /// Fixed rng seed for reproducible scan positions
    pub seed: Option<u64>,
    /// Number of recent log entries kept in the state
    pub log_capacity: usize,
    /// Metrics endpoint port (0 = disabled)
    pub metrics_port: u16,
    /// Scans performed by the demo driver
    pub scan_count: usize,
    /// Delay between demo scans
    pub scan_interval_ms: u64,
}

impl Default for ObservatoryConfig {
    fn default() -> Self {
        Self {
            oracle: OracleConfig::default(),
            save_path: "data/sky.json".to_string(),
            autosave: true,
            seed: None,
            log_capacity: 50,
            metrics_port: 9090,
            scan_count: 24,
            scan_interval_ms: 250,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ObservatoryConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            if !key.trim().is_empty() {
                config.oracle.api_key = Some(key.trim().to_string());
            }
        }

        if let Some(model) = lookup("ORACLE_MODEL") {
            if !model.trim().is_empty() {
                config.oracle.model = model.trim().to_string();
            }
        }

        if let Some(timeout) = lookup("ORACLE_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(parsed) if (100..=60_000).contains(&parsed) => config.oracle.timeout_ms = parsed,
                Ok(_) => tracing::warn!("ORACLE_TIMEOUT_MS must be 100-60000, using default"),
                Err(_) => tracing::warn!("Invalid ORACLE_TIMEOUT_MS '{}', using default", timeout),
            }
        }

        if let Some(path) = lookup("SAVE_PATH") {
            if !path.trim().is_empty() {
                config.save_path = path;
            }
        }

        if let Some(autosave) = lookup("AUTOSAVE") {
            match parse_bool(&autosave) {
                Some(parsed) => config.autosave = parsed,
                None => tracing::warn!("Invalid AUTOSAVE '{}', using default", autosave),
            }
        }

        if let Some(seed) = lookup("SKY_SEED") {
            match seed.parse::<u64>() {
                Ok(parsed) => config.seed = Some(parsed),
                Err(_) => tracing::warn!("Invalid SKY_SEED '{}', using random seed", seed),
            }
        }

        if let Some(capacity) = lookup("LOG_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(parsed) if (1..=1000).contains(&parsed) => config.log_capacity = parsed,
                Ok(_) => tracing::warn!("LOG_CAPACITY must be 1-1000, using default"),
                Err(_) => tracing::warn!("Invalid LOG_CAPACITY '{}', using default", capacity),
            }
        }

        if let Some(port) = lookup("METRICS_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) => config.metrics_port = parsed,
                Err(_) => tracing::warn!("Invalid METRICS_PORT '{}', using default", port),
            }
        }

        if let Some(count) = lookup("SCAN_COUNT") {
            match count.parse::<usize>() {
                Ok(parsed) => config.scan_count = parsed,
                Err(_) => tracing::warn!("Invalid SCAN_COUNT '{}', using default", count),
            }
        }

        if let Some(interval) = lookup("SCAN_INTERVAL_MS") {
            match interval.parse::<u64>() {
                Ok(parsed) => config.scan_interval_ms = parsed,
                Err(_) => tracing::warn!("Invalid SCAN_INTERVAL_MS '{}', using default", interval),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.save_path.trim().is_empty() {
            return Err("save_path cannot be empty".to_string());
        }
        if self.log_capacity == 0 {
            return Err("log_capacity must be at least 1".to_string());
        }
        if self.oracle.timeout_ms == 0 {
            return Err("oracle timeout must be greater than 0".to_string());
        }
        if self.oracle.model.trim().is_empty() {
            return Err("oracle model cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ObservatoryConfig::default();
        assert_eq!(config.save_path, "data/sky.json");
        assert_eq!(config.log_capacity, 50);
        assert!(config.autosave);
        assert!(!config.oracle.is_active());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = ObservatoryConfig::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("ORACLE_TIMEOUT_MS", "1500"),
            ("AUTOSAVE", "off"),
            ("SKY_SEED", "42"),
            ("LOG_CAPACITY", "10"),
            ("METRICS_PORT", "0"),
        ]));

        assert!(config.oracle.is_active());
        assert_eq!(config.oracle.timeout(), Duration::from_millis(1500));
        assert!(!config.autosave);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.log_capacity, 10);
        assert_eq!(config.metrics_port, 0);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = ObservatoryConfig::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "   "),
            ("ORACLE_TIMEOUT_MS", "5"),
            ("AUTOSAVE", "maybe"),
            ("SKY_SEED", "not-a-number"),
            ("LOG_CAPACITY", "0"),
        ]));

        assert!(!config.oracle.is_active());
        assert_eq!(config.oracle.timeout_ms, 8000);
        assert!(config.autosave);
        assert_eq!(config.seed, None);
        assert_eq!(config.log_capacity, 50);
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let config = ObservatoryConfig {
            save_path: " ".to_string(),
            ..ObservatoryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default() {
        let config = ObservatoryConfig::load_or_default();
        assert!(config.log_capacity > 0);
    }
}
