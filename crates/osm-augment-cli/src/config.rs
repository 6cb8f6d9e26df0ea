//! CLI configuration.

use anyhow::{Context, Result};
use chrono::Duration;
use osm_augment_core::Augmenter;

/// Augmentation configuration.
#[derive(Debug, Clone)]
pub struct AugmentConfig {
    /// Accepted clock skew between a parent and its children
    pub threshold: Duration,

    /// Resolve independent parent versions in parallel
    pub parallel: bool,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            threshold: Duration::minutes(30),
            parallel: true,
            pretty: false,
        }
    }
}

impl AugmentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OSM_AUGMENT_THRESHOLD_SECS`: clock skew tolerance in seconds
    /// - `OSM_AUGMENT_PARALLEL`: "true" or "false"
    /// - `OSM_AUGMENT_PRETTY`: "true" or "false"
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = var("OSM_AUGMENT_THRESHOLD_SECS") {
            let secs: i64 = secs
                .trim()
                .parse()
                .context("Invalid OSM_AUGMENT_THRESHOLD_SECS")?;
            anyhow::ensure!(secs >= 0, "OSM_AUGMENT_THRESHOLD_SECS must not be negative");
            config.threshold = Duration::seconds(secs);
        }

        if let Some(parallel) = var("OSM_AUGMENT_PARALLEL") {
            config.parallel = parallel
                .trim()
                .parse()
                .context("Invalid OSM_AUGMENT_PARALLEL")?;
        }

        if let Some(pretty) = var("OSM_AUGMENT_PRETTY") {
            config.pretty = pretty.trim().parse().context("Invalid OSM_AUGMENT_PRETTY")?;
        }

        Ok(config)
    }

    /// An augmenter for this configuration.
    #[must_use]
    pub fn augmenter(&self) -> Augmenter {
        Augmenter::new(self.threshold).parallel(self.parallel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AugmentConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AugmentConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = load(&[]).unwrap();
        assert_eq!(config.threshold, Duration::minutes(30));
        assert!(config.parallel);
        assert!(!config.pretty);
    }

    #[test]
    fn overrides_from_env() {
        let config = load(&[
            ("OSM_AUGMENT_THRESHOLD_SECS", "90"),
            ("OSM_AUGMENT_PARALLEL", "false"),
            ("OSM_AUGMENT_PRETTY", "true"),
        ])
        .unwrap();

        assert_eq!(config.threshold, Duration::seconds(90));
        assert!(!config.parallel);
        assert!(config.pretty);
        assert_eq!(config.augmenter().threshold(), Duration::seconds(90));
    }

    #[test]
    fn rejects_malformed_threshold() {
        let err = load(&[("OSM_AUGMENT_THRESHOLD_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("OSM_AUGMENT_THRESHOLD_SECS"));

        assert!(load(&[("OSM_AUGMENT_THRESHOLD_SECS", "-5")]).is_err());
    }
}
