//! Import pipeline configuration loaded from environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Missing-reference strategy
// ---------------------------------------------------------------------------

/// What happens to rows whose foreign reference cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingReferenceStrategy {
    /// Drop offending rows from the batch, count them as failures, and
    /// optionally export them for operator remediation.
    #[default]
    Skip,
    /// Fail the entire import before any write.
    Abort,
    /// Let the storage layer's own constraints decide the outcome.
    InsertAnyway,
}

impl MissingReferenceStrategy {
    /// Return the strategy name as accepted by configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Abort => "abort",
            Self::InsertAnyway => "insert-anyway",
        }
    }

    /// Parse a strategy string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "skip" => Some(Self::Skip),
            "abort" => Some(Self::Abort),
            "insert-anyway" => Some(Self::InsertAnyway),
            _ => None,
        }
    }

    /// All valid strategy values.
    pub const ALL: &'static [&'static str] = &["skip", "abort", "insert-anyway"];
}

impl std::fmt::Display for MissingReferenceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Import configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for one import invocation.
///
/// All fields have defaults suitable for production; override via
/// environment variables.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Rows per bulk upsert statement (default: `2000`).
    pub bulk_chunk_size: usize,
    /// Handling of unresolvable foreign references (default: `skip`).
    pub missing_reference_strategy: MissingReferenceStrategy,
    /// Whether unresolved references mint placeholder entities instead of
    /// failing the row (default: `false`).
    pub auto_create_placeholders: bool,
    /// Directory for failed-rows diagnostic exports. Unset disables them.
    pub failed_rows_dir: Option<PathBuf>,
    /// Schema catalog cache lifetime in seconds (default: `300`).
    pub schema_cache_ttl_secs: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            bulk_chunk_size: 2000,
            missing_reference_strategy: MissingReferenceStrategy::Skip,
            auto_create_placeholders: false,
            failed_rows_dir: None,
            schema_cache_ttl_secs: 300,
        }
    }
}

impl ImportConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default  |
    /// |------------------------------|----------|
    /// | `BULK_CHUNK_SIZE`            | `2000`   |
    /// | `MISSING_REFERENCE_STRATEGY` | `skip`   |
    /// | `AUTO_CREATE_PLACEHOLDERS`   | `false`  |
    /// | `FAILED_ROWS_DIR`            | unset    |
    /// | `SCHEMA_CACHE_TTL_SECS`      | `300`    |
    pub fn from_env() -> Self {
        let bulk_chunk_size: usize = std::env::var("BULK_CHUNK_SIZE")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("BULK_CHUNK_SIZE must be a valid usize");

        let missing_reference_strategy = std::env::var("MISSING_REFERENCE_STRATEGY")
            .map(|v| {
                MissingReferenceStrategy::from_str(&v).unwrap_or_else(|| {
                    panic!(
                        "MISSING_REFERENCE_STRATEGY must be one of: {}",
                        MissingReferenceStrategy::ALL.join(", ")
                    )
                })
            })
            .unwrap_or_default();

        let auto_create_placeholders: bool = std::env::var("AUTO_CREATE_PLACEHOLDERS")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("AUTO_CREATE_PLACEHOLDERS must be true or false");

        let failed_rows_dir = std::env::var("FAILED_ROWS_DIR").ok().map(PathBuf::from);

        let schema_cache_ttl_secs: u64 = std::env::var("SCHEMA_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("SCHEMA_CACHE_TTL_SECS must be a valid u64");

        Self {
            bulk_chunk_size: bulk_chunk_size.max(1),
            missing_reference_strategy,
            auto_create_placeholders,
            failed_rows_dir,
            schema_cache_ttl_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_round_trip() {
        for s in MissingReferenceStrategy::ALL {
            let strategy = MissingReferenceStrategy::from_str(s).unwrap();
            assert_eq!(strategy.as_str(), *s);
        }
    }

    #[test]
    fn strategy_unknown_returns_none() {
        assert!(MissingReferenceStrategy::from_str("drop").is_none());
    }

    #[test]
    fn strategy_default_is_skip() {
        assert_eq!(
            MissingReferenceStrategy::default(),
            MissingReferenceStrategy::Skip
        );
    }

    #[test]
    fn strategy_display_matches_as_str() {
        assert_eq!(
            format!("{}", MissingReferenceStrategy::InsertAnyway),
            "insert-anyway"
        );
    }

    #[test]
    fn config_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.bulk_chunk_size, 2000);
        assert_eq!(
            config.missing_reference_strategy,
            MissingReferenceStrategy::Skip
        );
        assert!(!config.auto_create_placeholders);
        assert!(config.failed_rows_dir.is_none());
        assert_eq!(config.schema_cache_ttl_secs, 300);
    }
}
