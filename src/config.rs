//! Split table configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a split table.
///
/// Rollover thresholds bound the active partition; the remaining fields are
/// passed through to partition store constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitTableConfig {
    /// Maximum age of the active partition before a new-key write rolls over.
    /// Default: 30 days.
    pub age_limit: Duration,

    /// Maximum partition file size in bytes before rollover.
    /// Default: unbounded.
    pub size_limit: u64,

    /// Rows staged in a partition store's write buffer before flushing.
    /// Default: 20.
    pub buffer_rows: usize,

    /// Ask partition stores to cache row tails in memory.
    /// Default: true. Dropped for the table's lifetime if re-init after
    /// `clear` runs out of capacity.
    pub use_tail_cache: bool,

    /// Allow partition files past the large-table limit (128 MiB - 1).
    /// Default: false.
    pub exceed_large_limit: bool,
}

impl Default for SplitTableConfig {
    fn default() -> Self {
        Self {
            age_limit: Duration::from_secs(30 * 24 * 60 * 60),
            size_limit: u64::MAX,
            buffer_rows: 20,
            use_tail_cache: true,
            exceed_large_limit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SplitTableConfig::default();
        assert_eq!(config.age_limit, Duration::from_secs(30 * 24 * 60 * 60));
        assert_eq!(config.size_limit, u64::MAX);
        assert_eq!(config.buffer_rows, 20);
        assert!(config.use_tail_cache);
        assert!(!config.exceed_large_limit);
    }

    #[test]
    fn test_config_serialization() {
        let config = SplitTableConfig {
            size_limit: 1 << 20,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SplitTableConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.size_limit, deserialized.size_limit);
        assert_eq!(config.age_limit, deserialized.age_limit);
        assert_eq!(config.buffer_rows, deserialized.buffer_rows);
    }
}
