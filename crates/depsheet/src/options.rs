//! Exploration options

use crate::{Error, Result};
use depsheet_formula::DEFAULT_EXPAND_THRESHOLD;

/// Options for a dependency exploration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExploreOptions {
    /// Depth at which exploration stops with a limit node (default: 10)
    pub max_depth: u32,
    /// Ranges with at most this many cells are expanded cell by cell (default: 5)
    pub range_expand_threshold: usize,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            range_expand_threshold: DEFAULT_EXPAND_THRESHOLD,
        }
    }
}

impl ExploreOptions {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_range_expand_threshold(mut self, threshold: usize) -> Self {
        self.range_expand_threshold = threshold;
        self
    }

    /// Check the options before an exploration starts
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExploreOptions::default();
        assert_eq!(options.max_depth, 10);
        assert_eq!(options.range_expand_threshold, 5);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let options = ExploreOptions::default().with_max_depth(0);
        assert!(matches!(options.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_threshold_is_allowed() {
        let options = ExploreOptions::default().with_range_expand_threshold(0);
        assert!(options.validate().is_ok());
    }
}
