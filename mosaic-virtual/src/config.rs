//! Configuration for a virtualized feed.

use derive_setters::Setters;

use crate::{error::ConfigurationError, px::Px};

/// Arguments for constructing a [`ViewportController`](crate::ViewportController).
///
/// Defaults to two lanes, a 300px estimate for items that have not been
/// displayed yet, and 25 items of overscan on each side of the visible run.
///
/// ```
/// use mosaic_virtual::{VirtualizerConfig, px::Px};
///
/// let config = VirtualizerConfig::default().lanes(3).overscan(10).gap(Px::new(8));
/// assert!(config.validate().is_ok());
/// assert!(VirtualizerConfig::default().lanes(0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Setters)]
pub struct VirtualizerConfig {
    /// Number of parallel lanes items are distributed across.
    pub lanes: usize,
    /// Number of extra items materialized before/after the visible run.
    pub overscan: usize,
    /// Size assumed for items that have not been measured yet.
    pub estimated_size: Px,
    /// Space between consecutive items of the same lane.
    pub gap: Px,
    /// Scroll offset the controller starts at.
    pub initial_offset: Px,
}

impl Default for VirtualizerConfig {
    fn default() -> Self {
        Self {
            lanes: 2,
            overscan: 25,
            estimated_size: Px(300),
            gap: Px::ZERO,
            initial_offset: Px::ZERO,
        }
    }
}

impl VirtualizerConfig {
    /// Checks every field, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_lanes(self.lanes)?;
        if !self.estimated_size.is_positive() {
            return Err(ConfigurationError::NonPositiveEstimate(self.estimated_size));
        }
        if self.gap < Px::ZERO {
            return Err(ConfigurationError::NegativeGap(self.gap));
        }
        if self.initial_offset < Px::ZERO {
            return Err(ConfigurationError::NegativeInitialOffset(
                self.initial_offset,
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_lanes(lanes: usize) -> Result<(), ConfigurationError> {
    if lanes == 0 {
        Err(ConfigurationError::InvalidLaneCount(lanes))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = VirtualizerConfig::default();
        assert_eq!(config.lanes, 2);
        assert_eq!(config.overscan, 25);
        assert_eq!(config.estimated_size, Px(300));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_lanes() {
        let config = VirtualizerConfig::default().lanes(0);
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidLaneCount(0))
        );
    }

    #[test]
    fn rejects_non_positive_estimate() {
        for estimate in [Px(0), Px(-40)] {
            let config = VirtualizerConfig::default().estimated_size(estimate);
            assert_eq!(
                config.validate(),
                Err(ConfigurationError::NonPositiveEstimate(estimate))
            );
        }
    }

    #[test]
    fn rejects_negative_gap_and_offset() {
        let config = VirtualizerConfig::default().gap(Px(-1));
        assert_eq!(config.validate(), Err(ConfigurationError::NegativeGap(Px(-1))));

        let config = VirtualizerConfig::default().initial_offset(Px(-5));
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::NegativeInitialOffset(Px(-5)))
        );
    }
}
