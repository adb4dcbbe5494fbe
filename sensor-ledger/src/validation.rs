//! Validation policy for submitted readings
//!
//! - Range checks (PM2.5 / PM10 always, NO2 / SO2 / CO when configured)
//! - Replay protection (strictly increasing per-sensor nonce)
//!
//! Checks are pure: they never mutate the watermark. The watermark only moves
//! when the reading is committed.

use crate::{config::ValidationConfig, types::ReadingSubmission, Error, Result};

/// Default upper bound for PM2.5 and PM10
pub const DEFAULT_MAX_PM: u32 = 500;

/// Numeric bounds applied before a reading is admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    max_pm25: u32,
    max_pm10: u32,
    max_no2: Option<u32>,
    max_so2: Option<u32>,
    max_co: Option<u32>,
}

impl ValidationPolicy {
    /// Build from configuration
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            max_pm25: config.max_pm25,
            max_pm10: config.max_pm10,
            max_no2: config.max_no2,
            max_so2: config.max_so2,
            max_co: config.max_co,
        }
    }

    /// Range gate, first violation wins
    pub fn check_range(&self, submission: &ReadingSubmission) -> Result<()> {
        if submission.pm25 > self.max_pm25 {
            return Err(Error::Pm25TooHigh {
                value: submission.pm25,
                max: self.max_pm25,
            });
        }

        if submission.pm10 > self.max_pm10 {
            return Err(Error::Pm10TooHigh {
                value: submission.pm10,
                max: self.max_pm10,
            });
        }

        check_optional("NO2", submission.no2, self.max_no2)?;
        check_optional("SO2", submission.so2, self.max_so2)?;
        check_optional("CO", submission.co, self.max_co)?;

        Ok(())
    }

    /// Anti-replay gate: `nonce` must be strictly above the watermark
    pub fn check_nonce(&self, last_nonce: u64, nonce: u64) -> Result<()> {
        if nonce <= last_nonce {
            return Err(Error::NonceNotIncreasing {
                last: last_nonce,
                got: nonce,
            });
        }
        Ok(())
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

fn check_optional(pollutant: &'static str, value: u32, max: Option<u32>) -> Result<()> {
    match max {
        Some(max) if value > max => Err(Error::ValueTooHigh {
            pollutant,
            value,
            max,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(pm25: u32, pm10: u32) -> ReadingSubmission {
        ReadingSubmission::new(pm25, pm10, 25, 10, 2, "Moderate", 1)
    }

    #[test]
    fn test_pm_bounds_inclusive() {
        let policy = ValidationPolicy::default();
        assert!(policy.check_range(&submission(499, 499)).is_ok());
        assert!(policy.check_range(&submission(500, 500)).is_ok());
        assert!(matches!(
            policy.check_range(&submission(501, 78)),
            Err(Error::Pm25TooHigh { value: 501, max: 500 })
        ));
        assert!(matches!(
            policy.check_range(&submission(45, 600)),
            Err(Error::Pm10TooHigh { value: 600, .. })
        ));
    }

    #[test]
    fn test_pm25_checked_first() {
        let policy = ValidationPolicy::default();
        assert!(matches!(
            policy.check_range(&submission(600, 600)),
            Err(Error::Pm25TooHigh { .. })
        ));
    }

    #[test]
    fn test_gases_unbounded_by_default() {
        let policy = ValidationPolicy::default();
        let reading = ReadingSubmission::new(1, 1, u32::MAX, u32::MAX, u32::MAX, "Hazardous", 1);
        assert!(policy.check_range(&reading).is_ok());
    }

    #[test]
    fn test_configured_gas_bound() {
        let config = ValidationConfig {
            max_no2: Some(200),
            ..ValidationConfig::default()
        };
        let policy = ValidationPolicy::from_config(&config);
        let reading = ReadingSubmission::new(1, 1, 201, 0, 0, "Unhealthy", 1);
        assert!(matches!(
            policy.check_range(&reading),
            Err(Error::ValueTooHigh { pollutant: "NO2", .. })
        ));
    }

    #[test]
    fn test_nonce_anti_replay() {
        let policy = ValidationPolicy::default();

        assert!(policy.check_nonce(0, 1).is_ok());
        assert!(policy.check_nonce(1, 3).is_ok());

        // Replay and reorder
        assert!(policy.check_nonce(3, 3).is_err());
        assert!(policy.check_nonce(3, 2).is_err());
        assert!(policy.check_nonce(0, 0).is_err());
    }
}
