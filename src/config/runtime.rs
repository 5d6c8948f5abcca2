use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::JournalError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub general: GeneralSettings,
    pub grouping: GroupingSettings,
    pub r_ladder: RLadderSettings,
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.general.timezone.parse::<Tz>().is_err() {
            errors.push(format!("general.timezone '{}' is not a known time zone", self.general.timezone));
        }

        // Grouping validation
        if self.grouping.time_frame_minutes == 0 || self.grouping.time_frame_minutes > 1440 {
            errors.push("grouping.time_frame_minutes must be between 1 and 1440".to_string());
        } else if 1440 % self.grouping.time_frame_minutes != 0 {
            errors.push("grouping.time_frame_minutes must divide a day evenly".to_string());
        }

        // Ladder validation
        if self.r_ladder.step <= Decimal::ZERO {
            errors.push("r_ladder.step must be > 0".to_string());
        }
        if self.r_ladder.start <= Decimal::ZERO {
            errors.push("r_ladder.start must be > 0".to_string());
        }
        if self.r_ladder.end < self.r_ladder.start {
            errors.push("r_ladder.end must be >= r_ladder.start".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn timezone(&self) -> Result<Tz, JournalError> {
        self.general.timezone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// IANA name of the zone trading days are keyed in.
    pub timezone: String,
}

impl GeneralSettings {
    pub fn timezone(&self) -> Result<Tz, JournalError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| JournalError::UnknownTimezone(self.timezone.clone()))
    }
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingSettings {
    /// Width of the entry time-of-day buckets.
    pub time_frame_minutes: u32,
}

impl Default for GroupingSettings {
    fn default() -> Self {
        Self {
            time_frame_minutes: 15,
        }
    }
}

/// Candidate take-profit levels scanned by the R-multiple optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RLadderSettings {
    pub start: Decimal,
    pub end: Decimal,
    pub step: Decimal,
}

impl RLadderSettings {
    pub fn levels(&self) -> Vec<Decimal> {
        let mut levels = Vec::new();
        if self.step <= Decimal::ZERO {
            return levels;
        }
        let mut level = self.start;
        while level <= self.end {
            levels.push(level);
            level += self.step;
        }
        levels
    }
}

impl Default for RLadderSettings {
    fn default() -> Self {
        Self {
            start: dec!(1.0),
            end: dec!(20.0),
            step: dec!(0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = AnalyticsConfig::default();
        config.general.timezone = "Mars/Olympus".to_string();
        config.grouping.time_frame_minutes = 7;
        config.r_ladder.step = Decimal::ZERO;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_default_ladder() {
        let levels = RLadderSettings::default().levels();
        assert_eq!(levels.len(), 39);
        assert_eq!(levels[0], dec!(1.0));
        assert_eq!(levels[1], dec!(1.5));
        assert_eq!(*levels.last().unwrap(), dec!(20.0));
    }

    #[test]
    fn test_ladder_with_bad_step_is_empty() {
        let ladder = RLadderSettings { step: dec!(-1), ..Default::default() };
        assert!(ladder.levels().is_empty());
    }
}
