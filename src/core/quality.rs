use crate::common::{OptimizerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality levels offered when no configuration overrides them,
/// highest first.
pub const DEFAULT_LEVELS: [u8; 3] = [75, 50, 25];

/// Integer percentage in `0..=100` controlling how much of the buffer is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quality(u8);

impl Quality {
    pub const FULL: Quality = Quality(100);

    pub fn new(percent: u32) -> Result<Self> {
        if percent > 100 {
            return Err(OptimizerError::InvalidQuality(percent));
        }
        Ok(Self(percent as u8))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Number of bytes kept out of `len`, `floor(len * q / 100)`.
    pub fn retained_len(self, len: usize) -> usize {
        (len as u128 * self.0 as u128 / 100) as usize
    }
}

impl TryFrom<u32> for Quality {
    type Error = OptimizerError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0 as u32
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Validates a configured list of levels, keeping its order.
pub fn parse_levels(levels: &[u32]) -> Result<Vec<Quality>> {
    levels.iter().map(|&level| Quality::new(level)).collect()
}

pub fn default_levels() -> Vec<Quality> {
    DEFAULT_LEVELS.iter().map(|&level| Quality(level)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_values_above_hundred() {
        assert!(Quality::new(100).is_ok());
        assert!(Quality::new(0).is_ok());
        assert!(matches!(Quality::new(101), Err(OptimizerError::InvalidQuality(101))));
    }

    #[test]
    fn retained_len_floors() {
        let q = Quality::new(75).unwrap();
        assert_eq!(q.retained_len(10), 7);
        assert_eq!(q.retained_len(0), 0);
        assert_eq!(Quality::FULL.retained_len(11), 11);
        assert_eq!(Quality::new(0).unwrap().retained_len(11), 0);
    }

    #[test]
    fn default_levels_are_descending() {
        let levels: Vec<u8> = default_levels().into_iter().map(Quality::percent).collect();
        assert_eq!(levels, vec![75, 50, 25]);
    }

    #[test]
    fn parse_levels_keeps_order() {
        let levels = parse_levels(&[25, 90]).unwrap();
        assert_eq!(levels, vec![Quality::new(25).unwrap(), Quality::new(90).unwrap()]);
        assert!(parse_levels(&[50, 150]).is_err());
    }

    #[test]
    fn displays_as_percentage() {
        assert_eq!(Quality::new(50).unwrap().to_string(), "50%");
    }
}
