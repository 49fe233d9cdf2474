//! API version utilities
//!
//! Feature levels carry a `number` attribute (`1.0`, `1.3`). They are
//! normalized to full semantic versions so a configured ceiling can be
//! compared against them.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An API level such as Vulkan 1.3
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub version: Version,
}

impl ApiVersion {
    pub fn new(major: u64, minor: u64) -> Self {
        Self {
            version: Version::new(major, minor, 0),
        }
    }

    /// Parse `1`, `1.3`, `1.3.0` or `v1.3`; missing components are zero
    pub fn parse(version_str: &str) -> Result<Self, semver::Error> {
        let trimmed = version_str.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let normalized = match trimmed.matches('.').count() {
            0 => format!("{}.0.0", trimmed),
            1 => format!("{}.0", trimmed),
            _ => trimmed.to_string(),
        };
        Ok(Self {
            version: Version::parse(&normalized)?,
        })
    }

    /// True if a feature with this number is admitted under `ceiling`
    pub fn within(&self, ceiling: Option<&ApiVersion>) -> bool {
        ceiling.map_or(true, |max| self <= max)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.version.major, self.version.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_forms() {
        assert_eq!(ApiVersion::parse("1.3").unwrap(), ApiVersion::new(1, 3));
        assert_eq!(ApiVersion::parse("1").unwrap(), ApiVersion::new(1, 0));
        assert_eq!(ApiVersion::parse("v1.2.0").unwrap(), ApiVersion::new(1, 2));
        assert!(ApiVersion::parse("one.two").is_err());
    }

    #[test]
    fn test_ceiling() {
        let max = ApiVersion::new(1, 1);
        assert!(ApiVersion::new(1, 0).within(Some(&max)));
        assert!(ApiVersion::new(1, 1).within(Some(&max)));
        assert!(!ApiVersion::new(1, 2).within(Some(&max)));
        assert!(ApiVersion::new(1, 4).within(None));
    }

    #[test]
    fn test_display() {
        assert_eq!(ApiVersion::new(1, 3).to_string(), "1.3");
    }
}
