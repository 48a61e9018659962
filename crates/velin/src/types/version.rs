use std::{cmp::Ordering, fmt};

use crate::diag::StrResult;

/// A semantic version: major, minor, and patch components.
///
/// Versions compare lexicographically by component.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Version {
    /// The major version.
    pub major: u32,
    /// The minor version.
    pub minor: u32,
    /// The patch version.
    pub patch: u32,
}

impl Version {
    /// Creates a version from its components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// The component at the given index: 0 is major, 1 minor, 2 patch.
    pub fn at(self, index: i64) -> StrResult<u32> {
        match index {
            0 => Ok(self.major),
            1 => Ok(self.minor),
            2 => Ok(self.patch),
            _ => Err(format!("version component index out of bounds (index: {index}, len: 3)")),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for Version {
    type Err = String;

    /// Parses `M.m.p`, where the minor and patch components default to zero.
    fn from_str(s: &str) -> StrResult<Self> {
        let mut parts = s.split('.');
        let mut next = |what: &str| -> StrResult<u32> {
            match parts.next() {
                None | Some("") => Ok(0),
                Some(part) => part
                    .parse()
                    .map_err(|_| format!("invalid {what} version component: {part}")),
            }
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        if parts.next().is_some() {
            return Err(format!("version may have at most three components: {s}"));
        }
        Ok(Self { major, minor, patch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_missing_components() {
        assert_eq!("1".parse::<Version>().unwrap(), Version::new(1, 0, 0));
        assert_eq!("1.2".parse::<Version>().unwrap(), Version::new(1, 2, 0));
        assert_eq!("1.2.3".parse::<Version>().unwrap(), Version::new(1, 2, 3));
        assert!("1.x".parse::<Version>().is_err());
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(Version::new(1, 2, 3) < Version::new(1, 10, 0));
        assert!(Version::new(2, 0, 0) > Version::new(1, 99, 99));
    }
}
