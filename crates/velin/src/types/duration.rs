use std::{fmt, ops::Neg};

use crate::diag::StrResult;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A span of time, stored in nanoseconds.
///
/// Durations are additive with each other and scalable by numbers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Duration {
    nanos: i64,
}

impl Duration {
    /// Creates a duration from nanoseconds.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    /// Creates a duration from whole seconds.
    pub const fn from_seconds(seconds: i64) -> Self {
        Self { nanos: seconds * NANOS_PER_SECOND }
    }

    /// The duration in nanoseconds.
    pub const fn nanos(self) -> i64 {
        self.nanos
    }

    /// The duration in (possibly fractional) seconds.
    pub fn seconds(self) -> f64 {
        self.nanos as f64 / NANOS_PER_SECOND as f64
    }

    /// Adds two durations, failing on overflow.
    pub fn checked_add(self, other: Self) -> StrResult<Self> {
        self.nanos
            .checked_add(other.nanos)
            .map(Self::from_nanos)
            .ok_or_else(too_large)
    }

    /// Subtracts two durations, failing on overflow.
    pub fn checked_sub(self, other: Self) -> StrResult<Self> {
        self.nanos
            .checked_sub(other.nanos)
            .map(Self::from_nanos)
            .ok_or_else(too_large)
    }

    /// Scales the duration by a float factor.
    pub fn scale(self, factor: f64) -> Self {
        Self { nanos: (self.nanos as f64 * factor) as i64 }
    }

    /// The ratio between two durations.
    pub fn ratio(self, other: Self) -> StrResult<f64> {
        if other.nanos == 0 {
            return Err("cannot divide by zero".into());
        }
        Ok(self.nanos as f64 / other.nanos as f64)
    }
}

fn too_large() -> String {
    "value is too large".into()
}

impl Neg for Duration {
    type Output = Self;

    fn neg(self) -> Self {
        Self { nanos: -self.nanos }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buffer = ryu::Buffer::new();
        write!(f, "duration(seconds: {})", buffer.format(self.seconds()))
    }
}
