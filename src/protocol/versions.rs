//! Protocol version numbers and inclusive version ranges.

use std::fmt;

pub const V1_8: i32 = 47;
pub const V1_9: i32 = 107;
pub const V1_12_2: i32 = 340;
pub const V1_13: i32 = 393;
pub const V1_14: i32 = 477;
pub const V1_14_4: i32 = 498;
pub const V1_15: i32 = 573;
pub const V1_15_2: i32 = 578;
pub const V1_16: i32 = 735;
pub const V1_16_5: i32 = 754;
pub const V1_17: i32 = 755;
pub const V1_17_1: i32 = 756;
pub const V1_18: i32 = 757;
pub const V1_18_2: i32 = 758;

/// Inclusive range of protocol versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolRange {
    min: i32,
    max: i32,
}

impl ProtocolRange {
    /// Every version
    pub const fn all() -> Self {
        Self {
            min: i32::MIN,
            max: i32::MAX,
        }
    }

    /// Versions up to and including `max`
    pub const fn up_to(max: i32) -> Self {
        Self { min: i32::MIN, max }
    }

    /// Versions from `min` onwards
    pub const fn from(min: i32) -> Self {
        Self { min, max: i32::MAX }
    }

    /// Versions in `[min, max]`; the bounds are swapped if given backwards
    pub fn between(min: i32, max: i32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Exactly one version
    pub const fn only(version: i32) -> Self {
        Self {
            min: version,
            max: version,
        }
    }

    pub fn contains(&self, version: i32) -> bool {
        self.min <= version && version <= self.max
    }

    pub fn overlaps(&self, other: &ProtocolRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl fmt::Display for ProtocolRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (i32::MIN, i32::MAX) => f.write_str("*"),
            (i32::MIN, max) => write!(f, "..={max}"),
            (min, i32::MAX) => write!(f, "{min}.."),
            (min, max) => write!(f, "{min}..={max}"),
        }
    }
}
