//! Selection policies and constraints.

use std::str::FromStr;

/// Tag carrying the storage class of a service.
pub const TAG_STORAGE_CLASS: &str = "tag.stgclass";

/// How the next service(s) of a type are drawn from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Implementation-defined; currently round-robin.
    #[default]
    Default,
    RoundRobin,
    /// Smooth weighted round-robin, draws proportional to score.
    WeightedRoundRobin,
    /// Uniform random index.
    Random,
    /// Random draw proportional to score.
    WeightedRandom,
}

impl FromStr for Policy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sl" => Ok(Policy::Default),
            "rr" => Ok(Policy::RoundRobin),
            "wrr" => Ok(Policy::WeightedRoundRobin),
            "rand" => Ok(Policy::Random),
            "wrand" => Ok(Policy::WeightedRandom),
            _ => Err(()),
        }
    }
}

/// Constraints applied to a selection.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Number of services wanted; `0` is normalized to 1.
    pub count: usize,
    /// Required storage class, matched against [`TAG_STORAGE_CLASS`].
    pub storage_class: Option<String>,
    /// With a storage class set, `strict` refuses services that do not
    /// carry the tag at all; otherwise an absent tag is acceptable.
    pub strict_class: bool,
    /// Keep only services carrying this `(tag key, tag value)` pair.
    pub tag_filter: Option<(String, String)>,
}

impl SelectOptions {
    pub fn one() -> Self {
        Self {
            count: 1,
            ..Self::default()
        }
    }

    pub fn wanted(&self) -> usize {
        self.count.max(1)
    }
}
