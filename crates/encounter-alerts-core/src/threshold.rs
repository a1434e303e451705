//! Optional numeric thresholds.
//!
//! Storage keeps `0` as the "unset" marker; in memory a threshold is an
//! explicit `Option` so "no constraint" and "defer to the default" are
//! never confused with a concrete value.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Threshold(Option<u32>);

impl Threshold {
    pub const UNSET: Threshold = Threshold(None);

    /// Build from the raw stored value; zero means unset.
    pub const fn new(raw: u32) -> Self {
        if raw == 0 {
            Self(None)
        } else {
            Self(Some(raw))
        }
    }

    /// Build from a signed raw value; anything non-positive is unset.
    pub fn from_signed(raw: i64) -> Self {
        match u32::try_from(raw) {
            Ok(value) => Self::new(value),
            Err(_) if raw > 0 => Self(Some(u32::MAX)),
            Err(_) => Self::UNSET,
        }
    }

    pub const fn get(self) -> Option<u32> {
        self.0
    }

    pub const fn is_set(self) -> bool {
        self.0.is_some()
    }

    /// Raw value for storage, `0` when unset.
    pub const fn raw(self) -> u32 {
        match self.0 {
            Some(value) => value,
            None => 0,
        }
    }

    /// This threshold if set, otherwise `fallback`.
    pub const fn or(self, fallback: Threshold) -> Threshold {
        match self.0 {
            Some(_) => self,
            None => fallback,
        }
    }
}

impl From<u32> for Threshold {
    fn from(raw: u32) -> Self {
        Self::new(raw)
    }
}

impl From<Threshold> for u32 {
    fn from(threshold: Threshold) -> Self {
        threshold.raw()
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "-"),
        }
    }
}

/// Threshold actually applied: the subscription override when set,
/// otherwise the subscriber default.
pub fn effective(override_value: Threshold, default_value: Threshold) -> Threshold {
    override_value.or(default_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_threshold_resolution() {
        let resolve = |v, d| effective(Threshold::new(v), Threshold::new(d)).get();
        assert_eq!(resolve(0, 50), Some(50));
        assert_eq!(resolve(30, 50), Some(30));
        assert_eq!(resolve(0, 0), None);
    }

    #[test]
    fn signed_values() {
        assert_eq!(Threshold::from_signed(-3), Threshold::UNSET);
        assert_eq!(Threshold::from_signed(0), Threshold::UNSET);
        assert_eq!(Threshold::from_signed(250).get(), Some(250));
    }

    #[test]
    fn serde_uses_zero_for_unset() {
        assert_eq!(serde_json::to_string(&Threshold::UNSET).unwrap(), "0");
        let parsed: Threshold = serde_json::from_str("90").unwrap();
        assert_eq!(parsed.get(), Some(90));
    }
}
