use serde::Serialize;

use crate::models::{Dataset, TierMix};

/// ROAS strictly below this is RED.
pub const RED_BELOW: f64 = 1.0;
/// ROAS at or above this is GREEN.
pub const GREEN_FROM: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertTier {
    Red,
    Yellow,
    Green,
}

impl AlertTier {
    /// Boundaries go to the lower-risk side: 1.0 is YELLOW, 2.0 is GREEN.
    pub fn classify(roas: f64) -> Option<AlertTier> {
        if roas.is_nan() {
            None
        } else if roas < RED_BELOW {
            Some(AlertTier::Red)
        } else if roas < GREEN_FROM {
            Some(AlertTier::Yellow)
        } else {
            Some(AlertTier::Green)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertTier::Red => "RED",
            AlertTier::Yellow => "YELLOW",
            AlertTier::Green => "GREEN",
        }
    }

    /// Background colour hint for table cells.
    pub fn background_hex(self) -> &'static str {
        match self {
            AlertTier::Red => "#ffcccc",
            AlertTier::Yellow => "#fff3cd",
            AlertTier::Green => "#d4edda",
        }
    }
}

impl std::fmt::Display for AlertTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub fn classify(roas: Option<f64>) -> Option<AlertTier> {
    roas.and_then(AlertTier::classify)
}

pub fn tier_mix(dataset: &Dataset) -> TierMix {
    let mut mix = TierMix::default();
    for row in &dataset.rows {
        match row.tier() {
            Some(AlertTier::Red) => mix.red += 1,
            Some(AlertTier::Yellow) => mix.yellow += 1,
            Some(AlertTier::Green) => mix.green += 1,
            None => mix.unclassified += 1,
        }
    }
    mix
}
