use chrono::NaiveDate;
use serde::Serialize;

use crate::tier::AlertTier;

/// The `c_date` cell of a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum DateCell {
    Absent,
    Valid(NaiveDate),
    Malformed(String),
}

impl DateCell {
    pub fn valid(&self) -> Option<NaiveDate> {
        match self {
            DateCell::Valid(date) => Some(*date),
            _ => None,
        }
    }
}

impl std::fmt::Display for DateCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateCell::Absent => Ok(()),
            DateCell::Valid(date) => write!(f, "{date}"),
            DateCell::Malformed(raw) => write!(f, "{raw}"),
        }
    }
}

/// One campaign-day observation. `roas` and `cpa` are filled by the metric
/// deriver and are `None` whenever the value is not computable.
#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub date: DateCell,
    pub campaign_name: Option<String>,
    pub category: Option<String>,
    pub spend: Option<f64>,
    pub revenue: Option<f64>,
    pub orders: Option<u64>,
    pub extra: Vec<(String, String)>,
    pub roas: Option<f64>,
    pub cpa: Option<f64>,
}

impl Row {
    pub fn tier(&self) -> Option<AlertTier> {
        crate::tier::classify(self.roas)
    }
}

/// Which derived columns were appended to the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DerivedColumns {
    pub roas: bool,
    pub cpa: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub derived: DerivedColumns,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub roas: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSummary {
    pub campaign_name: String,
    pub row_count: usize,
    pub total_spend: Option<f64>,
    pub total_revenue: Option<f64>,
    pub average_roas: Option<f64>,
    pub trend: Option<Vec<TrendPoint>>,
    pub excluded_trend_points: usize,
}

impl CampaignSummary {
    /// False when no row matched the selected campaign name.
    pub fn is_found(&self) -> bool {
        self.row_count > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierMix {
    pub red: usize,
    pub yellow: usize,
    pub green: usize,
    pub unclassified: usize,
}
