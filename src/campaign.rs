use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::Notice;
use crate::models::{CampaignSummary, DateCell, Dataset, Row, TrendPoint};
use crate::schema::SchemaCapabilities;

/// Distinct campaign names in ascending order, for the selection list.
pub fn campaign_names(dataset: &Dataset) -> Vec<String> {
    dataset
        .rows
        .iter()
        .filter_map(|row| row.campaign_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows of one campaign in dataset order. Matching is exact: no trimming,
/// no case folding.
pub fn campaign_rows<'a>(dataset: &'a Dataset, name: &'a str) -> impl Iterator<Item = &'a Row> {
    dataset
        .rows
        .iter()
        .filter(move |row| row.campaign_name.as_deref() == Some(name))
}

pub fn aggregate(dataset: &Dataset, caps: &SchemaCapabilities, name: &str) -> CampaignSummary {
    let rows: Vec<&Row> = campaign_rows(dataset, name).collect();

    if rows.is_empty() {
        debug!(campaign = name, "no rows matched campaign");
        return CampaignSummary {
            campaign_name: name.to_string(),
            row_count: 0,
            total_spend: None,
            total_revenue: None,
            average_roas: None,
            trend: None,
            excluded_trend_points: 0,
        };
    }

    let total_spend = caps
        .spend
        .then(|| rows.iter().filter_map(|row| row.spend).sum::<f64>());
    let total_revenue = caps
        .revenue
        .then(|| rows.iter().filter_map(|row| row.revenue).sum::<f64>());
    let average_roas = if dataset.derived.roas {
        mean(rows.iter().filter_map(|row| row.roas))
    } else {
        None
    };

    let mut excluded_trend_points = 0usize;
    let trend = if caps.can_plot_trend() && dataset.derived.roas {
        let mut dated: Vec<TrendPoint> = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.date.valid() {
                Some(date) => dated.push(TrendPoint { date, roas: row.roas }),
                None => excluded_trend_points += 1,
            }
        }
        // Stable, so rows sharing a date keep dataset order.
        dated.sort_by_key(|point| point.date);
        Some(dated)
    } else {
        None
    };

    if excluded_trend_points > 0 {
        warn!(
            campaign = name,
            excluded = excluded_trend_points,
            "rows without a usable date left out of trend"
        );
    }

    CampaignSummary {
        campaign_name: name.to_string(),
        row_count: rows.len(),
        total_spend,
        total_revenue,
        average_roas,
        trend,
        excluded_trend_points,
    }
}

/// One notice per campaign row whose date could not be parsed. Line numbers
/// count the header as line 1.
pub fn malformed_dates(dataset: &Dataset, name: &str) -> Vec<Notice> {
    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.campaign_name.as_deref() == Some(name))
        .filter_map(|(index, row)| match &row.date {
            DateCell::Malformed(value) => Some(Notice::MalformedDate {
                row: index + 2,
                value: value.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
