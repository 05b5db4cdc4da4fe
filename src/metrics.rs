use tracing::debug;

use crate::error::Notice;
use crate::models::Dataset;
use crate::schema::SchemaCapabilities;

/// Return on ad spend. `None` when either input is missing, spend is zero,
/// or the quotient is not finite.
pub fn roas(revenue: Option<f64>, spend: Option<f64>) -> Option<f64> {
    ratio(revenue?, spend?)
}

/// Cost per acquisition. `None` when either input is missing or there were
/// no orders.
pub fn cpa(spend: Option<f64>, orders: Option<u64>) -> Option<f64> {
    ratio(spend?, orders? as f64)
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

/// Appends ROAS and CPA to every row where their source columns exist.
/// A derived column whose prerequisites are absent is left out entirely.
pub fn derive(dataset: &mut Dataset, caps: &SchemaCapabilities) -> Vec<Notice> {
    let derive_roas = caps.can_derive_roas();
    let derive_cpa = caps.can_derive_cpa();
    let mut undefined_roas = 0usize;
    let mut undefined_cpa = 0usize;

    for row in dataset.rows.iter_mut() {
        row.roas = if derive_roas { roas(row.revenue, row.spend) } else { None };
        row.cpa = if derive_cpa { cpa(row.spend, row.orders) } else { None };

        if derive_roas && row.roas.is_none() {
            undefined_roas += 1;
        }
        if derive_cpa && row.cpa.is_none() {
            undefined_cpa += 1;
        }
    }

    dataset.derived.roas = derive_roas;
    dataset.derived.cpa = derive_cpa;
    debug!(
        rows = dataset.rows.len(),
        derive_roas, derive_cpa, undefined_roas, undefined_cpa, "metrics derived"
    );

    let mut notices = Vec::new();
    if derive_roas && undefined_roas > 0 {
        notices.push(Notice::UndefinedMetric {
            metric: "ROAS",
            rows: undefined_roas,
        });
    }
    if derive_cpa && undefined_cpa > 0 {
        notices.push(Notice::UndefinedMetric {
            metric: "CPA",
            rows: undefined_cpa,
        });
    }
    notices
}
